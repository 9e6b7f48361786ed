//! Stack frame layout.
//!
//! Locals are assigned slots below `rbp` in declaration order: each local's
//! offset is the running byte total rounded up to 8, and the frame size is
//! the final total rounded up to 16, so `rsp` stays 16-byte aligned after
//! the prologue's `sub`.

use rcc_par::{Local, TypeArena};

/// Computed layout for one function: `offsets[i]` is the distance below
/// `rbp` of `locals[i]`.
#[derive(Debug, Clone)]
pub struct FrameLayout {
    pub offsets: Vec<i32>,
    pub frame_size: i32,
}

impl FrameLayout {
    /// Lay out `locals` in insertion order.
    pub fn compute(types: &TypeArena, locals: &[Local]) -> Self {
        let mut offsets = Vec::with_capacity(locals.len());
        let mut offset: i32 = 0;
        for local in locals {
            offset += types.size_of(local.ty);
            offset = round_up(offset, 8);
            offsets.push(offset);
        }
        FrameLayout {
            offsets,
            frame_size: round_up(offset, 16),
        }
    }
}

fn round_up(n: i32, to: i32) -> i32 {
    (n + to - 1) / to * to
}

#[cfg(test)]
mod tests {
    use super::*;
    use rcc_par::Local;

    fn local(name: &str, ty: rcc_par::TypeId) -> Local {
        Local {
            name: name.into(),
            ty,
        }
    }

    #[test]
    fn test_round_up() {
        assert_eq!(round_up(0, 16), 0);
        assert_eq!(round_up(1, 8), 8);
        assert_eq!(round_up(8, 8), 8);
        assert_eq!(round_up(17, 16), 32);
    }

    #[test]
    fn test_empty_frame() {
        let types = TypeArena::new();
        let layout = FrameLayout::compute(&types, &[]);
        assert_eq!(layout.frame_size, 0);
        assert!(layout.offsets.is_empty());
    }

    #[test]
    fn test_ints_get_eight_byte_slots() {
        let types = TypeArena::new();
        let locals = vec![
            local("a", TypeArena::INT),
            local("b", TypeArena::INT),
            local("c", TypeArena::CHAR),
        ];
        let layout = FrameLayout::compute(&types, &locals);
        assert_eq!(layout.offsets, vec![8, 16, 24]);
        assert_eq!(layout.frame_size, 32);
    }

    #[test]
    fn test_array_spans_multiple_slots() {
        let mut types = TypeArena::new();
        let arr = types.array_of(TypeArena::INT, 3); // 12 bytes -> 16
        let locals = vec![local("a", arr), local("x", TypeArena::INT)];
        let layout = FrameLayout::compute(&types, &locals);
        assert_eq!(layout.offsets, vec![16, 24]);
        assert_eq!(layout.frame_size, 32);
    }

    #[test]
    fn test_invariants_hold() {
        let mut types = TypeArena::new();
        let ptr = types.ptr_to(TypeArena::CHAR);
        let arr = types.array_of(TypeArena::CHAR, 7);
        let locals = vec![
            local("a", TypeArena::CHAR),
            local("b", ptr),
            local("c", arr),
            local("d", TypeArena::INT),
        ];
        let layout = FrameLayout::compute(&types, &locals);
        assert_eq!(layout.frame_size % 16, 0);
        for &off in &layout.offsets {
            assert_eq!(off % 8, 0);
            assert!(off > 0 && off <= layout.frame_size);
        }
    }
}
