//! System V AMD64 calling convention tables.
//!
//! Integer and pointer arguments 1-6 travel in `rdi rsi rdx rcx r8 r9`;
//! the return value comes back in `rax`; the stack pointer must be 16-byte
//! aligned at the instant of `call`. This compiler only uses `rax`, `rdi`,
//! and `rcx` as scratch, so no callee-saved registers beyond `rbp` need
//! saving.

/// System V AMD64 ABI conventions.
pub struct SystemVAbi;

impl SystemVAbi {
    /// Integer/pointer argument registers in order.
    pub const ARG_REGS: [&'static str; 6] = ["rdi", "rsi", "rdx", "rcx", "r8", "r9"];

    /// Return register for integer/pointer values.
    pub const RET_REG: &'static str = "rax";

    /// Required stack alignment at a call site, in bytes.
    pub const CALL_ALIGN: i32 = 16;

    /// The register carrying argument `index`, or `None` past the sixth.
    pub fn arg_register(index: usize) -> Option<&'static str> {
        Self::ARG_REGS.get(index).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arg_registers() {
        assert_eq!(SystemVAbi::arg_register(0), Some("rdi"));
        assert_eq!(SystemVAbi::arg_register(5), Some("r9"));
        assert_eq!(SystemVAbi::arg_register(6), None);
    }

    #[test]
    fn test_return_register() {
        assert_eq!(SystemVAbi::RET_REG, "rax");
    }
}
