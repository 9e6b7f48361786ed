//! rcc-gen - x86-64 code generation.
//!
//! Walks the typed AST and emits Intel-syntax GNU assembler text following
//! the System V ABI for the six-register integer calling convention. The
//! expression evaluator is a stack machine: no register allocation, just
//! `rax`, `rdi`, the hardware stack, and size-correct loads and stores.
//!
//! - [`abi`]: the argument register table and return register.
//! - [`frame`]: per-function stack layout (8-byte local slots, 16-byte
//!   frame alignment).
//! - [`asm`]: the generator itself.
//! - [`linker`]: hands the emitted `.s` to the system C compiler to
//!   assemble and link.

pub mod abi;
pub mod asm;
mod error;
pub mod frame;
pub mod linker;

pub use asm::{codegen, CodeGenerator};
pub use error::CodeGenError;
pub use frame::FrameLayout;
pub use linker::Assembler;
