//! rcc-util - Shared compiler infrastructure.
//!
//! This crate holds the pieces every phase of the compiler leans on:
//!
//! - [`span`]: source locations ([`Span`], [`FileId`]) and the [`SourceMap`]
//!   that turns byte offsets back into `file:line:column` plus a caret line.
//! - [`diagnostic`]: the [`Diagnostic`] record and the warning [`Handler`].
//!   Errors in this compiler are fatal at first occurrence and travel as
//!   `Result`s; only warnings accumulate.
//! - [`escape`]: the single escape alphabet shared by the lexer (decoding
//!   `\n`-style sequences) and the code generator (encoding bytes back into
//!   assembler string syntax).
//! - [`index_vec`]: typed index vectors backing the type arena.

pub mod diagnostic;
pub mod escape;
pub mod index_vec;
pub mod span;

pub use diagnostic::{Diagnostic, Handler, Level};
pub use index_vec::{Idx, IndexVec};
pub use span::{FileId, SourceFile, SourceMap, Span};
