//! rcc-lex - Lexical analysis.
//!
//! Transforms a preprocessed source buffer into a finite token sequence
//! terminated by an [`TokenKind::Eof`] token. The lexer applies maximal
//! munch to multi-character operators, skips whitespace and both comment
//! forms, and decodes character/string literal escapes through the shared
//! table in [`rcc_util::escape`].
//!
//! Lexing is all-or-nothing: the first illegal byte, unterminated literal,
//! or unterminated comment aborts with a located [`LexError`]. There are no
//! error tokens.

mod cursor;
mod error;
mod lexer;
pub mod token;

pub use cursor::Cursor;
pub use error::LexError;
pub use lexer::{tokenize, Lexer};
pub use token::{keyword_from_ident, render, Token, TokenKind};
