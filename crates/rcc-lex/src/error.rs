//! Lexer error type.

use rcc_util::Span;
use thiserror::Error;

/// Fatal lexical errors. The lexer stops at the first one; it never emits
/// error tokens.
#[derive(Debug, Clone, Error)]
pub enum LexError {
    /// `/*` with no matching `*/` before end of input.
    #[error("unclosed block comment")]
    UnterminatedComment { span: Span },

    /// `"` with no closing quote before end of input.
    #[error("unclosed string literal")]
    UnterminatedString { span: Span },

    /// `'` with no closing quote after the character.
    #[error("unclosed character literal")]
    UnterminatedChar { span: Span },

    /// A byte that starts no token.
    #[error("invalid token at '{found}'")]
    InvalidByte { found: char, span: Span },
}

impl LexError {
    /// Location of the error.
    pub fn span(&self) -> Span {
        match self {
            LexError::UnterminatedComment { span }
            | LexError::UnterminatedString { span }
            | LexError::UnterminatedChar { span }
            | LexError::InvalidByte { span, .. } => *span,
        }
    }
}
