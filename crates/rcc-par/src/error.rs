//! Parser and elaboration error types.

use rcc_util::Span;
use thiserror::Error;

/// Fatal syntax and name-resolution errors. Parsing stops at the first one.
#[derive(Debug, Clone, Error)]
pub enum ParseError {
    #[error("expected '{expected}'")]
    Expected { expected: &'static str, span: Span },

    #[error("expected an expression")]
    ExpectedExpression { span: Span },

    #[error("expected a type specifier")]
    ExpectedTypeSpecifier { span: Span },

    #[error("expected {what} name")]
    ExpectedName { what: &'static str, span: Span },

    #[error("undefined variable '{name}'")]
    UndefinedVariable { name: String, span: Span },

    #[error("not a constant expression")]
    NotConstant { span: Span },

    #[error("expected number in enum")]
    ExpectedEnumValue { span: Span },

    #[error("stray '{keyword}' outside of a loop or switch")]
    StrayJump { keyword: &'static str, span: Span },

    #[error("unsupported initializer for this type")]
    UnsupportedInitializer { span: Span },

    /// Elaboration failure surfaced during parsing (`sizeof expr`).
    #[error(transparent)]
    Sem(#[from] SemError),
}

impl ParseError {
    pub fn span(&self) -> Span {
        match self {
            ParseError::Expected { span, .. }
            | ParseError::ExpectedExpression { span }
            | ParseError::ExpectedTypeSpecifier { span }
            | ParseError::ExpectedName { span, .. }
            | ParseError::UndefinedVariable { span, .. }
            | ParseError::NotConstant { span }
            | ParseError::ExpectedEnumValue { span }
            | ParseError::StrayJump { span, .. }
            | ParseError::UnsupportedInitializer { span } => *span,
            ParseError::Sem(e) => e.span(),
        }
    }
}

/// Fatal type-elaboration errors.
#[derive(Debug, Clone, Error)]
pub enum SemError {
    #[error("member '{name}' not found")]
    MemberNotFound { name: String, span: Span },

    #[error("member access on a value that is not a struct")]
    NotAStruct { span: Span },
}

impl SemError {
    pub fn span(&self) -> Span {
        match self {
            SemError::MemberNotFound { span, .. } | SemError::NotAStruct { span } => *span,
        }
    }
}
