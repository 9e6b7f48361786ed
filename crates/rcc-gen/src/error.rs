//! Code generation error type.

use rcc_util::Span;
use thiserror::Error;

/// Fatal code generation errors.
#[derive(Debug, Error)]
pub enum CodeGenError {
    /// Address taken of something that is not a variable, dereference, or
    /// member access.
    #[error("not an lvalue")]
    NotAnLvalue { span: Span },

    /// `switch` over something other than a compound statement body.
    #[error("switch statement body must be a compound statement")]
    MalformedSwitch,

    /// An expression reached the generator without a resolved type.
    #[error("internal error: expression has no type")]
    UntypedExpression { span: Span },

    /// Writing the assembly file failed.
    #[error("cannot write output file")]
    Io(#[from] std::io::Error),

    /// The external assembler/linker exited with a failure status.
    #[error("assembly/linking failed (cc exited with {status})")]
    Toolchain { status: i32 },
}

impl CodeGenError {
    pub fn span(&self) -> Option<Span> {
        match self {
            CodeGenError::NotAnLvalue { span } | CodeGenError::UntypedExpression { span } => {
                Some(*span)
            }
            _ => None,
        }
    }
}
