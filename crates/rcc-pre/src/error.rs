//! Preprocessor error type.

use std::path::PathBuf;
use thiserror::Error;

/// Fatal preprocessing errors.
///
/// A missing *user* include is deliberately not here: it degrades to a
/// warning and the directive is dropped.
#[derive(Debug, Error)]
pub enum PreprocessError {
    /// The input (or an included) file could not be read.
    #[error("cannot open file: {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// `#include` with a malformed or unterminated file name.
    #[error("invalid include directive: {line}")]
    InvalidInclude { line: String },

    /// `#else` or `#endif` with no open `#if`, or an `#if` left open at end
    /// of file.
    #[error("unbalanced conditional directive in {path}")]
    UnbalancedConditional { path: PathBuf },

    /// Include nesting exceeded [`crate::MAX_INCLUDE_DEPTH`].
    #[error("include depth limit exceeded at {path}")]
    IncludeDepth { path: PathBuf },
}
