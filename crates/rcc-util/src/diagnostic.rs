//! Diagnostics: severity levels, the diagnostic record, and the warning
//! collector.
//!
//! This compiler aborts at the first error, so errors travel as `Result`
//! values up to the driver. The [`Handler`] exists for the one diagnostic
//! class that does not stop compilation: preprocessor warnings.

use std::cell::RefCell;
use std::fmt;

use crate::span::Span;

/// Diagnostic severity level.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Level {
    /// Fatal; compilation stops after rendering.
    Error,
    /// Reported on stderr; compilation continues and the exit code is
    /// unaffected.
    Warning,
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Level::Error => write!(f, "error"),
            Level::Warning => write!(f, "warning"),
        }
    }
}

/// A diagnostic message with severity and location.
#[derive(Clone, Debug, thiserror::Error)]
#[error("{message}")]
pub struct Diagnostic {
    pub level: Level,
    pub message: String,
    pub span: Span,
}

impl Diagnostic {
    pub fn new(level: Level, message: impl Into<String>, span: Span) -> Self {
        Self {
            level,
            message: message.into(),
            span,
        }
    }

    pub fn error(message: impl Into<String>, span: Span) -> Self {
        Self::new(Level::Error, message, span)
    }

    pub fn warning(message: impl Into<String>, span: Span) -> Self {
        Self::new(Level::Warning, message, span)
    }
}

/// Collector for non-fatal diagnostics.
///
/// Phases take a shared reference and push warnings through interior
/// mutability; the driver drains the handler after the phase returns.
///
/// # Examples
///
/// ```
/// use rcc_util::diagnostic::Handler;
/// use rcc_util::span::Span;
///
/// let handler = Handler::new();
/// handler.warn("unknown include ignored", Span::DUMMY);
/// assert_eq!(handler.warning_count(), 1);
/// ```
#[derive(Default)]
pub struct Handler {
    diagnostics: RefCell<Vec<Diagnostic>>,
}

impl Handler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a warning.
    pub fn warn(&self, message: impl Into<String>, span: Span) {
        self.diagnostics
            .borrow_mut()
            .push(Diagnostic::warning(message, span));
    }

    pub fn warning_count(&self) -> usize {
        self.diagnostics.borrow().len()
    }

    /// Remove and return everything collected so far.
    pub fn take(&self) -> Vec<Diagnostic> {
        std::mem::take(&mut *self.diagnostics.borrow_mut())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_display() {
        assert_eq!(format!("{}", Level::Error), "error");
        assert_eq!(format!("{}", Level::Warning), "warning");
    }

    #[test]
    fn test_diagnostic_display_is_message() {
        let diag = Diagnostic::error("unexpected token", Span::DUMMY);
        assert_eq!(format!("{}", diag), "unexpected token");
    }

    #[test]
    fn test_handler_collects_and_drains() {
        let handler = Handler::new();
        handler.warn("first", Span::DUMMY);
        handler.warn("second", Span::DUMMY);
        assert_eq!(handler.warning_count(), 2);

        let drained = handler.take();
        assert_eq!(drained.len(), 2);
        assert_eq!(drained[0].message, "first");
        assert_eq!(handler.warning_count(), 0);
    }
}
