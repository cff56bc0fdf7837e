/// Diagnostics recorded while matching
///
/// Malformed input never aborts a parse: the block matcher records a
/// [`Diagnostic`] and carries on. Callers decide what to do with them.
use std::fmt;

use crate::node::Span;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Info => write!(f, "info"),
            Severity::Warning => write!(f, "warning"),
            Severity::Error => write!(f, "error"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub severity: Severity,
    pub span: Option<Span>,
    pub line_text: String,
    pub message: String,
}

impl Diagnostic {
    #[must_use]
    pub fn new(
        severity: Severity,
        span: Option<Span>,
        line_text: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            severity,
            span,
            line_text: line_text.into(),
            message: message.into(),
        }
    }

    #[must_use]
    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.span {
            Some(span) => write!(f, "{}: {}: {}", span, self.severity, self.message)?,
            None => write!(f, "{}: {}", self.severity, self.message)?,
        }
        if !self.line_text.is_empty() {
            write!(f, "\n>>>{}", self.line_text)?;
        }
        Ok(())
    }
}
