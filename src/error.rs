//! Error types and result aliases for fparse.
//!
//! This module defines the error handling infrastructure:
//! - [`Result<T>`]: Type alias for `anyhow::Result<T>` used by I/O, config and CLI glue
//! - [`ParseError`]: typed failures of a parse (bad Fortran vs. parser faults)
//! - [`GrammarError`]: problems found while building a grammar
//!
//! A rule that does not match is not an error: matchers return `Ok(None)`.

use anyhow::Result as AnyhowResult;
use thiserror::Error;

use crate::diagnostics::Diagnostic;
use crate::grammar::RuleId;

pub type Result<T> = AnyhowResult<T>;

/// Failure of a parse
#[derive(Debug, Error)]
pub enum ParseError {
    /// The input is not valid Fortran for the selected grammar
    #[error("syntax error at line {line}\n>>>{text}\n{message}")]
    Syntax {
        line: usize,
        column: usize,
        text: String,
        message: String,
        diagnostics: Vec<Diagnostic>,
    },

    /// The parser reached a state that well-formed grammar data never produces
    #[error(
        "internal parser error in {rule}: {message} (input: {input:?}). Please report this to the authors."
    )]
    Internal {
        rule: RuleId,
        input: String,
        message: String,
    },

    /// Match recursion exceeded the configured depth limit
    #[error("nesting deeper than {limit} levels while matching {rule}")]
    NestingTooDeep { limit: usize, rule: RuleId },
}

impl ParseError {
    #[must_use]
    pub fn internal(rule: RuleId, input: &str, message: impl Into<String>) -> Self {
        ParseError::Internal {
            rule,
            input: input.to_string(),
            message: message.into(),
        }
    }

    /// True for parser faults, false for problems in the Fortran input
    #[must_use]
    pub fn is_internal(&self) -> bool {
        matches!(self, ParseError::Internal { .. })
    }
}

/// Problems detected by `GrammarBuilder::build`
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GrammarError {
    #[error("rule {rule} is referenced by {referenced_by} but never registered")]
    UnknownRule { rule: RuleId, referenced_by: RuleId },

    /// A layer tried to extend a rule no earlier layer registered
    #[error("cannot {operation} {rule}: no matching rule registered")]
    ExtendsUnknownRule {
        rule: RuleId,
        operation: &'static str,
    },

    #[error("pure delegation cycle through {rule}")]
    DelegationCycle { rule: RuleId },

    #[error("rule {rule} has neither a matcher nor alternatives")]
    EmptyRule { rule: RuleId },

    #[error("unsupported Fortran standard: {0}")]
    UnsupportedStandard(String),
}
