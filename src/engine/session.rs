/// Per-parse matching state
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::diagnostics::{Diagnostic, Severity};
use crate::grammar::{Grammar, RuleId};
use crate::node::{Node, Span};

/// Knobs a caller can set on a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionOptions {
    pub memoize: bool,
    pub max_depth: Option<usize>,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            memoize: true,
            max_depth: None,
        }
    }
}

/// Counters kept for tracing and tests
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionStats {
    pub attempts: u64,
    pub cache_hits: u64,
}

/// One parse in progress
///
/// Owns the memo cache, the recursion guard and the diagnostics of a
/// single input. Sessions are cheap and never shared between threads; the
/// [`Grammar`] they borrow is.
pub struct Session<'g> {
    pub(crate) grammar: &'g Grammar,
    pub(crate) options: SessionOptions,
    pub(crate) cache: HashMap<(RuleId, String), Option<Arc<Node>>>,
    pub(crate) active: HashSet<(RuleId, String)>,
    /// Bumped whenever the recursion guard cuts a branch
    pub(crate) guard_hits: u64,
    pub(crate) depth: usize,
    pub(crate) stats: SessionStats,
    diagnostics: Vec<Diagnostic>,
    /// End rules of the blocks currently collecting, innermost last, with
    /// the label a label-terminated block waits for
    pub(crate) open_ends: Vec<(RuleId, Option<u32>)>,
    /// Label of the most recent labelled DO termination
    pub(crate) closed_label: Option<u32>,
}

impl<'g> Session<'g> {
    #[must_use]
    pub fn new(grammar: &'g Grammar) -> Self {
        Self::with_options(grammar, SessionOptions::default())
    }

    #[must_use]
    pub fn with_options(grammar: &'g Grammar, options: SessionOptions) -> Self {
        Self {
            grammar,
            options,
            cache: HashMap::new(),
            active: HashSet::new(),
            guard_hits: 0,
            depth: 0,
            stats: SessionStats::default(),
            diagnostics: Vec::new(),
            open_ends: Vec::new(),
            closed_label: None,
        }
    }

    /// Bound the match recursion depth
    #[must_use]
    pub fn with_depth_limit(mut self, limit: usize) -> Self {
        self.options.max_depth = Some(limit);
        self
    }

    #[must_use]
    pub fn with_memoize(mut self, memoize: bool) -> Self {
        self.options.memoize = memoize;
        self
    }

    #[must_use]
    pub fn grammar(&self) -> &'g Grammar {
        self.grammar
    }

    #[must_use]
    pub fn options(&self) -> SessionOptions {
        self.options
    }

    #[must_use]
    pub fn stats(&self) -> SessionStats {
        self.stats
    }

    /// Drop every memoized result
    pub fn clear_cache(&mut self) {
        self.cache.clear();
    }

    // ===== DIAGNOSTICS =====

    pub fn record(&mut self, diagnostic: Diagnostic) {
        tracing::debug!(severity = %diagnostic.severity, message = %diagnostic.message, "diagnostic");
        self.diagnostics.push(diagnostic);
    }

    pub fn report(
        &mut self,
        severity: Severity,
        span: Option<Span>,
        line_text: &str,
        message: impl Into<String>,
    ) {
        self.record(Diagnostic::new(severity, span, line_text, message));
    }

    #[must_use]
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn take_diagnostics(&mut self) -> Vec<Diagnostic> {
        std::mem::take(&mut self.diagnostics)
    }

    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(Diagnostic::is_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::Standard;

    #[test]
    fn test_options() {
        let grammar = Grammar::shared(Standard::F2003);
        let session = Session::new(grammar).with_depth_limit(10).with_memoize(false);
        assert_eq!(session.options().max_depth, Some(10));
        assert!(!session.options().memoize);
        assert_eq!(session.stats(), SessionStats::default());
    }

    #[test]
    fn test_diagnostics() {
        let mut session = Session::new(Grammar::shared(Standard::F2003));
        assert!(!session.has_errors());
        session.report(Severity::Warning, None, "", "careful");
        assert!(!session.has_errors());
        session.report(Severity::Error, Some(Span::new(2, 2, 1)), "x", "bad");
        assert!(session.has_errors());
        assert_eq!(session.take_diagnostics().len(), 2);
        assert!(session.diagnostics().is_empty());
    }
}
