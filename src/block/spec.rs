/// Declarative description of a multi-line construct
use std::fmt;
use std::sync::Arc;

use super::hooks::LookaheadHook;
use crate::grammar::RuleId;

/// How the begin and end statements' names are compared
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameCheck {
    None,
    /// `outer: DO ... END DO outer`
    ConstructName,
    /// `PROGRAM p ... END PROGRAM p`; the payload names the unit kind
    StatementName(&'static str),
}

impl NameCheck {
    #[must_use]
    pub fn kind(self) -> &'static str {
        match self {
            NameCheck::None | NameCheck::ConstructName => "construct",
            NameCheck::StatementName(kind) => kind,
        }
    }
}

#[derive(Clone)]
pub struct BlockSpec {
    pub begin: Option<RuleId>,
    pub interior: Vec<RuleId>,
    pub end: Option<RuleId>,
    pub match_names: NameCheck,
    pub strict_order: bool,
    pub label_terminated: bool,
    pub hooks: Vec<Arc<dyn LookaheadHook>>,
}

impl BlockSpec {
    #[must_use]
    pub fn new(begin: Option<RuleId>, interior: &[RuleId], end: Option<RuleId>) -> Self {
        Self {
            begin,
            interior: interior.to_vec(),
            end,
            match_names: NameCheck::None,
            strict_order: false,
            label_terminated: false,
            hooks: Vec::new(),
        }
    }

    /// Open-ended run of interior items with no begin or end statement
    #[must_use]
    pub fn sequence(interior: &[RuleId]) -> Self {
        Self::new(None, interior, None)
    }

    #[must_use]
    pub fn names(mut self, check: NameCheck) -> Self {
        self.match_names = check;
        self
    }

    #[must_use]
    pub fn strict(mut self) -> Self {
        self.strict_order = true;
        self
    }

    #[must_use]
    pub fn label_terminated(mut self) -> Self {
        self.label_terminated = true;
        self
    }

    #[must_use]
    pub fn with_hooks(mut self, hooks: &[Arc<dyn LookaheadHook>]) -> Self {
        self.hooks.extend(hooks.iter().cloned());
        self
    }

    /// Every rule this spec refers to
    pub fn referenced_rules(&self) -> impl Iterator<Item = RuleId> + '_ {
        self.begin
            .iter()
            .chain(self.interior.iter())
            .chain(self.end.iter())
            .copied()
    }
}

impl fmt::Debug for BlockSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let hooks: Vec<&str> = self.hooks.iter().map(|h| h.name()).collect();
        f.debug_struct("BlockSpec")
            .field("begin", &self.begin)
            .field("interior", &self.interior)
            .field("end", &self.end)
            .field("match_names", &self.match_names)
            .field("strict_order", &self.strict_order)
            .field("label_terminated", &self.label_terminated)
            .field("hooks", &hooks)
            .finish()
    }
}
