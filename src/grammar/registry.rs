/// Rule descriptors and grammar assembly
///
/// Rule modules register [`RuleDescriptor`]s with a [`GrammarBuilder`];
/// `build` validates every reference, flattens pure delegations once, and
/// freezes the result into a [`Grammar`] shared read-only by all sessions.
use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;

use super::{RuleId, Standard};
use crate::block::BlockSpec;
use crate::engine::{MatchResult, Session};
use crate::error::GrammarError;

/// Direct matcher run against a single logical line
pub type TextMatcher = fn(&mut Session<'_>, &str) -> MatchResult;

#[derive(Debug, Clone)]
pub enum Matcher {
    Text(TextMatcher),
    Block(BlockSpec),
}

/// One grammar rule: its own matcher (if any) plus ordered alternatives
#[derive(Debug, Clone)]
pub struct RuleDescriptor {
    pub id: RuleId,
    pub alternatives: Vec<RuleId>,
    /// Rules the matcher invokes directly; only validated
    pub uses: Vec<RuleId>,
    pub matcher: Option<Matcher>,
}

impl RuleDescriptor {
    /// Pure delegation: the rule is exactly one of `alternatives`
    #[must_use]
    pub fn delegate(id: RuleId, alternatives: &[RuleId]) -> Self {
        Self {
            id,
            alternatives: alternatives.to_vec(),
            uses: Vec::new(),
            matcher: None,
        }
    }

    #[must_use]
    pub fn text(id: RuleId, matcher: TextMatcher) -> Self {
        Self {
            id,
            alternatives: Vec::new(),
            uses: Vec::new(),
            matcher: Some(Matcher::Text(matcher)),
        }
    }

    #[must_use]
    pub fn block(id: RuleId, spec: BlockSpec) -> Self {
        Self {
            id,
            alternatives: Vec::new(),
            uses: Vec::new(),
            matcher: Some(Matcher::Block(spec)),
        }
    }

    /// Alternatives tried after the direct matcher fails
    #[must_use]
    pub fn or(mut self, alternatives: &[RuleId]) -> Self {
        self.alternatives.extend_from_slice(alternatives);
        self
    }

    #[must_use]
    pub fn uses(mut self, rules: &[RuleId]) -> Self {
        self.uses.extend_from_slice(rules);
        self
    }

    #[must_use]
    pub fn is_delegation(&self) -> bool {
        self.matcher.is_none()
    }

    #[must_use]
    pub fn is_block(&self) -> bool {
        matches!(self.matcher, Some(Matcher::Block(_)))
    }

    #[must_use]
    pub fn block_spec(&self) -> Option<&BlockSpec> {
        match &self.matcher {
            Some(Matcher::Block(spec)) => Some(spec),
            _ => None,
        }
    }

    fn references(&self) -> Vec<RuleId> {
        let mut refs: Vec<RuleId> = self
            .alternatives
            .iter()
            .chain(self.uses.iter())
            .copied()
            .collect();
        if let Some(spec) = self.block_spec() {
            refs.extend(spec.referenced_rules());
        }
        refs
    }
}

/// Mutable registry used while a grammar is being assembled
#[derive(Debug, Default)]
pub struct GrammarBuilder {
    rules: HashMap<RuleId, RuleDescriptor>,
    order: Vec<RuleId>,
    pending_error: Option<GrammarError>,
}

impl GrammarBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a descriptor, replacing any earlier one for the same rule
    pub fn register(&mut self, descriptor: RuleDescriptor) -> &mut Self {
        let id = descriptor.id;
        if self.rules.insert(id, descriptor).is_none() {
            self.order.push(id);
        }
        self
    }

    pub fn append_alternatives(&mut self, rule: RuleId, extra: &[RuleId]) -> &mut Self {
        match self.rules.get_mut(&rule) {
            Some(desc) => desc.alternatives.extend_from_slice(extra),
            None => self.fail(rule, "append alternatives to"),
        }
        self
    }

    pub fn prepend_alternatives(&mut self, rule: RuleId, extra: &[RuleId]) -> &mut Self {
        match self.rules.get_mut(&rule) {
            Some(desc) => {
                let mut alternatives = extra.to_vec();
                alternatives.append(&mut desc.alternatives);
                desc.alternatives = alternatives;
            }
            None => self.fail(rule, "prepend alternatives to"),
        }
        self
    }

    /// Append interior candidates to a registered block rule
    pub fn extend_interior(&mut self, rule: RuleId, extra: &[RuleId]) -> &mut Self {
        match self.rules.get_mut(&rule).and_then(|d| match &mut d.matcher {
            Some(Matcher::Block(spec)) => Some(spec),
            _ => None,
        }) {
            Some(spec) => spec.interior.extend_from_slice(extra),
            None => self.fail(rule, "extend the interior of block rule"),
        }
        self
    }

    #[must_use]
    pub fn contains(&self, rule: RuleId) -> bool {
        self.rules.contains_key(&rule)
    }

    fn fail(&mut self, rule: RuleId, operation: &'static str) {
        if self.pending_error.is_none() {
            self.pending_error = Some(GrammarError::ExtendsUnknownRule { rule, operation });
        }
    }

    /// Validate and freeze the grammar
    pub fn build(self, standard: Standard) -> Result<Grammar, GrammarError> {
        if let Some(err) = self.pending_error {
            return Err(err);
        }
        for id in &self.order {
            let desc = &self.rules[id];
            if desc.is_delegation() && desc.alternatives.is_empty() {
                return Err(GrammarError::EmptyRule { rule: *id });
            }
            for rule in desc.references() {
                if !self.rules.contains_key(&rule) {
                    return Err(GrammarError::UnknownRule {
                        rule,
                        referenced_by: *id,
                    });
                }
            }
        }

        let mut flattener = Flattener {
            rules: &self.rules,
            expanded: HashMap::new(),
        };
        let mut rules = HashMap::with_capacity(self.rules.len());
        for id in &self.order {
            let mut desc = self.rules[id].clone();
            desc.alternatives = flattener.flatten_list(&desc.alternatives)?;
            if let Some(Matcher::Block(spec)) = &mut desc.matcher {
                spec.interior = flattener.flatten_list(&spec.interior)?;
            }
            rules.insert(*id, desc);
        }
        tracing::debug!(standard = %standard, rules = rules.len(), "grammar built");
        Ok(Grammar { standard, rules })
    }
}

/// Expands pure delegations into the rules that actually match
struct Flattener<'a> {
    rules: &'a HashMap<RuleId, RuleDescriptor>,
    expanded: HashMap<RuleId, Vec<RuleId>>,
}

impl Flattener<'_> {
    fn flatten_list(&mut self, list: &[RuleId]) -> Result<Vec<RuleId>, GrammarError> {
        let mut out = Vec::new();
        let mut seen = HashSet::new();
        for &rule in list {
            for leaf in self.expand(rule, &mut Vec::new())? {
                if seen.insert(leaf) {
                    out.push(leaf);
                }
            }
        }
        Ok(out)
    }

    fn expand(&mut self, rule: RuleId, stack: &mut Vec<RuleId>) -> Result<Vec<RuleId>, GrammarError> {
        let desc = &self.rules[&rule];
        if !desc.is_delegation() {
            return Ok(vec![rule]);
        }
        if let Some(done) = self.expanded.get(&rule) {
            return Ok(done.clone());
        }
        if stack.contains(&rule) {
            return Err(GrammarError::DelegationCycle { rule });
        }
        stack.push(rule);
        let mut out = Vec::new();
        let mut seen = HashSet::new();
        for &alt in &desc.alternatives {
            for leaf in self.expand(alt, stack)? {
                if seen.insert(leaf) {
                    out.push(leaf);
                }
            }
        }
        stack.pop();
        self.expanded.insert(rule, out.clone());
        Ok(out)
    }
}

/// Validated, flattened rule set for one language standard
#[derive(Debug)]
pub struct Grammar {
    standard: Standard,
    rules: HashMap<RuleId, RuleDescriptor>,
}

static F2003_GRAMMAR: LazyLock<Grammar> = LazyLock::new(|| {
    Grammar::for_standard(Standard::F2003)
        .unwrap_or_else(|e| panic!("built-in F2003 grammar is invalid: {e}"))
});
static F2008_GRAMMAR: LazyLock<Grammar> = LazyLock::new(|| {
    Grammar::for_standard(Standard::F2008)
        .unwrap_or_else(|e| panic!("built-in F2008 grammar is invalid: {e}"))
});

impl Grammar {
    /// Assemble the built-in rule set for `standard`
    pub fn for_standard(standard: Standard) -> Result<Self, GrammarError> {
        let mut builder = GrammarBuilder::new();
        super::f2003::register(&mut builder);
        if standard >= Standard::F2008 {
            super::f2008::register(&mut builder);
        }
        builder.build(standard)
    }

    /// Process-wide grammar for `standard`, built on first use
    #[must_use]
    pub fn shared(standard: Standard) -> &'static Grammar {
        match standard {
            Standard::F2003 => &F2003_GRAMMAR,
            Standard::F2008 => &F2008_GRAMMAR,
        }
    }

    #[must_use]
    pub fn standard(&self) -> Standard {
        self.standard
    }

    #[must_use]
    pub fn rule(&self, id: RuleId) -> Option<&RuleDescriptor> {
        self.rules.get(&id)
    }

    #[must_use]
    pub fn contains(&self, id: RuleId) -> bool {
        self.rules.contains_key(&id)
    }

    #[must_use]
    pub fn is_block(&self, id: RuleId) -> bool {
        self.rules.get(&id).is_some_and(RuleDescriptor::is_block)
    }

    /// Rule or delegation whose flattened alternatives are all blocks
    #[must_use]
    pub fn is_block_like(&self, id: RuleId) -> bool {
        self.rules.get(&id).is_some_and(|desc| {
            desc.is_block()
                || (desc.is_delegation()
                    && desc.alternatives.iter().all(|alt| self.is_block(*alt)))
        })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}
