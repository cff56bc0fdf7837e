/// Ordered-alternative dispatch
///
/// A rule's direct matcher runs first, then its flattened alternatives in
/// declared order; the first success wins. Results are memoized per
/// session under `(rule, input)`.
use super::{MatchResult, Session};
use crate::error::ParseError;
use crate::grammar::{Matcher, RuleId};

impl Session<'_> {
    /// Match `input` against `rule`.
    ///
    /// `Ok(None)` means no match. A `(rule, input)` pair already being
    /// evaluated further up the call chain yields no match, which stops
    /// left recursion through alternatives.
    pub fn match_rule(&mut self, rule: RuleId, input: &str) -> MatchResult {
        let grammar = self.grammar;
        let Some(descriptor) = grammar.rule(rule) else {
            return Err(ParseError::internal(rule, input, "rule is not registered"));
        };
        if descriptor.is_block() {
            return Err(ParseError::internal(
                rule,
                input,
                "block rule matched against a single line",
            ));
        }

        self.stats.attempts += 1;
        let key = (rule, input.to_string());
        if self.options.memoize {
            if let Some(hit) = self.cache.get(&key) {
                self.stats.cache_hits += 1;
                return Ok(hit.clone());
            }
        }
        if self.active.contains(&key) {
            self.guard_hits += 1;
            return Ok(None);
        }
        if let Some(limit) = self.options.max_depth {
            if self.depth >= limit {
                return Err(ParseError::NestingTooDeep { limit, rule });
            }
        }

        let guard_before = self.guard_hits;
        self.active.insert(key.clone());
        self.depth += 1;
        let result = self.dispatch(rule, input);
        self.depth -= 1;
        self.active.remove(&key);
        let result = result?;

        if let Some(node) = &result {
            tracing::trace!(rule = %rule, input, tag = node.variant_tag(), "matched");
        }
        // a result shaped by the recursion guard depends on its caller
        if self.options.memoize && self.guard_hits == guard_before {
            self.cache.insert(key, result.clone());
        }
        Ok(result)
    }

    fn dispatch(&mut self, rule: RuleId, input: &str) -> MatchResult {
        let grammar = self.grammar;
        let Some(descriptor) = grammar.rule(rule) else {
            return Err(ParseError::internal(rule, input, "rule is not registered"));
        };
        if let Some(Matcher::Text(matcher)) = &descriptor.matcher {
            if let Some(node) = matcher(self, input)? {
                return Ok(Some(node));
            }
        }
        for &alternative in &descriptor.alternatives {
            if grammar.is_block(alternative) {
                continue;
            }
            if let Some(node) = self.match_rule(alternative, input)? {
                return Ok(Some(node));
            }
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::{Grammar, GrammarBuilder, RuleDescriptor, Standard};
    use crate::node::Node;

    fn session() -> Session<'static> {
        Session::new(Grammar::shared(Standard::F2008))
    }

    #[test]
    fn test_first_alternative_wins() {
        let mut s = session();
        let node = s.match_rule(RuleId::Primary, "42").unwrap().unwrap();
        assert_eq!(node.rule(), RuleId::IntLiteralConstant);
        let node = s.match_rule(RuleId::Primary, "x").unwrap().unwrap();
        assert_eq!(node.rule(), RuleId::Name);
    }

    fn any_name(_: &mut Session<'_>, input: &str) -> MatchResult {
        Ok(Some(Node::leaf(RuleId::Name, input.trim()).into_arc()))
    }

    fn any_label(_: &mut Session<'_>, input: &str) -> MatchResult {
        Ok(Some(Node::leaf(RuleId::Label, input.trim()).into_arc()))
    }

    fn ambiguous(order: &[RuleId]) -> Grammar {
        let mut b = GrammarBuilder::new();
        b.register(RuleDescriptor::text(RuleId::Name, any_name))
            .register(RuleDescriptor::text(RuleId::Label, any_label))
            .register(RuleDescriptor::delegate(RuleId::Primary, order));
        b.build(Standard::F2003).unwrap()
    }

    #[test]
    fn test_declared_order_decides_ambiguity() {
        let name_first = ambiguous(&[RuleId::Name, RuleId::Label]);
        let label_first = ambiguous(&[RuleId::Label, RuleId::Name]);
        for _ in 0..3 {
            let a = Session::new(&name_first).match_rule(RuleId::Primary, "10").unwrap();
            let b = Session::new(&label_first).match_rule(RuleId::Primary, "10").unwrap();
            assert_eq!(a.unwrap().rule(), RuleId::Name);
            assert_eq!(b.unwrap().rule(), RuleId::Label);
        }
    }

    #[test]
    fn test_no_match_is_ok_none() {
        let mut s = session();
        assert!(s.match_rule(RuleId::Name, "1abc").unwrap().is_none());
    }

    #[test]
    fn test_cache_hits() {
        let mut s = session();
        let first = s.match_rule(RuleId::Expr, "a + b").unwrap();
        let hits = s.stats().cache_hits;
        let second = s.match_rule(RuleId::Expr, "a + b").unwrap();
        assert_eq!(first, second);
        assert!(s.stats().cache_hits > hits);
    }

    #[test]
    fn test_memoize_off_gives_same_tree() {
        let mut cached = session();
        let mut fresh = session().with_memoize(false);
        let input = "f(x, y) * (a - b) ** 2";
        let a: Option<std::sync::Arc<Node>> = cached.match_rule(RuleId::Expr, input).unwrap();
        let b = fresh.match_rule(RuleId::Expr, input).unwrap();
        assert!(a.is_some());
        assert_eq!(a, b);
        assert_eq!(fresh.stats().cache_hits, 0);
    }

    #[test]
    fn test_block_rule_is_internal_error() {
        let mut s = session();
        let err = s.match_rule(RuleId::IfConstruct, "if (x) then").unwrap_err();
        assert!(err.is_internal());
    }

    #[test]
    fn test_depth_limit() {
        let mut s = session().with_depth_limit(8);
        let err = s.match_rule(RuleId::Expr, "((((((((x))))))))").unwrap_err();
        assert!(matches!(err, ParseError::NestingTooDeep { limit: 8, .. }));
    }
}
