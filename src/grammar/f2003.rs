/// Fortran 2003 rule set
///
/// The base layer: expressions, statements and constructs. Later
/// standards register on top of it.
use super::registry::GrammarBuilder;
use super::{construct, expr, stmt};

pub fn register(builder: &mut GrammarBuilder) {
    expr::register(builder);
    stmt::register(builder);
    construct::register(builder);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::{RuleId, Standard};

    #[test]
    fn test_base_layer_is_complete() {
        let mut builder = GrammarBuilder::new();
        register(&mut builder);
        assert!(builder.contains(RuleId::Program));
        assert!(!builder.contains(RuleId::BlockConstruct));
        let grammar = builder.build(Standard::F2003).unwrap();
        assert!(grammar.is_block(RuleId::IfConstruct));
        assert!(grammar.is_block_like(RuleId::DoConstruct));
        assert!(!grammar.is_block_like(RuleId::ActionStmt));
    }
}
