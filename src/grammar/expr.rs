/// Expression rules
///
/// One rule per precedence level, lowest binding first. Each level is a
/// binary (or unary) combinator whose operands are the next level down,
/// with the next level as its fallback alternative, so `a + b` tried as
/// `Expr` falls through to `Level2Expr`.
use super::registry::{GrammarBuilder, RuleDescriptor};
use super::RuleId;
use crate::engine::combinators::{
    binary_op, bracketed, call, keyword_value, number, pattern, sequence, terminal, unary_op,
    Assoc, CallOptions, Callee, ADD_OP, AND_OP, ARRAY_PARENS, CONCAT_OP, DEFINED_OP, EQUIV_OP,
    MULT_OP, NOT_OP, OR_OP, PARENS, POWER_OP, REL_OP, SQUARE,
};
use crate::engine::{MatchResult, Session};
use crate::node::{Child, Node, Shape};
use crate::text::mask;
use crate::text::patterns::{
    BOZ_LITERAL_RE, CHAR_LITERAL_RE, INT_LITERAL_RE, LOGICAL_LITERAL_RE, NAME_RE,
    REAL_LITERAL_RE, SIGNED_REAL_PART_RE,
};

// ===== OPERATOR LEVELS =====

fn expr(s: &mut Session<'_>, input: &str) -> MatchResult {
    binary_op(s, RuleId::Expr, RuleId::Expr, &DEFINED_OP, RuleId::Level5Expr, input, Assoc::Left)
}

fn level_5_expr(s: &mut Session<'_>, input: &str) -> MatchResult {
    binary_op(
        s,
        RuleId::Level5Expr,
        RuleId::Level5Expr,
        &EQUIV_OP,
        RuleId::EquivOperand,
        input,
        Assoc::Left,
    )
}

fn equiv_operand(s: &mut Session<'_>, input: &str) -> MatchResult {
    binary_op(
        s,
        RuleId::EquivOperand,
        RuleId::EquivOperand,
        &OR_OP,
        RuleId::OrOperand,
        input,
        Assoc::Left,
    )
}

fn or_operand(s: &mut Session<'_>, input: &str) -> MatchResult {
    binary_op(
        s,
        RuleId::OrOperand,
        RuleId::OrOperand,
        &AND_OP,
        RuleId::AndOperand,
        input,
        Assoc::Left,
    )
}

fn and_operand(s: &mut Session<'_>, input: &str) -> MatchResult {
    unary_op(s, RuleId::AndOperand, &NOT_OP, RuleId::Level4Expr, input)
}

fn level_4_expr(s: &mut Session<'_>, input: &str) -> MatchResult {
    binary_op(
        s,
        RuleId::Level4Expr,
        RuleId::Level3Expr,
        &REL_OP,
        RuleId::Level3Expr,
        input,
        Assoc::Left,
    )
}

fn level_3_expr(s: &mut Session<'_>, input: &str) -> MatchResult {
    binary_op(
        s,
        RuleId::Level3Expr,
        RuleId::Level3Expr,
        &CONCAT_OP,
        RuleId::Level2Expr,
        input,
        Assoc::Left,
    )
}

fn level_2_expr(s: &mut Session<'_>, input: &str) -> MatchResult {
    binary_op(
        s,
        RuleId::Level2Expr,
        RuleId::Level2Expr,
        &ADD_OP,
        RuleId::AddOperand,
        input,
        Assoc::Left,
    )
}

fn level_2_unary_expr(s: &mut Session<'_>, input: &str) -> MatchResult {
    unary_op(s, RuleId::Level2UnaryExpr, &ADD_OP, RuleId::AddOperand, input)
}

fn add_operand(s: &mut Session<'_>, input: &str) -> MatchResult {
    binary_op(
        s,
        RuleId::AddOperand,
        RuleId::AddOperand,
        &MULT_OP,
        RuleId::MultOperand,
        input,
        Assoc::Left,
    )
}

fn mult_operand(s: &mut Session<'_>, input: &str) -> MatchResult {
    binary_op(
        s,
        RuleId::MultOperand,
        RuleId::Level1Expr,
        &POWER_OP,
        RuleId::MultOperand,
        input,
        Assoc::Right,
    )
}

fn level_1_expr(s: &mut Session<'_>, input: &str) -> MatchResult {
    unary_op(s, RuleId::Level1Expr, &DEFINED_OP, RuleId::Primary, input)
}

// ===== LITERALS =====

fn int_literal(_: &mut Session<'_>, input: &str) -> MatchResult {
    number(RuleId::IntLiteralConstant, &INT_LITERAL_RE, input)
}

fn real_literal(_: &mut Session<'_>, input: &str) -> MatchResult {
    number(RuleId::RealLiteralConstant, &REAL_LITERAL_RE, input)
}

/// `(re, im)` with literal parts
fn complex_literal(_: &mut Session<'_>, input: &str) -> MatchResult {
    let text = input.trim();
    let Some(inner) = text.strip_prefix('(').and_then(|rest| rest.strip_suffix(')')) else {
        return Ok(None);
    };
    let masked = mask(inner);
    let parts: Vec<String> = masked
        .text
        .split(',')
        .map(|part| masked.map.unmask_trimmed(part))
        .collect();
    let [re, im] = parts.as_slice() else {
        return Ok(None);
    };
    if !SIGNED_REAL_PART_RE.is_match(re) || !SIGNED_REAL_PART_RE.is_match(im) {
        return Ok(None);
    }
    let compact = |part: &str| part.split_whitespace().collect::<String>();
    Ok(Some(
        Node::new(
            RuleId::ComplexLiteralConstant,
            Shape::Glued,
            vec![
                Child::token("("),
                Child::token(compact(re)),
                Child::token(", "),
                Child::token(compact(im)),
                Child::token(")"),
            ],
        )
        .into_arc(),
    ))
}

fn logical_literal(_: &mut Session<'_>, input: &str) -> MatchResult {
    let Some(caps) = LOGICAL_LITERAL_RE.captures(input.trim()) else {
        return Ok(None);
    };
    let value = caps[1].to_uppercase();
    let node = match caps.get(2) {
        None => Node::leaf(RuleId::LogicalLiteralConstant, value),
        Some(kind) => Node::new(
            RuleId::LogicalLiteralConstant,
            Shape::Glued,
            vec![Child::token(value), Child::token(format!("_{}", kind.as_str()))],
        ),
    };
    Ok(Some(node.into_arc()))
}

fn char_literal(_: &mut Session<'_>, input: &str) -> MatchResult {
    pattern(RuleId::CharLiteralConstant, &CHAR_LITERAL_RE, input, false)
}

fn boz_literal(_: &mut Session<'_>, input: &str) -> MatchResult {
    pattern(RuleId::BozLiteralConstant, &BOZ_LITERAL_RE, input, true)
}

// ===== DESIGNATORS AND REFERENCES =====

fn data_ref(s: &mut Session<'_>, input: &str) -> MatchResult {
    sequence(s, RuleId::DataRef, '%', RuleId::PartRef, input)
}

fn part_ref(s: &mut Session<'_>, input: &str) -> MatchResult {
    let options = CallOptions {
        require_args: true,
        ..CallOptions::default()
    };
    call(
        s,
        RuleId::PartRef,
        Callee::Rule(RuleId::Name),
        RuleId::SectionSubscriptList,
        input,
        options,
    )
}

fn section_subscript_list(s: &mut Session<'_>, input: &str) -> MatchResult {
    sequence(s, RuleId::SectionSubscriptList, ',', RuleId::SectionSubscript, input)
}

/// `[lower] : [upper] [: stride]`
fn subscript_triplet(s: &mut Session<'_>, input: &str) -> MatchResult {
    let text = input.trim();
    let masked = mask(text);
    let parts: Vec<&str> = masked.text.split(':').collect();
    if !(2..=3).contains(&parts.len()) {
        return Ok(None);
    }
    let mut children = Vec::with_capacity(parts.len());
    for (i, part) in parts.iter().enumerate() {
        let part = masked.map.unmask_trimmed(part);
        if part.is_empty() {
            // a stride, once written, may not be empty
            if i == 2 {
                return Ok(None);
            }
            children.push(Child::Absent);
            continue;
        }
        let Some(node) = s.match_rule(RuleId::Expr, &part)? else {
            return Ok(None);
        };
        children.push(Child::Node(node));
    }
    Ok(Some(
        Node::new(RuleId::SubscriptTriplet, Shape::Range, children).into_arc(),
    ))
}

fn function_reference(s: &mut Session<'_>, input: &str) -> MatchResult {
    call(
        s,
        RuleId::FunctionReference,
        Callee::Rule(RuleId::Designator),
        RuleId::ActualArgSpecList,
        input,
        CallOptions::default(),
    )
}

fn actual_arg_spec_list(s: &mut Session<'_>, input: &str) -> MatchResult {
    sequence(s, RuleId::ActualArgSpecList, ',', RuleId::ActualArgSpec, input)
}

fn actual_arg_spec(s: &mut Session<'_>, input: &str) -> MatchResult {
    keyword_value(s, RuleId::ActualArgSpec, RuleId::Name, RuleId::Expr, input, true)
}

/// `(/ values /)` or `[ values ]`
fn array_constructor(s: &mut Session<'_>, input: &str) -> MatchResult {
    if let Some(node) = bracketed(
        s,
        RuleId::ArrayConstructor,
        ARRAY_PARENS,
        RuleId::AcValueList,
        input,
        true,
    )? {
        return Ok(Some(node));
    }
    bracketed(s, RuleId::ArrayConstructor, SQUARE, RuleId::AcValueList, input, true)
}

fn ac_value_list(s: &mut Session<'_>, input: &str) -> MatchResult {
    sequence(s, RuleId::AcValueList, ',', RuleId::Expr, input)
}

fn parenthesis(s: &mut Session<'_>, input: &str) -> MatchResult {
    bracketed(s, RuleId::Parenthesis, PARENS, RuleId::Expr, input, true)
}

fn name(_: &mut Session<'_>, input: &str) -> MatchResult {
    pattern(RuleId::Name, &NAME_RE, input, false)
}

fn star(_: &mut Session<'_>, input: &str) -> MatchResult {
    terminal(RuleId::Star, input, &["*"])
}

// ===== REGISTRATION =====

pub fn register(builder: &mut GrammarBuilder) {
    use RuleId as R;

    builder
        .register(RuleDescriptor::text(R::Expr, expr).or(&[R::Level5Expr]))
        .register(RuleDescriptor::text(R::Level5Expr, level_5_expr).or(&[R::EquivOperand]))
        .register(RuleDescriptor::text(R::EquivOperand, equiv_operand).or(&[R::OrOperand]))
        .register(RuleDescriptor::text(R::OrOperand, or_operand).or(&[R::AndOperand]))
        .register(RuleDescriptor::text(R::AndOperand, and_operand).or(&[R::Level4Expr]))
        .register(RuleDescriptor::text(R::Level4Expr, level_4_expr).or(&[R::Level3Expr]))
        .register(RuleDescriptor::text(R::Level3Expr, level_3_expr).or(&[R::Level2Expr]))
        .register(RuleDescriptor::text(R::Level2Expr, level_2_expr).or(&[R::Level2UnaryExpr]))
        .register(
            RuleDescriptor::text(R::Level2UnaryExpr, level_2_unary_expr).or(&[R::AddOperand]),
        )
        .register(RuleDescriptor::text(R::AddOperand, add_operand).or(&[R::MultOperand]))
        .register(RuleDescriptor::text(R::MultOperand, mult_operand).or(&[R::Level1Expr]))
        .register(RuleDescriptor::text(R::Level1Expr, level_1_expr).or(&[R::Primary]));

    builder
        .register(RuleDescriptor::delegate(
            R::Primary,
            &[
                R::Constant,
                R::Designator,
                R::ArrayConstructor,
                R::FunctionReference,
                R::Parenthesis,
            ],
        ))
        .register(RuleDescriptor::delegate(R::Constant, &[R::LiteralConstant]))
        .register(RuleDescriptor::delegate(
            R::LiteralConstant,
            &[
                R::ComplexLiteralConstant,
                R::RealLiteralConstant,
                R::IntLiteralConstant,
                R::LogicalLiteralConstant,
                R::CharLiteralConstant,
                R::BozLiteralConstant,
            ],
        ))
        .register(RuleDescriptor::text(R::IntLiteralConstant, int_literal))
        .register(RuleDescriptor::text(R::RealLiteralConstant, real_literal))
        .register(RuleDescriptor::text(R::ComplexLiteralConstant, complex_literal))
        .register(RuleDescriptor::text(R::LogicalLiteralConstant, logical_literal))
        .register(RuleDescriptor::text(R::CharLiteralConstant, char_literal))
        .register(RuleDescriptor::text(R::BozLiteralConstant, boz_literal));

    builder
        .register(RuleDescriptor::delegate(
            R::Designator,
            &[R::Name, R::DataRef, R::PartRef],
        ))
        .register(RuleDescriptor::text(R::DataRef, data_ref).uses(&[R::PartRef]))
        .register(
            RuleDescriptor::text(R::PartRef, part_ref)
                .or(&[R::Name])
                .uses(&[R::SectionSubscriptList]),
        )
        .register(
            RuleDescriptor::text(R::SectionSubscriptList, section_subscript_list)
                .or(&[R::SectionSubscript]),
        )
        .register(RuleDescriptor::delegate(
            R::SectionSubscript,
            &[R::SubscriptTriplet, R::Expr],
        ))
        .register(RuleDescriptor::text(R::SubscriptTriplet, subscript_triplet).uses(&[R::Expr]))
        .register(
            RuleDescriptor::text(R::FunctionReference, function_reference)
                .uses(&[R::Designator, R::ActualArgSpecList]),
        )
        .register(
            RuleDescriptor::text(R::ActualArgSpecList, actual_arg_spec_list)
                .or(&[R::ActualArgSpec]),
        )
        .register(
            RuleDescriptor::text(R::ActualArgSpec, actual_arg_spec)
                .or(&[R::Expr])
                .uses(&[R::Name]),
        )
        .register(
            RuleDescriptor::text(R::ArrayConstructor, array_constructor).uses(&[R::AcValueList]),
        )
        .register(RuleDescriptor::text(R::AcValueList, ac_value_list).or(&[R::Expr]))
        .register(RuleDescriptor::text(R::Parenthesis, parenthesis).uses(&[R::Expr]))
        .register(RuleDescriptor::text(R::Name, name))
        .register(RuleDescriptor::text(R::Star, star));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::{Grammar, Standard};

    fn parse(input: &str) -> Option<std::sync::Arc<Node>> {
        let mut s = Session::new(Grammar::shared(Standard::F2008));
        s.match_rule(RuleId::Expr, input).unwrap()
    }

    fn rule_of(input: &str) -> RuleId {
        parse(input).unwrap().rule()
    }

    #[test]
    fn test_literals() {
        assert_eq!(rule_of("42"), RuleId::IntLiteralConstant);
        assert_eq!(rule_of("42_i8"), RuleId::IntLiteralConstant);
        assert_eq!(rule_of("1.5d0"), RuleId::RealLiteralConstant);
        assert_eq!(rule_of(".5"), RuleId::RealLiteralConstant);
        assert_eq!(rule_of("'it''s'"), RuleId::CharLiteralConstant);
        assert_eq!(rule_of("z'ff'"), RuleId::BozLiteralConstant);
        assert_eq!(parse(".true.").unwrap().to_source_text(0), ".TRUE.");
    }

    #[test]
    fn test_complex_literal() {
        let node = parse("( 1.0, -2.5 )").unwrap();
        assert_eq!(node.rule(), RuleId::ComplexLiteralConstant);
        assert_eq!(node.to_source_text(0), "(1.0, -2.5)");
        // a parenthesised pair of names is not a literal
        assert!(parse("(a, b)").is_none());
    }

    #[test]
    fn test_precedence() {
        let node = parse("a + b * c").unwrap();
        assert_eq!(node.rule(), RuleId::Level2Expr);
        assert_eq!(node.child_node(2).unwrap().rule(), RuleId::AddOperand);

        let node = parse("a .or. b .and. .not. c").unwrap();
        assert_eq!(node.rule(), RuleId::EquivOperand);
        let rhs = node.child_node(2).unwrap();
        assert_eq!(rhs.rule(), RuleId::OrOperand);
        assert_eq!(rhs.child_node(2).unwrap().rule(), RuleId::AndOperand);

        assert_eq!(rule_of("s // 'x' == t"), RuleId::Level4Expr);
        assert_eq!(rule_of("a .eqv. b"), RuleId::Level5Expr);
    }

    #[test]
    fn test_designators() {
        assert_eq!(rule_of("a%b%c"), RuleId::DataRef);
        assert_eq!(rule_of("a(i)%b"), RuleId::DataRef);
        assert_eq!(rule_of("a(1:n:2, :)"), RuleId::PartRef);
        let node = parse("a(::2)").unwrap();
        assert_eq!(node.to_source_text(0), "a(::2)");
    }

    #[test]
    fn test_function_reference() {
        let node = parse("f(x, dim=1)").unwrap();
        assert_eq!(node.rule(), RuleId::FunctionReference);
        assert_eq!(node.to_source_text(0), "f(x, dim = 1)");
        assert_eq!(rule_of("f()"), RuleId::FunctionReference);
    }

    #[test]
    fn test_array_constructors() {
        assert_eq!(parse("(/ 1, 2, 3 /)").unwrap().to_source_text(0), "(/1, 2, 3/)");
        assert_eq!(parse("[a, b]").unwrap().rule(), RuleId::ArrayConstructor);
        assert_eq!(parse("[x]").unwrap().to_source_text(0), "[x]");
    }

    #[test]
    fn test_parenthesis_and_power() {
        let node = parse("(a + b) ** 2").unwrap();
        assert_eq!(node.rule(), RuleId::MultOperand);
        assert_eq!(node.child_node(0).unwrap().rule(), RuleId::Parenthesis);
        assert_eq!(node.to_source_text(0), "(a + b) ** 2");
    }

    #[test]
    fn test_unary_defined_operator() {
        let node = parse(".inv. m").unwrap();
        assert_eq!(node.rule(), RuleId::Level1Expr);
        assert_eq!(node.to_source_text(0), ".INV. m");
    }

    #[test]
    fn test_rejects() {
        assert!(parse("").is_none());
        assert!(parse("a +").is_none());
        assert!(parse("f(").is_none());
        assert!(parse("1abc").is_none());
    }
}
