/// Matching combinators
///
/// Each combinator matches one syntactic shape (keyword plus operand,
/// call-style `name(args)`, binary chains, separated lists, ...) by
/// searching the masked input for its delimiters and delegating the
/// pieces to other rules through [`Session::match_rule`].
///
/// All combinators trim their input. Pieces handed to sub-rules are
/// unmasked first, so sub-rules always see the original text.
use std::sync::LazyLock;

use regex::Regex;

use super::{MatchResult, Session};
use crate::error::ParseError;
use crate::grammar::RuleId;
use crate::node::{Child, Node, Shape};
use crate::text::patterns::{
    ADD_OP_RE, AND_OP_RE, CONCAT_OP_RE, DEFINED_OP_RE, EQUIV_OP_RE, INTRINSIC_DOTTED_RE,
    MULT_OP_RE, NOT_OP_RE, OR_OP_RE, POWER_OP_RE, REL_OP_RE,
};
use crate::text::{is_bracketed, mask, split_bracketed};

/// Wrap a finished node as a match; a node whose children do not fit its
/// shape is a fault in the matcher that built it
pub(crate) fn built(rule: RuleId, shape: Shape, children: Vec<Child>) -> MatchResult {
    let node = Node::new(rule, shape, children);
    if let Err(problem) = node.check_arity() {
        return Err(ParseError::internal(rule, &node.to_source_text(0), problem));
    }
    Ok(Some(node.into_arc()))
}

// ===== KEYWORDS =====

/// Strip `keyword` from the front of `input`, case-insensitively.
///
/// Words of a multi-word keyword may be separated by any amount of
/// whitespace, including none (`GOTO`, `ENDDO`, `SELECTCASE`).
#[must_use]
pub fn strip_keyword<'a>(input: &'a str, keyword: &str) -> Option<&'a str> {
    let mut rest = input;
    for word in keyword.split_whitespace() {
        rest = rest.trim_start();
        let head = rest.get(..word.len())?;
        if !head.eq_ignore_ascii_case(word) {
            return None;
        }
        rest = &rest[word.len()..];
    }
    Some(rest)
}

/// Uppercase keyword with single spaces between words
#[must_use]
pub fn canonical_keyword(keyword: &str) -> String {
    keyword
        .split_whitespace()
        .map(str::to_uppercase)
        .collect::<Vec<_>>()
        .join(" ")
}

#[must_use]
pub fn starts_with_word_char(text: &str) -> bool {
    text.chars()
        .next()
        .is_some_and(|c| c.is_alphanumeric() || c == '_')
}

/// Byte offset of the first `=` that is an assignment or keyword `=`,
/// skipping `==`, `/=`, `<=`, `>=` and `=>`
#[must_use]
pub fn find_assignment_eq(masked: &str) -> Option<usize> {
    let bytes = masked.as_bytes();
    bytes.iter().enumerate().find_map(|(i, &b)| {
        if b != b'=' {
            return None;
        }
        let prev = if i > 0 { bytes[i - 1] } else { b' ' };
        let next = bytes.get(i + 1).copied().unwrap_or(b' ');
        let compound = matches!(prev, b'=' | b'/' | b'<' | b'>') || matches!(next, b'=' | b'>');
        (!compound).then_some(i)
    })
}

// ===== TERMINALS =====

/// Match one of `keywords` exactly; yields the canonical uppercase form
pub fn terminal(rule: RuleId, input: &str, keywords: &[&str]) -> MatchResult {
    let text = input.trim();
    for keyword in keywords {
        if let Some(rest) = strip_keyword(text, keyword) {
            if rest.trim().is_empty() {
                return Ok(Some(Node::leaf(rule, canonical_keyword(keyword)).into_arc()));
            }
        }
    }
    Ok(None)
}

/// Match an anchored regex; the token keeps its spelling unless `upper`
pub fn pattern(rule: RuleId, re: &Regex, input: &str, upper: bool) -> MatchResult {
    let text = input.trim();
    if text.is_empty() || !re.is_match(text) {
        return Ok(None);
    }
    let token = if upper {
        text.to_uppercase()
    } else {
        text.to_string()
    };
    Ok(Some(Node::leaf(rule, token).into_arc()))
}

/// Match a literal whose regex captures the value (group 1) and an
/// optional kind parameter (group 2)
pub fn number(rule: RuleId, re: &Regex, input: &str) -> MatchResult {
    let text = input.trim();
    let Some(caps) = re.captures(text) else {
        return Ok(None);
    };
    let Some(value) = caps.get(1) else {
        return Ok(None);
    };
    match caps.get(2) {
        None => Ok(Some(Node::leaf(rule, value.as_str()).into_arc())),
        Some(kind) => built(
            rule,
            Shape::Glued,
            vec![
                Child::token(value.as_str()),
                Child::token(format!("_{}", kind.as_str())),
            ],
        ),
    }
}

// ===== KEYWORD + CLASS =====

#[derive(Debug, Clone, Copy, Default)]
pub struct WordOptions {
    /// Accept `KEYWORD :: rest`
    pub colons: bool,
    /// The operand may not be omitted
    pub require_cls: bool,
}

/// `KEYWORD [::] operand`
pub fn word_cls(
    session: &mut Session<'_>,
    rule: RuleId,
    keyword: &str,
    cls: RuleId,
    input: &str,
    options: WordOptions,
) -> MatchResult {
    let text = input.trim();
    let Some(rest) = strip_keyword(text, keyword) else {
        return Ok(None);
    };
    if starts_with_word_char(rest) {
        return Ok(None);
    }
    let keyword = Child::token(canonical_keyword(keyword));
    let rest = rest.trim();
    if rest.is_empty() {
        if options.require_cls {
            return Ok(None);
        }
        return built(rule, Shape::Word { colons: false }, vec![keyword, Child::Absent]);
    }
    let (rest, colons) = match rest.strip_prefix("::") {
        Some(after) if options.colons && !after.trim().is_empty() => (after.trim(), true),
        Some(_) => return Ok(None),
        None => (rest, false),
    };
    let Some(operand) = session.match_rule(cls, rest)? else {
        return Ok(None);
    };
    built(rule, Shape::Word { colons }, vec![keyword, Child::Node(operand)])
}

// ===== CALL-STYLE =====

/// What precedes the argument parentheses
#[derive(Debug, Clone, Copy)]
pub enum Callee<'a> {
    Rule(RuleId),
    Keyword(&'a str),
}

#[derive(Debug, Clone, Copy, Default)]
pub struct CallOptions {
    /// `name()` is rejected
    pub require_args: bool,
    /// A bare `name` without parentheses is accepted
    pub allow_bare: bool,
    /// Uppercase a leaf callee (intrinsic names)
    pub upper_name: bool,
}

fn match_callee(
    session: &mut Session<'_>,
    callee: Callee<'_>,
    text: &str,
    upper: bool,
) -> Result<Option<Child>, ParseError> {
    match callee {
        Callee::Rule(rule) => {
            let Some(node) = session.match_rule(rule, text)? else {
                return Ok(None);
            };
            if upper {
                if let Some(name) = node.text() {
                    let upper = Node::leaf(node.rule(), name.to_uppercase());
                    return Ok(Some(Child::Node(upper.into_arc())));
                }
            }
            Ok(Some(Child::Node(node)))
        }
        Callee::Keyword(keyword) => Ok(strip_keyword(text, keyword)
            .filter(|rest| rest.trim().is_empty())
            .map(|_| Child::token(canonical_keyword(keyword)))),
    }
}

/// `name(args)`, `name()` or, when allowed, a bare `name`.
///
/// The argument list is the last top-level parenthesised group, which
/// must end the input.
pub fn call(
    session: &mut Session<'_>,
    rule: RuleId,
    callee: Callee<'_>,
    args: RuleId,
    input: &str,
    options: CallOptions,
) -> MatchResult {
    let text = input.trim();
    if text.is_empty() {
        return Ok(None);
    }
    if !text.ends_with(')') {
        if !options.allow_bare {
            return Ok(None);
        }
        let Some(name) = match_callee(session, callee, text, options.upper_name)? else {
            return Ok(None);
        };
        return built(rule, Shape::Call { parens: false }, vec![name]);
    }

    let groups = split_bracketed(text, "(", ")");
    let Some(last) = groups.last() else {
        return Ok(None);
    };
    if !is_bracketed(last, '(', ')') {
        return Ok(None);
    }
    let head = text[..text.len() - last.len()].trim_end();
    if head.is_empty() {
        return Ok(None);
    }
    let Some(name) = match_callee(session, callee, head, options.upper_name)? else {
        return Ok(None);
    };
    let inner = last[1..last.len() - 1].trim();
    if inner.is_empty() {
        if options.require_args {
            return Ok(None);
        }
        return built(rule, Shape::Call { parens: true }, vec![name, Child::Absent]);
    }
    let Some(arguments) = session.match_rule(args, inner)? else {
        return Ok(None);
    };
    built(
        rule,
        Shape::Call { parens: true },
        vec![name, Child::Node(arguments)],
    )
}

// ===== OPERATORS =====

/// Extra condition an operator occurrence must satisfy, checked on the
/// masked text around the match
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpGuard {
    None,
    /// `**` not part of a longer run of stars
    Power,
    /// `*` not part of `**`; `/` not part of `//`, `/=`, `(/` or `/)`
    Mult,
    /// `+`/`-` directly after another operator is a sign, not an operator
    Additive,
    /// `>` of `=>` is not relational
    Relational,
    /// `//` not part of `(//)`
    Concat,
}

/// An operator family: where it can occur and what it may not be
pub struct OpPattern {
    pub re: &'static LazyLock<Regex>,
    pub exclude: Option<&'static LazyLock<Regex>>,
    pub guard: OpGuard,
}

pub static POWER_OP: OpPattern = OpPattern {
    re: &POWER_OP_RE,
    exclude: None,
    guard: OpGuard::Power,
};
pub static MULT_OP: OpPattern = OpPattern {
    re: &MULT_OP_RE,
    exclude: None,
    guard: OpGuard::Mult,
};
pub static ADD_OP: OpPattern = OpPattern {
    re: &ADD_OP_RE,
    exclude: None,
    guard: OpGuard::Additive,
};
pub static CONCAT_OP: OpPattern = OpPattern {
    re: &CONCAT_OP_RE,
    exclude: None,
    guard: OpGuard::Concat,
};
pub static REL_OP: OpPattern = OpPattern {
    re: &REL_OP_RE,
    exclude: None,
    guard: OpGuard::Relational,
};
pub static NOT_OP: OpPattern = OpPattern {
    re: &NOT_OP_RE,
    exclude: None,
    guard: OpGuard::None,
};
pub static AND_OP: OpPattern = OpPattern {
    re: &AND_OP_RE,
    exclude: None,
    guard: OpGuard::None,
};
pub static OR_OP: OpPattern = OpPattern {
    re: &OR_OP_RE,
    exclude: None,
    guard: OpGuard::None,
};
pub static EQUIV_OP: OpPattern = OpPattern {
    re: &EQUIV_OP_RE,
    exclude: None,
    guard: OpGuard::None,
};
pub static DEFINED_OP: OpPattern = OpPattern {
    re: &DEFINED_OP_RE,
    exclude: Some(&INTRINSIC_DOTTED_RE),
    guard: OpGuard::None,
};

static TRAILING_DOTTED_OP_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\.[a-z]+\.$").unwrap_or_else(|e| panic!("Invalid regex pattern: {e}"))
});

impl OpPattern {
    fn guard_accepts(&self, text: &str, start: usize, end: usize) -> bool {
        let before = &text[..start];
        let after = &text[end..];
        let prev = before.chars().next_back();
        let next = after.chars().next();
        let op = &text[start..end];
        match self.guard {
            OpGuard::None => true,
            OpGuard::Power => prev != Some('*') && next != Some('*'),
            OpGuard::Mult => match op {
                "*" => prev != Some('*') && next != Some('*'),
                _ => {
                    !matches!(prev, Some('/' | '('))
                        && !matches!(next, Some('/' | '=' | ')'))
                }
            },
            OpGuard::Additive => {
                let trimmed = before.trim_end();
                match trimmed.chars().next_back() {
                    None => false,
                    Some('*' | '/' | '+' | '-' | '=' | '<' | '>' | '(' | ',' | ':') => false,
                    Some('.') => !TRAILING_DOTTED_OP_RE.is_match(trimmed),
                    Some(_) => true,
                }
            }
            OpGuard::Relational => match op {
                ">" => prev != Some('='),
                _ => true,
            },
            OpGuard::Concat => prev != Some('(') && next != Some(')'),
        }
    }

    /// Valid operator occurrences in `masked`, left to right
    fn occurrences(&self, masked: &str) -> Vec<(usize, usize)> {
        self.re
            .find_iter(masked)
            .filter(|m| !self.exclude.is_some_and(|ex| ex.is_match(m.as_str())))
            .filter(|m| self.guard_accepts(masked, m.start(), m.end()))
            .filter(|m| {
                !masked[..m.start()].trim().is_empty() && !masked[m.end()..].trim().is_empty()
            })
            .map(|m| (m.start(), m.end()))
            .collect()
    }
}

fn canonical_op(op: &str) -> String {
    op.chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_uppercase()
}

/// `op operand`, the operator leading the input
pub fn unary_op(
    session: &mut Session<'_>,
    rule: RuleId,
    op: &OpPattern,
    rhs: RuleId,
    input: &str,
) -> MatchResult {
    let text = input.trim();
    let Some(found) = op.re.find(text) else {
        return Ok(None);
    };
    if found.start() != 0 || op.exclude.is_some_and(|ex| ex.is_match(found.as_str())) {
        return Ok(None);
    }
    let operand = text[found.end()..].trim();
    if operand.is_empty() {
        return Ok(None);
    }
    let Some(node) = session.match_rule(rhs, operand)? else {
        return Ok(None);
    };
    built(
        rule,
        Shape::Unary,
        vec![Child::token(canonical_op(found.as_str())), Child::Node(node)],
    )
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Assoc {
    Left,
    Right,
}

/// `lhs op rhs`.
///
/// Left-associative rules split at the rightmost valid operator,
/// right-associative ones at the leftmost. A rule that recurses into
/// itself on its associative side is folded as a loop over the whole
/// operator chain.
pub fn binary_op(
    session: &mut Session<'_>,
    rule: RuleId,
    lhs: RuleId,
    op: &OpPattern,
    rhs: RuleId,
    input: &str,
    assoc: Assoc,
) -> MatchResult {
    let text = input.trim();
    let masked = mask(text);
    let ops = op.occurrences(&masked.text);
    if ops.is_empty() {
        return Ok(None);
    }

    let chained = match assoc {
        Assoc::Left => lhs == rule,
        Assoc::Right => rhs == rule,
    };
    if chained && ops.len() > 1 {
        let pieces = split_at_ops(&masked.text, &ops);
        let operands: Vec<String> = pieces
            .iter()
            .map(|piece| masked.map.unmask_trimmed(piece))
            .collect();
        let operators: Vec<String> = ops
            .iter()
            .map(|&(s, e)| canonical_op(&masked.text[s..e]))
            .collect();
        if let Some(node) = fold_chain(session, rule, lhs, rhs, &operands, &operators, assoc)? {
            return Ok(Some(node));
        }
    }

    let ordered: Vec<(usize, usize)> = match assoc {
        Assoc::Left => ops.iter().rev().copied().collect(),
        Assoc::Right => ops,
    };
    for (start, end) in ordered {
        let left = masked.map.unmask_trimmed(&masked.text[..start]);
        let right = masked.map.unmask_trimmed(&masked.text[end..]);
        let Some(left_node) = session.match_rule(lhs, &left)? else {
            continue;
        };
        let Some(right_node) = session.match_rule(rhs, &right)? else {
            continue;
        };
        return built(
            rule,
            Shape::Binary,
            vec![
                Child::Node(left_node),
                Child::token(canonical_op(&masked.text[start..end])),
                Child::Node(right_node),
            ],
        );
    }
    Ok(None)
}

fn split_at_ops<'a>(text: &'a str, ops: &[(usize, usize)]) -> Vec<&'a str> {
    let mut pieces = Vec::with_capacity(ops.len() + 1);
    let mut last = 0;
    for &(start, end) in ops {
        pieces.push(&text[last..start]);
        last = end;
    }
    pieces.push(&text[last..]);
    pieces
}

fn fold_chain(
    session: &mut Session<'_>,
    rule: RuleId,
    lhs: RuleId,
    rhs: RuleId,
    operands: &[String],
    operators: &[String],
    assoc: Assoc,
) -> MatchResult {
    let binary = |left, op: &str, right| {
        Node::new(
            rule,
            Shape::Binary,
            vec![Child::Node(left), Child::token(op), Child::Node(right)],
        )
        .into_arc()
    };
    match assoc {
        Assoc::Left => {
            let Some(mut acc) = session.match_rule(rule, &operands[0])? else {
                return Ok(None);
            };
            for (operand, op) in operands[1..].iter().zip(operators) {
                let Some(right) = session.match_rule(rhs, operand)? else {
                    return Ok(None);
                };
                acc = binary(acc, op.as_str(), right);
            }
            Ok(Some(acc))
        }
        Assoc::Right => {
            let Some((last, init)) = operands.split_last() else {
                return Ok(None);
            };
            let Some(mut acc) = session.match_rule(rule, last)? else {
                return Ok(None);
            };
            for (operand, op) in init.iter().zip(operators).rev() {
                let Some(left) = session.match_rule(lhs, operand)? else {
                    return Ok(None);
                };
                acc = binary(left, op.as_str(), acc);
            }
            Ok(Some(acc))
        }
    }
}

// ===== LISTS AND BRACKETS =====

/// `item sep item [sep item ...]`; a single item is not a list
pub fn sequence(
    session: &mut Session<'_>,
    rule: RuleId,
    separator: char,
    item: RuleId,
    input: &str,
) -> MatchResult {
    if separator.is_whitespace() {
        return Err(ParseError::internal(
            rule,
            input,
            "sequence separator may not be whitespace",
        ));
    }
    let text = input.trim();
    let masked = mask(text);
    let pieces: Vec<&str> = masked.text.split(separator).collect();
    if pieces.len() < 2 {
        return Ok(None);
    }
    let mut children = Vec::with_capacity(pieces.len());
    for piece in pieces {
        let piece = masked.map.unmask_trimmed(piece);
        if piece.is_empty() {
            return Ok(None);
        }
        let Some(node) = session.match_rule(item, &piece)? else {
            return Ok(None);
        };
        children.push(Child::Node(node));
    }
    built(rule, Shape::Sequence { separator }, children)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BracketPair {
    pub open: &'static str,
    pub close: &'static str,
}

pub const PARENS: BracketPair = BracketPair {
    open: "(",
    close: ")",
};
pub const ARRAY_PARENS: BracketPair = BracketPair {
    open: "(/",
    close: "/)",
};
pub const SQUARE: BracketPair = BracketPair {
    open: "[",
    close: "]",
};

/// The whole input is one bracket group
pub fn bracketed(
    session: &mut Session<'_>,
    rule: RuleId,
    pair: BracketPair,
    body: RuleId,
    input: &str,
    require_body: bool,
) -> MatchResult {
    let text = input.trim();
    let Some(inner) = text
        .strip_prefix(pair.open)
        .and_then(|rest| rest.strip_suffix(pair.close))
    else {
        return Ok(None);
    };
    if split_bracketed(text, "([", ")]").len() != 1 {
        return Ok(None);
    }
    let shape = Shape::Bracket {
        open: pair.open,
        close: pair.close,
    };
    let inner = inner.trim();
    if inner.is_empty() {
        if require_body {
            return Ok(None);
        }
        return built(rule, shape, vec![Child::Absent]);
    }
    let Some(node) = session.match_rule(body, inner)? else {
        return Ok(None);
    };
    built(rule, shape, vec![Child::Node(node)])
}

/// `[keyword =] value`
pub fn keyword_value(
    session: &mut Session<'_>,
    rule: RuleId,
    lhs: RuleId,
    rhs: RuleId,
    input: &str,
    require_lhs: bool,
) -> MatchResult {
    let text = input.trim();
    let masked = mask(text);
    if let Some(pos) = find_assignment_eq(&masked.text) {
        let keyword = masked.map.unmask_trimmed(&masked.text[..pos]);
        let value = masked.map.unmask_trimmed(&masked.text[pos + 1..]);
        if !keyword.is_empty() && !value.is_empty() {
            if let Some(keyword) = session.match_rule(lhs, &keyword)? {
                if let Some(value) = session.match_rule(rhs, &value)? {
                    return built(
                        rule,
                        Shape::KeywordValue,
                        vec![Child::Node(keyword), Child::Node(value)],
                    );
                }
            }
        }
    }
    if require_lhs {
        return Ok(None);
    }
    let Some(value) = session.match_rule(rhs, text)? else {
        return Ok(None);
    };
    built(rule, Shape::KeywordValue, vec![Child::Absent, Child::Node(value)])
}

/// `[lhs] : [rhs]` at the top level
pub fn separator(
    session: &mut Session<'_>,
    rule: RuleId,
    lhs: RuleId,
    rhs: RuleId,
    input: &str,
) -> MatchResult {
    let text = input.trim();
    let masked = mask(text);
    let Some(pos) = masked.text.find(':') else {
        return Ok(None);
    };
    if masked.text[pos + 1..].starts_with(':') {
        return Ok(None);
    }
    let mut children = Vec::with_capacity(2);
    for (piece, sub) in [(&masked.text[..pos], lhs), (&masked.text[pos + 1..], rhs)] {
        let piece = masked.map.unmask_trimmed(piece);
        if piece.is_empty() {
            children.push(Child::Absent);
            continue;
        }
        let Some(node) = session.match_rule(sub, &piece)? else {
            return Ok(None);
        };
        children.push(Child::Node(node));
    }
    built(rule, Shape::Range, children)
}

// ===== END STATEMENTS =====

/// `END`, `END <KW>` or `END <KW> <name>`; `ENDDO` style is accepted
pub fn end_stmt(
    session: &mut Session<'_>,
    rule: RuleId,
    keyword: &str,
    name_rule: Option<RuleId>,
    input: &str,
    require_type: bool,
) -> MatchResult {
    let text = input.trim();
    let Some(rest) = strip_keyword(text, "END") else {
        return Ok(None);
    };
    let rest = rest.trim_start();
    if rest.is_empty() {
        if require_type {
            return Ok(None);
        }
        return built(
            rule,
            Shape::Words,
            vec![Child::token("END"), Child::Absent, Child::Absent],
        );
    }
    let Some(after) = strip_keyword(rest, keyword) else {
        return Ok(None);
    };
    if starts_with_word_char(after) {
        return Ok(None);
    }
    let keyword = Child::token(canonical_keyword(keyword));
    let name = after.trim();
    if name.is_empty() {
        return built(rule, Shape::Words, vec![Child::token("END"), keyword, Child::Absent]);
    }
    let Some(name_rule) = name_rule else {
        return Ok(None);
    };
    let Some(name) = session.match_rule(name_rule, name)? else {
        return Ok(None);
    };
    built(
        rule,
        Shape::Words,
        vec![Child::token("END"), keyword, Child::Node(name)],
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::{Grammar, Standard};

    fn session() -> Session<'static> {
        Session::new(Grammar::shared(Standard::F2008))
    }

    fn src(result: MatchResult) -> String {
        result.unwrap().unwrap().to_source_text(0)
    }

    #[test]
    fn test_built_rejects_malformed_nodes() {
        let err = built(
            RuleId::Level2Expr,
            Shape::Binary,
            vec![Child::Absent, Child::token("+")],
        )
        .unwrap_err();
        assert!(err.is_internal());
        let err = built(
            RuleId::ActualArgSpec,
            Shape::KeywordValue,
            vec![Child::token("stat"), Child::Absent],
        );
        assert!(err.is_err());
        assert!(built(RuleId::Name, Shape::Token, vec![Child::token("x")]).unwrap().is_some());
    }

    #[test]
    fn test_strip_keyword() {
        assert_eq!(strip_keyword("goto 10", "GO TO"), Some(" 10"));
        assert_eq!(strip_keyword("go  to 10", "GO TO"), Some(" 10"));
        assert_eq!(strip_keyword("enddo", "END DO"), Some(""));
        assert_eq!(strip_keyword("end", "END DO"), None);
        assert_eq!(canonical_keyword("go  to"), "GO TO");
    }

    #[test]
    fn test_find_assignment_eq() {
        assert_eq!(find_assignment_eq("a = b"), Some(2));
        assert_eq!(find_assignment_eq("a == b"), None);
        assert_eq!(find_assignment_eq("p => t"), None);
        assert_eq!(find_assignment_eq("a /= b"), None);
        assert_eq!(find_assignment_eq("x <= y"), None);
    }

    #[test]
    fn test_terminal() {
        let node = terminal(RuleId::ContinueStmt, " continue ", &["CONTINUE"]).unwrap().unwrap();
        assert_eq!(node.text(), Some("CONTINUE"));
        assert!(terminal(RuleId::ContinueStmt, "continue x", &["CONTINUE"]).unwrap().is_none());
        let go = terminal(RuleId::GotoStmt, "goto", &["GO TO"]).unwrap().unwrap();
        assert_eq!(go.text(), Some("GO TO"));
    }

    #[test]
    fn test_word_cls() {
        let mut s = session();
        let opts = WordOptions::default();
        assert_eq!(
            src(word_cls(&mut s, RuleId::CycleStmt, "CYCLE", RuleId::Name, "cycle outer", opts)),
            "CYCLE outer"
        );
        assert_eq!(
            src(word_cls(&mut s, RuleId::CycleStmt, "CYCLE", RuleId::Name, "cycle", opts)),
            "CYCLE"
        );
        // keyword must end at a word boundary
        assert!(word_cls(&mut s, RuleId::CycleStmt, "CYCLE", RuleId::Name, "cyclex", opts)
            .unwrap()
            .is_none());
        // `::` only when allowed
        assert!(word_cls(&mut s, RuleId::AccessStmt, "PUBLIC", RuleId::Name, "public :: a", opts)
            .unwrap()
            .is_none());
        let colons = WordOptions {
            colons: true,
            require_cls: false,
        };
        assert_eq!(
            src(word_cls(&mut s, RuleId::AccessStmt, "PUBLIC", RuleId::Name, "public :: a", colons)),
            "PUBLIC :: a"
        );
        assert!(word_cls(&mut s, RuleId::AccessStmt, "PUBLIC", RuleId::Name, "public ::", colons)
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_call_forms() {
        let mut s = session();
        let opts = CallOptions {
            allow_bare: true,
            ..CallOptions::default()
        };
        let callee = Callee::Rule(RuleId::Name);
        let args = RuleId::ActualArgSpecList;
        assert_eq!(
            src(call(&mut s, RuleId::ProcedureCall, callee, args, "f(a, b)", opts)),
            "f(a, b)"
        );
        assert_eq!(src(call(&mut s, RuleId::ProcedureCall, callee, args, "f()", opts)), "f()");
        assert_eq!(src(call(&mut s, RuleId::ProcedureCall, callee, args, "f", opts)), "f");
        let strict = CallOptions {
            require_args: true,
            ..CallOptions::default()
        };
        assert!(call(&mut s, RuleId::ProcedureCall, callee, args, "f()", strict).unwrap().is_none());
        assert!(call(&mut s, RuleId::ProcedureCall, callee, args, "f", strict).unwrap().is_none());
        assert!(call(&mut s, RuleId::ProcedureCall, callee, args, "(a)", opts).unwrap().is_none());
    }

    #[test]
    fn test_call_uses_last_group() {
        let mut s = session();
        let node = call(
            &mut s,
            RuleId::PartRef,
            Callee::Rule(RuleId::Designator),
            RuleId::SectionSubscriptList,
            "a(1)%b(2, 3)",
            CallOptions::default(),
        )
        .unwrap()
        .unwrap();
        assert_eq!(node.child_node(0).unwrap().to_source_text(0), "a(1)%b");
    }

    #[test]
    fn test_binary_left_assoc() {
        let mut s = session();
        let node = s.match_rule(RuleId::Expr, "a - b - c").unwrap().unwrap();
        assert_eq!(node.rule(), RuleId::Level2Expr);
        let lhs = node.child_node(0).unwrap();
        assert_eq!(lhs.to_source_text(0), "a - b");
        assert_eq!(node.child_node(2).unwrap().to_source_text(0), "c");
    }

    #[test]
    fn test_binary_right_assoc() {
        let mut s = session();
        let node = s.match_rule(RuleId::Expr, "2**3**2").unwrap().unwrap();
        assert_eq!(node.rule(), RuleId::MultOperand);
        assert_eq!(node.child_node(0).unwrap().to_source_text(0), "2");
        assert_eq!(node.child_node(2).unwrap().to_source_text(0), "3 ** 2");
        assert_eq!(node.to_source_text(0), "2 ** 3 ** 2");
    }

    #[test]
    fn test_unary_sign_not_split() {
        let mut s = session();
        let node = s.match_rule(RuleId::Expr, "a + -b").unwrap();
        assert!(node.is_none());
        let node = s.match_rule(RuleId::Expr, "-a + b").unwrap().unwrap();
        assert_eq!(node.rule(), RuleId::Level2Expr);
        assert_eq!(node.child_node(0).unwrap().rule(), RuleId::Level2UnaryExpr);
    }

    #[test]
    fn test_exponent_not_split() {
        let mut s = session();
        let node = s.match_rule(RuleId::Expr, "1.0e-5 + x").unwrap().unwrap();
        assert_eq!(node.child_node(0).unwrap().to_source_text(0), "1.0e-5");
    }

    #[test]
    fn test_defined_op_excludes_intrinsics() {
        let mut s = session();
        let node = s.match_rule(RuleId::Expr, "a .and. b").unwrap().unwrap();
        assert_eq!(node.rule(), RuleId::OrOperand);
        let node = s.match_rule(RuleId::Expr, "a .cross. b").unwrap().unwrap();
        assert_eq!(node.rule(), RuleId::Expr);
        assert_eq!(node.token(1), Some(".CROSS."));
    }

    #[test]
    fn test_sequence() {
        let mut s = session();
        let node = sequence(&mut s, RuleId::ActualArgSpecList, ',', RuleId::Expr, "a, f(b, c), 'x,y'")
            .unwrap()
            .unwrap();
        assert_eq!(node.children().len(), 3);
        assert_eq!(node.to_source_text(0), "a, f(b, c), 'x,y'");
        // one element is not a list
        assert!(sequence(&mut s, RuleId::ActualArgSpecList, ',', RuleId::Expr, "a")
            .unwrap()
            .is_none());
        assert!(sequence(&mut s, RuleId::ActualArgSpecList, ',', RuleId::Expr, "a,,b")
            .unwrap()
            .is_none());
        let err = sequence(&mut s, RuleId::ActualArgSpecList, ' ', RuleId::Expr, "a b").unwrap_err();
        assert!(err.is_internal());
    }

    #[test]
    fn test_bracketed() {
        let mut s = session();
        assert_eq!(
            src(bracketed(&mut s, RuleId::Parenthesis, PARENS, RuleId::Expr, "( a + b )", true)),
            "(a + b)"
        );
        assert!(bracketed(&mut s, RuleId::Parenthesis, PARENS, RuleId::Expr, "(a) + (b)", true)
            .unwrap()
            .is_none());
        assert!(bracketed(&mut s, RuleId::Parenthesis, PARENS, RuleId::Expr, "()", true)
            .unwrap()
            .is_none());
        assert_eq!(
            src(bracketed(&mut s, RuleId::ArrayConstructor, ARRAY_PARENS, RuleId::AcValueList, "(/ 1, 2 /)", true)),
            "(/1, 2/)"
        );
    }

    #[test]
    fn test_keyword_value() {
        let mut s = session();
        assert_eq!(
            src(keyword_value(&mut s, RuleId::ActualArgSpec, RuleId::Name, RuleId::Expr, "dim=1", true)),
            "dim = 1"
        );
        assert!(keyword_value(&mut s, RuleId::ActualArgSpec, RuleId::Name, RuleId::Expr, "a == 1", true)
            .unwrap()
            .is_none());
        let node = keyword_value(&mut s, RuleId::ActualArgSpec, RuleId::Name, RuleId::Expr, "a == 1", false)
            .unwrap()
            .unwrap();
        assert!(node.children()[0].is_absent());
    }

    #[test]
    fn test_separator() {
        let mut s = session();
        assert_eq!(src(separator(&mut s, RuleId::CaseRange, RuleId::Expr, RuleId::Expr, "1 : 3")), "1:3");
        assert_eq!(src(separator(&mut s, RuleId::CaseRange, RuleId::Expr, RuleId::Expr, ":3")), ":3");
        assert_eq!(src(separator(&mut s, RuleId::CaseRange, RuleId::Expr, RuleId::Expr, ":")), ":");
        assert!(separator(&mut s, RuleId::CaseRange, RuleId::Expr, RuleId::Expr, "a :: b")
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_end_stmt() {
        let mut s = session();
        let name = Some(RuleId::Name);
        assert_eq!(src(end_stmt(&mut s, RuleId::EndDoStmt, "DO", name, "enddo", true)), "END DO");
        assert_eq!(
            src(end_stmt(&mut s, RuleId::EndDoStmt, "DO", name, "END DO outer", true)),
            "END DO outer"
        );
        assert!(end_stmt(&mut s, RuleId::EndDoStmt, "DO", name, "end", true).unwrap().is_none());
        assert_eq!(src(end_stmt(&mut s, RuleId::EndProgramStmt, "PROGRAM", name, "end", false)), "END");
        assert!(end_stmt(&mut s, RuleId::EndDoStmt, "DO", name, "endpoint = 1", true)
            .unwrap()
            .is_none());
        assert!(end_stmt(&mut s, RuleId::EndIfStmt, "IF", None, "end if x", true)
            .unwrap()
            .is_none());
    }
}
