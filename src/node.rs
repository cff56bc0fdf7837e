/// Concrete syntax tree produced by the matcher
///
/// A [`Node`] is immutable once built. Its [`Shape`] tells the printer how
/// to glue the children back into Fortran text, so every rule regenerates
/// canonical source without a per-rule printer.
use std::fmt;
use std::sync::Arc;

use crate::grammar::RuleId;

/// Default indentation unit for regenerated source
pub const INDENT_UNIT: &str = "  ";

/// Physical line range of an item, 1-based
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Span {
    pub start_line: usize,
    pub end_line: usize,
    /// Column of the first non-blank character on `start_line`
    pub column: usize,
}

impl Span {
    #[must_use]
    pub fn new(start_line: usize, end_line: usize, column: usize) -> Self {
        Self {
            start_line,
            end_line,
            column,
        }
    }

    /// Span covering both `self` and `other`
    #[must_use]
    pub fn merge(self, other: Span) -> Span {
        if other.start_line < self.start_line {
            Span::new(other.start_line, self.end_line.max(other.end_line), other.column)
        } else {
            Span::new(self.start_line, self.end_line.max(other.end_line), self.column)
        }
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.start_line == self.end_line {
            write!(f, "line {}", self.start_line)
        } else {
            write!(f, "lines {}-{}", self.start_line, self.end_line)
        }
    }
}

/// How a node's children are glued back into text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    /// A single token child
    Token,
    /// `[keyword, rest]`, rendered `KW rest` or `KW :: rest`
    Word { colons: bool },
    /// `[callee, args]`; `parens` is false for the bare form
    Call { parens: bool },
    /// `[op, operand]`
    Unary,
    /// `[lhs, op, rhs]`
    Binary,
    /// Items joined by a separator
    Sequence { separator: char },
    /// `[body]` between a bracket pair
    Bracket {
        open: &'static str,
        close: &'static str,
    },
    /// `[keyword, value]`, rendered `kw = value` (keyword may be absent)
    KeywordValue,
    /// Parts joined by `:`; absent parts render empty
    Range,
    /// Present children joined by single spaces
    Words,
    /// Present children concatenated; tokens carry their own spacing
    Glued,
    /// Full-line or trailing `!` comment
    Comment,
    /// Preprocessor line
    Directive,
    /// Multi-line construct: begin, interior, end
    Block { has_begin: bool, has_end: bool },
}

impl Shape {
    /// Fixed child slots, `true` where the slot may not be absent.
    /// `None` for shapes with any number of children.
    #[must_use]
    pub fn slots(self) -> Option<&'static [bool]> {
        match self {
            Shape::Token | Shape::Comment | Shape::Directive => Some(&[true]),
            Shape::Word { .. } => Some(&[true, false]),
            Shape::Call { parens: false } => Some(&[true]),
            Shape::Call { parens: true } => Some(&[true, false]),
            Shape::Unary => Some(&[true, true]),
            Shape::Binary => Some(&[true, true, true]),
            Shape::Bracket { .. } => Some(&[false]),
            Shape::KeywordValue => Some(&[false, true]),
            Shape::Sequence { .. }
            | Shape::Range
            | Shape::Words
            | Shape::Glued
            | Shape::Block { .. } => None,
        }
    }
}

/// One child slot of a node
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Child {
    Node(Arc<Node>),
    Token(String),
    Absent,
}

impl Child {
    #[must_use]
    pub fn token(text: impl Into<String>) -> Self {
        Child::Token(text.into())
    }

    #[must_use]
    pub fn node(node: Arc<Node>) -> Self {
        Child::Node(node)
    }

    /// Wrap an optional match result
    #[must_use]
    pub fn optional(node: Option<Arc<Node>>) -> Self {
        node.map_or(Child::Absent, Child::Node)
    }

    #[must_use]
    pub fn as_node(&self) -> Option<&Node> {
        match self {
            Child::Node(n) => Some(n),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_absent(&self) -> bool {
        matches!(self, Child::Absent)
    }

    fn inline_text(&self) -> String {
        match self {
            Child::Node(n) => n.inline_text(),
            Child::Token(t) => t.clone(),
            Child::Absent => String::new(),
        }
    }
}

/// A matched grammar rule and its children
#[derive(Debug, Clone)]
pub struct Node {
    rule: RuleId,
    shape: Shape,
    children: Vec<Child>,
    span: Option<Span>,
    label: Option<u32>,
    construct_name: Option<String>,
}

// Structural equality; where a node came from is not part of its identity.
impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        self.rule == other.rule
            && self.shape == other.shape
            && self.children == other.children
            && self.label == other.label
            && self.construct_name == other.construct_name
    }
}

impl Eq for Node {}

impl Node {
    #[must_use]
    pub fn new(rule: RuleId, shape: Shape, children: Vec<Child>) -> Self {
        Self {
            rule,
            shape,
            children,
            span: None,
            label: None,
            construct_name: None,
        }
    }

    /// Leaf node holding one token
    #[must_use]
    pub fn leaf(rule: RuleId, text: impl Into<String>) -> Self {
        Self::new(rule, Shape::Token, vec![Child::token(text)])
    }

    #[must_use]
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = Some(span);
        self
    }

    #[must_use]
    pub fn with_label(mut self, label: Option<u32>) -> Self {
        self.label = label;
        self
    }

    #[must_use]
    pub fn with_construct_name(mut self, name: Option<String>) -> Self {
        self.construct_name = name;
        self
    }

    #[must_use]
    pub fn into_arc(self) -> Arc<Node> {
        Arc::new(self)
    }

    // ===== ACCESSORS =====

    #[must_use]
    pub fn rule(&self) -> RuleId {
        self.rule
    }

    /// Tag naming the grammar rule this node matched
    #[must_use]
    pub fn variant_tag(&self) -> &'static str {
        self.rule.as_str()
    }

    #[must_use]
    pub fn shape(&self) -> Shape {
        self.shape
    }

    #[must_use]
    pub fn children(&self) -> &[Child] {
        &self.children
    }

    #[must_use]
    pub fn span(&self) -> Option<Span> {
        self.span
    }

    #[must_use]
    pub fn label(&self) -> Option<u32> {
        self.label
    }

    #[must_use]
    pub fn construct_name(&self) -> Option<&str> {
        self.construct_name.as_deref()
    }

    #[must_use]
    pub fn child_node(&self, index: usize) -> Option<&Node> {
        self.children.get(index).and_then(Child::as_node)
    }

    #[must_use]
    pub fn token(&self, index: usize) -> Option<&str> {
        match self.children.get(index) {
            Some(Child::Token(t)) => Some(t),
            _ => None,
        }
    }

    /// Text of a leaf node (names, literals, keywords)
    #[must_use]
    pub fn text(&self) -> Option<&str> {
        match self.shape {
            Shape::Token | Shape::Comment | Shape::Directive => self.token(0),
            _ => None,
        }
    }

    /// Check the children against the fixed slots of the node's shape
    pub fn check_arity(&self) -> Result<(), String> {
        let Some(slots) = self.shape.slots() else {
            return Ok(());
        };
        if self.children.len() != slots.len() {
            return Err(format!(
                "{:?} node needs {} children, got {}",
                self.shape,
                slots.len(),
                self.children.len()
            ));
        }
        let missing = slots
            .iter()
            .zip(&self.children)
            .position(|(&required, child)| required && child.is_absent());
        match missing {
            Some(index) => Err(format!("child {index} of a {:?} node is absent", self.shape)),
            None => Ok(()),
        }
    }

    #[must_use]
    pub fn is_block(&self) -> bool {
        matches!(self.shape, Shape::Block { .. })
    }

    /// First direct child matched by the `Name` rule
    #[must_use]
    pub fn declared_name(&self) -> Option<&str> {
        self.children
            .iter()
            .filter_map(Child::as_node)
            .find(|n| n.rule == RuleId::Name)
            .and_then(Node::text)
    }

    /// Pre-order traversal starting at this node
    #[must_use]
    pub fn walk(&self) -> Walk<'_> {
        Walk { stack: vec![self] }
    }

    /// Every node in this subtree (itself included) tagged `rule`
    #[must_use]
    pub fn find_all(&self, rule: RuleId) -> Vec<&Node> {
        self.walk().filter(|n| n.rule == rule).collect()
    }

    // ===== RENDERING =====

    /// Regenerate Fortran source at `indent_level`, two spaces per level
    #[must_use]
    pub fn to_source_text(&self, indent_level: usize) -> String {
        self.to_source_text_with(indent_level, INDENT_UNIT)
    }

    #[must_use]
    pub fn to_source_text_with(&self, indent_level: usize, unit: &str) -> String {
        let mut lines = Vec::new();
        self.render_lines(&mut lines, indent_level, unit);
        lines.join("\n")
    }

    fn render_lines(&self, lines: &mut Vec<String>, level: usize, unit: &str) {
        let Shape::Block { has_begin, has_end } = self.shape else {
            lines.push(format!("{}{}", unit.repeat(level), self.inline_text()));
            return;
        };
        // `CONTAINS` opens its part one level out, like `ELSE`
        let continued = has_begin
            && self
                .children
                .first()
                .and_then(Child::as_node)
                .is_some_and(|begin| begin.rule.is_continuation());
        let body = if has_begin && !continued { level + 1 } else { level };
        let last = self.children.len().saturating_sub(1);
        for (i, child) in self.children.iter().enumerate() {
            let Child::Node(node) = child else {
                continue;
            };
            let child_level = if has_begin && i == 0 {
                if continued {
                    level.saturating_sub(1)
                } else {
                    level
                }
            } else if has_end && i == last {
                level
            } else if node.rule.is_continuation() {
                body.saturating_sub(1)
            } else {
                body
            };
            node.render_lines(lines, child_level, unit);
        }
    }

    fn prefix(&self) -> String {
        let mut prefix = String::new();
        if let Some(label) = self.label {
            prefix.push_str(&format!("{label} "));
        }
        if let Some(name) = &self.construct_name {
            if !self.is_block() {
                prefix.push_str(&format!("{name}: "));
            }
        }
        prefix
    }

    fn inline_text(&self) -> String {
        let body = match self.shape {
            Shape::Token | Shape::Comment | Shape::Directive => {
                self.children.first().map(Child::inline_text).unwrap_or_default()
            }
            Shape::Word { colons } => {
                let keyword = self.child_text(0);
                match self.children.get(1) {
                    Some(Child::Absent) | None => keyword,
                    Some(rest) if colons => format!("{keyword} :: {}", rest.inline_text()),
                    Some(rest) => format!("{keyword} {}", rest.inline_text()),
                }
            }
            Shape::Call { parens } => {
                let callee = self.child_text(0);
                if !parens {
                    return format!("{}{callee}", self.prefix());
                }
                let args = self.child_text(1);
                match self.children.first() {
                    Some(Child::Token(_)) if callee.contains(' ') => format!("{callee} ({args})"),
                    _ => format!("{callee}({args})"),
                }
            }
            Shape::Unary => {
                let op = self.child_text(0);
                let operand = self.child_text(1);
                if op.starts_with('.') {
                    format!("{op} {operand}")
                } else {
                    format!("{op}{operand}")
                }
            }
            Shape::Binary => format!(
                "{} {} {}",
                self.child_text(0),
                self.child_text(1),
                self.child_text(2)
            ),
            Shape::Sequence { separator } => {
                let joiner = match separator {
                    ',' => ", ".to_string(),
                    '%' => "%".to_string(),
                    other => format!(" {other} "),
                };
                self.joined(&joiner, false)
            }
            Shape::Bracket { open, close } => format!("{open}{}{close}", self.child_text(0)),
            Shape::KeywordValue => match self.children.first() {
                Some(Child::Absent) | None => self.child_text(1),
                Some(kw) => format!("{} = {}", kw.inline_text(), self.child_text(1)),
            },
            Shape::Range => self.joined(":", true),
            Shape::Words => self.joined(" ", false),
            Shape::Glued => self.joined("", false),
            Shape::Block { .. } => {
                // a block has no single-line form; flatten it
                let mut lines = Vec::new();
                self.render_lines(&mut lines, 0, "");
                return lines.join("; ");
            }
        };
        format!("{}{body}", self.prefix())
    }

    fn child_text(&self, index: usize) -> String {
        self.children
            .get(index)
            .map(Child::inline_text)
            .unwrap_or_default()
    }

    fn joined(&self, joiner: &str, keep_absent: bool) -> String {
        self.children
            .iter()
            .filter(|c| keep_absent || !c.is_absent())
            .map(Child::inline_text)
            .collect::<Vec<_>>()
            .join(joiner)
    }

    /// Indented one-node-per-line dump, starting at `depth`
    #[must_use]
    pub fn to_debug_tree(&self, depth: usize) -> String {
        let mut lines = Vec::new();
        self.debug_lines(&mut lines, depth);
        lines.join("\n")
    }

    fn debug_lines(&self, lines: &mut Vec<String>, depth: usize) {
        let indent = INDENT_UNIT.repeat(depth);
        let mut head = format!("{indent}{}", self.rule);
        if let Some(label) = self.label {
            head.push_str(&format!(" [label={label}]"));
        }
        if let Some(name) = &self.construct_name {
            head.push_str(&format!(" [name={name}]"));
        }
        if let Some(text) = self.text() {
            lines.push(format!("{head} {text:?}"));
            return;
        }
        lines.push(head);
        let inner = INDENT_UNIT.repeat(depth + 1);
        for child in &self.children {
            match child {
                Child::Node(node) => node.debug_lines(lines, depth + 1),
                Child::Token(t) => lines.push(format!("{inner}{t:?}")),
                Child::Absent => lines.push(format!("{inner}-")),
            }
        }
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_source_text(0))
    }
}

/// Pre-order iterator returned by [`Node::walk`]
pub struct Walk<'a> {
    stack: Vec<&'a Node>,
}

impl<'a> Iterator for Walk<'a> {
    type Item = &'a Node;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        for child in node.children.iter().rev() {
            if let Child::Node(n) = child {
                self.stack.push(n);
            }
        }
        Some(node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name(text: &str) -> Child {
        Child::Node(Node::leaf(RuleId::Name, text).into_arc())
    }

    fn int(text: &str) -> Child {
        Child::Node(Node::leaf(RuleId::IntLiteralConstant, text).into_arc())
    }

    fn assignment(lhs: &str, rhs: &str) -> Arc<Node> {
        Node::new(
            RuleId::AssignmentStmt,
            Shape::Binary,
            vec![name(lhs), Child::token("="), int(rhs)],
        )
        .into_arc()
    }

    #[test]
    fn test_binary_rendering() {
        assert_eq!(assignment("x", "1").to_source_text(0), "x = 1");
        assert_eq!(assignment("x", "1").to_source_text(2), "    x = 1");
    }

    #[test]
    fn test_check_arity() {
        assert!(assignment("x", "1").check_arity().is_ok());
        let short = Node::new(
            RuleId::Level2Expr,
            Shape::Binary,
            vec![Child::Absent, Child::token("+")],
        );
        assert!(short.check_arity().unwrap_err().contains("needs 3 children"));
        let hole = Node::new(
            RuleId::Level2Expr,
            Shape::Binary,
            vec![Child::Absent, Child::token("+"), name("b")],
        );
        assert!(hole.check_arity().unwrap_err().contains("child 0"));
        // optional slots and variadic shapes pass
        let bare = Node::new(
            RuleId::FunctionReference,
            Shape::Call { parens: true },
            vec![name("f"), Child::Absent],
        );
        assert!(bare.check_arity().is_ok());
        let words = Node::new(RuleId::IfThenStmt, Shape::Words, vec![Child::Absent]);
        assert!(words.check_arity().is_ok());
    }

    #[test]
    fn test_equality_ignores_span() {
        let a = Node::leaf(RuleId::Name, "x").with_span(Span::new(1, 1, 1));
        let b = Node::leaf(RuleId::Name, "x").with_span(Span::new(9, 9, 4));
        assert_eq!(a, b);
        let c = Node::leaf(RuleId::Name, "y");
        assert_ne!(a, c);
    }

    #[test]
    fn test_call_rendering() {
        let call = Node::new(
            RuleId::FunctionReference,
            Shape::Call { parens: true },
            vec![name("f"), Child::Absent],
        );
        assert_eq!(call.to_source_text(0), "f()");
        let keyword = Node::new(
            RuleId::SelectCaseStmt,
            Shape::Call { parens: true },
            vec![Child::token("SELECT CASE"), name("i")],
        );
        assert_eq!(keyword.to_source_text(0), "SELECT CASE (i)");
        let intent = Node::new(
            RuleId::IntentSpec,
            Shape::Call { parens: true },
            vec![Child::token("INTENT"), Child::token("IN")],
        );
        assert_eq!(intent.to_source_text(0), "INTENT(IN)");
    }

    #[test]
    fn test_sequence_rendering() {
        let list = Node::new(
            RuleId::ActualArgSpecList,
            Shape::Sequence { separator: ',' },
            vec![name("a"), name("b")],
        );
        assert_eq!(list.to_source_text(0), "a, b");
        let data_ref = Node::new(
            RuleId::DataRef,
            Shape::Sequence { separator: '%' },
            vec![name("a"), name("b")],
        );
        assert_eq!(data_ref.to_source_text(0), "a%b");
    }

    #[test]
    fn test_range_keeps_absent_parts() {
        let range = Node::new(RuleId::SubscriptTriplet, Shape::Range, vec![Child::Absent, int("5")]);
        assert_eq!(range.to_source_text(0), ":5");
    }

    #[test]
    fn test_label_and_name_prefix() {
        let stmt = Node::leaf(RuleId::ContinueStmt, "CONTINUE").with_label(Some(10));
        assert_eq!(stmt.to_source_text(0), "10 CONTINUE");
        let named = Node::new(
            RuleId::NonlabelDoStmt,
            Shape::Words,
            vec![Child::token("DO"), Child::Absent],
        )
        .with_construct_name(Some("outer".into()));
        assert_eq!(named.to_source_text(0), "outer: DO");
    }

    #[test]
    fn test_block_rendering_dedents_continuation() {
        let if_then = Node::leaf(RuleId::IfThenStmt, "IF (x) THEN").into_arc();
        let else_stmt = Node::leaf(RuleId::ElseStmt, "ELSE").into_arc();
        let end_if = Node::leaf(RuleId::EndIfStmt, "END IF").into_arc();
        let block = Node::new(
            RuleId::IfConstruct,
            Shape::Block {
                has_begin: true,
                has_end: true,
            },
            vec![
                Child::Node(if_then),
                Child::Node(assignment("y", "1")),
                Child::Node(else_stmt),
                Child::Node(assignment("y", "2")),
                Child::Node(end_if),
            ],
        );
        assert_eq!(
            block.to_source_text(0),
            "IF (x) THEN\n  y = 1\nELSE\n  y = 2\nEND IF"
        );
        assert_eq!(
            block.to_source_text_with(1, "    "),
            "    IF (x) THEN\n        y = 1\n    ELSE\n        y = 2\n    END IF"
        );
    }

    #[test]
    fn test_walk_and_find_all() {
        let stmt = assignment("x", "1");
        let tags: Vec<&str> = stmt.walk().map(Node::variant_tag).collect();
        assert_eq!(tags, vec!["AssignmentStmt", "Name", "IntLiteralConstant"]);
        assert_eq!(stmt.find_all(RuleId::Name).len(), 1);
    }

    #[test]
    fn test_debug_tree() {
        let tree = assignment("x", "1").to_debug_tree(0);
        assert_eq!(
            tree,
            "AssignmentStmt\n  Name \"x\"\n  \"=\"\n  IntLiteralConstant \"1\""
        );
    }

    #[test]
    fn test_declared_name() {
        let stmt = Node::new(
            RuleId::ProgramStmt,
            Shape::Word { colons: false },
            vec![Child::token("PROGRAM"), name("demo")],
        );
        assert_eq!(stmt.declared_name(), Some("demo"));
        assert_eq!(stmt.to_source_text(0), "PROGRAM demo");
    }
}
