/// Block matching
///
/// A block rule owns a run of items: an optional begin statement, interior
/// items tried against the block's candidates, and an optional end
/// statement. Blocks commit once their begin statement matches; from then
/// on a statement nobody recognizes is reported and skipped, and a
/// statement that ends an enclosing block closes this one early.
use std::sync::Arc;

use super::spec::{BlockSpec, NameCheck};
use crate::diagnostics::Severity;
use crate::engine::{MatchResult, Session};
use crate::error::ParseError;
use crate::grammar::{RuleDescriptor, RuleId};
use crate::node::{Child, Node, Shape, Span};
use crate::reader::{Item, ItemKind, ItemSource};
use crate::text::comment_start;
use crate::text::patterns::INCLUDE_LINE_RE;

/// Outcome of offering an item to a block
enum Attempt {
    Matched(Arc<Node>),
    /// Not ours; the item is handed back untouched
    Declined(Item),
}

/// A block while its items are being collected
struct OpenBlock<'s> {
    rule: RuleId,
    spec: &'s BlockSpec,
    children: Vec<Child>,
    /// Repaired-away comments waiting for the next child
    deferred: Vec<Arc<Node>>,
    begin_item: Option<Item>,
    begin_name: Option<String>,
    has_begin: bool,
    has_end: bool,
    /// Label a label-terminated DO waits for
    label: Option<u32>,
    /// First interior candidate still allowed under strict ordering
    start: usize,
}

impl<'s> OpenBlock<'s> {
    fn new(rule: RuleId, spec: &'s BlockSpec) -> Self {
        Self {
            rule,
            spec,
            children: Vec::new(),
            deferred: Vec::new(),
            begin_item: None,
            begin_name: None,
            has_begin: false,
            has_end: false,
            label: None,
            start: 0,
        }
    }

    fn open(&mut self, begin: Arc<Node>, item: Item) {
        self.begin_name = match self.spec.match_names {
            NameCheck::None => None,
            NameCheck::ConstructName => item.name.clone(),
            NameCheck::StatementName(_) => begin.declared_name().map(str::to_string),
        };
        if self.spec.label_terminated {
            self.label = do_label(&begin);
        }
        self.has_begin = true;
        self.begin_item = Some(item);
        self.children.push(Child::Node(begin));
    }

    fn push(&mut self, node: Arc<Node>) {
        self.children.push(Child::Node(node));
        for comment in self.deferred.drain(..) {
            self.children.push(Child::Node(comment));
        }
    }

    fn advance(&mut self, matched: RuleId) {
        if !self.spec.strict_order {
            return;
        }
        if let Some(pos) = self.spec.interior.iter().position(|&r| r == matched) {
            self.start = self.start.max(pos);
        }
    }

    /// The end rule and the label it must carry
    fn own_end(&self) -> Option<(RuleId, Option<u32>)> {
        let label = if self.spec.label_terminated {
            self.label
        } else {
            None
        };
        self.spec.end.map(|end| (end, label))
    }

    fn finish(mut self) -> Arc<Node> {
        let deferred = std::mem::take(&mut self.deferred);
        self.children.extend(deferred.into_iter().map(Child::Node));
        let spans: Vec<Span> = self
            .children
            .iter()
            .filter_map(Child::as_node)
            .filter_map(Node::span)
            .collect();
        let name = match self.spec.match_names {
            NameCheck::ConstructName => self.begin_item.and_then(|item| item.name),
            _ => None,
        };
        tracing::trace!(rule = %self.rule, children = self.children.len(), "block closed");
        let mut node = Node::new(
            self.rule,
            Shape::Block {
                has_begin: self.has_begin,
                has_end: self.has_end,
            },
            self.children,
        )
        .with_construct_name(name);
        if let (Some(first), Some(last)) = (spans.first(), spans.last()) {
            node = node.with_span(first.merge(*last));
        }
        node.into_arc()
    }
}

/// Label of a `DO 10 ...` begin statement
fn do_label(begin: &Node) -> Option<u32> {
    begin.children().iter().find_map(|child| match child {
        Child::Token(t) if !t.is_empty() && t.chars().all(|c| c.is_ascii_digit()) => {
            t.parse().ok()
        }
        _ => None,
    })
}

/// Comments, directives and INCLUDE lines, kept wherever they appear
fn trivia_node(item: &Item) -> Arc<Node> {
    let node = match item.kind {
        ItemKind::Include => {
            let file = INCLUDE_LINE_RE
                .captures(item.text.trim())
                .map_or_else(|| item.text.clone(), |caps| caps[1].to_string());
            Node::new(
                RuleId::IncludeStmt,
                Shape::Word { colons: false },
                vec![Child::token("INCLUDE"), Child::token(file)],
            )
            .with_label(item.label)
        }
        ItemKind::Directive => Node::new(
            RuleId::Directive,
            Shape::Directive,
            vec![Child::token(item.text.as_str())],
        ),
        _ => Node::new(RuleId::Comment, Shape::Comment, vec![Child::token(item.text.as_str())]),
    };
    node.with_span(item.span).into_arc()
}

fn give_back(rule: RuleId, source: &mut dyn ItemSource, item: Item) -> Result<(), ParseError> {
    source
        .push_back(item)
        .map_err(|item| ParseError::internal(rule, &item.text, "pushback slot already taken"))
}

/// Light repairs tried before a statement is declared unrecognized:
/// an inline `!` comment is split off, a trailing `;` dropped
fn repair(item: &Item) -> Option<(Item, Option<Item>, &'static str)> {
    if let Some(pos) = comment_start(&item.text) {
        let code = item.text[..pos].trim_end();
        if !code.is_empty() {
            let comment = Item::comment(item.text[pos..].trim_end(), item.span);
            return Some((
                item.with_text(code),
                Some(comment),
                "moved inline comment after the statement",
            ));
        }
    }
    let code = item.text.trim_end().strip_suffix(';')?.trim_end();
    if code.is_empty() {
        return None;
    }
    Some((item.with_text(code), None, "dropped trailing ';'"))
}

impl Session<'_> {
    /// Match a block rule against the items at the front of `source`.
    ///
    /// `Ok(None)` leaves `source` as it was. Syntax problems inside a
    /// block that did start are recorded as diagnostics, not returned.
    pub fn match_block(&mut self, rule: RuleId, source: &mut dyn ItemSource) -> MatchResult {
        let Some(first) = source.next_item() else {
            return Ok(None);
        };
        match self.offer(rule, first, source)? {
            Attempt::Matched(node) => Ok(Some(node)),
            Attempt::Declined(item) => {
                give_back(rule, source, item)?;
                Ok(None)
            }
        }
    }

    /// Match one statement item against a line rule; the node carries the
    /// item's label, construct name and span
    pub fn match_statement(&mut self, rule: RuleId, item: &Item) -> MatchResult {
        let Some(node) = self.match_rule(rule, &item.text)? else {
            return Ok(None);
        };
        let node = Node::clone(&node)
            .with_label(item.label)
            .with_construct_name(item.name.clone())
            .with_span(item.span);
        Ok(Some(node.into_arc()))
    }

    fn offer(
        &mut self,
        rule: RuleId,
        item: Item,
        source: &mut dyn ItemSource,
    ) -> Result<Attempt, ParseError> {
        let grammar = self.grammar;
        let Some(spec) = grammar.rule(rule).and_then(RuleDescriptor::block_spec) else {
            return Err(ParseError::internal(rule, &item.text, "not a block rule"));
        };
        if let Some(limit) = self.options.max_depth {
            if self.depth >= limit {
                return Err(ParseError::NestingTooDeep { limit, rule });
            }
        }
        self.depth += 1;
        let result = self.open_block(rule, spec, item, source);
        self.depth -= 1;
        result
    }

    fn open_block(
        &mut self,
        rule: RuleId,
        spec: &BlockSpec,
        item: Item,
        source: &mut dyn ItemSource,
    ) -> Result<Attempt, ParseError> {
        let mut block = OpenBlock::new(rule, spec);
        let mut pending = None;
        match spec.begin {
            Some(begin_rule) => {
                if !item.is_statement() {
                    return Ok(Attempt::Declined(item));
                }
                let Some(begin) = self.match_statement(begin_rule, &item)? else {
                    return Ok(Attempt::Declined(item));
                };
                block.open(begin, item);
            }
            None => pending = Some(item),
        }

        let own_end = block.own_end();
        if let Some(end) = own_end {
            self.open_ends.push(end);
        }
        let result = self.collect(&mut block, pending, source);
        if own_end.is_some() {
            self.open_ends.pop();
        }
        match result? {
            Some(declined) => Ok(Attempt::Declined(declined)),
            None => Ok(Attempt::Matched(block.finish())),
        }
    }

    /// Collect items until the block ends. Returns the first item back
    /// when a begin-less block matched nothing at all.
    fn collect(
        &mut self,
        block: &mut OpenBlock<'_>,
        mut pending: Option<Item>,
        source: &mut dyn ItemSource,
    ) -> Result<Option<Item>, ParseError> {
        let spec = block.spec;
        loop {
            let Some(item) = pending.take().or_else(|| source.next_item()) else {
                self.report_unclosed(block);
                return Ok(None);
            };
            if !item.is_statement() {
                block.push(trivia_node(&item));
                continue;
            }

            if let Some((end_rule, label)) = block.own_end() {
                if let Some(end) = self.match_end(end_rule, label, &item)? {
                    self.check_name(block, &end, item.span, &item.source_line(), true);
                    block.push(end);
                    block.has_end = true;
                    if spec.label_terminated {
                        self.closed_label = block.label;
                    }
                    return Ok(None);
                }
            }

            let (span, line) = (item.span, item.source_line());
            let item = match self.match_interior(block, item, source)? {
                Attempt::Matched(node) => {
                    if node.rule().is_continuation() && !node.is_block() {
                        self.check_name(block, &node, span, &line, false);
                    }
                    block.push(node);
                    // DO 10 ... DO 10 ... 10 CONTINUE: one label ends both
                    if let Some(closed) = self.closed_label.take() {
                        if spec.label_terminated && block.label == Some(closed) {
                            self.closed_label = Some(closed);
                            return Ok(None);
                        }
                    }
                    continue;
                }
                Attempt::Declined(item) => item,
            };

            if !block.has_begin && block.children.is_empty() {
                return Ok(Some(item));
            }
            // without an end of its own the line belongs to an enclosing block
            let Some((end_rule, _)) = block.own_end() else {
                give_back(block.rule, source, item)?;
                return Ok(None);
            };
            if let Some((repaired, comment, note)) = repair(&item) {
                self.report(Severity::Info, Some(item.span), &item.source_line(), note);
                if let Some(comment) = comment {
                    block.deferred.push(trivia_node(&comment));
                }
                pending = Some(repaired);
                continue;
            }
            if self.closes_enclosing(&item)? {
                self.report(
                    Severity::Error,
                    Some(item.span),
                    &item.source_line(),
                    format!("expected {end_rule} to close {}", block.rule),
                );
                give_back(block.rule, source, item)?;
                return Ok(None);
            }
            self.report(
                Severity::Error,
                Some(item.span),
                &item.source_line(),
                format!("no statement of {} matches this line", block.rule),
            );
        }
    }

    fn match_interior(
        &mut self,
        block: &mut OpenBlock<'_>,
        item: Item,
        source: &mut dyn ItemSource,
    ) -> Result<Attempt, ParseError> {
        let spec = block.spec;
        let mut candidates: Vec<RuleId> = spec.interior[block.start..].to_vec();
        for hook in &spec.hooks {
            hook.rerank(&item, &mut candidates);
        }
        let grammar = self.grammar;
        let mut item = item;
        for candidate in candidates {
            if grammar.is_block(candidate) {
                match self.offer(candidate, item, source)? {
                    Attempt::Matched(node) => {
                        block.advance(candidate);
                        return Ok(Attempt::Matched(node));
                    }
                    Attempt::Declined(back) => item = back,
                }
            } else if let Some(node) = self.match_statement(candidate, &item)? {
                block.advance(candidate);
                return Ok(Attempt::Matched(node));
            }
        }
        Ok(Attempt::Declined(item))
    }

    fn match_end(&mut self, end_rule: RuleId, label: Option<u32>, item: &Item) -> MatchResult {
        if label.is_some() && item.label != label {
            return Ok(None);
        }
        self.match_statement(end_rule, item)
    }

    /// Does `item` end a block further out than the innermost one?
    fn closes_enclosing(&mut self, item: &Item) -> Result<bool, ParseError> {
        let outer = self.open_ends.len().saturating_sub(1);
        let ends = self.open_ends[..outer].to_vec();
        for (end_rule, label) in ends.into_iter().rev() {
            if self.match_end(end_rule, label, item)?.is_some() {
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn report_unclosed(&mut self, block: &OpenBlock<'_>) {
        let Some(end_rule) = block.spec.end else {
            return;
        };
        let (span, line) = match &block.begin_item {
            Some(item) => (Some(item.span), item.source_line()),
            None => (
                block
                    .children
                    .iter()
                    .filter_map(Child::as_node)
                    .find_map(Node::span),
                String::new(),
            ),
        };
        self.report(
            Severity::Error,
            span,
            &line,
            format!("end of input reached; expected {end_rule} to close {}", block.rule),
        );
    }

    /// Compare a construct or unit name on `node` with the block's own;
    /// a mismatch is reported at `span`, the line `node` was matched from
    fn check_name(
        &mut self,
        block: &OpenBlock<'_>,
        node: &Node,
        span: Span,
        line: &str,
        is_end: bool,
    ) {
        let check = block.spec.match_names;
        if check == NameCheck::None {
            return;
        }
        let kind = check.kind();
        let expected = block.begin_name.as_deref();
        let got = node.declared_name();
        let message = match (expected, got) {
            (Some(e), Some(g)) if !e.eq_ignore_ascii_case(g) => {
                format!("expected {kind}-name is {e} but got {g}. Ignoring.")
            }
            (Some(e), None) if is_end && check == NameCheck::ConstructName => {
                format!("expected {kind}-name is {e} but got none. Ignoring.")
            }
            (None, Some(g)) if check == NameCheck::ConstructName => {
                format!("unexpected {kind}-name {g}. Ignoring.")
            }
            _ => return,
        };
        self.report(Severity::Warning, Some(span), line, message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::{Grammar, Standard};
    use crate::reader::ItemQueue;

    fn session() -> Session<'static> {
        Session::new(Grammar::shared(Standard::F2008))
    }

    #[test]
    fn test_if_construct() {
        let mut s = session();
        let mut items = ItemQueue::statements(&["if (x > 0) then", "y = 1", "else", "y = 2", "end if"]);
        let node = s.match_block(RuleId::IfConstruct, &mut items).unwrap().unwrap();
        assert_eq!(
            node.to_source_text(0),
            "IF (x > 0) THEN\n  y = 1\nELSE\n  y = 2\nEND IF"
        );
        assert!(items.is_empty());
        assert!(s.diagnostics().is_empty());
    }

    #[test]
    fn test_declined_leaves_source_untouched() {
        let mut s = session();
        let mut items = ItemQueue::statements(&["x = 1", "end if"]);
        assert!(s.match_block(RuleId::IfConstruct, &mut items).unwrap().is_none());
        assert_eq!(items.len(), 2);
        assert_eq!(items.next_item().unwrap().text, "x = 1");
    }

    #[test]
    fn test_sequence_block_stops_at_foreign_statement() {
        let mut s = session();
        let mut items = ItemQueue::statements(&["a = 1", "b = 2", "end program"]);
        let node = s.match_block(RuleId::ExecutionPart, &mut items).unwrap().unwrap();
        assert_eq!(node.children().len(), 2);
        assert_eq!(items.next_item().unwrap().text, "end program");
    }

    #[test]
    fn test_empty_sequence_block_is_no_match() {
        let mut s = session();
        let mut items = ItemQueue::statements(&["end program"]);
        assert!(s.match_block(RuleId::ExecutionPart, &mut items).unwrap().is_none());
        assert_eq!(items.len(), 1);
    }

    #[test]
    fn test_construct_name_mismatch_warns() {
        let mut s = session();
        let items = vec![
            Item::statement("do i = 1, 3", Span::new(1, 1, 1)).with_name(Some("outer".into())),
            Item::statement("x = i", Span::new(2, 2, 1)),
            Item::statement("end do inner", Span::new(3, 3, 1)),
        ];
        let mut queue = ItemQueue::new(items);
        let node = s.match_block(RuleId::NonlabelDoConstruct, &mut queue).unwrap().unwrap();
        assert_eq!(node.construct_name(), Some("outer"));
        let diags = s.diagnostics();
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].severity, Severity::Warning);
        assert_eq!(
            diags[0].message,
            "expected construct-name is outer but got inner. Ignoring."
        );
    }

    #[test]
    fn test_unit_name_mismatch_warns() {
        let mut s = session();
        let mut items = ItemQueue::statements(&["subroutine a", "end subroutine b"]);
        s.match_block(RuleId::SubroutineSubprogram, &mut items).unwrap().unwrap();
        assert_eq!(
            s.diagnostics()[0].message,
            "expected subroutine-name is a but got b. Ignoring."
        );
    }

    #[test]
    fn test_enclosing_end_closes_inner_block() {
        let mut s = session();
        let mut items =
            ItemQueue::statements(&["do i = 1, n", "if (x) then", "y = 1", "end do"]);
        let node = s.match_block(RuleId::NonlabelDoConstruct, &mut items).unwrap().unwrap();
        assert!(s.has_errors());
        assert!(s.diagnostics()[0].message.contains("EndIfStmt"));
        // the DO still got its own end
        assert!(matches!(node.shape(), Shape::Block { has_end: true, .. }));
        assert!(items.is_empty());
    }

    #[test]
    fn test_unrecognized_statement_is_skipped() {
        let mut s = session();
        let mut items = ItemQueue::statements(&["if (x) then", "this is not fortran", "y = 1", "end if"]);
        let node = s.match_block(RuleId::IfConstruct, &mut items).unwrap().unwrap();
        assert_eq!(s.diagnostics().len(), 1);
        assert_eq!(s.diagnostics()[0].span, Some(Span::new(2, 2, 1)));
        assert_eq!(node.find_all(RuleId::AssignmentStmt).len(), 1);
    }

    #[test]
    fn test_missing_end_at_eof() {
        let mut s = session();
        let mut items = ItemQueue::statements(&["if (x) then", "y = 1"]);
        let node = s.match_block(RuleId::IfConstruct, &mut items).unwrap().unwrap();
        assert!(s.has_errors());
        assert_eq!(s.diagnostics()[0].span, Some(Span::new(1, 1, 1)));
        assert!(matches!(node.shape(), Shape::Block { has_end: false, .. }));
    }

    #[test]
    fn test_inline_comment_repair() {
        let mut s = session();
        let mut items = ItemQueue::statements(&["if (x) then", "y = 1 ! note", "end if"]);
        let node = s.match_block(RuleId::IfConstruct, &mut items).unwrap().unwrap();
        assert!(!s.has_errors());
        assert_eq!(s.diagnostics()[0].severity, Severity::Info);
        assert_eq!(node.find_all(RuleId::Comment).len(), 1);
        assert_eq!(node.to_source_text(0), "IF (x) THEN\n  y = 1\n  ! note\nEND IF");
    }

    #[test]
    fn test_sequence_block_leaves_inline_comment_to_owner() {
        let mut s = session();
        let mut items = ItemQueue::statements(&["a = 1", "b = 2 ! c"]);
        let node = s.match_block(RuleId::ExecutionPart, &mut items).unwrap().unwrap();
        assert_eq!(node.children().len(), 1);
        assert!(s.diagnostics().is_empty());
        assert_eq!(items.next_item().unwrap().text, "b = 2 ! c");

        let mut s = session();
        let mut items = ItemQueue::statements(&[
            "subroutine s",
            "integer :: a",
            "x = 1 ! c",
            "end subroutine s",
        ]);
        let node = s.match_block(RuleId::SubroutineSubprogram, &mut items).unwrap().unwrap();
        assert!(!s.has_errors());
        assert_eq!(s.diagnostics().len(), 1);
        assert_eq!(s.diagnostics()[0].span, Some(Span::new(3, 3, 1)));
        assert_eq!(
            node.to_source_text(0),
            "SUBROUTINE s\n  INTEGER :: a\n  x = 1\n  ! c\nEND SUBROUTINE s"
        );
    }

    #[test]
    fn test_include_lines_are_kept_in_place() {
        let mut s = session();
        let items = vec![
            Item::statement("if (x) then", Span::new(1, 1, 1)),
            Item::include("include 'consts.h'", Span::new(2, 2, 1)),
            Item::statement("y = 1", Span::new(3, 3, 1)),
            Item::statement("end if", Span::new(4, 4, 1)),
        ];
        let mut queue = ItemQueue::new(items);
        let node = s.match_block(RuleId::IfConstruct, &mut queue).unwrap().unwrap();
        assert!(s.diagnostics().is_empty());
        let include = node.child_node(1).unwrap();
        assert_eq!(include.rule(), RuleId::IncludeStmt);
        assert_eq!(include.span(), Some(Span::new(2, 2, 1)));
        assert_eq!(
            node.to_source_text(0),
            "IF (x) THEN\n  INCLUDE 'consts.h'\n  y = 1\nEND IF"
        );
    }

    #[test]
    fn test_else_name_mismatch_points_at_else() {
        let mut s = session();
        let items = vec![
            Item::statement("if (a) then", Span::new(2, 2, 1)).with_name(Some("chk".into())),
            Item::statement("x = 1", Span::new(3, 3, 1)),
            Item::statement("else oops", Span::new(4, 4, 1)),
            Item::statement("x = 2", Span::new(5, 5, 1)),
            Item::statement("end if chk", Span::new(6, 6, 1)),
        ];
        let mut queue = ItemQueue::new(items);
        s.match_block(RuleId::IfConstruct, &mut queue).unwrap().unwrap();
        let diags = s.diagnostics();
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].span, Some(Span::new(4, 4, 1)));
        assert_eq!(diags[0].line_text, "else oops");
    }

    #[test]
    fn test_shared_label_do() {
        let mut s = session();
        let items = vec![
            Item::statement("do 10 i = 1, n", Span::new(1, 1, 1)),
            Item::statement("do 10 j = 1, m", Span::new(2, 2, 1)),
            Item::statement("a(i, j) = 0", Span::new(3, 3, 1)),
            Item::statement("continue", Span::new(4, 4, 1)).with_label(Some(10)),
        ];
        let mut queue = ItemQueue::new(items);
        let outer = s.match_block(RuleId::LabelDoConstruct, &mut queue).unwrap().unwrap();
        assert!(!s.has_errors());
        assert!(queue.is_empty());
        let inner = outer.child_node(1).unwrap();
        assert_eq!(inner.rule(), RuleId::LabelDoConstruct);
        assert!(matches!(inner.shape(), Shape::Block { has_end: true, .. }));
        assert!(matches!(outer.shape(), Shape::Block { has_end: false, .. }));
    }

    #[test]
    fn test_unlabelled_continue_inside_label_do() {
        let mut s = session();
        let items = vec![
            Item::statement("do 20 i = 1, n", Span::new(1, 1, 1)),
            Item::statement("continue", Span::new(2, 2, 1)),
            Item::statement("continue", Span::new(3, 3, 1)).with_label(Some(20)),
        ];
        let mut queue = ItemQueue::new(items);
        let node = s.match_block(RuleId::LabelDoConstruct, &mut queue).unwrap().unwrap();
        assert_eq!(node.children().len(), 3);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_text_rule_is_internal_error() {
        let mut s = session();
        let mut items = ItemQueue::statements(&["x = 1"]);
        let err = s.match_block(RuleId::AssignmentStmt, &mut items).unwrap_err();
        assert!(err.is_internal());
    }
}
