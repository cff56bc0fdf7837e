/// Logical items handed to the block matcher
use std::collections::VecDeque;

use crate::node::Span;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemKind {
    Statement,
    Comment,
    Directive,
    /// `INCLUDE 'file'` line
    Include,
}

/// One logical statement, comment or preprocessor line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Item {
    pub kind: ItemKind,
    /// Statement text with label and construct name removed
    pub text: String,
    pub span: Span,
    pub label: Option<u32>,
    pub name: Option<String>,
}

impl Item {
    #[must_use]
    pub fn statement(text: impl Into<String>, span: Span) -> Self {
        Self::new(ItemKind::Statement, text, span)
    }

    #[must_use]
    pub fn comment(text: impl Into<String>, span: Span) -> Self {
        Self::new(ItemKind::Comment, text, span)
    }

    #[must_use]
    pub fn directive(text: impl Into<String>, span: Span) -> Self {
        Self::new(ItemKind::Directive, text, span)
    }

    #[must_use]
    pub fn include(text: impl Into<String>, span: Span) -> Self {
        Self::new(ItemKind::Include, text, span)
    }

    fn new(kind: ItemKind, text: impl Into<String>, span: Span) -> Self {
        Self {
            kind,
            text: text.into(),
            span,
            label: None,
            name: None,
        }
    }

    #[must_use]
    pub fn with_label(mut self, label: Option<u32>) -> Self {
        self.label = label;
        self
    }

    #[must_use]
    pub fn with_name(mut self, name: Option<String>) -> Self {
        self.name = name;
        self
    }

    /// Same metadata, different text
    #[must_use]
    pub fn with_text(&self, text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..self.clone()
        }
    }

    #[must_use]
    pub fn is_statement(&self) -> bool {
        self.kind == ItemKind::Statement
    }

    /// The statement as written, label and name included
    #[must_use]
    pub fn source_line(&self) -> String {
        let mut line = String::new();
        if let Some(label) = self.label {
            line.push_str(&format!("{label} "));
        }
        if let Some(name) = &self.name {
            line.push_str(&format!("{name}: "));
        }
        line.push_str(&self.text);
        line
    }
}

/// A pull-based stream of items with one slot of pushback.
///
/// The block matcher reads one item at a time and returns at most one
/// unconsumed item before reading again.
pub trait ItemSource {
    fn next_item(&mut self) -> Option<Item>;

    /// Return `item` to the front of the stream. Fails, handing the item
    /// back, when the pushback slot is already taken.
    fn push_back(&mut self, item: Item) -> Result<(), Item>;
}

/// In-memory item stream
#[derive(Debug, Default)]
pub struct ItemQueue {
    items: VecDeque<Item>,
    pending: Option<Item>,
}

impl ItemQueue {
    #[must_use]
    pub fn new(items: Vec<Item>) -> Self {
        Self {
            items: items.into(),
            pending: None,
        }
    }

    /// One statement item per entry, on consecutive lines
    #[must_use]
    pub fn statements(lines: &[&str]) -> Self {
        let items = lines
            .iter()
            .enumerate()
            .map(|(i, text)| Item::statement(*text, Span::new(i + 1, i + 1, 1)))
            .collect();
        Self::new(items)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len() + usize::from(self.pending.is_some())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ItemSource for ItemQueue {
    fn next_item(&mut self) -> Option<Item> {
        self.pending.take().or_else(|| self.items.pop_front())
    }

    fn push_back(&mut self, item: Item) -> Result<(), Item> {
        if self.pending.is_some() {
            return Err(item);
        }
        self.pending = Some(item);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_queue_order_and_pushback() {
        let mut queue = ItemQueue::statements(&["a = 1", "b = 2"]);
        let first = queue.next_item().unwrap();
        assert_eq!(first.text, "a = 1");
        queue.push_back(first).unwrap();
        assert_eq!(queue.len(), 2);
        let again = queue.next_item().unwrap();
        assert_eq!(again.text, "a = 1");
        assert_eq!(queue.next_item().unwrap().span.start_line, 2);
        assert!(queue.next_item().is_none());
        assert!(queue.is_empty());
    }

    #[test]
    fn test_second_pushback_is_refused() {
        let mut queue = ItemQueue::statements(&["a = 1", "b = 2"]);
        let a = queue.next_item().unwrap();
        let b = queue.next_item().unwrap();
        queue.push_back(b).unwrap();
        let refused = queue.push_back(a).unwrap_err();
        assert_eq!(refused.text, "a = 1");
    }

    #[test]
    fn test_source_line() {
        let item = Item::statement("do i = 1, n", Span::new(1, 1, 1))
            .with_label(Some(10))
            .with_name(Some("outer".to_string()));
        assert_eq!(item.source_line(), "10 outer: do i = 1, n");
        assert!(item.is_statement());
        assert_eq!(item.with_text("x").label, Some(10));
    }
}
