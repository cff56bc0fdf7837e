/// `FreeFormReader` - Converts physical free-form lines to logical items
///
/// This module handles:
/// - Joining line continuations (lines ending with &, optional leading &)
/// - Splitting semicolon-separated statements
/// - Separating inline comments from code, emitting them after their statement
/// - Statement labels and construct names
/// - Preprocessor directives (lines starting with #)
/// - `INCLUDE` lines, which are passed through as their own item kind
use std::io::BufRead;

use anyhow::bail;

use super::item::{Item, ItemQueue, ItemSource};
use crate::error::Result;
use crate::node::Span;
use crate::text::patterns::{CONSTRUCT_NAME_RE, INCLUDE_LINE_RE, STATEMENT_LABEL_RE};
use crate::text::StringDelimiter;

/// Maximum number of physical lines allowed in a single logical line.
/// This prevents memory exhaustion from pathological inputs with many continuations.
const MAX_CONTINUATION_LINES: usize = 10_000;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReaderOptions {
    /// Drop comment items instead of handing them to the parser
    pub ignore_comments: bool,
}

/// Eagerly split free-form source into [`Item`]s
#[derive(Debug)]
pub struct FreeFormReader {
    queue: ItemQueue,
}

impl FreeFormReader {
    pub fn new(source: &str) -> Result<Self> {
        Self::with_options(source, ReaderOptions::default())
    }

    pub fn with_options(source: &str, options: ReaderOptions) -> Result<Self> {
        let mut joiner = Joiner::new(options);
        for (index, line) in source.lines().enumerate() {
            joiner.feed(index + 1, line)?;
        }
        Ok(Self {
            queue: joiner.finish(),
        })
    }

    pub fn from_reader<R: BufRead>(reader: R, options: ReaderOptions) -> Result<Self> {
        let mut joiner = Joiner::new(options);
        for (index, line) in reader.lines().enumerate() {
            joiner.feed(index + 1, &line?)?;
        }
        Ok(Self {
            queue: joiner.finish(),
        })
    }

    /// Items not yet handed out
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.queue.len()
    }
}

impl ItemSource for FreeFormReader {
    fn next_item(&mut self) -> Option<Item> {
        self.queue.next_item()
    }

    fn push_back(&mut self, item: Item) -> std::result::Result<(), Item> {
        self.queue.push_back(item)
    }
}

/// Accumulates one logical statement at a time
struct Joiner {
    options: ReaderOptions,
    items: Vec<Item>,
    buffer: String,
    /// (line, column) of the statement being joined
    start: Option<(usize, usize)>,
    physical_lines: usize,
    /// Literal left open by a line ending in `&`
    quote: StringDelimiter,
    /// Inline and interleaved comments, emitted after the statement
    comments: Vec<Item>,
    last_line: usize,
}

impl Joiner {
    fn new(options: ReaderOptions) -> Self {
        Self {
            options,
            items: Vec::new(),
            buffer: String::new(),
            start: None,
            physical_lines: 0,
            quote: StringDelimiter::None,
            comments: Vec::new(),
            last_line: 0,
        }
    }

    fn feed(&mut self, line_no: usize, raw: &str) -> Result<()> {
        self.last_line = line_no;
        // Convert tabs to 8 spaces
        let line = raw.replace('\t', "        ");
        let trimmed = line.trim_start();
        let column = line.len() - trimmed.len() + 1;
        let continuing = self.start.is_some();

        if trimmed.is_empty() {
            return Ok(());
        }
        if self.quote == StringDelimiter::None && trimmed.starts_with('!') {
            let comment = Item::comment(trimmed.trim_end(), Span::new(line_no, line_no, column));
            if continuing {
                self.comments.push(comment);
            } else {
                self.push_comment(comment);
            }
            return Ok(());
        }
        if !continuing && trimmed.starts_with('#') {
            self.items.push(Item::directive(
                trimmed.trim_end(),
                Span::new(line_no, line_no, column),
            ));
            return Ok(());
        }

        let (code, direct) = match trimmed.strip_prefix('&') {
            Some(rest) if continuing => (rest, true),
            _ => (trimmed, false),
        };
        let code_offset = line.len() - code.len();
        let (comment_at, open_quote) = scan_code(code, self.quote);
        let code_part = match comment_at {
            Some(pos) => {
                let comment = code[pos..].trim_end();
                let comment_column = code_offset + pos + 1;
                self.comments.push(Item::comment(
                    comment,
                    Span::new(line_no, line_no, comment_column),
                ));
                &code[..pos]
            }
            None => code,
        };
        let code_part = code_part.trim_end();
        let (body, continues) = match code_part.strip_suffix('&') {
            Some(body) => (body, true),
            None => (code_part, false),
        };

        if continuing {
            if direct {
                self.buffer.push_str(body);
            } else {
                let kept = self.buffer.trim_end().len();
                self.buffer.truncate(kept);
                if !self.buffer.is_empty() {
                    self.buffer.push(' ');
                }
                self.buffer.push_str(body.trim_start());
            }
        } else {
            self.start = Some((line_no, column));
            self.buffer = body.to_string();
        }

        self.physical_lines += 1;
        // Guard against memory exhaustion from pathological inputs
        if self.physical_lines > MAX_CONTINUATION_LINES {
            bail!(
                "Line {} exceeds maximum continuation lines ({})",
                line_no,
                MAX_CONTINUATION_LINES
            );
        }

        if continues {
            self.quote = open_quote;
        } else {
            self.flush(line_no);
        }
        Ok(())
    }

    fn push_comment(&mut self, comment: Item) {
        if !self.options.ignore_comments {
            self.items.push(comment);
        }
    }

    fn flush(&mut self, end_line: usize) {
        let Some((start_line, column)) = self.start.take() else {
            return;
        };
        let text = std::mem::take(&mut self.buffer);
        self.physical_lines = 0;
        self.quote = StringDelimiter::None;
        let span = Span::new(start_line, end_line, column);
        for piece in split_statements(&text) {
            let piece = piece.trim();
            if !piece.is_empty() {
                self.items.push(statement_item(piece, span));
            }
        }
        for comment in std::mem::take(&mut self.comments) {
            self.push_comment(comment);
        }
    }

    fn finish(mut self) -> ItemQueue {
        // a trailing `&` on the last line still ends the statement
        self.flush(self.last_line);
        for comment in std::mem::take(&mut self.comments) {
            self.push_comment(comment);
        }
        ItemQueue::new(self.items)
    }
}

/// Offset of an inline `!` comment and the literal still open at the end
/// of `code`, starting inside `state`
fn scan_code(code: &str, state: StringDelimiter) -> (Option<usize>, StringDelimiter) {
    let mut instring = state;
    for (pos, c) in code.char_indices() {
        if let Some(delim) = instring.as_char() {
            if c == delim {
                instring = StringDelimiter::None;
            }
            continue;
        }
        match c {
            '\'' | '"' => instring = StringDelimiter::from_char(c),
            '!' => return (Some(pos), instring),
            _ => {}
        }
    }
    (None, instring)
}

/// Split a logical line on `;` outside character literals
fn split_statements(text: &str) -> Vec<&str> {
    let mut pieces = Vec::new();
    let mut instring = StringDelimiter::None;
    let mut last = 0;
    for (pos, c) in text.char_indices() {
        if let Some(delim) = instring.as_char() {
            if c == delim {
                instring = StringDelimiter::None;
            }
            continue;
        }
        match c {
            '\'' | '"' => instring = StringDelimiter::from_char(c),
            ';' => {
                pieces.push(&text[last..pos]);
                last = pos + 1;
            }
            _ => {}
        }
    }
    pieces.push(&text[last..]);
    pieces
}

/// Peel off a statement label and a construct name
fn statement_item(text: &str, span: Span) -> Item {
    let mut rest = text.to_string();
    let mut label = None;
    if let Some(caps) = STATEMENT_LABEL_RE.captures(text) {
        label = caps[1].parse::<u32>().ok();
        rest = caps[2].to_string();
    }
    if INCLUDE_LINE_RE.is_match(&rest) {
        return Item::include(rest, span).with_label(label);
    }
    let mut name = None;
    if let Some(caps) = CONSTRUCT_NAME_RE.captures(&rest) {
        let after = caps[2].trim();
        if !after.is_empty() && !after.starts_with(':') {
            name = Some(caps[1].to_string());
            rest = after.to_string();
        }
    }
    Item::statement(rest, span).with_label(label).with_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::ItemKind;

    fn items(source: &str) -> Vec<Item> {
        let mut reader = FreeFormReader::new(source).unwrap();
        std::iter::from_fn(|| reader.next_item()).collect()
    }

    fn texts(source: &str) -> Vec<String> {
        items(source).into_iter().map(|i| i.text).collect()
    }

    #[test]
    fn test_continuation_join() {
        let got = items("call foo(a, &\n         b)\n");
        assert_eq!(got.len(), 1);
        assert_eq!(got[0].text, "call foo(a, b)");
        assert_eq!(got[0].span, Span::new(1, 2, 1));
    }

    #[test]
    fn test_leading_ampersand_joins_directly() {
        assert_eq!(texts("x = 'abc&\n  &def'"), vec!["x = 'abcdef'"]);
        assert_eq!(texts("x = long&\n  &name + 1"), vec!["x = longname + 1"]);
    }

    #[test]
    fn test_semicolons_split() {
        assert_eq!(texts("a = 1; b = ';'; c = 3"), vec!["a = 1", "b = ';'", "c = 3"]);
    }

    #[test]
    fn test_comments_follow_statement() {
        let got = items("! header\nx = 1 ! set x\ny = &\n! between\n  2\n");
        let kinds: Vec<ItemKind> = got.iter().map(|i| i.kind).collect();
        assert_eq!(
            kinds,
            vec![
                ItemKind::Comment,
                ItemKind::Statement,
                ItemKind::Comment,
                ItemKind::Statement,
                ItemKind::Comment
            ]
        );
        assert_eq!(got[2].text, "! set x");
        assert_eq!(got[2].span.column, 7);
        assert_eq!(got[3].text, "y = 2");
        assert_eq!(got[4].text, "! between");
    }

    #[test]
    fn test_bang_in_string_is_code() {
        assert_eq!(texts("print *, 'hi!' ! c"), vec!["print *, 'hi!'", "! c"]);
    }

    #[test]
    fn test_ignore_comments() {
        let options = ReaderOptions {
            ignore_comments: true,
        };
        let mut reader = FreeFormReader::with_options("! c\nx = 1 ! d\n", options).unwrap();
        assert_eq!(reader.remaining(), 1);
        assert_eq!(reader.next_item().unwrap().text, "x = 1");
    }

    #[test]
    fn test_label_and_construct_name() {
        let got = items("10 continue\nouter: do i = 1, n\n20 inner: if (x) then\n");
        assert_eq!(got[0].label, Some(10));
        assert_eq!(got[0].text, "continue");
        assert_eq!(got[1].name.as_deref(), Some("outer"));
        assert_eq!(got[1].text, "do i = 1, n");
        assert_eq!(got[2].label, Some(20));
        assert_eq!(got[2].name.as_deref(), Some("inner"));
    }

    #[test]
    fn test_double_colon_is_not_a_name() {
        let got = items("integer :: i\na(1:2) = 0\n");
        assert!(got.iter().all(|i| i.name.is_none()));
        assert_eq!(got[0].text, "integer :: i");
    }

    #[test]
    fn test_directive_and_tabs() {
        let got = items("#ifdef DEBUG\n\tx = 1\n#endif\n");
        assert_eq!(got[0].kind, ItemKind::Directive);
        assert_eq!(got[1].span.column, 9);
        assert_eq!(got[2].text, "#endif");
    }

    #[test]
    fn test_include_lines() {
        let got = items("include 'consts.h'\nINCLUDE \"a b.inc\"\ninclude_count = 1\n");
        assert_eq!(got[0].kind, ItemKind::Include);
        assert_eq!(got[0].text, "include 'consts.h'");
        assert_eq!(got[1].kind, ItemKind::Include);
        assert_eq!(got[2].kind, ItemKind::Statement);
    }

    #[test]
    fn test_dangling_continuation_at_eof() {
        assert_eq!(texts("x = 1 + &"), vec!["x = 1 +"]);
    }

    #[test]
    fn test_too_many_continuations() {
        let source = "x = 1 + &\n".repeat(MAX_CONTINUATION_LINES + 1);
        let err = FreeFormReader::new(&source).unwrap_err();
        assert!(err.to_string().contains("maximum continuation lines"));
    }

    #[test]
    fn test_from_reader() {
        let cursor = std::io::Cursor::new("a = 1\r\nb = 2\r\n");
        let mut reader = FreeFormReader::from_reader(cursor, ReaderOptions::default()).unwrap();
        assert_eq!(reader.next_item().unwrap().text, "a = 1");
        assert_eq!(reader.next_item().unwrap().text, "b = 2");
    }
}
