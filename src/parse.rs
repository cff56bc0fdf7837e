/// Top-level parsing: source text in, a `Program` tree and diagnostics out
///
/// The `Program` block is matched repeatedly until the stream is drained.
/// A line no program unit accepts is reported and skipped, so one bad line
/// never hides the units after it.
use std::io::BufRead;
use std::sync::Arc;
use std::thread;

use anyhow::Context;

use crate::diagnostics::{Diagnostic, Severity};
use crate::engine::{Session, SessionOptions, SessionStats};
use crate::error::{ParseError, Result};
use crate::grammar::{Grammar, RuleId, Standard};
use crate::node::{Child, Node, Shape, Span};
use crate::reader::{FreeFormReader, ItemSource, ReaderOptions};

/// Default nesting limit for block and rule recursion
pub const DEFAULT_MAX_DEPTH: usize = 2000;

/// Stack of the thread [`parse_source`] and [`parse_reader`] parse on;
/// [`DEFAULT_MAX_DEPTH`] levels of recursion fit with room to spare
pub const PARSE_STACK_SIZE: usize = 64 * 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseOptions {
    pub standard: Standard,
    pub memoize: bool,
    pub ignore_comments: bool,
    pub max_depth: Option<usize>,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            standard: Standard::default(),
            memoize: true,
            ignore_comments: false,
            max_depth: Some(DEFAULT_MAX_DEPTH),
        }
    }
}

impl ParseOptions {
    #[must_use]
    pub fn for_standard(standard: Standard) -> Self {
        Self {
            standard,
            ..Self::default()
        }
    }

    fn session_options(self) -> SessionOptions {
        SessionOptions {
            memoize: self.memoize,
            max_depth: self.max_depth,
        }
    }

    fn reader_options(self) -> ReaderOptions {
        ReaderOptions {
            ignore_comments: self.ignore_comments,
        }
    }
}

/// Result of parsing one source file
#[derive(Debug, Clone)]
pub struct ParsedUnit {
    /// `None` when nothing in the input matched
    pub root: Option<Arc<Node>>,
    pub diagnostics: Vec<Diagnostic>,
    pub stats: SessionStats,
}

impl ParsedUnit {
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(Diagnostic::is_error)
    }

    /// Render the tree back to source with `unit` per indentation level
    #[must_use]
    pub fn to_source_text(&self, unit: &str) -> String {
        self.root
            .as_ref()
            .map(|root| root.to_source_text_with(0, unit))
            .unwrap_or_default()
    }

    /// Strict view: the first error diagnostic becomes a [`ParseError::Syntax`]
    pub fn into_result(self) -> std::result::Result<Option<Arc<Node>>, ParseError> {
        let Some(first) = self.diagnostics.iter().find(|d| d.is_error()) else {
            return Ok(self.root);
        };
        let (line, column) = first.span.map_or((0, 0), |span| (span.start_line, span.column));
        Err(ParseError::Syntax {
            line,
            column,
            text: first.line_text.clone(),
            message: first.message.clone(),
            diagnostics: self.diagnostics.clone(),
        })
    }
}

/// Parse every item `source` yields into one `Program` node.
///
/// Runs on the calling thread, whose stack must hold `max_depth` levels
/// of recursion. [`parse_source`] and [`parse_reader`] bring their own.
pub fn parse_items(
    source: &mut dyn ItemSource,
    options: ParseOptions,
) -> std::result::Result<ParsedUnit, ParseError> {
    let _span = tracing::info_span!("parse", standard = %options.standard).entered();
    let grammar = Grammar::shared(options.standard);
    let mut session = Session::with_options(grammar, options.session_options());
    let mut children = Vec::new();

    loop {
        if let Some(program) = session.match_block(RuleId::Program, source)? {
            children.extend(program.children().iter().cloned());
        }
        let Some(item) = source.next_item() else {
            break;
        };
        session.report(
            Severity::Error,
            Some(item.span),
            &item.source_line(),
            "no program unit matches this line",
        );
    }

    let stats = session.stats();
    let diagnostics = session.take_diagnostics();
    tracing::debug!(
        units = children.len(),
        diagnostics = diagnostics.len(),
        attempts = stats.attempts,
        cache_hits = stats.cache_hits,
        "parse finished"
    );
    Ok(ParsedUnit {
        root: program_node(children),
        diagnostics,
        stats,
    })
}

fn program_node(children: Vec<Child>) -> Option<Arc<Node>> {
    if children.is_empty() {
        return None;
    }
    let spans: Vec<Span> = children
        .iter()
        .filter_map(Child::as_node)
        .filter_map(Node::span)
        .collect();
    let mut node = Node::new(
        RuleId::Program,
        Shape::Block {
            has_begin: false,
            has_end: false,
        },
        children,
    );
    if let (Some(first), Some(last)) = (spans.first(), spans.last()) {
        node = node.with_span(first.merge(*last));
    }
    Some(node.into_arc())
}

/// Parse free-form source text
pub fn parse_source(source: &str, options: ParseOptions) -> Result<ParsedUnit> {
    let reader = FreeFormReader::with_options(source, options.reader_options())?;
    parse_on_own_stack(reader, options)
}

/// Parse free-form source from any buffered reader
pub fn parse_reader<R: BufRead>(reader: R, options: ParseOptions) -> Result<ParsedUnit> {
    let reader = FreeFormReader::from_reader(reader, options.reader_options())?;
    parse_on_own_stack(reader, options)
}

/// Run [`parse_items`] on a thread with a [`PARSE_STACK_SIZE`] stack
fn parse_on_own_stack(mut reader: FreeFormReader, options: ParseOptions) -> Result<ParsedUnit> {
    let worker = thread::Builder::new()
        .name("fparse-parse".to_string())
        .stack_size(PARSE_STACK_SIZE)
        .spawn(move || parse_items(&mut reader, options))
        .context("failed to start parser thread")?;
    match worker.join() {
        Ok(result) => Ok(result?),
        Err(panic) => std::panic::resume_unwind(panic),
    }
}

/// Parse with default options (Fortran 2008, memoized)
pub fn parse_str(source: &str) -> Result<ParsedUnit> {
    parse_source(source, ParseOptions::default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::ItemQueue;

    #[test]
    fn test_parse_simple_program() {
        let unit = parse_str("program p\nx = 1\nend program p\n").unwrap();
        assert!(!unit.has_errors());
        let root = unit.root.as_ref().unwrap();
        assert_eq!(root.rule(), RuleId::Program);
        assert_eq!(
            unit.to_source_text("  "),
            "PROGRAM p\n  x = 1\nEND PROGRAM p"
        );
    }

    #[test]
    fn test_empty_input_has_no_root() {
        let unit = parse_str("").unwrap();
        assert!(unit.root.is_none());
        assert!(unit.diagnostics.is_empty());
        assert_eq!(unit.to_source_text("  "), "");
    }

    #[test]
    fn test_error_is_local_to_its_line() {
        let source = "program p\nx = = 1\ny = 2\nend program p\n";
        let unit = parse_str(source).unwrap();
        let errors: Vec<_> = unit.diagnostics.iter().filter(|d| d.is_error()).collect();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].span.unwrap().start_line, 2);
        // the statements after the bad line still parse
        let text = unit.to_source_text("  ");
        assert!(text.contains("y = 2"), "{text}");
        assert!(text.ends_with("END PROGRAM p"), "{text}");

        match unit.into_result() {
            Err(ParseError::Syntax { line, text, .. }) => {
                assert_eq!(line, 2);
                assert_eq!(text, "x = = 1");
            }
            other => panic!("expected a syntax error, got {other:?}"),
        }
    }

    #[test]
    fn test_stray_line_at_top_level() {
        let source = "end subroutine\nprogram p\nend program p\n";
        let unit = parse_str(source).unwrap();
        assert_eq!(unit.diagnostics.len(), 1);
        assert_eq!(
            unit.diagnostics[0].message,
            "no program unit matches this line"
        );
        assert_eq!(unit.to_source_text("  "), "PROGRAM p\nEND PROGRAM p");
    }

    #[test]
    fn test_units_share_one_root() {
        let source = "module m\nend module m\nprogram p\nend program p\n";
        let unit = parse_str(source).unwrap();
        let root = unit.root.unwrap();
        let rules: Vec<RuleId> = root
            .children()
            .iter()
            .filter_map(Child::as_node)
            .map(Node::rule)
            .collect();
        assert_eq!(rules, vec![RuleId::Module, RuleId::MainProgram]);
        assert_eq!(root.span().unwrap().end_line, 4);
    }

    #[test]
    fn test_standard_selection() {
        let source = "program p\nerror stop 1\nend program p\n";
        let f2008 = parse_source(source, ParseOptions::for_standard(Standard::F2008)).unwrap();
        assert!(!f2008.has_errors());
        let f2003 = parse_source(source, ParseOptions::for_standard(Standard::F2003)).unwrap();
        assert!(f2003.has_errors());
    }

    #[test]
    fn test_ignore_comments() {
        let source = "! header\nprogram p\nx = 1 ! set\nend program p\n";
        let kept = parse_str(source).unwrap();
        let text = kept.to_source_text("  ");
        assert!(text.contains("! header"), "{text}");

        let options = ParseOptions {
            ignore_comments: true,
            ..ParseOptions::default()
        };
        let dropped = parse_source(source, options).unwrap();
        assert!(!dropped.to_source_text("  ").contains('!'));
    }

    #[test]
    fn test_memoize_off_gives_same_tree() {
        let source = "program p\nif (a .and. b) x = f(1, 2) + 3\nend program p\n";
        let cached = parse_str(source).unwrap();
        let options = ParseOptions {
            memoize: false,
            ..ParseOptions::default()
        };
        let uncached = parse_source(source, options).unwrap();
        assert_eq!(cached.to_source_text("  "), uncached.to_source_text("  "));
        assert!(cached.stats.cache_hits > 0);
        assert_eq!(uncached.stats.cache_hits, 0);
    }

    #[test]
    fn test_deep_nesting_on_small_caller_stack() {
        let depth = 300;
        let source = format!(
            "program p\nx = {}y{}\nend program p\n",
            "(".repeat(depth),
            ")".repeat(depth)
        );
        let caller = thread::Builder::new()
            .stack_size(2 * 1024 * 1024)
            .spawn(move || parse_str(&source).map_err(|e| e.to_string()))
            .unwrap();
        let err = caller.join().unwrap().unwrap_err();
        assert!(err.contains("nesting deeper than"), "{err}");
    }

    #[test]
    fn test_depth_limit_is_an_error() {
        let mut source = String::from("program p\n");
        for _ in 0..20 {
            source.push_str("do\n");
        }
        for _ in 0..20 {
            source.push_str("end do\n");
        }
        source.push_str("end program p\n");
        let options = ParseOptions {
            max_depth: Some(8),
            ..ParseOptions::default()
        };
        let err = parse_source(&source, options).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ParseError>(),
            Some(ParseError::NestingTooDeep { limit: 8, .. })
        ));
    }

    #[test]
    fn test_parse_items_from_queue() {
        let mut queue = ItemQueue::statements(&["subroutine s", "call t", "end subroutine s"]);
        let unit = parse_items(&mut queue, ParseOptions::default()).unwrap();
        assert!(!unit.has_errors());
        assert!(queue.is_empty());
        assert_eq!(
            unit.to_source_text("    "),
            "SUBROUTINE s\n    CALL t\nEND SUBROUTINE s"
        );
    }

    #[test]
    fn test_parse_reader() {
        let source = "program p\nprint *, 'hi'\nend program p\n";
        let unit = parse_reader(source.as_bytes(), ParseOptions::default()).unwrap();
        assert!(!unit.has_errors());
    }
}
