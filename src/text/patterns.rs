/// Regex patterns for Fortran syntax
///
/// All patterns are compiled once on first use via `LazyLock`. Grammar
/// patterns are case-insensitive + unicode; placeholder patterns are exact.
///
/// The `regex` crate has no look-around, so operator patterns only locate
/// candidates. Neighbour checks live in `engine::combinators::OpPattern`.
use std::sync::LazyLock;

use regex::{Regex, RegexBuilder};

/// Build a case-insensitive regex from a compile-time constant pattern.
///
/// # Panics
///
/// Panics if the pattern is invalid. All patterns in this module are
/// compile-time constants exercised by the tests below, so the panic can
/// only fire on first access of a broken `LazyLock` static.
fn build_re(pattern: &str) -> Regex {
    RegexBuilder::new(pattern)
        .case_insensitive(true)
        .unicode(true)
        .build()
        .unwrap_or_else(|_| panic!("Invalid regex pattern: {pattern}"))
}

fn build_exact_re(pattern: &str) -> Regex {
    Regex::new(pattern).unwrap_or_else(|_| panic!("Invalid regex pattern: {pattern}"))
}

// Anchor patterns
const EOL_STR: &str = r"\s*$"; // End of statement
const SOL_STR: &str = r"^\s*"; // Start of statement

// ===== MASK PLACEHOLDERS =====

pub static PLACEHOLDER_RE: LazyLock<Regex> =
    LazyLock::new(|| build_exact_re(r"_F(?:STR|REAL|EXPR)_\d+_"));
pub static PLACEHOLDER_PREFIX_RE: LazyLock<Regex> =
    LazyLock::new(|| build_exact_re(r"_F(?:STR|REAL|EXPR)_"));

// Real literal carrying an exponent letter; group 1 is the literal itself
pub static EXPONENT_REAL_RE: LazyLock<Regex> = LazyLock::new(|| {
    build_re(r"(?:[^\w.]|^)((?:\d+\.\d*|\d*\.\d+|\d+)[ED][+-]?\d+(?:_\w+)?)")
});

// ===== NAMES AND LITERALS =====

pub static NAME_RE: LazyLock<Regex> = LazyLock::new(|| build_re(r"^[A-Z][\w$]*$"));
pub static LABEL_RE: LazyLock<Regex> = LazyLock::new(|| build_re(r"^\d{1,5}$"));
pub static INT_LITERAL_RE: LazyLock<Regex> =
    LazyLock::new(|| build_re(r"^(\d+)(?:_(\w+))?$"));
pub static REAL_LITERAL_RE: LazyLock<Regex> = LazyLock::new(|| {
    build_re(r"^((?:\d+\.\d*|\.\d+)(?:[ED][+-]?\d+)?|\d+[ED][+-]?\d+)(?:_(\w+))?$")
});
pub static SIGNED_REAL_PART_RE: LazyLock<Regex> = LazyLock::new(|| {
    build_re(r"^[+-]?\s*(?:(?:\d+\.\d*|\.\d+)(?:[ED][+-]?\d+)?|\d+[ED][+-]?\d+|\d+)(?:_\w+)?$")
});
pub static LOGICAL_LITERAL_RE: LazyLock<Regex> =
    LazyLock::new(|| build_re(r"^(\.(?:TRUE|FALSE)\.)(?:_(\w+))?$"));
pub static CHAR_LITERAL_RE: LazyLock<Regex> = LazyLock::new(|| {
    build_re(r#"^(?:(\w+)_)?('(?:[^']|'')*'|"(?:[^"]|"")*")$"#)
});
pub static BOZ_LITERAL_RE: LazyLock<Regex> = LazyLock::new(|| {
    build_re(r#"^(?:B'[01]+'|B"[01]+"|O'[0-7]+'|O"[0-7]+"|Z'[0-9A-F]+'|Z"[0-9A-F]+")$"#)
});

// ===== OPERATORS =====

pub static POWER_OP_RE: LazyLock<Regex> = LazyLock::new(|| build_re(r"\*\*"));
pub static MULT_OP_RE: LazyLock<Regex> = LazyLock::new(|| build_re(r"[*/]"));
pub static ADD_OP_RE: LazyLock<Regex> = LazyLock::new(|| build_re(r"[+-]"));
pub static CONCAT_OP_RE: LazyLock<Regex> = LazyLock::new(|| build_re(r"//"));
pub static REL_OP_RE: LazyLock<Regex> =
    LazyLock::new(|| build_re(r"\.(?:EQ|NE|LT|LE|GT|GE)\.|==|/=|<=|>=|<|>"));
pub static NOT_OP_RE: LazyLock<Regex> = LazyLock::new(|| build_re(r"\.\s*NOT\s*\."));
pub static AND_OP_RE: LazyLock<Regex> = LazyLock::new(|| build_re(r"\.\s*AND\s*\."));
pub static OR_OP_RE: LazyLock<Regex> = LazyLock::new(|| build_re(r"\.\s*OR\s*\."));
pub static EQUIV_OP_RE: LazyLock<Regex> =
    LazyLock::new(|| build_re(r"\.\s*(?:EQV|NEQV)\s*\."));
pub static DEFINED_OP_RE: LazyLock<Regex> = LazyLock::new(|| build_re(r"\.[A-Z]+\."));
// Dotted spellings a user-defined operator may not take
pub static INTRINSIC_DOTTED_RE: LazyLock<Regex> = LazyLock::new(|| {
    build_re(r"^\.(?:EQ|NE|LT|LE|GT|GE|NOT|AND|OR|EQV|NEQV|TRUE|FALSE)\.$")
});

// ===== DECLARATIONS =====

// Type spec at the front of a masked declaration without `::`
pub static TYPE_SPEC_HEAD_RE: LazyLock<Regex> = LazyLock::new(|| {
    build_re(&format!(
        r"{SOL_STR}(?:DOUBLE\s*PRECISION|DOUBLE\s*COMPLEX|INTEGER|REAL|COMPLEX|LOGICAL|CHARACTER|TYPE|CLASS)(?:\s*\([^()]*\))?(?:\s*\*\s*(?:\d+|\([^()]*\)))?"
    ))
});
// Masked entity: name, optional (array-spec), optional *char-length
pub static ENTITY_DECL_RE: LazyLock<Regex> = LazyLock::new(|| {
    build_re(r"^([A-Z][\w$]*)\s*(\([^()]*\))?\s*(?:\*\s*(\d+|\([^()]*\)))?$")
});

// ===== STRUCTURE KEYWORDS (lookahead hooks) =====

// IF (...) THEN
pub static IF_THEN_RE: LazyLock<Regex> =
    LazyLock::new(|| build_re(&format!(r"{SOL_STR}IF\s*\(.*\)\s*THEN{EOL_STR}")));

// DO / DO 10 / DO WHILE
pub static DO_RE: LazyLock<Regex> =
    LazyLock::new(|| build_re(&format!(r"{SOL_STR}DO({EOL_STR}|\s*\d|\s+\w|\s*,)")));
pub static LABEL_DO_RE: LazyLock<Regex> =
    LazyLock::new(|| build_re(&format!(r"{SOL_STR}DO\s*(\d{{1,5}})\b")));

// SELECT CASE / SELECT TYPE and their guards
pub static SELECT_CASE_RE: LazyLock<Regex> =
    LazyLock::new(|| build_re(&format!(r"{SOL_STR}SELECT\s*CASE\s*\(")));
pub static SELECT_TYPE_RE: LazyLock<Regex> =
    LazyLock::new(|| build_re(&format!(r"{SOL_STR}SELECT\s*TYPE\s*\(")));
pub static CASE_RE: LazyLock<Regex> =
    LazyLock::new(|| build_re(&format!(r"{SOL_STR}CASE\s*(\(|DEFAULT\b)")));
pub static TYPE_GUARD_RE: LazyLock<Regex> = LazyLock::new(|| {
    build_re(&format!(
        r"{SOL_STR}((TYPE|CLASS)\s+IS\s*\(|CLASS\s+DEFAULT\b)"
    ))
});

// WHERE (mask) with or without a trailing assignment
pub static WHERE_RE: LazyLock<Regex> =
    LazyLock::new(|| build_re(&format!(r"{SOL_STR}WHERE\s*\(")));

// ===== READER =====

// Statement label: up to five digits followed by the statement
pub static STATEMENT_LABEL_RE: LazyLock<Regex> =
    LazyLock::new(|| build_re(r"^\s*(\d{1,5})\s+(\S.*)$"));
// Construct name prefix; a following `:` (i.e. `::`) is rejected by the caller
pub static CONSTRUCT_NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| build_re(r"^\s*([A-Z]\w*)\s*:(.*)$"));
// INCLUDE line: the keyword and one character literal naming the file
pub static INCLUDE_LINE_RE: LazyLock<Regex> =
    LazyLock::new(|| build_re(r#"^INCLUDE\s*('[^']*'|"[^"]*")$"#));
