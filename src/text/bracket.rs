/// Top-level bracket splitting
///
/// Splits a line into alternating plain and bracketed runs. Only the
/// outermost nesting level produces a cut; quoted text is opaque and a
/// backslash makes the following bracket or quote literal.
use super::quote::StringDelimiter;

/// Split `text` at the top bracket level.
///
/// `open` and `close` are parallel alphabets: `close[i]` closes `open[i]`.
/// Empty runs are omitted. A bracket left open at the end of the input
/// yields a final run that starts with the opener.
#[must_use]
pub fn split_bracketed(text: &str, open: &str, close: &str) -> Vec<String> {
    let openers: Vec<char> = open.chars().collect();
    let closers: Vec<char> = close.chars().collect();
    debug_assert_eq!(openers.len(), closers.len(), "unbalanced bracket alphabets");

    let mut items = Vec::new();
    let mut stack: Vec<char> = Vec::new();
    let mut instring = StringDelimiter::None;
    let mut escaped = false;
    let mut start = 0;

    let push = |items: &mut Vec<String>, from: usize, to: usize| {
        if to > from {
            items.push(text[from..to].to_string());
        }
    };

    for (idx, c) in text.char_indices() {
        if c == '\\' {
            escaped = !escaped;
            continue;
        }
        if escaped {
            escaped = false;
            continue;
        }
        if let Some(delim) = instring.as_char() {
            if c == delim {
                instring = StringDelimiter::None;
            }
            continue;
        }
        if c == '\'' || c == '"' {
            instring = StringDelimiter::from_char(c);
        } else if let Some(pos) = openers.iter().position(|&o| o == c) {
            if stack.is_empty() {
                push(&mut items, start, idx);
                start = idx;
            }
            stack.push(closers[pos]);
        } else if stack.last() == Some(&c) {
            stack.pop();
            if stack.is_empty() {
                let end = idx + c.len_utf8();
                push(&mut items, start, end);
                start = end;
            }
        }
    }
    push(&mut items, start, text.len());
    items
}

/// True when `segment` is a complete bracketed run such as `(a, b)`
#[must_use]
pub fn is_bracketed(segment: &str, open: char, close: char) -> bool {
    segment.len() >= 2 && segment.starts_with(open) && segment.ends_with(close)
}
