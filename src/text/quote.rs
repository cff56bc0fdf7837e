/// Quote-aware scanning of Fortran source text
///
/// [`CharFilter`] walks a line and reports only the characters that sit
/// outside character literals (optionally stopping at a `!` comment), while
/// [`split_quoted`] cuts a line into alternating plain and quoted runs.
/// Both honour the Fortran convention that a doubled quote inside a literal
/// stands for one literal quote character.

/// Type of character-literal delimiter we're currently inside
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StringDelimiter {
    #[default]
    None,
    Single, // '...'
    Double, // "..."
}

impl StringDelimiter {
    #[must_use]
    pub fn from_char(c: char) -> Self {
        match c {
            '\'' => StringDelimiter::Single,
            '"' => StringDelimiter::Double,
            _ => StringDelimiter::None,
        }
    }

    #[must_use]
    pub fn as_char(self) -> Option<char> {
        match self {
            StringDelimiter::None => None,
            StringDelimiter::Single => Some('\''),
            StringDelimiter::Double => Some('"'),
        }
    }
}

/// Iterator adapter that skips character-literal contents
///
/// Yields `(byte_offset, char)` pairs for code characters only. Quote
/// delimiters themselves are skipped too.
pub struct CharFilter<'a> {
    chars: std::str::CharIndices<'a>,
    instring: StringDelimiter,
    stop_at_comment: bool,
    done: bool,
}

impl<'a> CharFilter<'a> {
    /// Create a new `CharFilter`
    ///
    /// # Arguments
    /// * `content` - The line to scan
    /// * `stop_at_comment` - End iteration at the first `!` outside a literal
    #[must_use]
    pub fn new(content: &'a str, stop_at_comment: bool) -> Self {
        Self::with_string_state(content, stop_at_comment, StringDelimiter::None)
    }

    /// Create a `CharFilter` that starts inside a literal left open by a
    /// previous physical line.
    #[must_use]
    pub fn with_string_state(
        content: &'a str,
        stop_at_comment: bool,
        string_state: StringDelimiter,
    ) -> Self {
        Self {
            chars: content.char_indices(),
            instring: string_state,
            stop_at_comment,
            done: false,
        }
    }

    /// Delimiter of the literal we're currently inside, if any
    #[must_use]
    pub fn get_string_state(&self) -> StringDelimiter {
        self.instring
    }

    #[must_use]
    pub fn instring(&self) -> bool {
        self.instring != StringDelimiter::None
    }

    /// Collect the filtered code characters into a string
    pub fn filter_all(&mut self) -> String {
        let mut result = String::new();
        for (_, c) in self.by_ref() {
            result.push(c);
        }
        result
    }
}

impl Iterator for CharFilter<'_> {
    type Item = (usize, char);

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        loop {
            let (pos, c) = self.chars.next()?;
            if let Some(delim) = self.instring.as_char() {
                if c == delim {
                    // a doubled quote closes and immediately reopens
                    self.instring = StringDelimiter::None;
                }
                continue;
            }
            match c {
                '\'' | '"' => {
                    self.instring = StringDelimiter::from_char(c);
                }
                '!' if self.stop_at_comment => {
                    self.done = true;
                    return None;
                }
                _ => return Some((pos, c)),
            }
        }
    }
}

/// One run produced by [`split_quoted`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// Text outside any character literal
    Plain(String),
    /// A character literal, delimiters included. When the literal resumed a
    /// run opened on a previous line the opening delimiter is absent; when it
    /// is unterminated the closing delimiter is absent.
    Quoted { quote: char, raw: String },
}

impl Segment {
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Segment::Plain(s) | Segment::Quoted { raw: s, .. } => s,
        }
    }

    #[must_use]
    pub fn is_quoted(&self) -> bool {
        matches!(self, Segment::Quoted { .. })
    }

    /// Literal content with delimiters removed and doubled quotes collapsed
    #[must_use]
    pub fn unescaped(&self) -> String {
        match self {
            Segment::Plain(s) => s.clone(),
            Segment::Quoted { quote, raw } => {
                let body = raw.strip_prefix(*quote).unwrap_or(raw);
                let body = body.strip_suffix(*quote).unwrap_or(body);
                let doubled: String = [*quote, *quote].iter().collect();
                body.replace(&doubled, &quote.to_string())
            }
        }
    }
}

/// Find the byte offset of the quote that closes a literal delimited by
/// `quote`, scanning from `start`. Doubled quotes are skipped as escapes.
fn closing_quote(text: &str, start: usize, quote: char) -> Option<usize> {
    let bytes = text.as_bytes();
    let q = quote as u8;
    let mut i = start;
    while i < bytes.len() {
        if bytes[i] == q {
            if bytes.get(i + 1) == Some(&q) {
                i += 2;
                continue;
            }
            return Some(i);
        }
        i += 1;
    }
    None
}

/// Split `text` into alternating plain and quoted runs.
///
/// `continuation_quote` resumes a literal left open by the previous physical
/// line: the text up to (and including) its closing quote becomes the first
/// quoted segment. Returns the segments plus the delimiter of a literal still
/// open at the end of `text`.
#[must_use]
pub fn split_quoted(text: &str, continuation_quote: Option<char>) -> (Vec<Segment>, Option<char>) {
    let mut segments = Vec::new();
    let mut pos = 0;

    if let Some(quote) = continuation_quote {
        match closing_quote(text, 0, quote) {
            Some(end) => {
                segments.push(Segment::Quoted {
                    quote,
                    raw: text[..=end].to_string(),
                });
                pos = end + 1;
            }
            None => {
                segments.push(Segment::Quoted {
                    quote,
                    raw: text.to_string(),
                });
                return (segments, Some(quote));
            }
        }
    }

    let mut plain_start = pos;
    while let Some(offset) = text[pos..].find(['\'', '"']) {
        let open = pos + offset;
        let quote = if text.as_bytes()[open] == b'\'' {
            '\''
        } else {
            '"'
        };
        if open > plain_start {
            segments.push(Segment::Plain(text[plain_start..open].to_string()));
        }
        match closing_quote(text, open + 1, quote) {
            Some(end) => {
                segments.push(Segment::Quoted {
                    quote,
                    raw: text[open..=end].to_string(),
                });
                pos = end + 1;
                plain_start = pos;
            }
            None => {
                segments.push(Segment::Quoted {
                    quote,
                    raw: text[open..].to_string(),
                });
                return (segments, Some(quote));
            }
        }
    }
    if plain_start < text.len() {
        segments.push(Segment::Plain(text[plain_start..].to_string()));
    }
    (segments, None)
}

/// Byte offset of the first `!` that starts a comment (outside literals)
#[must_use]
pub fn comment_start(line: &str) -> Option<usize> {
    let mut instring = StringDelimiter::None;
    for (pos, c) in line.char_indices() {
        if let Some(delim) = instring.as_char() {
            if c == delim {
                instring = StringDelimiter::None;
            }
            continue;
        }
        match c {
            '\'' | '"' => instring = StringDelimiter::from_char(c),
            '!' => return Some(pos),
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_strings() {
        let result = CharFilter::new(r#"x = "hello" + 5"#, false).filter_all();
        assert_eq!(result, "x =  + 5");
    }

    #[test]
    fn test_filter_stops_at_comment() {
        let result = CharFilter::new("x = 5 ! note 'a'", true).filter_all();
        assert_eq!(result, "x = 5 ");
    }

    #[test]
    fn test_bang_inside_string_is_not_comment() {
        let result = CharFilter::new("print *, 'hi!' ! c", true).filter_all();
        assert_eq!(result, "print *,  ");
    }

    #[test]
    fn test_filter_doubled_quote() {
        let result = CharFilter::new("a = 'It''s' // b", false).filter_all();
        assert_eq!(result, "a =  // b");
    }

    #[test]
    fn test_filter_string_state_carries() {
        let mut filter = CharFilter::new("x = 'abc", false);
        let _ = filter.filter_all();
        assert_eq!(filter.get_string_state(), StringDelimiter::Single);

        let mut resumed = CharFilter::with_string_state("def' + y", false, StringDelimiter::Single);
        assert_eq!(resumed.filter_all(), " + y");
        assert!(!resumed.instring());
    }

    #[test]
    fn test_split_quoted_escape() {
        let (segments, open) = split_quoted("'It''s fine'", None);
        assert_eq!(open, None);
        assert_eq!(segments.len(), 1);
        assert!(segments[0].is_quoted());
        assert_eq!(segments[0].unescaped(), "It's fine");
    }

    #[test]
    fn test_split_quoted_alternating() {
        let (segments, open) = split_quoted(r#"a = 'x' // "y" + b"#, None);
        assert_eq!(open, None);
        let texts: Vec<&str> = segments.iter().map(Segment::as_str).collect();
        assert_eq!(texts, vec!["a = ", "'x'", " // ", "\"y\"", " + b"]);
    }

    #[test]
    fn test_split_quoted_unterminated() {
        let (segments, open) = split_quoted("a = 'abc", None);
        assert_eq!(open, Some('\''));
        assert_eq!(segments.last().map(Segment::as_str), Some("'abc"));
    }

    #[test]
    fn test_split_quoted_continuation() {
        let (segments, open) = split_quoted("def' // x", Some('\''));
        assert_eq!(open, None);
        assert_eq!(segments[0].as_str(), "def'");
        assert_eq!(segments[1].as_str(), " // x");
    }

    #[test]
    fn test_split_quoted_continuation_still_open() {
        let (segments, open) = split_quoted("no closing here", Some('"'));
        assert_eq!(open, Some('"'));
        assert_eq!(segments.len(), 1);
    }

    #[test]
    fn test_split_quoted_empty() {
        let (segments, open) = split_quoted("", None);
        assert!(segments.is_empty());
        assert_eq!(open, None);
    }

    #[test]
    fn test_comment_start() {
        assert_eq!(comment_start("x = 1 ! c"), Some(6));
        assert_eq!(comment_start("s = '!'"), None);
    }
}
