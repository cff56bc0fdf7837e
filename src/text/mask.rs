/// Delimiter-aware masking
///
/// Before a rule searches a line for its delimiters (operators, commas,
/// keywords), everything that could contain a false delimiter is swapped
/// for a placeholder: non-trivial character literals, real literals with
/// an exponent (`1.0e-5` carries a `-`), and bracketed runs. The
/// [`MaskMap`] restores the original text byte for byte.
use std::collections::HashMap;

use super::bracket::split_bracketed;
use super::patterns::{EXPONENT_REAL_RE, PLACEHOLDER_PREFIX_RE, PLACEHOLDER_RE};
use super::quote::{split_quoted, Segment};

/// What a placeholder stands for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MaskKind {
    String,
    Real,
    Expr,
}

impl MaskKind {
    #[must_use]
    pub fn prefix(self) -> &'static str {
        match self {
            MaskKind::String => "_FSTR_",
            MaskKind::Real => "_FREAL_",
            MaskKind::Expr => "_FEXPR_",
        }
    }
}

/// Placeholder to original-text map produced by [`mask`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MaskMap {
    entries: HashMap<String, String>,
}

impl MaskMap {
    /// Replace every known placeholder in `text` with its original substring.
    ///
    /// Stored values never contain placeholders, so a single pass suffices.
    /// Unknown placeholder-shaped tokens are left untouched.
    #[must_use]
    pub fn apply(&self, text: &str) -> String {
        if self.entries.is_empty() {
            return text.to_string();
        }
        PLACEHOLDER_RE
            .replace_all(text, |caps: &regex::Captures<'_>| {
                let key = &caps[0];
                self.entries
                    .get(key)
                    .cloned()
                    .unwrap_or_else(|| key.to_string())
            })
            .into_owned()
    }

    /// Apply the map to a split piece and trim surrounding whitespace
    #[must_use]
    pub fn unmask_trimmed(&self, piece: &str) -> String {
        self.apply(piece).trim().to_string()
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

/// Result of [`mask`]: the masked line plus the map that inverts it
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Masked {
    pub text: String,
    pub map: MaskMap,
}

impl Masked {
    /// The identity mask: `text` unchanged, nothing to restore
    #[must_use]
    pub fn identity(text: &str) -> Self {
        Self {
            text: text.to_string(),
            map: MaskMap::default(),
        }
    }

    /// Restore the original text
    #[must_use]
    pub fn unmask(&self) -> String {
        self.map.apply(&self.text)
    }
}

/// Accumulates entries while one line is being masked
#[derive(Default)]
struct MaskBuilder {
    map: MaskMap,
    reverse: HashMap<(MaskKind, String), String>,
    counters: HashMap<MaskKind, usize>,
}

impl MaskBuilder {
    /// Placeholder for `value`, reusing an earlier one for identical text.
    /// `value` is expanded first so stored entries are placeholder-free.
    fn placeholder(&mut self, kind: MaskKind, value: &str) -> String {
        let value = self.map.apply(value);
        if let Some(key) = self.reverse.get(&(kind, value.clone())) {
            return key.clone();
        }
        let counter = self.counters.entry(kind).or_insert(0);
        *counter += 1;
        let key = format!("{}{}_", kind.prefix(), counter);
        self.map.entries.insert(key.clone(), value.clone());
        self.reverse.insert((kind, value), key.clone());
        key
    }
}

/// Trivial literal content and bare identifiers stay in place
fn is_word(text: &str) -> bool {
    text.chars().all(|c| c.is_alphanumeric() || c == '_')
}

fn mask_strings(builder: &mut MaskBuilder, text: &str) -> String {
    let (segments, _) = split_quoted(text, None);
    let mut out = String::with_capacity(text.len());
    for segment in segments {
        match segment {
            Segment::Plain(plain) => out.push_str(&plain),
            Segment::Quoted { quote, raw } => {
                let body = &raw[quote.len_utf8()..];
                let (body, closed) = match body.strip_suffix(quote) {
                    Some(inner) => (inner, true),
                    None => (body, false),
                };
                if is_word(body) {
                    out.push_str(&raw);
                    continue;
                }
                let key = builder.placeholder(MaskKind::String, body);
                out.push(quote);
                out.push_str(&key);
                if closed {
                    out.push(quote);
                }
            }
        }
    }
    out
}

fn mask_reals(builder: &mut MaskBuilder, text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut last = 0;
    for caps in EXPONENT_REAL_RE.captures_iter(text) {
        let Some(literal) = caps.get(1) else {
            continue;
        };
        out.push_str(&text[last..literal.start()]);
        out.push_str(&builder.placeholder(MaskKind::Real, literal.as_str()));
        last = literal.end();
    }
    out.push_str(&text[last..]);
    out
}

fn mask_brackets(builder: &mut MaskBuilder, text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for item in split_bracketed(text, "([", ")]") {
        let closer = match item.chars().next() {
            Some('(') => ')',
            Some('[') => ']',
            _ => {
                out.push_str(&item);
                continue;
            }
        };
        let inner = match item[1..].strip_suffix(closer) {
            Some(inner) if !is_word(inner.trim()) => inner,
            _ => {
                out.push_str(&item);
                continue;
            }
        };
        let key = builder.placeholder(MaskKind::Expr, inner);
        out.push_str(&item[..1]);
        out.push_str(&key);
        out.push(closer);
    }
    out
}

/// Mask `text` so delimiter searches only see top-level syntax.
///
/// Text that already contains a placeholder prefix is returned unchanged
/// with an empty map, keeping `mask(t).unmask() == t` for every input.
#[must_use]
pub fn mask(text: &str) -> Masked {
    if PLACEHOLDER_PREFIX_RE.is_match(text) {
        return Masked::identity(text);
    }
    let mut builder = MaskBuilder::default();
    let masked = mask_strings(&mut builder, text);
    let masked = mask_reals(&mut builder, &masked);
    let masked = mask_brackets(&mut builder, &masked);
    Masked {
        text: masked,
        map: builder.map,
    }
}
