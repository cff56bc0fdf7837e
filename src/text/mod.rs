//! Text utilities shared by every rule
//!
//! - `quote`: quote-aware scanning and splitting
//! - `bracket`: top-level bracket splitting
//! - `mask`: placeholder masking and its inverse map
//! - `patterns`: compiled regexes for operators, literals and keywords

pub mod bracket;
pub mod mask;
pub mod patterns;
pub mod quote;

pub use bracket::{is_bracketed, split_bracketed};
pub use mask::{mask, MaskKind, MaskMap, Masked};
pub use quote::{comment_start, split_quoted, CharFilter, Segment, StringDelimiter};
