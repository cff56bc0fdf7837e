//! Matching engine
//!
//! - `session`: per-parse state (cache, recursion guard, diagnostics)
//! - `dispatch`: `Session::match_rule`, ordered-alternative dispatch
//! - `combinators`: the reusable matching shapes every rule is built from

pub mod combinators;
pub mod dispatch;
pub mod session;

use std::sync::Arc;

use crate::error::ParseError;
use crate::node::Node;

pub use session::{Session, SessionOptions, SessionStats};

/// `Ok(None)` is a clean no-match; `Err` is a parser fault or depth limit
pub type MatchResult = Result<Option<Arc<Node>>, ParseError>;
