//! Multi-line constructs
//!
//! - `spec`: [`BlockSpec`], the declarative shape of a block rule
//! - `hooks`: lookahead hooks that re-rank interior candidates
//! - `matcher`: `Session::match_block`, the item-level state machine

pub mod hooks;
pub mod matcher;
pub mod spec;

pub use hooks::{execution_hooks, LookaheadHook};
pub use spec::{BlockSpec, NameCheck};
