//! fparse - Line-oriented matching engine for free-form Fortran 2003/2008
//!
//! Source is split into logical items, matched against a registry of
//! statement and block rules, and turned into a concrete syntax tree that
//! regenerates canonical source text.

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::module_name_repetitions)]

pub mod block;
pub mod cli;
pub mod config;
pub mod diagnostics;
pub mod engine;
pub mod error;
pub mod grammar;
pub mod node;
pub mod parse;
pub mod reader;
pub mod text;

// Re-export commonly used types
pub use cli::{build_cli, parse_args, parse_args_from, CliArgs};
pub use config::{Config, OutputMode};
pub use diagnostics::{Diagnostic, Severity};
pub use engine::{Session, SessionOptions};
pub use error::{GrammarError, ParseError, Result};
pub use grammar::{Grammar, RuleId, Standard};
pub use node::{Child, Node, Shape, Span};
pub use parse::{parse_items, parse_reader, parse_source, parse_str, ParseOptions, ParsedUnit};
pub use reader::{FreeFormReader, Item, ItemSource};
