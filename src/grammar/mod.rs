//! Grammar data: rule identifiers, descriptors and the built-in rule set
//!
//! - `rule`: the [`RuleId`] enum
//! - `registry`: [`RuleDescriptor`], [`GrammarBuilder`], [`Grammar`]
//! - `expr`, `stmt`, `construct`: direct matchers and descriptors
//! - `f2003`, `f2008`: standard layers registered in order
//!
//! A later layer may override a rule or extend its alternatives; it never
//! needs to touch the engine.

pub mod construct;
pub mod expr;
pub mod f2003;
pub mod f2008;
pub mod registry;
pub mod rule;
pub mod stmt;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::GrammarError;

pub use registry::{Grammar, GrammarBuilder, Matcher, RuleDescriptor, TextMatcher};
pub use rule::RuleId;

/// Fortran language standard a grammar implements
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Standard {
    F2003,
    #[default]
    F2008,
}

impl fmt::Display for Standard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Standard::F2003 => write!(f, "f2003"),
            Standard::F2008 => write!(f, "f2008"),
        }
    }
}

impl FromStr for Standard {
    type Err = GrammarError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "f2003" | "2003" | "f03" => Ok(Standard::F2003),
            "f2008" | "2008" | "f08" => Ok(Standard::F2008),
            _ => Err(GrammarError::UnsupportedStandard(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_from_str() {
        assert_eq!("f2003".parse::<Standard>().unwrap(), Standard::F2003);
        assert_eq!("F08".parse::<Standard>().unwrap(), Standard::F2008);
        assert_eq!(
            "f77".parse::<Standard>().unwrap_err(),
            GrammarError::UnsupportedStandard("f77".into())
        );
    }

    #[test]
    fn test_standard_ordering() {
        assert!(Standard::F2008 > Standard::F2003);
        assert_eq!(Standard::default(), Standard::F2008);
        assert_eq!(Standard::F2003.to_string(), "f2003");
    }
}
