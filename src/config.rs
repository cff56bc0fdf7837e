//! Configuration management for fparse.
//!
//! This module provides the [`Config`] struct which controls parsing and output.
//! Configuration can be loaded from:
//! - TOML files (`fparse.toml`)
//! - CLI arguments (which override file settings)
//!
//! Config files are auto-discovered by searching parent directories from the file
//! being parsed up to the filesystem root, plus the user's home directory.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::grammar::Standard;
use crate::parse::{ParseOptions, DEFAULT_MAX_DEPTH};

/// Config file names to search for (in order of priority, later overrides earlier)
const CONFIG_FILE_NAMES: &[&str] = &["fparse.toml"];

/// Get the user's home directory
fn dirs_home() -> Option<PathBuf> {
    if let Ok(home) = std::env::var("HOME") {
        return Some(PathBuf::from(home));
    }
    if let Ok(userprofile) = std::env::var("USERPROFILE") {
        return Some(PathBuf::from(userprofile));
    }
    None
}

/// What the binary prints for each parsed file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputMode {
    /// Canonical source text regenerated from the tree
    #[default]
    Source,
    /// Indented debug view of the tree
    Tree,
    /// Diagnostics only
    Check,
}

impl fmt::Display for OutputMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputMode::Source => write!(f, "source"),
            OutputMode::Tree => write!(f, "tree"),
            OutputMode::Check => write!(f, "check"),
        }
    }
}

impl FromStr for OutputMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "source" => Ok(OutputMode::Source),
            "tree" => Ok(OutputMode::Tree),
            "check" => Ok(OutputMode::Check),
            other => Err(format!("unknown output mode '{other}'")),
        }
    }
}

// Serde default functions
fn default_indent() -> usize {
    2
}
fn default_max_depth() -> usize {
    DEFAULT_MAX_DEPTH
}
fn default_true() -> bool {
    true
}

/// Main configuration struct for fparse
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Language standard (default: f2008)
    #[serde(default)]
    pub standard: Standard,

    /// Memoize rule results per session (default: true)
    #[serde(default = "default_true")]
    pub memoize: bool,

    /// Drop comments before parsing (default: false)
    #[serde(default)]
    pub ignore_comments: bool,

    /// Spaces per indent level when regenerating source (default: 2)
    #[serde(default = "default_indent")]
    pub indent: usize,

    /// Nesting limit for rule and block recursion (default: 2000)
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,

    /// Output mode (default: source)
    #[serde(default)]
    pub output: OutputMode,
}

/// Partial configuration for TOML parsing
///
/// All fields are `Option<T>` so we can distinguish between
/// "explicitly set" and "not specified" when merging configs.
#[derive(Debug, Clone, Default, Deserialize)]
struct PartialConfig {
    pub standard: Option<Standard>,
    pub memoize: Option<bool>,
    pub ignore_comments: Option<bool>,
    pub indent: Option<usize>,
    pub max_depth: Option<usize>,
    pub output: Option<OutputMode>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            standard: Standard::default(),
            memoize: true,
            ignore_comments: false,
            indent: 2,
            max_depth: DEFAULT_MAX_DEPTH,
            output: OutputMode::Source,
        }
    }
}

impl Config {
    /// Maximum reasonable indent size
    const MAX_INDENT: usize = 20;
    /// Below this even a small program unit cannot nest
    const MIN_DEPTH: usize = 16;

    /// Validate configuration values are within reasonable bounds
    ///
    /// Returns an error message if validation fails, None if valid.
    #[must_use]
    pub fn validate(&self) -> Option<String> {
        if self.indent > Self::MAX_INDENT {
            return Some(format!(
                "indent {} exceeds maximum of {}",
                self.indent,
                Self::MAX_INDENT
            ));
        }
        if self.max_depth < Self::MIN_DEPTH {
            return Some(format!(
                "max_depth {} is below minimum of {}",
                self.max_depth,
                Self::MIN_DEPTH
            ));
        }
        None
    }

    /// Options handed to the parser
    #[must_use]
    pub fn parse_options(&self) -> ParseOptions {
        ParseOptions {
            standard: self.standard,
            memoize: self.memoize,
            ignore_comments: self.ignore_comments,
            max_depth: Some(self.max_depth),
        }
    }

    /// One indentation level of regenerated source
    #[must_use]
    pub fn indent_unit(&self) -> String {
        " ".repeat(self.indent)
    }

    /// Load configuration from a TOML file
    pub fn from_toml_file(path: &Path) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let partial: PartialConfig = toml::from_str(&contents)?;
        let mut config = Self::default();
        config.apply_partial(&partial);
        Ok(config)
    }

    /// Apply a partial config, only overriding fields that are explicitly set
    fn apply_partial(&mut self, partial: &PartialConfig) {
        if let Some(v) = partial.standard {
            self.standard = v;
        }
        if let Some(v) = partial.memoize {
            self.memoize = v;
        }
        if let Some(v) = partial.ignore_comments {
            self.ignore_comments = v;
        }
        if let Some(v) = partial.indent {
            self.indent = v;
        }
        if let Some(v) = partial.max_depth {
            self.max_depth = v;
        }
        if let Some(v) = partial.output {
            self.output = v;
        }
    }

    /// Discover config files from parent directories of a given path
    ///
    /// Searches from the file's directory up to the root, then adds home directory config.
    /// Returns list of config file paths in order of priority (least specific first).
    #[must_use]
    pub fn discover_config_files(start_path: &Path) -> Vec<PathBuf> {
        let mut config_files = Vec::new();

        if let Some(home) = dirs_home() {
            for config_name in CONFIG_FILE_NAMES {
                let home_config = home.join(config_name);
                if home_config.is_file() {
                    config_files.push(home_config);
                }
            }
        }

        let start_dir = if start_path.is_file() {
            start_path.parent().map(Path::to_path_buf)
        } else if start_path.is_dir() {
            Some(start_path.to_path_buf())
        } else {
            std::env::current_dir().ok()
        };

        if let Some(dir) = start_dir {
            let mut ancestors: Vec<PathBuf> = dir.ancestors().map(Path::to_path_buf).collect();
            // root first, so closer files override
            ancestors.reverse();

            for ancestor in ancestors {
                for config_name in CONFIG_FILE_NAMES {
                    let config_path = ancestor.join(config_name);
                    if config_path.is_file() && !config_files.contains(&config_path) {
                        config_files.push(config_path);
                    }
                }
            }
        }

        config_files
    }

    /// Load and merge configuration from discovered config files
    ///
    /// Later files override earlier ones (only explicitly set values).
    /// Unreadable or malformed files are skipped with a warning.
    #[must_use]
    pub fn from_discovered_files(start_path: &Path) -> Self {
        let mut config = Self::default();
        for path in &Self::discover_config_files(start_path) {
            match std::fs::read_to_string(path) {
                Ok(contents) => match toml::from_str::<PartialConfig>(&contents) {
                    Ok(partial) => config.apply_partial(&partial),
                    Err(e) => tracing::warn!("failed to parse {}: {e}", path.display()),
                },
                Err(e) => tracing::warn!("failed to read {}: {e}", path.display()),
            }
        }
        config
    }
}
