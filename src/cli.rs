//! Command-line interface for fparse.
//!
//! Defines CLI arguments using clap builder API

use std::path::PathBuf;

use clap::{Arg, ArgAction, Command};

use crate::config::OutputMode;
use crate::grammar::Standard;

/// CLI arguments parsed from command line
#[derive(Debug, Clone)]
pub struct CliArgs {
    /// Files or directories to parse
    pub inputs: Vec<PathBuf>,

    /// Language standard
    pub standard: Option<Standard>,

    /// What to print per file
    pub output: Option<OutputMode>,

    /// Spaces per indent level in regenerated source
    pub indent: Option<usize>,

    /// Nesting limit
    pub max_depth: Option<usize>,

    /// Disable the per-session rule cache
    pub no_memoize: bool,

    /// Drop comments before parsing
    pub ignore_comments: bool,

    /// Explicit config file path
    pub config: Option<PathBuf>,

    /// Recurse into directories
    pub recursive: bool,

    /// Silent mode
    pub silent: bool,

    /// Number of parallel jobs
    pub jobs: Option<usize>,

    /// Exclude patterns (glob syntax)
    pub exclude: Vec<String>,

    /// Additional Fortran file extensions
    pub fortran_extensions: Vec<String>,

    /// Skip files with more lines than this
    pub exclude_max_lines: Option<usize>,

    /// Debug logging
    pub debug: bool,
}

fn parse_standard(value: &str) -> Result<Standard, String> {
    value.parse::<Standard>().map_err(|e| e.to_string())
}

fn parse_output(value: &str) -> Result<OutputMode, String> {
    value.parse::<OutputMode>()
}

#[must_use]
pub fn build_cli() -> Command {
    Command::new("fparse")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Parse free-form Fortran 2003/2008 into a concrete syntax tree")
        .arg(
            Arg::new("inputs")
                .help("Files or directories to parse ('-' or none reads stdin)")
                .value_name("FILE")
                .num_args(1..)
                .required(false)
                .value_parser(clap::value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("std")
                .long("std")
                .help("Language standard: f2003 or f2008 [default: f2008]")
                .value_name("STD")
                .value_parser(parse_standard),
        )
        .arg(
            Arg::new("output")
                .short('o')
                .long("output")
                .help("Output: source, tree or check [default: source]")
                .value_name("MODE")
                .value_parser(parse_output),
        )
        .arg(
            Arg::new("indent")
                .short('i')
                .long("indent")
                .help("Number of spaces per indent level [default: 2]")
                .value_name("NUM")
                .value_parser(clap::value_parser!(usize)),
        )
        .arg(
            Arg::new("max-depth")
                .long("max-depth")
                .help("Nesting limit for rules and blocks [default: 2000]")
                .value_name("NUM")
                .value_parser(clap::value_parser!(usize)),
        )
        .arg(
            Arg::new("no-memoize")
                .long("no-memoize")
                .help("Disable the per-file rule cache")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("ignore-comments")
                .long("ignore-comments")
                .help("Drop comments before parsing")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .help("Path to configuration file (overrides auto-discovery)")
                .value_name("FILE")
                .value_parser(clap::value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("recursive")
                .short('r')
                .long("recursive")
                .help("Recursively parse directories")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("exclude")
                .short('e')
                .long("exclude")
                .help("Exclude files/directories matching pattern (glob syntax, can be repeated)")
                .value_name("PATTERN")
                .action(ArgAction::Append),
        )
        .arg(
            Arg::new("fortran")
                .short('f')
                .long("fortran")
                .help("Additional Fortran file extension (can be repeated, e.g., -f f03 -f F03)")
                .value_name("EXT")
                .action(ArgAction::Append),
        )
        .arg(
            Arg::new("exclude-max-lines")
                .short('m')
                .long("exclude-max-lines")
                .help("Exclude files with more than this many lines")
                .value_name("NUM")
                .value_parser(clap::value_parser!(usize)),
        )
        .arg(
            Arg::new("debug")
                .short('D')
                .long("debug")
                .help("Enable debug logging (config, rule attempts, diagnostics)")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("silent")
                .short('S')
                .long("silent")
                .help("Silent mode (no summary or diagnostics)")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("jobs")
                .short('j')
                .long("jobs")
                .help("Number of parallel jobs (0=auto, 1=sequential)")
                .value_name("NUM")
                .value_parser(clap::value_parser!(usize)),
        )
}

#[must_use]
pub fn parse_args() -> CliArgs {
    args_from_matches(&build_cli().get_matches())
}

#[must_use]
pub fn parse_args_from<I, T>(args: I) -> CliArgs
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    args_from_matches(&build_cli().get_matches_from(args))
}

fn args_from_matches(matches: &clap::ArgMatches) -> CliArgs {
    CliArgs {
        inputs: matches
            .get_many::<PathBuf>("inputs")
            .map(|vals| vals.cloned().collect())
            .unwrap_or_default(),
        standard: matches.get_one::<Standard>("std").copied(),
        output: matches.get_one::<OutputMode>("output").copied(),
        indent: matches.get_one::<usize>("indent").copied(),
        max_depth: matches.get_one::<usize>("max-depth").copied(),
        no_memoize: matches.get_flag("no-memoize"),
        ignore_comments: matches.get_flag("ignore-comments"),
        config: matches.get_one::<PathBuf>("config").cloned(),
        recursive: matches.get_flag("recursive"),
        exclude: matches
            .get_many::<String>("exclude")
            .map(|vals| vals.cloned().collect())
            .unwrap_or_default(),
        fortran_extensions: matches
            .get_many::<String>("fortran")
            .map(|vals| vals.cloned().collect())
            .unwrap_or_default(),
        exclude_max_lines: matches.get_one::<usize>("exclude-max-lines").copied(),
        debug: matches.get_flag("debug"),
        silent: matches.get_flag("silent"),
        jobs: matches.get_one::<usize>("jobs").copied(),
    }
}
