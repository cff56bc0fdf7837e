//! fparse - Parse free-form Fortran into a concrete syntax tree

#![warn(clippy::all)]
#![warn(clippy::pedantic)]

use std::fs::File;
use std::io::{self, IsTerminal, Read, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use fparse::config::OutputMode;
use fparse::diagnostics::Diagnostic;
use fparse::error::ParseError;
use fparse::parse::{parse_source, ParsedUnit};
use fparse::{parse_args, CliArgs, Config, Result};
use glob::Pattern;
use rayon::prelude::*;
use tracing_subscriber::EnvFilter;
use walkdir::WalkDir;

/// Fortran file extensions to process
const FORTRAN_EXTENSIONS: &[&str] = &[
    "f90", "f95", "f03", "f08", "f18", "F90", "F95", "F03", "F08", "F18",
];

/// Default maximum file size in bytes (100 MB)
const DEFAULT_MAX_FILE_SIZE: u64 = 100 * 1024 * 1024;

/// How one input ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Status {
    Clean,
    Skipped,
    SyntaxErrors,
    Fault,
}

impl Status {
    fn exit_code(self) -> ExitCode {
        match self {
            Status::Clean | Status::Skipped => ExitCode::SUCCESS,
            Status::SyntaxErrors => ExitCode::from(1),
            Status::Fault => ExitCode::from(2),
        }
    }
}

/// Output and diagnostics for one input, printed after the parse
struct FileReport {
    name: String,
    output: String,
    diagnostics: Vec<Diagnostic>,
    status: Status,
}

fn main() -> ExitCode {
    let args = parse_args();
    init_tracing(args.debug);

    match run(&args) {
        Ok(status) => status.exit_code(),
        Err(e) => {
            eprintln!("Error: {e:#}");
            Status::Fault.exit_code()
        }
    }
}

fn init_tracing(debug: bool) {
    let filter = if debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .try_init();
}

fn run(args: &CliArgs) -> Result<Status> {
    let use_stdin =
        args.inputs.is_empty() || (args.inputs.len() == 1 && args.inputs[0].as_os_str() == "-");

    if args.inputs.is_empty() && io::stdin().is_terminal() {
        print_usage();
        return Ok(Status::Clean);
    }

    let pool = build_pool(args.jobs)?;

    if use_stdin {
        let config = build_config(args, None)?;
        let report = pool.install(|| process_stdin(&config))?;
        return Ok(emit(&[report], args));
    }

    // An explicit config file applies to every input
    let base_config = match &args.config {
        Some(_) => Some(build_config(args, None)?),
        None => None,
    };

    let files = collect_files(args);
    if files.is_empty() {
        if !args.silent {
            eprintln!("No Fortran files found to parse.");
        }
        return Ok(Status::Clean);
    }

    let process = |path: &PathBuf| -> FileReport {
        let result = match &base_config {
            Some(config) => process_single_file(path, config, args),
            None => build_config(args, Some(path))
                .and_then(|config| process_single_file(path, &config, args)),
        };
        result.unwrap_or_else(|e| fault_report(path.display().to_string(), &e))
    };

    let reports: Vec<FileReport> = if args.jobs == Some(1) {
        pool.install(|| files.iter().map(process).collect())
    } else {
        pool.install(|| files.par_iter().map(process).collect())
    };

    Ok(emit(&reports, args))
}

/// Rayon pool sized by `--jobs`; each parse runs on its own deep stack
fn build_pool(jobs: Option<usize>) -> Result<rayon::ThreadPool> {
    let mut builder = rayon::ThreadPoolBuilder::new();
    if let Some(jobs) = jobs.filter(|&j| j > 0) {
        builder = builder.num_threads(jobs);
    }
    Ok(builder.build()?)
}

/// Build configuration from CLI args and optional config file
///
/// If `for_path` is provided and no explicit config file is specified,
/// uses auto-discovery to find config files in parent directories.
fn build_config(args: &CliArgs, for_path: Option<&Path>) -> Result<Config> {
    let mut config = if let Some(config_path) = &args.config {
        tracing::debug!("using explicit config file: {}", config_path.display());
        Config::from_toml_file(config_path)?
    } else {
        let start = match for_path {
            Some(path) => path.to_path_buf(),
            None => std::env::current_dir().unwrap_or_default(),
        };
        let discovered = Config::discover_config_files(&start);
        if discovered.is_empty() {
            tracing::debug!("no config files discovered for {}", start.display());
        }
        for f in &discovered {
            tracing::debug!("discovered config file: {}", f.display());
        }
        Config::from_discovered_files(&start)
    };

    // Override with CLI arguments
    if let Some(standard) = args.standard {
        config.standard = standard;
    }
    if let Some(output) = args.output {
        config.output = output;
    }
    if let Some(indent) = args.indent {
        config.indent = indent;
    }
    if let Some(max_depth) = args.max_depth {
        config.max_depth = max_depth;
    }
    if args.no_memoize {
        config.memoize = false;
    }
    if args.ignore_comments {
        config.ignore_comments = true;
    }

    log_config(&config);

    if let Some(error) = config.validate() {
        anyhow::bail!("Invalid configuration: {error}");
    }

    Ok(config)
}

fn log_config(config: &Config) {
    tracing::debug!("configuration:");
    tracing::debug!("  standard: {}", config.standard);
    tracing::debug!("  memoize: {}", config.memoize);
    tracing::debug!("  ignore_comments: {}", config.ignore_comments);
    tracing::debug!("  indent: {}", config.indent);
    tracing::debug!("  max_depth: {}", config.max_depth);
    tracing::debug!("  output: {}", config.output);
}

/// Collect all files to process, handling directories and recursive flag
fn collect_files(args: &CliArgs) -> Vec<PathBuf> {
    let exclude_patterns: Vec<Pattern> = args
        .exclude
        .iter()
        .filter_map(|p| Pattern::new(p).ok())
        .collect();
    let custom_extensions = &args.fortran_extensions;

    let mut files = Vec::new();
    for input in &args.inputs {
        if input.is_file() {
            if !is_excluded(input, &exclude_patterns) {
                files.push(input.clone());
            }
        } else if input.is_dir() {
            let max_depth = if args.recursive { 256 } else { 1 };
            for entry in WalkDir::new(input)
                .follow_links(true)
                .max_depth(max_depth)
                .sort_by_file_name()
                .into_iter()
                .filter_map(std::result::Result::ok)
            {
                let path = entry.path();
                if path.is_file()
                    && is_fortran_file(path, custom_extensions)
                    && !is_excluded(path, &exclude_patterns)
                {
                    files.push(path.to_path_buf());
                }
            }
        } else {
            tracing::warn!("no such file or directory: {}", input.display());
        }
    }
    files
}

/// Check if a path matches any exclusion pattern
fn is_excluded(path: &Path, patterns: &[Pattern]) -> bool {
    if patterns.is_empty() {
        return false;
    }
    let path_str = path.to_string_lossy();
    patterns.iter().any(|pattern| {
        pattern.matches(&path_str)
            || path.components().any(|component| match component {
                std::path::Component::Normal(c) => pattern.matches(&c.to_string_lossy()),
                _ => false,
            })
    })
}

/// Count the number of lines in a byte buffer
#[allow(clippy::naive_bytecount)]
fn count_lines(contents: &[u8]) -> usize {
    let newlines = contents.iter().filter(|&&b| b == b'\n').count();
    if contents.is_empty() {
        0
    } else if contents.last() == Some(&b'\n') {
        newlines
    } else {
        newlines + 1
    }
}

/// Check if a file has a Fortran extension
fn is_fortran_file(path: &Path, custom_extensions: &[String]) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            FORTRAN_EXTENSIONS.contains(&ext)
                || custom_extensions
                    .iter()
                    .any(|custom| ext == custom.strip_prefix('.').unwrap_or(custom))
        })
}

/// Parse a single file
fn process_single_file(path: &Path, config: &Config, args: &CliArgs) -> Result<FileReport> {
    let name = path.display().to_string();
    let _span = tracing::info_span!("file", path = %name).entered();

    let file_size = std::fs::metadata(path)?.len();
    if file_size > DEFAULT_MAX_FILE_SIZE {
        tracing::warn!(
            "skipping ({} MB exceeds limit of {} MB)",
            file_size / (1024 * 1024),
            DEFAULT_MAX_FILE_SIZE / (1024 * 1024)
        );
        return Ok(skipped_report(name));
    }

    let mut contents = Vec::new();
    File::open(path)?.read_to_end(&mut contents)?;

    if let Some(max_lines) = args.exclude_max_lines {
        let line_count = count_lines(&contents);
        if line_count > max_lines {
            tracing::warn!("skipping ({line_count} lines exceeds limit of {max_lines})");
            return Ok(skipped_report(name));
        }
    }

    let source = String::from_utf8_lossy(&contents);
    Ok(parse_to_report(name, &source, config))
}

/// Parse standard input
fn process_stdin(config: &Config) -> Result<FileReport> {
    let _span = tracing::info_span!("file", path = "stdin").entered();
    let mut contents = Vec::new();
    io::stdin().read_to_end(&mut contents)?;

    #[allow(clippy::cast_possible_truncation)]
    let size = contents.len() as u64;
    if size > DEFAULT_MAX_FILE_SIZE {
        anyhow::bail!(
            "stdin input too large ({} MB exceeds limit of {} MB)",
            size / (1024 * 1024),
            DEFAULT_MAX_FILE_SIZE / (1024 * 1024)
        );
    }

    let source = String::from_utf8_lossy(&contents);
    Ok(parse_to_report("stdin".to_string(), &source, config))
}

fn parse_to_report(name: String, source: &str, config: &Config) -> FileReport {
    match parse_source(source, config.parse_options()) {
        Ok(unit) => {
            let status = if unit.has_errors() {
                Status::SyntaxErrors
            } else {
                Status::Clean
            };
            FileReport {
                output: render(&unit, config),
                diagnostics: unit.diagnostics,
                name,
                status,
            }
        }
        Err(e) => fault_report(name, &e),
    }
}

fn render(unit: &ParsedUnit, config: &Config) -> String {
    match config.output {
        OutputMode::Source => unit.to_source_text(&config.indent_unit()),
        OutputMode::Tree => unit
            .root
            .as_ref()
            .map(|root| root.to_debug_tree(0))
            .unwrap_or_default(),
        OutputMode::Check => String::new(),
    }
}

fn skipped_report(name: String) -> FileReport {
    FileReport {
        name,
        output: String::new(),
        diagnostics: Vec::new(),
        status: Status::Skipped,
    }
}

fn fault_report(name: String, error: &anyhow::Error) -> FileReport {
    // Reader limits and I/O problems surface here too
    let kind = match error.downcast_ref::<ParseError>() {
        Some(ParseError::NestingTooDeep { .. }) => "nesting limit",
        Some(e) if e.is_internal() => "internal fault",
        _ => "error",
    };
    tracing::error!("{name}: {kind}: {error:#}");
    FileReport {
        name,
        output: String::new(),
        diagnostics: Vec::new(),
        status: Status::Fault,
    }
}

/// Print reports in input order; returns the worst status
fn emit(reports: &[FileReport], args: &CliArgs) -> Status {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    let mut worst = Status::Clean;
    let mut with_errors = 0;

    for report in reports {
        worst = worst.max(report.status);
        if report.status == Status::SyntaxErrors {
            with_errors += 1;
        }
        if !report.output.is_empty() {
            if reports.len() > 1 {
                let _ = writeln!(out, "=== {} ===", report.name);
            }
            let _ = writeln!(out, "{}", report.output);
        }
        if !args.silent {
            for diagnostic in &report.diagnostics {
                eprintln!("{}:{diagnostic}", report.name);
            }
        }
    }

    if !args.silent && reports.len() > 1 {
        eprintln!(
            "Parsed {} files, {with_errors} with syntax errors.",
            reports.len()
        );
    }
    worst
}

fn print_usage() {
    println!(
        "fparse v{} - Fortran 2003/2008 parser",
        env!("CARGO_PKG_VERSION")
    );
    println!();
    println!("Usage:");
    println!("  fparse [OPTIONS] <FILE>...");
    println!("  fparse [OPTIONS] -r <DIRECTORY>");
    println!("  fparse [OPTIONS] -              # Read from stdin");
    println!();
    println!("Examples:");
    println!("  fparse file.f90                 # Print regenerated source");
    println!("  fparse -o tree file.f90         # Print the syntax tree");
    println!("  fparse -o check -r src/         # Report diagnostics only");
    println!("  fparse --std f2003 file.f90     # Use the Fortran 2003 grammar");
    println!();
    println!("Exit status: 0 clean, 1 syntax errors, 2 internal fault or nesting limit.");
    println!("Run with --help for all options.");
}
