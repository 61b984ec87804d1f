//! Command-line interface definitions for wechat-dedup.
//!
//! This module defines all CLI arguments, subcommands, and options using the clap derive API.
//! Global options (verbosity, color, error format, config file) apply to every subcommand.
//!
//! # Example
//!
//! ```bash
//! # Preview what would be moved, using the platform's WeChat folders
//! wechat-dedup scan
//!
//! # Preview a specific folder as JSON
//! wechat-dedup scan ~/Documents/WeChat\ Files --output json
//!
//! # Move duplicates without asking
//! wechat-dedup dedupe --yes --min-size 10KB
//!
//! # Put everything back
//! wechat-dedup restore
//! ```

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::config::ConfigOverrides;

/// Find byte-identical WeChat documents and quarantine the extra copies.
///
/// Files are grouped by size, confirmed with a BLAKE3 digest, and every copy
/// except the oldest is moved into a quarantine folder. Nothing is deleted.
#[derive(Debug, Parser)]
#[command(name = "wechat-dedup")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase verbosity level (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    pub no_color: bool,

    /// Print errors as JSON on stderr
    #[arg(long, global = true)]
    pub json_errors: bool,

    /// Configuration file (default: <config dir>/wechat-dedup/config.toml)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Find duplicates and report what would be moved (dry run)
    Scan(ScanArgs),
    /// Find duplicates and move the extra copies into quarantine
    Dedupe(DedupeArgs),
    /// Move quarantined files back to their original locations
    Restore(RestoreArgs),
    /// Show the default WeChat folders for this platform
    Roots,
}

/// Options shared by `scan` and `dedupe`.
#[derive(Debug, Clone, Default, Args)]
pub struct FilterArgs {
    /// Directories to scan (default: the platform's WeChat folders)
    #[arg(value_name = "ROOT")]
    pub roots: Vec<PathBuf>,

    /// File extensions to consider, comma separated (default: pdf,doc,docx)
    #[arg(long = "ext", value_name = "EXT", value_delimiter = ',')]
    pub extensions: Vec<String>,

    /// Minimum file size to consider (e.g., 500, 1KB, 2MiB)
    ///
    /// Supports suffixes: B, KB, KiB, MB, MiB, GB, GiB, TB, TiB
    #[arg(long, value_name = "SIZE", value_parser = parse_size)]
    pub min_size: Option<u64>,

    /// Quarantine directory (default: ~/WeChat-Duplicates)
    #[arg(long, value_name = "DIR")]
    pub quarantine: Option<PathBuf>,

    /// Gitignore-style patterns to skip (can be specified multiple times)
    #[arg(short, long, value_name = "PATTERN")]
    pub exclude: Vec<String>,

    /// Number of I/O threads for hashing (default: 4)
    #[arg(long, value_name = "N")]
    pub io_threads: Option<usize>,
}

impl FilterArgs {
    /// Values given on the command line, for the top configuration layer.
    #[must_use]
    pub fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            roots: non_empty(&self.roots),
            extensions: non_empty(&self.extensions),
            min_size: self.min_size,
            quarantine_dir: self.quarantine.clone(),
            exclude: non_empty(&self.exclude),
            io_threads: self.io_threads,
        }
    }
}

fn non_empty<T: Clone>(values: &[T]) -> Option<Vec<T>> {
    (!values.is_empty()).then(|| values.to_vec())
}

/// Arguments for the scan subcommand.
#[derive(Debug, Args)]
pub struct ScanArgs {
    #[command(flatten)]
    pub filters: FilterArgs,

    /// Output format of the preview
    #[arg(short, long, value_enum, default_value = "markdown")]
    pub output: OutputFormat,

    /// Also write the preview to this file
    #[arg(long, value_name = "PATH")]
    pub report: Option<PathBuf>,
}

/// Arguments for the dedupe subcommand.
#[derive(Debug, Args)]
pub struct DedupeArgs {
    #[command(flatten)]
    pub filters: FilterArgs,

    /// Move without asking for confirmation
    #[arg(short = 'y', long)]
    pub yes: bool,

    /// Output format of the final report on stdout
    #[arg(short, long, value_enum, default_value = "markdown")]
    pub output: OutputFormat,
}

/// Arguments for the restore subcommand.
#[derive(Debug, Args)]
pub struct RestoreArgs {
    /// Manifest to restore from (default: the one in the quarantine directory)
    #[arg(long, value_name = "PATH")]
    pub manifest: Option<PathBuf>,

    /// Quarantine directory holding the manifest
    #[arg(long, value_name = "DIR", conflicts_with = "manifest")]
    pub quarantine: Option<PathBuf>,
}

/// Output format for reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Markdown, as written into the quarantine directory
    Markdown,
    /// JSON output for scripting
    Json,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Markdown => write!(f, "markdown"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}

/// Parse a human-readable size string into bytes.
///
/// Supports suffixes: B, KB, KiB, MB, MiB, GB, GiB, TB, TiB
/// Case-insensitive. Numbers without suffix are treated as bytes.
///
/// # Examples
///
/// ```
/// use wechat_dedup::cli::parse_size;
///
/// assert_eq!(parse_size("1024").unwrap(), 1024);
/// assert_eq!(parse_size("1KB").unwrap(), 1000);
/// assert_eq!(parse_size("2MiB").unwrap(), 2_097_152);
/// ```
///
/// # Errors
///
/// Returns an error if the string is empty, contains an invalid number,
/// a negative number, or an unknown size suffix.
pub fn parse_size(s: &str) -> Result<u64, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("Size cannot be empty".to_string());
    }
    if s.starts_with('-') {
        return Err("Size cannot be negative".to_string());
    }

    let (num_str, suffix) = match s.find(|c: char| !c.is_ascii_digit() && c != '.') {
        Some(idx) => (&s[..idx], s[idx..].trim().to_uppercase()),
        None => (s, String::new()),
    };

    let num: f64 = num_str
        .parse()
        .map_err(|_| format!("Invalid number: '{num_str}'"))?;

    let multiplier: u64 = match suffix.as_str() {
        "" | "B" => 1,
        "KB" | "K" => 1_000,
        "KIB" => 1_024,
        "MB" | "M" => 1_000_000,
        "MIB" => 1_048_576,
        "GB" | "G" => 1_000_000_000,
        "GIB" => 1_073_741_824,
        "TB" | "T" => 1_000_000_000_000,
        "TIB" => 1_099_511_627_776,
        _ => return Err(format!("Unknown size suffix: '{suffix}'")),
    };

    Ok((num * multiplier as f64) as u64)
}
