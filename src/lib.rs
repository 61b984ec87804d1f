//! wechat-dedup - WeChat duplicate document finder
//!
//! Finds byte-identical documents that WeChat saved again and again under
//! different names, keeps the oldest copy of each, and moves the rest into
//! a quarantine folder with a report and a restore manifest.
//!
//! The library entry point is [`pipeline::Pipeline`]; [`run_app`] wires it
//! to the command line.

pub mod actions;
pub mod cli;
pub mod config;
pub mod duplicates;
pub mod error;
pub mod locate;
pub mod logging;
pub mod manifest;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod scanner;
pub mod signal;

use std::io::{self, BufRead, IsTerminal, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use bytesize::ByteSize;
use chrono::Utc;
use yansi::Paint;

use crate::actions::restore_manifest;
use crate::cli::{Cli, Commands, DedupeArgs, OutputFormat, RestoreArgs, ScanArgs};
use crate::config::{Config, ConfigOverrides};
use crate::error::ExitCode;
use crate::manifest::Manifest;
use crate::output::{JsonOutput, MarkdownReport, RunReport};
use crate::pipeline::Pipeline;
use crate::progress::Progress;

/// Run the command described by `cli`.
///
/// # Errors
///
/// Returns an error for run-level failures: bad configuration, no reachable
/// root, an uncreatable quarantine directory, an unreadable manifest or an
/// interruption before anything was moved.
pub fn run_app(cli: Cli) -> Result<ExitCode> {
    logging::init_logging(cli.verbose, cli.quiet);
    if cli.no_color || !io::stdout().is_terminal() {
        yansi::disable();
    }

    match cli.command {
        Commands::Scan(ref args) => run_scan(&cli, args),
        Commands::Dedupe(ref args) => run_dedupe(&cli, args),
        Commands::Restore(ref args) => run_restore(&cli, args),
        Commands::Roots => run_roots(&cli),
    }
}

fn build_pipeline(cli: &Cli, overrides: &ConfigOverrides, json: bool) -> Result<Pipeline> {
    let config = Config::load(cli.config.as_deref(), overrides)?;
    log::debug!("Effective configuration: {:?}", config);

    let handler = signal::install_handler()?;
    let progress = Arc::new(Progress::new(cli.quiet || json));

    Ok(Pipeline::new(config.to_pipeline_config())
        .with_shutdown_flag(handler.get_flag())
        .with_progress_callback(progress))
}

fn print_report(report: &RunReport, format: OutputFormat) -> Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    match format {
        OutputFormat::Markdown => MarkdownReport::new(report).write_to(&mut out)?,
        OutputFormat::Json => JsonOutput::new(report).write_to(&mut out, true)?,
    }
    out.flush()?;
    Ok(())
}

fn run_scan(cli: &Cli, args: &ScanArgs) -> Result<ExitCode> {
    let json = args.output == OutputFormat::Json;
    let pipeline = build_pipeline(cli, &args.filters.overrides(), json)?;

    let detection = pipeline.detect()?;
    let report = pipeline.preview(&detection, Utc::now());

    print_report(&report, args.output)?;
    if let Some(path) = &args.report {
        std::fs::write(path, MarkdownReport::new(&report).render())
            .with_context(|| format!("Failed to write report to {}", path.display()))?;
        log::info!("Preview written to {}", path.display());
    }

    Ok(report.exit_code())
}

fn run_dedupe(cli: &Cli, args: &DedupeArgs) -> Result<ExitCode> {
    let json = args.output == OutputFormat::Json;
    let pipeline = build_pipeline(cli, &args.filters.overrides(), json)?;

    let detection = pipeline.detect()?;
    if detection.is_empty() {
        let report = pipeline.preview(&detection, Utc::now());
        print_report(&report, args.output)?;
        return Ok(report.exit_code());
    }

    if !args.yes {
        let preview = pipeline.preview(&detection, Utc::now());
        print_preview(&preview);
        if !confirm(&format!(
            "Move {} file(s) into {}?",
            detection.files_to_move(),
            pipeline.config().quarantine_dir.display()
        ))? {
            eprintln!("Cancelled. Nothing was moved.");
            return Ok(ExitCode::Success);
        }
    }

    let report = pipeline.apply(&detection, Utc::now())?;
    match args.output {
        OutputFormat::Json => print_report(&report, OutputFormat::Json)?,
        OutputFormat::Markdown if cli.quiet => {}
        OutputFormat::Markdown => print_outcome(&report),
    }

    Ok(report.exit_code())
}

fn run_restore(cli: &Cli, args: &RestoreArgs) -> Result<ExitCode> {
    let manifest_path = match &args.manifest {
        Some(path) => path.clone(),
        None => {
            let overrides = ConfigOverrides {
                quarantine_dir: args.quarantine.clone(),
                ..Default::default()
            };
            let config = Config::load(cli.config.as_deref(), &overrides)?;
            Manifest::path_in(&config.quarantine_dir)
        }
    };

    if !manifest_path.exists() {
        println!("Nothing to restore: {} does not exist", manifest_path.display());
        return Ok(ExitCode::Success);
    }

    let manifest = Manifest::load(&manifest_path)?;
    log::info!(
        "Restoring {} file(s) from {}",
        manifest.len(),
        manifest_path.display()
    );

    let handler = signal::install_handler()?;
    let flag = handler.get_flag();
    let (remaining, outcome) = restore_manifest(manifest, Some(&flag));

    remaining.save(&manifest_path).with_context(|| {
        format!(
            "Restored files are still listed in {}",
            manifest_path.display()
        )
    })?;

    if !cli.quiet {
        println!(
            "{} {} ({})",
            "Restored".green().bold(),
            outcome.restored.len(),
            ByteSize(outcome.bytes_restored())
        );
        for (entry, err) in &outcome.failed {
            println!(
                "{} {}: {}",
                "Kept in quarantine".yellow(),
                entry.quarantined_path.display(),
                err
            );
        }
    }

    Ok(if outcome.interrupted {
        ExitCode::Interrupted
    } else if !outcome.failed.is_empty() {
        ExitCode::PartialSuccess
    } else {
        ExitCode::Success
    })
}

fn run_roots(cli: &Cli) -> Result<ExitCode> {
    if cli.quiet {
        return Ok(ExitCode::Success);
    }
    for root in locate::default_roots() {
        let status = if root.is_dir() {
            "found".green().to_string()
        } else {
            "missing".red().to_string()
        };
        println!("{:>8}  {}", status, root.display());
    }
    println!(
        "{:>8}  {}",
        "quarantine".dim(),
        locate::default_quarantine_dir().display()
    );
    Ok(ExitCode::Success)
}

/// Short colored listing of what would be moved.
fn print_preview(report: &RunReport) {
    for (i, group) in report.groups.iter().enumerate() {
        println!(
            "{} {} ({} each)",
            format!("Group {}", i + 1).bold(),
            group.digest.short_hex().dim(),
            ByteSize(group.size)
        );
        println!("  {} {}", "keep".green(), group.keeper.display());
        for path in &group.planned {
            println!("  {} {}", "move".yellow(), path.display());
        }
    }
    println!(
        "\n{} file(s) to move, {} reclaimable, {} warning(s)",
        report.summary.files_to_move,
        ByteSize(report.summary.bytes_reclaimable),
        report.summary.warnings
    );
}

/// Colored one-screen summary after an apply run.
fn print_outcome(report: &RunReport) {
    let s = &report.summary;
    println!(
        "{} {} file(s), reclaimed {}",
        "Moved".green().bold(),
        s.files_moved,
        report.space_display()
    );
    if s.move_failures > 0 {
        println!("{} {} file(s) left in place", "Failed".red().bold(), s.move_failures);
    }
    if s.warnings > 0 {
        println!("{} {}", "Warnings:".yellow(), s.warnings);
    }
    if s.interrupted {
        println!("{}", "Interrupted before every duplicate was moved".yellow());
    }
    println!("Report: {}", report_path(&report.quarantine_dir).display());
}

fn report_path(quarantine_dir: &Path) -> PathBuf {
    quarantine_dir.join(output::REPORT_FILE_NAME)
}

fn confirm(question: &str) -> Result<bool> {
    if !io::stdin().is_terminal() {
        anyhow::bail!("Refusing to move files without confirmation; pass --yes");
    }
    print!("{} [y/N] ", question);
    io::stdout().flush()?;

    let mut answer = String::new();
    io::stdin().lock().read_line(&mut answer)?;
    Ok(matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"))
}
