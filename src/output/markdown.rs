//! Markdown rendering of a [`RunReport`].
//!
//! Layout: a header with the run metadata, a summary table, one section
//! per duplicate group and a closing warnings section.

use std::fmt::{self, Write as _};
use std::io::{self, Write};
use std::path::Path;

use bytesize::ByteSize;

use super::report::{RunMode, RunReport};

/// File name of the report written into the quarantine directory.
pub const REPORT_FILE_NAME: &str = "dedup-report.md";

/// Markdown formatter for a run report.
#[derive(Debug, Clone, Copy)]
pub struct MarkdownReport<'a> {
    report: &'a RunReport,
}

impl<'a> MarkdownReport<'a> {
    /// Formatter over a finished report.
    #[must_use]
    pub fn new(report: &'a RunReport) -> Self {
        Self { report }
    }

    /// Render the whole document.
    #[must_use]
    pub fn render(&self) -> String {
        let mut out = String::new();
        // Formatting into a String only fails if a Display impl does, and
        // none of ours do.
        let _ = self.write_markdown(&mut out);
        out
    }

    /// Format the whole document into `out`.
    ///
    /// # Errors
    ///
    /// Returns any error from the formatter.
    pub fn write_markdown<W: fmt::Write>(&self, out: &mut W) -> fmt::Result {
        self.write_header(out)?;
        self.write_summary(out)?;
        self.write_groups(out)?;
        self.write_warnings(out)
    }

    /// Write the rendered document to `writer`.
    ///
    /// # Errors
    ///
    /// Returns any error from the writer, or from formatting.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        let mut text = String::new();
        self.write_markdown(&mut text).map_err(io::Error::other)?;
        writer.write_all(text.as_bytes())
    }

    fn write_header<W: fmt::Write>(&self, out: &mut W) -> fmt::Result {
        let r = self.report;
        writeln!(out, "# WeChat Duplicate Report\n")?;
        writeln!(
            out,
            "- **Generated**: {}",
            r.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
        )?;
        writeln!(out, "- **Mode**: {}", r.mode)?;
        writeln!(out, "- **Quarantine**: {}", code(&r.quarantine_dir))?;
        if r.roots.is_empty() {
            writeln!(out, "- **Roots**: none")?;
        } else {
            writeln!(out, "- **Roots**:")?;
            for root in &r.roots {
                writeln!(out, "  - {}", code(root))?;
            }
        }
        if r.summary.interrupted {
            writeln!(
                out,
                "\n> Interrupted. Files moved before the interruption are listed below."
            )?;
        }
        out.write_char('\n')
    }

    fn write_summary<W: fmt::Write>(&self, out: &mut W) -> fmt::Result {
        let s = &self.report.summary;
        writeln!(out, "## Summary\n")?;
        writeln!(out, "| Metric | Value |")?;
        writeln!(out, "|--------|-------|")?;
        writeln!(out, "| Files scanned | {} |", s.files_scanned)?;
        writeln!(out, "| Duplicate groups | {} |", s.duplicate_groups)?;
        writeln!(out, "| Files to move | {} |", s.files_to_move)?;
        writeln!(out, "| Files moved | {} |", s.files_moved)?;
        writeln!(out, "| Failed moves | {} |", s.move_failures)?;
        writeln!(
            out,
            "| Space reclaimed | {} ({} bytes) |",
            ByteSize(s.bytes_reclaimed),
            s.bytes_reclaimed
        )?;
        writeln!(
            out,
            "| Space reclaimable | {} ({} bytes) |",
            ByteSize(s.bytes_reclaimable),
            s.bytes_reclaimable
        )?;
        writeln!(out, "| Warnings | {} |", s.warnings)?;
        out.write_char('\n')
    }

    fn write_groups<W: fmt::Write>(&self, out: &mut W) -> fmt::Result {
        let r = self.report;
        writeln!(out, "## Duplicate Groups\n")?;
        if r.groups.is_empty() {
            return writeln!(out, "No duplicates found.\n");
        }

        for (i, group) in r.groups.iter().enumerate() {
            writeln!(out, "### Group {}\n", i + 1)?;
            writeln!(out, "- **Digest**: `{}`", group.digest)?;
            writeln!(out, "- **Size**: {} ({} bytes)", ByteSize(group.size), group.size)?;
            writeln!(out, "- **Keep**: {}", code(&group.keeper))?;

            match r.mode {
                RunMode::DryRun => {
                    writeln!(out, "- **Would move**:")?;
                    for path in &group.planned {
                        writeln!(out, "  - {}", code(path))?;
                    }
                }
                RunMode::Apply => {
                    if !group.moved.is_empty() {
                        writeln!(out, "- **Moved**:")?;
                        for moved in &group.moved {
                            writeln!(out, "  - {} → {}", code(&moved.from), code(&moved.to))?;
                        }
                    }
                    if !group.failed.is_empty() {
                        writeln!(out, "- **Failed**:")?;
                        for failed in &group.failed {
                            writeln!(out, "  - {}: {}", code(&failed.path), failed.reason)?;
                        }
                    }
                    let untouched = group
                        .planned
                        .len()
                        .saturating_sub(group.moved.len() + group.failed.len());
                    if untouched > 0 {
                        writeln!(out, "- **Not attempted**: {}", untouched)?;
                    }
                }
            }
            out.write_char('\n')?;
        }
        Ok(())
    }

    fn write_warnings<W: fmt::Write>(&self, out: &mut W) -> fmt::Result {
        let warnings = &self.report.warnings;
        writeln!(out, "## Warnings\n")?;
        if warnings.is_empty() {
            return writeln!(out, "None.");
        }
        for warning in warnings {
            writeln!(out, "- [{}] {}", warning.stage, warning.message)?;
        }
        Ok(())
    }
}

fn code(path: &Path) -> String {
    format!("`{}`", path.display())
}
