//! JSON output formatter for run reports.
//!
//! Provides machine-readable JSON output for scripting and automation.
//!
//! # Output Schema
//!
//! ```json
//! {
//!   "report": {
//!     "generated_at": "2026-01-02T03:04:05Z",
//!     "mode": "apply",
//!     "roots": ["/home/me/Documents/WeChat Files"],
//!     "quarantine_dir": "/home/me/WeChat-Duplicates",
//!     "summary": { "duplicate_groups": 1, "files_moved": 1, "bytes_reclaimed": 5000, ... },
//!     "groups": [
//!       {
//!         "digest": "abc123...",
//!         "size": 5000,
//!         "keeper": "/.../b.pdf",
//!         "planned": ["/.../a.pdf"],
//!         "moved": [{ "from": "/.../a.pdf", "to": "/.../WeChat-Duplicates/a.pdf" }],
//!         "failed": [],
//!         "bytes_reclaimed": 5000,
//!         "bytes_reclaimable": 5000
//!       }
//!     ],
//!     "warnings": []
//!   },
//!   "exit_code": 0,
//!   "exit_code_name": "WD000"
//! }
//! ```

use std::io::Write;

use serde::Serialize;

use super::report::RunReport;
use crate::error::ExitCode;

/// Complete JSON output structure.
#[derive(Debug, Clone, Serialize)]
pub struct JsonOutput<'a> {
    /// The run report
    pub report: &'a RunReport,
    /// The exit code number
    pub exit_code: i32,
    /// The machine-readable exit code name (e.g., "WD000")
    pub exit_code_name: &'static str,
}

impl<'a> JsonOutput<'a> {
    /// Wrap a report with the exit code it produces.
    #[must_use]
    pub fn new(report: &'a RunReport) -> Self {
        let exit_code: ExitCode = report.exit_code();
        Self {
            report,
            exit_code: exit_code.as_i32(),
            exit_code_name: exit_code.code_prefix(),
        }
    }

    /// Serialize to compact JSON string.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails (unlikely for valid data).
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Serialize to pretty-printed JSON string.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails (unlikely for valid data).
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Write JSON to a writer.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or writing fails.
    pub fn write_to<W: Write>(&self, writer: &mut W, pretty: bool) -> Result<(), JsonOutputError> {
        let json = if pretty {
            self.to_json_pretty()?
        } else {
            self.to_json()?
        };
        writer.write_all(json.as_bytes())?;
        writer.write_all(b"\n")?;
        Ok(())
    }
}

/// Errors that can occur during JSON output.
#[derive(thiserror::Error, Debug)]
pub enum JsonOutputError {
    /// JSON serialization error
    #[error("JSON serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O error during writing
    #[error("I/O error during JSON generation: {0}")]
    Io(#[from] std::io::Error),
}
