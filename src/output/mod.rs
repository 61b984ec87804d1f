//! Run reports and their formatters.
//!
//! This module provides:
//! - [`ReportBuilder`] to accumulate per-group outcomes and warnings
//! - Markdown rendering, written into the quarantine directory
//! - JSON for automation and scripting
//!
//! # Example
//!
//! ```no_run
//! use wechat_dedup::output::{MarkdownReport, ReportBuilder, RunMode};
//! use std::path::Path;
//!
//! let builder = ReportBuilder::new(RunMode::DryRun, Path::new("/tmp/quarantine"));
//! let report = builder.finish(chrono::Utc::now());
//! println!("{}", MarkdownReport::new(&report).render());
//! ```

pub mod json;
pub mod markdown;
pub mod report;

pub use json::{JsonOutput, JsonOutputError};
pub use markdown::{MarkdownReport, REPORT_FILE_NAME};
pub use report::{
    FailedMove, GroupReport, MovedFile, ReportBuilder, ReportSummary, RunMode, RunReport, Stage,
    Warning,
};
