//! Structured error handling and exit codes.

use serde::Serialize;

/// Exit codes for the wechat-dedup application.
///
/// - 0: Success (duplicates found and handled)
/// - 1: General error (unexpected failure)
/// - 2: No duplicates found
/// - 3: Partial success (completed with warnings)
/// - 130: Interrupted by user (Ctrl+C)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ExitCode {
    /// Duplicates were found and every planned step succeeded.
    Success = 0,
    /// An unexpected error occurred.
    GeneralError = 1,
    /// The run completed but found no duplicates.
    NoDuplicates = 2,
    /// The run completed but recorded warnings.
    PartialSuccess = 3,
    /// The run was interrupted by the user (Ctrl+C).
    Interrupted = 130,
}

impl ExitCode {
    /// Get the numeric exit code.
    #[must_use]
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    /// Get the machine-readable code prefix.
    #[must_use]
    pub fn code_prefix(self) -> &'static str {
        match self {
            Self::Success => "WD000",
            Self::GeneralError => "WD001",
            Self::NoDuplicates => "WD002",
            Self::PartialSuccess => "WD003",
            Self::Interrupted => "WD130",
        }
    }
}

/// Structured error information for JSON output.
#[derive(Debug, Serialize)]
pub struct StructuredError {
    /// The error code (e.g., "WD001")
    pub code: String,
    /// The exit code number
    pub exit_code: i32,
    /// Human-readable error message, including its causes
    pub message: String,
    /// Whether the operation was interrupted
    pub interrupted: bool,
}

impl StructuredError {
    /// Create a new structured error from an anyhow error and an exit code.
    #[must_use]
    pub fn new(err: &anyhow::Error, exit_code: ExitCode) -> Self {
        Self {
            code: exit_code.code_prefix().to_string(),
            exit_code: exit_code.as_i32(),
            message: format!("{:#}", err),
            interrupted: exit_code == ExitCode::Interrupted,
        }
    }
}

/// Pick the exit code for an error that ended the run.
#[must_use]
pub fn exit_code_for(err: &anyhow::Error) -> ExitCode {
    let interrupted = err.chain().any(|cause| {
        matches!(
            cause.downcast_ref::<crate::pipeline::PipelineError>(),
            Some(crate::pipeline::PipelineError::Interrupted)
        ) || matches!(
            cause.downcast_ref::<crate::duplicates::FinderError>(),
            Some(crate::duplicates::FinderError::Interrupted)
        )
    });
    if interrupted {
        ExitCode::Interrupted
    } else {
        ExitCode::GeneralError
    }
}
