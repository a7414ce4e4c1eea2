//! Error types for archive extraction

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use crate::error::FileOperation;

#[derive(Error, Debug)]
pub enum ExtractionError {
    /// The tool could not be started at all
    #[error("Could not start '{tool}'")]
    ToolSpawn {
        tool: String,
        #[source]
        source: std::io::Error,
    },

    /// The tool started but its exit status could not be collected
    #[error("'{tool}' started but could not be waited on")]
    ToolWait {
        tool: String,
        #[source]
        source: std::io::Error,
    },

    /// The tool ran and exited unsuccessfully
    #[error("'{tool}' exited with {}: {stderr}", .code.map(|c| format!("code {c}")).unwrap_or_else(|| "no exit code".to_string()))]
    ToolFailed {
        tool: String,
        code: Option<i32>,
        stderr: String,
    },

    #[error("'{tool}' did not finish within {timeout:?}")]
    ToolTimeout { tool: String, timeout: Duration },

    /// Every candidate and raw command failed
    #[error("No extraction tool succeeded (tried: {}); last error: {last_error}", .attempted.join(", "))]
    AllToolsFailed {
        attempted: Vec<String>,
        last_error: String,
    },

    #[error("Extracted payload not found under '{searched}'")]
    PayloadNotFound { searched: PathBuf },

    #[error("File operation failed while {operation} '{path}'")]
    FileSystem {
        path: PathBuf,
        operation: FileOperation,
        #[source]
        source: std::io::Error,
    },

    #[error("Extraction cancelled")]
    Cancelled,
}

pub type Result<T> = std::result::Result<T, ExtractionError>;

impl ExtractionError {
    pub fn category(&self) -> &'static str {
        match self {
            ExtractionError::ToolSpawn { .. } => "tool_spawn",
            ExtractionError::ToolWait { .. } => "tool_wait",
            ExtractionError::ToolFailed { .. } => "tool_failed",
            ExtractionError::ToolTimeout { .. } => "tool_timeout",
            ExtractionError::AllToolsFailed { .. } => "no_tool_succeeded",
            ExtractionError::PayloadNotFound { .. } => "payload_not_found",
            ExtractionError::FileSystem { .. } => "file_system",
            ExtractionError::Cancelled => "cancelled",
        }
    }

    pub(crate) fn fs(path: impl Into<PathBuf>, operation: FileOperation, source: std::io::Error) -> Self {
        ExtractionError::FileSystem {
            path: path.into(),
            operation,
            source,
        }
    }
}
