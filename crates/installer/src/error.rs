//! Top-level error type and the shared file-operation context

use std::path::PathBuf;
use thiserror::Error;

use crate::deploy::DeployError;
use crate::download::DownloadError;
use crate::extract::ExtractionError;

/// Every failure that can cross the [`Installer`](crate::Installer) boundary
#[derive(Error, Debug)]
pub enum InstallerError {
    #[error(transparent)]
    Download(#[from] DownloadError),

    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    #[error(transparent)]
    Deploy(#[from] DeployError),

    /// Another install or uninstall is still running
    #[error("Another install or uninstall operation is already in progress")]
    Busy,

    #[error("Operation cancelled")]
    Cancelled,

    /// Scratch directory could not be prepared
    #[error("Could not prepare scratch directory '{path}'")]
    Scratch {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid configuration: {message}")]
    Configuration { message: String },
}

pub type Result<T> = std::result::Result<T, InstallerError>;

impl InstallerError {
    /// Stable tag for logging
    pub fn category(&self) -> &'static str {
        match self {
            InstallerError::Download(e) => e.category(),
            InstallerError::Extraction(e) => e.category(),
            InstallerError::Deploy(e) => e.category(),
            InstallerError::Busy => "busy",
            InstallerError::Cancelled => "cancelled",
            InstallerError::Scratch { .. } => "scratch",
            InstallerError::Configuration { .. } => "configuration",
        }
    }

    /// Whether the failure came from a user or token cancellation at any layer
    pub fn is_cancelled(&self) -> bool {
        matches!(
            self,
            InstallerError::Cancelled
                | InstallerError::Download(DownloadError::Cancelled)
                | InstallerError::Extraction(ExtractionError::Cancelled)
        )
    }
}

/// Kinds of file operations for error context
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileOperation {
    Read,
    Write,
    Create,
    Copy,
    Delete,
    Rename,
    Metadata,
    CreateDir,
}

impl std::fmt::Display for FileOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FileOperation::Read => write!(f, "reading"),
            FileOperation::Write => write!(f, "writing"),
            FileOperation::Create => write!(f, "creating"),
            FileOperation::Copy => write!(f, "copying"),
            FileOperation::Delete => write!(f, "deleting"),
            FileOperation::Rename => write!(f, "renaming"),
            FileOperation::Metadata => write!(f, "reading metadata of"),
            FileOperation::CreateDir => write!(f, "creating directory"),
        }
    }
}
