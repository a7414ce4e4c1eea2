//! Error types for archive volume downloads

use std::path::PathBuf;
use thiserror::Error;

use crate::error::FileOperation;

#[derive(Error, Debug)]
pub enum DownloadError {
    /// Transport failure while requesting or streaming a volume
    #[error("Download of '{volume}' from '{url}' failed")]
    HttpRequest {
        volume: String,
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// Server answered with a non-success status
    #[error("Download of '{volume}' failed: server returned HTTP {status} for '{url}'")]
    HttpStatus {
        volume: String,
        url: String,
        status: u16,
    },

    /// Volume did not finish within the per-volume ceiling
    #[error("Download of '{volume}' timed out after {duration_secs}s (check your connection and retry)")]
    VolumeTimeout { volume: String, duration_secs: u64 },

    #[error("File operation failed while {operation} '{path}'")]
    FileSystem {
        path: PathBuf,
        operation: FileOperation,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid volume URL '{url}'")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("Could not create HTTP client")]
    Client(#[source] reqwest::Error),

    #[error("No archive volumes configured")]
    NoVolumes,

    #[error("Download cancelled")]
    Cancelled,
}

pub type Result<T> = std::result::Result<T, DownloadError>;

impl DownloadError {
    /// Name of the volume the error belongs to, when there is one
    pub fn volume(&self) -> Option<&str> {
        match self {
            DownloadError::HttpRequest { volume, .. }
            | DownloadError::HttpStatus { volume, .. }
            | DownloadError::VolumeTimeout { volume, .. } => Some(volume),
            _ => None,
        }
    }

    pub fn category(&self) -> &'static str {
        match self {
            DownloadError::HttpRequest { .. } => "http_request",
            DownloadError::HttpStatus { .. } => "http_status",
            DownloadError::VolumeTimeout { .. } => "volume_timeout",
            DownloadError::FileSystem { .. } => "file_system",
            DownloadError::InvalidUrl { .. } => "invalid_url",
            DownloadError::Client(_) => "http_client",
            DownloadError::NoVolumes => "no_volumes",
            DownloadError::Cancelled => "cancelled",
        }
    }

    pub(crate) fn fs(path: impl Into<PathBuf>, operation: FileOperation, source: std::io::Error) -> Self {
        DownloadError::FileSystem {
            path: path.into(),
            operation,
            source,
        }
    }
}
