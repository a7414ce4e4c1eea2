use std::path::PathBuf;
use thiserror::Error;

use crate::error::FileOperation;

/// Fatal deployment failures; anything that may degrade is a step outcome instead
#[derive(Error, Debug)]
pub enum DeployError {
    #[error("No game executable found under '{root}'")]
    GameExecutableMissing { root: PathBuf },

    #[error("Required asset '{asset}' not found (searched: {searched})")]
    MissingAsset { asset: String, searched: String },

    #[error("No installed dubbing files found to uninstall")]
    NothingToUninstall,

    #[error("Installed file missing after copy: '{path}'")]
    VerificationFailed { path: PathBuf },

    #[error("File operation failed while {operation} '{path}'")]
    FileSystem {
        path: PathBuf,
        operation: FileOperation,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, DeployError>;

impl DeployError {
    pub fn category(&self) -> &'static str {
        match self {
            DeployError::GameExecutableMissing { .. } => "game_not_found",
            DeployError::MissingAsset { .. } => "missing_asset",
            DeployError::NothingToUninstall => "nothing_to_uninstall",
            DeployError::VerificationFailed { .. } => "verification_failed",
            DeployError::FileSystem { .. } => "file_system",
        }
    }

    pub(crate) fn fs(path: impl Into<PathBuf>, operation: FileOperation, source: std::io::Error) -> Self {
        DeployError::FileSystem {
            path: path.into(),
            operation,
            source,
        }
    }
}
