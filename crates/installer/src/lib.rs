//! KH 0.2 dubbing installer
//!
//! Finds a KINGDOM HEARTS HD 2.8 Final Chapter Prologue installation,
//! downloads the split dubbing archive, extracts it with whatever archiver
//! is available and deploys the result into the game tree with backups of
//! every file it replaces. Uninstall puts the originals back.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use khdub_installer::{InstallOptions, Installer, InstallerConfig, ProgressCallback, ProgressEvent};
//! use std::sync::Arc;
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() -> khdub_installer::Result<()> {
//! let installer = Installer::new(InstallerConfig::default().from_env())?;
//!
//! let Some(game) = installer.detect_game_path() else {
//!     println!("Game not found; ask the user for the folder");
//!     return Ok(());
//! };
//!
//! let progress: ProgressCallback = Arc::new(|event: ProgressEvent| {
//!     println!("[{}/{}] {}% {}", event.step, event.total, event.percentage, event.message);
//! });
//!
//! let result = installer
//!     .install(&game, InstallOptions::default(), Some(progress), CancellationToken::new())
//!     .await;
//! println!("{:?}", result);
//! # Ok(())
//! # }
//! ```
//!
//! # Components
//!
//! - [`PathResolver`]: game discovery and validation
//! - [`ArchiveFetcher`]: batched volume downloads with aggregate progress
//! - [`ArchiveExtractor`]: external archiver fallback chain and payload search
//! - [`DeploymentEngine`]: step-wise install and uninstall with backups
//! - [`ProgressSink`]: progress events toward the presentation layer

pub mod config;
pub mod deploy;
pub mod download;
pub mod error;
pub mod extract;
pub mod files;
pub mod installer;
pub mod launch;
pub mod locate;
pub mod paths;
pub mod progress;

pub use config::{InstallerConfig, STEAM_APP_ID};
pub use deploy::{
    DeployError, DeploymentEngine, DtPayload, InstallReport, InstalledModState, PayloadSources, StepOutcome,
    UninstallReport,
};
pub use download::{ArchiveFetcher, ArchiveVolume, DownloadError};
pub use error::{FileOperation, InstallerError, Result};
pub use extract::{ArchiveExtractor, ExtractionError, ExtractionToolCandidate, ProcessRunner, ToolKind, ToolRunner};
pub use installer::{InstallOptions, Installer, OperationResult, StartupStatus};
pub use launch::{launch_game, open_external_link};
pub use locate::CandidatePaths;
pub use paths::{InstallTarget, PathResolver};
pub use progress::{ProgressCallback, ProgressEvent, ProgressSink};
