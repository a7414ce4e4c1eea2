//! Operation boundary used by presentation layers
//!
//! Every public operation here either returns a plain value (discovery,
//! validation, probes) or an [`OperationResult`]. The `try_*` variants keep
//! the typed error for callers that want it.

use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::config::InstallerConfig;
use crate::deploy::{
    DeployError, DeploymentEngine, INSTALL_STEPS, InstallReport, InstalledModState, PayloadSources, UNINSTALL_STEPS,
    UninstallReport,
};
use crate::download::{ArchiveFetcher, DownloadError};
use crate::error::{InstallerError, Result};
use crate::extract::{ArchiveExtractor, ProcessRunner, ToolRunner};
use crate::files::path_exists;
use crate::launch;
use crate::paths::{InstallTarget, PathResolver};
use crate::progress::{ProgressCallback, ProgressSink};

/// Steps the pipeline adds in front of the deployment steps
const PIPELINE_STEPS: u32 = 2;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InstallOptions {
    /// Skip download and extraction; deploy bundled assets only
    pub skip_download: bool,
}

impl InstallOptions {
    pub fn offline() -> Self {
        Self { skip_download: true }
    }
}

/// Outcome of an install or uninstall as seen by the presentation layer
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub installed_path: Option<PathBuf>,
}

impl OperationResult {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            error: None,
            installed_path: None,
        }
    }

    pub fn failed(error: &InstallerError) -> Self {
        Self {
            success: false,
            message: None,
            error: Some(error.to_string()),
            installed_path: None,
        }
    }
}

/// Startup probe: where the game is and what is already installed
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StartupStatus {
    pub found: bool,
    pub game_path: Option<PathBuf>,
    pub mod_installed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub installed_mods: Option<InstalledModState>,
}

/// Installs and uninstalls the dubbing patch
///
/// Install and uninstall never overlap: a call made while another one is
/// running fails with [`InstallerError::Busy`].
pub struct Installer {
    config: InstallerConfig,
    resolver: PathResolver,
    runner: Arc<dyn ToolRunner>,
    busy: Mutex<()>,
}

impl Installer {
    pub fn new(config: InstallerConfig) -> Result<Self> {
        if config.download_budget + config.extraction_budget > 100 {
            return Err(InstallerError::Configuration {
                message: format!(
                    "download ({}) and extraction ({}) budgets exceed 100%",
                    config.download_budget, config.extraction_budget
                ),
            });
        }
        if config.max_concurrent_downloads == 0 {
            return Err(InstallerError::Configuration {
                message: "max_concurrent_downloads must be at least 1".to_string(),
            });
        }

        let runner = Arc::new(ProcessRunner::from_config(&config));
        Ok(Self {
            resolver: PathResolver::new(&config),
            config,
            runner,
            busy: Mutex::new(()),
        })
    }

    /// Replace the subprocess runner used for extraction
    pub fn with_tool_runner(mut self, runner: Arc<dyn ToolRunner>) -> Self {
        self.runner = runner;
        self
    }

    pub fn config(&self) -> &InstallerConfig {
        &self.config
    }

    pub fn detect_game_path(&self) -> Option<PathBuf> {
        self.resolver.discover().map(|target| target.root)
    }

    pub fn validate_game_path(&self, path: &Path) -> bool {
        self.resolver.validate(path)
    }

    /// Whether the dubbing file is present under the game at `path`
    pub async fn check_mod_installed(&self, path: &Path) -> bool {
        InstalledModState::probe(&InstallTarget::from_root(path)).await.dubbing
    }

    /// Where the game is and which patch files it carries
    ///
    /// Patch files only count once the `~mods` directory exists; then any of
    /// them marks the patch as installed.
    pub async fn startup_status(&self) -> StartupStatus {
        match self.resolver.discover() {
            Some(target) => {
                let state = if path_exists(&target.mods_dir).await {
                    InstalledModState::probe(&target).await
                } else {
                    InstalledModState::default()
                };
                StartupStatus {
                    found: true,
                    game_path: Some(target.root),
                    mod_installed: state.any(),
                    installed_mods: Some(state),
                }
            }
            None => StartupStatus {
                found: false,
                game_path: None,
                mod_installed: false,
                installed_mods: None,
            },
        }
    }

    pub fn launch_game(&self) -> bool {
        launch::launch_game(self.config.steam_app_id)
    }

    pub async fn install(
        &self,
        game_path: &Path,
        options: InstallOptions,
        progress: Option<ProgressCallback>,
        cancel: CancellationToken,
    ) -> OperationResult {
        match self.try_install(game_path, options, progress, cancel).await {
            Ok(report) => OperationResult {
                installed_path: Some(report.installed_path),
                ..OperationResult::ok("Dubbing installed successfully")
            },
            Err(e) => {
                error!("Install failed [{}]: {}", e.category(), e);
                OperationResult::failed(&e)
            }
        }
    }

    /// Run the full install: download, extract, deploy
    pub async fn try_install(
        &self,
        game_path: &Path,
        options: InstallOptions,
        progress: Option<ProgressCallback>,
        cancel: CancellationToken,
    ) -> Result<InstallReport> {
        let _guard = self.busy.try_lock().map_err(|_| InstallerError::Busy)?;
        let target = InstallTarget::from_root(game_path);
        let sources = PayloadSources::bundled(&self.config.asset_roots);

        if options.skip_download {
            info!("Installing bundled assets into {}", target.root.display());
            let sink = ProgressSink::new(progress, INSTALL_STEPS);
            return Ok(DeploymentEngine::new().install(&target, &sources, &sink).await?);
        }

        // Check before spending time on the download
        if !target.has_executable() {
            return Err(DeployError::GameExecutableMissing { root: target.root }.into());
        }

        let scratch = self.scratch_dir()?;
        let sink = ProgressSink::new(progress, INSTALL_STEPS + PIPELINE_STEPS);
        let result = self.run_pipeline(&target, sources, &sink, scratch.path(), &cancel).await;
        release_scratch(scratch).await;
        result
    }

    async fn run_pipeline(
        &self,
        target: &InstallTarget,
        sources: PayloadSources,
        sink: &ProgressSink,
        scratch: &Path,
        cancel: &CancellationToken,
    ) -> Result<InstallReport> {
        let download_top = self.config.download_budget;
        let extract_top = download_top + self.config.extraction_budget;

        let fetcher = ArchiveFetcher::new(&self.config)?;
        let volumes = fetcher
            .fetch(
                &self.config.volume_urls,
                &scratch.join("volumes"),
                &sink.phase(0, 0, download_top),
                cancel,
            )
            .await?;
        check_cancelled(cancel)?;

        let first_volume = volumes.first().ok_or(DownloadError::NoVolumes)?;
        let extractor = ArchiveExtractor::new(&self.config, self.runner.clone());
        let payload = extractor
            .extract(
                first_volume,
                &scratch.join("extracted"),
                &sink.phase(1, download_top, extract_top),
                cancel,
            )
            .await?;
        check_cancelled(cancel)?;

        let deploy_sink = sink.phase(PIPELINE_STEPS, extract_top, 100);
        let report = DeploymentEngine::new()
            .install(target, &sources.with_extracted_dt(payload), &deploy_sink)
            .await?;
        Ok(report)
    }

    pub async fn uninstall(&self, game_path: &Path, progress: Option<ProgressCallback>) -> OperationResult {
        match self.try_uninstall(game_path, progress).await {
            Ok(_) => OperationResult::ok("Dubbing uninstalled successfully"),
            Err(e) => {
                error!("Uninstall failed [{}]: {}", e.category(), e);
                OperationResult::failed(&e)
            }
        }
    }

    pub async fn try_uninstall(&self, game_path: &Path, progress: Option<ProgressCallback>) -> Result<UninstallReport> {
        let _guard = self.busy.try_lock().map_err(|_| InstallerError::Busy)?;
        let target = InstallTarget::from_root(game_path);
        let sink = ProgressSink::new(progress, UNINSTALL_STEPS);
        Ok(DeploymentEngine::new().uninstall(&target, &sink).await?)
    }

    fn scratch_dir(&self) -> Result<TempDir> {
        let builder = {
            let mut builder = tempfile::Builder::new();
            builder.prefix("khdub-");
            builder
        };
        match &self.config.scratch_root {
            Some(root) => {
                std::fs::create_dir_all(root).map_err(|source| InstallerError::Scratch {
                    path: root.clone(),
                    source,
                })?;
                builder.tempdir_in(root).map_err(|source| InstallerError::Scratch {
                    path: root.clone(),
                    source,
                })
            }
            None => builder.tempdir().map_err(|source| InstallerError::Scratch {
                path: std::env::temp_dir(),
                source,
            }),
        }
    }
}

fn check_cancelled(cancel: &CancellationToken) -> Result<()> {
    if cancel.is_cancelled() {
        Err(InstallerError::Cancelled)
    } else {
        Ok(())
    }
}

/// Delete the scratch directory off the async threads, logging failures
async fn release_scratch(scratch: TempDir) {
    let path = scratch.path().to_path_buf();
    match tokio::task::spawn_blocking(move || scratch.close()).await {
        Ok(Ok(())) => info!("Removed scratch directory {}", path.display()),
        Ok(Err(e)) => warn!("Could not remove scratch directory {}: {}", path.display(), e),
        Err(e) => warn!("Scratch cleanup task failed for {}: {}", path.display(), e),
    }
}

#[cfg(test)]
mod tests;
