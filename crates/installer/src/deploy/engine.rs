use serde::Serialize;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info, warn};

use super::error::{DeployError, Result};
use super::managed::{InstalledModState, ManagedFile, Reverted};
use crate::error::FileOperation;
use crate::files::{copy_path, is_dir_empty, path_exists, remove_path, set_mode};
use crate::locate::CandidatePaths;
use crate::paths::{COPYRIGHT_VIDEO_NAME, DT_NAME, InstallTarget, MOD_FILE_NAME};
use crate::progress::ProgressSink;

pub const INSTALL_STEPS: u32 = 8;
pub const UNINSTALL_STEPS: u32 = 6;

const INSTALL_PERCENT: [u32; INSTALL_STEPS as usize] = [5, 15, 25, 40, 60, 80, 90, 100];
const UNINSTALL_PERCENT: [u32; UNINSTALL_STEPS as usize] = [10, 25, 45, 65, 85, 100];

const INSTALLED_MODE: u32 = 0o644;
const REMOVABLE_MODE: u32 = 0o666;

/// Where the `dt` payload comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DtPayload {
    /// Produced by the extractor; must exist
    Extracted(PathBuf),
    /// Shipped next to the installer; optional
    Bundled(CandidatePaths),
}

/// Source locations for everything copied into the game tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PayloadSources {
    pub mod_file: CandidatePaths,
    pub dt: DtPayload,
    pub copyright_video: CandidatePaths,
}

impl PayloadSources {
    /// Everything from the bundled asset directories, in search order
    pub fn bundled(asset_roots: &[PathBuf]) -> Self {
        Self {
            mod_file: CandidatePaths::under(asset_roots, MOD_FILE_NAME),
            dt: DtPayload::Bundled(CandidatePaths::under(asset_roots, DT_NAME)),
            copyright_video: CandidatePaths::under(asset_roots, COPYRIGHT_VIDEO_NAME),
        }
    }

    /// Use a freshly extracted payload for `dt`
    pub fn with_extracted_dt(mut self, payload: PathBuf) -> Self {
        self.dt = DtPayload::Extracted(payload);
        self
    }
}

/// How one step ended
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "detail", rename_all = "camelCase")]
pub enum StepOutcome {
    Done,
    /// Nothing to do for this step
    Skipped(String),
    /// A best-effort part failed and was logged; the step still counts
    Recovered(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepReport {
    pub step: u32,
    pub name: &'static str,
    #[serde(flatten)]
    pub outcome: StepOutcome,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InstallReport {
    pub installed_path: PathBuf,
    pub steps: Vec<StepReport>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UninstallReport {
    pub found: InstalledModState,
    pub steps: Vec<StepReport>,
}

impl InstallReport {
    pub fn outcome(&self, name: &str) -> Option<&StepOutcome> {
        outcome_of(&self.steps, name)
    }
}

impl UninstallReport {
    pub fn outcome(&self, name: &str) -> Option<&StepOutcome> {
        outcome_of(&self.steps, name)
    }
}

fn outcome_of<'a>(steps: &'a [StepReport], name: &str) -> Option<&'a StepOutcome> {
    steps.iter().find(|s| s.name == name).map(|s| &s.outcome)
}

/// Step-by-step writer of the patch into a game tree
///
/// Steps run in order and each emits one progress event. A fatal step stops
/// the run with everything before it left in place; backups are never
/// removed by a failed install.
#[derive(Debug, Clone, Default)]
pub struct DeploymentEngine;

/// Collects step reports and emits progress as steps start
struct Steps<'a> {
    progress: &'a ProgressSink,
    percents: &'static [u32],
    reports: Vec<StepReport>,
}

impl<'a> Steps<'a> {
    fn new(progress: &'a ProgressSink, percents: &'static [u32]) -> Self {
        Self {
            progress,
            percents,
            reports: Vec::with_capacity(percents.len()),
        }
    }

    fn begin(&self, step: u32, message: &str) {
        let percent = self.percents[(step as usize - 1).min(self.percents.len() - 1)];
        info!("Step {}/{}: {}", step, self.percents.len(), message);
        self.progress.emit(step, message, percent);
    }

    fn record(&mut self, step: u32, name: &'static str, outcome: StepOutcome) {
        match &outcome {
            StepOutcome::Done => debug!("{} done", name),
            StepOutcome::Skipped(why) => info!("{} skipped: {}", name, why),
            StepOutcome::Recovered(why) => warn!("{} recovered: {}", name, why),
        }
        self.reports.push(StepReport { step, name, outcome });
    }
}

impl DeploymentEngine {
    pub fn new() -> Self {
        Self
    }

    /// Install the patch into `target`
    pub async fn install(
        &self,
        target: &InstallTarget,
        sources: &PayloadSources,
        progress: &ProgressSink,
    ) -> Result<InstallReport> {
        let mut steps = Steps::new(progress, &INSTALL_PERCENT);

        steps.begin(1, "Verifying game files...");
        if !has_executable(target).await {
            return Err(DeployError::GameExecutableMissing {
                root: target.root.clone(),
            });
        }
        steps.record(1, "verify_game", StepOutcome::Done);

        steps.begin(2, "Creating required directories...");
        for dir in [&target.mods_dir, &target.movie_dir, &target.video_dir] {
            fs::create_dir_all(dir)
                .await
                .map_err(|e| DeployError::fs(dir, FileOperation::CreateDir, e))?;
        }
        steps.record(2, "create_directories", StepOutcome::Done);

        steps.begin(3, "Backing up original files...");
        let mut backed_up = Vec::new();
        for managed in [ManagedFile::dt(target), ManagedFile::copyright_video(target)] {
            if managed.backup_once().await? {
                backed_up.push(managed.live);
            }
        }
        steps.record(
            3,
            "backup_originals",
            if backed_up.is_empty() {
                StepOutcome::Skipped("no new backups needed".into())
            } else {
                StepOutcome::Done
            },
        );

        steps.begin(4, "Installing dubbing file...");
        let mod_source = sources.mod_file.first_existing().ok_or_else(|| DeployError::MissingAsset {
            asset: MOD_FILE_NAME.to_string(),
            searched: sources.mod_file.describe(),
        })?;
        let mod_target = target.mod_file();
        copy_into_place(&mod_source, &mod_target).await?;
        let outcome = match set_mode(&mod_target, INSTALLED_MODE).await {
            Ok(()) => StepOutcome::Done,
            Err(e) => StepOutcome::Recovered(format!("could not set permissions: {e}")),
        };
        steps.record(4, "install_mod", outcome);

        steps.begin(5, "Installing DT file...");
        let outcome = match &sources.dt {
            DtPayload::Extracted(payload) => {
                if !path_exists(payload).await {
                    return Err(DeployError::MissingAsset {
                        asset: DT_NAME.to_string(),
                        searched: payload.display().to_string(),
                    });
                }
                copy_into_place(payload, &target.dt_path()).await?;
                StepOutcome::Done
            }
            DtPayload::Bundled(candidates) => match candidates.first_existing() {
                Some(source) => {
                    copy_into_place(&source, &target.dt_path()).await?;
                    StepOutcome::Done
                }
                None => StepOutcome::Skipped(format!("no bundled DT in {}", candidates.describe())),
            },
        };
        steps.record(5, "install_dt", outcome);

        steps.begin(6, "Installing copyright video...");
        let outcome = match sources.copyright_video.first_existing() {
            Some(source) => {
                copy_into_place(&source, &target.copyright_video()).await?;
                StepOutcome::Done
            }
            None => StepOutcome::Skipped(format!(
                "copyright video not found in {}",
                sources.copyright_video.describe()
            )),
        };
        steps.record(6, "install_copyright_video", outcome);

        steps.begin(7, "Verifying installation...");
        if !path_exists(&mod_target).await {
            return Err(DeployError::VerificationFailed { path: mod_target });
        }
        steps.record(7, "verify_install", StepOutcome::Done);

        steps.begin(8, "Finishing installation...");
        steps.record(8, "finalize", StepOutcome::Done);
        info!("Dubbing installed at {}", mod_target.display());

        Ok(InstallReport {
            installed_path: mod_target,
            steps: steps.reports,
        })
    }

    /// Remove the patch from `target`, restoring backed-up originals
    ///
    /// A replaced file without a backup is deleted rather than left patched.
    pub async fn uninstall(&self, target: &InstallTarget, progress: &ProgressSink) -> Result<UninstallReport> {
        let mut steps = Steps::new(progress, &UNINSTALL_PERCENT);

        steps.begin(1, "Checking current installation...");
        let found = InstalledModState::probe(target).await;
        if !found.any() {
            return Err(DeployError::NothingToUninstall);
        }
        steps.record(1, "probe", StepOutcome::Done);

        steps.begin(2, "Removing dubbing file...");
        let outcome = if found.dubbing {
            let mod_file = ManagedFile::mod_file(target);
            let chmod = set_mode(&mod_file.live, REMOVABLE_MODE).await;
            mod_file.restore_or_remove().await?;
            match chmod {
                Ok(()) => StepOutcome::Done,
                Err(e) => StepOutcome::Recovered(format!("could not relax permissions: {e}")),
            }
        } else {
            StepOutcome::Skipped("dubbing file not installed".into())
        };
        steps.record(2, "remove_mod", outcome);

        steps.begin(3, "Restoring original DT file...");
        let outcome = reverted_outcome(ManagedFile::dt(target).restore_or_remove().await?);
        steps.record(3, "restore_dt", outcome);

        steps.begin(4, "Restoring original copyright video...");
        let outcome = reverted_outcome(ManagedFile::copyright_video(target).restore_or_remove().await?);
        steps.record(4, "restore_copyright_video", outcome);

        steps.begin(5, "Cleaning up directories...");
        let outcome = remove_if_empty(&target.mods_dir).await;
        steps.record(5, "cleanup", outcome);

        steps.begin(6, "Finishing uninstall...");
        steps.record(6, "finalize", StepOutcome::Done);

        Ok(UninstallReport {
            found,
            steps: steps.reports,
        })
    }
}

async fn has_executable(target: &InstallTarget) -> bool {
    for exe in &target.exe_paths {
        if fs::metadata(exe).await.map(|m| m.is_file()).unwrap_or(false) {
            return true;
        }
    }
    false
}

async fn copy_into_place(source: &Path, dest: &Path) -> Result<()> {
    let bytes = copy_path(source, dest)
        .await
        .map_err(|e| DeployError::fs(dest, FileOperation::Copy, e))?;
    debug!("Copied {} -> {} ({} bytes)", source.display(), dest.display(), bytes);
    Ok(())
}

fn reverted_outcome(reverted: Reverted) -> StepOutcome {
    match reverted {
        Reverted::Restored => StepOutcome::Done,
        Reverted::Removed => StepOutcome::Recovered("no backup found; removed instead".into()),
        Reverted::Absent => StepOutcome::Skipped("not present".into()),
    }
}

async fn remove_if_empty(dir: &Path) -> StepOutcome {
    if !path_exists(dir).await {
        return StepOutcome::Skipped("mods directory not present".into());
    }
    match is_dir_empty(dir).await {
        Ok(true) => match remove_path(dir).await {
            Ok(()) => StepOutcome::Done,
            Err(e) => StepOutcome::Recovered(format!("could not remove {}: {e}", dir.display())),
        },
        Ok(false) => StepOutcome::Skipped("mods directory still in use".into()),
        Err(e) => StepOutcome::Recovered(format!("could not read {}: {e}", dir.display())),
    }
}
