//! Files the installer owns inside the game tree

use serde::Serialize;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};

use super::error::{DeployError, Result};
use crate::error::FileOperation;
use crate::files::{copy_path, path_exists, remove_path};
use crate::paths::InstallTarget;

const BACKUP_SUFFIX: &str = ".backup";

/// A live path in the game tree and, for files the game ships, its backup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManagedFile {
    pub live: PathBuf,
    pub backup: Option<PathBuf>,
}

/// What [`ManagedFile::restore_or_remove`] did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reverted {
    Restored,
    Removed,
    Absent,
}

impl ManagedFile {
    /// A file added by the patch with nothing to restore
    pub fn added(live: PathBuf) -> Self {
        Self { live, backup: None }
    }

    /// A game file replaced by the patch, backed up next to itself
    pub fn replaced(live: PathBuf) -> Self {
        let mut name = live.file_name().map(|n| n.to_os_string()).unwrap_or_default();
        name.push(BACKUP_SUFFIX);
        let backup = live.with_file_name(name);
        Self {
            live,
            backup: Some(backup),
        }
    }

    pub fn mod_file(target: &InstallTarget) -> Self {
        Self::added(target.mod_file())
    }

    pub fn dt(target: &InstallTarget) -> Self {
        Self::replaced(target.dt_path())
    }

    pub fn copyright_video(target: &InstallTarget) -> Self {
        Self::replaced(target.copyright_video())
    }

    pub async fn is_live(&self) -> bool {
        path_exists(&self.live).await
    }

    /// Copy the live entry to its backup unless a backup already exists
    ///
    /// Returns whether a backup was written. An existing backup always holds
    /// the untouched original, so it is never overwritten.
    pub async fn backup_once(&self) -> Result<bool> {
        let Some(backup) = &self.backup else {
            return Ok(false);
        };
        if !self.is_live().await {
            return Ok(false);
        }
        if path_exists(backup).await {
            debug!("Backup already present: {}", backup.display());
            return Ok(false);
        }
        copy_path(&self.live, backup)
            .await
            .map_err(|e| DeployError::fs(backup, FileOperation::Copy, e))?;
        info!("Created backup {}", backup.display());
        Ok(true)
    }

    /// Put the backup back in place, or delete the live entry when there is none
    pub async fn restore_or_remove(&self) -> Result<Reverted> {
        if !self.is_live().await {
            return Ok(Reverted::Absent);
        }

        match &self.backup {
            Some(backup) if path_exists(backup).await => {
                remove_path(&self.live)
                    .await
                    .map_err(|e| DeployError::fs(&self.live, FileOperation::Delete, e))?;
                restore(backup, &self.live).await?;
                info!("Restored {} from backup", self.live.display());
                Ok(Reverted::Restored)
            }
            _ => {
                remove_path(&self.live)
                    .await
                    .map_err(|e| DeployError::fs(&self.live, FileOperation::Delete, e))?;
                info!("Removed {} (no backup)", self.live.display());
                Ok(Reverted::Removed)
            }
        }
    }
}

/// Move `backup` onto `live`, copying when a rename is not possible
async fn restore(backup: &Path, live: &Path) -> Result<()> {
    if fs::rename(backup, live).await.is_ok() {
        return Ok(());
    }
    copy_path(backup, live)
        .await
        .map_err(|e| DeployError::fs(live, FileOperation::Copy, e))?;
    remove_path(backup)
        .await
        .map_err(|e| DeployError::fs(backup, FileOperation::Delete, e))
}

/// Which patch files are currently present; probed on demand, never stored
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InstalledModState {
    pub dubbing: bool,
    pub dt_file: bool,
    pub copyright_video: bool,
}

impl InstalledModState {
    pub async fn probe(target: &InstallTarget) -> Self {
        Self {
            dubbing: path_exists(&target.mod_file()).await,
            dt_file: path_exists(&target.dt_path()).await,
            copyright_video: path_exists(&target.copyright_video()).await,
        }
    }

    pub fn any(&self) -> bool {
        self.dubbing || self.dt_file || self.copyright_video
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn backup_is_written_once() {
        let dir = tempdir().unwrap();
        let managed = ManagedFile::replaced(dir.path().join("copyright.mp4"));
        std::fs::write(&managed.live, b"original").unwrap();

        assert!(managed.backup_once().await.unwrap());
        std::fs::write(&managed.live, b"patched").unwrap();
        assert!(!managed.backup_once().await.unwrap());

        let backup = managed.backup.as_ref().unwrap();
        assert_eq!(backup.file_name().unwrap(), "copyright.mp4.backup");
        assert_eq!(std::fs::read(backup).unwrap(), b"original");
    }

    #[tokio::test]
    async fn restore_replaces_directory_with_backup() {
        let dir = tempdir().unwrap();
        let managed = ManagedFile::replaced(dir.path().join("dt"));
        std::fs::write(managed.backup.as_ref().unwrap(), b"original dt").unwrap();
        std::fs::create_dir_all(&managed.live).unwrap();
        std::fs::write(managed.live.join("patched.usm"), b"x").unwrap();

        assert_eq!(managed.restore_or_remove().await.unwrap(), Reverted::Restored);
        assert_eq!(std::fs::read(&managed.live).unwrap(), b"original dt");
        assert!(!managed.backup.as_ref().unwrap().exists());
    }

    #[tokio::test]
    async fn added_file_is_removed_and_absent_is_noop() {
        let dir = tempdir().unwrap();
        let managed = ManagedFile::added(dir.path().join("000_Spanishmod_P.pak"));
        assert_eq!(managed.restore_or_remove().await.unwrap(), Reverted::Absent);

        std::fs::write(&managed.live, b"pak").unwrap();
        assert_eq!(managed.restore_or_remove().await.unwrap(), Reverted::Removed);
        assert!(!managed.live.exists());
    }
}
