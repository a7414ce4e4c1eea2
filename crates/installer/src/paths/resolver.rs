use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::platform;
use super::target::{GAME_FOLDER, InstallTarget};
use crate::config::InstallerConfig;
use crate::locate::CandidatePaths;

/// Finds and validates the game installation
///
/// Probe order: Steam libraries, Epic roots, then (when enabled) the Steam
/// registry root and the Epic launcher manifests. The first candidate whose
/// game directory exists wins.
#[derive(Debug, Clone)]
pub struct PathResolver {
    steam_roots: Vec<PathBuf>,
    epic_roots: Vec<PathBuf>,
    query_install_metadata: bool,
}

impl PathResolver {
    pub fn new(config: &InstallerConfig) -> Self {
        Self {
            steam_roots: config.steam_roots.clone(),
            epic_roots: config.epic_roots.clone(),
            query_install_metadata: config.query_install_metadata,
        }
    }

    /// Locate the game; `None` means the user has to pick it manually
    pub fn discover(&self) -> Option<InstallTarget> {
        if let Some(root) = self.fixed_candidates().first_existing() {
            info!("Found game directory at {}", root.display());
            return Some(InstallTarget::from_root(root));
        }

        if !self.query_install_metadata {
            debug!("No game directory under fixed roots; metadata lookup disabled");
            return None;
        }

        let from_metadata = platform::steam_install_root()
            .map(|steam| steam_game_dir(&steam))
            .filter(|p| p.is_dir())
            .or_else(|| platform::epic_install_location().filter(|p| p.is_dir()));

        match from_metadata {
            Some(root) => {
                info!("Found game directory via install metadata at {}", root.display());
                Some(InstallTarget::from_root(root))
            }
            None => {
                debug!("Game directory not found; manual selection required");
                None
            }
        }
    }

    /// Whether `path` holds either game executable; never fails
    pub fn validate(&self, path: &Path) -> bool {
        InstallTarget::from_root(path).has_executable()
    }

    fn fixed_candidates(&self) -> CandidatePaths {
        let steam = self.steam_roots.iter().map(|root| steam_game_dir(root));
        let epic = self.epic_roots.iter().map(|root| root.join(GAME_FOLDER));
        steam.chain(epic).collect()
    }
}

fn steam_game_dir(steam_root: &Path) -> PathBuf {
    steam_root.join("steamapps").join("common").join(GAME_FOLDER)
}
