//! Install-metadata lookups (Windows registry, Epic launcher manifests)
//!
//! Every failure here means "candidate absent"; nothing is propagated.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::debug;

use super::target::GAME_FOLDER;

#[cfg(windows)]
const STEAM_KEY: &str = r"SOFTWARE\WOW6432Node\Valve\Steam";
#[cfg(windows)]
const EPIC_LAUNCHER_KEY: &str = r"SOFTWARE\WOW6432Node\Epic Games\EpicGamesLauncher";

/// Steam install root recorded by the Steam installer
#[cfg(windows)]
pub(super) fn steam_install_root() -> Option<PathBuf> {
    use winreg::RegKey;
    use winreg::enums::HKEY_LOCAL_MACHINE;

    let hklm = RegKey::predef(HKEY_LOCAL_MACHINE);
    match hklm
        .open_subkey(STEAM_KEY)
        .and_then(|key| key.get_value::<String, _>("InstallPath"))
    {
        Ok(path) => Some(PathBuf::from(path.trim())),
        Err(e) => {
            debug!("Steam registry lookup failed: {}", e);
            None
        }
    }
}

#[cfg(not(windows))]
pub(super) fn steam_install_root() -> Option<PathBuf> {
    None
}

/// Game directory recorded in the Epic launcher's install manifests
#[cfg(windows)]
pub(super) fn epic_install_location() -> Option<PathBuf> {
    use winreg::RegKey;
    use winreg::enums::HKEY_LOCAL_MACHINE;

    let hklm = RegKey::predef(HKEY_LOCAL_MACHINE);
    let app_data = match hklm
        .open_subkey(EPIC_LAUNCHER_KEY)
        .and_then(|key| key.get_value::<String, _>("AppDataPath"))
    {
        Ok(path) => PathBuf::from(path.trim()),
        Err(e) => {
            debug!("Epic registry lookup failed: {}", e);
            return None;
        }
    };
    find_in_epic_manifests(&app_data.join("Manifests"))
}

#[cfg(not(windows))]
pub(super) fn epic_install_location() -> Option<PathBuf> {
    None
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct EpicManifest {
    #[serde(default)]
    display_name: String,
    #[serde(default)]
    install_location: String,
}

/// Scan `*.item` manifests for an install of the collection
#[cfg_attr(not(windows), allow(dead_code))]
pub(super) fn find_in_epic_manifests(manifests_dir: &Path) -> Option<PathBuf> {
    let entries = std::fs::read_dir(manifests_dir).ok()?;
    let needle = GAME_FOLDER.to_lowercase();

    for entry in entries.flatten() {
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some("item") {
            continue;
        }
        let manifest = std::fs::read(&path)
            .ok()
            .and_then(|bytes| serde_json::from_slice::<EpicManifest>(&bytes).ok());
        let Some(manifest) = manifest else {
            debug!("Skipping unreadable Epic manifest {}", path.display());
            continue;
        };
        if manifest.install_location.is_empty() {
            continue;
        }

        let location = PathBuf::from(&manifest.install_location);
        let folder_matches = location
            .file_name()
            .map(|n| n.to_string_lossy().to_lowercase() == needle)
            .unwrap_or(false);
        if folder_matches || manifest.display_name.to_lowercase().contains(&needle) {
            debug!("Epic manifest {} points at {}", path.display(), location.display());
            return Some(location);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn finds_matching_manifest() {
        let dir = tempdir().unwrap();
        std::fs::write(
            dir.path().join("other.item"),
            r#"{"DisplayName":"Some Game","InstallLocation":"D:\\Games\\Other"}"#,
        )
        .unwrap();
        std::fs::write(
            dir.path().join("kh.item"),
            r#"{"DisplayName":"KINGDOM HEARTS HD 2.8 Final Chapter Prologue","InstallLocation":"/games/epic/kh28"}"#,
        )
        .unwrap();
        std::fs::write(dir.path().join("broken.item"), b"{not json").unwrap();

        assert_eq!(
            find_in_epic_manifests(dir.path()),
            Some(PathBuf::from("/games/epic/kh28"))
        );
    }

    #[test]
    fn missing_manifest_dir_is_absent() {
        let dir = tempdir().unwrap();
        assert!(find_in_epic_manifests(&dir.path().join("Manifests")).is_none());
    }
}
