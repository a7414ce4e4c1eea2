use serde::Serialize;
use std::path::{Path, PathBuf};

/// Folder name of the collection under a Steam library or Epic root
pub const GAME_FOLDER: &str = "KINGDOM HEARTS HD 2.8 Final Chapter Prologue";
/// Folder of the game the patch targets, inside [`GAME_FOLDER`]
pub const BBS_FOLDER: &str = "KINGDOM HEARTS 0.2 Birth by Sleep";

pub const MOD_FILE_NAME: &str = "000_Spanishmod_P.pak";
pub const DT_NAME: &str = "dt";
pub const COPYRIGHT_VIDEO_NAME: &str = "copyright.mp4";

/// Every path the installer touches, derived from the game root
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InstallTarget {
    pub root: PathBuf,
    pub exe_paths: [PathBuf; 2],
    pub mods_dir: PathBuf,
    pub movie_dir: PathBuf,
    pub video_dir: PathBuf,
}

impl InstallTarget {
    pub fn from_root<P: Into<PathBuf>>(root: P) -> Self {
        let root = root.into();
        let bbs = root.join(BBS_FOLDER);
        let content = bbs.join("Content");
        Self {
            exe_paths: [
                bbs.join("Binaries")
                    .join("Win64")
                    .join(format!("{BBS_FOLDER}.exe")),
                root.join(format!("{GAME_FOLDER}.exe")),
            ],
            mods_dir: content.join("Paks").join("~mods"),
            movie_dir: content.join("CriMovie").join("main"),
            video_dir: content.join("Movies"),
            root,
        }
    }

    /// True when either executable layout is present
    pub fn has_executable(&self) -> bool {
        self.exe_paths.iter().any(|p| p.is_file())
    }

    pub fn mod_file(&self) -> PathBuf {
        self.mods_dir.join(MOD_FILE_NAME)
    }

    pub fn dt_path(&self) -> PathBuf {
        self.movie_dir.join(DT_NAME)
    }

    pub fn copyright_video(&self) -> PathBuf {
        self.video_dir.join(COPYRIGHT_VIDEO_NAME)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}
