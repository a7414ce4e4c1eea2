//! Game installation discovery and validation

mod platform;
mod resolver;
mod target;

pub use resolver::PathResolver;
pub use target::{
    BBS_FOLDER, COPYRIGHT_VIDEO_NAME, DT_NAME, GAME_FOLDER, InstallTarget, MOD_FILE_NAME,
};
