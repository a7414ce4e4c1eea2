//! Locating the payload inside an extracted tree

use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::{DirEntry, WalkDir};

/// Folder names the payload ships under
pub const PAYLOAD_NAMES: [&str; 3] = ["dt", "DT", "Dt"];

/// File name fragments that mark a directory of movie assets
const MEDIA_MARKERS: [&str; 4] = [".usm", ".acb", ".awb", "movie"];

/// How deep the media heuristic and the diagnostic dump go
pub const SEARCH_DEPTH: usize = 3;

/// Find the payload under `out_dir`
///
/// Tries a `dt` entry at the top, then one level into each subdirectory,
/// then the shallowest directory (up to [`SEARCH_DEPTH`] below `out_dir`)
/// whose files look like movie assets.
pub async fn find_payload(out_dir: &Path) -> Option<PathBuf> {
    let out_dir = out_dir.to_path_buf();
    match tokio::task::spawn_blocking(move || search(&out_dir)).await {
        Ok(found) => found,
        Err(e) => {
            warn!("Payload search task failed: {}", e);
            None
        }
    }
}

fn search(out_dir: &Path) -> Option<PathBuf> {
    if let Some(found) = named_payload(out_dir) {
        return Some(found);
    }

    let subdirs = WalkDir::new(out_dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_dir());
    for sub in subdirs {
        if let Some(found) = named_payload(sub.path()) {
            debug!("Payload found one level down at {}", found.display());
            return Some(found);
        }
    }

    let found = media_dir(out_dir);
    if let Some(dir) = &found {
        debug!("Payload guessed from media files at {}", dir.display());
    }
    found
}

fn named_payload(dir: &Path) -> Option<PathBuf> {
    PAYLOAD_NAMES
        .iter()
        .map(|name| dir.join(name))
        .find(|candidate| candidate.exists())
}

/// Shallowest directory holding a media file; ties go to name order
fn media_dir(out_dir: &Path) -> Option<PathBuf> {
    WalkDir::new(out_dir)
        .min_depth(1)
        .max_depth(SEARCH_DEPTH + 1)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file() && is_media(e))
        .filter_map(|e| Some((e.depth(), e.path().parent()?.to_path_buf())))
        .min_by_key(|(depth, _)| *depth)
        .map(|(_, dir)| dir)
}

fn is_media(entry: &DirEntry) -> bool {
    let name = entry.file_name().to_string_lossy().to_lowercase();
    MEDIA_MARKERS.iter().any(|marker| name.contains(marker))
}

/// One entry of a directory dump
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeEntry {
    pub path: PathBuf,
    pub depth: usize,
    pub is_dir: bool,
    pub size: u64,
}

/// Lazy depth-bounded walk below `root`, for diagnostics
///
/// Unreadable entries are skipped.
pub fn walk_tree(root: &Path, max_depth: usize) -> impl Iterator<Item = TreeEntry> {
    WalkDir::new(root)
        .min_depth(1)
        .max_depth(max_depth)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .filter_map(|e| {
            let meta = e.metadata().ok()?;
            Some(TreeEntry {
                depth: e.depth(),
                is_dir: meta.is_dir(),
                size: if meta.is_dir() { 0 } else { meta.len() },
                path: e.into_path(),
            })
        })
}

/// Render a depth-bounded listing of `root` for logs
pub fn describe_tree(root: &Path, max_depth: usize) -> String {
    let mut out = format!("{}\n", root.display());
    for entry in walk_tree(root, max_depth) {
        let name = entry
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let indent = "  ".repeat(entry.depth);
        if entry.is_dir {
            out.push_str(&format!("{indent}{name}/\n"));
        } else {
            out.push_str(&format!("{indent}{name} ({} bytes)\n", entry.size));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn finds_top_level_dt() {
        let dir = tempdir().unwrap();
        std::fs::create_dir(dir.path().join("dt")).unwrap();
        assert_eq!(find_payload(dir.path()).await, Some(dir.path().join("dt")));
    }

    #[tokio::test]
    async fn finds_uppercase_dt_inside_wrapper() {
        let dir = tempdir().unwrap();
        let payload = dir.path().join("wrapper").join("DT");
        std::fs::create_dir_all(&payload).unwrap();
        std::fs::write(payload.join("op.usm"), b"x").unwrap();
        assert_eq!(find_payload(dir.path()).await, Some(payload));
    }

    #[tokio::test]
    async fn falls_back_to_media_heuristic() {
        let dir = tempdir().unwrap();
        let media = dir.path().join("release").join("files");
        std::fs::create_dir_all(&media).unwrap();
        std::fs::write(media.join("Voice_ES.ACB"), b"x").unwrap();
        assert_eq!(find_payload(dir.path()).await, Some(media));
    }

    #[tokio::test]
    async fn nothing_recognisable_is_none() {
        let dir = tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("docs")).unwrap();
        std::fs::write(dir.path().join("docs").join("readme.txt"), b"x").unwrap();
        assert_eq!(find_payload(dir.path()).await, None);
    }

    #[tokio::test]
    async fn shallowest_media_directory_wins() {
        let dir = tempdir().unwrap();
        let deep = dir.path().join("a").join("b");
        let shallow = dir.path().join("z");
        std::fs::create_dir_all(&deep).unwrap();
        std::fs::create_dir_all(&shallow).unwrap();
        std::fs::write(deep.join("ending.usm"), b"x").unwrap();
        std::fs::write(shallow.join("opening_movie.bin"), b"x").unwrap();
        assert_eq!(find_payload(dir.path()).await, Some(shallow));
    }

    #[test]
    fn walker_stops_at_depth() {
        let dir = tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("a").join("b").join("c").join("d")).unwrap();
        std::fs::write(dir.path().join("a").join("f.bin"), b"1234").unwrap();

        let entries: Vec<TreeEntry> = walk_tree(dir.path(), 2).collect();
        let names: Vec<String> = entries
            .iter()
            .map(|e| e.path.strip_prefix(dir.path()).unwrap().display().to_string())
            .collect();
        assert_eq!(entries.len(), 3, "{names:?}");
        assert!(entries.iter().any(|e| !e.is_dir && e.size == 4));
        assert!(entries.iter().all(|e| e.depth <= 2));
    }
}
