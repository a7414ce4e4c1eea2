//! File operation utilities shared by the fetcher, extractor and deployer

use std::io;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;
use walkdir::WalkDir;

/// Temporary path a volume streams into before it is complete
pub fn create_temp_path(dest_path: &Path) -> PathBuf {
    let mut name = dest_path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".download");
    dest_path.with_file_name(name)
}

/// Atomically rename a finished temporary file to its final destination
pub async fn atomic_rename(temp_path: &Path, dest_path: &Path) -> io::Result<()> {
    fs::rename(temp_path, dest_path).await?;
    debug!("Atomically renamed {} to {}", temp_path.display(), dest_path.display());
    Ok(())
}

pub async fn path_exists(path: &Path) -> bool {
    fs::try_exists(path).await.unwrap_or(false)
}

/// Copy a file or a whole directory tree to `dest`, overwriting
///
/// A directory copied onto an existing directory is merged into it. When the
/// kinds differ (directory onto file or file onto directory) the old entry is
/// removed first.
pub async fn copy_path(src: &Path, dest: &Path) -> io::Result<u64> {
    let (src, dest) = (src.to_path_buf(), dest.to_path_buf());
    tokio::task::spawn_blocking(move || copy_tree(&src, &dest))
        .await
        .map_err(io::Error::other)?
}

fn copy_tree(src: &Path, dest: &Path) -> io::Result<u64> {
    let meta = std::fs::metadata(src)?;
    if let Ok(dest_meta) = std::fs::symlink_metadata(dest) {
        if dest_meta.is_dir() != meta.is_dir() {
            remove_blocking(dest, dest_meta.is_dir())?;
        }
    }

    if !meta.is_dir() {
        if let Some(parent) = dest.parent() {
            std::fs::create_dir_all(parent)?;
        }
        return std::fs::copy(src, dest);
    }

    let mut copied = 0;
    for entry in WalkDir::new(src).follow_links(false).sort_by_file_name() {
        let entry = entry?;
        let relative = entry.path().strip_prefix(src).map_err(io::Error::other)?;
        let target = dest.join(relative);
        let existing = std::fs::symlink_metadata(&target).ok();

        if entry.file_type().is_dir() {
            if let Some(existing) = existing.filter(|m| !m.is_dir()) {
                remove_blocking(&target, existing.is_dir())?;
            }
            std::fs::create_dir_all(&target)?;
        } else {
            if let Some(existing) = existing.filter(|m| m.is_dir()) {
                remove_blocking(&target, existing.is_dir())?;
            }
            copied += std::fs::copy(entry.path(), &target)?;
        }
    }
    Ok(copied)
}

fn remove_blocking(path: &Path, is_dir: bool) -> io::Result<()> {
    if is_dir {
        std::fs::remove_dir_all(path)
    } else {
        std::fs::remove_file(path)
    }
}

/// Remove a file or directory tree; a missing path is not an error
pub async fn remove_path(path: &Path) -> io::Result<()> {
    match fs::symlink_metadata(path).await {
        Ok(meta) if meta.is_dir() => fs::remove_dir_all(path).await,
        Ok(_) => fs::remove_file(path).await,
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}

/// Empty `dir`, leaving the directory itself in place
pub async fn clear_dir(dir: &Path) -> io::Result<()> {
    remove_path(dir).await?;
    fs::create_dir_all(dir).await
}

pub async fn is_dir_empty(dir: &Path) -> io::Result<bool> {
    let mut entries = fs::read_dir(dir).await?;
    Ok(entries.next_entry().await?.is_none())
}

/// Set unix permission bits, or clear the read-only flag elsewhere
pub async fn set_mode(path: &Path, mode: u32) -> io::Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, std::fs::Permissions::from_mode(mode)).await
    }

    #[cfg(not(unix))]
    {
        let _ = mode;
        let mut perms = fs::metadata(path).await?.permissions();
        perms.set_readonly(false);
        fs::set_permissions(path, perms).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn copies_directory_trees_and_merges() {
        let dir = tempdir().unwrap();
        let src = dir.path().join("src");
        std::fs::create_dir_all(src.join("nested")).unwrap();
        std::fs::write(src.join("a.usm"), b"aaa").unwrap();
        std::fs::write(src.join("nested").join("b.usm"), b"bb").unwrap();

        let dest = dir.path().join("dest");
        std::fs::create_dir_all(&dest).unwrap();
        std::fs::write(dest.join("keep.txt"), b"k").unwrap();

        let copied = copy_path(&src, &dest).await.unwrap();
        assert_eq!(copied, 5);
        assert_eq!(std::fs::read(dest.join("nested").join("b.usm")).unwrap(), b"bb");
        assert!(dest.join("keep.txt").exists());
    }

    #[tokio::test]
    async fn directory_replaces_file_of_same_name() {
        let dir = tempdir().unwrap();
        let src = dir.path().join("dt_src");
        std::fs::create_dir_all(&src).unwrap();
        std::fs::write(src.join("x"), b"x").unwrap();
        let dest = dir.path().join("dt");
        std::fs::write(&dest, b"original").unwrap();

        copy_path(&src, &dest).await.unwrap();
        assert!(dest.is_dir());
        assert!(dest.join("x").is_file());
    }

    #[tokio::test]
    async fn nested_entries_of_the_other_kind_are_replaced() {
        let dir = tempdir().unwrap();
        let src = dir.path().join("src");
        std::fs::create_dir_all(src.join("movies")).unwrap();
        std::fs::write(src.join("movies").join("op.usm"), b"op").unwrap();
        std::fs::write(src.join("voice.acb"), b"acb").unwrap();

        let dest = dir.path().join("dest");
        std::fs::create_dir_all(dest.join("voice.acb")).unwrap();
        std::fs::write(dest.join("movies"), b"stale file").unwrap();

        let copied = copy_path(&src, &dest).await.unwrap();
        assert_eq!(copied, 5);
        assert!(dest.join("movies").is_dir());
        assert_eq!(std::fs::read(dest.join("movies").join("op.usm")).unwrap(), b"op");
        assert_eq!(std::fs::read(dest.join("voice.acb")).unwrap(), b"acb");
    }

    #[tokio::test]
    async fn remove_path_tolerates_missing() {
        let dir = tempdir().unwrap();
        remove_path(&dir.path().join("nope")).await.unwrap();
    }

    #[test]
    fn temp_path_keeps_part_suffix() {
        let temp = create_temp_path(Path::new("/tmp/DT.part1.rar"));
        assert_eq!(temp, PathBuf::from("/tmp/DT.part1.rar.download"));
    }
}
