//! Ordered candidate lists with first-existing-wins resolution
//!
//! Bundled asset lookup, extraction tool lookup and game directory discovery
//! all walk a fixed list of locations and take the first one present on
//! disk. Appending a location never touches the walking code.

use std::path::{Path, PathBuf};

/// Ordered list of filesystem locations
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CandidatePaths {
    paths: Vec<PathBuf>,
}

impl CandidatePaths {
    pub fn new() -> Self {
        Self::default()
    }

    /// `file_name` under each of `roots`, keeping root order
    pub fn under<P: AsRef<Path>>(roots: &[PathBuf], file_name: P) -> Self {
        roots.iter().map(|root| root.join(file_name.as_ref())).collect()
    }

    pub fn push<P: Into<PathBuf>>(&mut self, path: P) {
        self.paths.push(path.into());
    }

    pub fn with<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.push(path);
        self
    }

    /// First location that exists, walking in order
    pub fn first_existing(&self) -> Option<PathBuf> {
        self.paths.iter().find_map(|p| existing(p))
    }

    pub fn iter(&self) -> impl Iterator<Item = &PathBuf> {
        self.paths.iter()
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// Comma separated list for error messages
    pub fn describe(&self) -> String {
        self.paths
            .iter()
            .map(|p| p.display().to_string())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl FromIterator<PathBuf> for CandidatePaths {
    fn from_iter<I: IntoIterator<Item = PathBuf>>(iter: I) -> Self {
        Self {
            paths: iter.into_iter().collect(),
        }
    }
}

/// `Some(path)` when something exists at `path`
pub fn existing(path: &Path) -> Option<PathBuf> {
    path.exists().then(|| path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn first_existing_respects_order() {
        let dir = tempdir().unwrap();
        let a = dir.path().join("a");
        let b = dir.path().join("b");
        let c = dir.path().join("c");
        std::fs::write(&b, b"b").unwrap();
        std::fs::write(&c, b"c").unwrap();

        let candidates = CandidatePaths::new().with(&a).with(&b).with(&c);
        assert_eq!(candidates.first_existing(), Some(b));
    }

    #[test]
    fn none_when_nothing_exists() {
        let dir = tempdir().unwrap();
        let candidates = CandidatePaths::under(&[dir.path().join("x"), dir.path().join("y")], "mod.pak");
        assert_eq!(candidates.len(), 2);
        assert!(candidates.first_existing().is_none());
        assert!(candidates.describe().contains("mod.pak"));
    }
}
