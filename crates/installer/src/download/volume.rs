use std::path::{Path, PathBuf};

use super::error::{DownloadError, Result};

/// One part of the split archive
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveVolume {
    pub url: String,
    /// Size reported by the server, 0 when unknown
    pub expected_size: u64,
    pub local_path: PathBuf,
}

impl ArchiveVolume {
    /// Plan volume `index` (0-based) of `url` inside `dest_dir`
    pub fn plan(url: &str, index: usize, dest_dir: &Path) -> Result<Self> {
        let name = volume_file_name(url, index)?;
        Ok(Self {
            url: url.to_string(),
            expected_size: 0,
            local_path: dest_dir.join(name),
        })
    }

    pub fn file_name(&self) -> String {
        self.local_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.url.clone())
    }
}

/// Last path segment of `url`, or `volume.partN.rar` when it has none
fn volume_file_name(url: &str, index: usize) -> Result<String> {
    let parsed = url::Url::parse(url).map_err(|source| DownloadError::InvalidUrl {
        url: url.to_string(),
        source,
    })?;

    let last = parsed
        .path_segments()
        .and_then(|mut segments| segments.next_back())
        .filter(|segment| !segment.is_empty() && *segment != "." && *segment != "..");

    Ok(match last {
        Some(segment) => segment.to_string(),
        None => format!("volume.part{}.rar", index + 1),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_volume_after_last_segment() {
        let v = ArchiveVolume::plan("https://host/releases/v1/DT.part3.rar", 2, Path::new("/scratch")).unwrap();
        assert_eq!(v.local_path, PathBuf::from("/scratch/DT.part3.rar"));
        assert_eq!(v.file_name(), "DT.part3.rar");
    }

    #[test]
    fn falls_back_to_indexed_name() {
        let v = ArchiveVolume::plan("https://host/", 4, Path::new("/scratch")).unwrap();
        assert_eq!(v.file_name(), "volume.part5.rar");
    }

    #[test]
    fn rejects_unparseable_url() {
        let err = ArchiveVolume::plan("not a url", 0, Path::new("/scratch")).unwrap_err();
        assert_eq!(err.category(), "invalid_url");
    }
}
