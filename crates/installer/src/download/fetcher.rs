use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::batch::run_in_batches;
use super::error::{DownloadError, Result};
use super::http::{HttpClient, discard_partial};
use super::tracker::DownloadProgressState;
use super::volume::ArchiveVolume;
use crate::config::InstallerConfig;
use crate::progress::ProgressSink;

/// Step number the download phase reports within its sink
const DOWNLOAD_STEP: u32 = 1;

/// Downloads the ordered volumes of a split archive
///
/// Volumes are probed with HEAD for their size, then transferred in settled
/// batches of at most `max_concurrent_downloads`. Progress goes to the sink
/// handed to [`fetch`](Self::fetch); the last event always sits at the top of
/// that sink's range.
pub struct ArchiveFetcher {
    client: HttpClient,
    max_concurrent: usize,
    volume_timeout: Duration,
    progress_interval: Duration,
}

impl ArchiveFetcher {
    pub fn new(config: &InstallerConfig) -> Result<Self> {
        Ok(Self {
            client: HttpClient::from_config(config)?,
            max_concurrent: config.max_concurrent_downloads.max(1),
            volume_timeout: config.volume_timeout,
            progress_interval: config.progress_interval,
        })
    }

    /// Download every volume of `urls` into `dest_dir`
    ///
    /// Returns local paths in the order of `urls`. Any volume failure fails
    /// the whole fetch once its batch has settled.
    pub async fn fetch(
        &self,
        urls: &[String],
        dest_dir: &Path,
        progress: &ProgressSink,
        cancel: &CancellationToken,
    ) -> Result<Vec<PathBuf>> {
        if urls.is_empty() {
            return Err(DownloadError::NoVolumes);
        }

        let mut volumes = urls
            .iter()
            .enumerate()
            .map(|(i, url)| ArchiveVolume::plan(url, i, dest_dir))
            .collect::<Result<Vec<_>>>()?;

        progress.emit(DOWNLOAD_STEP, "Preparing download...", 0);

        let tracker = DownloadProgressState::new(progress.clone(), DOWNLOAD_STEP, self.progress_interval);
        let client = &self.client;

        // Size probes share the transfer bound
        let sizes = run_in_batches(
            volumes.iter().map(|v| v.url.clone()).collect(),
            self.max_concurrent,
            cancel,
            || DownloadError::Cancelled,
            |url: String| async move { Ok::<_, DownloadError>(client.content_length(&url).await) },
        )
        .await?;
        for (volume, size) in volumes.iter_mut().zip(sizes) {
            match size {
                Some(size) => {
                    volume.expected_size = size;
                    tracker.add_expected(size);
                }
                None => {
                    warn!("Size of {} unknown; excluded from progress total", volume.file_name());
                    tracker.add_unsized();
                }
            }
        }
        info!(
            "Downloading {} volume(s), {} bytes known, {} at a time",
            volumes.len(),
            tracker.total(),
            self.max_concurrent
        );

        let tracker_ref = &tracker;
        let volume_timeout = self.volume_timeout;

        let paths = run_in_batches(
            volumes,
            self.max_concurrent,
            cancel,
            || DownloadError::Cancelled,
            |volume| async move {
                let name = volume.file_name();
                let transfer = client.download_volume(&volume, tracker_ref, cancel);
                match tokio::time::timeout(volume_timeout, transfer).await {
                    Ok(Ok(bytes)) => {
                        if volume.expected_size > 0 && bytes != volume.expected_size {
                            warn!(
                                "{}: expected {} bytes, received {}",
                                name, volume.expected_size, bytes
                            );
                        }
                        Ok(volume.local_path)
                    }
                    Ok(Err(e)) => {
                        warn!("Volume {} failed: {}", name, e);
                        discard_partial(&volume.local_path).await;
                        Err(e)
                    }
                    Err(_) => {
                        warn!("Volume {} timed out after {:?}", name, volume_timeout);
                        discard_partial(&volume.local_path).await;
                        Err(DownloadError::VolumeTimeout {
                            volume: name,
                            duration_secs: volume_timeout.as_secs(),
                        })
                    }
                }
            },
        )
        .await?;

        tracker.finish();
        debug!("All {} volume(s) downloaded ({} bytes)", paths.len(), tracker.downloaded());
        Ok(paths)
    }
}
