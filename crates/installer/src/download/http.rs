//! HTTP client for archive volumes
//!
//! Streams each volume to a `.download` temp file and renames it into place
//! once complete, feeding every chunk into the shared progress state.

use futures::StreamExt;
use reqwest::Client;
use reqwest::header::CONTENT_LENGTH;
use std::path::Path;
use std::time::Duration;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::error::{DownloadError, Result};
use super::tracker::DownloadProgressState;
use super::volume::ArchiveVolume;
use crate::config::InstallerConfig;
use crate::error::FileOperation;
use crate::files::{atomic_rename, create_temp_path};

pub struct HttpClient {
    client: Client,
    metadata_timeout: Duration,
}

impl HttpClient {
    pub fn from_config(config: &InstallerConfig) -> Result<Self> {
        // No client-wide timeout: transfers are bounded per volume by the fetcher.
        let client = Client::builder()
            .user_agent(&config.user_agent)
            .build()
            .map_err(DownloadError::Client)?;

        Ok(Self {
            client,
            metadata_timeout: config.metadata_timeout,
        })
    }

    /// Content length from a HEAD request; any failure reads as unknown
    pub async fn content_length(&self, url: &str) -> Option<u64> {
        let response = match self
            .client
            .head(url)
            .timeout(self.metadata_timeout)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                debug!("HEAD {} failed: {}", url, e);
                return None;
            }
        };
        if !response.status().is_success() {
            debug!("HEAD {} returned {}", url, response.status());
            return None;
        }

        response
            .headers()
            .get(CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<u64>().ok())
            .filter(|len| *len > 0)
    }

    /// Stream `volume` to its local path
    pub async fn download_volume(
        &self,
        volume: &ArchiveVolume,
        progress: &DownloadProgressState,
        cancel: &CancellationToken,
    ) -> Result<u64> {
        let name = volume.file_name();
        let dest_path = volume.local_path.as_path();
        debug!("Stream downloading: {} to {}", volume.url, dest_path.display());

        if let Some(parent) = dest_path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| DownloadError::fs(parent, FileOperation::CreateDir, e))?;
        }

        let response = self
            .client
            .get(&volume.url)
            .send()
            .await
            .map_err(|e| DownloadError::HttpRequest {
                volume: name.clone(),
                url: volume.url.clone(),
                source: e,
            })?;

        if !response.status().is_success() {
            return Err(DownloadError::HttpStatus {
                volume: name,
                url: volume.url.clone(),
                status: response.status().as_u16(),
            });
        }

        let temp_path = create_temp_path(dest_path);
        let mut file = fs::File::create(&temp_path)
            .await
            .map_err(|e| DownloadError::fs(&temp_path, FileOperation::Create, e))?;

        let mut stream = response.bytes_stream();
        let mut downloaded = 0u64;
        let sized = volume.expected_size > 0;

        while let Some(chunk) = stream.next().await {
            if cancel.is_cancelled() {
                drop(file);
                let _ = fs::remove_file(&temp_path).await;
                return Err(DownloadError::Cancelled);
            }
            let chunk = chunk.map_err(|e| DownloadError::HttpRequest {
                volume: name.clone(),
                url: volume.url.clone(),
                source: e,
            })?;

            file.write_all(&chunk)
                .await
                .map_err(|e| DownloadError::fs(&temp_path, FileOperation::Write, e))?;

            downloaded += chunk.len() as u64;
            progress.record(chunk.len() as u64, sized);
        }

        file.flush()
            .await
            .map_err(|e| DownloadError::fs(&temp_path, FileOperation::Write, e))?;
        file.sync_all()
            .await
            .map_err(|e| DownloadError::fs(&temp_path, FileOperation::Write, e))?;
        drop(file);

        atomic_rename(&temp_path, dest_path)
            .await
            .map_err(|e| DownloadError::fs(dest_path, FileOperation::Rename, e))?;

        debug!("Stream download completed: {} ({} bytes)", name, downloaded);
        Ok(downloaded)
    }
}

/// Remove a leftover temp file of `dest_path`, ignoring absence
pub(super) async fn discard_partial(dest_path: &Path) {
    let _ = fs::remove_file(create_temp_path(dest_path)).await;
}
