use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::error::{ExtractionError, Result};
use super::payload::{SEARCH_DEPTH, describe_tree, find_payload};
use super::runner::ToolRunner;
use super::tools::{ExtractionToolCandidate, raw_commands, structured_candidates};
use crate::config::InstallerConfig;
use crate::error::FileOperation;
use crate::files::{clear_dir, path_exists};
use crate::progress::ProgressSink;

const EXTRACT_STEP: u32 = 1;

/// Expands a multi-volume archive with the first external tool that works
///
/// Structured candidates are tried only if their executable exists; raw
/// commands are handed to the OS as-is after every structured candidate
/// failed. Whenever extraction does not produce a payload, `out_dir` is left
/// empty.
pub struct ArchiveExtractor {
    runner: Arc<dyn ToolRunner>,
    candidates: Vec<ExtractionToolCandidate>,
    raw: Vec<ExtractionToolCandidate>,
}

impl ArchiveExtractor {
    /// Default candidate lists for `config`, executed by `runner`
    pub fn new(config: &InstallerConfig, runner: Arc<dyn ToolRunner>) -> Self {
        Self::with_candidates(runner, structured_candidates(&config.tool_roots), raw_commands())
    }

    pub fn with_candidates(
        runner: Arc<dyn ToolRunner>,
        candidates: Vec<ExtractionToolCandidate>,
        raw: Vec<ExtractionToolCandidate>,
    ) -> Self {
        Self { runner, candidates, raw }
    }

    /// Extract the archive starting at `first_volume` into `out_dir` and
    /// return the payload root
    pub async fn extract(
        &self,
        first_volume: &Path,
        out_dir: &Path,
        progress: &ProgressSink,
        cancel: &CancellationToken,
    ) -> Result<PathBuf> {
        fs::create_dir_all(out_dir)
            .await
            .map_err(|e| ExtractionError::fs(out_dir, FileOperation::CreateDir, e))?;
        progress.emit(EXTRACT_STEP, "Extracting archive...", 0);

        let outcome = self.extract_inner(first_volume, out_dir, cancel).await;
        if outcome.is_err() {
            if let Err(e) = clear_dir(out_dir).await {
                warn!("Could not clear {} after failed extraction: {}", out_dir.display(), e);
            }
        } else {
            progress.emit(EXTRACT_STEP, "Extraction complete", 100);
        }
        outcome
    }

    async fn extract_inner(
        &self,
        first_volume: &Path,
        out_dir: &Path,
        cancel: &CancellationToken,
    ) -> Result<PathBuf> {
        let tool = self.run_first_working_tool(first_volume, out_dir, cancel).await?;
        info!("Archive extracted with {}", tool);

        match find_payload(out_dir).await {
            Some(payload) => {
                info!("Payload located at {}", payload.display());
                Ok(payload)
            }
            None => {
                let root = out_dir.to_path_buf();
                let tree = tokio::task::spawn_blocking(move || describe_tree(&root, SEARCH_DEPTH))
                    .await
                    .unwrap_or_else(|e| format!("<tree listing failed: {e}>"));
                warn!("Payload not found; extracted tree:\n{}", tree);
                Err(ExtractionError::PayloadNotFound {
                    searched: out_dir.to_path_buf(),
                })
            }
        }
    }

    async fn run_first_working_tool(
        &self,
        first_volume: &Path,
        out_dir: &Path,
        cancel: &CancellationToken,
    ) -> Result<String> {
        let mut attempted = Vec::new();
        let mut last_error: Option<ExtractionError> = None;

        for candidate in &self.candidates {
            if !path_exists(&candidate.executable).await {
                debug!("Extraction tool not present: {}", candidate.display_name());
                continue;
            }
            match self.try_tool(candidate, first_volume, out_dir, cancel).await {
                Ok(()) => return Ok(candidate.display_name()),
                Err(ExtractionError::Cancelled) => return Err(ExtractionError::Cancelled),
                Err(e) => {
                    warn!("Extraction with {} failed: {}", candidate.display_name(), e);
                    attempted.push(candidate.display_name());
                    last_error = Some(e);
                }
            }
        }

        if attempted.is_empty() {
            info!("No extraction tool found in {} location(s); trying PATH", self.candidates.len());
        }

        for candidate in &self.raw {
            match self.try_tool(candidate, first_volume, out_dir, cancel).await {
                Ok(()) => return Ok(candidate.display_name()),
                Err(ExtractionError::Cancelled) => return Err(ExtractionError::Cancelled),
                Err(e) => {
                    debug!("Raw command {} failed: {}", candidate.display_name(), e);
                    attempted.push(candidate.display_name());
                    last_error = Some(e);
                }
            }
        }

        Err(ExtractionError::AllToolsFailed {
            attempted,
            last_error: last_error
                .map(|e| e.to_string())
                .unwrap_or_else(|| "no extraction tool available".to_string()),
        })
    }

    async fn try_tool(
        &self,
        candidate: &ExtractionToolCandidate,
        first_volume: &Path,
        out_dir: &Path,
        cancel: &CancellationToken,
    ) -> Result<()> {
        if cancel.is_cancelled() {
            return Err(ExtractionError::Cancelled);
        }
        // A previous failed tool may have left partial output behind
        clear_dir(out_dir)
            .await
            .map_err(|e| ExtractionError::fs(out_dir, FileOperation::Delete, e))?;

        let args = candidate.kind.args(first_volume, out_dir);
        let output = self.runner.run(candidate, &args, cancel).await?;
        if !output.stdout.is_empty() {
            debug!("{} output: {}", candidate.display_name(), output.stdout.trim());
        }
        Ok(())
    }
}
