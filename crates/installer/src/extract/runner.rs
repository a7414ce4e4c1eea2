//! Subprocess boundary for extraction tools

use async_trait::async_trait;
use std::ffi::OsString;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::error::{ExtractionError, Result};
use super::tools::ExtractionToolCandidate;
use crate::config::InstallerConfig;

#[cfg(windows)]
const CREATE_NO_WINDOW: u32 = 0x08000000;

/// Captured output of a successful tool run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolOutput {
    pub stdout: String,
    pub stderr: String,
}

/// Runs one extraction tool to completion
///
/// Implementations distinguish a tool that could not be started
/// ([`ExtractionError::ToolSpawn`]) from one that started and then failed
/// ([`ExtractionError::ToolWait`], [`ExtractionError::ToolFailed`]).
#[async_trait]
pub trait ToolRunner: Send + Sync {
    async fn run(
        &self,
        tool: &ExtractionToolCandidate,
        args: &[OsString],
        cancel: &CancellationToken,
    ) -> Result<ToolOutput>;
}

/// Runs tools as child processes with a timeout and bounded output capture
#[derive(Debug, Clone)]
pub struct ProcessRunner {
    timeout: Duration,
    output_limit: usize,
}

impl ProcessRunner {
    pub fn new(timeout: Duration, output_limit: usize) -> Self {
        Self { timeout, output_limit }
    }

    pub fn from_config(config: &InstallerConfig) -> Self {
        Self::new(config.extraction_timeout, config.tool_output_limit)
    }
}

enum Finished {
    Exited(std::io::Result<ExitStatus>),
    TimedOut,
    Cancelled,
}

#[async_trait]
impl ToolRunner for ProcessRunner {
    async fn run(
        &self,
        tool: &ExtractionToolCandidate,
        args: &[OsString],
        cancel: &CancellationToken,
    ) -> Result<ToolOutput> {
        let name = tool.display_name();
        debug!("Running {} {:?}", name, args);

        let mut command = Command::new(&tool.executable);
        command
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        #[cfg(windows)]
        command.creation_flags(CREATE_NO_WINDOW);

        let mut child = command.spawn().map_err(|source| ExtractionError::ToolSpawn {
            tool: name.clone(),
            source,
        })?;

        let limit = self.output_limit;
        let stdout = child.stdout.take().map(|out| tokio::spawn(drain_bounded(out, limit)));
        let stderr = child.stderr.take().map(|err| tokio::spawn(drain_bounded(err, limit)));

        let finished = tokio::select! {
            status = child.wait() => Finished::Exited(status),
            _ = tokio::time::sleep(self.timeout) => Finished::TimedOut,
            _ = cancel.cancelled() => Finished::Cancelled,
        };

        let status = match finished {
            Finished::Exited(status) => status.map_err(|source| ExtractionError::ToolWait {
                tool: name.clone(),
                source,
            })?,
            Finished::TimedOut => {
                let _ = child.kill().await;
                return Err(ExtractionError::ToolTimeout {
                    tool: name,
                    timeout: self.timeout,
                });
            }
            Finished::Cancelled => {
                let _ = child.kill().await;
                return Err(ExtractionError::Cancelled);
            }
        };

        let output = ToolOutput {
            stdout: collect(stdout).await,
            stderr: collect(stderr).await,
        };

        if status.success() {
            Ok(output)
        } else {
            Err(ExtractionError::ToolFailed {
                tool: name,
                code: status.code(),
                stderr: output.stderr.trim().to_string(),
            })
        }
    }
}

/// Read `reader` to the end, keeping at most `limit` bytes
///
/// Reading continues past the limit so the child never blocks on a full pipe.
async fn drain_bounded<R: AsyncRead + Unpin>(mut reader: R, limit: usize) -> String {
    let mut kept = Vec::new();
    let mut buf = [0u8; 8192];
    loop {
        match reader.read(&mut buf).await {
            Ok(0) | Err(_) => break,
            Ok(n) => {
                let room = limit.saturating_sub(kept.len());
                kept.extend_from_slice(&buf[..n.min(room)]);
            }
        }
    }
    String::from_utf8_lossy(&kept).into_owned()
}

async fn collect(handle: Option<tokio::task::JoinHandle<String>>) -> String {
    match handle {
        Some(handle) => handle.await.unwrap_or_default(),
        None => String::new(),
    }
}
