//! Progress events flowing from the core to the presentation layer

use serde::Serialize;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

/// Progress callback for install and uninstall runs
pub type ProgressCallback = Arc<dyn Fn(ProgressEvent) + Send + Sync>;

/// One progress update
///
/// `message` may span several lines during downloads; consumers render it
/// as-is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressEvent {
    pub step: u32,
    pub total: u32,
    pub message: String,
    pub percentage: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub speed: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub eta: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub downloaded_size: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_size: Option<String>,
}

/// Transfer figures attached to download progress events
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransferStats {
    pub speed: Option<String>,
    pub eta: Option<String>,
    pub downloaded_size: Option<String>,
    pub total_size: Option<String>,
}

/// Emits progress events for one operation, or one phase of it
///
/// A sink maps phase-local percentages (0..=100) into its `[floor, ceiling]`
/// slice of the overall bar. Phases derived with [`ProgressSink::phase`]
/// share the high-water mark of their parent, so the percentage seen by the
/// consumer never goes down.
#[derive(Clone)]
pub struct ProgressSink {
    callback: Option<ProgressCallback>,
    total: u32,
    step_offset: u32,
    floor: u32,
    ceiling: u32,
    high_water: Arc<AtomicU32>,
}

impl std::fmt::Debug for ProgressSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressSink")
            .field("total", &self.total)
            .field("step_offset", &self.step_offset)
            .field("floor", &self.floor)
            .field("ceiling", &self.ceiling)
            .finish()
    }
}

impl ProgressSink {
    pub fn new(callback: Option<ProgressCallback>, total: u32) -> Self {
        Self {
            callback,
            total,
            step_offset: 0,
            floor: 0,
            ceiling: 100,
            high_water: Arc::new(AtomicU32::new(0)),
        }
    }

    /// A sink that drops everything
    pub fn null() -> Self {
        Self::new(None, 0)
    }

    /// Narrow this sink to `[floor, ceiling]` of its own range, numbering
    /// steps after `step_offset`
    pub fn phase(&self, step_offset: u32, floor: u32, ceiling: u32) -> Self {
        let floor = self.scale(floor);
        let ceiling = self.scale(ceiling).max(floor);
        Self {
            callback: self.callback.clone(),
            total: self.total,
            step_offset: self.step_offset + step_offset,
            floor,
            ceiling,
            high_water: self.high_water.clone(),
        }
    }

    /// Same sink reporting a different total step count
    pub fn with_total(mut self, total: u32) -> Self {
        self.total = total;
        self
    }

    pub fn total(&self) -> u32 {
        self.total
    }

    /// Upper end of this sink's slice of the bar
    pub fn ceiling(&self) -> u32 {
        self.ceiling
    }

    pub fn emit(&self, step: u32, message: impl Into<String>, percent: u32) {
        self.emit_with(step, message, percent, TransferStats::default());
    }

    pub fn emit_with(&self, step: u32, message: impl Into<String>, percent: u32, stats: TransferStats) {
        let Some(callback) = &self.callback else {
            return;
        };
        let scaled = self.scale(percent);
        let previous = self.high_water.fetch_max(scaled, Ordering::SeqCst);
        callback(ProgressEvent {
            step: self.step_offset + step,
            total: self.total,
            message: message.into(),
            percentage: scaled.max(previous),
            speed: stats.speed,
            eta: stats.eta,
            downloaded_size: stats.downloaded_size,
            total_size: stats.total_size,
        });
    }

    fn scale(&self, percent: u32) -> u32 {
        let percent = percent.min(100);
        self.floor + (self.ceiling - self.floor) * percent / 100
    }
}

/// Human readable byte count, e.g. `1.50 GB`
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["KB", "MB", "GB", "TB"];
    if bytes < 1024 {
        return format!("{bytes} B");
    }
    let mut value = bytes as f64 / 1024.0;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{value:.2} {}", UNITS[unit])
}

pub fn format_speed(bytes_per_sec: f64) -> String {
    if !bytes_per_sec.is_finite() || bytes_per_sec <= 0.0 {
        return "0 B/s".to_string();
    }
    format!("{}/s", format_bytes(bytes_per_sec as u64))
}

/// `m:ss` or `h:mm:ss`
pub fn format_eta(secs: u64) -> String {
    let (h, m, s) = (secs / 3600, (secs % 3600) / 60, secs % 60);
    if h > 0 {
        format!("{h}:{m:02}:{s:02}")
    } else {
        format!("{m}:{s:02}")
    }
}
