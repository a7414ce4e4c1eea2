//! Aggregate progress across every volume of one fetch run

use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use crate::progress::{ProgressSink, TransferStats, format_bytes, format_eta, format_speed};

/// ETAs longer than this are not shown
const MAX_DISPLAYED_ETA_SECS: f64 = 3600.0;

/// Byte counters and throttling state for one fetch run
///
/// Shared by every concurrent volume transfer. Events go out at most once
/// per `interval`, except the final one from [`finish`](Self::finish).
/// Only bytes of volumes with a known size move the percentage; every byte
/// counts toward the reported amount and the rate.
#[derive(Debug)]
pub struct DownloadProgressState {
    downloaded: AtomicU64,
    sized_downloaded: AtomicU64,
    total: AtomicU64,
    unsized_volumes: AtomicU64,
    started: Instant,
    last_emit: Mutex<Instant>,
    interval: Duration,
    sink: ProgressSink,
    step: u32,
}

/// Derived transfer figures at one instant
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RateSnapshot {
    pub percent: u32,
    pub bytes_per_sec: f64,
    pub eta_secs: Option<u64>,
}

impl RateSnapshot {
    pub fn compute(downloaded: u64, total: u64, elapsed: Duration) -> Self {
        let percent = if total > 0 {
            ((downloaded.min(total) as u128 * 100) / total as u128) as u32
        } else {
            0
        };

        let secs = elapsed.as_secs_f64();
        let bytes_per_sec = if secs > 0.0 { downloaded as f64 / secs } else { 0.0 };

        let eta_secs = if bytes_per_sec > 0.0 && total > downloaded {
            let eta = (total - downloaded) as f64 / bytes_per_sec;
            (eta.is_finite() && eta <= MAX_DISPLAYED_ETA_SECS).then(|| eta.ceil() as u64)
        } else {
            None
        };

        Self {
            percent,
            bytes_per_sec,
            eta_secs,
        }
    }
}

impl DownloadProgressState {
    pub fn new(sink: ProgressSink, step: u32, interval: Duration) -> Self {
        let started = Instant::now();
        Self {
            downloaded: AtomicU64::new(0),
            sized_downloaded: AtomicU64::new(0),
            total: AtomicU64::new(0),
            unsized_volumes: AtomicU64::new(0),
            started,
            last_emit: Mutex::new(started),
            interval,
            sink,
            step,
        }
    }

    /// Add a known volume size to the aggregate total
    pub fn add_expected(&self, bytes: u64) {
        self.total.fetch_add(bytes, Ordering::Relaxed);
    }

    /// Note a volume whose size the server did not report
    pub fn add_unsized(&self) {
        self.unsized_volumes.fetch_add(1, Ordering::Relaxed);
    }

    /// Count a received chunk and emit if the throttle allows
    ///
    /// `sized` tells whether the chunk belongs to a volume counted in the total.
    pub fn record(&self, bytes: u64, sized: bool) {
        self.downloaded.fetch_add(bytes, Ordering::Relaxed);
        if sized {
            self.sized_downloaded.fetch_add(bytes, Ordering::Relaxed);
        }
        if self.claim_emit_slot() {
            self.emit(false);
        }
    }

    /// Emit the closing event at the top of the phase
    pub fn finish(&self) {
        self.emit(true);
    }

    pub fn downloaded(&self) -> u64 {
        self.downloaded.load(Ordering::Relaxed)
    }

    pub fn total(&self) -> u64 {
        self.total.load(Ordering::Relaxed)
    }

    fn claim_emit_slot(&self) -> bool {
        let mut last = self.last_emit.lock().unwrap_or_else(|e| e.into_inner());
        let now = Instant::now();
        if now.duration_since(*last) >= self.interval {
            *last = now;
            true
        } else {
            false
        }
    }

    fn emit(&self, complete: bool) {
        let downloaded = self.downloaded();
        let elapsed = self.started.elapsed();
        let sized = RateSnapshot::compute(
            self.sized_downloaded.load(Ordering::Relaxed),
            self.total(),
            elapsed,
        );
        let overall = RateSnapshot::compute(downloaded, 0, elapsed);
        let percent = if complete { 100 } else { sized.percent };

        let total = if complete {
            downloaded
        } else if self.unsized_volumes.load(Ordering::Relaxed) == 0 {
            self.total()
        } else {
            0
        };
        let downloaded_size = format_bytes(downloaded);
        let total_size = (total > 0).then(|| format_bytes(total));
        let speed = format_speed(overall.bytes_per_sec);
        let eta = sized.eta_secs.map(format_eta);

        let mut message = if complete {
            "Download complete".to_string()
        } else {
            "Downloading archive volumes...".to_string()
        };
        match &total_size {
            Some(total_size) => message.push_str(&format!("\n{downloaded_size} of {total_size}")),
            None => message.push_str(&format!("\n{downloaded_size}")),
        }
        if !complete {
            message.push_str(&format!("\n{speed}"));
            if let Some(eta) = &eta {
                message.push_str(&format!(" - {eta} remaining"));
            }
        }

        self.sink.emit_with(
            self.step,
            message,
            percent,
            TransferStats {
                speed: Some(speed),
                eta: if complete { None } else { eta },
                downloaded_size: Some(downloaded_size),
                total_size,
            },
        );
    }
}
