//! Archive volume downloads
//!
//! - `fetcher`: the ordered, batch-bounded fetch run
//! - `http`: streaming a single volume to disk
//! - `tracker`: aggregate bytes, rate and ETA across volumes
//! - `batch`: settled batches with a concurrency bound

pub mod batch;
pub mod error;
pub mod fetcher;
pub mod http;
pub mod tracker;
pub mod volume;


pub use error::{DownloadError, Result};
pub use fetcher::ArchiveFetcher;
pub use tracker::{DownloadProgressState, RateSnapshot};
pub use volume::ArchiveVolume;
