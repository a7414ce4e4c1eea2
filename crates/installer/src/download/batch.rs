//! Settled batches with a hard concurrency bound

use futures::future::join_all;
use std::future::Future;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Run `task` over `items` in batches of `batch_size`
///
/// Every task of a batch runs concurrently and the whole batch settles,
/// successes and failures alike, before the next batch starts. The first
/// error in item order is returned once its batch has settled; outputs keep
/// item order otherwise. A cancelled token stops the run before the next
/// batch.
pub async fn run_in_batches<T, O, E, F, Fut>(
    items: Vec<T>,
    batch_size: usize,
    cancel: &CancellationToken,
    on_cancel: impl Fn() -> E,
    task: F,
) -> Result<Vec<O>, E>
where
    F: Fn(T) -> Fut,
    Fut: Future<Output = Result<O, E>>,
{
    let batch_size = batch_size.max(1);
    let mut outputs = Vec::with_capacity(items.len());
    let mut items = items.into_iter().peekable();
    let mut batch_index = 0;

    while items.peek().is_some() {
        if cancel.is_cancelled() {
            return Err(on_cancel());
        }
        let batch: Vec<T> = items.by_ref().take(batch_size).collect();
        debug!("Starting batch {} with {} task(s)", batch_index, batch.len());

        let settled = join_all(batch.into_iter().map(&task)).await;
        for result in settled {
            outputs.push(result?);
        }
        batch_index += 1;
    }

    Ok(outputs)
}
