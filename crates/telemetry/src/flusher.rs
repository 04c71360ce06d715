// Copyright The Vitals Authors
// SPDX-License-Identifier: Apache-2.0

//! Background flush task.

use crate::store::MetricStore;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use vitals_clock::Ticker;

/// Spawns the periodic flusher.
///
/// Flush failures are logged at error level and retried on the next tick;
/// they never stop the task. One final flush runs when `cancel` fires, before
/// the task exits, so shutdown never loses the last window of observations.
pub fn spawn_flusher(
    store: MetricStore,
    interval: Duration,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = Ticker::new(interval);
        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    if let Err(e) = store.flush() {
                        tracing::error!(error = %e, "final metrics flush failed");
                    }
                    break;
                }
                _ = ticker.tick() => {
                    if let Err(e) = store.flush() {
                        tracing::error!(error = %e, "periodic metrics flush failed");
                    }
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::labels::LabelSet;
    use crate::store::StoreOptions;

    #[tokio::test(start_paused = true)]
    async fn flushes_periodically_and_once_on_shutdown() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("metrics.json");
        let store = MetricStore::new(StoreOptions {
            output_path: Some(path.clone()),
            ..StoreOptions::default()
        })
        .expect("valid options");
        store.counter("ticks", LabelSet::empty());

        let cancel = CancellationToken::new();
        let handle = spawn_flusher(store.clone(), Duration::from_secs(10), cancel.clone());

        tokio::time::sleep(Duration::from_secs(11)).await;
        assert!(path.exists(), "periodic flush must write the sink");

        store.counter("ticks", LabelSet::empty());
        cancel.cancel();
        handle.await.expect("flusher joins cleanly");

        let body = std::fs::read(&path).expect("sink readable");
        let snap: crate::snapshot::MetricsSnapshot =
            serde_json::from_slice(&body).expect("valid envelope");
        let ticks = snap
            .metrics
            .iter()
            .find(|s| s.name == "ticks")
            .expect("ticks series flushed");
        assert_eq!(ticks.value, 2.0, "final flush must include the last write");
    }
}
