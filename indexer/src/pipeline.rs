//! Pipeline orchestrating one tracker per event type.

use tracing::info;

use crate::concurrency::shutdown::{ShutdownTx, create_shutdown_channel};
use crate::error::{ErrorKind, IndexerResult};
use crate::indexer_error;
use crate::source::EventSource;
use crate::store::{CheckpointStore, MaterializeStore};
use crate::trackers::{EventTracker, TrackerPool, TrackerSettings};
use crate::types::EventType;

/// The ingestion pipeline.
///
/// Owns an event source, a store, and, once started, one tracker per event
/// type. Trackers run concurrently and independently; the pipeline only
/// fans the shutdown signal out to them and aggregates their results.
#[derive(Debug)]
pub struct IndexerPipeline<Src, St> {
    source: Src,
    store: St,
    settings: TrackerSettings,
    shutdown_tx: ShutdownTx,
    trackers: Option<TrackerPool>,
}

impl<Src, St> IndexerPipeline<Src, St>
where
    Src: EventSource + Clone + Send + Sync + 'static,
    St: CheckpointStore + MaterializeStore + Clone + Send + Sync + 'static,
{
    pub fn new(source: Src, store: St, settings: TrackerSettings) -> Self {
        let (shutdown_tx, _shutdown_rx) = create_shutdown_channel();

        Self {
            source,
            store,
            settings,
            shutdown_tx,
            trackers: None,
        }
    }

    /// Returns a handle that can request shutdown from another task, e.g. a
    /// signal handler.
    pub fn shutdown_tx(&self) -> ShutdownTx {
        self.shutdown_tx.clone()
    }

    /// Spawns one tracker per event type.
    pub fn start(&mut self) -> IndexerResult<()> {
        if self.trackers.is_some() {
            return Err(indexer_error!(
                ErrorKind::InvalidData,
                "Pipeline was already started"
            ));
        }

        info!(trackers = EventType::ALL.len(), "starting ingestion pipeline");

        let mut pool = TrackerPool::new();
        for event_type in EventType::ALL {
            let tracker = EventTracker::new(
                event_type,
                self.source.clone(),
                self.store.clone(),
                self.settings,
                self.shutdown_tx.subscribe(),
            );
            pool.add(tracker.start());
        }
        self.trackers = Some(pool);

        Ok(())
    }

    /// Requests shutdown of all trackers without waiting for them.
    pub fn shutdown(&self) {
        info!("shutting down ingestion pipeline");

        // Failing to send means every tracker already stopped.
        let _ = self.shutdown_tx.shutdown();
    }

    /// Waits for every tracker to complete.
    pub async fn wait(self) -> IndexerResult<()> {
        let Some(trackers) = self.trackers else {
            return Err(indexer_error!(
                ErrorKind::InvalidData,
                "Pipeline was not started"
            ));
        };

        trackers.wait_all().await?;

        info!("ingestion pipeline completed");

        Ok(())
    }

    /// Requests shutdown and waits for every tracker to stop.
    pub async fn shutdown_and_wait(self) -> IndexerResult<()> {
        self.shutdown();
        self.wait().await
    }
}
