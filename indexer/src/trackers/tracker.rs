use std::time::Duration;

use tokio::time::sleep;
use tracing::{debug, error, info, warn};

use indexer_config::shared::IndexerConfig;

use crate::concurrency::retry::{RetryPolicy, execute_with_retry};
use crate::concurrency::shutdown::ShutdownRx;
use crate::error::{ErrorKind, IndexerResult};
use crate::handlers::apply_event;
use crate::source::{EventSource, SourceEvent};
use crate::store::{CheckpointStore, MaterializeStore};
use crate::trackers::base::TrackerHandle;
use crate::types::{EventType, LedgerEvent};

/// Settings shared by every tracker of a pipeline.
#[derive(Debug, Clone, Copy)]
pub struct TrackerSettings {
    /// Time a tracker waits between ticks when the source reports no more
    /// pages.
    pub poll_interval: Duration,
    /// Maximum number of events fetched per page.
    pub page_size: u16,
    /// Backoff schedule for events whose dependencies are not materialized
    /// yet.
    pub retry_policy: RetryPolicy,
}

impl Default for TrackerSettings {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(5),
            page_size: 100,
            retry_policy: RetryPolicy::default(),
        }
    }
}

impl From<&IndexerConfig> for TrackerSettings {
    fn from(config: &IndexerConfig) -> Self {
        Self {
            poll_interval: Duration::from_millis(config.polling.interval_ms),
            page_size: config.polling.page_size,
            retry_policy: config.retry.into(),
        }
    }
}

/// Polling loop materializing a single event type.
///
/// The tracker loads its checkpoint once at startup and then ticks until
/// shutdown: fetch a page after the current position, apply each event in
/// order, persist the page's end position, and either continue immediately
/// when the source has more pages or sleep for the poll interval.
#[derive(Debug)]
pub struct EventTracker<Src, St> {
    event_type: EventType,
    source: Src,
    store: St,
    settings: TrackerSettings,
    shutdown_rx: ShutdownRx,
}

impl<Src, St> EventTracker<Src, St>
where
    Src: EventSource + Send + Sync + 'static,
    St: CheckpointStore + MaterializeStore + Send + Sync + 'static,
{
    pub fn new(
        event_type: EventType,
        source: Src,
        store: St,
        settings: TrackerSettings,
        shutdown_rx: ShutdownRx,
    ) -> Self {
        Self {
            event_type,
            source,
            store,
            settings,
            shutdown_rx,
        }
    }

    /// Spawns the tracker's polling loop onto the runtime.
    pub fn start(self) -> TrackerHandle {
        let event_type = self.event_type;
        let handle = tokio::spawn(self.run());

        TrackerHandle::new(event_type, handle)
    }

    async fn run(mut self) -> IndexerResult<()> {
        info!(event_type = %self.event_type, "starting event tracker");

        let mut checkpoint = self.store.get_checkpoint(self.event_type).await?;
        match &checkpoint {
            Some(position) => {
                info!(event_type = %self.event_type, %position, "resuming from checkpoint")
            }
            None => info!(event_type = %self.event_type, "no checkpoint, reading log from the beginning"),
        }

        loop {
            let page = match self
                .source
                .fetch_events(self.event_type, checkpoint.as_ref(), self.settings.page_size)
                .await
            {
                Ok(page) => page,
                Err(error) if error.kind() == ErrorKind::InvalidCheckpoint => {
                    // The source pruned past our position; the idempotent
                    // handlers make re-reading the whole log safe. The
                    // restart waits for the next tick so a source that keeps
                    // rejecting cursors cannot pin the loop.
                    warn!(
                        event_type = %self.event_type,
                        %error,
                        "checkpoint rejected by source, re-reading log from the beginning"
                    );
                    checkpoint = None;
                    if self.sleep_or_shutdown().await {
                        info!(event_type = %self.event_type, "shutting down event tracker");
                        return Ok(());
                    }
                    continue;
                }
                Err(error) => {
                    error!(
                        event_type = %self.event_type,
                        %error,
                        "failed to fetch events, retrying next tick"
                    );
                    if self.sleep_or_shutdown().await {
                        return Ok(());
                    }
                    continue;
                }
            };

            for event in &page.events {
                if self.shutdown_requested() {
                    info!(event_type = %self.event_type, "shutting down event tracker");
                    return Ok(());
                }

                self.process_event(event).await;
            }

            // The checkpoint always advances to the end of the page, even
            // when individual events were skipped, so a crash never replays
            // more than one page.
            if let Some(next_cursor) = page.next_cursor {
                self.store
                    .set_checkpoint(self.event_type, next_cursor.clone())
                    .await?;
                checkpoint = Some(next_cursor);
            }

            if page.has_more {
                debug!(event_type = %self.event_type, "more pages available, continuing immediately");
                continue;
            }

            if self.sleep_or_shutdown().await {
                info!(event_type = %self.event_type, "shutting down event tracker");
                return Ok(());
            }
        }
    }

    /// Decodes and applies one event, retrying missing dependencies.
    ///
    /// Failures are logged and swallowed: a permanently failing event must
    /// not stall the tracker, the checkpoint advances past it regardless.
    async fn process_event(&self, event: &SourceEvent) {
        let decoded = match LedgerEvent::decode(self.event_type, event.payload.clone()) {
            Ok(decoded) => decoded,
            Err(error) => {
                error!(
                    event_type = %self.event_type,
                    position = %event.position,
                    %error,
                    "skipping event with undecodable payload"
                );
                return;
            }
        };

        let result = execute_with_retry(
            || apply_event(&self.store, &decoded),
            |error| error.kind() == ErrorKind::DependencyNotFound,
            self.settings.retry_policy,
        )
        .await;

        if let Err(error) = result {
            error!(
                event_type = %self.event_type,
                position = %event.position,
                %error,
                "skipping event after permanent failure"
            );
        } else {
            debug!(
                event_type = %self.event_type,
                position = %event.position,
                "applied event"
            );
        }
    }

    fn shutdown_requested(&self) -> bool {
        // A closed channel means the pipeline is gone, stop as well.
        self.shutdown_rx.has_changed().unwrap_or(true)
    }

    /// Sleeps for the poll interval. Returns `true` when shutdown was
    /// signaled during the wait.
    async fn sleep_or_shutdown(&mut self) -> bool {
        tokio::select! {
            _ = self.shutdown_rx.changed() => true,
            _ = sleep(self.settings.poll_interval) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::concurrency::shutdown::create_shutdown_channel;
    use crate::source::MemoryEventSource;
    use crate::store::MemoryStore;
    use crate::{indexer_error, types::EventPosition};
    use serde_json::json;

    fn fast_settings() -> TrackerSettings {
        TrackerSettings {
            poll_interval: Duration::from_millis(10),
            page_size: 2,
            retry_policy: RetryPolicy {
                max_retries: 2,
                initial_delay: Duration::from_millis(5),
                max_delay: Duration::from_millis(10),
            },
        }
    }

    async fn push_profile_created(source: &MemoryEventSource, sequence: u64, address: &str) {
        source
            .push_event(
                EventType::ProfileCreated,
                EventPosition::new(sequence, format!("tx-{sequence}")),
                json!({
                    "creator_address": address,
                    "profile_id": format!("p-{address}"),
                    "name": "creator",
                }),
            )
            .await;
    }

    #[tokio::test]
    async fn drains_all_pages_and_checkpoints_page_end() {
        let source = MemoryEventSource::new();
        let store = MemoryStore::new();
        for sequence in 1..=5 {
            push_profile_created(&source, sequence, &format!("0x{sequence}")).await;
        }

        let (shutdown_tx, shutdown_rx) = create_shutdown_channel();
        let tracker = EventTracker::new(
            EventType::ProfileCreated,
            source,
            store.clone(),
            fast_settings(),
            shutdown_rx,
        );
        let handle = tracker.start();

        tokio::time::sleep(Duration::from_millis(100)).await;
        shutdown_tx.shutdown().unwrap();
        handle.wait().await.unwrap();

        assert!(store.get_creator("0x5").await.unwrap().is_some());
        let checkpoint = store
            .get_checkpoint(EventType::ProfileCreated)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(checkpoint.sequence, 5);
    }

    #[tokio::test]
    async fn undecodable_event_is_skipped_and_checkpoint_advances() {
        let source = MemoryEventSource::new();
        let store = MemoryStore::new();
        source
            .push_event(
                EventType::ProfileCreated,
                EventPosition::new(1, "tx-1"),
                json!({ "unexpected": true }),
            )
            .await;
        push_profile_created(&source, 2, "0xa").await;

        let (shutdown_tx, shutdown_rx) = create_shutdown_channel();
        let handle = EventTracker::new(
            EventType::ProfileCreated,
            source,
            store.clone(),
            fast_settings(),
            shutdown_rx,
        )
        .start();

        tokio::time::sleep(Duration::from_millis(100)).await;
        shutdown_tx.shutdown().unwrap();
        handle.wait().await.unwrap();

        assert!(store.get_creator("0xa").await.unwrap().is_some());
        let checkpoint = store
            .get_checkpoint(EventType::ProfileCreated)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(checkpoint.sequence, 2);
    }

    #[tokio::test]
    async fn invalid_checkpoint_error_resets_to_log_start() {
        let source = MemoryEventSource::new();
        let store = MemoryStore::new();

        // A stale persisted checkpoint the source will reject once.
        store
            .set_checkpoint(EventType::ProfileCreated, EventPosition::new(99, "tx-99"))
            .await
            .unwrap();
        source
            .inject_error(
                EventType::ProfileCreated,
                indexer_error!(
                    ErrorKind::InvalidCheckpoint,
                    "Stored checkpoint is no longer valid against the source log"
                ),
            )
            .await;
        push_profile_created(&source, 1, "0xa").await;

        let (shutdown_tx, shutdown_rx) = create_shutdown_channel();
        let handle = EventTracker::new(
            EventType::ProfileCreated,
            source,
            store.clone(),
            fast_settings(),
            shutdown_rx,
        )
        .start();

        tokio::time::sleep(Duration::from_millis(100)).await;
        shutdown_tx.shutdown().unwrap();
        handle.wait().await.unwrap();

        // The event below the stale checkpoint was re-read and applied.
        assert!(store.get_creator("0xa").await.unwrap().is_some());
        let checkpoint = store
            .get_checkpoint(EventType::ProfileCreated)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(checkpoint.sequence, 1);
    }

    #[tokio::test]
    async fn persistent_invalid_checkpoints_do_not_block_shutdown() {
        let source = MemoryEventSource::new();
        let store = MemoryStore::new();

        // A source that rejects the cursor on every fetch. The reset path
        // must still pass through a wait where shutdown is observed.
        for _ in 0..1_000 {
            source
                .inject_error(
                    EventType::ProfileCreated,
                    indexer_error!(
                        ErrorKind::InvalidCheckpoint,
                        "Stored checkpoint is no longer valid against the source log"
                    ),
                )
                .await;
        }

        let (shutdown_tx, shutdown_rx) = create_shutdown_channel();
        let handle = EventTracker::new(
            EventType::ProfileCreated,
            source,
            store,
            fast_settings(),
            shutdown_rx,
        )
        .start();

        tokio::time::sleep(Duration::from_millis(30)).await;
        shutdown_tx.shutdown().unwrap();

        tokio::time::timeout(Duration::from_secs(1), handle.wait())
            .await
            .expect("tracker did not observe shutdown")
            .unwrap();
    }

    #[tokio::test]
    async fn transient_fetch_errors_are_retried_next_tick() {
        let source = MemoryEventSource::new();
        let store = MemoryStore::new();
        source
            .inject_error(
                EventType::ProfileCreated,
                indexer_error!(ErrorKind::SourceQueryFailed, "Event source returned an error"),
            )
            .await;
        push_profile_created(&source, 1, "0xa").await;

        let (shutdown_tx, shutdown_rx) = create_shutdown_channel();
        let handle = EventTracker::new(
            EventType::ProfileCreated,
            source,
            store.clone(),
            fast_settings(),
            shutdown_rx,
        )
        .start();

        tokio::time::sleep(Duration::from_millis(100)).await;
        shutdown_tx.shutdown().unwrap();
        handle.wait().await.unwrap();

        assert!(store.get_creator("0xa").await.unwrap().is_some());
    }
}
