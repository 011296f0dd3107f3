use tokio::task::JoinHandle;
use tracing::error;

use crate::error::{ErrorKind, IndexerResult};
use crate::indexer_error;
use crate::types::EventType;

/// Handle to a spawned tracker task.
///
/// Dropping the handle does not cancel the tracker; cancellation goes through
/// the shutdown channel, the handle only waits for completion.
#[derive(Debug)]
pub struct TrackerHandle {
    event_type: EventType,
    handle: JoinHandle<IndexerResult<()>>,
}

impl TrackerHandle {
    pub fn new(event_type: EventType, handle: JoinHandle<IndexerResult<()>>) -> Self {
        Self { event_type, handle }
    }

    /// Returns the event type the tracked task polls.
    pub fn event_type(&self) -> EventType {
        self.event_type
    }

    /// Waits for the tracker task to complete.
    ///
    /// A panic inside the task surfaces as [`ErrorKind::TrackerPanic`] instead
    /// of unwinding into the caller.
    pub async fn wait(self) -> IndexerResult<()> {
        match self.handle.await {
            Ok(result) => result,
            Err(join_error) => {
                error!(
                    event_type = %self.event_type,
                    error = %join_error,
                    "tracker task terminated abnormally"
                );

                Err(indexer_error!(
                    ErrorKind::TrackerPanic,
                    "Tracker task panicked or was aborted",
                    self.event_type
                ))
            }
        }
    }
}
