use tracing::info;

use crate::error::{IndexerError, IndexerResult};
use crate::trackers::base::TrackerHandle;

/// Set of running trackers owned by a pipeline.
#[derive(Debug, Default)]
pub struct TrackerPool {
    handles: Vec<TrackerHandle>,
}

impl TrackerPool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, handle: TrackerHandle) {
        self.handles.push(handle);
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Waits for every tracker to complete.
    ///
    /// All trackers are awaited even when some fail; their failures are
    /// aggregated into a single error so no outcome is lost.
    pub async fn wait_all(self) -> IndexerResult<()> {
        let mut errors = Vec::new();

        for handle in self.handles {
            let event_type = handle.event_type();

            if let Err(error) = handle.wait().await {
                errors.push(error);
            } else {
                info!(%event_type, "event tracker completed");
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(IndexerError::from(errors))
        }
    }
}
