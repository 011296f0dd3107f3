//! In-memory event source for tests and local development.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::error::{IndexerError, IndexerResult};
use crate::source::base::{EventPage, EventSource, SourceEvent};
use crate::types::{EventPosition, EventType};

#[derive(Debug, Default)]
struct Inner {
    /// Per-type logs, kept sorted by sequence ascending.
    events: HashMap<EventType, Vec<SourceEvent>>,
    /// Errors to return from the next fetches, consumed in order.
    injected_errors: HashMap<EventType, VecDeque<IndexerError>>,
}

/// Event source keeping per-type logs in memory.
///
/// Events can be appended while trackers are running, which makes it possible
/// to exercise out-of-order arrival across event types in tests.
#[derive(Debug, Clone, Default)]
pub struct MemoryEventSource {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryEventSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an event to the given type's log.
    pub async fn push_event(
        &self,
        event_type: EventType,
        position: EventPosition,
        payload: serde_json::Value,
    ) {
        let mut inner = self.inner.lock().await;

        let log = inner.events.entry(event_type).or_default();
        log.push(SourceEvent { position, payload });
        log.sort_by(|a, b| a.position.cmp(&b.position));
    }

    /// Makes the next fetch for `event_type` fail with the given error.
    pub async fn inject_error(&self, event_type: EventType, error: IndexerError) {
        let mut inner = self.inner.lock().await;
        inner
            .injected_errors
            .entry(event_type)
            .or_default()
            .push_back(error);
    }
}

impl EventSource for MemoryEventSource {
    async fn fetch_events(
        &self,
        event_type: EventType,
        after: Option<&EventPosition>,
        page_size: u16,
    ) -> IndexerResult<EventPage> {
        let mut inner = self.inner.lock().await;

        if let Some(error) = inner
            .injected_errors
            .get_mut(&event_type)
            .and_then(|queue| queue.pop_front())
        {
            return Err(error);
        }

        let log = inner.events.get(&event_type).map(Vec::as_slice).unwrap_or(&[]);

        let remaining: Vec<&SourceEvent> = match after {
            Some(after) => log
                .iter()
                .filter(|event| event.position.sequence > after.sequence)
                .collect(),
            None => log.iter().collect(),
        };

        let page: Vec<SourceEvent> = remaining
            .iter()
            .take(page_size as usize)
            .map(|event| (*event).clone())
            .collect();
        let has_more = remaining.len() > page.len();
        let next_cursor = page.last().map(|event| event.position.clone());

        Ok(EventPage {
            events: page,
            next_cursor,
            has_more,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use serde_json::json;

    #[tokio::test]
    async fn pages_respect_cursor_and_size() {
        let source = MemoryEventSource::new();
        for sequence in 1..=5 {
            source
                .push_event(
                    EventType::ProfileCreated,
                    EventPosition::new(sequence, format!("tx-{sequence}")),
                    json!({}),
                )
                .await;
        }

        let first = source
            .fetch_events(EventType::ProfileCreated, None, 2)
            .await
            .unwrap();
        assert_eq!(first.events.len(), 2);
        assert!(first.has_more);
        let cursor = first.next_cursor.unwrap();
        assert_eq!(cursor.sequence, 2);

        let second = source
            .fetch_events(EventType::ProfileCreated, Some(&cursor), 10)
            .await
            .unwrap();
        assert_eq!(second.events.len(), 3);
        assert!(!second.has_more);
        assert_eq!(second.next_cursor.unwrap().sequence, 5);
    }

    #[tokio::test]
    async fn empty_fetch_returns_no_cursor() {
        let source = MemoryEventSource::new();

        let page = source
            .fetch_events(EventType::TierCreated, None, 10)
            .await
            .unwrap();

        assert!(page.events.is_empty());
        assert!(page.next_cursor.is_none());
        assert!(!page.has_more);
    }

    #[tokio::test]
    async fn injected_errors_are_consumed_in_order() {
        let source = MemoryEventSource::new();
        source
            .inject_error(
                EventType::TierCreated,
                IndexerError::from((ErrorKind::InvalidCheckpoint, "cursor pruned")),
            )
            .await;

        let first = source.fetch_events(EventType::TierCreated, None, 10).await;
        assert_eq!(first.unwrap_err().kind(), ErrorKind::InvalidCheckpoint);

        let second = source.fetch_events(EventType::TierCreated, None, 10).await;
        assert!(second.is_ok());
    }
}
