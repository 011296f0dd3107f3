use std::future::Future;

use crate::error::IndexerResult;
use crate::types::{EventPosition, EventType};

/// A single event as returned by the source, before decoding.
///
/// The payload stays raw JSON at this layer; decoding into a typed
/// [`crate::types::LedgerEvent`] happens in the tracker so that a malformed
/// payload is a per-event failure instead of a fetch failure.
#[derive(Debug, Clone)]
pub struct SourceEvent {
    pub position: EventPosition,
    pub payload: serde_json::Value,
}

/// One page of events for a single event type.
#[derive(Debug, Clone)]
pub struct EventPage {
    /// Events strictly ordered by position ascending.
    pub events: Vec<SourceEvent>,
    /// Position to resume from for the next page. `None` when the source did
    /// not advance, i.e. the page was empty.
    pub next_cursor: Option<EventPosition>,
    /// Whether more pages are immediately available. A tracker ticks again
    /// without delay while this is true.
    pub has_more: bool,
}

/// Trait for systems serving the ledger's per-type event logs.
///
/// Implementations must return events strictly ordered by position ascending,
/// starting just after `after`, or from the beginning of the log when `after`
/// is `None`.
///
/// A fetch against a position the source no longer retains must fail with
/// [`crate::error::ErrorKind::InvalidCheckpoint`] so the tracker can reset
/// and re-read the log from the beginning.
pub trait EventSource {
    /// Fetches the next page of events of `event_type` after the given position.
    fn fetch_events(
        &self,
        event_type: EventType,
        after: Option<&EventPosition>,
        page_size: u16,
    ) -> impl Future<Output = IndexerResult<EventPage>> + Send;
}
