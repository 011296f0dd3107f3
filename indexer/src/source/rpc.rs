//! JSON-RPC client for the ledger node's event query endpoint.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;

use crate::error::{ErrorKind, IndexerResult};
use crate::indexer_error;
use crate::source::base::{EventPage, EventSource, SourceEvent};
use crate::types::{EventPosition, EventType};

/// JSON-RPC method used to query one event type's log.
const QUERY_EVENTS_METHOD: &str = "platform_queryEvents";

/// Message fragments the node returns for a cursor it no longer retains.
///
/// The node's error contract for pruned cursors is not formally specified, so
/// recognition is by substring. Revisit once the node exposes a stable error
/// code for this condition.
const INVALID_CURSOR_FRAGMENTS: &[&str] = &["invalid cursor", "cursor not found"];

/// Cursor as it travels over the wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct RpcCursor {
    sequence: u64,
    tx_digest: String,
}

impl From<&EventPosition> for RpcCursor {
    fn from(position: &EventPosition) -> Self {
        Self {
            sequence: position.sequence,
            tx_digest: position.tx_digest.clone(),
        }
    }
}

impl From<RpcCursor> for EventPosition {
    fn from(cursor: RpcCursor) -> Self {
        EventPosition::new(cursor.sequence, cursor.tx_digest)
    }
}

/// A single event in the RPC response.
#[derive(Debug, Deserialize)]
struct RpcEvent {
    sequence: u64,
    tx_digest: String,
    payload: serde_json::Value,
}

/// Result payload of a successful `platform_queryEvents` call.
#[derive(Debug, Deserialize)]
struct QueryEventsResult {
    events: Vec<RpcEvent>,
    next_cursor: Option<RpcCursor>,
    has_more: bool,
}

/// Error object of a failed JSON-RPC call.
#[derive(Debug, Deserialize)]
struct RpcErrorObject {
    code: i64,
    message: String,
}

/// JSON-RPC response envelope.
#[derive(Debug, Deserialize)]
struct RpcResponse {
    result: Option<QueryEventsResult>,
    error: Option<RpcErrorObject>,
}

/// Event source backed by a ledger node's JSON-RPC endpoint.
#[derive(Debug, Clone)]
pub struct RpcEventSource {
    client: reqwest::Client,
    rpc_url: String,
}

impl RpcEventSource {
    /// Creates a new source querying the node at `rpc_url`.
    pub fn new(rpc_url: impl Into<String>, request_timeout: Duration) -> IndexerResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()?;

        Ok(Self {
            client,
            rpc_url: rpc_url.into(),
        })
    }

    fn is_invalid_cursor_message(message: &str) -> bool {
        let message = message.to_lowercase();
        INVALID_CURSOR_FRAGMENTS
            .iter()
            .any(|fragment| message.contains(fragment))
    }
}

impl EventSource for RpcEventSource {
    async fn fetch_events(
        &self,
        event_type: EventType,
        after: Option<&EventPosition>,
        page_size: u16,
    ) -> IndexerResult<EventPage> {
        let request = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": QUERY_EVENTS_METHOD,
            "params": {
                "event_type": event_type.as_str(),
                "cursor": after.map(RpcCursor::from),
                "limit": page_size,
                "descending": false,
            }
        });

        let response: RpcResponse = self
            .client
            .post(&self.rpc_url)
            .json(&request)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        if let Some(error) = response.error {
            if Self::is_invalid_cursor_message(&error.message) {
                return Err(indexer_error!(
                    ErrorKind::InvalidCheckpoint,
                    "Stored checkpoint is no longer valid against the source log",
                    format!("code={} message={}", error.code, error.message)
                ));
            }

            return Err(indexer_error!(
                ErrorKind::SourceQueryFailed,
                "Event source returned an error",
                format!("code={} message={}", error.code, error.message)
            ));
        }

        let Some(result) = response.result else {
            return Err(indexer_error!(
                ErrorKind::SourceResponseInvalid,
                "Event source response carried neither result nor error"
            ));
        };

        debug!(
            event_type = %event_type,
            events = result.events.len(),
            has_more = result.has_more,
            "fetched events page"
        );

        let events = result
            .events
            .into_iter()
            .map(|event| SourceEvent {
                position: EventPosition::new(event.sequence, event.tx_digest),
                payload: event.payload,
            })
            .collect();

        Ok(EventPage {
            events,
            next_cursor: result.next_cursor.map(Into::into),
            has_more: result.has_more,
        })
    }
}
