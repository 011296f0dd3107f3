//! Ingestion pipeline materializing a creator-subscription platform's ledger
//! events into a relational view.
//!
//! The ledger exposes one append-only event log per event type. The pipeline
//! runs one polling tracker per type, each with its own persisted checkpoint,
//! and applies every event through an idempotent handler. Events can arrive
//! before the rows they reference exist, since logs advance independently;
//! those writes are retried with a bounded exponential backoff and skipped
//! once the budget is exhausted, without ever stalling the log.

pub mod concurrency;
pub mod error;
pub mod handlers;
pub mod macros;
pub mod pipeline;
pub mod source;
pub mod store;
pub mod trackers;
pub mod types;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
