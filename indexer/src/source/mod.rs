//! Event source abstractions for the ingestion pipeline.
//!
//! The pipeline reads the ledger's append-only event log through the
//! [`base::EventSource`] trait. [`rpc::RpcEventSource`] queries a ledger
//! node over JSON-RPC, while [`memory::MemoryEventSource`] backs tests.

pub mod base;
pub mod memory;
pub mod rpc;

pub use base::{EventPage, EventSource, SourceEvent};
pub use memory::MemoryEventSource;
pub use rpc::RpcEventSource;
