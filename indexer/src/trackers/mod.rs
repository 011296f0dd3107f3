//! Per-event-type polling loops.
//!
//! The pipeline runs one [`tracker::EventTracker`] per event type. Each
//! tracker polls its own slice of the ledger's event log, materializes the
//! events through the handlers, and persists its own checkpoint. Trackers are
//! fully independent; a slow or failing event type never stalls the others.

pub mod base;
pub mod pool;
pub mod tracker;

pub use base::TrackerHandle;
pub use pool::TrackerPool;
pub use tracker::{EventTracker, TrackerSettings};
