//! Concurrency utilities for coordinating the ingestion pipeline.
//!
//! The pipeline runs one independent tracker loop per event type. The
//! utilities in this module keep those loops coordinated: a broadcast-based
//! shutdown signal that terminates all trackers at safe points, and the
//! bounded retry executor used by handlers waiting for rows produced by
//! other event types.

pub mod retry;
pub mod shutdown;
