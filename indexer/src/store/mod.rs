//! Storage abstractions for checkpoints and the materialized view.
//!
//! Two traits split the concerns: [`base::CheckpointStore`] persists each
//! tracker's resume position, [`base::MaterializeStore`] holds the relational
//! tables handlers write into. [`memory::MemoryStore`] implements both in
//! memory for tests; [`postgres::PostgresStore`] is the production store.

pub mod base;
pub mod memory;
pub mod postgres;

pub use base::{CheckpointStore, MaterializeStore};
pub use memory::MemoryStore;
pub use postgres::PostgresStore;
