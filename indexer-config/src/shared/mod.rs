//! Shared configuration types for the indexer pipeline.

mod base;
mod connection;
mod indexer;

pub use base::ValidationError;
pub use connection::PgConnectionConfig;
pub use indexer::{IndexerConfig, PollingConfig, RetryConfig, SourceConfig};
