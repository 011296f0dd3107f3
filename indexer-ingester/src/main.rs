//! Ledger indexer service binary.
//!
//! Loads configuration, initializes tracing, and runs the ingestion pipeline
//! with graceful shutdown on SIGINT and SIGTERM.

use indexer_config::load::load_config;
use indexer_config::shared::IndexerConfig;
use indexer_telemetry::init_tracing;

mod core;

fn main() -> anyhow::Result<()> {
    let config: IndexerConfig = load_config()?;
    config.validate()?;

    init_tracing(env!("CARGO_BIN_NAME"))?;

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(core::start_ingester_with_config(config))
}
