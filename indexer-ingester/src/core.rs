use std::time::Duration;

use indexer::pipeline::IndexerPipeline;
use indexer::source::RpcEventSource;
use indexer::store::PostgresStore;
use indexer::trackers::TrackerSettings;
use indexer_config::shared::IndexerConfig;
use tokio::signal::unix::{SignalKind, signal};
use tracing::{debug, info, warn};

/// Builds the source and store from the configuration and runs the pipeline
/// until completion or shutdown.
pub async fn start_ingester_with_config(config: IndexerConfig) -> anyhow::Result<()> {
    log_config(&config);

    let source = RpcEventSource::new(
        config.source.rpc_url.clone(),
        Duration::from_millis(config.source.request_timeout_ms),
    )?;
    let store = PostgresStore::connect(&config.store).await?;

    let settings = TrackerSettings::from(&config);
    let pipeline = IndexerPipeline::new(source, store, settings);

    start_pipeline(pipeline).await
}

fn log_config(config: &IndexerConfig) {
    debug!(
        rpc_url = config.source.rpc_url,
        host = config.store.host,
        port = config.store.port,
        dbname = config.store.name,
        poll_interval_ms = config.polling.interval_ms,
        page_size = config.polling.page_size,
        max_retries = config.retry.max_retries,
        "indexer config"
    );
}

/// Starts a pipeline and handles graceful shutdown signals.
///
/// Sets up handlers for SIGINT and SIGTERM; on either signal the trackers
/// finish their current event and persist their checkpoints before stopping.
async fn start_pipeline<Src, St>(mut pipeline: IndexerPipeline<Src, St>) -> anyhow::Result<()>
where
    Src: indexer::source::EventSource + Clone + Send + Sync + 'static,
    St: indexer::store::CheckpointStore
        + indexer::store::MaterializeStore
        + Clone
        + Send
        + Sync
        + 'static,
{
    pipeline.start()?;

    // Listen for shutdown signals in a separate task; SIGTERM is what an
    // orchestrator sends before SIGKILL during pod termination.
    let shutdown_tx = pipeline.shutdown_tx();
    let shutdown_handle = tokio::spawn(async move {
        let mut sigterm =
            signal(SignalKind::terminate()).expect("failed to register SIGTERM handler");

        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("sigint (ctrl+c) received, shutting down pipeline");
            }
            _ = sigterm.recv() => {
                info!("sigterm received, shutting down pipeline");
            }
        }

        if let Err(e) = shutdown_tx.shutdown() {
            warn!(error = ?e, "failed to send shutdown signal");
        }
    });

    let result = pipeline.wait().await;

    // The signal task may still be waiting if the pipeline stopped on its own.
    shutdown_handle.abort();
    let _ = shutdown_handle.await;

    result?;

    Ok(())
}
