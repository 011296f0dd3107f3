use serde::Deserialize;

use crate::shared::{PgConnectionConfig, ValidationError};

const fn default_request_timeout_ms() -> u64 {
    30_000
}

const fn default_poll_interval_ms() -> u64 {
    5_000
}

const fn default_page_size() -> u16 {
    100
}

const fn default_max_retries() -> u32 {
    5
}

const fn default_initial_delay_ms() -> u64 {
    1_000
}

const fn default_max_delay_ms() -> u64 {
    10_000
}

/// Connection settings for the ledger node the events are fetched from.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct SourceConfig {
    /// Url of the ledger node's JSON-RPC endpoint.
    pub rpc_url: String,
    /// Timeout applied to every RPC request, in milliseconds.
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

/// Settings for the per-event-type polling loops.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct PollingConfig {
    /// Number of milliseconds a tracker waits between ticks when the source
    /// reports no more pages.
    #[serde(default = "default_poll_interval_ms")]
    pub interval_ms: u64,
    /// Maximum number of events fetched per page.
    #[serde(default = "default_page_size")]
    pub page_size: u16,
}

/// Settings for the bounded dependency-retry mechanism.
///
/// With the defaults (5 retries, 1 s initial delay, 10 s cap) a single event
/// waits at most roughly 25 s for its dependencies before being skipped.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct RetryConfig {
    /// Maximum number of retry attempts after the initial one.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Delay before the first retry, in milliseconds. Doubled on every
    /// subsequent attempt.
    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,
    /// Upper bound on the backoff delay, in milliseconds.
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            initial_delay_ms: default_initial_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
        }
    }
}

/// Configuration for the indexer pipeline.
///
/// Contains all settings required to poll the ledger's event log and
/// materialize it into the relational store.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct IndexerConfig {
    /// Connection settings for the ledger node.
    pub source: SourceConfig,
    /// Connection settings for the Postgres database holding the
    /// materialized view.
    pub store: PgConnectionConfig,
    /// Polling loop settings shared by all event trackers.
    #[serde(default)]
    pub polling: PollingConfig,
    /// Dependency-retry settings shared by all event handlers.
    #[serde(default)]
    pub retry: RetryConfig,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_poll_interval_ms(),
            page_size: default_page_size(),
        }
    }
}

impl IndexerConfig {
    /// Validates indexer configuration settings.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.source.rpc_url.is_empty() {
            return Err(ValidationError::EmptyRpcUrl);
        }

        if self.polling.page_size == 0 {
            return Err(ValidationError::PageSizeZero);
        }

        if self.polling.interval_ms == 0 {
            return Err(ValidationError::PollIntervalZero);
        }

        if self.retry.max_delay_ms < self.retry.initial_delay_ms {
            return Err(ValidationError::RetryDelayCapTooSmall);
        }

        Ok(())
    }
}
