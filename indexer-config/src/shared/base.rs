use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// The event source RPC url cannot be empty.
    #[error("`source.rpc_url` cannot be empty")]
    EmptyRpcUrl,
    /// The fetch page size cannot be zero.
    #[error("`polling.page_size` cannot be zero")]
    PageSizeZero,
    /// The poll interval cannot be zero.
    #[error("`polling.interval_ms` cannot be zero")]
    PollIntervalZero,
    /// The retry delay cap must be at least the initial delay.
    #[error("`retry.max_delay_ms` cannot be smaller than `retry.initial_delay_ms`")]
    RetryDelayCapTooSmall,
}
