//! Macros for indexer error handling.
//!
//! Provides convenience macros for creating and returning
//! [`crate::error::IndexerError`] instances with reduced boilerplate.

/// Creates an [`crate::error::IndexerError`] from error kind and description.
///
/// Supports an optional dynamic detail expression and an optional source error
/// (use `source:` to attach the originating error).
#[macro_export]
macro_rules! indexer_error {
    ($kind:expr, $desc:expr) => {
        $crate::error::IndexerError::from(($kind, $desc))
    };
    ($kind:expr, $desc:expr, source: $source:expr) => {
        $crate::error::IndexerError::from(($kind, $desc)).with_source($source)
    };
    ($kind:expr, $desc:expr, $detail:expr) => {
        $crate::error::IndexerError::from(($kind, $desc, $detail.to_string()))
    };
    ($kind:expr, $desc:expr, $detail:expr, source: $source:expr) => {
        $crate::error::IndexerError::from(($kind, $desc, $detail.to_string())).with_source($source)
    };
}

/// Creates and returns an [`crate::error::IndexerError`] from the current function.
///
/// Combines error creation with early return. Supports the same optional
/// detail and source arguments as [`indexer_error!`].
#[macro_export]
macro_rules! bail {
    ($kind:expr, $desc:expr) => {
        return ::core::result::Result::Err($crate::indexer_error!($kind, $desc))
    };
    ($kind:expr, $desc:expr, source: $source:expr) => {
        return ::core::result::Result::Err($crate::indexer_error!($kind, $desc, source: $source))
    };
    ($kind:expr, $desc:expr, $detail:expr) => {
        return ::core::result::Result::Err($crate::indexer_error!($kind, $desc, $detail))
    };
    ($kind:expr, $desc:expr, $detail:expr, source: $source:expr) => {
        return ::core::result::Result::Err($crate::indexer_error!(
            $kind,
            $desc,
            $detail,
            source: $source
        ))
    };
}
