//! Error types and result definitions for indexer operations.
//!
//! Provides an error system with classification and captured callsite metadata
//! for the ingestion pipeline. The [`IndexerError`] type supports single errors,
//! errors with additional detail, and multiple aggregated errors for reporting
//! the failure of several trackers at once.

use std::borrow::Cow;
use std::error;
use std::fmt;
use std::panic::Location;
use std::sync::Arc;

/// Convenient result type for indexer operations using [`IndexerError`] as the error type.
pub type IndexerResult<T> = Result<T, IndexerError>;

/// Detailed payload stored for single [`IndexerError`] instances.
#[derive(Debug, Clone)]
struct ErrorPayload {
    kind: ErrorKind,
    description: Cow<'static, str>,
    detail: Option<Cow<'static, str>>,
    source: Option<Arc<dyn error::Error + Send + Sync>>,
    location: &'static Location<'static>,
}

/// Main error type for indexer operations.
#[derive(Debug, Clone)]
pub struct IndexerError {
    repr: ErrorRepr,
}

/// Internal representation of error data.
#[derive(Debug, Clone)]
enum ErrorRepr {
    /// Single error payload holding rich metadata.
    Single(ErrorPayload),
    /// Multiple aggregated errors, mainly used to capture multiple tracker failures.
    Many {
        errors: Vec<IndexerError>,
        location: &'static Location<'static>,
    },
}

/// Specific categories of errors that can occur during event ingestion.
///
/// The classification drives the retry behavior of the pipeline: only
/// [`ErrorKind::DependencyNotFound`] is retryable at the handler level, and
/// only [`ErrorKind::InvalidCheckpoint`] resets a tracker's cursor.
#[derive(PartialEq, Eq, Copy, Clone, Debug, Hash)]
#[non_exhaustive]
pub enum ErrorKind {
    /// A row produced by a logically-prior event type is not materialized yet.
    ///
    /// This is the only condition the retry executor treats as retryable.
    DependencyNotFound,
    /// The stored checkpoint is no longer valid against the source log.
    InvalidCheckpoint,

    // Event source errors
    SourceQueryFailed,
    SourceResponseInvalid,

    // Store errors
    StoreQueryFailed,
    StoreConnectionFailed,
    ValidationError,

    // Data & transformation errors
    DeserializationError,
    SerializationError,
    ConversionError,
    InvalidData,

    // Configuration errors
    ConfigError,

    // Worker errors
    TrackerPanic,

    // Unknown / uncategorized
    Unknown,
}

impl IndexerError {
    /// Returns the [`ErrorKind`] of this error.
    ///
    /// For multiple errors, returns the kind of the first error or
    /// [`ErrorKind::Unknown`] if the error list is empty.
    pub fn kind(&self) -> ErrorKind {
        match self.repr {
            ErrorRepr::Single(ref payload) => payload.kind,
            ErrorRepr::Many { ref errors, .. } => errors
                .first()
                .map(|err| err.kind())
                .unwrap_or(ErrorKind::Unknown),
        }
    }

    /// Returns all [`ErrorKind`]s present in this error.
    pub fn kinds(&self) -> Vec<ErrorKind> {
        match self.repr {
            ErrorRepr::Single(ref payload) => vec![payload.kind],
            ErrorRepr::Many { ref errors, .. } => {
                errors.iter().flat_map(|err| err.kinds()).collect()
            }
        }
    }

    /// Returns the detailed error information if available.
    pub fn detail(&self) -> Option<&str> {
        match self.repr {
            ErrorRepr::Single(ref payload) => payload.detail.as_deref(),
            ErrorRepr::Many { ref errors, .. } => errors.iter().find_map(|e| e.detail()),
        }
    }

    /// Returns the captured callsite location for this error.
    pub fn location(&self) -> &'static Location<'static> {
        match self.repr {
            ErrorRepr::Single(ref payload) => payload.location,
            ErrorRepr::Many { location, .. } => location,
        }
    }

    /// Attaches an originating [`error::Error`] to this error and returns the modified instance.
    ///
    /// Has no effect when called on aggregated errors because aggregates forward
    /// the first contained error as their source.
    pub fn with_source<E>(mut self, source: E) -> Self
    where
        E: error::Error + Send + Sync + 'static,
    {
        if let ErrorRepr::Single(ref mut payload) = self.repr {
            payload.source = Some(Arc::new(source));
        }
        self
    }

    /// Creates an [`IndexerError`] from its components.
    #[track_caller]
    fn from_components(
        kind: ErrorKind,
        description: Cow<'static, str>,
        detail: Option<Cow<'static, str>>,
        source: Option<Arc<dyn error::Error + Send + Sync>>,
    ) -> Self {
        IndexerError {
            repr: ErrorRepr::Single(ErrorPayload {
                kind,
                description,
                detail,
                source,
                location: Location::caller(),
            }),
        }
    }
}

impl PartialEq for IndexerError {
    fn eq(&self, other: &IndexerError) -> bool {
        match (&self.repr, &other.repr) {
            (ErrorRepr::Single(a), ErrorRepr::Single(b)) => a.kind == b.kind,
            (
                ErrorRepr::Many {
                    errors: errors_a, ..
                },
                ErrorRepr::Many {
                    errors: errors_b, ..
                },
            ) => {
                errors_a.len() == errors_b.len()
                    && errors_a.iter().zip(errors_b.iter()).all(|(a, b)| a == b)
            }
            _ => false,
        }
    }
}

impl fmt::Display for IndexerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.repr {
            ErrorRepr::Single(payload) => {
                let location = payload.location;
                write!(
                    f,
                    "[{:?}] {} @ {}:{}:{}",
                    payload.kind,
                    payload.description,
                    location.file(),
                    location.line(),
                    location.column()
                )?;

                if let Some(detail) = payload.detail.as_deref() {
                    write!(f, "\n  Detail: {detail}")?;
                }

                Ok(())
            }
            ErrorRepr::Many { errors, location } => {
                let count = errors.len();
                write!(
                    f,
                    "[Many] {} error{} aggregated @ {}:{}:{}",
                    count,
                    if count == 1 { "" } else { "s" },
                    location.file(),
                    location.line(),
                    location.column()
                )?;

                for (index, error) in errors.iter().enumerate() {
                    let rendered = format!("{error}");
                    for (line_index, line) in rendered.lines().enumerate() {
                        if line_index == 0 {
                            write!(f, "\n  {}. {}", index + 1, line)?;
                        } else {
                            write!(f, "\n     {line}")?;
                        }
                    }
                }

                Ok(())
            }
        }
    }
}

impl error::Error for IndexerError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match &self.repr {
            ErrorRepr::Single(payload) => payload
                .source
                .as_ref()
                .map(|source| source as &(dyn error::Error + 'static)),
            // For aggregated errors, we forward the first contained error as the source.
            ErrorRepr::Many { errors, .. } => errors
                .first()
                .map(|error| error as &(dyn error::Error + 'static)),
        }
    }
}

/// Creates an [`IndexerError`] from an error kind and static description.
impl From<(ErrorKind, &'static str)> for IndexerError {
    #[track_caller]
    fn from((kind, desc): (ErrorKind, &'static str)) -> IndexerError {
        IndexerError::from_components(kind, Cow::Borrowed(desc), None, None)
    }
}

/// Creates an [`IndexerError`] from an error kind, static description, and dynamic detail.
impl<D> From<(ErrorKind, &'static str, D)> for IndexerError
where
    D: Into<Cow<'static, str>>,
{
    #[track_caller]
    fn from((kind, desc, detail): (ErrorKind, &'static str, D)) -> IndexerError {
        IndexerError::from_components(kind, Cow::Borrowed(desc), Some(detail.into()), None)
    }
}

/// Creates an [`IndexerError`] from a vector of errors for aggregation.
///
/// If the vector contains exactly one error, returns that error directly
/// without wrapping it.
impl<E> From<Vec<E>> for IndexerError
where
    E: Into<IndexerError>,
{
    #[track_caller]
    fn from(errors: Vec<E>) -> IndexerError {
        let location = Location::caller();

        let mut errors: Vec<IndexerError> = errors.into_iter().map(Into::into).collect();

        if errors.len() == 1 {
            return errors.pop().expect("just checked length is 1");
        }

        IndexerError {
            repr: ErrorRepr::Many { errors, location },
        }
    }
}

/// Converts [`std::io::Error`] to [`IndexerError`] with [`ErrorKind::Unknown`].
impl From<std::io::Error> for IndexerError {
    #[track_caller]
    fn from(err: std::io::Error) -> IndexerError {
        let detail = err.to_string();
        IndexerError::from_components(
            ErrorKind::Unknown,
            Cow::Borrowed("I/O operation failed"),
            Some(Cow::Owned(detail)),
            Some(Arc::new(err)),
        )
    }
}

/// Converts [`serde_json::Error`] to [`IndexerError`] with the appropriate error kind.
impl From<serde_json::Error> for IndexerError {
    #[track_caller]
    fn from(err: serde_json::Error) -> IndexerError {
        let (kind, description) = match err.classify() {
            serde_json::error::Category::Io => (ErrorKind::Unknown, "JSON I/O operation failed"),
            _ => (
                ErrorKind::DeserializationError,
                "JSON deserialization failed",
            ),
        };

        let detail = err.to_string();
        IndexerError::from_components(
            kind,
            Cow::Borrowed(description),
            Some(Cow::Owned(detail)),
            Some(Arc::new(err)),
        )
    }
}

/// Converts [`reqwest::Error`] to [`IndexerError`] with [`ErrorKind::SourceQueryFailed`].
impl From<reqwest::Error> for IndexerError {
    #[track_caller]
    fn from(err: reqwest::Error) -> IndexerError {
        let detail = err.to_string();
        IndexerError::from_components(
            ErrorKind::SourceQueryFailed,
            Cow::Borrowed("Event source request failed"),
            Some(Cow::Owned(detail)),
            Some(Arc::new(err)),
        )
    }
}

/// Converts [`sqlx::Error`] to [`IndexerError`] with the appropriate error kind.
///
/// Constraint violations map to [`ErrorKind::ValidationError`], connection pool
/// failures to [`ErrorKind::StoreConnectionFailed`], and everything else to
/// [`ErrorKind::StoreQueryFailed`].
impl From<sqlx::Error> for IndexerError {
    #[track_caller]
    fn from(err: sqlx::Error) -> IndexerError {
        let kind = match &err {
            sqlx::Error::Database(db_err) => {
                if db_err.constraint().is_some() {
                    ErrorKind::ValidationError
                } else {
                    ErrorKind::StoreQueryFailed
                }
            }
            sqlx::Error::PoolClosed | sqlx::Error::PoolTimedOut | sqlx::Error::Io(_) => {
                ErrorKind::StoreConnectionFailed
            }
            _ => ErrorKind::StoreQueryFailed,
        };

        let detail = err.to_string();
        IndexerError::from_components(
            kind,
            Cow::Borrowed("Store operation failed"),
            Some(Cow::Owned(detail)),
            Some(Arc::new(err)),
        )
    }
}

/// Converts [`bigdecimal::ParseBigDecimalError`] to [`IndexerError`] with [`ErrorKind::ConversionError`].
impl From<bigdecimal::ParseBigDecimalError> for IndexerError {
    #[track_caller]
    fn from(err: bigdecimal::ParseBigDecimalError) -> IndexerError {
        let detail = err.to_string();
        IndexerError::from_components(
            ErrorKind::ConversionError,
            Cow::Borrowed("Numeric parsing failed"),
            Some(Cow::Owned(detail)),
            Some(Arc::new(err)),
        )
    }
}

/// Converts [`std::num::ParseIntError`] to [`IndexerError`] with [`ErrorKind::ConversionError`].
impl From<std::num::ParseIntError> for IndexerError {
    #[track_caller]
    fn from(err: std::num::ParseIntError) -> IndexerError {
        let detail = err.to_string();
        IndexerError::from_components(
            ErrorKind::ConversionError,
            Cow::Borrowed("Integer parsing failed"),
            Some(Cow::Owned(detail)),
            Some(Arc::new(err)),
        )
    }
}
