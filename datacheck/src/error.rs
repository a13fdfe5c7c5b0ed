//! Error types and result definitions for consistency-check operations.
//!
//! Provides a kind-classified error system with captured callsite metadata for
//! check runs. [`CheckError`] represents either a single failure or multiple
//! aggregated failures (e.g. several check workers failing in parallel).

use std::backtrace::Backtrace;
use std::borrow::Cow;
use std::error;
use std::fmt;
use std::io;
use std::panic::Location;
use std::sync::Arc;

/// Convenient result type for check operations using [`CheckError`] as the error type.
pub type CheckResult<T> = Result<T, CheckError>;

/// Detailed payload stored for single [`CheckError`] instances.
#[derive(Debug, Clone)]
struct ErrorPayload {
    kind: ErrorKind,
    description: Cow<'static, str>,
    detail: Option<Cow<'static, str>>,
    source: Option<Arc<dyn error::Error + Send + Sync>>,
    location: &'static Location<'static>,
    backtrace: Arc<Backtrace>,
}

/// Main error type for consistency-check operations.
///
/// [`CheckError`] carries an [`ErrorKind`] for classification at the
/// orchestration boundary, a static description, optional dynamic detail, an
/// optional source error, and the callsite where it was created.
#[derive(Debug, Clone)]
pub struct CheckError {
    repr: ErrorRepr,
}

/// Internal representation of error data.
#[derive(Debug, Clone)]
enum ErrorRepr {
    /// Single error payload holding rich metadata.
    Single(ErrorPayload),
    /// Multiple aggregated errors.
    ///
    /// This variant is mainly useful to capture multiple check worker failures.
    Many {
        errors: Vec<CheckError>,
        location: &'static Location<'static>,
    },
}

/// Specific categories of errors that can occur during a check run.
///
/// The orchestration layer uses these kinds to decide whether a failure is
/// fatal for the current table, recoverable at the next scheduled run, or an
/// infrastructure problem.
#[derive(PartialEq, Eq, Copy, Clone, Debug, Hash)]
#[non_exhaustive]
pub enum ErrorKind {
    // Endpoint dispatch errors; these are recoverable at the next scheduled run.
    SourceDispatchFailed,
    SinkDispatchFailed,

    // Fatal-for-this-table comparison errors.
    MerkleDepthMismatch,
    LargeDataDiff,
    TableStructureMismatch,
    TableMissing,

    // Data preparation errors.
    InvalidRow,
    ExtractionIncomplete,

    // Configuration & IO errors.
    ConfigError,
    IoError,
    SerializationError,

    // State & workflow errors.
    InvalidState,
    CheckWorkerPanic,

    // Unknown / uncategorized.
    Unknown,
}

impl CheckError {
    /// Returns the [`ErrorKind`] of this error.
    ///
    /// For aggregated errors, returns the kind of the first error or
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
    ///
    /// For single errors, returns a vector with one element. For aggregated
    /// errors, returns a flattened vector of all contained kinds.
    pub fn kinds(&self) -> Vec<ErrorKind> {
        match self.repr {
            ErrorRepr::Single(ref payload) => vec![payload.kind],
            ErrorRepr::Many { ref errors, .. } => {
                errors.iter().flat_map(|err| err.kinds()).collect()
            }
        }
    }

    /// Returns the detailed error information if available.
    ///
    /// For aggregated errors, returns the detail of the first error that has one.
    pub fn detail(&self) -> Option<&str> {
        match self.repr {
            ErrorRepr::Single(ref payload) => payload.detail.as_deref(),
            ErrorRepr::Many { ref errors, .. } => errors.iter().find_map(|e| e.detail()),
        }
    }

    /// Returns the captured backtrace for this error.
    pub fn backtrace(&self) -> Option<&Backtrace> {
        match self.repr {
            ErrorRepr::Single(ref payload) => Some(payload.backtrace.as_ref()),
            ErrorRepr::Many { .. } => None,
        }
    }

    /// Returns the captured callsite location for this error.
    pub fn location(&self) -> &'static Location<'static> {
        match self.repr {
            ErrorRepr::Single(ref payload) => payload.location,
            ErrorRepr::Many { location, .. } => location,
        }
    }

    /// Attaches an originating [`error::Error`] to this error and returns the
    /// modified instance.
    ///
    /// The stored source is preserved across clones and exposed via
    /// [`error::Error::source`]. Has no effect on aggregated errors because
    /// aggregates forward the first contained error as their source.
    pub fn with_source<E>(mut self, source: E) -> Self
    where
        E: error::Error + Send + Sync + 'static,
    {
        if let ErrorRepr::Single(ref mut payload) = self.repr {
            payload.source = Some(Arc::new(source));
        }
        self
    }

    /// Creates a [`CheckError`] from its components.
    #[track_caller]
    fn from_components(
        kind: ErrorKind,
        description: Cow<'static, str>,
        detail: Option<Cow<'static, str>>,
    ) -> Self {
        CheckError {
            repr: ErrorRepr::Single(ErrorPayload {
                kind,
                description,
                detail,
                source: None,
                location: Location::caller(),
                backtrace: Arc::new(Backtrace::capture()),
            }),
        }
    }
}

impl From<(ErrorKind, &'static str)> for CheckError {
    #[track_caller]
    fn from((kind, description): (ErrorKind, &'static str)) -> Self {
        CheckError::from_components(kind, Cow::Borrowed(description), None)
    }
}

impl From<(ErrorKind, String)> for CheckError {
    #[track_caller]
    fn from((kind, description): (ErrorKind, String)) -> Self {
        CheckError::from_components(kind, Cow::Owned(description), None)
    }
}

impl From<(ErrorKind, &'static str, String)> for CheckError {
    #[track_caller]
    fn from((kind, description, detail): (ErrorKind, &'static str, String)) -> Self {
        CheckError::from_components(kind, Cow::Borrowed(description), Some(Cow::Owned(detail)))
    }
}

impl From<Vec<CheckError>> for CheckError {
    #[track_caller]
    fn from(errors: Vec<CheckError>) -> Self {
        CheckError {
            repr: ErrorRepr::Many {
                errors,
                location: Location::caller(),
            },
        }
    }
}

impl From<io::Error> for CheckError {
    #[track_caller]
    fn from(err: io::Error) -> Self {
        CheckError::from_components(
            ErrorKind::IoError,
            Cow::Borrowed("An IO error occurred"),
            Some(Cow::Owned(err.to_string())),
        )
        .with_source(err)
    }
}

impl From<serde_json::Error> for CheckError {
    #[track_caller]
    fn from(err: serde_json::Error) -> Self {
        CheckError::from_components(
            ErrorKind::SerializationError,
            Cow::Borrowed("A serialization error occurred"),
            Some(Cow::Owned(err.to_string())),
        )
        .with_source(err)
    }
}

impl PartialEq for CheckError {
    /// Compares errors by their stable identifying components (kinds), not by
    /// callsite or dynamic detail.
    fn eq(&self, other: &CheckError) -> bool {
        match (&self.repr, &other.repr) {
            (ErrorRepr::Single(a), ErrorRepr::Single(b)) => a.kind == b.kind,
            (ErrorRepr::Many { errors: a, .. }, ErrorRepr::Many { errors: b, .. }) => {
                a.len() == b.len() && a.iter().zip(b.iter()).all(|(a, b)| a == b)
            }
            _ => false,
        }
    }
}

impl fmt::Display for CheckError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> Result<(), fmt::Error> {
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
                    write!(f, "\n  -> {detail}")?;
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

impl error::Error for CheckError {
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
