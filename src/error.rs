//! Unified error type for resolution, matching, fetching and tagging.
//!
//! An [`Error`] pairs a coarse failure category with the concrete cause,
//! so retry loops and task records can act on the category while logs
//! keep the detail. Categories follow the gRPC status codes.

use std::fmt;
use thiserror::Error;

/// Failure category plus underlying cause.
#[derive(Debug)]
pub struct Error {
    /// Coarse classification, used for retry and reporting decisions.
    pub kind: ErrorKind,

    /// The concrete cause.
    pub error: Box<dyn std::error::Error + Send + Sync>,
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Failure categories, after the gRPC status codes.
#[expect(clippy::module_name_repetitions)]
#[derive(Clone, Copy, Debug, Eq, Error, Hash, Ord, PartialEq, PartialOrd)]
pub enum ErrorKind {
    /// The operation was abandoned before it could finish.
    #[error("operation was cancelled")]
    Cancelled,

    /// Nothing more specific is known.
    #[error("unknown error")]
    Unknown,

    /// Malformed input or an unparsable document.
    #[error("invalid argument specified")]
    InvalidArgument,

    /// The operation ran out of time.
    #[error("operation timed out")]
    DeadlineExceeded,

    /// The requested resource does not exist.
    #[error("not found")]
    NotFound,

    /// The remote side is rate limiting us.
    #[error("resource has been exhausted")]
    ResourceExhausted,

    /// The request was understood but refused in the current state.
    #[error("invalid state")]
    FailedPrecondition,

    /// A bug on our side.
    #[error("internal error")]
    Internal,

    /// The remote service cannot be reached or is erroring out.
    #[error("service unavailable")]
    Unavailable,

    /// Data went missing or arrived corrupted.
    #[error("unrecoverable data loss or corruption")]
    DataLoss,
}

macro_rules! error_constructor {
    ($name:ident, $kind:ident) => {
        #[doc = concat!("Creates a new [`ErrorKind::", stringify!($kind), "`] error.")]
        pub fn $name<E>(error: E) -> Self
        where
            E: Into<Box<dyn std::error::Error + Send + Sync>>,
        {
            Self {
                kind: ErrorKind::$kind,
                error: error.into(),
            }
        }
    };
}

impl Error {
    /// Creates an error with an explicit kind.
    pub fn new<E>(kind: ErrorKind, error: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Self {
            kind,
            error: error.into(),
        }
    }

    /// Whether a retry might succeed.
    ///
    /// Connection trouble, timeouts and rate limiting are transient;
    /// malformed documents and client mistakes are not.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(
            self.kind,
            ErrorKind::Unavailable | ErrorKind::DeadlineExceeded | ErrorKind::ResourceExhausted
        )
    }

    error_constructor!(cancelled, Cancelled);
    error_constructor!(unknown, Unknown);
    error_constructor!(invalid_argument, InvalidArgument);
    error_constructor!(deadline_exceeded, DeadlineExceeded);
    error_constructor!(not_found, NotFound);
    error_constructor!(resource_exhausted, ResourceExhausted);
    error_constructor!(failed_precondition, FailedPrecondition);
    error_constructor!(internal, Internal);
    error_constructor!(unavailable, Unavailable);
    error_constructor!(data_loss, DataLoss);
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.error.source()
    }
}

/// Formats as `"{kind}: {cause}"`.
impl fmt::Display for Error {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(fmt, "{}: ", self.kind)?;
        self.error.fmt(fmt)
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        use std::io::ErrorKind::{
            BrokenPipe, ConnectionAborted, ConnectionRefused, ConnectionReset, Interrupted,
            InvalidData, InvalidInput, NotConnected, NotFound, TimedOut, UnexpectedEof, WouldBlock,
        };
        match err.kind() {
            NotFound => Self::not_found(err),
            ConnectionRefused | NotConnected => Self::unavailable(err),
            BrokenPipe | ConnectionReset | ConnectionAborted | UnexpectedEof => {
                Self::data_loss(err)
            }
            Interrupted | WouldBlock => Self::cancelled(err),
            TimedOut => Self::deadline_exceeded(err),
            InvalidInput | InvalidData => Self::invalid_argument(err),
            _ => Self::unknown(err),
        }
    }
}

/// Categorizes HTTP client errors by their nature: truncated bodies are
/// data loss, undecodable responses invalid arguments, connect failures
/// unavailability, and so on.
impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        if err.is_body() {
            return Self::data_loss(err);
        }

        if err.is_decode() {
            return Self::invalid_argument(err);
        }

        if err.is_builder() {
            return Self::internal(err);
        }

        if err.is_connect() || err.is_redirect() {
            return Self::unavailable(err);
        }

        if err.is_status() {
            return Self::failed_precondition(err);
        }

        if err.is_timeout() {
            return Self::deadline_exceeded(err);
        }

        Self::unknown(err)
    }
}

/// JSON errors reuse the I/O categorization.
impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        std::io::Error::from(err).into()
    }
}

/// URLs are assembled from constants and validated IDs, so a parse
/// failure is a bug here, not bad input.
impl From<url::ParseError> for Error {
    fn from(e: url::ParseError) -> Self {
        Self::internal(e.to_string())
    }
}

impl From<reqwest::header::InvalidHeaderValue> for Error {
    fn from(e: reqwest::header::InvalidHeaderValue) -> Self {
        Self::internal(e.to_string())
    }
}
