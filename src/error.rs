//! Error taxonomy
//!
//! Every failure the server can report falls into one of four buckets. Request-time
//! failures are turned into HTTP statuses at the router boundary; startup failures
//! are reported to the user before any listener is bound.

use hyper::StatusCode;
use std::fmt;
use std::io;

/// Errors surfaced by startup validation and request handling
#[derive(Debug)]
pub enum ServeError {
    /// Bad command-line flags or configuration values
    InvalidArgument(String),
    /// Missing path, or a path that escapes the root directory
    NotFound,
    /// Permission denied or another refusal from the filesystem
    Forbidden,
    /// Unexpected I/O failure while enumerating or streaming
    Server(io::Error),
}

impl ServeError {
    /// Classify a filesystem error.
    ///
    /// "Not found" and "not a directory" both mean the requested path does not
    /// exist; permission problems are `Forbidden`; everything else is a server error.
    pub fn from_io(err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::NotFound | io::ErrorKind::NotADirectory => Self::NotFound,
            io::ErrorKind::PermissionDenied => Self::Forbidden,
            _ => Self::Server(err),
        }
    }

    /// HTTP status reported for this error
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::InvalidArgument(_) => StatusCode::BAD_REQUEST,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::Server(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl fmt::Display for ServeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidArgument(msg) => write!(f, "invalid argument: {msg}"),
            Self::NotFound => write!(f, "not found"),
            Self::Forbidden => write!(f, "forbidden"),
            Self::Server(err) => write!(f, "I/O error: {err}"),
        }
    }
}

impl std::error::Error for ServeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Server(err) => Some(err),
            _ => None,
        }
    }
}

impl From<config::ConfigError> for ServeError {
    fn from(err: config::ConfigError) -> Self {
        Self::InvalidArgument(err.to_string())
    }
}
