//! Error types for rrdbind.

use thiserror::Error;

/// The main error type for all rrdbind operations.
#[derive(Error, Debug)]
pub enum RrdError {
    /// The native library set its error flag during the call.
    ///
    /// `message` is an owned copy of the library's thread-local error text,
    /// taken immediately after the call returned.
    #[error("{operation}: {message}")]
    Library {
        /// The operation that failed (`create`, `fetch`, ...).
        operation: &'static str,
        /// Error text reported by the library.
        message: String,
    },

    /// An argument could not be passed to C because it contains a NUL byte.
    #[error("argument contains an interior NUL byte: {value:?}")]
    InteriorNul {
        /// The offending argument.
        value: String,
    },

    /// Creating a database without overwrite found an existing file, or
    /// the file could not be reserved.
    #[error("cannot create database file '{path}': {source}")]
    FileExists {
        /// The database path.
        path: String,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The library reported failure through its return value or a null
    /// result but left the error flag clear.
    #[error("{operation} failed without reporting an error")]
    MissingOutput {
        /// The operation that returned nothing.
        operation: &'static str,
    },
}

impl RrdError {
    /// Returns the library's error text if this error came from librrd.
    pub fn library_message(&self) -> Option<&str> {
        match self {
            Self::Library { message, .. } => Some(message),
            _ => None,
        }
    }

    /// Returns `true` if the error is an `io::ErrorKind::AlreadyExists`
    /// from a non-overwriting create.
    pub fn is_exists(&self) -> bool {
        matches!(self, Self::FileExists { source, .. } if source.kind() == std::io::ErrorKind::AlreadyExists)
    }
}

/// Type alias for `Result<T, RrdError>`.
pub type Result<T> = std::result::Result<T, RrdError>;
