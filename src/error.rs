//! Error types for influxdb-rows.

use reqwest::StatusCode;
use thiserror::Error;

/// Error type for influxdb-rows operations.
#[derive(Error, Debug)]
pub enum Error {
    /// HTTP request failed before a response was received
    /// (connection refused, timeout, TLS failure, ...).
    #[error("HTTP request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The base URL given to the client could not be parsed.
    #[error("Invalid InfluxDB URL '{url}': {message}")]
    InvalidUrl {
        /// The URL as provided.
        url: String,
        /// Parser message.
        message: String,
    },

    /// A caller-supplied argument was rejected before any request was made.
    #[error("Invalid argument: {message}")]
    InvalidArgument {
        /// What was wrong with the argument.
        message: String,
    },

    /// A row could not be converted into line protocol.
    #[error("Failed to encode row: {message}")]
    Encoding {
        /// Description of the offending row or value.
        message: String,
    },

    /// InfluxDB answered with an error.
    #[error("InfluxDB returned an error: {message}")]
    Influx {
        /// HTTP status, when the error came from a non-2xx response.
        status: Option<StatusCode>,
        /// Error message returned by InfluxDB.
        message: String,
    },

    /// A response column could not be stored in the requested row type.
    #[error("Type mismatch in column '{column}': {message}")]
    TypeMismatch {
        /// Name of the column being decoded.
        column: String,
        /// What was expected and what was found.
        message: String,
    },

    /// Row has different number of values than the series has columns.
    #[error("Column count mismatch: expected {expected}, got {actual}")]
    ColumnMismatch {
        /// Number of columns declared by the series.
        expected: usize,
        /// Number of values found in the row.
        actual: usize,
    },

    /// The response body was not a valid JSON result envelope.
    #[error("Failed to parse response: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A string value could not be parsed.
    #[error("Failed to parse value: {message}")]
    Parse {
        /// Description of what failed to parse.
        message: String,
    },

    /// I/O error while reading a streamed response.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub(crate) fn encoding(message: impl Into<String>) -> Self {
        Self::Encoding {
            message: message.into(),
        }
    }

    pub(crate) fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    pub(crate) fn type_mismatch(column: &str, message: impl Into<String>) -> Self {
        Self::TypeMismatch {
            column: column.to_string(),
            message: message.into(),
        }
    }

    /// Returns the server-provided message if this error came from InfluxDB.
    pub fn influx_message(&self) -> Option<&str> {
        match self {
            Self::Influx { message, .. } => Some(message),
            _ => None,
        }
    }
}

/// Result type alias for influxdb-rows operations.
pub type Result<T> = std::result::Result<T, Error>;
