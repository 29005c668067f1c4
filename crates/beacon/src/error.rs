//! Error types for the Beacon SDK.

use std::sync::Arc;
use std::time::Duration;

use reqwest::StatusCode;

/// Errors that can occur when using the Beacon SDK.
///
/// Cheap to clone: a failed batch hands the same error to every event in it.
#[derive(Debug, Clone, thiserror::Error)]
pub enum Error {
    /// The event was rejected before it was queued.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The ingestion endpoint answered with a non-success status.
    #[error("{status_text}")]
    Status {
        status: StatusCode,
        status_text: String,
    },

    /// The request exceeded the configured timeout.
    #[error("request timed out after {}ms", .after.as_millis())]
    Timeout { after: Duration },

    /// HTTP request failed without a response.
    #[error("HTTP request failed: {0}")]
    Http(#[source] Arc<reqwest::Error>),

    /// Invalid configuration.
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Client has been shutdown.
    #[error("Client has been shutdown")]
    Shutdown,

    /// The client was dropped while the event was still queued.
    #[error("Event was dropped before it could be sent")]
    Dropped,

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[source] Arc<serde_json::Error>),
}

impl Error {
    /// Build a status error, using the canonical reason phrase as its text.
    ///
    /// The reason phrase the server sent, if any, is not used: `400` always
    /// reads `Bad Request`. Codes without a canonical phrase use the number.
    pub(crate) fn from_status(status: StatusCode) -> Self {
        let status_text = status
            .canonical_reason()
            .map(String::from)
            .unwrap_or_else(|| status.as_str().to_string());
        Error::Status {
            status,
            status_text,
        }
    }

    /// HTTP status of the response, when the server answered.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Error::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Error::Http(Arc::new(err))
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(Arc::new(err))
    }
}

/// Reasons an event fails validation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("event must be a JSON object")]
    NotAnObject,

    #[error("event is {size} bytes, must be under {limit} bytes")]
    TooLarge { size: usize, limit: usize },

    #[error("\"{field}\" must be {expected}")]
    InvalidField {
        field: &'static str,
        expected: String,
    },

    #[error("{event_type} event requires \"{field}\"")]
    MissingField {
        event_type: &'static str,
        field: &'static str,
    },
}
