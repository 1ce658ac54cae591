//! Error type shared by every remote collaborator.

use thiserror::Error;

/// Errors that can occur while talking to the generation service.
#[derive(Debug, Clone, Error)]
pub enum RemoteError {
    /// HTTP transport or connection error.
    #[error("HTTP request failed: {0}")]
    Request(String),

    /// The request did not complete within the configured timeout.
    #[error("request timed out")]
    Timeout,

    /// The service answered with a non-success status.
    #[error("service returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// The body was not the JSON envelope we expected.
    #[error("failed to parse response: {0}")]
    Parse(String),

    /// The envelope parsed but its content violates the requested schema.
    #[error("response did not match the expected schema: {0}")]
    Schema(String),

    /// The response carried no usable text or audio.
    #[error("response carried no content")]
    EmptyResponse,

    #[error("no API key configured")]
    MissingApiKey,
}

impl RemoteError {
    /// Transport and server-class failures are worth another attempt;
    /// anything the server will answer the same way again is not.
    pub fn is_transient(&self) -> bool {
        match self {
            RemoteError::Request(_) | RemoteError::Timeout => true,
            RemoteError::Status { status, .. } => *status >= 500 || *status == 429,
            RemoteError::Parse(_)
            | RemoteError::Schema(_)
            | RemoteError::EmptyResponse
            | RemoteError::MissingApiKey => false,
        }
    }
}

impl From<reqwest::Error> for RemoteError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            RemoteError::Timeout
        } else if e.is_decode() {
            RemoteError::Parse(e.to_string())
        } else {
            RemoteError::Request(e.to_string())
        }
    }
}
