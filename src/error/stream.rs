//! Stream failure kinds surfaced to consumers.

use thiserror::Error;

use crate::traits::HttpError;

/// Fatal failures of an event stream.
///
/// These are the only conditions reported through `on_error`. A caller
/// closing the stream, frames without the `data:` prefix, and an
/// unterminated trailing frame are not errors.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StreamError {
    /// The call could not be established or the transport failed mid-stream.
    #[error("Stream connection error: {0}")]
    Connection(#[from] HttpError),

    /// The body contained a byte sequence that is not valid UTF-8.
    #[error("Invalid UTF-8 in stream at byte {offset}")]
    Decode {
        /// Absolute offset of the first invalid byte in the body
        offset: u64,
    },
}

impl StreamError {
    /// Check if this error is likely transient.
    ///
    /// The event source never retries; this is a hint for the caller.
    pub fn is_retryable(&self) -> bool {
        match self {
            StreamError::Connection(err) => err.is_retryable(),
            StreamError::Decode { .. } => false,
        }
    }

    /// Get a user-friendly error message.
    pub fn user_message(&self) -> String {
        match self {
            StreamError::Connection(HttpError::ServerError { status, .. }) => {
                format!("The server rejected the request (HTTP {}).", status)
            }
            StreamError::Connection(HttpError::InvalidUrl(_)) => {
                "The stream address is not a valid URL.".to_string()
            }
            StreamError::Connection(HttpError::Timeout(_)) => {
                "The server did not respond in time.".to_string()
            }
            StreamError::Connection(_) => {
                "The stream connection was lost.".to_string()
            }
            StreamError::Decode { .. } => {
                "The server sent data that is not valid text.".to_string()
            }
        }
    }

    /// Get a short error code for logging.
    pub fn error_code(&self) -> &'static str {
        match self {
            StreamError::Connection(HttpError::ServerError { .. }) => "E_STREAM_HTTP",
            StreamError::Connection(_) => "E_STREAM_CONN",
            StreamError::Decode { .. } => "E_STREAM_DECODE",
        }
    }
}
