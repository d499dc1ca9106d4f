//! HTTP client trait abstraction.
//!
//! Provides a trait-based abstraction for streamed HTTP calls, enabling
//! dependency injection and mocking in tests.

use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;
use std::collections::HashMap;
use std::pin::Pin;

use crate::models::StreamRequest;

/// HTTP headers represented as a key-value map.
pub type Headers = HashMap<String, String>;

/// Response body delivered incrementally, one chunk per transport read.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, HttpError>> + Send>>;

/// HTTP client errors.
#[derive(Debug, Clone, PartialEq)]
pub enum HttpError {
    /// Connection failed
    ConnectionFailed(String),
    /// Request timeout
    Timeout(String),
    /// Server returned an error status
    ServerError { status: u16, message: String },
    /// Request was cancelled
    Cancelled,
    /// IO error while reading the body
    Io(String),
    /// Invalid URL
    InvalidUrl(String),
    /// Other error
    Other(String),
}

impl HttpError {
    /// Whether a caller could reasonably retry the call.
    ///
    /// Nothing in this crate retries; the classification is for consumers.
    pub fn is_retryable(&self) -> bool {
        match self {
            HttpError::ConnectionFailed(_) | HttpError::Timeout(_) | HttpError::Io(_) => true,
            HttpError::ServerError { status, .. } => {
                *status >= 500 || *status == 429 || *status == 408
            }
            HttpError::Cancelled | HttpError::InvalidUrl(_) | HttpError::Other(_) => false,
        }
    }
}

impl std::fmt::Display for HttpError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HttpError::ConnectionFailed(msg) => write!(f, "Connection failed: {}", msg),
            HttpError::Timeout(msg) => write!(f, "Request timeout: {}", msg),
            HttpError::ServerError { status, message } => {
                write!(f, "Server error ({}): {}", status, message)
            }
            HttpError::Cancelled => write!(f, "Request cancelled"),
            HttpError::Io(msg) => write!(f, "IO error: {}", msg),
            HttpError::InvalidUrl(msg) => write!(f, "Invalid URL: {}", msg),
            HttpError::Other(msg) => write!(f, "HTTP error: {}", msg),
        }
    }
}

impl std::error::Error for HttpError {}

/// Trait for issuing streamed HTTP calls.
///
/// Implementations include the production reqwest-based client and the
/// scripted mock client used in tests.
///
/// # Example
///
/// ```ignore
/// use postsource::traits::{HttpClient, HttpError};
/// use postsource::models::StreamRequest;
/// use futures::StreamExt;
///
/// async fn count_bytes<C: HttpClient>(client: &C) -> Result<usize, HttpError> {
///     let request = StreamRequest::post("https://api.example.com/stream").body("{}");
///     let mut body = client.stream(&request).await?;
///     let mut total = 0;
///     while let Some(chunk) = body.next().await {
///         total += chunk?.len();
///     }
///     Ok(total)
/// }
/// ```
#[async_trait]
pub trait HttpClient: Send + Sync {
    /// Issue `request` and return its response body as a stream of chunks.
    ///
    /// Resolves once response headers arrive. A non-2xx status is reported as
    /// [`HttpError::ServerError`] instead of a stream. Dropping the returned
    /// stream aborts the transfer.
    async fn stream(&self, request: &StreamRequest) -> Result<ByteStream, HttpError>;
}
