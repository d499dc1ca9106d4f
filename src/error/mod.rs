//! Error types for postsource.
//!
//! - [`HttpError`] - transport-level failures reported by an
//!   [`HttpClient`](crate::traits::HttpClient)
//! - [`StreamError`] - the failures an event stream reports to its consumer
//!
//! # Example
//!
//! ```ignore
//! source.on_error(|err: StreamError| {
//!     eprintln!("[{}] {}", err.error_code(), err.user_message());
//! });
//! ```

mod stream;

pub use crate::traits::HttpError;
pub use stream::StreamError;

/// Result alias for stream operations.
pub type StreamResult<T> = Result<T, StreamError>;
