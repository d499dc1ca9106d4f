//! postsource - server-push events over any HTTP method
//!
//! Issues a single request (typically a POST with a JSON body) and reads the
//! response as a stream of `data:` frames separated by blank lines.
//!
//! - [`event_source::EventSource`] delivers events to callbacks from a
//!   background task and can be closed at any time.
//! - [`sse::event_stream`] exposes the same pipeline as a `Stream`.
//! - [`job`] and [`cli`] implement the bundled scrape job client.

pub mod adapters;
pub mod cli;
pub mod config;
pub mod error;
pub mod event_source;
pub mod job;
pub mod logging;
pub mod models;
pub mod sse;
pub mod traits;

pub use error::{HttpError, StreamError, StreamResult};
pub use event_source::{ClientState, CloseHandle, EventSource};
pub use models::{Method, StreamRequest};
pub use sse::Event;
