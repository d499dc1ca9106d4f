//! Trait abstractions for dependency injection and testability.
//!
//! # Traits
//!
//! - [`HttpClient`] - streamed HTTP calls (any method, optional body)

pub mod http;

pub use http::{ByteStream, Headers, HttpClient, HttpError};
