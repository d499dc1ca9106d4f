//! Mock implementations for testing.
//!
//! Enables exercising the event source without network access.

pub mod http;

pub use http::{MockHttpClient, MockResponse, RecordedRequest};
