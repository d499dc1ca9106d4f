//! Common test utilities for integration tests.
//!
//! Provides callback collectors for `EventSource` and a throwaway axum
//! server for bodies that wiremock cannot produce (slow chunks, never-ending
//! streams, aborted transfers).
//!
//! # Example
//!
//! ```ignore
//! let collector = Collector::new();
//! let source = collector.open(http, request);
//! source.wait().await;
//! assert_eq!(collector.events(), vec!["hello"]);
//! ```

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::Router;
use postsource::adapters::ReqwestHttpClient;
use postsource::config::ClientConfig;
use postsource::{EventSource, StreamError, StreamRequest};
use postsource::traits::HttpClient;

/// Records everything delivered to an `EventSource`'s callbacks.
#[derive(Clone, Default)]
pub struct Collector {
    events: Arc<Mutex<Vec<String>>>,
    errors: Arc<Mutex<Vec<StreamError>>>,
}

impl Collector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a source with this collector installed as both callbacks.
    pub fn open<H: HttpClient + 'static>(&self, http: H, request: StreamRequest) -> EventSource {
        let events = self.events.clone();
        let errors = self.errors.clone();
        EventSource::open_with_handlers(
            http,
            request,
            move |event| events.lock().unwrap().push(event.data),
            move |err| errors.lock().unwrap().push(err),
        )
    }

    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }

    pub fn errors(&self) -> Vec<StreamError> {
        self.errors.lock().unwrap().clone()
    }
}

/// A reqwest transport with short timeouts for tests.
pub fn test_http_client() -> ReqwestHttpClient {
    let config = ClientConfig::default()
        .with_connect_timeout(Some(std::time::Duration::from_secs(2)));
    ReqwestHttpClient::from_config(&config).expect("client builds")
}

/// Serve `app` on an ephemeral local port.
pub async fn spawn_server(app: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind test listener");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("test server");
    });
    addr
}

/// Format one frame the way the job endpoint does.
pub fn frame(payload: &str) -> String {
    format!("data: {}\n\n", payload)
}
