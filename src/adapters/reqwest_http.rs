//! Reqwest-based HTTP client adapter.
//!
//! This module provides the production implementation of the [`HttpClient`]
//! trait from `crate::traits`.

use std::time::Duration;

use async_trait::async_trait;
use futures_util::StreamExt;
use tracing::debug;

use crate::config::ClientConfig;
use crate::models::{Method, StreamRequest};
use crate::traits::{ByteStream, Headers, HttpClient, HttpError};

/// Most of a non-success body kept as the error message.
const MAX_ERROR_BODY: usize = 4096;

/// How long to wait for the first piece of a non-success body.
const ERROR_BODY_TIMEOUT: Duration = Duration::from_secs(2);

/// HTTP client implementation using reqwest.
///
/// # Example
///
/// ```ignore
/// use postsource::adapters::ReqwestHttpClient;
/// use postsource::config::ClientConfig;
///
/// let client = ReqwestHttpClient::from_config(&ClientConfig::from_env())?;
/// ```
#[derive(Debug, Clone)]
pub struct ReqwestHttpClient {
    client: reqwest::Client,
    default_headers: Headers,
}

impl ReqwestHttpClient {
    /// Create a new ReqwestHttpClient with default settings.
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
            default_headers: Headers::new(),
        }
    }

    /// Build a client from a [`ClientConfig`].
    pub fn from_config(config: &ClientConfig) -> Result<Self, HttpError> {
        let mut builder = reqwest::Client::builder();

        if let Some(timeout) = config.connect_timeout {
            builder = builder.connect_timeout(timeout);
        }
        if let Some(timeout) = config.request_timeout {
            builder = builder.timeout(timeout);
        }
        if let Some(user_agent) = &config.user_agent {
            builder = builder.user_agent(user_agent.as_str());
        }

        let client = builder.build().map_err(|e| HttpError::Other(e.to_string()))?;

        Ok(Self {
            client,
            default_headers: config.default_headers.clone(),
        })
    }

    /// Create a new ReqwestHttpClient with a custom reqwest::Client.
    ///
    /// This allows for advanced configuration like custom TLS settings
    /// or proxies.
    pub fn with_client(client: reqwest::Client) -> Self {
        Self {
            client,
            default_headers: Headers::new(),
        }
    }

    /// Get a reference to the underlying reqwest::Client.
    pub fn inner(&self) -> &reqwest::Client {
        &self.client
    }

    /// Convert reqwest error to HttpError.
    fn convert_error(err: reqwest::Error) -> HttpError {
        if err.is_builder() {
            HttpError::InvalidUrl(err.to_string())
        } else if err.is_timeout() {
            HttpError::Timeout(err.to_string())
        } else if err.is_connect() {
            HttpError::ConnectionFailed(err.to_string())
        } else {
            HttpError::Other(err.to_string())
        }
    }

    /// Convert a body read error to HttpError.
    fn convert_body_error(err: reqwest::Error) -> HttpError {
        if err.is_timeout() {
            HttpError::Timeout(err.to_string())
        } else {
            HttpError::Io(err.to_string())
        }
    }

    /// Read the start of a non-success body without waiting for its end.
    ///
    /// Only the first chunk is used, capped at [`MAX_ERROR_BODY`] bytes.
    async fn error_message(response: reqwest::Response) -> String {
        let mut body = response.bytes_stream();
        match tokio::time::timeout(ERROR_BODY_TIMEOUT, body.next()).await {
            Ok(Some(Ok(chunk))) => {
                let end = chunk.len().min(MAX_ERROR_BODY);
                String::from_utf8_lossy(&chunk[..end]).into_owned()
            }
            Ok(None) => String::new(),
            Ok(Some(Err(_))) | Err(_) => "Unknown error".to_string(),
        }
    }

    fn convert_method(method: Method) -> reqwest::Method {
        match method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Patch => reqwest::Method::PATCH,
            Method::Delete => reqwest::Method::DELETE,
        }
    }

    /// Apply default headers, then request headers, to a request builder.
    ///
    /// A request header replaces a default header of the same name.
    fn apply_headers(
        &self,
        builder: reqwest::RequestBuilder,
        headers: &Headers,
    ) -> reqwest::RequestBuilder {
        let mut builder = builder;
        for (key, value) in &self.default_headers {
            if !headers.keys().any(|k| k.eq_ignore_ascii_case(key)) {
                builder = builder.header(key, value);
            }
        }
        for (key, value) in headers {
            builder = builder.header(key, value);
        }
        builder
    }
}

impl Default for ReqwestHttpClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HttpClient for ReqwestHttpClient {
    async fn stream(&self, request: &StreamRequest) -> Result<ByteStream, HttpError> {
        let url = reqwest::Url::parse(&request.url)
            .map_err(|e| HttpError::InvalidUrl(format!("{}: {}", request.url, e)))?;

        let builder = self
            .client
            .request(Self::convert_method(request.method), url)
            .header(reqwest::header::ACCEPT, "text/event-stream");
        let mut builder = self.apply_headers(builder, &request.headers);
        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }

        let response = builder.send().await.map_err(Self::convert_error)?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = Self::error_message(response).await;
            return Err(HttpError::ServerError { status, message });
        }

        debug!(
            "{} {} answered {}",
            request.method,
            request.url,
            response.status()
        );

        let stream = response
            .bytes_stream()
            .map(|result| result.map_err(Self::convert_body_error));

        Ok(Box::pin(stream))
    }
}
