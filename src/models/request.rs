use serde::{Deserialize, Serialize};

use crate::traits::Headers;

/// HTTP method used for a streamed call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    Get,
    #[default]
    Post,
    Put,
    Patch,
    Delete,
}

impl Method {
    /// Uppercase wire name of the method.
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
        }
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Immutable description of one outbound streamed call.
///
/// Built once with the consuming builder methods and then handed to an
/// [`EventSource`](crate::event_source::EventSource), which never mutates it.
///
/// # Example
///
/// ```
/// use postsource::models::{Method, StreamRequest};
///
/// let request = StreamRequest::post("http://127.0.0.1:5000/stream")
///     .json(&serde_json::json!({ "url": "https://example.com" }))
///     .unwrap();
///
/// assert_eq!(request.method, Method::Post);
/// assert_eq!(request.header_value("Content-Type"), Some("application/json"));
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StreamRequest {
    /// Target resource (absolute URL)
    pub url: String,
    /// HTTP method
    pub method: Method,
    /// Request headers, unique by name
    #[serde(default)]
    pub headers: Headers,
    /// Raw request body, usually serialized JSON
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
}

impl StreamRequest {
    /// Create a request for `url` using `method`, with no headers and no body.
    pub fn new(url: impl Into<String>, method: Method) -> Self {
        Self {
            url: url.into(),
            method,
            headers: Headers::new(),
            body: None,
        }
    }

    /// Create a POST request for `url`.
    pub fn post(url: impl Into<String>) -> Self {
        Self::new(url, Method::Post)
    }

    /// Set a header. Names are compared case-insensitively; setting an
    /// existing name replaces its value.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let name = name.into();
        self.headers.retain(|existing, _| !existing.eq_ignore_ascii_case(&name));
        self.headers.insert(name, value.into());
        self
    }

    /// Set a raw text body.
    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Serialize `value` as the JSON body and set `Content-Type: application/json`.
    pub fn json<T: Serialize + ?Sized>(self, value: &T) -> Result<Self, serde_json::Error> {
        let body = serde_json::to_string(value)?;
        Ok(self.header("Content-Type", "application/json").body(body))
    }

    /// Look up a header value by case-insensitive name.
    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}
