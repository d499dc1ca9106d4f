//! Transport configuration.
//!
//! [`ClientConfig`] controls how the production HTTP client is built. Values
//! come from code via the `with_*` setters or from the environment via
//! [`ClientConfig::from_env`].

use std::time::Duration;

use tracing::warn;

use crate::traits::Headers;

/// Environment variable overriding the connect timeout, in seconds.
pub const ENV_CONNECT_TIMEOUT: &str = "POSTSOURCE_CONNECT_TIMEOUT_SECS";
/// Environment variable setting a whole-request timeout, in seconds.
pub const ENV_REQUEST_TIMEOUT: &str = "POSTSOURCE_REQUEST_TIMEOUT_SECS";
/// Environment variable overriding the User-Agent header.
pub const ENV_USER_AGENT: &str = "POSTSOURCE_USER_AGENT";

/// Default User-Agent, `postsource/<version>`.
pub const DEFAULT_USER_AGENT: &str = concat!("postsource/", env!("CARGO_PKG_VERSION"));

/// Configuration for the production HTTP client.
///
/// # Example
///
/// ```
/// use postsource::config::ClientConfig;
/// use std::time::Duration;
///
/// let config = ClientConfig::default()
///     .with_connect_timeout(Some(Duration::from_secs(3)))
///     .with_header("Authorization", "Bearer token");
/// assert_eq!(config.connect_timeout, Some(Duration::from_secs(3)));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    /// Time allowed to establish the connection (None disables the limit)
    pub connect_timeout: Option<Duration>,
    /// Limit on the whole call including the body. Streams are long-lived,
    /// so this is off by default.
    pub request_timeout: Option<Duration>,
    /// User-Agent header (None sends no User-Agent)
    pub user_agent: Option<String>,
    /// Headers sent with every call; request headers take precedence
    pub default_headers: Headers,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Some(Duration::from_secs(10)),
            request_timeout: None,
            user_agent: Some(DEFAULT_USER_AGENT.to_string()),
            default_headers: Headers::new(),
        }
    }
}

impl ClientConfig {
    /// Create a ClientConfig with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Defaults overlaid with any `POSTSOURCE_*` environment variables.
    ///
    /// Unparseable numbers are ignored with a warning.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an explicit lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(secs) = lookup(ENV_CONNECT_TIMEOUT).and_then(|v| parse_secs(ENV_CONNECT_TIMEOUT, &v)) {
            config.connect_timeout = Some(Duration::from_secs(secs));
        }
        if let Some(secs) = lookup(ENV_REQUEST_TIMEOUT).and_then(|v| parse_secs(ENV_REQUEST_TIMEOUT, &v)) {
            config.request_timeout = Some(Duration::from_secs(secs));
        }
        if let Some(agent) = lookup(ENV_USER_AGENT) {
            config.user_agent = if agent.is_empty() { None } else { Some(agent) };
        }

        config
    }

    /// Set the connect timeout.
    pub fn with_connect_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set the whole-request timeout.
    pub fn with_request_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Set the User-Agent.
    pub fn with_user_agent(mut self, user_agent: Option<String>) -> Self {
        self.user_agent = user_agent;
        self
    }

    /// Add a header sent with every call.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.default_headers.insert(name.into(), value.into());
        self
    }
}

fn parse_secs(key: &str, value: &str) -> Option<u64> {
    match value.trim().parse::<u64>() {
        Ok(secs) => Some(secs),
        Err(e) => {
            warn!("Ignoring {}={:?}: {}", key, value, e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = ClientConfig::default();
        assert_eq!(config.connect_timeout, Some(Duration::from_secs(10)));
        assert_eq!(config.request_timeout, None);
        assert!(config.user_agent.as_deref().unwrap().starts_with("postsource/"));
        assert!(config.default_headers.is_empty());
    }

    #[test]
    fn test_builder_setters() {
        let config = ClientConfig::new()
            .with_connect_timeout(None)
            .with_request_timeout(Some(Duration::from_secs(60)))
            .with_user_agent(None)
            .with_header("X-Trace", "1");

        assert_eq!(config.connect_timeout, None);
        assert_eq!(config.request_timeout, Some(Duration::from_secs(60)));
        assert_eq!(config.user_agent, None);
        assert_eq!(config.default_headers.get("X-Trace"), Some(&"1".to_string()));
    }

    #[test]
    fn test_from_lookup_overrides() {
        let config = ClientConfig::from_lookup(lookup_from(&[
            (ENV_CONNECT_TIMEOUT, "3"),
            (ENV_REQUEST_TIMEOUT, " 120 "),
            (ENV_USER_AGENT, "scraper/2"),
        ]));

        assert_eq!(config.connect_timeout, Some(Duration::from_secs(3)));
        assert_eq!(config.request_timeout, Some(Duration::from_secs(120)));
        assert_eq!(config.user_agent.as_deref(), Some("scraper/2"));
    }

    #[test]
    fn test_from_lookup_ignores_invalid_numbers() {
        let config = ClientConfig::from_lookup(lookup_from(&[(ENV_CONNECT_TIMEOUT, "soon")]));
        assert_eq!(config.connect_timeout, Some(Duration::from_secs(10)));
    }

    #[test]
    fn test_empty_user_agent_disables_header() {
        let config = ClientConfig::from_lookup(lookup_from(&[(ENV_USER_AGENT, "")]));
        assert_eq!(config.user_agent, None);
    }

    #[test]
    #[serial]
    fn test_from_env_reads_process_environment() {
        std::env::set_var(ENV_REQUEST_TIMEOUT, "42");
        let config = ClientConfig::from_env();
        std::env::remove_var(ENV_REQUEST_TIMEOUT);

        assert_eq!(config.request_timeout, Some(Duration::from_secs(42)));
    }
}
