//! Server configuration

use std::time::Duration;

use crate::queue::DEFAULT_REQUEST_TIMEOUT;

/// URL used when none is given
pub const DEFAULT_URL: &str = "ws://localhost:8080";

/// Server configuration options
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// URL to bind to on the mock network
    pub url: String,

    /// Maximum concurrent connections (0 = unlimited)
    pub max_connections: usize,

    /// Default wait for `next()` and friends
    pub request_timeout: Duration,

    /// How long to wait for clients in `wait_connected()`
    pub connect_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_URL.to_string(),
            max_connections: 0, // Unlimited
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            connect_timeout: Duration::from_millis(1000),
        }
    }
}

impl ServerConfig {
    /// Create a new config with a custom URL
    pub fn with_url(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    /// Set the URL
    pub fn bind(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    /// Set maximum connections
    pub fn max_connections(mut self, max: usize) -> Self {
        self.max_connections = max;
        self
    }

    /// Set the default request timeout
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Set the connection wait timeout
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();

        assert_eq!(config.url, DEFAULT_URL);
        assert_eq!(config.max_connections, 0);
        assert_eq!(config.request_timeout, Duration::from_millis(1000));
        assert_eq!(config.connect_timeout, Duration::from_millis(1000));
    }

    #[test]
    fn test_with_url() {
        let config = ServerConfig::with_url("wss://relay.test");

        assert_eq!(config.url, "wss://relay.test");
        assert_eq!(config.max_connections, 0);
    }

    #[test]
    fn test_builder_chaining() {
        let config = ServerConfig::default()
            .bind("ws://other.test")
            .max_connections(2)
            .request_timeout(Duration::from_millis(50))
            .connect_timeout(Duration::from_secs(5));

        assert_eq!(config.url, "ws://other.test");
        assert_eq!(config.max_connections, 2);
        assert_eq!(config.request_timeout, Duration::from_millis(50));
        assert_eq!(config.connect_timeout, Duration::from_secs(5));
    }
}
