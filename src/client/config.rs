//! Client configuration

use std::time::Duration;

use crate::queue::DEFAULT_REQUEST_TIMEOUT;

/// Client configuration
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Relay URL
    pub url: String,

    /// Default wait for `next()`
    pub request_timeout: Duration,
}

impl ClientConfig {
    /// Create a config for the given relay URL
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    /// Set the default request timeout
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}
