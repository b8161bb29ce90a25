//! URL registry connecting clients to mock servers

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, Weak};

use url::Url;

use crate::error::Result;

use super::error::TransportError;
use super::socket::{ClientSocket, Endpoint};

struct Binding {
    token: u64,
    endpoint: Weak<dyn Endpoint>,
}

/// An isolated in-process network
///
/// Cloning is cheap and every clone sees the same bindings. Tests that run
/// in parallel should each create their own network so URLs never collide.
#[derive(Clone, Default)]
pub struct MockNetwork {
    bindings: Arc<Mutex<HashMap<String, Binding>>>,
    next_token: Arc<AtomicU64>,
}

impl MockNetwork {
    /// Create an empty network
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a client connection to whatever is bound at `url`
    pub fn connect(&self, url: &str) -> Result<ClientSocket> {
        let key = normalize(url)?;

        // Resolve first so accept() runs without the registry locked
        let endpoint = {
            let bindings = self.bindings.lock().unwrap_or_else(PoisonError::into_inner);
            bindings.get(&key).and_then(|binding| binding.endpoint.upgrade())
        };

        match endpoint {
            Some(endpoint) => endpoint.accept(),
            None => {
                tracing::debug!(url = %key, "Connection refused: nothing bound");
                Err(TransportError::ConnectionRefused(key).into())
            }
        }
    }

    /// Whether a live server is bound at `url`
    pub fn is_bound(&self, url: &str) -> bool {
        let Ok(key) = normalize(url) else {
            return false;
        };
        let bindings = self.bindings.lock().unwrap_or_else(PoisonError::into_inner);
        bindings
            .get(&key)
            .map(|binding| binding.endpoint.strong_count() > 0)
            .unwrap_or(false)
    }

    /// Claim `url` for an endpoint, returning the normalised URL and a token
    /// for releasing it later
    pub(crate) fn bind(
        &self,
        url: &str,
        endpoint: Weak<dyn Endpoint>,
    ) -> std::result::Result<(String, u64), TransportError> {
        let key = normalize(url)?;
        let mut bindings = self.bindings.lock().unwrap_or_else(PoisonError::into_inner);

        // Servers dropped without closing leave dead entries behind
        if let Some(existing) = bindings.get(&key) {
            if existing.endpoint.strong_count() > 0 {
                return Err(TransportError::AddressInUse(key));
            }
        }

        let token = self.next_token.fetch_add(1, Ordering::Relaxed);
        bindings.insert(key.clone(), Binding { token, endpoint });
        Ok((key, token))
    }

    /// Release `url` if it is still held by the binding identified by `token`
    pub(crate) fn unbind(&self, url: &str, token: u64) {
        let mut bindings = self.bindings.lock().unwrap_or_else(PoisonError::into_inner);
        if bindings.get(url).map(|b| b.token) == Some(token) {
            bindings.remove(url);
        }
    }
}

impl fmt::Debug for MockNetwork {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bindings = self.bindings.lock().unwrap_or_else(PoisonError::into_inner);
        let mut urls: Vec<&String> = bindings.keys().collect();
        urls.sort();
        f.debug_struct("MockNetwork").field("bound", &urls).finish()
    }
}

/// Parse and canonicalise a WebSocket URL
///
/// `ws://relay.test` and `ws://relay.test/` name the same server.
fn normalize(url: &str) -> std::result::Result<String, TransportError> {
    let parsed = Url::parse(url).map_err(|e| TransportError::InvalidUrl {
        url: url.to_string(),
        reason: e.to_string(),
    })?;

    match parsed.scheme() {
        "ws" | "wss" => Ok(parsed.to_string()),
        other => Err(TransportError::UnsupportedScheme(other.to_string())),
    }
}
