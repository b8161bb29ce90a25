//! Shared helpers for integration tests

#![allow(dead_code)]

use std::sync::Once;
use std::time::Duration;

use nostr_relay_mock::{MockClient, MockNetwork, MockRelay, ServerConfig};

pub const URL: &str = "ws://relay.test";

/// Short enough to keep failing tests fast
pub const WAIT: Duration = Duration::from_millis(200);

/// Install a log subscriber once per test binary
///
/// Respects `RUST_LOG`; quiet by default.
pub fn init_tracing() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
            )
            .with_test_writer()
            .try_init();
    });
}

/// A relay with a short request timeout on a fresh network
pub fn relay() -> (MockNetwork, MockRelay) {
    init_tracing();
    let network = MockNetwork::new();
    let relay = MockRelay::with_config(&network, ServerConfig::with_url(URL).request_timeout(WAIT))
        .expect("bind relay");
    (network, relay)
}

pub fn client(network: &MockNetwork) -> MockClient {
    MockClient::connect(network, URL).expect("connect client")
}
