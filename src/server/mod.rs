//! Server side of the mock
//!
//! [`MockServer`] is a generic in-process WebSocket server driven by a
//! [`ServerBehavior`]; [`MockRelay`] is a server with Nostr relay behavior.

pub mod config;
pub mod handler;
pub mod listener;
pub mod relay;

pub use config::ServerConfig;
pub use handler::ServerBehavior;
pub use listener::MockServer;
pub use relay::{MockRelay, RelayBehavior};
