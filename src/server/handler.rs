//! Server behavior hooks
//!
//! A [`MockServer`](super::MockServer) owns one behavior and calls it for
//! every connection event. All hooks run synchronously inside the call that
//! caused them (a client's `connect`, `send`, `close`), with no transport
//! lock held.

use crate::error::Result;
use crate::transport::{ServerSocket, TransportError};

/// Callbacks for connection lifecycle events
///
/// All methods have no-op defaults; implement only what you need.
pub trait ServerBehavior: Send + Sync + 'static {
    /// A client connected
    fn on_open(&self, _socket: &ServerSocket) {}

    /// A client sent text
    ///
    /// Returning an error hands it back to the sending client.
    fn on_message(&self, _socket: &ServerSocket, _message: &str) -> Result<()> {
        Ok(())
    }

    /// The connection closed, from either side
    fn on_close(&self, _socket: &ServerSocket) {}

    /// The connection failed; `on_close` follows
    fn on_error(&self, _socket: &ServerSocket, _error: &TransportError) {}
}

/// A server that accepts connections and ignores everything
impl ServerBehavior for () {}
