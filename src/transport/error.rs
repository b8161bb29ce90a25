//! Transport error types

use thiserror::Error;

/// Errors from the simulated transport
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("invalid URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("unsupported scheme: {0} (expected ws or wss)")]
    UnsupportedScheme(String),

    #[error("address already in use: {0}")]
    AddressInUse(String),

    #[error("connection refused: {0}")]
    ConnectionRefused(String),

    #[error("connection rejected: limit of {0} reached")]
    ConnectionLimit(usize),

    #[error("connection closed")]
    Closed,

    #[error("peer error: {0}")]
    Peer(String),
}
