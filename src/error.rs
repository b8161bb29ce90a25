//! Unified error type
//!
//! Module errors convert into [`Error`] so endpoint methods can use `?`
//! across the queue, protocol and transport layers. Timeout and Disposed are
//! kept apart from everything else so callers can branch on them.

use std::time::Duration;

use thiserror::Error;

use crate::protocol::MessageError;
use crate::queue::QueueError;
use crate::transport::TransportError;

/// Result alias for this crate
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by relays, clients and spies
#[derive(Debug, Error)]
pub enum Error {
    /// Nothing arrived within the deadline
    #[error("{context}: timed out after {timeout:?}")]
    Timeout {
        context: &'static str,
        timeout: Duration,
    },

    /// The endpoint was torn down while a request was pending
    #[error("{context}: disposed while waiting")]
    Disposed { context: &'static str },

    /// A received payload was not a valid message
    #[error("malformed message: {0}")]
    Message(#[from] MessageError),

    /// The simulated transport failed
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),
}

impl Error {
    /// Attach a description of what was being waited for to a queue failure
    pub fn from_queue(error: QueueError, context: &'static str) -> Self {
        match error {
            QueueError::Timeout(timeout) => Error::Timeout { context, timeout },
            QueueError::Disposed => Error::Disposed { context },
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Error::Timeout { .. })
    }

    pub fn is_disposed(&self) -> bool {
        matches!(self, Error::Disposed { .. })
    }
}

impl From<QueueError> for Error {
    fn from(error: QueueError) -> Self {
        Error::from_queue(error, "waiting for a message")
    }
}
