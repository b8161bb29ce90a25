//! Queue error types

use std::time::Duration;

/// Reasons a pending request can fail
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QueueError {
    /// No item arrived before the request's deadline
    #[error("no item arrived within {0:?}")]
    Timeout(Duration),
    /// The queue was disposed while the request was still waiting
    #[error("queue was disposed while the request was pending")]
    Disposed,
}
