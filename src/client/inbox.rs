//! Queue of messages received from a relay

use std::time::Duration;

use crate::error::{Error, Result};
use crate::protocol::{MessageError, RelayMessage};
use crate::queue::RendezvousQueue;

/// Rendezvous queue of decoded relay messages
///
/// Text that fails to decode is queued as an error and handed to whoever
/// asks next, in its arrival position.
#[derive(Debug, Default)]
pub struct RelayInbox {
    queue: RendezvousQueue<std::result::Result<RelayMessage, MessageError>>,
}

impl RelayInbox {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue an already decoded message
    pub fn push(&self, message: RelayMessage) {
        self.queue.push(Ok(message));
    }

    /// Decode and queue wire text
    pub fn push_text(&self, text: &str) {
        let decoded = RelayMessage::from_json(text);
        if let Err(e) = &decoded {
            tracing::warn!(error = %e, message = text, "Malformed message from relay");
        }
        self.queue.push(decoded);
    }

    /// Wait for the next message
    pub async fn next(&self, timeout: Duration) -> Result<RelayMessage> {
        let decoded = self
            .queue
            .request(timeout)
            .await
            .map_err(|e| Error::from_queue(e, "waiting for the next relay message"))?;
        Ok(decoded?)
    }

    /// Wait for the next `count` messages, sharing one deadline
    ///
    /// A malformed message anywhere in the batch fails the whole call; the
    /// messages are consumed either way.
    pub async fn nexts(&self, count: usize, timeout: Duration) -> Result<Vec<RelayMessage>> {
        let batch = self
            .queue
            .request_n(count, timeout)
            .await
            .map_err(|e| Error::from_queue(e, "waiting for relay messages"))?;
        batch
            .into_iter()
            .map(|decoded| decoded.map_err(Error::from))
            .collect()
    }

    /// Fail pending waits and drop anything buffered
    pub fn dispose(&self) {
        self.queue.dispose();
    }

    /// Messages received but not yet taken
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Callers currently waiting in `next()`
    pub fn pending_requests(&self) -> usize {
        self.queue.pending_requests()
    }
}
