//! Spy on the messages a client receives
//!
//! The client under test keeps its own connection; the spy only needs a
//! way to hear what arrives. Give it either a registration function for the
//! client's message listener, or the socket itself.

use std::sync::Arc;
use std::time::Duration;

use crate::error::Result;
use crate::protocol::RelayMessage;
use crate::queue::DEFAULT_REQUEST_TIMEOUT;
use crate::transport::ClientSocket;

use super::inbox::RelayInbox;

/// Callback handle passed to the client under test
#[derive(Debug, Clone)]
pub struct SpyListener {
    inbox: Arc<RelayInbox>,
}

impl SpyListener {
    /// Report a decoded message
    pub fn notify(&self, message: RelayMessage) {
        self.inbox.push(message);
    }

    /// Report raw wire text
    pub fn notify_text(&self, text: &str) {
        self.inbox.push_text(text);
    }
}

/// Queue of everything a client was observed receiving
#[derive(Debug)]
pub struct ClientSpy {
    inbox: Arc<RelayInbox>,
    request_timeout: Duration,
}

impl ClientSpy {
    /// Create a spy, handing its listener to `register`
    ///
    /// # Example
    /// ```
    /// use nostr_relay_mock::{faker, ClientSpy};
    ///
    /// # async fn example() -> nostr_relay_mock::Result<()> {
    /// let mut listeners = Vec::new();
    /// let spy = ClientSpy::new(|listener| listeners.push(listener));
    ///
    /// listeners[0].notify(faker::to_client::eose("sub"));
    /// assert_eq!(spy.next().await?, faker::to_client::eose("sub"));
    /// # Ok(())
    /// # }
    /// ```
    pub fn new(register: impl FnOnce(SpyListener)) -> Self {
        let inbox = Arc::new(RelayInbox::new());
        register(SpyListener {
            inbox: Arc::clone(&inbox),
        });
        Self {
            inbox,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    /// Spy on everything arriving at `socket`
    pub fn attach(socket: &ClientSocket) -> Self {
        Self::new(|listener| socket.on_message(move |text| listener.notify_text(text)))
    }

    /// Set the default wait for `next()`
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Next observed message
    pub async fn next(&self) -> Result<RelayMessage> {
        self.inbox.next(self.request_timeout).await
    }

    pub async fn next_with_timeout(&self, timeout: Duration) -> Result<RelayMessage> {
        self.inbox.next(timeout).await
    }

    /// Fail pending `next()` calls and forget buffered messages
    pub fn dispose(&self) {
        self.inbox.dispose();
    }
}
