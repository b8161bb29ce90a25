//! Scripted Nostr client

use std::sync::Arc;
use std::time::Duration;

use crate::error::Result;
use crate::protocol::{ClientMessage, RelayMessage, WireMessage};
use crate::transport::{ClientSocket, MockNetwork};

use super::config::ClientConfig;
use super::inbox::RelayInbox;

/// A client driven directly by test code
///
/// Everything the relay sends is queued and returned by [`next`](Self::next)
/// in arrival order.
#[derive(Debug)]
pub struct MockClient {
    config: ClientConfig,
    socket: ClientSocket,
    inbox: Arc<RelayInbox>,
}

impl MockClient {
    /// Connect with default settings
    pub fn connect(network: &MockNetwork, url: &str) -> Result<Self> {
        Self::with_config(network, ClientConfig::new(url))
    }

    /// Connect with custom configuration
    pub fn with_config(network: &MockNetwork, config: ClientConfig) -> Result<Self> {
        let socket = network.connect(&config.url)?;
        let inbox = Arc::new(RelayInbox::new());

        let sink = Arc::clone(&inbox);
        socket.on_message(move |text| sink.push_text(text));

        tracing::debug!(url = %socket.url(), "Mock client connected");
        Ok(Self {
            config,
            socket,
            inbox,
        })
    }

    /// Send a protocol message
    ///
    /// The relay handles it before this returns.
    pub fn send(&self, message: &ClientMessage) -> Result<()> {
        self.socket.send(message)
    }

    /// Send anything, well-formed or not
    pub fn send_raw(&self, message: impl Into<WireMessage>) -> Result<()> {
        self.socket.send(message)
    }

    /// Next message from the relay, waiting up to the configured timeout
    pub async fn next(&self) -> Result<RelayMessage> {
        self.inbox.next(self.config.request_timeout).await
    }

    pub async fn next_with_timeout(&self, timeout: Duration) -> Result<RelayMessage> {
        self.inbox.next(timeout).await
    }

    /// Next `count` messages from the relay
    pub async fn nexts(&self, count: usize) -> Result<Vec<RelayMessage>> {
        self.nexts_with_timeout(count, self.config.request_timeout)
            .await
    }

    pub async fn nexts_with_timeout(
        &self,
        count: usize,
        timeout: Duration,
    ) -> Result<Vec<RelayMessage>> {
        self.inbox.nexts(count, timeout).await
    }

    pub fn socket(&self) -> &ClientSocket {
        &self.socket
    }

    pub fn inbox(&self) -> &RelayInbox {
        &self.inbox
    }

    pub fn is_connected(&self) -> bool {
        self.socket.is_open()
    }

    /// Fail pending `next()` calls with a disposed error
    ///
    /// The connection stays open.
    pub fn dispose(&self) {
        self.inbox.dispose();
    }

    /// Close the connection and dispose the inbox
    pub fn close(&self) {
        self.socket.close();
        self.dispose();
    }
}

impl Drop for MockClient {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::MockServer;
    use crate::{Error, ServerConfig, TransportError};

    #[tokio::test]
    async fn test_receives_what_the_server_sends() {
        let network = MockNetwork::new();
        let server = MockServer::bind(&network, ServerConfig::with_url("ws://relay.test"), ()).unwrap();
        let client = MockClient::connect(&network, "ws://relay.test").unwrap();

        let socket = server.socket(0).await.unwrap();
        socket.send(r#"["NOTICE","hello"]"#);
        socket.send("garbage");

        assert_eq!(
            client.next().await.unwrap(),
            RelayMessage::Notice {
                message: "hello".into()
            }
        );
        assert!(matches!(client.next().await, Err(Error::Message(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_nexts_with_timeout_keeps_partial_batch() {
        let network = MockNetwork::new();
        let server = MockServer::bind(&network, ServerConfig::with_url("ws://relay.test"), ()).unwrap();
        let client = MockClient::connect(&network, "ws://relay.test").unwrap();

        let socket = server.socket(0).await.unwrap();
        socket.send(r#"["EOSE","a"]"#);
        socket.send(r#"["EOSE","b"]"#);

        let err = client
            .nexts_with_timeout(3, Duration::from_millis(50))
            .await
            .unwrap_err();
        assert!(err.is_timeout());

        let batch = client
            .nexts_with_timeout(2, Duration::from_millis(50))
            .await
            .unwrap();
        assert_eq!(batch[0].subscription_id(), Some("a"));
        assert_eq!(batch[1].subscription_id(), Some("b"));
    }

    #[tokio::test]
    async fn test_refused_without_server() {
        let network = MockNetwork::new();

        let err = MockClient::connect(&network, "ws://relay.test").unwrap_err();
        assert!(matches!(
            err,
            Error::Transport(TransportError::ConnectionRefused(_))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_close_disconnects() {
        let network = MockNetwork::new();
        let server = MockServer::bind(&network, ServerConfig::with_url("ws://relay.test"), ()).unwrap();
        let client = MockClient::connect(&network, "ws://relay.test").unwrap();

        client.close();

        assert!(!client.is_connected());
        assert_eq!(server.open_connections(), 0);
        assert!(client.next().await.unwrap_err().is_timeout());
    }
}
