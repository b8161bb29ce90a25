//! Mock Nostr relay
//!
//! A [`MockServer`] whose behavior decodes client messages, keeps
//! subscription bookkeeping, and queues every message for the test to
//! inspect with [`MockRelay::next`].
//!
//! Outbound messages come in two flavours:
//!
//! - `emit_event`, `emit_eose`, `emit_count` and `emit_ok` are routed by id to
//!   whichever clients asked for them, and update the bookkeeping.
//! - `emit_to_all` and `emit_to` send anything to anyone and leave the
//!   bookkeeping alone. Emitting an OK this way does not release the pending
//!   acknowledgement, so a later `emit_ok` for the same event sends a second
//!   OK.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use crate::error::{Error, Result};
use crate::faker;
use crate::protocol::{ClientMessage, PartialEvent, RelayMessage, WireMessage};
use crate::queue::RendezvousQueue;
use crate::router::{SubscriptionKind, SubscriptionRouter};
use crate::server::config::ServerConfig;
use crate::server::handler::ServerBehavior;
use crate::server::listener::MockServer;
use crate::transport::{MockNetwork, ServerSocket};

/// Server behavior that turns a [`MockServer`] into a relay
#[derive(Debug, Default)]
pub struct RelayBehavior {
    router: Mutex<SubscriptionRouter<ServerSocket>>,
    inbox: RendezvousQueue<ClientMessage>,
}

impl RelayBehavior {
    pub fn new() -> Self {
        Self::default()
    }

    fn router(&self) -> MutexGuard<'_, SubscriptionRouter<ServerSocket>> {
        self.router.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl ServerBehavior for RelayBehavior {
    fn on_open(&self, socket: &ServerSocket) {
        self.router().connect(socket.clone());
    }

    fn on_message(&self, socket: &ServerSocket, message: &str) -> Result<()> {
        let message = match ClientMessage::from_json(message) {
            Ok(message) => message,
            Err(e) => {
                tracing::warn!(socket_id = socket.id(), error = %e, "Malformed message from client");
                return Err(Error::Message(e));
            }
        };

        tracing::debug!(socket_id = socket.id(), kind = %message.kind(), "Relay received");

        // Bookkeeping first, so it is current by the time next() resolves
        self.router().observe(socket, &message);
        self.inbox.push(message);
        Ok(())
    }

    fn on_close(&self, socket: &ServerSocket) {
        self.router().disconnect(socket);
    }
}

/// Mock relay bound to a URL on a [`MockNetwork`]
///
/// # Example
/// ```
/// use nostr_relay_mock::{faker, MockClient, MockNetwork, MockRelay, PartialEvent};
///
/// # async fn example() -> nostr_relay_mock::Result<()> {
/// let network = MockNetwork::new();
/// let relay = MockRelay::bind(&network, "ws://relay.test")?;
/// let client = MockClient::connect(&network, "ws://relay.test")?;
///
/// client.send(&faker::to_relay::req("sub"))?;
/// relay.next().await?;
///
/// relay.emit_event("sub", PartialEvent::new().content("hello"));
/// let delivered = client.next().await?;
/// assert_eq!(delivered.subscription_id(), Some("sub"));
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct MockRelay {
    server: Arc<MockServer<RelayBehavior>>,
}

impl MockRelay {
    /// Bind a relay with default settings
    pub fn bind(network: &MockNetwork, url: &str) -> Result<Self> {
        Self::with_config(network, ServerConfig::with_url(url))
    }

    /// Bind a relay with custom configuration
    pub fn with_config(network: &MockNetwork, config: ServerConfig) -> Result<Self> {
        let server = MockServer::bind(network, config, RelayBehavior::new())?;
        Ok(Self { server })
    }

    /// The underlying server
    pub fn server(&self) -> &Arc<MockServer<RelayBehavior>> {
        &self.server
    }

    pub fn url(&self) -> &str {
        self.server.url()
    }

    /// Next message from any client, waiting up to the configured timeout
    pub async fn next(&self) -> Result<ClientMessage> {
        self.next_with_timeout(self.server.config().request_timeout)
            .await
    }

    pub async fn next_with_timeout(&self, timeout: Duration) -> Result<ClientMessage> {
        self.inbox()
            .request(timeout)
            .await
            .map_err(|e| Error::from_queue(e, "waiting for the next client message"))
    }

    /// Next `count` messages in arrival order, sharing one deadline
    pub async fn nexts(&self, count: usize) -> Result<Vec<ClientMessage>> {
        self.nexts_with_timeout(count, self.server.config().request_timeout)
            .await
    }

    pub async fn nexts_with_timeout(
        &self,
        count: usize,
        timeout: Duration,
    ) -> Result<Vec<ClientMessage>> {
        self.inbox()
            .request_n(count, timeout)
            .await
            .map_err(|e| Error::from_queue(e, "waiting for client messages"))
    }

    /// Wait for `count` clients to connect
    pub async fn wait_connected(&self, count: usize) -> Result<Vec<ServerSocket>> {
        self.server.wait_connected(count).await
    }

    /// The `index`th client to connect (zero-based)
    pub async fn socket(&self, index: usize) -> Result<ServerSocket> {
        self.server.socket(index).await
    }

    /// Send anything to every connected client, bypassing bookkeeping
    ///
    /// Returns the text that was sent.
    pub fn emit_to_all(&self, message: impl Into<WireMessage>) -> String {
        let text = message.into().into_text();
        let peers = self.behavior().router().peers().to_vec();

        tracing::debug!(recipients = peers.len(), "Raw emit to all");
        for socket in &peers {
            socket.send(text.as_str());
        }
        text
    }

    /// Send anything to one client, bypassing bookkeeping
    pub fn emit_to(&self, message: impl Into<WireMessage>, socket: &ServerSocket) -> String {
        let text = message.into().into_text();
        tracing::debug!(socket_id = socket.id(), "Raw emit");
        socket.send(text.as_str());
        text
    }

    /// Deliver an event to every client subscribed under `subscription_id`
    ///
    /// Subscriptions stay open.
    pub fn emit_event(
        &self,
        subscription_id: &str,
        event: impl Into<PartialEvent>,
    ) -> RelayMessage {
        let message = faker::to_client::event(subscription_id, event);
        let recipients = self.behavior().router().stream_recipients(subscription_id);
        self.fan_out(&message, &recipients);
        message
    }

    /// Send EOSE to every client subscribed under `subscription_id`
    ///
    /// EOSE does not close the subscription.
    pub fn emit_eose(&self, subscription_id: &str) -> RelayMessage {
        let message = faker::to_client::eose(subscription_id);
        let recipients = self.behavior().router().stream_recipients(subscription_id);
        self.fan_out(&message, &recipients);
        message
    }

    /// Answer every outstanding COUNT query under `subscription_id`
    ///
    /// Each query is answered once; repeating the call reaches nobody.
    /// `count` defaults to 0.
    pub fn emit_count(&self, subscription_id: &str, count: Option<u64>) -> RelayMessage {
        let message = faker::to_client::count(subscription_id, count.unwrap_or(0));
        let recipients = self
            .behavior()
            .router()
            .take_count_recipients(subscription_id);
        self.fan_out(&message, &recipients);
        message
    }

    /// Acknowledge `event_id` to every client that submitted it
    ///
    /// Each submission is acknowledged once. `message` defaults to `"*"`.
    pub fn emit_ok(&self, event_id: &str, accepted: bool, message: Option<&str>) -> RelayMessage {
        let message = faker::to_client::ok(event_id, accepted, message);
        let recipients = self.behavior().router().take_ack_recipients(event_id);
        self.fan_out(&message, &recipients);
        message
    }

    /// Ids a client currently holds for one kind of subscription
    pub fn subscriptions(&self, socket: &ServerSocket, kind: SubscriptionKind) -> Vec<String> {
        self.behavior().router().subscriptions(socket, kind)
    }

    /// Fail every connection with `reason`
    pub fn error(&self, reason: &str) {
        self.server.error(reason);
    }

    /// Disconnect every client, release the URL, and fail pending `next()`
    /// calls with a disposed error
    pub fn close(&self) {
        self.server.close();
        self.inbox().dispose();
    }

    pub(crate) fn inbox(&self) -> &RendezvousQueue<ClientMessage> {
        &self.behavior().inbox
    }

    fn behavior(&self) -> &RelayBehavior {
        self.server.behavior()
    }

    fn fan_out(&self, message: &RelayMessage, recipients: &[ServerSocket]) {
        tracing::debug!(
            kind = %message.kind(),
            sub_id = message.subscription_id().unwrap_or(""),
            recipients = recipients.len(),
            "Relay emit"
        );
        for socket in recipients {
            socket.send(message);
        }
    }
}

impl Drop for MockRelay {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::MessageError;
    use crate::transport::ClientSocket;

    const URL: &str = "ws://relay.test";

    /// Connect a raw client that records everything it receives
    fn raw_client(network: &MockNetwork) -> (ClientSocket, Arc<Mutex<Vec<String>>>) {
        let client = network.connect(URL).unwrap();
        let received = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&received);
        client.on_message(move |text| sink.lock().unwrap().push(text.to_string()));
        (client, received)
    }

    #[tokio::test]
    async fn test_next_returns_decoded_messages() {
        let network = MockNetwork::new();
        let relay = MockRelay::bind(&network, URL).unwrap();
        let (client, _) = raw_client(&network);

        client.send(r#"["REQ","sub",{"kinds":[1]}]"#).unwrap();
        client.send(r#"["CLOSE","sub"]"#).unwrap();

        assert_eq!(relay.next().await.unwrap().subscription_id(), Some("sub"));
        assert_eq!(relay.next().await.unwrap(), faker::to_relay::close("sub"));
    }

    #[tokio::test]
    async fn test_malformed_input_is_rejected() {
        let network = MockNetwork::new();
        let relay = MockRelay::bind(&network, URL).unwrap();
        let (client, _) = raw_client(&network);

        let err = client.send(r#"{"not":"an array"}"#).unwrap_err();
        assert!(matches!(err, Error::Message(MessageError::InvalidFormat(_))));
        assert!(relay.inbox().is_empty());
    }

    #[tokio::test]
    async fn test_routing_and_one_shot_replies() {
        let network = MockNetwork::new();
        let relay = MockRelay::bind(&network, URL).unwrap();
        let (client, received) = raw_client(&network);

        client.send(&faker::to_relay::req("s")).unwrap();
        client.send(&faker::to_relay::count("c")).unwrap();
        client.send(&faker::to_relay::event(PartialEvent::new().id("e"))).unwrap();

        relay.emit_event("s", PartialEvent::new());
        relay.emit_eose("s");
        relay.emit_count("c", Some(5));
        relay.emit_count("c", Some(6));
        relay.emit_ok("e", true, None);
        relay.emit_ok("e", true, None);
        relay.emit_event("other", PartialEvent::new());

        let received = received.lock().unwrap().clone();
        assert_eq!(received.len(), 4);
        assert!(received[0].starts_with(r#"["EVENT","s","#));
        assert_eq!(received[1], r#"["EOSE","s"]"#);
        assert_eq!(received[2], r#"["COUNT","c",{"count":5}]"#);
        assert_eq!(received[3], r#"["OK","e",true,"*"]"#);
    }

    #[tokio::test]
    async fn test_count_defaults_to_zero() {
        let network = MockNetwork::new();
        let relay = MockRelay::bind(&network, URL).unwrap();
        let (client, received) = raw_client(&network);

        client.send(&faker::to_relay::count("c")).unwrap();
        let sent = relay.emit_count("c", None);

        assert_eq!(sent, faker::to_client::count("c", 0));
        assert_eq!(
            *received.lock().unwrap(),
            vec![r#"["COUNT","c",{"count":0}]"#.to_string()]
        );
    }

    #[tokio::test]
    async fn test_raw_emit_leaves_bookkeeping() {
        let network = MockNetwork::new();
        let relay = MockRelay::bind(&network, URL).unwrap();
        let (client, received) = raw_client(&network);

        client.send(&faker::to_relay::event(PartialEvent::new().id("e"))).unwrap();
        let socket = relay.socket(0).await.unwrap();

        let sent = relay.emit_to(&faker::to_client::ok("e", true, None), &socket);
        assert_eq!(sent, r#"["OK","e",true,"*"]"#);
        assert_eq!(
            relay.subscriptions(&socket, SubscriptionKind::PendingAck),
            vec!["e".to_string()]
        );

        // The tracked emit still fires: a duplicate OK
        relay.emit_ok("e", true, None);
        assert_eq!(received.lock().unwrap().len(), 2);

        assert_eq!(relay.emit_to_all("plain text"), "plain text");
        assert_eq!(received.lock().unwrap()[2], "plain text");
    }

    #[tokio::test]
    async fn test_disconnect_stops_delivery() {
        let network = MockNetwork::new();
        let relay = MockRelay::bind(&network, URL).unwrap();
        let (client, received) = raw_client(&network);

        client.send(&faker::to_relay::req("s")).unwrap();
        client.close();

        relay.emit_event("s", PartialEvent::new());
        assert!(received.lock().unwrap().is_empty());
        assert!(!relay.server().sockets()[0].is_open());
    }

    #[tokio::test]
    async fn test_close_disposes_pending_next() {
        let network = MockNetwork::new();
        let relay = Arc::new(MockRelay::bind(&network, URL).unwrap());

        let waiting = {
            let relay = Arc::clone(&relay);
            tokio::spawn(async move { relay.next_with_timeout(Duration::from_secs(60)).await })
        };
        tokio::task::yield_now().await;
        while relay.inbox().pending_requests() == 0 {
            tokio::task::yield_now().await;
        }

        relay.close();
        let err = waiting.await.unwrap().unwrap_err();
        assert!(err.is_disposed());
        assert!(!network.is_bound(URL));
    }

    #[tokio::test(start_paused = true)]
    async fn test_next_times_out() {
        let network = MockNetwork::new();
        let relay = MockRelay::with_config(
            &network,
            ServerConfig::with_url(URL).request_timeout(Duration::from_millis(50)),
        )
        .unwrap();

        let err = relay.next().await.unwrap_err();
        assert!(err.is_timeout());
        assert!(matches!(err, Error::Timeout { timeout, .. } if timeout == Duration::from_millis(50)));
    }
}
