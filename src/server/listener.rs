//! Mock server
//!
//! Binds a URL on a [`MockNetwork`], accepts connections, and forwards
//! connection events to a [`ServerBehavior`].

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, Weak};
use std::time::Duration;

use tokio::sync::watch;

use crate::error::{Error, Result};
use crate::server::config::ServerConfig;
use crate::server::handler::ServerBehavior;
use crate::transport::socket::{Endpoint, Link};
use crate::transport::{ClientSocket, MockNetwork, ServerSocket, TransportError};

/// Mock WebSocket server
pub struct MockServer<B: ServerBehavior> {
    config: ServerConfig,
    behavior: B,
    network: MockNetwork,
    /// Normalised URL and the binding token that releases it
    url: String,
    token: u64,
    this: Weak<Self>,
    next_socket_id: AtomicU64,
    /// Every accepted socket, in connection order, including closed ones
    sockets: Mutex<Vec<ServerSocket>>,
    connected: watch::Sender<usize>,
    closed: AtomicBool,
}

impl<B: ServerBehavior> MockServer<B> {
    /// Bind a server to `config.url`
    pub fn bind(network: &MockNetwork, config: ServerConfig, behavior: B) -> Result<Arc<Self>> {
        // The network holds a weak handle, which only exists inside
        // new_cyclic; a failed bind is reported once construction is done.
        let mut bind_error = None;

        let server = Arc::new_cyclic(|this: &Weak<Self>| {
            let endpoint: Weak<dyn Endpoint> = this.clone();
            let (url, token) = match network.bind(&config.url, endpoint) {
                Ok(bound) => bound,
                Err(e) => {
                    bind_error = Some(e);
                    (config.url.clone(), 0)
                }
            };

            Self {
                config,
                behavior,
                network: network.clone(),
                url,
                token,
                this: this.clone(),
                next_socket_id: AtomicU64::new(1),
                sockets: Mutex::new(Vec::new()),
                connected: watch::channel(0).0,
                closed: AtomicBool::new(false),
            }
        });

        if let Some(e) = bind_error {
            tracing::warn!(url = %server.url, error = %e, "Bind failed");
            return Err(e.into());
        }
        tracing::info!(url = %server.url, "Mock server listening");
        Ok(server)
    }

    /// Normalised URL this server is bound to
    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn behavior(&self) -> &B {
        &self.behavior
    }

    /// Every socket accepted so far, in connection order
    pub fn sockets(&self) -> Vec<ServerSocket> {
        self.lock_sockets().clone()
    }

    /// Number of currently open connections
    pub fn open_connections(&self) -> usize {
        self.lock_sockets().iter().filter(|s| s.is_open()).count()
    }

    /// Wait until at least `count` connections have been accepted
    ///
    /// Gives up after `connect_timeout`.
    pub async fn wait_connected(&self, count: usize) -> Result<Vec<ServerSocket>> {
        let timeout = self.config.connect_timeout;
        self.wait_connected_with_timeout(count, timeout).await
    }

    pub async fn wait_connected_with_timeout(
        &self,
        count: usize,
        timeout: Duration,
    ) -> Result<Vec<ServerSocket>> {
        let mut rx = self.connected.subscribe();
        let waited = tokio::time::timeout(timeout, rx.wait_for(|n| *n >= count))
            .await
            .map(|seen| seen.map(|_| ()));

        match waited {
            Ok(Ok(_)) => Ok(self.sockets()),
            // Sender lives as long as self, so this cannot really happen
            Ok(Err(_)) => Err(TransportError::Closed.into()),
            Err(_) => {
                tracing::debug!(
                    url = %self.url,
                    expected = count,
                    connected = *self.connected.borrow(),
                    "Timed out waiting for connections"
                );
                Err(Error::Timeout {
                    context: "waiting for connections",
                    timeout,
                })
            }
        }
    }

    /// The socket accepted `index`th (zero-based), waiting for it if needed
    pub async fn socket(&self, index: usize) -> Result<ServerSocket> {
        let sockets = self.wait_connected(index + 1).await?;
        sockets
            .get(index)
            .cloned()
            .ok_or_else(|| TransportError::Closed.into())
    }

    /// Fail every open connection with `reason`
    pub fn error(&self, reason: &str) {
        tracing::info!(url = %self.url, reason = reason, "Failing all connections");
        for socket in self.sockets() {
            socket.error(reason);
        }
    }

    /// Close every connection and release the URL
    ///
    /// Safe to call more than once.
    pub fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.network.unbind(&self.url, self.token);

        for socket in self.sockets() {
            socket.close();
        }
        tracing::info!(url = %self.url, "Mock server closed");
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn lock_sockets(&self) -> std::sync::MutexGuard<'_, Vec<ServerSocket>> {
        self.sockets.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<B: ServerBehavior> Endpoint for MockServer<B> {
    fn accept(&self) -> Result<ClientSocket> {
        if self.is_closed() {
            return Err(TransportError::ConnectionRefused(self.url.clone()).into());
        }

        let (socket, link, total) = {
            let mut sockets = self.lock_sockets();

            // Check connection limit
            let max = self.config.max_connections;
            if max > 0 && sockets.iter().filter(|s| s.is_open()).count() >= max {
                tracing::warn!(url = %self.url, limit = max, "Connection rejected: limit reached");
                return Err(TransportError::ConnectionLimit(max).into());
            }

            let socket_id = self.next_socket_id.fetch_add(1, Ordering::Relaxed);
            let endpoint: Weak<dyn Endpoint> = self.this.clone();
            let link = Link::new(socket_id, self.url.clone(), endpoint);
            let socket = ServerSocket::new(Arc::clone(&link));
            sockets.push(socket.clone());
            (socket, link, sockets.len())
        };

        tracing::debug!(socket_id = socket.id(), url = %self.url, "New connection");
        self.connected.send_replace(total);
        self.behavior.on_open(&socket);

        Ok(ClientSocket::new(link))
    }

    fn deliver(&self, socket: &ServerSocket, text: &str) -> Result<()> {
        self.behavior.on_message(socket, text)
    }

    fn disconnected(&self, socket: &ServerSocket) {
        self.behavior.on_close(socket);
    }

    fn failed(&self, socket: &ServerSocket, error: &TransportError) {
        self.behavior.on_error(socket, error);
    }
}

impl<B: ServerBehavior> fmt::Debug for MockServer<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MockServer")
            .field("url", &self.url)
            .field("connections", &*self.connected.borrow())
            .field("closed", &self.is_closed())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    /// Records every hook call as a string
    #[derive(Default)]
    struct Recorder {
        calls: Mutex<Vec<String>>,
    }

    impl Recorder {
        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }

        fn record(&self, call: String) {
            self.calls.lock().unwrap().push(call);
        }
    }

    impl ServerBehavior for Recorder {
        fn on_open(&self, socket: &ServerSocket) {
            self.record(format!("open {}", socket.id()));
        }

        fn on_message(&self, socket: &ServerSocket, message: &str) -> Result<()> {
            self.record(format!("message {} {}", socket.id(), message));
            socket.send(format!("echo {message}"));
            Ok(())
        }

        fn on_close(&self, socket: &ServerSocket) {
            self.record(format!("close {}", socket.id()));
        }

        fn on_error(&self, socket: &ServerSocket, error: &TransportError) {
            self.record(format!("error {} {}", socket.id(), error));
        }
    }

    fn bind(network: &MockNetwork) -> Arc<MockServer<Recorder>> {
        MockServer::bind(
            network,
            ServerConfig::with_url("ws://relay.test"),
            Recorder::default(),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_lifecycle_hooks_in_order() {
        let network = MockNetwork::new();
        let server = bind(&network);

        let client = network.connect("ws://relay.test/").unwrap();
        let received = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&received);
        client.on_message(move |text| sink.lock().unwrap().push(text.to_string()));

        client.send("hi").unwrap();
        client.close();
        client.close();

        assert_eq!(
            server.behavior().calls(),
            vec!["open 1", "message 1 hi", "close 1"]
        );
        assert_eq!(*received.lock().unwrap(), vec!["echo hi"]);
        assert!(matches!(
            client.send("again"),
            Err(Error::Transport(TransportError::Closed))
        ));
    }

    #[tokio::test]
    async fn test_sends_before_handler_are_kept() {
        let network = MockNetwork::new();
        let server = bind(&network);
        let client = network.connect("ws://relay.test").unwrap();

        let socket = server.socket(0).await.unwrap();
        socket.send("early");

        let received = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&received);
        client.on_message(move |text| sink.lock().unwrap().push(text.to_string()));
        socket.send("late");

        assert_eq!(*received.lock().unwrap(), vec!["early", "late"]);
    }

    #[tokio::test]
    async fn test_backlog_is_flushed_before_newer_sends() {
        let network = MockNetwork::new();
        let server = bind(&network);
        let client = network.connect("ws://relay.test").unwrap();

        let socket = server.socket(0).await.unwrap();
        socket.send("first");
        socket.send("second");

        // The handler answers the first backlogged message while the rest of
        // the backlog is still pending
        let received = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&received);
        let replier = socket.clone();
        client.on_message(move |text| {
            sink.lock().unwrap().push(text.to_string());
            if text == "first" {
                replier.send("reply");
            }
        });

        assert_eq!(*received.lock().unwrap(), vec!["first", "second", "reply"]);

        socket.send("after");
        assert_eq!(
            *received.lock().unwrap(),
            vec!["first", "second", "reply", "after"]
        );
    }

    #[tokio::test]
    async fn test_socket_ids_are_sequential() {
        let network = MockNetwork::new();
        let server = bind(&network);

        let _a = network.connect("ws://relay.test").unwrap();
        let _b = network.connect("ws://relay.test").unwrap();

        let sockets = server.wait_connected(2).await.unwrap();
        let ids: Vec<u64> = sockets.iter().map(|s| s.id()).collect();
        assert_eq!(ids, vec![1, 2]);
        assert_eq!(server.socket(1).await.unwrap().id(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_connected_times_out() {
        let network = MockNetwork::new();
        let server = bind(&network);
        let _a = network.connect("ws://relay.test").unwrap();

        let err = server.wait_connected(2).await.unwrap_err();
        assert!(err.is_timeout());
    }

    #[tokio::test]
    async fn test_wait_connected_wakes_on_connect() {
        let network = MockNetwork::new();
        let server = bind(&network);

        let connector = network.clone();
        let handle = tokio::spawn(async move {
            tokio::task::yield_now().await;
            connector.connect("ws://relay.test").unwrap()
        });

        let sockets = server.wait_connected(1).await.unwrap();
        assert_eq!(sockets.len(), 1);
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_connection_limit() {
        let network = MockNetwork::new();
        let server = MockServer::bind(
            &network,
            ServerConfig::with_url("ws://relay.test").max_connections(1),
            (),
        )
        .unwrap();

        let first = network.connect("ws://relay.test").unwrap();
        assert!(matches!(
            network.connect("ws://relay.test"),
            Err(Error::Transport(TransportError::ConnectionLimit(1)))
        ));

        // Closing frees the slot
        first.close();
        assert!(network.connect("ws://relay.test").is_ok());
        assert_eq!(server.open_connections(), 1);
    }

    #[tokio::test]
    async fn test_error_notifies_both_sides() {
        let network = MockNetwork::new();
        let server = bind(&network);
        let client = network.connect("ws://relay.test").unwrap();

        let errors = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&errors);
        client.on_error(move |e| sink.lock().unwrap().push(e.clone()));
        let closed = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&closed);
        client.on_close(move || flag.store(true, Ordering::SeqCst));

        server.error("boom");

        assert_eq!(
            *errors.lock().unwrap(),
            vec![TransportError::Peer("boom".into())]
        );
        assert!(closed.load(Ordering::SeqCst));
        assert_eq!(
            server.behavior().calls(),
            vec!["open 1", "error 1 peer error: boom", "close 1"]
        );
    }

    #[tokio::test]
    async fn test_close_releases_url() {
        let network = MockNetwork::new();
        let server = bind(&network);
        let client = network.connect("ws://relay.test").unwrap();

        assert!(matches!(
            MockServer::bind(&network, ServerConfig::with_url("ws://relay.test"), ()),
            Err(Error::Transport(TransportError::AddressInUse(_)))
        ));

        server.close();
        assert!(!client.is_open());
        assert!(!network.is_bound("ws://relay.test"));
        assert!(network.connect("ws://relay.test").is_err());

        // The URL can be reused afterwards
        let again = MockServer::bind(&network, ServerConfig::with_url("ws://relay.test"), ());
        assert!(again.is_ok());
    }
}
