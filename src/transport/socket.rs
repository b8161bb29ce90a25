//! Connection handles for both ends of a simulated link

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError, Weak};

use crate::error::Result;
use crate::protocol::WireMessage;

use super::error::TransportError;

type MessageHandler = Arc<dyn Fn(&str) + Send + Sync>;
type CloseHandler = Arc<dyn Fn() + Send + Sync>;
type ErrorHandler = Arc<dyn Fn(&TransportError) + Send + Sync>;

/// Server side of the transport, as seen by a link
pub(crate) trait Endpoint: Send + Sync {
    /// Accept a new connection
    fn accept(&self) -> Result<ClientSocket>;

    /// Hand a client's text to the server
    fn deliver(&self, socket: &ServerSocket, text: &str) -> Result<()>;

    /// The connection behind `socket` has closed
    fn disconnected(&self, socket: &ServerSocket);

    /// The connection behind `socket` failed
    fn failed(&self, socket: &ServerSocket, error: &TransportError);
}

#[derive(Default)]
struct ClientHandlers {
    on_message: Vec<MessageHandler>,
    on_close: Vec<CloseHandler>,
    on_error: Vec<ErrorHandler>,
    /// Server sends that arrived before any message handler existed
    backlog: Vec<String>,
    /// Set while the backlog is handed out; new sends queue behind it
    flushing: bool,
}

/// Shared state of one connection
pub(crate) struct Link {
    id: u64,
    url: String,
    open: AtomicBool,
    server: Weak<dyn Endpoint>,
    client: Mutex<ClientHandlers>,
}

impl Link {
    pub(crate) fn new(id: u64, url: String, server: Weak<dyn Endpoint>) -> Arc<Self> {
        Arc::new(Self {
            id,
            url,
            open: AtomicBool::new(true),
            server,
            client: Mutex::new(ClientHandlers::default()),
        })
    }

    fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    fn handlers(&self) -> std::sync::MutexGuard<'_, ClientHandlers> {
        self.client.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Server → client
    fn send_to_client(&self, text: String) {
        let handlers = {
            let mut client = self.handlers();
            if client.on_message.is_empty() || client.flushing {
                client.backlog.push(text);
                return;
            }
            client.on_message.clone()
        };

        for handler in &handlers {
            handler(&text);
        }
    }

    /// Shut the link down from either side; later calls do nothing
    fn close(self: &Arc<Self>) {
        if !self.open.swap(false, Ordering::SeqCst) {
            return;
        }
        tracing::debug!(socket_id = self.id, url = %self.url, "Connection closed");

        if let Some(server) = self.server.upgrade() {
            server.disconnected(&ServerSocket::new(Arc::clone(self)));
        }

        let handlers = self.handlers().on_close.clone();
        for handler in &handlers {
            handler();
        }
    }

    /// Report an error to both sides, then close
    fn fail(self: &Arc<Self>, error: TransportError) {
        if !self.is_open() {
            return;
        }
        tracing::debug!(socket_id = self.id, error = %error, "Connection failed");

        if let Some(server) = self.server.upgrade() {
            server.failed(&ServerSocket::new(Arc::clone(self)), &error);
        }

        let handlers = self.handlers().on_error.clone();
        for handler in &handlers {
            handler(&error);
        }

        self.close();
    }
}

/// Server-side handle to one connected client
///
/// This is the peer identity the relay routes by: two handles are equal
/// exactly when they refer to the same connection.
#[derive(Clone)]
pub struct ServerSocket {
    link: Arc<Link>,
}

impl ServerSocket {
    pub(crate) fn new(link: Arc<Link>) -> Self {
        Self { link }
    }

    /// Sequential connection id, starting at 1 per server
    pub fn id(&self) -> u64 {
        self.link.id
    }

    /// Whether the connection is still open
    pub fn is_open(&self) -> bool {
        self.link.is_open()
    }

    /// Send to the client
    ///
    /// Text goes out as-is and anything else is JSON-encoded. Sending on a
    /// closed connection is silently ignored.
    pub fn send(&self, message: impl Into<WireMessage>) {
        if !self.is_open() {
            tracing::trace!(socket_id = self.id(), "Dropping send on closed socket");
            return;
        }
        let text = message.into().into_text();
        tracing::trace!(socket_id = self.id(), message = %text, "Server send");
        self.link.send_to_client(text);
    }

    /// Close the connection
    pub fn close(&self) {
        self.link.close();
    }

    /// Fail the connection with `reason`, then close it
    pub fn error(&self, reason: impl Into<String>) {
        self.link.fail(TransportError::Peer(reason.into()));
    }
}

impl PartialEq for ServerSocket {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.link, &other.link)
    }
}

impl Eq for ServerSocket {}

impl Hash for ServerSocket {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.link.id.hash(state);
    }
}

impl fmt::Debug for ServerSocket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerSocket")
            .field("id", &self.link.id)
            .field("open", &self.is_open())
            .finish()
    }
}

/// Client-side handle to a connection
#[derive(Clone)]
pub struct ClientSocket {
    link: Arc<Link>,
}

impl ClientSocket {
    pub(crate) fn new(link: Arc<Link>) -> Self {
        Self { link }
    }

    /// Normalised URL this socket connected to
    pub fn url(&self) -> &str {
        &self.link.url
    }

    pub fn is_open(&self) -> bool {
        self.link.is_open()
    }

    /// Send text to the server
    ///
    /// The server processes it before this returns; if the server rejects
    /// the payload, its error comes back here.
    pub fn send(&self, message: impl Into<WireMessage>) -> Result<()> {
        if !self.is_open() {
            return Err(TransportError::Closed.into());
        }
        let Some(server) = self.link.server.upgrade() else {
            return Err(TransportError::Closed.into());
        };

        let text = message.into().into_text();
        tracing::trace!(socket_id = self.link.id, message = %text, "Client send");
        server.deliver(&ServerSocket::new(Arc::clone(&self.link)), &text)
    }

    /// Register a handler for text sent by the server
    ///
    /// The first handler registered also receives anything the server sent
    /// before it existed.
    pub fn on_message(&self, handler: impl Fn(&str) + Send + Sync + 'static) {
        {
            let mut client = self.link.handlers();
            client.on_message.push(Arc::new(handler));
            if client.backlog.is_empty() || client.flushing {
                return;
            }
            client.flushing = true;
        }

        // Drain in batches; sends made meanwhile land in the backlog
        loop {
            let (handlers, batch) = {
                let mut client = self.link.handlers();
                if client.backlog.is_empty() {
                    client.flushing = false;
                    return;
                }
                (client.on_message.clone(), std::mem::take(&mut client.backlog))
            };

            for text in &batch {
                for handler in &handlers {
                    handler(text);
                }
            }
        }
    }

    /// Register a handler run once when the connection closes
    pub fn on_close(&self, handler: impl Fn() + Send + Sync + 'static) {
        self.link.handlers().on_close.push(Arc::new(handler));
    }

    /// Register a handler for transport errors
    pub fn on_error(&self, handler: impl Fn(&TransportError) + Send + Sync + 'static) {
        self.link.handlers().on_error.push(Arc::new(handler));
    }

    /// Close the connection
    pub fn close(&self) {
        self.link.close();
    }
}

impl fmt::Debug for ClientSocket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientSocket")
            .field("id", &self.link.id)
            .field("url", &self.link.url)
            .field("open", &self.is_open())
            .finish()
    }
}
