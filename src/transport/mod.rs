//! In-process stand-in for a WebSocket transport
//!
//! Servers bind to a `ws://` or `wss://` URL on a [`MockNetwork`]; clients
//! connect to the same URL on the same network. Nothing touches the OS
//! network stack.
//!
//! ```text
//!   ClientSocket ──send──►  Link  ──ServerBehavior::on_message──► relay
//!        ▲                   │
//!        └──on_message◄──────┘◄──────────── ServerSocket::send
//! ```
//!
//! Delivery is synchronous: `send` runs the receiving side's handlers before
//! it returns. Handlers are always called without any transport lock held, so
//! a handler may send, close, or register further handlers.

pub mod error;
pub mod network;
pub mod socket;

pub use error::TransportError;
pub use network::MockNetwork;
pub use socket::{ClientSocket, ServerSocket};
