//! Mock Nostr relay and clients for deterministic protocol tests
//!
//! Everything runs in-process on a [`MockNetwork`]: a [`MockRelay`] binds a
//! `ws://` URL, [`MockClient`]s connect to it, and both sides queue what
//! they receive so tests can await messages one at a time.
//!
//! ```text
//!   MockClient ──send──► MockRelay ──► inbox (RendezvousQueue) ──► relay.next()
//!                            │
//!                            └─► SubscriptionRouter (REQ / COUNT / pending OK)
//!                                      │
//!   client.next() ◄── inbox ◄──────────┘ emit_event / emit_eose / emit_count / emit_ok
//! ```
//!
//! # Example
//! ```
//! use nostr_relay_mock::{faker, MockClient, MockNetwork, MockRelay, PartialEvent};
//!
//! # async fn example() -> nostr_relay_mock::Result<()> {
//! let network = MockNetwork::new();
//! let relay = MockRelay::bind(&network, "ws://relay.test")?;
//! let client = MockClient::connect(&network, "ws://relay.test")?;
//!
//! client.send(&faker::to_relay::req("feed"))?;
//! assert_eq!(relay.next().await?, faker::to_relay::req("feed"));
//!
//! relay.emit_event("feed", PartialEvent::new().content("gm"));
//! relay.emit_eose("feed");
//! let messages = client.nexts(2).await?;
//! assert_eq!(messages[1], faker::to_client::eose("feed"));
//! # Ok(())
//! # }
//! ```
//!
//! # Modules
//!
//! - [`queue`]: rendezvous queue pairing arrivals with waiting consumers
//! - [`router`]: per-peer subscription bookkeeping and fan-out
//! - [`protocol`]: the tagged-array message vocabulary
//! - [`transport`]: in-process WebSocket stand-in
//! - [`server`] / [`client`]: the relay and client endpoints
//! - [`faker`] / [`matcher`]: sample messages and assertion predicates

pub mod client;
pub mod error;
pub mod faker;
pub mod matcher;
pub mod protocol;
pub mod queue;
pub mod router;
pub mod server;
pub mod transport;

pub use client::{ClientConfig, ClientSpy, MockClient, SpyListener};
pub use error::{Error, Result};
pub use matcher::{MatchOutcome, Matcher, MessageSource};
pub use protocol::{ClientMessage, Event, Filter, MessageError, MessageKind, PartialEvent, RelayMessage};
pub use queue::{QueueError, RendezvousQueue};
pub use router::{SubscriptionKind, SubscriptionRouter};
pub use server::{MockRelay, MockServer, ServerBehavior, ServerConfig};
pub use transport::{ClientSocket, MockNetwork, ServerSocket, TransportError};
