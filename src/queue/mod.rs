//! Rendezvous queue for pairing arriving messages with waiting consumers
//!
//! Both sides of a simulated connection need the same primitive: messages
//! arrive whenever the peer sends them, and test code asks for "the next one"
//! whenever it gets around to it. Whichever side shows up first waits for the
//! other.
//!
//! # States
//!
//! ```text
//!              push                       request
//!   ┌───────┐ ─────► ┌──────────────┐    ┌───────┐ ─────► ┌──────────────────┐
//!   │ Empty │        │ Buffered([m])│    │ Empty │        │ Awaiting([req])  │
//!   └───────┘ ◄───── └──────────────┘    └───────┘ ◄───── └──────────────────┘
//!            request drains                        push / timeout drains
//! ```
//!
//! A queue is never buffered and awaiting at the same time: an arriving item
//! always goes to the oldest waiter first.

pub mod error;
pub mod rendezvous;

pub use error::QueueError;
pub use rendezvous::{QueueStatus, RendezvousQueue, DEFAULT_REQUEST_TIMEOUT};
