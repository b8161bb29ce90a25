//! Subscription bookkeeping and fan-out routing
//!
//! The router decides which connected peers receive an outbound message that
//! is addressed by subscription id (or event id) rather than by connection.
//! One relay commonly serves several test clients at once, and every client
//! that subscribed under an id must see the traffic for that id.
//!
//! # Tables
//!
//! ```text
//!                    SubscriptionRouter<P>
//!   ┌──────────────────────────────────────────────────┐
//!   │ peers:        [P1, P2, ...]   (connection order) │
//!   │ streams:      P → {sub ids}   REQ .. CLOSE       │
//!   │ counts:       P → {sub ids}   COUNT .. one reply │
//!   │ pending_acks: P → {event ids} EVENT .. one OK    │
//!   └──────────────────────────────────────────────────┘
//! ```
//!
//! Bookkeeping never fails: closing an unknown id, subscribing twice, or
//! hearing from a peer that never connected are all tolerated.

pub mod store;
pub mod table;

pub use store::SubscriptionRouter;
pub use table::{SubscriptionKind, SubscriptionTable};
