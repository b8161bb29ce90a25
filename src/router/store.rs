//! Subscription router implementation
//!
//! Observes inbound client messages per peer and answers "who should receive
//! this?" for id-addressed outbound messages. The router never sends anything
//! itself; the relay takes the recipient list and sends outside any lock.

use std::fmt;
use std::hash::Hash;

use crate::protocol::ClientMessage;

use super::table::{SubscriptionKind, SubscriptionTable};

/// Per-peer subscription bookkeeping
///
/// `P` is an opaque peer handle (the relay uses its server sockets). Peers
/// are kept in registration order, which is the order recipients are
/// returned in.
#[derive(Debug, Clone)]
pub struct SubscriptionRouter<P> {
    /// Registered peers, oldest first
    peers: Vec<P>,

    /// REQ subscriptions
    streams: SubscriptionTable<P>,

    /// COUNT queries awaiting their single reply
    counts: SubscriptionTable<P>,

    /// Submitted event ids awaiting their single OK
    pending_acks: SubscriptionTable<P>,
}

impl<P> SubscriptionRouter<P>
where
    P: Clone + Eq + Hash + fmt::Debug,
{
    /// Create an empty router
    pub fn new() -> Self {
        Self {
            peers: Vec::new(),
            streams: SubscriptionTable::new(),
            counts: SubscriptionTable::new(),
            pending_acks: SubscriptionTable::new(),
        }
    }

    /// Register a newly connected peer
    ///
    /// Registering the same peer twice keeps its original position.
    pub fn connect(&mut self, peer: P) {
        if self.peers.contains(&peer) {
            return;
        }
        tracing::trace!(peer = ?peer, "Peer registered");
        self.peers.push(peer);
    }

    /// Forget a peer and everything it subscribed to
    pub fn disconnect(&mut self, peer: &P) {
        let before = self.peers.len();
        self.peers.retain(|p| p != peer);

        let streams = self.streams.remove_peer(peer);
        let counts = self.counts.remove_peer(peer);
        let acks = self.pending_acks.remove_peer(peer);

        if before != self.peers.len() {
            tracing::debug!(
                peer = ?peer,
                streams = streams,
                counts = counts,
                pending_acks = acks,
                "Peer disconnected"
            );
        }
    }

    /// Update bookkeeping for a message received from `peer`
    ///
    /// Messages from a peer that never connected register it first.
    pub fn observe(&mut self, peer: &P, message: &ClientMessage) {
        if !self.peers.contains(peer) {
            tracing::trace!(peer = ?peer, "Message from unregistered peer");
            self.peers.push(peer.clone());
        }

        match message {
            ClientMessage::Req {
                subscription_id, ..
            } => {
                self.streams.insert(peer, subscription_id);
                tracing::debug!(peer = ?peer, sub_id = %subscription_id, "Stream subscription opened");
            }
            ClientMessage::Close { subscription_id } => {
                if self.streams.remove(peer, subscription_id) {
                    tracing::debug!(peer = ?peer, sub_id = %subscription_id, "Stream subscription closed");
                }
            }
            ClientMessage::Count {
                subscription_id, ..
            } => {
                self.counts.insert(peer, subscription_id);
                tracing::debug!(peer = ?peer, sub_id = %subscription_id, "Count query registered");
            }
            ClientMessage::Event(event) => {
                self.pending_acks.insert(peer, &event.id);
                tracing::debug!(peer = ?peer, event_id = %event.id, "Event awaiting acknowledgement");
            }
            ClientMessage::Auth(_) => {}
        }
    }

    /// Peers whose stream subscriptions include `subscription_id`
    ///
    /// Stream subscriptions are left in place.
    pub fn stream_recipients(&self, subscription_id: &str) -> Vec<P> {
        self.recipients(&self.streams, subscription_id)
    }

    /// Peers waiting on a count for `subscription_id`, releasing the query
    ///
    /// A second call for the same id returns nobody.
    pub fn take_count_recipients(&mut self, subscription_id: &str) -> Vec<P> {
        let recipients = self.recipients(&self.counts, subscription_id);
        self.counts.remove_everywhere(subscription_id);
        recipients
    }

    /// Peers waiting on an OK for `event_id`, releasing the entry
    pub fn take_ack_recipients(&mut self, event_id: &str) -> Vec<P> {
        let recipients = self.recipients(&self.pending_acks, event_id);
        self.pending_acks.remove_everywhere(event_id);
        recipients
    }

    /// All registered peers, in registration order
    pub fn peers(&self) -> &[P] {
        &self.peers
    }

    /// Whether a peer is registered
    pub fn is_connected(&self, peer: &P) -> bool {
        self.peers.contains(peer)
    }

    /// Ids a peer currently holds for one kind, sorted
    pub fn subscriptions(&self, peer: &P, kind: SubscriptionKind) -> Vec<String> {
        self.table(kind).ids(peer)
    }

    fn table(&self, kind: SubscriptionKind) -> &SubscriptionTable<P> {
        match kind {
            SubscriptionKind::Stream => &self.streams,
            SubscriptionKind::Count => &self.counts,
            SubscriptionKind::PendingAck => &self.pending_acks,
        }
    }

    fn recipients(&self, table: &SubscriptionTable<P>, id: &str) -> Vec<P> {
        self.peers
            .iter()
            .filter(|peer| table.contains(peer, id))
            .cloned()
            .collect()
    }
}

impl<P> Default for SubscriptionRouter<P>
where
    P: Clone + Eq + Hash + fmt::Debug,
{
    fn default() -> Self {
        Self::new()
    }
}
