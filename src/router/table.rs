//! Per-kind subscription tables

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::hash::Hash;

/// The three kinds of tracked state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SubscriptionKind {
    /// REQ subscriptions, active until CLOSE or disconnect
    Stream,
    /// COUNT queries, answered at most once
    Count,
    /// Submitted events awaiting an OK, answered at most once
    PendingAck,
}

impl fmt::Display for SubscriptionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubscriptionKind::Stream => write!(f, "stream"),
            SubscriptionKind::Count => write!(f, "count"),
            SubscriptionKind::PendingAck => write!(f, "pending-ack"),
        }
    }
}

/// Mapping from peer to the set of ids it holds
#[derive(Debug, Clone)]
pub struct SubscriptionTable<P> {
    entries: HashMap<P, HashSet<String>>,
}

impl<P: Eq + Hash + Clone> SubscriptionTable<P> {
    /// Create an empty table
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Add an id for a peer, creating the peer's set if needed
    ///
    /// Returns false if the peer already held the id.
    pub fn insert(&mut self, peer: &P, id: &str) -> bool {
        self.entries
            .entry(peer.clone())
            .or_default()
            .insert(id.to_string())
    }

    /// Remove an id from one peer
    pub fn remove(&mut self, peer: &P, id: &str) -> bool {
        self.entries
            .get_mut(peer)
            .map(|ids| ids.remove(id))
            .unwrap_or(false)
    }

    /// Remove an id from every peer that holds it
    pub fn remove_everywhere(&mut self, id: &str) {
        for ids in self.entries.values_mut() {
            ids.remove(id);
        }
    }

    /// Drop everything held by a peer
    pub fn remove_peer(&mut self, peer: &P) -> usize {
        self.entries.remove(peer).map(|ids| ids.len()).unwrap_or(0)
    }

    /// Whether a peer holds an id
    pub fn contains(&self, peer: &P, id: &str) -> bool {
        self.entries
            .get(peer)
            .map(|ids| ids.contains(id))
            .unwrap_or(false)
    }

    /// Ids held by a peer, sorted
    pub fn ids(&self, peer: &P) -> Vec<String> {
        let mut ids: Vec<String> = self
            .entries
            .get(peer)
            .map(|ids| ids.iter().cloned().collect())
            .unwrap_or_default();
        ids.sort();
        ids
    }

    /// Whether the table has an entry (possibly empty) for a peer
    pub fn has_peer(&self, peer: &P) -> bool {
        self.entries.contains_key(peer)
    }
}

impl<P: Eq + Hash + Clone> Default for SubscriptionTable<P> {
    fn default() -> Self {
        Self::new()
    }
}
