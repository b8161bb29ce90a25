//! Event records
//!
//! The mock never verifies ids or signatures, so every field is plain data.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::constants::EVENT_KEYS;

/// A Nostr event as it appears on the wire
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub id: String,
    pub pubkey: String,
    pub created_at: u64,
    pub kind: u16,
    pub tags: Vec<Vec<String>>,
    pub content: String,
    pub sig: String,
}

/// An event with only some fields specified
///
/// Used both to override fixture defaults and to describe the fields an
/// assertion cares about. Unset fields are left alone / not compared.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartialEvent {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pubkey: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<Vec<String>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sig: Option<String>,
}

impl PartialEvent {
    /// Create an empty partial event
    pub fn new() -> Self {
        Self::default()
    }

    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn pubkey(mut self, pubkey: impl Into<String>) -> Self {
        self.pubkey = Some(pubkey.into());
        self
    }

    pub fn created_at(mut self, created_at: u64) -> Self {
        self.created_at = Some(created_at);
        self
    }

    pub fn kind(mut self, kind: u16) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn tags(mut self, tags: Vec<Vec<String>>) -> Self {
        self.tags = Some(tags);
        self
    }

    pub fn content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }

    pub fn sig(mut self, sig: impl Into<String>) -> Self {
        self.sig = Some(sig.into());
        self
    }

    /// Fill the unset fields from `base`
    pub fn apply_to(self, base: Event) -> Event {
        Event {
            id: self.id.unwrap_or(base.id),
            pubkey: self.pubkey.unwrap_or(base.pubkey),
            created_at: self.created_at.unwrap_or(base.created_at),
            kind: self.kind.unwrap_or(base.kind),
            tags: self.tags.unwrap_or(base.tags),
            content: self.content.unwrap_or(base.content),
            sig: self.sig.unwrap_or(base.sig),
        }
    }

    /// Check a received JSON value against the fields set here
    ///
    /// The value must look like an event (an object carrying every event
    /// key) even when no field is set.
    pub fn matches_value(&self, received: &Value) -> bool {
        let Some(object) = received.as_object() else {
            return false;
        };
        if !EVENT_KEYS.iter().all(|key| object.contains_key(*key)) {
            return false;
        }

        match serde_json::to_value(self) {
            Ok(Value::Object(expected)) => expected
                .iter()
                .all(|(key, value)| object.get(key) == Some(value)),
            _ => false,
        }
    }

    /// Check a decoded event against the fields set here
    pub fn matches(&self, event: &Event) -> bool {
        serde_json::to_value(event)
            .map(|value| self.matches_value(&value))
            .unwrap_or(false)
    }
}

impl From<Event> for PartialEvent {
    fn from(event: Event) -> Self {
        Self {
            id: Some(event.id),
            pubkey: Some(event.pubkey),
            created_at: Some(event.created_at),
            kind: Some(event.kind),
            tags: Some(event.tags),
            content: Some(event.content),
            sig: Some(event.sig),
        }
    }
}
