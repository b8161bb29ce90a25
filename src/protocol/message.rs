//! Tagged-array messages in both directions

use std::fmt;

use serde::{Serialize, Serializer};
use serde_json::{json, Value};

use super::constants::{AUTH, CLOSE, COUNT, EOSE, EVENT, NOTICE, OK, REQ};
use super::error::MessageError;
use super::event::Event;
use super::filter::Filter;

/// The fixed protocol vocabulary, with direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKind {
    /// `["REQ", sub, filter...]`
    StreamRequest,
    /// `["CLOSE", sub]`
    StreamClose,
    /// `["COUNT", sub, filter...]`
    CountRequest,
    /// `["EVENT", event]`
    EventSubmission,
    /// `["AUTH", event]`
    Authentication,
    /// `["EVENT", sub, event]`
    EventDelivery,
    /// `["EOSE", sub]`
    EndOfStream,
    /// `["COUNT", sub, {"count": n}]`
    CountResponse,
    /// `["OK", event_id, accepted, message]`
    Acknowledgement,
    /// `["AUTH", challenge]`
    Challenge,
    /// `["NOTICE", message]`
    Notice,
}

impl MessageKind {
    /// The wire tag in the first array slot
    pub fn tag(self) -> &'static str {
        match self {
            MessageKind::StreamRequest => REQ,
            MessageKind::StreamClose => CLOSE,
            MessageKind::CountRequest | MessageKind::CountResponse => COUNT,
            MessageKind::EventSubmission | MessageKind::EventDelivery => EVENT,
            MessageKind::Authentication | MessageKind::Challenge => AUTH,
            MessageKind::EndOfStream => EOSE,
            MessageKind::Acknowledgement => OK,
            MessageKind::Notice => NOTICE,
        }
    }

    /// Whether clients send this kind to relays
    pub fn is_to_relay(self) -> bool {
        matches!(
            self,
            MessageKind::StreamRequest
                | MessageKind::StreamClose
                | MessageKind::CountRequest
                | MessageKind::EventSubmission
                | MessageKind::Authentication
        )
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let direction = if self.is_to_relay() { "to-relay" } else { "to-client" };
        write!(f, "{}-{}", direction, self.tag())
    }
}

/// Messages sent from client to relay
#[derive(Debug, Clone, PartialEq)]
pub enum ClientMessage {
    /// Publish an event: `["EVENT", <event>]`
    Event(Event),

    /// Subscribe to events: `["REQ", <subscription_id>, <filter>...]`
    Req {
        subscription_id: String,
        filters: Vec<Filter>,
    },

    /// Close a subscription: `["CLOSE", <subscription_id>]`
    Close { subscription_id: String },

    /// Ask for a count (NIP-45): `["COUNT", <subscription_id>, <filter>...]`
    Count {
        subscription_id: String,
        filters: Vec<Filter>,
    },

    /// Authenticate (NIP-42): `["AUTH", <event>]`
    Auth(Event),
}

impl ClientMessage {
    pub fn kind(&self) -> MessageKind {
        match self {
            ClientMessage::Event(_) => MessageKind::EventSubmission,
            ClientMessage::Req { .. } => MessageKind::StreamRequest,
            ClientMessage::Close { .. } => MessageKind::StreamClose,
            ClientMessage::Count { .. } => MessageKind::CountRequest,
            ClientMessage::Auth(_) => MessageKind::Authentication,
        }
    }

    /// Subscription id carried by REQ, CLOSE and COUNT
    pub fn subscription_id(&self) -> Option<&str> {
        match self {
            ClientMessage::Req {
                subscription_id, ..
            }
            | ClientMessage::Close { subscription_id }
            | ClientMessage::Count {
                subscription_id, ..
            } => Some(subscription_id),
            ClientMessage::Event(_) | ClientMessage::Auth(_) => None,
        }
    }

    /// Build the tagged JSON array
    pub fn to_value(&self) -> Value {
        match self {
            ClientMessage::Event(event) => json!([EVENT, event]),
            ClientMessage::Req {
                subscription_id,
                filters,
            } => with_filters(REQ, subscription_id, filters),
            ClientMessage::Close { subscription_id } => json!([CLOSE, subscription_id]),
            ClientMessage::Count {
                subscription_id,
                filters,
            } => with_filters(COUNT, subscription_id, filters),
            ClientMessage::Auth(event) => json!([AUTH, event]),
        }
    }

    /// Serialize to the text sent over the wire
    pub fn to_json(&self) -> String {
        self.to_value().to_string()
    }

    /// Decode a tagged JSON array
    pub fn from_value(value: Value) -> Result<Self, MessageError> {
        let (tag, mut fields) = Fields::new(value)?;

        match tag.as_str() {
            EVENT => Ok(ClientMessage::Event(fields.event("event")?)),
            REQ => Ok(ClientMessage::Req {
                subscription_id: fields.string("subscription_id")?,
                filters: fields.filters()?,
            }),
            CLOSE => Ok(ClientMessage::Close {
                subscription_id: fields.string("subscription_id")?,
            }),
            COUNT => Ok(ClientMessage::Count {
                subscription_id: fields.string("subscription_id")?,
                filters: fields.filters()?,
            }),
            AUTH => Ok(ClientMessage::Auth(fields.event("event")?)),
            other => Err(MessageError::UnknownType(other.to_string())),
        }
    }

    /// Decode wire text
    pub fn from_json(json: &str) -> Result<Self, MessageError> {
        Self::from_value(serde_json::from_str(json)?)
    }
}

/// Messages sent from relay to client
#[derive(Debug, Clone, PartialEq)]
pub enum RelayMessage {
    /// Event matching a subscription: `["EVENT", <subscription_id>, <event>]`
    Event {
        subscription_id: String,
        event: Event,
    },

    /// End of stored events: `["EOSE", <subscription_id>]`
    Eose { subscription_id: String },

    /// Count response (NIP-45): `["COUNT", <subscription_id>, {"count": <n>}]`
    Count { subscription_id: String, count: u64 },

    /// Command result: `["OK", <event_id>, <true|false>, <message>]`
    ///
    /// Relays may leave the message off; it is then `None` and stays off
    /// when re-encoded.
    Ok {
        event_id: String,
        accepted: bool,
        message: Option<String>,
    },

    /// Authentication challenge (NIP-42): `["AUTH", <challenge>]`
    Auth { challenge: String },

    /// Human-readable notice: `["NOTICE", <message>]`
    Notice { message: String },
}

impl RelayMessage {
    pub fn kind(&self) -> MessageKind {
        match self {
            RelayMessage::Event { .. } => MessageKind::EventDelivery,
            RelayMessage::Eose { .. } => MessageKind::EndOfStream,
            RelayMessage::Count { .. } => MessageKind::CountResponse,
            RelayMessage::Ok { .. } => MessageKind::Acknowledgement,
            RelayMessage::Auth { .. } => MessageKind::Challenge,
            RelayMessage::Notice { .. } => MessageKind::Notice,
        }
    }

    /// Subscription id carried by EVENT, EOSE and COUNT
    pub fn subscription_id(&self) -> Option<&str> {
        match self {
            RelayMessage::Event {
                subscription_id, ..
            }
            | RelayMessage::Eose { subscription_id }
            | RelayMessage::Count {
                subscription_id, ..
            } => Some(subscription_id),
            _ => None,
        }
    }

    /// Build the tagged JSON array
    pub fn to_value(&self) -> Value {
        match self {
            RelayMessage::Event {
                subscription_id,
                event,
            } => json!([EVENT, subscription_id, event]),
            RelayMessage::Eose { subscription_id } => json!([EOSE, subscription_id]),
            RelayMessage::Count {
                subscription_id,
                count,
            } => json!([COUNT, subscription_id, { "count": count }]),
            RelayMessage::Ok {
                event_id,
                accepted,
                message,
            } => match message {
                Some(message) => json!([OK, event_id, accepted, message]),
                None => json!([OK, event_id, accepted]),
            },
            RelayMessage::Auth { challenge } => json!([AUTH, challenge]),
            RelayMessage::Notice { message } => json!([NOTICE, message]),
        }
    }

    /// Serialize to the text sent over the wire
    pub fn to_json(&self) -> String {
        self.to_value().to_string()
    }

    /// Decode a tagged JSON array
    pub fn from_value(value: Value) -> Result<Self, MessageError> {
        let (tag, mut fields) = Fields::new(value)?;

        match tag.as_str() {
            EVENT => Ok(RelayMessage::Event {
                subscription_id: fields.string("subscription_id")?,
                event: fields.event("event")?,
            }),
            EOSE => Ok(RelayMessage::Eose {
                subscription_id: fields.string("subscription_id")?,
            }),
            COUNT => Ok(RelayMessage::Count {
                subscription_id: fields.string("subscription_id")?,
                count: fields.count()?,
            }),
            OK => Ok(RelayMessage::Ok {
                event_id: fields.string("event_id")?,
                accepted: fields.boolean("accepted")?,
                message: fields.optional_string("message")?,
            }),
            AUTH => Ok(RelayMessage::Auth {
                challenge: fields.string("challenge")?,
            }),
            NOTICE => Ok(RelayMessage::Notice {
                message: fields.string("message")?,
            }),
            other => Err(MessageError::UnknownType(other.to_string())),
        }
    }

    /// Decode wire text
    pub fn from_json(json: &str) -> Result<Self, MessageError> {
        Self::from_value(serde_json::from_str(json)?)
    }
}

impl Serialize for ClientMessage {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_value().serialize(serializer)
    }
}

impl Serialize for RelayMessage {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_value().serialize(serializer)
    }
}

impl fmt::Display for ClientMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_value())
    }
}

impl fmt::Display for RelayMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_value())
    }
}

/// Anything that can be pushed onto a socket unchecked
///
/// Text is sent as-is; everything else is JSON-encoded first.
#[derive(Debug, Clone, PartialEq)]
pub enum WireMessage {
    Text(String),
    Json(Value),
}

impl WireMessage {
    /// The exact text that goes on the wire
    pub fn into_text(self) -> String {
        match self {
            WireMessage::Text(text) => text,
            WireMessage::Json(value) => value.to_string(),
        }
    }
}

impl From<&str> for WireMessage {
    fn from(text: &str) -> Self {
        WireMessage::Text(text.to_string())
    }
}

impl From<String> for WireMessage {
    fn from(text: String) -> Self {
        WireMessage::Text(text)
    }
}

impl From<Value> for WireMessage {
    fn from(value: Value) -> Self {
        WireMessage::Json(value)
    }
}

impl From<RelayMessage> for WireMessage {
    fn from(message: RelayMessage) -> Self {
        WireMessage::Json(message.to_value())
    }
}

impl From<&RelayMessage> for WireMessage {
    fn from(message: &RelayMessage) -> Self {
        WireMessage::Json(message.to_value())
    }
}

impl From<ClientMessage> for WireMessage {
    fn from(message: ClientMessage) -> Self {
        WireMessage::Json(message.to_value())
    }
}

impl From<&ClientMessage> for WireMessage {
    fn from(message: &ClientMessage) -> Self {
        WireMessage::Json(message.to_value())
    }
}

fn with_filters(tag: &str, subscription_id: &str, filters: &[Filter]) -> Value {
    let mut items = Vec::with_capacity(filters.len() + 2);
    items.push(Value::from(tag));
    items.push(Value::from(subscription_id));
    items.extend(filters.iter().map(|filter| json!(filter)));
    Value::Array(items)
}

/// Cursor over the elements following the tag
struct Fields {
    rest: std::vec::IntoIter<Value>,
}

impl Fields {
    /// Split a tagged array into its tag and the remaining elements
    fn new(value: Value) -> Result<(String, Self), MessageError> {
        let Value::Array(items) = value else {
            return Err(MessageError::InvalidFormat("expected a JSON array".to_string()));
        };

        let mut rest = items.into_iter();
        let tag = match rest.next() {
            Some(Value::String(tag)) => tag,
            Some(_) => {
                return Err(MessageError::InvalidFormat(
                    "first element not a string".to_string(),
                ))
            }
            None => return Err(MessageError::InvalidFormat("empty array".to_string())),
        };

        Ok((tag, Self { rest }))
    }

    fn next(&mut self, name: &'static str) -> Result<Value, MessageError> {
        self.rest.next().ok_or(MessageError::MissingField(name))
    }

    fn string(&mut self, name: &'static str) -> Result<String, MessageError> {
        match self.next(name)? {
            Value::String(s) => Ok(s),
            _ => Err(MessageError::InvalidFormat(format!("{name} not a string"))),
        }
    }

    fn optional_string(&mut self, name: &'static str) -> Result<Option<String>, MessageError> {
        match self.rest.next() {
            None => Ok(None),
            Some(Value::String(s)) => Ok(Some(s)),
            Some(_) => Err(MessageError::InvalidFormat(format!("{name} not a string"))),
        }
    }

    fn boolean(&mut self, name: &'static str) -> Result<bool, MessageError> {
        self.next(name)?
            .as_bool()
            .ok_or_else(|| MessageError::InvalidFormat(format!("{name} not a boolean")))
    }

    fn event(&mut self, name: &'static str) -> Result<Event, MessageError> {
        Ok(serde_json::from_value(self.next(name)?)?)
    }

    fn count(&mut self) -> Result<u64, MessageError> {
        self.next("count")?
            .get("count")
            .and_then(Value::as_u64)
            .ok_or_else(|| MessageError::InvalidFormat("expected {\"count\": <n>}".to_string()))
    }

    fn filters(self) -> Result<Vec<Filter>, MessageError> {
        self.rest
            .map(|value| serde_json::from_value(value).map_err(MessageError::from))
            .collect()
    }
}
