//! Message predicates
//!
//! Matching is done on the JSON form, so it works the same for typed
//! messages, raw values, and anything else that serializes to a tagged
//! array. Only the tag is checked for kind; fields left unspecified match
//! anything.

use serde::Serialize;
use serde_json::{json, Value};

use crate::protocol::constants::WILDCARD;
use crate::protocol::{Filter, MessageKind, PartialEvent};

use super::outcome::MatchOutcome;

/// What a matcher requires beyond the tag
#[derive(Debug, Clone, PartialEq)]
enum Expect {
    /// Tag only
    Any,
    /// Second element equals the text (subscription id, challenge, notice)
    Text(String),
    /// REQ / COUNT with optional filters
    Query {
        subscription_id: String,
        filters: Option<Vec<Filter>>,
    },
    /// EVENT / AUTH carrying an event in the second element
    Event(PartialEvent),
    /// EVENT delivery with optional event fields
    Delivery {
        subscription_id: String,
        event: Option<PartialEvent>,
    },
    /// COUNT response with optional count
    Count {
        subscription_id: String,
        count: Option<u64>,
    },
    Ack {
        event_id: String,
        accepted: bool,
        message: Option<String>,
    },
}

/// Predicate for one message kind
#[derive(Debug, Clone, PartialEq)]
pub struct Matcher {
    kind: MessageKind,
    expect: Expect,
}

impl Matcher {
    fn new(kind: MessageKind, expect: Expect) -> Self {
        Self { kind, expect }
    }

    pub fn kind(&self) -> MessageKind {
        self.kind
    }

    /// `a to-relay-REQ message`
    pub fn entity(&self) -> String {
        format!("a {} message", self.kind)
    }

    /// The shape this matcher expects, with `"*"` for unconstrained parts
    pub fn expected(&self) -> Value {
        let tag = self.kind.tag();
        let any = Value::from(WILDCARD);

        match &self.expect {
            Expect::Any => match self.kind {
                MessageKind::StreamRequest
                | MessageKind::CountRequest
                | MessageKind::EventDelivery
                | MessageKind::CountResponse => json!([tag, any, any]),
                MessageKind::Acknowledgement => json!([tag, any, any, any]),
                _ => json!([tag, any]),
            },
            Expect::Text(text) => json!([tag, text]),
            Expect::Query {
                subscription_id,
                filters,
            } => {
                let mut items = vec![Value::from(tag), Value::from(subscription_id.as_str())];
                match filters {
                    Some(filters) => items.extend(filters.iter().map(|f| json!(f))),
                    None => items.push(any),
                }
                Value::Array(items)
            }
            Expect::Event(event) => json!([tag, event]),
            Expect::Delivery {
                subscription_id,
                event,
            } => match event {
                Some(event) => json!([tag, subscription_id, event]),
                None => json!([tag, subscription_id, any]),
            },
            Expect::Count {
                subscription_id,
                count,
            } => match count {
                Some(count) => json!([tag, subscription_id, { "count": count }]),
                None => json!([tag, subscription_id, any]),
            },
            Expect::Ack {
                event_id,
                accepted,
                message,
            } => json!([tag, event_id, accepted, message.as_deref().unwrap_or(WILDCARD)]),
        }
    }

    /// Whether `actual` satisfies this matcher
    pub fn matches(&self, actual: &Value) -> bool {
        let Some(items) = actual.as_array() else {
            return false;
        };
        if items.first().and_then(Value::as_str) != Some(self.kind.tag()) {
            return false;
        }
        let field = |index: usize| items.get(index);

        match &self.expect {
            Expect::Any => true,
            Expect::Text(text) => field(1).and_then(Value::as_str) == Some(text.as_str()),
            Expect::Query {
                subscription_id,
                filters,
            } => {
                field(1).and_then(Value::as_str) == Some(subscription_id.as_str())
                    && filters.as_ref().map_or(true, |filters| {
                        let expected: Vec<Value> = filters.iter().map(|f| json!(f)).collect();
                        items[2..] == expected[..]
                    })
            }
            Expect::Event(event) => field(1).map_or(false, |value| event.matches_value(value)),
            Expect::Delivery {
                subscription_id,
                event,
            } => {
                field(1).and_then(Value::as_str) == Some(subscription_id.as_str())
                    && event.as_ref().map_or(true, |event| {
                        field(2).map_or(false, |value| event.matches_value(value))
                    })
            }
            Expect::Count {
                subscription_id,
                count,
            } => {
                field(1).and_then(Value::as_str) == Some(subscription_id.as_str())
                    && count.map_or(true, |count| field(2) == Some(&json!({ "count": count })))
            }
            Expect::Ack {
                event_id,
                accepted,
                message,
            } => {
                field(1).and_then(Value::as_str) == Some(event_id.as_str())
                    && field(2).and_then(Value::as_bool) == Some(*accepted)
                    && message.as_ref().map_or(true, |message| {
                        field(3).and_then(Value::as_str) == Some(message.as_str())
                    })
            }
        }
    }

    /// Evaluate against anything serializable
    ///
    /// Values that fail to serialize are evaluated as `null`.
    pub fn evaluate<T: Serialize + ?Sized>(&self, actual: &T) -> MatchOutcome {
        let actual = serde_json::to_value(actual).unwrap_or(Value::Null);
        MatchOutcome::evaluated(self.matches(&actual), self.entity(), self.expected(), actual)
    }
}

/// Predicates for client → relay messages
pub mod to_relay {
    use super::*;

    /// Any `["REQ", ...]`
    pub fn req() -> Matcher {
        Matcher::new(MessageKind::StreamRequest, Expect::Any)
    }

    /// `["REQ", sub_id, ...]` with any filters
    pub fn req_id(subscription_id: impl Into<String>) -> Matcher {
        Matcher::new(
            MessageKind::StreamRequest,
            Expect::Query {
                subscription_id: subscription_id.into(),
                filters: None,
            },
        )
    }

    /// `["REQ", sub_id, filters...]` with exactly these filters
    pub fn req_with(subscription_id: impl Into<String>, filters: Vec<Filter>) -> Matcher {
        Matcher::new(
            MessageKind::StreamRequest,
            Expect::Query {
                subscription_id: subscription_id.into(),
                filters: Some(filters),
            },
        )
    }

    pub fn close() -> Matcher {
        Matcher::new(MessageKind::StreamClose, Expect::Any)
    }

    pub fn close_id(subscription_id: impl Into<String>) -> Matcher {
        Matcher::new(MessageKind::StreamClose, Expect::Text(subscription_id.into()))
    }

    pub fn count() -> Matcher {
        Matcher::new(MessageKind::CountRequest, Expect::Any)
    }

    pub fn count_id(subscription_id: impl Into<String>) -> Matcher {
        Matcher::new(
            MessageKind::CountRequest,
            Expect::Query {
                subscription_id: subscription_id.into(),
                filters: None,
            },
        )
    }

    pub fn count_with(subscription_id: impl Into<String>, filters: Vec<Filter>) -> Matcher {
        Matcher::new(
            MessageKind::CountRequest,
            Expect::Query {
                subscription_id: subscription_id.into(),
                filters: Some(filters),
            },
        )
    }

    pub fn event() -> Matcher {
        Matcher::new(MessageKind::EventSubmission, Expect::Any)
    }

    /// `["EVENT", event]` where the event has the given fields
    pub fn event_with(event: impl Into<PartialEvent>) -> Matcher {
        Matcher::new(MessageKind::EventSubmission, Expect::Event(event.into()))
    }

    pub fn auth() -> Matcher {
        Matcher::new(MessageKind::Authentication, Expect::Any)
    }

    pub fn auth_with(event: impl Into<PartialEvent>) -> Matcher {
        Matcher::new(MessageKind::Authentication, Expect::Event(event.into()))
    }
}

/// Predicates for relay → client messages
pub mod to_client {
    use super::*;

    pub fn event() -> Matcher {
        Matcher::new(MessageKind::EventDelivery, Expect::Any)
    }

    pub fn event_id(subscription_id: impl Into<String>) -> Matcher {
        Matcher::new(
            MessageKind::EventDelivery,
            Expect::Delivery {
                subscription_id: subscription_id.into(),
                event: None,
            },
        )
    }

    /// `["EVENT", sub_id, event]` where the event has the given fields
    pub fn event_with(subscription_id: impl Into<String>, event: impl Into<PartialEvent>) -> Matcher {
        Matcher::new(
            MessageKind::EventDelivery,
            Expect::Delivery {
                subscription_id: subscription_id.into(),
                event: Some(event.into()),
            },
        )
    }

    pub fn eose() -> Matcher {
        Matcher::new(MessageKind::EndOfStream, Expect::Any)
    }

    pub fn eose_id(subscription_id: impl Into<String>) -> Matcher {
        Matcher::new(MessageKind::EndOfStream, Expect::Text(subscription_id.into()))
    }

    pub fn count() -> Matcher {
        Matcher::new(MessageKind::CountResponse, Expect::Any)
    }

    pub fn count_id(subscription_id: impl Into<String>) -> Matcher {
        Matcher::new(
            MessageKind::CountResponse,
            Expect::Count {
                subscription_id: subscription_id.into(),
                count: None,
            },
        )
    }

    pub fn count_with(subscription_id: impl Into<String>, count: u64) -> Matcher {
        Matcher::new(
            MessageKind::CountResponse,
            Expect::Count {
                subscription_id: subscription_id.into(),
                count: Some(count),
            },
        )
    }

    pub fn ok() -> Matcher {
        Matcher::new(MessageKind::Acknowledgement, Expect::Any)
    }

    /// `["OK", event_id, accepted, message]`; `None` accepts any message
    pub fn ok_with(event_id: impl Into<String>, accepted: bool, message: Option<&str>) -> Matcher {
        Matcher::new(
            MessageKind::Acknowledgement,
            Expect::Ack {
                event_id: event_id.into(),
                accepted,
                message: message.map(str::to_string),
            },
        )
    }

    pub fn notice() -> Matcher {
        Matcher::new(MessageKind::Notice, Expect::Any)
    }

    pub fn notice_with(message: impl Into<String>) -> Matcher {
        Matcher::new(MessageKind::Notice, Expect::Text(message.into()))
    }

    pub fn auth() -> Matcher {
        Matcher::new(MessageKind::Challenge, Expect::Any)
    }

    pub fn auth_with(challenge: impl Into<String>) -> Matcher {
        Matcher::new(MessageKind::Challenge, Expect::Text(challenge.into()))
    }
}
