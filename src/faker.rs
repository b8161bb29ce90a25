//! Sample messages for tests
//!
//! Every constructor returns a well-formed message with placeholder values
//! (`"*"` for strings, `0` for numbers) unless told otherwise. Events take
//! anything convertible to a [`PartialEvent`], so a full [`Event`] works as
//! well as a handful of overrides.

use crate::protocol::constants::{CLIENT_AUTH_KIND, WILDCARD};
use crate::protocol::{Event, Filter, PartialEvent};

/// Placeholder event
pub fn event() -> Event {
    Event {
        id: WILDCARD.to_string(),
        pubkey: WILDCARD.to_string(),
        created_at: 0,
        kind: 0,
        tags: Vec::new(),
        content: WILDCARD.to_string(),
        sig: WILDCARD.to_string(),
    }
}

/// Placeholder event with some fields replaced
pub fn event_with(overrides: impl Into<PartialEvent>) -> Event {
    overrides.into().apply_to(event())
}

/// `{"kinds": [0]}`
pub fn filter() -> Filter {
    Filter::new().kinds([0])
}

pub fn filters() -> Vec<Filter> {
    vec![filter()]
}

/// Client → relay messages
pub mod to_relay {
    use super::*;
    use crate::protocol::ClientMessage;

    /// `["REQ", sub_id, {"kinds": [0]}]`
    pub fn req(subscription_id: impl Into<String>) -> ClientMessage {
        req_with(subscription_id, filters())
    }

    pub fn req_with(subscription_id: impl Into<String>, filters: Vec<Filter>) -> ClientMessage {
        ClientMessage::Req {
            subscription_id: subscription_id.into(),
            filters,
        }
    }

    pub fn close(subscription_id: impl Into<String>) -> ClientMessage {
        ClientMessage::Close {
            subscription_id: subscription_id.into(),
        }
    }

    /// `["COUNT", sub_id, {"kinds": [0]}]`
    pub fn count(subscription_id: impl Into<String>) -> ClientMessage {
        count_with(subscription_id, filters())
    }

    pub fn count_with(subscription_id: impl Into<String>, filters: Vec<Filter>) -> ClientMessage {
        ClientMessage::Count {
            subscription_id: subscription_id.into(),
            filters,
        }
    }

    pub fn event(overrides: impl Into<PartialEvent>) -> ClientMessage {
        ClientMessage::Event(event_with(overrides))
    }

    /// Authentication event; the kind is always the client-auth kind
    pub fn auth(overrides: impl Into<PartialEvent>) -> ClientMessage {
        let mut event = event_with(overrides);
        event.kind = CLIENT_AUTH_KIND;
        ClientMessage::Auth(event)
    }
}

/// Relay → client messages
pub mod to_client {
    use super::*;
    use crate::protocol::RelayMessage;

    pub fn event(subscription_id: impl Into<String>, overrides: impl Into<PartialEvent>) -> RelayMessage {
        RelayMessage::Event {
            subscription_id: subscription_id.into(),
            event: event_with(overrides),
        }
    }

    pub fn eose(subscription_id: impl Into<String>) -> RelayMessage {
        RelayMessage::Eose {
            subscription_id: subscription_id.into(),
        }
    }

    pub fn count(subscription_id: impl Into<String>, count: u64) -> RelayMessage {
        RelayMessage::Count {
            subscription_id: subscription_id.into(),
            count,
        }
    }

    /// `["OK", event_id, accepted, message]`, message defaulting to `"*"`
    pub fn ok(event_id: impl Into<String>, accepted: bool, message: Option<&str>) -> RelayMessage {
        RelayMessage::Ok {
            event_id: event_id.into(),
            accepted,
            message: Some(message.unwrap_or(WILDCARD).to_string()),
        }
    }

    pub fn notice(message: Option<&str>) -> RelayMessage {
        RelayMessage::Notice {
            message: message.unwrap_or(WILDCARD).to_string(),
        }
    }

    pub fn auth(challenge: Option<&str>) -> RelayMessage {
        RelayMessage::Auth {
            challenge: challenge.unwrap_or(WILDCARD).to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_placeholder_event() {
        assert_eq!(
            serde_json::to_value(event()).unwrap(),
            json!({
                "id": "*", "pubkey": "*", "created_at": 0, "kind": 0,
                "tags": [], "content": "*", "sig": "*"
            })
        );
    }

    #[test]
    fn test_overrides() {
        let event = event_with(PartialEvent::new().kind(1).content("hello"));

        assert_eq!(event.kind, 1);
        assert_eq!(event.content, "hello");
        assert_eq!(event.id, "*");
    }

    #[test]
    fn test_to_relay_shapes() {
        assert_eq!(to_relay::req("sub").to_value(), json!(["REQ", "sub", { "kinds": [0] }]));
        assert_eq!(to_relay::count("sub").to_value(), json!(["COUNT", "sub", { "kinds": [0] }]));
        assert_eq!(to_relay::close("sub").to_value(), json!(["CLOSE", "sub"]));

        let auth = to_relay::auth(PartialEvent::new().kind(1));
        assert_eq!(auth.to_value()[1]["kind"], json!(CLIENT_AUTH_KIND));
    }

    #[test]
    fn test_to_client_shapes() {
        assert_eq!(to_client::eose("sub").to_value(), json!(["EOSE", "sub"]));
        assert_eq!(
            to_client::count("sub", 3).to_value(),
            json!(["COUNT", "sub", { "count": 3 }])
        );
        assert_eq!(
            to_client::ok("id", true, None).to_value(),
            json!(["OK", "id", true, "*"])
        );
        assert_eq!(to_client::notice(Some("hi")).to_value(), json!(["NOTICE", "hi"]));
        assert_eq!(to_client::auth(None).to_value(), json!(["AUTH", "*"]));
    }
}
