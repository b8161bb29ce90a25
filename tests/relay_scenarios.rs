//! End-to-end relay behavior

mod common;

use std::sync::Arc;
use std::time::Duration;

use nostr_relay_mock::{
    faker, ClientMessage, Error, MessageError, PartialEvent, RelayMessage, SubscriptionKind,
};

use common::{client, relay, WAIT};

#[tokio::test]
async fn test_single_client_stream_lifecycle() {
    let (network, relay) = relay();
    let client = client(&network);

    client.send(&faker::to_relay::req("x")).unwrap();
    assert_eq!(relay.next().await.unwrap(), faker::to_relay::req("x"));

    let evt = PartialEvent::new().id("e1").content("first");
    let sent = relay.emit_event("x", evt.clone());
    assert_eq!(client.next().await.unwrap(), sent);
    assert_eq!(sent, faker::to_client::event("x", evt));

    relay.emit_eose("x");
    assert_eq!(client.next().await.unwrap(), faker::to_client::eose("x"));

    client.send(&faker::to_relay::close("x")).unwrap();
    assert_eq!(relay.next().await.unwrap(), faker::to_relay::close("x"));

    relay.emit_event("x", PartialEvent::new().id("e2"));
    assert!(client.next().await.unwrap_err().is_timeout());
}

#[tokio::test]
async fn test_two_clients_share_a_subscription_id() {
    let (network, relay) = relay();
    let alice = client(&network);
    let bob = client(&network);

    alice.send(&faker::to_relay::req("common")).unwrap();
    bob.send(&faker::to_relay::req("common")).unwrap();
    relay.nexts(2).await.unwrap();

    let sent = relay.emit_event("common", PartialEvent::new().content("hello"));

    assert_eq!(alice.next().await.unwrap(), sent);
    assert_eq!(bob.next().await.unwrap(), sent);
}

#[tokio::test]
async fn test_stream_survives_eose_and_many_events() {
    let (network, relay) = relay();
    let client = client(&network);
    client.send(&faker::to_relay::req("s")).unwrap();

    relay.emit_eose("s");
    for i in 0..5 {
        relay.emit_event("s", PartialEvent::new().created_at(i));
    }

    let messages = client.nexts(6).await.unwrap();
    assert_eq!(messages[0], faker::to_client::eose("s"));
    let times: Vec<u64> = messages[1..]
        .iter()
        .map(|m| match m {
            RelayMessage::Event { event, .. } => event.created_at,
            other => panic!("unexpected {other}"),
        })
        .collect();
    assert_eq!(times, vec![0, 1, 2, 3, 4]);
}

#[tokio::test]
async fn test_disconnected_client_gets_nothing() {
    let (network, relay) = relay();
    let leaving = client(&network);
    let staying = client(&network);

    leaving.send(&faker::to_relay::req("s")).unwrap();
    staying.send(&faker::to_relay::req("s")).unwrap();
    let leaving_socket = relay.socket(0).await.unwrap();

    leaving.socket().close();
    assert!(relay.subscriptions(&leaving_socket, SubscriptionKind::Stream).is_empty());

    relay.emit_event("s", PartialEvent::new());
    assert!(staying.next().await.is_ok());
    assert!(leaving.next().await.unwrap_err().is_timeout());
}

#[tokio::test]
async fn test_count_is_answered_once() {
    let (network, relay) = relay();
    let a = client(&network);
    let b = client(&network);

    a.send(&faker::to_relay::count("c")).unwrap();
    b.send(&faker::to_relay::count("c")).unwrap();

    relay.emit_count("c", Some(10));
    relay.emit_count("c", Some(11));

    assert_eq!(a.next().await.unwrap(), faker::to_client::count("c", 10));
    assert_eq!(b.next().await.unwrap(), faker::to_client::count("c", 10));
    assert!(a.next().await.unwrap_err().is_timeout());
}

#[tokio::test]
async fn test_ok_goes_to_the_submitter_once() {
    let (network, relay) = relay();
    let submitter = client(&network);
    let bystander = client(&network);

    submitter
        .send(&faker::to_relay::event(PartialEvent::new().id("e1")))
        .unwrap();
    relay.next().await.unwrap();

    let sent = relay.emit_ok("e1", false, Some("blocked: spam"));
    relay.emit_ok("e1", true, None);

    assert_eq!(submitter.next().await.unwrap(), sent);
    assert!(submitter.next().await.unwrap_err().is_timeout());
    assert!(bystander.next().await.unwrap_err().is_timeout());
}

#[tokio::test]
async fn test_raw_ok_does_not_release_the_pending_ack() {
    let (network, relay) = relay();
    let client = client(&network);
    client
        .send(&faker::to_relay::event(PartialEvent::new().id("e1")))
        .unwrap();

    relay.emit_to_all(&faker::to_client::ok("e1", true, None));
    relay.emit_ok("e1", true, None);

    // Two OKs for one event
    let messages = client.nexts(2).await.unwrap();
    assert_eq!(messages[0], messages[1]);
}

#[tokio::test]
async fn test_raw_emit_sends_text_verbatim() {
    let (network, relay) = relay();
    let a = client(&network);
    let b = client(&network);

    let text = relay.emit_to_all(r#"["NOTICE","maintenance"]"#);
    assert_eq!(text, r#"["NOTICE","maintenance"]"#);
    assert_eq!(a.next().await.unwrap(), faker::to_client::notice(Some("maintenance")));
    assert_eq!(b.next().await.unwrap(), faker::to_client::notice(Some("maintenance")));

    let only_b = relay.socket(1).await.unwrap();
    relay.emit_to(&faker::to_client::auth(Some("challenge")), &only_b);
    assert_eq!(b.next().await.unwrap(), faker::to_client::auth(Some("challenge")));
    assert!(a.next().await.unwrap_err().is_timeout());
}

#[tokio::test]
async fn test_malformed_payloads_surface_immediately() {
    let (network, relay) = relay();
    let client = client(&network);

    let err = client.send_raw("[]").unwrap_err();
    assert!(matches!(err, Error::Message(MessageError::InvalidFormat(_))));

    let err = client.send_raw(r#"["PING"]"#).unwrap_err();
    assert!(matches!(err, Error::Message(MessageError::UnknownType(_))));

    let err = client.send_raw(r#"["REQ"]"#).unwrap_err();
    assert!(matches!(err, Error::Message(MessageError::MissingField(_))));

    // Nothing was queued or tracked
    assert!(relay.next().await.unwrap_err().is_timeout());
}

#[tokio::test]
async fn test_nexts_preserves_arrival_order() {
    let (network, relay) = relay();
    let client = client(&network);

    let sent = vec![
        faker::to_relay::req("a"),
        faker::to_relay::count("b"),
        faker::to_relay::close("a"),
        faker::to_relay::auth(PartialEvent::new()),
    ];
    for message in &sent {
        client.send(message).unwrap();
    }

    assert_eq!(relay.nexts(4).await.unwrap(), sent);
}

#[tokio::test]
async fn test_nexts_timeout_keeps_partial_batch() {
    let (network, relay) = relay();
    let client = client(&network);
    client.send(&faker::to_relay::req("a")).unwrap();

    let err = relay.nexts(2).await.unwrap_err();
    assert!(err.is_timeout());

    // The one message that did arrive is still there
    assert_eq!(relay.next().await.unwrap(), faker::to_relay::req("a"));
}

#[tokio::test]
async fn test_message_sent_from_another_task() {
    let (network, relay) = relay();
    let client = Arc::new(client(&network));

    let sender = Arc::clone(&client);
    let task = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(10)).await;
        sender.send(&faker::to_relay::req("late")).unwrap();
    });

    let received = relay.next_with_timeout(WAIT * 5).await.unwrap();
    assert!(matches!(received, ClientMessage::Req { ref subscription_id, .. } if subscription_id == "late"));
    task.await.unwrap();
}

#[tokio::test]
async fn test_relay_close_disconnects_and_unbinds() {
    let (network, relay) = relay();
    let client = client(&network);

    relay.close();

    assert!(!client.is_connected());
    assert!(!network.is_bound(common::URL));
    assert!(relay.next().await.unwrap_err().is_timeout());
}
