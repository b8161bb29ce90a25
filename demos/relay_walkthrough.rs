//! Walk through a relay conversation with two clients
//!
//! Run with: cargo run --example relay_walkthrough
//!
//! Set `RUST_LOG=nostr_relay_mock=trace` to see every send on the mock
//! network.

use std::time::Duration;

use nostr_relay_mock::{faker, matcher, ClientSpy, MockClient, MockNetwork, MockRelay, PartialEvent};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("nostr_relay_mock=debug".parse()?),
        )
        .init();

    let network = MockNetwork::new();
    let relay = MockRelay::bind(&network, "ws://relay.example")?;
    println!("Relay listening on {}", relay.url());

    let alice = MockClient::connect(&network, "ws://relay.example")?;
    let bob = MockClient::connect(&network, "ws://relay.example")?;
    let spy = ClientSpy::attach(bob.socket());

    // Both clients subscribe under the same id
    alice.send(&faker::to_relay::req("feed"))?;
    bob.send(&faker::to_relay::req("feed"))?;
    for message in relay.nexts(2).await? {
        println!("relay <- {message}");
    }

    let event = relay.emit_event("feed", PartialEvent::new().kind(1).content("gm"));
    println!("relay -> {event}");
    relay.emit_eose("feed");

    println!("alice <- {}", alice.next().await?);
    println!("bob   <- {}", bob.next().await?);
    println!("spy   <- {}", spy.next().await?);

    // Publishing gets exactly one OK
    alice.send(&faker::to_relay::event(PartialEvent::new().id("note-1")))?;
    relay.next().await?;
    relay.emit_ok("note-1", true, Some(""));
    relay.emit_ok("note-1", true, Some("duplicate"));

    let outcome = matcher::receive(
        &alice,
        &matcher::to_client::eose_id("feed"),
        Duration::from_millis(100),
    )
    .await?;
    println!("alice got EOSE: {}", outcome.passed());

    let outcome = matcher::receive(
        &alice,
        &matcher::to_client::ok_with("note-1", true, Some("")),
        Duration::from_millis(100),
    )
    .await?;
    println!("alice got one OK: {}", outcome.passed());

    let outcome = matcher::receive(&alice, &matcher::to_client::ok(), Duration::from_millis(100)).await?;
    println!("second OK timed out: {}", outcome.is_timeout());

    // Closing stops delivery to alice only
    alice.send(&faker::to_relay::close("feed"))?;
    relay.next().await?;
    relay.emit_event("feed", PartialEvent::new().content("still here?"));

    println!("bob   <- {}", bob.nexts(2).await?.last().map(ToString::to_string).unwrap_or_default());
    println!(
        "alice idle: {}",
        alice.next_with_timeout(Duration::from_millis(50)).await.is_err()
    );

    relay.close();
    println!("Relay closed; bob connected: {}", bob.is_connected());
    Ok(())
}
