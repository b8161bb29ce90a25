//! Waiting for a message and matching it

use std::future::Future;
use std::time::Duration;

use serde::Serialize;
use serde_json::Value;

use crate::client::{ClientSpy, MockClient};
use crate::error::{Error, Result};
use crate::protocol::MessageError;
use crate::queue::RendezvousQueue;
use crate::server::MockRelay;

use super::outcome::MatchOutcome;
use super::predicate::Matcher;

/// Anything that hands out received messages one at a time
pub trait MessageSource {
    /// Wait up to `timeout` for the next message, as JSON
    fn next_value(&self, timeout: Duration) -> impl Future<Output = Result<Value>> + Send;
}

impl MessageSource for MockRelay {
    async fn next_value(&self, timeout: Duration) -> Result<Value> {
        Ok(self.next_with_timeout(timeout).await?.to_value())
    }
}

impl MessageSource for MockClient {
    async fn next_value(&self, timeout: Duration) -> Result<Value> {
        Ok(self.next_with_timeout(timeout).await?.to_value())
    }
}

impl MessageSource for ClientSpy {
    async fn next_value(&self, timeout: Duration) -> Result<Value> {
        Ok(self.next_with_timeout(timeout).await?.to_value())
    }
}

impl<T: Serialize + Send> MessageSource for RendezvousQueue<T> {
    async fn next_value(&self, timeout: Duration) -> Result<Value> {
        let item = self.request(timeout).await?;
        serde_json::to_value(item).map_err(|e| Error::Message(MessageError::Json(e)))
    }
}

/// Take the next message from `source` and evaluate `matcher` against it
///
/// A timeout becomes a failed outcome saying nothing arrived. Every other
/// error, including disposal, is returned unchanged.
///
/// # Example
/// ```
/// use std::time::Duration;
///
/// use nostr_relay_mock::{faker, matcher, MockClient, MockNetwork, MockRelay};
///
/// # async fn example() -> nostr_relay_mock::Result<()> {
/// let network = MockNetwork::new();
/// let relay = MockRelay::bind(&network, "ws://relay.test")?;
/// let client = MockClient::connect(&network, "ws://relay.test")?;
///
/// client.send(&faker::to_relay::req("sub"))?;
/// matcher::receive(&relay, &matcher::to_relay::req_id("sub"), Duration::from_millis(100))
///     .await?
///     .assert();
/// # Ok(())
/// # }
/// ```
pub async fn receive<S>(source: &S, matcher: &Matcher, timeout: Duration) -> Result<MatchOutcome>
where
    S: MessageSource + ?Sized,
{
    match source.next_value(timeout).await {
        Ok(value) => Ok(matcher.evaluate(&value)),
        Err(e) if e.is_timeout() => {
            tracing::debug!(expected = %matcher.kind(), timeout = ?timeout, "Nothing arrived to match");
            Ok(MatchOutcome::timed_out(
                matcher.entity(),
                matcher.expected(),
                timeout,
            ))
        }
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matcher::{to_client, to_relay};
    use crate::{faker, protocol::RelayMessage};

    #[tokio::test]
    async fn test_receive_from_queue() {
        let queue = RendezvousQueue::new();
        queue.push(faker::to_client::eose("sub"));

        let outcome = receive(&queue, &to_client::eose_id("sub"), Duration::from_millis(10))
            .await
            .unwrap();
        outcome.assert();
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_is_a_failed_outcome() {
        let queue: RendezvousQueue<RelayMessage> = RendezvousQueue::new();

        let outcome = receive(&queue, &to_client::eose(), Duration::from_millis(50))
            .await
            .unwrap();
        assert!(!outcome.passed());
        assert!(outcome.is_timeout());
        assert!(outcome.message().contains("a to-client-EOSE message"));
    }

    #[tokio::test]
    async fn test_other_errors_pass_through() {
        let spy = ClientSpy::new(|listener| listener.notify_text("not json"));

        let err = receive(&spy, &to_relay::req(), Duration::from_millis(10))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Message(_)));
    }
}
