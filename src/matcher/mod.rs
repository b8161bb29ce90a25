//! Assertion predicates for protocol messages
//!
//! One constructor per message kind, in [`to_relay`] and [`to_client`]. A
//! [`Matcher`] is a plain value: evaluate it against anything serializable to
//! get a [`MatchOutcome`], then assert on the outcome.
//!
//! ```
//! use nostr_relay_mock::{faker, matcher};
//!
//! let sent = faker::to_relay::req("sub");
//! matcher::to_relay::req_id("sub").evaluate(&sent).assert();
//! matcher::to_relay::close().evaluate(&sent).assert_not();
//! ```
//!
//! [`receive`] is the waiting form: it takes the next message from a
//! [`MessageSource`] and evaluates it, reporting a distinct failure when
//! nothing arrives in time.

pub mod outcome;
pub mod predicate;
pub mod source;

pub use outcome::{MatchFailure, MatchOutcome};
pub use predicate::{to_client, to_relay, Matcher};
pub use source::{receive, MessageSource};
