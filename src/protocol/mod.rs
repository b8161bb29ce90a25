//! Nostr wire vocabulary
//!
//! Every message on the wire is a JSON array whose first element names the
//! message type:
//!
//! ```text
//! client → relay   ["REQ", sub, filter...]  ["CLOSE", sub]  ["COUNT", sub, filter...]
//!                  ["EVENT", event]         ["AUTH", event]
//! relay → client   ["EVENT", sub, event]    ["EOSE", sub]   ["COUNT", sub, {"count": n}]
//!                  ["OK", id, bool, msg]    ["AUTH", challenge]  ["NOTICE", msg]
//! ```
//!
//! Decoding is strict about shape: anything that is not a tagged array of
//! the known vocabulary is a [`MessageError`].

pub mod constants;
pub mod error;
pub mod event;
pub mod filter;
pub mod message;

pub use error::MessageError;
pub use event::{Event, PartialEvent};
pub use filter::Filter;
pub use message::{ClientMessage, MessageKind, RelayMessage, WireMessage};
