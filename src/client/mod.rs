//! Client side of the mock
//!
//! - [`MockClient`]: a scripted client that connects to a relay on a
//!   [`MockNetwork`](crate::MockNetwork) and queues what it receives
//! - [`ClientSpy`]: watches the messages some other client receives

pub mod config;
pub mod inbox;
pub mod mock;
pub mod spy;

pub use config::ClientConfig;
pub use inbox::RelayInbox;
pub use mock::MockClient;
pub use spy::{ClientSpy, SpyListener};
