//! Protocol constants

/// Subscription request (client → relay)
pub const REQ: &str = "REQ";
/// Subscription close (client → relay)
pub const CLOSE: &str = "CLOSE";
/// Count request (client → relay) and count response (relay → client)
pub const COUNT: &str = "COUNT";
/// Event submission (client → relay) and delivery (relay → client)
pub const EVENT: &str = "EVENT";
/// End of stored events (relay → client)
pub const EOSE: &str = "EOSE";
/// Event acknowledgement (relay → client)
pub const OK: &str = "OK";
/// Authentication event (client → relay) and challenge (relay → client)
pub const AUTH: &str = "AUTH";
/// Human-readable notice (relay → client)
pub const NOTICE: &str = "NOTICE";

/// Event kind used for client authentication (NIP-42)
pub const CLIENT_AUTH_KIND: u16 = 22242;

/// Keys every event object carries
pub const EVENT_KEYS: [&str; 7] = ["id", "sig", "kind", "tags", "pubkey", "content", "created_at"];

/// Placeholder used by fixtures and in expected-message descriptions
pub const WILDCARD: &str = "*";
