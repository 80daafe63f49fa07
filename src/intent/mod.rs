//! Signing Intent Router
//!
//! Turns wallet-style requests into 32-byte digests:
//! - `types`: intents, methods and routed payloads
//! - `session`: wallet session request parsing
//! - `router`: digest computation and transaction population

pub mod router;
pub mod session;
pub mod types;

pub use router::{build_transaction, decode_unsigned_transaction, populate_transaction, route, transaction_digest};
pub use types::*;
