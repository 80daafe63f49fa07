//! Remote Signing Protocol
//!
//! Talks to the MPC signer contract on NEAR:
//! - `request`: `sign` call encoding, gas and deposit constants
//! - `outcome`: execution outcome types and signature extraction
//! - `contract`: submission, bounded polling and the root key cache

pub mod contract;
pub mod outcome;
pub mod request;

pub use contract::{MpcContract, PollConfig, RequestState, RootKeyCache, DEPOSIT_METHODS, PUBLIC_KEY_METHODS};
pub use outcome::*;
pub use request::*;
