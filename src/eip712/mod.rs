//! EIP-712 Typed Data Hashing
//!
//! Computes the digest of a typed structured-data document so it can be sent
//! to the MPC signer. Nothing here touches key material.
//!
//! # Reference
//! - <https://eips.ethereum.org/EIPS/eip-712>
//!
//! # Example
//! ```rust,ignore
//! use mpc_adapter::eip712::{TypedData, hash_typed_data};
//!
//! let typed_data = TypedData::from_json(json_string)?;
//! let digest = hash_typed_data(&typed_data)?;
//! ```

pub mod types;
pub mod encoder;
pub mod hasher;

pub use types::*;
pub use encoder::*;
pub use hasher::*;

#[cfg(test)]
mod tests;
