//! MPC Adapter Library
//!
//! Lets a NEAR account control an EVM account through the NEAR MPC
//! signer contract ("chain signatures").
//!
//! # Architecture
//!
//! This crate provides:
//! - **kdf**: Child key and EVM address derivation from the MPC root key
//! - **intent**: Session requests → signing intents → 32-byte digests
//! - **eip712**: Typed structured data hashing
//! - **mpc**: Sign requests, submission and outcome polling
//! - **signature**: Signature reconstruction and signer checks
//! - **chains**: JSON-RPC clients for NEAR and EVM chains
//! - **adapter**: The end-to-end `NearEthAdapter`
//!
//! # Example
//!
//! ```rust,ignore
//! use mpc_adapter::{AdapterConfig, NearEthAdapter};
//!
//! let adapter = NearEthAdapter::from_config(AdapterConfig::from_env()?, signer)?;
//! println!("EVM address: {}", adapter.address().await?);
//! let tx_hash = adapter.sign_and_send(tx).await?;
//! ```

pub mod error;
pub mod types;
pub mod serde_bytes;
pub mod utils;
pub mod config;

pub mod kdf;
pub mod eip712;
pub mod intent;
pub mod mpc;
pub mod signature;
pub mod chains;
pub mod adapter;

// Re-export key types for convenience
pub use error::{AdapterError, AdapterResult, ErrorCode};
pub use types::*;
pub use config::AdapterConfig;

pub use adapter::{AdapterBuilder, EncodedSignRequest, NearEthAdapter, SignedArtifact};
pub use chains::{ControllerChain, FeeEstimate, TargetChain};
pub use intent::{BaseTx, RecoverableMessage, SessionRequest, SignMethod, SigningIntent, TransactionIntent};
pub use kdf::{derive_address, derive_child_public_key, derive_epsilon, to_address, RootPublicKey};
pub use mpc::{MpcContract, SignatureResponse};
pub use signature::{reconstruct, recover_address, LegacySignature, MpcSignature};

pub use utils::crypto::{hash_personal_message, keccak256, to_checksum_address};
