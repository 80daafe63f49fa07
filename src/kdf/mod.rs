//! Child Key Derivation
//!
//! Derives the target-chain public key controlled by a NEAR account from the
//! MPC signer's root key:
//!
//! ```text
//! epsilon   = sha3_256("near-mpc-recovery v0.1.0 epsilon derivation:" ‖ account_id ‖ "," ‖ path) mod n
//! child     = root + epsilon·G
//! address   = keccak256(child.x ‖ child.y)[12..32]
//! ```
//!
//! The prefix and hash must match the signer contract bit-for-bit, otherwise
//! the derived address would not correspond to the key the network signs with.

use crate::error::{AdapterError, AdapterResult};
use crate::utils::{keccak256, to_checksum_address};
use secp256k1::constants::CURVE_ORDER;
use secp256k1::{PublicKey, Scalar, Secp256k1};
use sha3::{Digest, Sha3_256};
use std::fmt;
use std::str::FromStr;

/// Domain tag used by the MPC signer for epsilon derivation
pub const EPSILON_DERIVATION_PREFIX: &str = "near-mpc-recovery v0.1.0 epsilon derivation:";

/// Curve label used by NEAR's string encoding of public keys
const NEAR_SECP256K1_PREFIX: &str = "secp256k1:";

/// The MPC network's root secp256k1 public key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RootPublicKey(PublicKey);

impl RootPublicKey {
    /// Parse either NEAR form (`secp256k1:<base58 X‖Y>`) or uncompressed hex (`04‖X‖Y`)
    pub fn parse(encoded: &str) -> AdapterResult<Self> {
        let encoded = encoded.trim();
        let uncompressed = if let Some(b58) = encoded.strip_prefix(NEAR_SECP256K1_PREFIX) {
            let raw = bs58::decode(b58).into_vec()?;
            if raw.len() != 64 {
                return Err(AdapterError::invalid_public_key(format!(
                    "expected 64 bytes after base58 decoding, got {}",
                    raw.len()
                )));
            }
            let mut point = Vec::with_capacity(65);
            point.push(0x04);
            point.extend_from_slice(&raw);
            point
        } else {
            let hex_str = encoded.strip_prefix("0x").unwrap_or(encoded);
            let bytes = hex::decode(hex_str)
                .map_err(|e| AdapterError::invalid_public_key(format!("invalid hex: {}", e)))?;
            if bytes.len() != 65 || bytes[0] != 0x04 {
                return Err(AdapterError::invalid_public_key(
                    "expected uncompressed point: 65 bytes with 0x04 prefix",
                ));
            }
            bytes
        };

        PublicKey::from_slice(&uncompressed)
            .map(Self)
            .map_err(|e| AdapterError::invalid_public_key(format!("point not on curve: {}", e)))
    }

    pub fn public_key(&self) -> &PublicKey {
        &self.0
    }

    /// `04‖X‖Y` as lowercase hex
    pub fn uncompressed_hex(&self) -> String {
        uncompressed_hex(&self.0)
    }

    /// NEAR string form, `secp256k1:<base58 X‖Y>`
    pub fn to_near_string(&self) -> String {
        let point = self.0.serialize_uncompressed();
        format!("{}{}", NEAR_SECP256K1_PREFIX, bs58::encode(&point[1..]).into_string())
    }

    /// Derive the child key for `account_id` and `path`
    pub fn derive(&self, account_id: &str, path: &str) -> AdapterResult<PublicKey> {
        derive_child_public_key(&self.0, account_id, path)
    }
}

impl FromStr for RootPublicKey {
    type Err = AdapterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for RootPublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_near_string())
    }
}

/// Compute the scalar offset for `(account_id, path)`
pub fn derive_epsilon(account_id: &str, path: &str) -> Scalar {
    let derivation_path = format!("{}{},{}", EPSILON_DERIVATION_PREFIX, account_id, path);
    let hash: [u8; 32] = Sha3_256::digest(derivation_path.as_bytes()).into();
    scalar_mod_order(hash)
}

/// Interpret 32 big-endian bytes as a scalar modulo the secp256k1 order
fn scalar_mod_order(bytes: [u8; 32]) -> Scalar {
    match Scalar::from_be_bytes(bytes) {
        Ok(scalar) => scalar,
        Err(_) => {
            // bytes < 2^256 < 2n, so one subtraction is enough
            let reduced = sub_be(&bytes, &CURVE_ORDER);
            Scalar::from_be_bytes(reduced).unwrap_or(Scalar::ZERO)
        }
    }
}

fn sub_be(a: &[u8; 32], b: &[u8; 32]) -> [u8; 32] {
    let mut out = [0u8; 32];
    let mut borrow = 0i16;
    for i in (0..32).rev() {
        let mut diff = a[i] as i16 - b[i] as i16 - borrow;
        borrow = if diff < 0 {
            diff += 256;
            1
        } else {
            0
        };
        out[i] = diff as u8;
    }
    out
}

/// `root + epsilon(account_id, path)·G`
pub fn derive_child_public_key(
    root: &PublicKey,
    account_id: &str,
    path: &str,
) -> AdapterResult<PublicKey> {
    let secp = Secp256k1::verification_only();
    let epsilon = derive_epsilon(account_id, path);
    root.add_exp_tweak(&secp, &epsilon)
        .map_err(|e| AdapterError::crypto_error(format!("child key derivation failed: {}", e)))
}

/// `04‖X‖Y` as lowercase hex, coordinates left-padded to 32 bytes
pub fn uncompressed_hex(point: &PublicKey) -> String {
    hex::encode(point.serialize_uncompressed())
}

/// EIP-55 address of a secp256k1 point
pub fn to_address(point: &PublicKey) -> String {
    let uncompressed = point.serialize_uncompressed();
    let hash = keccak256(&uncompressed[1..]);
    to_checksum_address(&hash[12..])
}

/// Convenience: derive straight to the target-chain address
pub fn derive_address(root: &RootPublicKey, account_id: &str, path: &str) -> AdapterResult<String> {
    Ok(to_address(&root.derive(account_id, path)?))
}
