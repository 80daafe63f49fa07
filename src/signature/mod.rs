//! Signature Reconstruction
//!
//! Converts the signer's `(big_r, s, recovery_id)` triple into an ECDSA
//! signature the target chain accepts, checking it against the address it
//! is supposed to recover to.
//!
//! Output shapes:
//! - `r‖s‖v` bytes / hex with `v = 27 + recovery_bit`
//! - `y_parity` for typed transactions
//! - ethers-core [`Signature`] with a caller-chosen `v` (EIP-155)
//! - the legacy `{big_r, big_s}` pair

use crate::error::{AdapterError, AdapterResult};
use crate::kdf::to_address;
use crate::mpc::{FinalExecutionOutcome, SignaturePayload, SignatureResponse};
use crate::utils::addresses_equal;
use ethers_core::types::{Signature, U256};
use secp256k1::ecdsa::{RecoverableSignature, RecoveryId};
use secp256k1::{Message, Secp256k1};
use serde::{Deserialize, Serialize};

/// Canonical signature form
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MpcSignature {
    #[serde(with = "crate::serde_bytes::hex32")]
    pub r: [u8; 32],
    #[serde(with = "crate::serde_bytes::hex32")]
    pub s: [u8; 32],
    pub recovery_bit: u8,
}

/// The older two-field shape; no recovery id
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegacySignature {
    /// Compressed R point, `02|03 ‖ x` hex
    pub big_r: String,
    pub big_s: String,
}

impl MpcSignature {
    pub fn new(r: [u8; 32], s: [u8; 32], recovery_bit: u8) -> Self {
        Self { r, s, recovery_bit }
    }

    /// Drop the point-type byte of `big_r`; take `s` and the recovery id as given
    pub fn from_response(response: &SignatureResponse) -> AdapterResult<Self> {
        if response.recovery_id > 1 {
            return Err(AdapterError::crypto_error(format!(
                "Recovery id out of range: {}",
                response.recovery_id
            )));
        }
        let (r, _) = split_big_r(&response.big_r.affine_point)?;
        let s = scalar_bytes(&response.s.scalar)?;
        Ok(Self::new(r, s, response.recovery_id))
    }

    /// The recovery bit is guessed from the parity byte of `big_r`
    pub fn from_legacy(legacy: &LegacySignature) -> AdapterResult<Self> {
        let (r, parity) = split_big_r(&legacy.big_r)?;
        let s = scalar_bytes(&legacy.big_s)?;
        Ok(Self::new(r, s, parity))
    }

    /// Accepts `r‖s‖v` with `v` in {0, 1, 27, 28}
    pub fn from_bytes(bytes: &[u8]) -> AdapterResult<Self> {
        if bytes.len() != 65 {
            return Err(AdapterError::invalid_input(format!(
                "Expected 65 signature bytes, got {}",
                bytes.len()
            )));
        }
        let recovery_bit = match bytes[64] {
            v @ (0 | 1) => v,
            v @ (27 | 28) => v - 27,
            v => return Err(AdapterError::invalid_input(format!("Invalid v: {}", v))),
        };
        let mut r = [0u8; 32];
        let mut s = [0u8; 32];
        r.copy_from_slice(&bytes[..32]);
        s.copy_from_slice(&bytes[32..64]);
        Ok(Self::new(r, s, recovery_bit))
    }

    pub fn with_recovery_bit(self, recovery_bit: u8) -> Self {
        Self { recovery_bit, ..self }
    }

    pub fn y_parity(&self) -> u8 {
        self.recovery_bit
    }

    /// `27 + recovery_bit`
    pub fn v(&self) -> u8 {
        27 + self.recovery_bit
    }

    /// `r‖s‖v`
    pub fn to_bytes(&self) -> [u8; 65] {
        let mut out = [0u8; 65];
        out[..32].copy_from_slice(&self.r);
        out[32..64].copy_from_slice(&self.s);
        out[64] = self.v();
        out
    }

    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.to_bytes()))
    }

    pub fn to_eth_signature(&self, v: u64) -> Signature {
        Signature {
            r: U256::from_big_endian(&self.r),
            s: U256::from_big_endian(&self.s),
            v,
        }
    }

    pub fn to_legacy(&self) -> LegacySignature {
        LegacySignature {
            big_r: format!("{:02x}{}", 0x02 + self.recovery_bit, hex::encode(self.r)),
            big_s: hex::encode(self.s),
        }
    }
}

fn split_big_r(big_r: &str) -> AdapterResult<([u8; 32], u8)> {
    let bytes = hex::decode(big_r.trim_start_matches("0x"))?;
    if bytes.len() != 33 || !matches!(bytes[0], 0x02 | 0x03) {
        return Err(AdapterError::crypto_error(format!(
            "big_r is not a compressed point: {}",
            big_r
        )));
    }
    let mut r = [0u8; 32];
    r.copy_from_slice(&bytes[1..]);
    Ok((r, bytes[0] - 0x02))
}

/// Scalars may arrive without leading zeros
fn scalar_bytes(scalar: &str) -> AdapterResult<[u8; 32]> {
    let hex_str = scalar.trim_start_matches("0x");
    let padded = format!("{:0>64}", hex_str);
    let bytes = hex::decode(&padded)?;
    bytes
        .try_into()
        .map_err(|_| AdapterError::crypto_error(format!("Scalar longer than 32 bytes: {}", scalar)))
}

/// Address that `signature` over `digest` recovers to
pub fn recover_address(digest: &[u8; 32], signature: &MpcSignature) -> AdapterResult<String> {
    let secp = Secp256k1::verification_only();
    let recovery_id = RecoveryId::from_i32(signature.recovery_bit as i32)?;

    let mut compact = [0u8; 64];
    compact[..32].copy_from_slice(&signature.r);
    compact[32..].copy_from_slice(&signature.s);
    let recoverable = RecoverableSignature::from_compact(&compact, recovery_id)?;

    let public_key = secp.recover_ecdsa(&Message::from_digest(*digest), &recoverable)?;
    Ok(to_address(&public_key))
}

/// Pick the recovery bit under which `signature` recovers to `expected_signer`
fn match_candidate(
    signature: MpcSignature,
    digest: &[u8; 32],
    expected_signer: &str,
) -> AdapterResult<MpcSignature> {
    for bit in [0u8, 1] {
        let candidate = signature.with_recovery_bit(bit);
        if let Ok(address) = recover_address(digest, &candidate) {
            if addresses_equal(&address, expected_signer) {
                return Ok(candidate);
            }
        }
    }
    Err(AdapterError::signature_mismatch(format!(
        "Signature does not recover to {}",
        expected_signer
    )))
}

/// Without `expected_signer` the returned recovery id is trusted as is
pub fn reconstruct(
    response: &SignatureResponse,
    digest: &[u8; 32],
    expected_signer: Option<&str>,
) -> AdapterResult<MpcSignature> {
    let signature = MpcSignature::from_response(response)?;
    match expected_signer {
        Some(signer) => match_candidate(signature, digest, signer),
        None => Ok(signature),
    }
}

pub fn reconstruct_legacy(
    legacy: &LegacySignature,
    digest: &[u8; 32],
    expected_signer: &str,
) -> AdapterResult<MpcSignature> {
    match_candidate(MpcSignature::from_legacy(legacy)?, digest, expected_signer)
}

/// Dispatch on the payload shape. Legacy payloads without an expected
/// signer fall back to the parity byte of `big_r`.
pub fn reconstruct_payload(
    payload: &SignaturePayload,
    digest: &[u8; 32],
    expected_signer: Option<&str>,
) -> AdapterResult<MpcSignature> {
    match (payload, expected_signer) {
        (SignaturePayload::Response(response), signer) => reconstruct(response, digest, signer),
        (SignaturePayload::Legacy(legacy), Some(signer)) => reconstruct_legacy(legacy, digest, signer),
        (SignaturePayload::Legacy(legacy), None) => MpcSignature::from_legacy(legacy),
    }
}

/// Every signature in a batch outcome, in request order
pub fn reconstruct_many(outcome: &FinalExecutionOutcome) -> AdapterResult<Vec<MpcSignature>> {
    let payloads = outcome.signature_payloads();
    if payloads.is_empty() {
        return Err(AdapterError::no_signature_found(outcome.tx_hash()));
    }
    payloads
        .iter()
        .map(|payload| match payload {
            SignaturePayload::Response(response) => MpcSignature::from_response(response),
            SignaturePayload::Legacy(legacy) => MpcSignature::from_legacy(legacy),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::mpc::{AffinePoint, SerializableScalar};
    use crate::utils::hash_personal_message;
    use secp256k1::{PublicKey, SecretKey};

    fn sign(digest: &[u8; 32], seed: u8) -> (SignatureResponse, String) {
        let secp = Secp256k1::new();
        let secret = SecretKey::from_slice(&[seed; 32]).unwrap();
        let signer = to_address(&PublicKey::from_secret_key(&secp, &secret));

        let (recovery_id, compact) = secp
            .sign_ecdsa_recoverable(&Message::from_digest(*digest), &secret)
            .serialize_compact();
        let bit = recovery_id.to_i32() as u8;

        let response = SignatureResponse {
            big_r: AffinePoint {
                affine_point: format!("{:02x}{}", 0x02 + bit, hex::encode(&compact[..32])),
            },
            s: SerializableScalar {
                scalar: hex::encode(&compact[32..]),
            },
            recovery_id: bit,
        };
        (response, signer)
    }

    #[test]
    fn test_reconstruct_recovers_signer() {
        let digest = hash_personal_message(b"Hello!");
        for seed in 1..=8u8 {
            let (response, signer) = sign(&digest, seed);

            let trusted = reconstruct(&response, &digest, None).unwrap();
            assert_eq!(recover_address(&digest, &trusted).unwrap(), signer);

            // A wrong recovery id is corrected by candidate matching
            let mut flipped = response.clone();
            flipped.recovery_id ^= 1;
            let matched = reconstruct(&flipped, &digest, Some(&signer.to_lowercase())).unwrap();
            assert_eq!(matched, trusted);
        }
    }

    #[test]
    fn test_wrong_signer_is_mismatch() {
        let digest = hash_personal_message(b"Hello!");
        let (response, _) = sign(&digest, 3);
        let err = reconstruct(
            &response,
            &digest,
            Some("0x0000000000000000000000000000000000000001"),
        )
        .unwrap_err();
        assert_eq!(err.code, ErrorCode::SignatureMismatch);
    }

    #[test]
    fn test_legacy_roundtrip_through_candidates() {
        let digest = [9u8; 32];
        let (response, signer) = sign(&digest, 5);
        let signature = reconstruct(&response, &digest, None).unwrap();

        let legacy = signature.to_legacy();
        assert_eq!(legacy.big_r, response.big_r.affine_point);

        // Corrupt the parity byte: matching still finds the right bit
        let mut wrong_parity = legacy.clone();
        let flipped = if legacy.big_r.starts_with("02") { "03" } else { "02" };
        wrong_parity.big_r.replace_range(..2, flipped);
        assert_eq!(reconstruct_legacy(&wrong_parity, &digest, &signer).unwrap(), signature);
    }

    #[test]
    fn test_emission_shapes() {
        let signature = MpcSignature::new([0x11; 32], [0x22; 32], 1);

        let bytes = signature.to_bytes();
        assert_eq!(bytes[64], 28);
        assert_eq!(signature.y_parity(), 1);
        assert_eq!(MpcSignature::from_bytes(&bytes).unwrap(), signature);
        assert_eq!(signature.to_hex().len(), 2 + 130);

        let eth = signature.to_eth_signature(37);
        assert_eq!(eth.v, 37);
        assert_eq!(eth.r, U256::from_big_endian(&[0x11; 32]));
    }

    #[test]
    fn test_short_scalar_is_left_padded() {
        assert_eq!(scalar_bytes("ff").unwrap()[31], 0xff);
        assert_eq!(scalar_bytes("ff").unwrap()[0], 0);
        assert!(scalar_bytes(&"ab".repeat(33)).is_err());
    }

    #[test]
    fn test_reconstruct_many_empty_outcome() {
        let outcome = FinalExecutionOutcome::default();
        let err = reconstruct_many(&outcome).unwrap_err();
        assert_eq!(err.code, ErrorCode::NoSignatureFound);
    }

    #[test]
    fn test_rejects_uncompressed_big_r() {
        let response = SignatureResponse {
            big_r: AffinePoint {
                affine_point: format!("04{}", "11".repeat(64)),
            },
            s: SerializableScalar {
                scalar: "22".repeat(32),
            },
            recovery_id: 0,
        };
        assert!(MpcSignature::from_response(&response).is_err());
    }
}
