//! Hashing and Address Helpers
//!
//! Keccak-256 and EIP-55 helpers shared by key derivation, intent
//! routing and signature recovery.

use tiny_keccak::{Hasher, Keccak};

/// Ethereum signed-message preamble (EIP-191 version 0x45)
pub const ETH_MESSAGE_PREFIX: &str = "\x19Ethereum Signed Message:\n";

/// Keccak256 hash (used for Ethereum addresses)
pub fn keccak256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Keccak::v256();
    hasher.update(data);
    let mut out = [0u8; 32];
    hasher.finalize(&mut out);
    out
}

/// Hash a message with the Ethereum personal sign prefix
pub fn hash_personal_message(message: &[u8]) -> [u8; 32] {
    let prefix = format!("{}{}", ETH_MESSAGE_PREFIX, message.len());
    let mut data = Vec::with_capacity(prefix.len() + message.len());
    data.extend_from_slice(prefix.as_bytes());
    data.extend_from_slice(message);
    keccak256(&data)
}

/// Convert raw address bytes to checksummed Ethereum address
pub fn to_checksum_address(address: &[u8]) -> String {
    let lower = hex::encode(address);
    let hash = keccak256(lower.as_bytes());

    let mut result = String::from("0x");
    for (i, ch) in lower.chars().enumerate() {
        let byte = hash[i / 2];
        let nibble = if i % 2 == 0 { byte >> 4 } else { byte & 0x0f };

        if ch.is_ascii_digit() {
            result.push(ch);
        } else if nibble >= 8 {
            result.push(ch.to_ascii_uppercase());
        } else {
            result.push(ch);
        }
    }

    result
}

/// Compare two hex addresses ignoring case and `0x` prefix
pub fn addresses_equal(a: &str, b: &str) -> bool {
    let a = a.trim().trim_start_matches("0x").trim_start_matches("0X");
    let b = b.trim().trim_start_matches("0x").trim_start_matches("0X");
    a.eq_ignore_ascii_case(b)
}

/// Decode a hex string with or without `0x`
pub fn decode_hex(s: &str) -> Result<Vec<u8>, hex::FromHexError> {
    let s = s.trim();
    let s = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")).unwrap_or(s);
    hex::decode(s)
}
