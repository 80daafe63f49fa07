//! EIP-712 Hashing
//!
//! digest = keccak256("\x19\x01" ‖ hashStruct(domain) ‖ hashStruct(message))

use super::encoder::encode_data;
use super::types::*;
use crate::utils::keccak256;
use std::collections::HashMap;

const EIP712_PREFIX: &[u8] = b"\x19\x01";

/// hashStruct(s) = keccak256(typeHash ‖ encodeData(s))
pub fn hash_struct(
    type_name: &str,
    data: &serde_json::Value,
    types: &HashMap<String, Vec<TypedDataField>>,
) -> Result<[u8; 32], Eip712Error> {
    Ok(keccak256(&encode_data(type_name, data, types)?))
}

/// hashStruct(domain), using the document's `EIP712Domain` schema when it
/// declares one and the fields present in `domain` otherwise
pub fn domain_separator(typed_data: &TypedData) -> Result<[u8; 32], Eip712Error> {
    let types = typed_data.types_with_domain();
    let domain = serde_json::to_value(&typed_data.domain)
        .map_err(|e| Eip712Error::InvalidJson(e.to_string()))?;
    hash_struct(DOMAIN_TYPE, &domain, &types)
}

/// The three hashes that make up a typed-data signature request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypedDataDigest {
    pub domain_separator: [u8; 32],
    pub struct_hash: [u8; 32],
    pub digest: [u8; 32],
}

pub fn typed_data_digest(typed_data: &TypedData) -> Result<TypedDataDigest, Eip712Error> {
    typed_data.validate()?;

    let domain_separator = domain_separator(typed_data)?;
    let struct_hash = hash_struct(&typed_data.primary_type, &typed_data.message, &typed_data.types)?;

    let mut data = Vec::with_capacity(2 + 32 + 32);
    data.extend_from_slice(EIP712_PREFIX);
    data.extend_from_slice(&domain_separator);
    data.extend_from_slice(&struct_hash);

    Ok(TypedDataDigest {
        domain_separator,
        struct_hash,
        digest: keccak256(&data),
    })
}

/// The 32-byte value a wallet signs for `eth_signTypedData`
pub fn hash_typed_data(typed_data: &TypedData) -> Result<[u8; 32], Eip712Error> {
    Ok(typed_data_digest(typed_data)?.digest)
}
