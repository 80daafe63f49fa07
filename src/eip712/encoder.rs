//! EIP-712 Encoding
//!
//! `encodeType`, `typeHash` and `encodeData`. Every member encodes to a
//! single 32-byte word:
//! - atomic values are left-padded (bytesN right-padded)
//! - `string`/`bytes` are replaced by their keccak256
//! - structs by their `hashStruct`
//! - arrays by keccak256 of their concatenated member words

use super::types::*;
use crate::utils::keccak256;
use ethers_core::types::{I256, U256};
use serde_json::Value;
use std::collections::{BTreeSet, HashMap};

type Types = HashMap<String, Vec<TypedDataField>>;

/// `Name(type1 field1,...)` for the primary type followed by its
/// dependencies in alphabetical order
pub fn encode_type(primary_type: &str, types: &Types) -> Result<String, Eip712Error> {
    let mut deps = BTreeSet::new();
    find_type_dependencies(primary_type, types, &mut deps);
    deps.remove(primary_type);

    let mut out = String::new();
    for name in std::iter::once(primary_type).chain(deps.iter().map(String::as_str)) {
        let fields = types
            .get(name)
            .ok_or_else(|| Eip712Error::InvalidType(name.to_string()))?;
        let members = fields
            .iter()
            .map(|f| format!("{} {}", f.type_name, f.name))
            .collect::<Vec<_>>()
            .join(",");
        out.push_str(&format!("{}({})", name, members));
    }
    Ok(out)
}

/// Collect every struct type reachable from `type_name`, itself included
pub fn find_type_dependencies(type_name: &str, types: &Types, found: &mut BTreeSet<String>) {
    let base = base_type(type_name);
    if found.contains(base) {
        return;
    }
    let Some(fields) = types.get(base) else {
        return;
    };

    found.insert(base.to_string());
    for field in fields {
        find_type_dependencies(&field.type_name, types, found);
    }
}

pub fn type_hash(primary_type: &str, types: &Types) -> Result<[u8; 32], Eip712Error> {
    Ok(keccak256(encode_type(primary_type, types)?.as_bytes()))
}

/// `typeHash ‖ enc(field_1) ‖ ... ‖ enc(field_n)`
pub fn encode_data(primary_type: &str, data: &Value, types: &Types) -> Result<Vec<u8>, Eip712Error> {
    let fields = types
        .get(primary_type)
        .ok_or_else(|| Eip712Error::InvalidType(primary_type.to_string()))?;

    let mut out = Vec::with_capacity(32 * (fields.len() + 1));
    out.extend_from_slice(&type_hash(primary_type, types)?);

    for field in fields {
        let value = data
            .get(&field.name)
            .ok_or_else(|| Eip712Error::MissingField(format!("{}.{}", primary_type, field.name)))?;
        out.extend_from_slice(&encode_field(&field.type_name, value, types)?);
    }

    Ok(out)
}

/// Encode one member to its 32-byte word
pub fn encode_field(type_name: &str, value: &Value, types: &Types) -> Result<[u8; 32], Eip712Error> {
    if let Some(element_type) = array_element_type(type_name) {
        let items = value.as_array().ok_or_else(|| invalid(type_name, value))?;
        if let Some(len) = fixed_array_len(type_name)? {
            if items.len() != len {
                return Err(invalid(type_name, value));
            }
        }
        let mut concatenated = Vec::with_capacity(32 * items.len());
        for item in items {
            concatenated.extend_from_slice(&encode_field(element_type, item, types)?);
        }
        return Ok(keccak256(&concatenated));
    }

    if types.contains_key(type_name) {
        return Ok(keccak256(&encode_data(type_name, value, types)?));
    }

    match type_name {
        "string" => {
            let s = value.as_str().ok_or_else(|| invalid(type_name, value))?;
            Ok(keccak256(s.as_bytes()))
        }
        "bytes" => Ok(keccak256(&bytes_value(type_name, value)?)),
        _ => encode_atomic(type_name, value),
    }
}

/// "uint256[][3]" -> Some("uint256[]"); "uint256" -> None
fn array_element_type(type_name: &str) -> Option<&str> {
    if !type_name.ends_with(']') {
        return None;
    }
    type_name.rfind('[').map(|pos| &type_name[..pos])
}

/// "uint256[3]" -> Some(3); "uint256[]" -> None
fn fixed_array_len(type_name: &str) -> Result<Option<usize>, Eip712Error> {
    let suffix = type_name
        .rfind('[')
        .and_then(|pos| type_name[pos + 1..].strip_suffix(']'))
        .unwrap_or_default();
    if suffix.is_empty() {
        return Ok(None);
    }
    suffix
        .parse()
        .map(Some)
        .map_err(|_| Eip712Error::InvalidType(type_name.to_string()))
}

fn encode_atomic(type_name: &str, value: &Value) -> Result<[u8; 32], Eip712Error> {
    let mut word = [0u8; 32];

    match type_name {
        "address" => {
            let s = value.as_str().ok_or_else(|| invalid(type_name, value))?;
            word[12..].copy_from_slice(&parse_address(s)?);
        }
        "bool" => {
            let b = match value {
                Value::Bool(b) => *b,
                Value::String(s) if s == "true" || s == "false" => s == "true",
                _ => return Err(invalid(type_name, value)),
            };
            word[31] = b as u8;
        }
        t if t.starts_with("uint") => {
            let bits = type_bits(t, "uint")?;
            let n = parse_uint(value).ok_or_else(|| invalid(t, value))?;
            if n.bits() > bits {
                return Err(invalid(t, value));
            }
            n.to_big_endian(&mut word);
        }
        t if t.starts_with("int") => {
            let bits = type_bits(t, "int")?;
            let n = parse_int(value).ok_or_else(|| invalid(t, value))?;
            if bits < 256 {
                let bound = I256::from_raw(U256::one() << (bits - 1));
                if n >= bound || n < -bound {
                    return Err(invalid(t, value));
                }
            }
            n.into_raw().to_big_endian(&mut word);
        }
        t if t.starts_with("bytes") => {
            let size = type_bits(t, "bytes")?;
            let bytes = bytes_value(t, value)?;
            if bytes.len() > size {
                return Err(invalid(t, value));
            }
            word[..bytes.len()].copy_from_slice(&bytes);
        }
        other => return Err(Eip712Error::InvalidType(other.to_string())),
    }

    Ok(word)
}

fn type_bits(type_name: &str, prefix: &str) -> Result<usize, Eip712Error> {
    if !is_atomic_type(type_name) {
        return Err(Eip712Error::InvalidType(type_name.to_string()));
    }
    type_name[prefix.len()..]
        .parse()
        .map_err(|_| Eip712Error::InvalidType(type_name.to_string()))
}

fn parse_address(addr: &str) -> Result<[u8; 20], Eip712Error> {
    let hex_str = addr.strip_prefix("0x").unwrap_or(addr);
    let bytes = hex::decode(hex_str).map_err(|_| Eip712Error::InvalidAddress(addr.to_string()))?;
    bytes
        .try_into()
        .map_err(|_| Eip712Error::InvalidAddress(addr.to_string()))
}

/// Numbers arrive as JSON numbers, decimal strings or hex strings
fn parse_uint(value: &Value) -> Option<U256> {
    match value {
        Value::Number(n) => n.as_u64().map(U256::from),
        Value::String(s) => match strip_hex(s) {
            Some(hex) => U256::from_str_radix(hex, 16).ok(),
            None => U256::from_dec_str(s).ok(),
        },
        _ => None,
    }
}

fn parse_int(value: &Value) -> Option<I256> {
    match value {
        Value::Number(n) => n.as_i64().map(I256::from),
        Value::String(s) => match strip_hex(s) {
            Some(_) => I256::from_hex_str(s).ok(),
            None => I256::from_dec_str(s).ok(),
        },
        _ => None,
    }
}

fn strip_hex(s: &str) -> Option<&str> {
    s.strip_prefix("0x").or_else(|| s.strip_prefix("0X"))
}

/// `bytes`/`bytesN` values are hex strings or arrays of byte numbers
fn bytes_value(type_name: &str, value: &Value) -> Result<Vec<u8>, Eip712Error> {
    match value {
        Value::String(s) => {
            let hex_str = strip_hex(s).unwrap_or(s);
            hex::decode(hex_str).map_err(|_| invalid(type_name, value))
        }
        Value::Array(items) => items
            .iter()
            .map(|v| v.as_u64().filter(|b| *b <= 0xff).map(|b| b as u8))
            .collect::<Option<Vec<u8>>>()
            .ok_or_else(|| invalid(type_name, value)),
        _ => Err(invalid(type_name, value)),
    }
}

fn invalid(type_name: &str, value: &Value) -> Eip712Error {
    Eip712Error::InvalidValue {
        type_name: type_name.to_string(),
        value: value.to_string(),
    }
}
