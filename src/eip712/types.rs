//! EIP-712 Type Definitions
//!
//! Core data structures for EIP-712 typed data documents.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Name of the implicit domain struct
pub const DOMAIN_TYPE: &str = "EIP712Domain";

/// A field in a struct type definition
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TypedDataField {
    pub name: String,
    /// Solidity type, e.g. "address", "uint256", "Person[]"
    #[serde(rename = "type")]
    pub type_name: String,
}

impl TypedDataField {
    pub fn new(name: &str, type_name: &str) -> Self {
        Self {
            name: name.to_string(),
            type_name: type_name.to_string(),
        }
    }
}

/// The EIP-712 domain separator data
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Eip712Domain {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    /// Number, decimal string or hex string
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chain_id: Option<serde_json::Value>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub verifying_contract: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub salt: Option<String>,
}

impl Eip712Domain {
    /// Get the chain ID as a u64
    pub fn chain_id_u64(&self) -> Option<u64> {
        self.chain_id.as_ref().and_then(|v| match v {
            serde_json::Value::Number(n) => n.as_u64(),
            serde_json::Value::String(s) => match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
                Some(hex) => u64::from_str_radix(hex, 16).ok(),
                None => s.parse().ok(),
            },
            _ => None,
        })
    }

    /// Domain fields implied by which values are present, in canonical order
    pub fn implied_fields(&self) -> Vec<TypedDataField> {
        let mut fields = Vec::new();
        if self.name.is_some() {
            fields.push(TypedDataField::new("name", "string"));
        }
        if self.version.is_some() {
            fields.push(TypedDataField::new("version", "string"));
        }
        if self.chain_id.is_some() {
            fields.push(TypedDataField::new("chainId", "uint256"));
        }
        if self.verifying_contract.is_some() {
            fields.push(TypedDataField::new("verifyingContract", "address"));
        }
        if self.salt.is_some() {
            fields.push(TypedDataField::new("salt", "bytes32"));
        }
        fields
    }
}

/// Complete EIP-712 typed data document
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TypedData {
    /// Struct name -> fields. May or may not include `EIP712Domain`.
    pub types: HashMap<String, Vec<TypedDataField>>,

    pub primary_type: String,

    pub domain: Eip712Domain,

    pub message: serde_json::Value,
}

impl TypedData {
    pub fn from_json(json: &str) -> Result<Self, Eip712Error> {
        serde_json::from_str(json).map_err(|e| Eip712Error::InvalidJson(e.to_string()))
    }

    /// Accepts either an object or a JSON-encoded string (wallets send both)
    pub fn from_value(value: &serde_json::Value) -> Result<Self, Eip712Error> {
        match value {
            serde_json::Value::String(s) => Self::from_json(s),
            other => serde_json::from_value(other.clone())
                .map_err(|e| Eip712Error::InvalidJson(e.to_string())),
        }
    }

    pub fn to_json(&self) -> Result<String, Eip712Error> {
        serde_json::to_string(self).map_err(|e| Eip712Error::InvalidJson(e.to_string()))
    }

    /// The type table with `EIP712Domain` present, implied from the domain if missing
    pub fn types_with_domain(&self) -> HashMap<String, Vec<TypedDataField>> {
        let mut types = self.types.clone();
        types
            .entry(DOMAIN_TYPE.to_string())
            .or_insert_with(|| self.domain.implied_fields());
        types
    }

    /// Validate the typed data structure
    pub fn validate(&self) -> Result<(), Eip712Error> {
        if !self.types.contains_key(&self.primary_type) {
            return Err(Eip712Error::InvalidPrimaryType(self.primary_type.clone()));
        }

        for fields in self.types.values() {
            for field in fields {
                self.validate_type(&field.type_name)?;
            }
        }

        Ok(())
    }

    fn validate_type(&self, type_name: &str) -> Result<(), Eip712Error> {
        let base = base_type(type_name);
        if is_atomic_type(base) || is_dynamic_type(base) || self.types.contains_key(base) {
            Ok(())
        } else {
            Err(Eip712Error::InvalidType(type_name.to_string()))
        }
    }
}

/// Errors that can occur while hashing typed data
#[derive(Debug, Clone, thiserror::Error)]
pub enum Eip712Error {
    #[error("Invalid JSON: {0}")]
    InvalidJson(String),

    #[error("Invalid type: {0}")]
    InvalidType(String),

    #[error("Invalid primary type: {0}")]
    InvalidPrimaryType(String),

    #[error("Missing field: {0}")]
    MissingField(String),

    #[error("Invalid value for type {type_name}: {value}")]
    InvalidValue { type_name: String, value: String },

    #[error("Invalid address: {0}")]
    InvalidAddress(String),
}

/// Strip every array suffix: "Person[][3]" -> "Person"
pub fn base_type(type_name: &str) -> &str {
    match type_name.find('[') {
        Some(pos) => &type_name[..pos],
        None => type_name,
    }
}

/// Check if a type is an atomic (fixed-size) type
pub fn is_atomic_type(type_name: &str) -> bool {
    if type_name == "address" || type_name == "bool" {
        return true;
    }

    let bits = type_name
        .strip_prefix("uint")
        .or_else(|| type_name.strip_prefix("int"));
    if let Some(bits) = bits {
        return matches!(bits.parse::<u32>(), Ok(n) if n > 0 && n <= 256 && n % 8 == 0);
    }

    if let Some(size) = type_name.strip_prefix("bytes") {
        return matches!(size.parse::<u32>(), Ok(n) if n > 0 && n <= 32);
    }

    false
}

/// Check if a type is a dynamic type
pub fn is_dynamic_type(type_name: &str) -> bool {
    type_name == "bytes" || type_name == "string"
}

#[cfg(test)]
mod type_tests {
    use super::*;

    #[test]
    fn test_atomic_types() {
        assert!(is_atomic_type("address"));
        assert!(is_atomic_type("bool"));
        assert!(is_atomic_type("uint256"));
        assert!(is_atomic_type("uint8"));
        assert!(is_atomic_type("int256"));
        assert!(is_atomic_type("bytes32"));
        assert!(is_atomic_type("bytes1"));

        assert!(!is_atomic_type("string"));
        assert!(!is_atomic_type("bytes"));
        assert!(!is_atomic_type("uint"));
        assert!(!is_atomic_type("uint257"));
        assert!(!is_atomic_type("bytes33"));
    }

    #[test]
    fn test_dynamic_types() {
        assert!(is_dynamic_type("bytes"));
        assert!(is_dynamic_type("string"));
        assert!(!is_dynamic_type("bytes32"));
    }

    #[test]
    fn test_base_type() {
        assert_eq!(base_type("Person[]"), "Person");
        assert_eq!(base_type("uint256[10]"), "uint256");
        assert_eq!(base_type("address[][2]"), "address");
        assert_eq!(base_type("address"), "address");
    }

    #[test]
    fn test_from_value_accepts_string() {
        let doc = serde_json::json!({
            "types": {"Ping": [{"name": "n", "type": "uint8"}]},
            "primaryType": "Ping",
            "domain": {"name": "x"},
            "message": {"n": 1}
        });
        let as_string = serde_json::Value::String(doc.to_string());
        assert_eq!(
            TypedData::from_value(&doc).unwrap(),
            TypedData::from_value(&as_string).unwrap()
        );
    }
}
