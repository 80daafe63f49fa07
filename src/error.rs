//! Unified error type for the adapter
//!
//! Every stage of the signing pipeline reports failures through
//! [`AdapterError`]. Remote identifiers (NEAR tx hashes, EVM tx hashes)
//! travel in `details` so callers can look the request up manually.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Main error type for all adapter operations
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdapterError {
    pub code: ErrorCode,
    pub message: String,
    pub details: Option<String>,
}

impl AdapterError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    // Convenience constructors
    pub fn invalid_public_key(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidPublicKey, msg)
    }

    pub fn unsupported_sign_method(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::UnsupportedSignMethod, msg)
    }

    pub fn invalid_typed_data(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidTypedData, msg)
    }

    pub fn submission_failed(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::SubmissionFailed, msg)
    }

    pub fn no_signature_found(outcome_id: impl Into<String>) -> Self {
        Self::new(ErrorCode::NoSignatureFound, "No signature found in outcome")
            .with_details(outcome_id)
    }

    pub fn signature_mismatch(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::SignatureMismatch, msg)
    }

    pub fn method_not_found(method: impl Into<String>) -> Self {
        Self::new(ErrorCode::MethodNotFound, format!("Method not found: {}", method.into()))
    }

    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidInput, msg)
    }

    pub fn invalid_transaction(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidTransaction, msg)
    }

    pub fn network(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::NetworkError, msg)
    }

    pub fn rpc(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::RpcError, msg)
    }

    pub fn broadcast_failed(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::BroadcastFailed, msg)
    }

    pub fn parse_error(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::ParseError, msg)
    }

    pub fn crypto_error(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::CryptoError, msg)
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::ConfigError, msg)
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::Internal, msg)
    }
}

impl fmt::Display for AdapterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:?}] {}", self.code, self.message)?;
        if let Some(ref details) = self.details {
            write!(f, " ({})", details)?;
        }
        Ok(())
    }
}

impl std::error::Error for AdapterError {}

/// Error codes for categorization
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    // Key derivation
    InvalidPublicKey,

    // Caller input
    UnsupportedSignMethod,
    InvalidTypedData,
    InvalidInput,
    InvalidTransaction,

    // Remote signing protocol
    SubmissionFailed,
    PollingExhausted,
    NoSignatureFound,
    MethodNotFound,

    // Signature reconstruction
    SignatureMismatch,
    CryptoError,

    // Network
    NetworkError,
    RpcError,
    Timeout,
    BroadcastFailed,

    // Parse errors
    ParseError,
    JsonError,
    HexError,

    // Internal
    ConfigError,
    Internal,
}

/// Result type alias for adapter operations
pub type AdapterResult<T> = Result<T, AdapterError>;

// Conversions from common error types

impl From<serde_json::Error> for AdapterError {
    fn from(e: serde_json::Error) -> Self {
        AdapterError::new(ErrorCode::JsonError, e.to_string())
    }
}

impl From<hex::FromHexError> for AdapterError {
    fn from(e: hex::FromHexError) -> Self {
        AdapterError::new(ErrorCode::HexError, e.to_string())
    }
}

impl From<base64::DecodeError> for AdapterError {
    fn from(e: base64::DecodeError) -> Self {
        AdapterError::new(ErrorCode::ParseError, format!("Base64 error: {}", e))
    }
}

impl From<bs58::decode::Error> for AdapterError {
    fn from(e: bs58::decode::Error) -> Self {
        AdapterError::new(ErrorCode::InvalidPublicKey, format!("Base58 error: {}", e))
    }
}

impl From<secp256k1::Error> for AdapterError {
    fn from(e: secp256k1::Error) -> Self {
        AdapterError::new(ErrorCode::CryptoError, format!("Secp256k1 error: {}", e))
    }
}

impl From<reqwest::Error> for AdapterError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            AdapterError::new(ErrorCode::Timeout, "Request timed out")
        } else if e.is_connect() {
            AdapterError::new(ErrorCode::NetworkError, "Connection failed")
        } else {
            AdapterError::new(ErrorCode::NetworkError, e.to_string())
        }
    }
}

impl From<crate::eip712::Eip712Error> for AdapterError {
    fn from(e: crate::eip712::Eip712Error) -> Self {
        AdapterError::new(ErrorCode::InvalidTypedData, e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_serialization() {
        let err = AdapterError::no_signature_found("8ZkVj1tqWUwDZ5AwAQ5wQY7jQpYNZrZ2hTnxzvDYX3Mi");

        let json = serde_json::to_string(&err).unwrap();
        assert!(json.contains("no_signature_found"));
        assert!(json.contains("8ZkVj1tq"));
    }

    #[test]
    fn test_display_includes_details() {
        let err = AdapterError::submission_failed("broadcast rejected").with_details("tx 0xabc");
        assert_eq!(err.to_string(), "[SubmissionFailed] broadcast rejected (tx 0xabc)");
    }

    #[test]
    fn test_typed_data_error_maps_to_code() {
        let err: AdapterError = crate::eip712::Eip712Error::InvalidPrimaryType("Mail".into()).into();
        assert_eq!(err.code, ErrorCode::InvalidTypedData);
    }
}
