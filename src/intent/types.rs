//! Signing intent types
//!
//! What a caller wants signed, before and after it has been reduced to a
//! 32-byte digest.

use crate::eip712::TypedData;
use crate::error::AdapterError;
use ethers_core::types::transaction::eip2718::TypedTransaction;
use ethers_core::types::{Address, Bytes, U256};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Wallet RPC signing methods the router understands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SignMethod {
    #[serde(rename = "eth_sign")]
    EthSign,
    #[serde(rename = "personal_sign")]
    PersonalSign,
    #[serde(rename = "eth_signTypedData")]
    EthSignTypedData,
    #[serde(rename = "eth_signTypedData_v4")]
    EthSignTypedDataV4,
    #[serde(rename = "eth_sendTransaction")]
    EthSendTransaction,
}

impl SignMethod {
    pub const ALL: [SignMethod; 5] = [
        SignMethod::EthSign,
        SignMethod::PersonalSign,
        SignMethod::EthSignTypedData,
        SignMethod::EthSignTypedDataV4,
        SignMethod::EthSendTransaction,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SignMethod::EthSign => "eth_sign",
            SignMethod::PersonalSign => "personal_sign",
            SignMethod::EthSignTypedData => "eth_signTypedData",
            SignMethod::EthSignTypedDataV4 => "eth_signTypedData_v4",
            SignMethod::EthSendTransaction => "eth_sendTransaction",
        }
    }
}

impl fmt::Display for SignMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SignMethod {
    type Err = AdapterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|m| m.as_str() == s)
            .ok_or_else(|| AdapterError::unsupported_sign_method(format!("Unsupported method: {}", s)))
    }
}

/// A signing request as delivered by a wallet session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRequest {
    pub method: SignMethod,
    pub chain_id: u64,
    pub params: serde_json::Value,
}

/// Minimal transaction description; missing fields are filled from the target chain
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BaseTx {
    pub to: Address,
    #[serde(default)]
    pub value: U256,
    #[serde(default, alias = "input")]
    pub data: Bytes,
    #[serde(default)]
    pub chain_id: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nonce: Option<U256>,
    #[serde(default, alias = "gasLimit", skip_serializing_if = "Option::is_none")]
    pub gas: Option<U256>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_fee_per_gas: Option<U256>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_priority_fee_per_gas: Option<U256>,
}

impl BaseTx {
    pub fn new(to: Address, value: U256, chain_id: u64) -> Self {
        Self {
            to,
            value,
            chain_id,
            ..Default::default()
        }
    }

    pub fn data(mut self, data: impl Into<Bytes>) -> Self {
        self.data = data.into();
        self
    }

    /// Every field the chain would otherwise be asked for is set
    pub fn is_populated(&self) -> bool {
        self.nonce.is_some()
            && self.gas.is_some()
            && self.max_fee_per_gas.is_some()
            && self.max_priority_fee_per_gas.is_some()
    }
}

/// A transaction to sign: either fields to populate, or an unsigned
/// serialization used verbatim
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransactionIntent {
    Serialized(Vec<u8>),
    Fields(BaseTx),
}

impl From<BaseTx> for TransactionIntent {
    fn from(tx: BaseTx) -> Self {
        TransactionIntent::Fields(tx)
    }
}

/// What the caller wants signed
#[derive(Debug, Clone, PartialEq)]
pub enum SigningIntent {
    RawTransaction(TransactionIntent),
    PersonalMessage { message: Vec<u8>, signer: String },
    StructuredMessage { typed_data: TypedData, signer: String },
}

/// Everything needed to recover the signer from the final signature
#[derive(Debug, Clone, PartialEq)]
pub enum RecoverableMessage {
    Transaction { tx: TypedTransaction, sender: String },
    Personal { message: Vec<u8>, signer: String },
    Typed { typed_data: TypedData, signer: String },
}

impl RecoverableMessage {
    pub fn expected_signer(&self) -> &str {
        match self {
            RecoverableMessage::Transaction { sender, .. } => sender,
            RecoverableMessage::Personal { signer, .. } => signer,
            RecoverableMessage::Typed { signer, .. } => signer,
        }
    }
}

/// An intent reduced to the digest the remote signer will sign
#[derive(Debug, Clone, PartialEq)]
pub struct RoutedPayload {
    pub digest: [u8; 32],
    pub recoverable: RecoverableMessage,
}

impl RoutedPayload {
    pub fn digest_hex(&self) -> String {
        format!("0x{}", hex::encode(self.digest))
    }
}
