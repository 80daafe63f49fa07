//! NEAR execution outcomes and the signature payloads inside them

use crate::error::{AdapterError, AdapterResult};
use crate::signature::LegacySignature;
use crate::types::TxExecutionStatus;
use base64::Engine;
use serde::{Deserialize, Serialize};

/// `big_r` as returned by the signer: compressed SEC1 point hex
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AffinePoint {
    pub affine_point: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerializableScalar {
    pub scalar: String,
}

/// Signature triple returned by the signer contract
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureResponse {
    pub big_r: AffinePoint,
    pub s: SerializableScalar,
    pub recovery_id: u8,
}

/// Either shape the signer has ever returned
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SignaturePayload {
    Response(SignatureResponse),
    /// `[big_r, big_s]` without a recovery id
    Legacy(LegacySignature),
}

impl SignaturePayload {
    pub fn from_json_bytes(bytes: &[u8]) -> Option<Self> {
        serde_json::from_slice(bytes).ok()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExecutionStatus {
    #[default]
    NotStarted,
    Started,
    Failure(serde_json::Value),
    /// base64 of the return value
    SuccessValue(String),
    SuccessReceiptId(String),
}

impl ExecutionStatus {
    /// Decoded return value, if the status carries a non-empty one
    pub fn success_value(&self) -> Option<Vec<u8>> {
        match self {
            ExecutionStatus::SuccessValue(b64) if !b64.is_empty() => {
                base64::engine::general_purpose::STANDARD.decode(b64).ok()
            }
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionOutcome {
    #[serde(default)]
    pub status: ExecutionStatus,
    #[serde(default)]
    pub logs: Vec<String>,
    #[serde(default)]
    pub executor_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceiptOutcome {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub outcome: ExecutionOutcome,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionView {
    #[serde(default)]
    pub hash: String,
    #[serde(default)]
    pub signer_id: String,
}

/// Result of `EXPERIMENTAL_tx_status`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinalExecutionOutcome {
    #[serde(default)]
    pub final_execution_status: TxExecutionStatus,
    #[serde(default)]
    pub status: ExecutionStatus,
    #[serde(default)]
    pub transaction: TransactionView,
    #[serde(default)]
    pub receipts_outcome: Vec<ReceiptOutcome>,
}

impl FinalExecutionOutcome {
    pub fn tx_hash(&self) -> &str {
        &self.transaction.hash
    }

    /// The signature for a single-request transaction: the top-level return
    /// value if it holds one, else the last receipt that returned one
    pub fn signature_payload(&self) -> Option<SignaturePayload> {
        if let Some(payload) = self
            .status
            .success_value()
            .and_then(|bytes| SignaturePayload::from_json_bytes(&bytes))
        {
            return Some(payload);
        }

        self.receipts_outcome
            .iter()
            .rev()
            .filter_map(|r| r.outcome.status.success_value())
            .find_map(|bytes| SignaturePayload::from_json_bytes(&bytes))
    }

    /// Every signature returned by the receipts, in execution order
    pub fn signature_payloads(&self) -> Vec<SignaturePayload> {
        self.receipts_outcome
            .iter()
            .filter_map(|r| r.outcome.status.success_value())
            .filter_map(|bytes| SignaturePayload::from_json_bytes(&bytes))
            .collect()
    }

    /// First failure, top-level or in a receipt
    pub fn failure(&self) -> Option<&serde_json::Value> {
        std::iter::once(&self.status)
            .chain(self.receipts_outcome.iter().map(|r| &r.outcome.status))
            .find_map(|status| match status {
                ExecutionStatus::Failure(f) => Some(f),
                _ => None,
            })
    }

    /// Like [`Self::signature_payload`], but as an error naming the transaction
    pub fn require_signature(&self, tx_hash: &str) -> AdapterResult<SignaturePayload> {
        self.signature_payload()
            .ok_or_else(|| self.missing_signature(tx_hash))
    }

    /// Exactly `expected` signatures, in order
    pub fn require_signatures(&self, tx_hash: &str, expected: usize) -> AdapterResult<Vec<SignaturePayload>> {
        let payloads = self.signature_payloads();
        if payloads.len() < expected {
            let err = self.missing_signature(tx_hash);
            return Err(AdapterError {
                message: format!("Expected {} signatures, found {}", expected, payloads.len()),
                ..err
            });
        }
        Ok(payloads.into_iter().take(expected).collect())
    }

    fn missing_signature(&self, tx_hash: &str) -> AdapterError {
        match self.failure() {
            Some(failure) => AdapterError::no_signature_found(format!("{}: {}", tx_hash, failure)),
            None => AdapterError::no_signature_found(tx_hash),
        }
    }
}
