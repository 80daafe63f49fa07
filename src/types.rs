//! Shared types
//!
//! Data structures that cross module boundaries.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::AdapterError;

// =============================================================================
// Controller network
// =============================================================================

/// NEAR network hosting the controller account and the MPC signer contract
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NearNetwork {
    #[default]
    Testnet,
    Mainnet,
}

impl NearNetwork {
    pub fn rpc_url(&self) -> &'static str {
        match self {
            NearNetwork::Testnet => "https://rpc.testnet.near.org",
            NearNetwork::Mainnet => "https://rpc.mainnet.near.org",
        }
    }

    pub fn mpc_contract_id(&self) -> &'static str {
        match self {
            NearNetwork::Testnet => "v1.signer-prod.testnet",
            NearNetwork::Mainnet => "v1.signer",
        }
    }

    /// Infer the network from an account id suffix
    pub fn from_account_id(account_id: &str) -> Self {
        if account_id.ends_with(".near") || account_id == "near" {
            NearNetwork::Mainnet
        } else {
            NearNetwork::Testnet
        }
    }

    pub fn explorer_tx_url(&self, tx_hash: &str) -> String {
        match self {
            NearNetwork::Testnet => format!("https://testnet.nearblocks.io/txns/{}", tx_hash),
            NearNetwork::Mainnet => format!("https://nearblocks.io/txns/{}", tx_hash),
        }
    }
}

impl fmt::Display for NearNetwork {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NearNetwork::Testnet => f.write_str("testnet"),
            NearNetwork::Mainnet => f.write_str("mainnet"),
        }
    }
}

impl FromStr for NearNetwork {
    type Err = AdapterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "testnet" => Ok(NearNetwork::Testnet),
            "mainnet" => Ok(NearNetwork::Mainnet),
            other => Err(AdapterError::config(format!("Unknown NEAR network: {}", other))),
        }
    }
}

// =============================================================================
// Transaction execution status
// =============================================================================

/// How far a NEAR transaction has progressed, in increasing order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TxExecutionStatus {
    #[default]
    None,
    Included,
    ExecutedOptimistic,
    IncludedFinal,
    Executed,
    Final,
}

impl TxExecutionStatus {
    /// All receipts have executed, so the signature (if any) is in the outcome
    pub fn is_executed(&self) -> bool {
        matches!(
            self,
            TxExecutionStatus::ExecutedOptimistic | TxExecutionStatus::Executed | TxExecutionStatus::Final
        )
    }
}

impl fmt::Display for TxExecutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            TxExecutionStatus::None => "NONE",
            TxExecutionStatus::Included => "INCLUDED",
            TxExecutionStatus::ExecutedOptimistic => "EXECUTED_OPTIMISTIC",
            TxExecutionStatus::IncludedFinal => "INCLUDED_FINAL",
            TxExecutionStatus::Executed => "EXECUTED",
            TxExecutionStatus::Final => "FINAL",
        };
        f.write_str(label)
    }
}
