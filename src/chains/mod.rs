//! External chain clients
//!
//! The adapter talks to two chains through these traits:
//! - [`ControllerChain`]: where the signing request is submitted (NEAR)
//! - [`TargetChain`]: where the signed transaction is relayed (EVM)
//!
//! The JSON-RPC implementations only map requests and responses; all
//! protocol logic lives in `mpc` and `adapter`.

pub mod evm;
pub mod near;
pub mod rpc;

pub use evm::EvmJsonRpc;
pub use near::{NearJsonRpc, TransactionSigner};

use crate::error::AdapterResult;
use crate::intent::BaseTx;
use crate::mpc::{FinalExecutionOutcome, FunctionCallRequest};
use crate::types::TxExecutionStatus;
use async_trait::async_trait;
use ethers_core::types::U256;
use serde::{Deserialize, Serialize};

/// EIP-1559 fee suggestion
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeeEstimate {
    pub max_fee_per_gas: U256,
    pub max_priority_fee_per_gas: U256,
}

#[async_trait]
pub trait TargetChain: Send + Sync {
    /// Pending nonce of `address`
    async fn get_transaction_count(&self, address: &str) -> AdapterResult<U256>;

    async fn estimate_gas(&self, tx: &BaseTx, from: &str) -> AdapterResult<U256>;

    async fn estimate_fees_per_gas(&self) -> AdapterResult<FeeEstimate>;

    /// Returns the transaction hash
    async fn send_raw_transaction(&self, raw: &[u8]) -> AdapterResult<String>;
}

#[async_trait]
pub trait ControllerChain: Send + Sync {
    /// Call a view method; returns the JSON-decoded result
    async fn view_function(
        &self,
        contract_id: &str,
        method: &str,
        args: serde_json::Value,
    ) -> AdapterResult<serde_json::Value>;

    /// Sign and submit without waiting; returns the transaction hash
    async fn sign_and_broadcast(&self, request: &FunctionCallRequest) -> AdapterResult<String>;

    async fn transaction_status(
        &self,
        tx_hash: &str,
        sender_id: &str,
        wait_until: TxExecutionStatus,
    ) -> AdapterResult<FinalExecutionOutcome>;
}
