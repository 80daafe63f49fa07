//! EVM JSON-RPC client

use super::rpc::JsonRpcClient;
use super::{FeeEstimate, TargetChain};
use crate::error::{AdapterError, AdapterResult};
use crate::intent::BaseTx;
use crate::log_info;
use async_trait::async_trait;
use ethers_core::types::U256;
use serde::Deserialize;
use serde_json::json;

const MODULE: &str = "evm";

/// 1.5 gwei, used when the node has no `eth_maxPriorityFeePerGas`
const DEFAULT_PRIORITY_FEE_WEI: u64 = 1_500_000_000;

pub struct EvmJsonRpc {
    rpc: JsonRpcClient,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BlockHeader {
    base_fee_per_gas: Option<U256>,
}

impl EvmJsonRpc {
    pub fn new(url: impl Into<String>) -> AdapterResult<Self> {
        Ok(Self {
            rpc: JsonRpcClient::new(url)?,
        })
    }

    async fn priority_fee(&self) -> U256 {
        self.rpc
            .call::<_, U256>("eth_maxPriorityFeePerGas", json!([]))
            .await
            .unwrap_or_else(|_| U256::from(DEFAULT_PRIORITY_FEE_WEI))
    }
}

/// max_fee = 2 * base_fee + priority
pub fn fee_estimate(base_fee: U256, priority_fee: U256) -> FeeEstimate {
    FeeEstimate {
        max_fee_per_gas: base_fee * U256::from(2) + priority_fee,
        max_priority_fee_per_gas: priority_fee,
    }
}

#[async_trait]
impl TargetChain for EvmJsonRpc {
    async fn get_transaction_count(&self, address: &str) -> AdapterResult<U256> {
        self.rpc
            .call("eth_getTransactionCount", json!([address, "pending"]))
            .await
    }

    async fn estimate_gas(&self, tx: &BaseTx, from: &str) -> AdapterResult<U256> {
        let call = json!({
            "from": from,
            "to": tx.to,
            "value": tx.value,
            "data": tx.data,
        });
        self.rpc.call("eth_estimateGas", json!([call])).await
    }

    async fn estimate_fees_per_gas(&self) -> AdapterResult<FeeEstimate> {
        let block: BlockHeader = self
            .rpc
            .call("eth_getBlockByNumber", json!(["latest", false]))
            .await?;
        let base_fee = block
            .base_fee_per_gas
            .ok_or_else(|| AdapterError::rpc("Chain does not report baseFeePerGas"))?;
        Ok(fee_estimate(base_fee, self.priority_fee().await))
    }

    async fn send_raw_transaction(&self, raw: &[u8]) -> AdapterResult<String> {
        let encoded = format!("0x{}", hex::encode(raw));
        let hash: String = self
            .rpc
            .call("eth_sendRawTransaction", json!([encoded]))
            .await
            .map_err(|e| {
                let failed = AdapterError::broadcast_failed(e.message);
                match e.details {
                    Some(details) => failed.with_details(details),
                    None => failed,
                }
            })?;

        log_info!(MODULE, "Relayed transaction", tx_hash = hash, rpc = self.rpc.url());
        Ok(hash)
    }
}
