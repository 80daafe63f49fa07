//! Sign request encoding
//!
//! A batch of digests becomes one NEAR transaction to the signer contract
//! with one `sign` function call per digest:
//!
//! ```json
//! {"request": {"path": "ethereum,1", "payload": [82, 182, ...], "key_version": 0}}
//! ```

use serde::{Deserialize, Serialize};

/// 300 TGas, the per-transaction maximum
pub const DEFAULT_SIGN_GAS: u64 = 300_000_000_000_000;

/// 1 NEAR in yocto, used when the contract does not report a deposit
pub const FALLBACK_DEPOSIT_YOCTO: u128 = 1_000_000_000_000_000_000_000_000;

pub const SIGN_METHOD: &str = "sign";

/// Arguments of a single `sign` call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignRequest {
    pub path: String,
    pub payload: [u8; 32],
    pub key_version: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignArgs {
    pub request: SignRequest,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionCallAction {
    pub method_name: String,
    pub args: serde_json::Value,
    pub gas: u64,
    #[serde(with = "crate::serde_bytes::u128_dec")]
    pub deposit: u128,
}

/// An unsigned NEAR transaction made only of function calls
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionCallRequest {
    pub signer_id: String,
    pub receiver_id: String,
    pub actions: Vec<FunctionCallAction>,
}

impl FunctionCallRequest {
    pub fn total_deposit(&self) -> u128 {
        self.actions.iter().map(|a| a.deposit).sum()
    }
}

/// Build the `sign` transaction for `digests`; `gas` is the budget for the
/// whole transaction and is split evenly across actions
pub fn build_sign_request(
    signer_id: &str,
    contract_id: &str,
    digests: &[[u8; 32]],
    path: &str,
    key_version: u32,
    gas: Option<u64>,
    deposit: u128,
) -> FunctionCallRequest {
    let per_action_gas = gas.unwrap_or(DEFAULT_SIGN_GAS) / digests.len().max(1) as u64;

    let actions = digests
        .iter()
        .map(|digest| {
            let args = SignArgs {
                request: SignRequest {
                    path: path.to_string(),
                    payload: *digest,
                    key_version,
                },
            };
            FunctionCallAction {
                method_name: SIGN_METHOD.to_string(),
                args: serde_json::json!(args),
                gas: per_action_gas,
                deposit,
            }
        })
        .collect();

    FunctionCallRequest {
        signer_id: signer_id.to_string(),
        receiver_id: contract_id.to_string(),
        actions,
    }
}
