//! NEAR JSON-RPC client
//!
//! View calls and status queries are plain RPC. Broadcasting needs the
//! account's full-access key, which stays with a [`TransactionSigner`]; this
//! client only supplies the nonce and a recent block hash.

use super::rpc::{JsonRpcClient, RpcErrorBody};
use super::ControllerChain;
use crate::error::{AdapterError, AdapterResult, ErrorCode};
use crate::mpc::{FinalExecutionOutcome, FunctionCallRequest};
use crate::types::TxExecutionStatus;
use crate::log_info;
use async_trait::async_trait;
use base64::Engine;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

const MODULE: &str = "near";

/// Key custody for the controller account
#[async_trait]
pub trait TransactionSigner: Send + Sync {
    /// `ed25519:<base58>` public key of the access key used for signing
    fn public_key(&self) -> String;

    /// Sign `request` and return the base64 borsh `SignedTransaction`
    async fn sign_transaction(
        &self,
        request: &FunctionCallRequest,
        nonce: u64,
        block_hash: &str,
    ) -> AdapterResult<String>;
}

#[derive(Debug, Deserialize)]
struct CallFunctionResult {
    #[serde(default)]
    result: Vec<u8>,
    /// Older nodes report contract errors here instead of as an RPC error
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AccessKeyView {
    nonce: u64,
    block_hash: String,
}

pub struct NearJsonRpc {
    rpc: JsonRpcClient,
    signer: Option<Arc<dyn TransactionSigner>>,
}

impl NearJsonRpc {
    pub fn new(url: impl Into<String>) -> AdapterResult<Self> {
        Ok(Self {
            rpc: JsonRpcClient::new(url)?,
            signer: None,
        })
    }

    /// Without a signer the client is read-only
    pub fn with_signer(mut self, signer: Arc<dyn TransactionSigner>) -> Self {
        self.signer = Some(signer);
        self
    }

    async fn access_key(&self, account_id: &str, public_key: &str) -> AdapterResult<AccessKeyView> {
        self.rpc
            .call(
                "query",
                json!({
                    "request_type": "view_access_key",
                    "finality": "final",
                    "account_id": account_id,
                    "public_key": public_key,
                }),
            )
            .await
    }
}

/// A `CONTRACT_EXECUTION_ERROR` whose `vm_error` is a `MethodResolveError`.
/// `vm_error` is an enum rendering on older nodes and a nested object on
/// newer ones.
fn is_method_resolve_error(body: &RpcErrorBody) -> bool {
    let Some(cause) = &body.cause else {
        return false;
    };
    if cause.get("name").and_then(Value::as_str) != Some("CONTRACT_EXECUTION_ERROR") {
        return false;
    }
    match cause.pointer("/info/vm_error") {
        Some(Value::String(vm_error)) => vm_error.starts_with("MethodResolveError"),
        Some(Value::Object(vm_error)) => {
            vm_error.contains_key("MethodResolveError")
                || vm_error
                    .get("FunctionCallError")
                    .and_then(|f| f.get("MethodResolveError"))
                    .is_some()
        }
        _ => false,
    }
}

/// RPC errors whose structured cause is a missing method become `MethodNotFound`
fn classify_view_error(method: &str, error: AdapterError) -> AdapterError {
    if error.code != ErrorCode::RpcError {
        return error;
    }
    let body = error
        .details
        .as_deref()
        .and_then(|details| serde_json::from_str::<RpcErrorBody>(details).ok());
    match body {
        Some(body) if is_method_resolve_error(&body) => AdapterError::method_not_found(method),
        _ => error,
    }
}

#[async_trait]
impl ControllerChain for NearJsonRpc {
    async fn view_function(
        &self,
        contract_id: &str,
        method: &str,
        args: serde_json::Value,
    ) -> AdapterResult<serde_json::Value> {
        let args_base64 = base64::engine::general_purpose::STANDARD.encode(args.to_string());
        let response: CallFunctionResult = self
            .rpc
            .call(
                "query",
                json!({
                    "request_type": "call_function",
                    "finality": "final",
                    "account_id": contract_id,
                    "method_name": method,
                    "args_base64": args_base64,
                }),
            )
            .await
            .map_err(|e| classify_view_error(method, e))?;

        if let Some(error) = response.error {
            return Err(AdapterError::rpc(error).with_details(format!("{}.{}", contract_id, method)));
        }
        Ok(serde_json::from_slice(&response.result)?)
    }

    async fn sign_and_broadcast(&self, request: &FunctionCallRequest) -> AdapterResult<String> {
        let signer = self
            .signer
            .as_ref()
            .ok_or_else(|| AdapterError::config("No transaction signer configured"))?;

        let key = self.access_key(&request.signer_id, &signer.public_key()).await?;
        let signed = signer
            .sign_transaction(request, key.nonce + 1, &key.block_hash)
            .await?;

        let tx_hash: String = self.rpc.call("broadcast_tx_async", json!([signed])).await?;
        log_info!(
            MODULE,
            "Broadcast sign request",
            tx_hash = tx_hash,
            sender = request.signer_id,
            actions = request.actions.len()
        );
        Ok(tx_hash)
    }

    async fn transaction_status(
        &self,
        tx_hash: &str,
        sender_id: &str,
        wait_until: TxExecutionStatus,
    ) -> AdapterResult<FinalExecutionOutcome> {
        self.rpc
            .call(
                "EXPERIMENTAL_tx_status",
                json!({
                    "tx_hash": tx_hash,
                    "sender_account_id": sender_id,
                    "wait_until": wait_until,
                }),
            )
            .await
    }
}
