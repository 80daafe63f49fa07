//! Minimal async JSON-RPC 2.0 client

use crate::error::{AdapterError, AdapterResult};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

#[derive(Debug, Serialize)]
struct RpcRequest<'a, T: Serialize> {
    jsonrpc: &'static str,
    method: &'a str,
    params: T,
    id: u64,
}

#[derive(Debug, Deserialize)]
struct RpcResponse<T> {
    result: Option<T>,
    error: Option<RpcErrorBody>,
}

/// Error object; NEAR adds `name` and `cause` to the standard fields
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RpcErrorBody {
    #[serde(default)]
    pub code: i64,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub data: Option<serde_json::Value>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub cause: Option<serde_json::Value>,
}

impl From<RpcErrorBody> for AdapterError {
    fn from(body: RpcErrorBody) -> Self {
        let details = serde_json::to_string(&body).unwrap_or_default();
        AdapterError::rpc(format!("{}: {}", body.code, body.message)).with_details(details)
    }
}

pub struct JsonRpcClient {
    url: String,
    http: Client,
    next_id: AtomicU64,
}

impl JsonRpcClient {
    pub fn new(url: impl Into<String>) -> AdapterResult<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| AdapterError::internal(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self {
            url: url.into(),
            http,
            next_id: AtomicU64::new(1),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub async fn call<P, R>(&self, method: &str, params: P) -> AdapterResult<R>
    where
        P: Serialize + Send,
        R: DeserializeOwned,
    {
        let request = RpcRequest {
            jsonrpc: "2.0",
            method,
            params,
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
        };

        let response = self.http.post(&self.url).json(&request).send().await?;
        let status = response.status();
        if !status.is_success() && status.as_u16() != 400 && status.as_u16() != 500 {
            return Err(AdapterError::network(format!("{} returned HTTP {}", method, status)));
        }

        let body: RpcResponse<R> = response
            .json()
            .await
            .map_err(|e| AdapterError::parse_error(format!("Invalid {} response: {}", method, e)))?;

        match (body.result, body.error) {
            (_, Some(error)) => Err(error.into()),
            (Some(result), None) => Ok(result),
            (None, None) => Err(AdapterError::rpc(format!("{} returned no result", method))),
        }
    }
}
