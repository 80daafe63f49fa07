//! Adapter configuration
//!
//! Loaded from JSON or from the environment:
//!
//! | variable | field | default |
//! |---|---|---|
//! | `NEAR_ACCOUNT_ID` | `account_id` | required |
//! | `NEAR_NETWORK` | `network` | inferred from the account suffix |
//! | `MPC_CONTRACT_ID` | `mpc_contract_id` | per network |
//! | `MPC_PATH` | `derivation_path` | `ethereum,1` |
//! | `MPC_KEY_VERSION` | `key_version` | `0` |
//! | `NEAR_RPC_URL` | `near_rpc_url` | per network |
//! | `EVM_RPC_URL` | `evm_rpc_url` | none |

use crate::error::{AdapterError, AdapterResult};
use crate::mpc::PollConfig;
use crate::types::NearNetwork;
use serde::{Deserialize, Serialize};
use url::Url;

pub const DEFAULT_DERIVATION_PATH: &str = "ethereum,1";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdapterConfig {
    #[serde(default)]
    pub network: NearNetwork,
    pub account_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mpc_contract_id: Option<String>,
    #[serde(default = "default_derivation_path")]
    pub derivation_path: String,
    #[serde(default)]
    pub key_version: u32,
    /// Gas budget for a whole sign transaction
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sign_gas: Option<u64>,
    #[serde(default)]
    pub poll: PollConfig,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub near_rpc_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evm_rpc_url: Option<String>,
}

fn default_derivation_path() -> String {
    DEFAULT_DERIVATION_PATH.to_string()
}

impl AdapterConfig {
    pub fn new(account_id: impl Into<String>) -> Self {
        let account_id = account_id.into();
        Self {
            network: NearNetwork::from_account_id(&account_id),
            account_id,
            mpc_contract_id: None,
            derivation_path: default_derivation_path(),
            key_version: 0,
            sign_gas: None,
            poll: PollConfig::default(),
            near_rpc_url: None,
            evm_rpc_url: None,
        }
    }

    pub fn from_json(json: &str) -> AdapterResult<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| AdapterError::config(format!("Invalid config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_env() -> AdapterResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; empty values count as unset
    pub fn from_lookup<F>(lookup: F) -> AdapterResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let account_id = get("NEAR_ACCOUNT_ID")
            .ok_or_else(|| AdapterError::config("NEAR_ACCOUNT_ID is not set"))?;
        let mut config = Self::new(account_id);

        if let Some(network) = get("NEAR_NETWORK") {
            config.network = network.parse()?;
        }
        config.mpc_contract_id = get("MPC_CONTRACT_ID");
        if let Some(path) = get("MPC_PATH") {
            config.derivation_path = path;
        }
        if let Some(version) = get("MPC_KEY_VERSION") {
            config.key_version = version
                .parse()
                .map_err(|_| AdapterError::config(format!("Invalid MPC_KEY_VERSION: {}", version)))?;
        }
        config.near_rpc_url = get("NEAR_RPC_URL");
        config.evm_rpc_url = get("EVM_RPC_URL");

        config.validate()?;
        Ok(config)
    }

    pub fn mpc_contract_id(&self) -> &str {
        self.mpc_contract_id
            .as_deref()
            .unwrap_or_else(|| self.network.mpc_contract_id())
    }

    pub fn near_rpc_url(&self) -> &str {
        self.near_rpc_url
            .as_deref()
            .unwrap_or_else(|| self.network.rpc_url())
    }

    pub fn validate(&self) -> AdapterResult<()> {
        validate_account_id(&self.account_id)?;
        validate_account_id(self.mpc_contract_id())?;

        if self.derivation_path.is_empty() {
            return Err(AdapterError::config("Derivation path must not be empty"));
        }
        if self.poll.max_attempts == 0 {
            return Err(AdapterError::config("poll.max_attempts must be at least 1"));
        }

        validate_rpc_url(self.near_rpc_url())?;
        if let Some(url) = &self.evm_rpc_url {
            validate_rpc_url(url)?;
        }
        Ok(())
    }
}

/// NEAR account ids: 2-64 chars of `a-z 0-9 . _ -`
fn validate_account_id(account_id: &str) -> AdapterResult<()> {
    let valid_chars = account_id
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '.' | '_' | '-'));
    if (2..=64).contains(&account_id.len()) && valid_chars {
        Ok(())
    } else {
        Err(AdapterError::config(format!("Invalid NEAR account id: {:?}", account_id)))
    }
}

/// HTTPS, or plain HTTP to a local node
pub fn validate_rpc_url(raw: &str) -> AdapterResult<()> {
    let parsed = Url::parse(raw)
        .map_err(|e| AdapterError::config(format!("Invalid URL format: {}", e)).with_details(raw))?;

    match parsed.scheme() {
        "https" => Ok(()),
        "http" => match parsed.host_str() {
            Some("localhost") | Some("127.0.0.1") | Some("[::1]") => Ok(()),
            _ => Err(AdapterError::config("HTTPS required for remote endpoints").with_details(raw)),
        },
        other => Err(AdapterError::config(format!("Unsupported URL scheme: {}", other)).with_details(raw)),
    }
}
