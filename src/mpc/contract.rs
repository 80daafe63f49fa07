//! MPC signer contract client
//!
//! Request lifecycle:
//!
//! ```text
//! BUILT -> SUBMITTED -> POLLING* -> FINALIZED
//!             |                  \
//!             v                   -> (attempts exhausted) FINALIZED with last outcome
//!           FAILED
//! ```
//!
//! A submitted request is never resubmitted. Polling gives up quietly after
//! `max_attempts`; a missing signature is reported when the outcome is decoded.

use super::outcome::{FinalExecutionOutcome, SignaturePayload};
use super::request::{build_sign_request, FunctionCallRequest, FALLBACK_DEPOSIT_YOCTO};
use crate::chains::ControllerChain;
use crate::error::{AdapterError, AdapterResult, ErrorCode};
use crate::kdf::RootPublicKey;
use crate::serde_bytes::u128_dec;
use crate::types::TxExecutionStatus;
use crate::utils::OnceCache;
use crate::{log_debug, log_info, log_warn};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

const MODULE: &str = "mpc";

/// View methods returning the root public key, tried in order
pub const PUBLIC_KEY_METHODS: &[&str] = &["public_key"];

/// View methods returning the required deposit, tried in order. Some
/// deployed contracts expose only the misspelled name.
pub const DEPOSIT_METHODS: &[&str] = &[
    "experimental_signature_deposit",
    "experimantal_signature_deposit",
];

/// Root key cache owned by each contract handle
pub type RootKeyCache = OnceCache<RootPublicKey>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollConfig {
    pub interval_ms: u64,
    pub max_attempts: u32,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval_ms: 1_000,
            max_attempts: 30,
        }
    }
}

impl PollConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestState {
    Built,
    Submitted,
    Polling { attempt: u32 },
    Finalized,
    Failed,
}

impl fmt::Display for RequestState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestState::Built => f.write_str("BUILT"),
            RequestState::Submitted => f.write_str("SUBMITTED"),
            RequestState::Polling { attempt } => write!(f, "POLLING({})", attempt),
            RequestState::Finalized => f.write_str("FINALIZED"),
            RequestState::Failed => f.write_str("FAILED"),
        }
    }
}

/// Handle on the signer contract, acting as `account_id`
pub struct MpcContract {
    contract_id: String,
    account_id: String,
    controller: Arc<dyn ControllerChain>,
    root_key: RootKeyCache,
    poll: PollConfig,
}

impl MpcContract {
    pub fn new(
        contract_id: impl Into<String>,
        account_id: impl Into<String>,
        controller: Arc<dyn ControllerChain>,
    ) -> Self {
        Self {
            contract_id: contract_id.into(),
            account_id: account_id.into(),
            controller,
            root_key: RootKeyCache::new(),
            poll: PollConfig::default(),
        }
    }

    pub fn with_poll_config(mut self, poll: PollConfig) -> Self {
        self.poll = poll;
        self
    }

    pub fn contract_id(&self) -> &str {
        &self.contract_id
    }

    pub fn account_id(&self) -> &str {
        &self.account_id
    }

    /// Try each alias in order. `MethodNotFound` moves on to the next alias;
    /// any other error stops the chain.
    async fn view_with_aliases(&self, aliases: &[&str]) -> AdapterResult<serde_json::Value> {
        let mut last_error = AdapterError::method_not_found(aliases.join(" | "));
        for method in aliases {
            match self
                .controller
                .view_function(&self.contract_id, method, serde_json::json!({}))
                .await
            {
                Ok(value) => return Ok(value),
                Err(e) if e.code == ErrorCode::MethodNotFound => {
                    log_debug!(MODULE, "View method not found", method = method);
                    last_error = e;
                }
                Err(e) => return Err(e),
            }
        }
        Err(last_error)
    }

    /// Fetched on first use, then served from the cache
    pub async fn root_public_key(&self) -> AdapterResult<RootPublicKey> {
        if let Some(key) = self.root_key.get() {
            return Ok(key);
        }

        let value = self.view_with_aliases(PUBLIC_KEY_METHODS).await?;
        let encoded = value.as_str().ok_or_else(|| {
            AdapterError::invalid_public_key("public_key view did not return a string")
                .with_details(value.to_string())
        })?;
        let key = RootPublicKey::parse(encoded)?;

        log_info!(MODULE, "Fetched root public key", contract = self.contract_id, key = key);
        Ok(self.root_key.set(key))
    }

    pub fn invalidate_root_key(&self) {
        self.root_key.invalidate();
    }

    /// Deposit attached to each `sign` call, in yoctoNEAR
    pub async fn signature_deposit(&self) -> u128 {
        let reported = self
            .view_with_aliases(DEPOSIT_METHODS)
            .await
            .and_then(|value| {
                u128_dec::parse(&value)
                    .ok_or_else(|| AdapterError::parse_error(format!("Invalid deposit: {}", value)))
            });

        match reported {
            Ok(deposit) => deposit,
            Err(e) => {
                log_warn!(
                    MODULE,
                    "Deposit query failed, using fallback",
                    error = e,
                    deposit = FALLBACK_DEPOSIT_YOCTO
                );
                FALLBACK_DEPOSIT_YOCTO
            }
        }
    }

    /// The `sign` transaction for `digests`, not yet submitted
    pub async fn encode_sign_request(
        &self,
        digests: &[[u8; 32]],
        path: &str,
        key_version: u32,
        gas: Option<u64>,
    ) -> AdapterResult<FunctionCallRequest> {
        if digests.is_empty() {
            return Err(AdapterError::invalid_input("No payloads to sign"));
        }
        let deposit = self.signature_deposit().await;
        Ok(build_sign_request(
            &self.account_id,
            &self.contract_id,
            digests,
            path,
            key_version,
            gas,
            deposit,
        ))
    }

    pub async fn request_signature(
        &self,
        digest: [u8; 32],
        path: &str,
        key_version: u32,
        gas: Option<u64>,
    ) -> AdapterResult<SignaturePayload> {
        let request = self.encode_sign_request(&[digest], path, key_version, gas).await?;
        let (tx_hash, outcome) = self.submit_and_wait(&request).await?;
        self.finish(&tx_hash, outcome.require_signature(&tx_hash))
    }

    /// One transaction, one signature per digest. Payloads come back in
    /// receipt order, which need not match digest order; callers pair them
    /// by recovery. A partial result is an error.
    pub async fn request_many(
        &self,
        digests: &[[u8; 32]],
        path: &str,
        key_version: u32,
        gas: Option<u64>,
    ) -> AdapterResult<Vec<SignaturePayload>> {
        let request = self.encode_sign_request(digests, path, key_version, gas).await?;
        let (tx_hash, outcome) = self.submit_and_wait(&request).await?;
        self.finish(&tx_hash, outcome.require_signatures(&tx_hash, digests.len()))
    }

    fn finish<T>(&self, tx_hash: &str, result: AdapterResult<T>) -> AdapterResult<T> {
        match &result {
            Ok(_) => self.transition(RequestState::Finalized, tx_hash),
            Err(e) => {
                self.transition(RequestState::Failed, tx_hash);
                log_warn!(MODULE, "No signature in outcome", tx_hash = tx_hash, error = e);
            }
        }
        result
    }

    /// Submit `request` and poll for its outcome; returns the request id too
    pub async fn submit_and_wait(
        &self,
        request: &FunctionCallRequest,
    ) -> AdapterResult<(String, FinalExecutionOutcome)> {
        self.transition(RequestState::Built, "");

        let tx_hash = match self.controller.sign_and_broadcast(request).await {
            Ok(hash) => hash,
            Err(e) => {
                self.transition(RequestState::Failed, "");
                let failed = AdapterError::submission_failed(format!(
                    "Sign request was not accepted: {}",
                    e.message
                ));
                return Err(match e.details {
                    Some(details) => failed.with_details(details),
                    None => failed,
                });
            }
        };
        self.transition(RequestState::Submitted, &tx_hash);

        let outcome = self.poll_outcome(&tx_hash).await;
        Ok((tx_hash, outcome))
    }

    /// Poll until the transaction has executed. Never fails: on exhaustion
    /// the last outcome seen (or an empty one) is returned.
    pub async fn poll_outcome(&self, tx_hash: &str) -> FinalExecutionOutcome {
        let mut last_seen = None;

        for attempt in 1..=self.poll.max_attempts {
            self.transition(RequestState::Polling { attempt }, tx_hash);

            match self
                .controller
                .transaction_status(tx_hash, &self.account_id, TxExecutionStatus::ExecutedOptimistic)
                .await
            {
                Ok(outcome) if outcome.final_execution_status.is_executed() => return outcome,
                Ok(outcome) => {
                    log_debug!(
                        MODULE,
                        "Not executed yet",
                        tx_hash = tx_hash,
                        status = outcome.final_execution_status
                    );
                    last_seen = Some(outcome);
                }
                Err(e) => log_debug!(MODULE, "Status query failed", tx_hash = tx_hash, error = e),
            }

            if attempt < self.poll.max_attempts {
                tokio::time::sleep(self.poll.interval()).await;
            }
        }

        let exhausted = AdapterError::new(ErrorCode::PollingExhausted, "Polling attempts exhausted")
            .with_details(tx_hash.to_string());
        log_warn!(
            MODULE,
            "Giving up on outcome",
            tx_hash = tx_hash,
            attempts = self.poll.max_attempts,
            error = exhausted
        );
        last_seen.unwrap_or_default()
    }

    fn transition(&self, state: RequestState, tx_hash: &str) {
        match state {
            RequestState::Polling { .. } => {
                log_debug!(MODULE, "Sign request", state = state, tx_hash = tx_hash)
            }
            RequestState::Failed => {
                log_warn!(MODULE, "Sign request", state = state, tx_hash = tx_hash)
            }
            _ => log_info!(
                MODULE,
                "Sign request",
                state = state,
                contract = self.contract_id,
                tx_hash = tx_hash
            ),
        }
    }
}
