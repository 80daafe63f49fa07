//! NEAR → EVM adapter
//!
//! A NEAR account acting as an EVM account. Every operation runs the same
//! pipeline, in order:
//!
//! 1. route the intent to a digest (populating transactions from the EVM chain)
//! 2. submit a `sign` request to the MPC contract and poll for the outcome
//! 3. reconstruct the signature and check it recovers to [`NearEthAdapter::address`]
//! 4. for transactions, attach the signature and relay
//!
//! Nothing is retried except outcome polling.

use crate::chains::{ControllerChain, EvmJsonRpc, NearJsonRpc, TargetChain, TransactionSigner};
use crate::config::AdapterConfig;
use crate::eip712::TypedData;
use crate::error::{AdapterError, AdapterResult};
use crate::intent::{route, RecoverableMessage, RoutedPayload, SessionRequest, SigningIntent, TransactionIntent};
use crate::kdf::{to_address, uncompressed_hex};
use crate::mpc::{FunctionCallRequest, MpcContract};
use crate::signature::{reconstruct_payload, MpcSignature};
use crate::utils::keccak256;
use crate::{log_debug, log_info};
use ethers_core::types::transaction::eip2718::TypedTransaction;
use ethers_core::types::Bytes;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, OnceLock};

const MODULE: &str = "adapter";

/// A sign request ready for an external NEAR wallet to submit
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedSignRequest {
    pub near_payload: FunctionCallRequest,
    pub recoverable: RecoverableMessage,
    pub hash_to_sign: [u8; 32],
}

/// Output of [`NearEthAdapter::sign_intent`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SignedArtifact {
    Transaction {
        raw: Bytes,
        #[serde(with = "crate::serde_bytes::hex32")]
        hash: [u8; 32],
    },
    Signature {
        hex: String,
    },
}

pub struct NearEthAdapter {
    config: AdapterConfig,
    mpc: MpcContract,
    target: Arc<dyn TargetChain>,
    address: OnceLock<String>,
}

impl NearEthAdapter {
    pub fn new(
        config: AdapterConfig,
        controller: Arc<dyn ControllerChain>,
        target: Arc<dyn TargetChain>,
    ) -> AdapterResult<Self> {
        config.validate()?;
        let mpc = MpcContract::new(config.mpc_contract_id(), &config.account_id, controller)
            .with_poll_config(config.poll);
        Ok(Self {
            config,
            mpc,
            target,
            address: OnceLock::new(),
        })
    }

    /// JSON-RPC clients for both chains, built from `config`
    pub fn from_config(config: AdapterConfig, signer: Arc<dyn TransactionSigner>) -> AdapterResult<Self> {
        let evm_url = config
            .evm_rpc_url
            .clone()
            .ok_or_else(|| AdapterError::config("EVM_RPC_URL is not set"))?;
        let near = NearJsonRpc::new(config.near_rpc_url())?.with_signer(signer);
        let evm = EvmJsonRpc::new(evm_url)?;
        Self::new(config, Arc::new(near), Arc::new(evm))
    }

    pub fn builder() -> AdapterBuilder {
        AdapterBuilder::default()
    }

    pub fn config(&self) -> &AdapterConfig {
        &self.config
    }

    pub fn mpc(&self) -> &MpcContract {
        &self.mpc
    }

    pub fn account_id(&self) -> &str {
        &self.config.account_id
    }

    pub fn derivation_path(&self) -> &str {
        &self.config.derivation_path
    }

    /// Derived once from the root key, then memoized
    pub async fn address(&self) -> AdapterResult<String> {
        if let Some(address) = self.address.get() {
            return Ok(address.clone());
        }
        let child = self.derived_public_key().await?;
        let address = self.address.get_or_init(|| to_address(&child));

        log_info!(
            MODULE,
            "Derived address",
            account = self.config.account_id,
            path = self.config.derivation_path,
            address = address
        );
        Ok(address.clone())
    }

    pub async fn derived_public_key(&self) -> AdapterResult<secp256k1::PublicKey> {
        let root = self.mpc.root_public_key().await?;
        root.derive(&self.config.account_id, &self.config.derivation_path)
    }

    pub async fn derived_public_key_hex(&self) -> AdapterResult<String> {
        Ok(uncompressed_hex(&self.derived_public_key().await?))
    }

    async fn route(&self, intent: SigningIntent) -> AdapterResult<RoutedPayload> {
        let sender = self.address().await?;
        let routed = route(intent, &sender, self.target.as_ref()).await?;
        log_debug!(MODULE, "Routed intent", hash = routed.digest_hex());
        Ok(routed)
    }

    /// Route `intent` and build the NEAR transaction without submitting it
    pub async fn encode_sign_request(&self, intent: SigningIntent) -> AdapterResult<EncodedSignRequest> {
        let routed = self.route(intent).await?;
        let near_payload = self
            .mpc
            .encode_sign_request(
                &[routed.digest],
                &self.config.derivation_path,
                self.config.key_version,
                self.config.sign_gas,
            )
            .await?;
        Ok(EncodedSignRequest {
            near_payload,
            hash_to_sign: routed.digest,
            recoverable: routed.recoverable,
        })
    }

    pub async fn handle_session_request(&self, request: &SessionRequest) -> AdapterResult<EncodedSignRequest> {
        let intent = SigningIntent::from_session_request(request)?;
        self.encode_sign_request(intent).await
    }

    /// Request a signature for a routed payload and check it against its signer
    async fn sign_routed(&self, routed: &RoutedPayload) -> AdapterResult<MpcSignature> {
        let payload = self
            .mpc
            .request_signature(
                routed.digest,
                &self.config.derivation_path,
                self.config.key_version,
                self.config.sign_gas,
            )
            .await?;
        reconstruct_payload(&payload, &routed.digest, Some(routed.recoverable.expected_signer()))
    }

    pub async fn sign_intent(&self, intent: SigningIntent) -> AdapterResult<SignedArtifact> {
        let routed = self.route(intent).await?;
        let signature = self.sign_routed(&routed).await?;

        match &routed.recoverable {
            RecoverableMessage::Transaction { tx, .. } => {
                let raw = signed_transaction(tx, &signature);
                Ok(SignedArtifact::Transaction {
                    hash: keccak256(&raw),
                    raw,
                })
            }
            RecoverableMessage::Personal { .. } | RecoverableMessage::Typed { .. } => {
                Ok(SignedArtifact::Signature {
                    hex: signature.to_hex(),
                })
            }
        }
    }

    /// Sign a transaction and relay it; returns the EVM transaction hash
    pub async fn sign_and_send(&self, tx: impl Into<TransactionIntent>) -> AdapterResult<String> {
        let raw = match self.sign_intent(SigningIntent::RawTransaction(tx.into())).await? {
            SignedArtifact::Transaction { raw, .. } => raw,
            SignedArtifact::Signature { .. } => {
                return Err(AdapterError::internal("Transaction intent produced a message signature"))
            }
        };
        self.target.send_raw_transaction(&raw).await
    }

    /// `personal_sign` over `message`; returns the 65-byte signature as hex
    pub async fn sign_message(&self, message: impl AsRef<[u8]>) -> AdapterResult<String> {
        let signer = self.address().await?;
        let intent = SigningIntent::PersonalMessage {
            message: message.as_ref().to_vec(),
            signer,
        };
        self.signature_hex(intent).await
    }

    pub async fn sign_typed_data(&self, typed_data: TypedData) -> AdapterResult<String> {
        let signer = self.address().await?;
        self.signature_hex(SigningIntent::StructuredMessage { typed_data, signer })
            .await
    }

    async fn signature_hex(&self, intent: SigningIntent) -> AdapterResult<String> {
        match self.sign_intent(intent).await? {
            SignedArtifact::Signature { hex } => Ok(hex),
            SignedArtifact::Transaction { .. } => {
                Err(AdapterError::internal("Message intent produced a transaction"))
            }
        }
    }

    /// Sign raw digests in one request; output order follows input order
    pub async fn sign_digests(&self, digests: &[[u8; 32]]) -> AdapterResult<Vec<MpcSignature>> {
        let signer = self.address().await?;
        let payloads = self
            .mpc
            .request_many(
                digests,
                &self.config.derivation_path,
                self.config.key_version,
                self.config.sign_gas,
            )
            .await?;

        // Callback receipts may resolve in any order; pair each digest with
        // the payload that recovers to our address over it.
        let mut remaining = payloads;
        let mut signatures = Vec::with_capacity(digests.len());
        for digest in digests {
            let matched = remaining.iter().enumerate().find_map(|(i, payload)| {
                reconstruct_payload(payload, digest, Some(&signer))
                    .ok()
                    .map(|signature| (i, signature))
            });
            match matched {
                Some((i, signature)) => {
                    remaining.swap_remove(i);
                    signatures.push(signature);
                }
                None => {
                    return Err(AdapterError::signature_mismatch(format!(
                        "No signature in the batch recovers to {}",
                        signer
                    ))
                    .with_details(format!("0x{}", hex::encode(digest))))
                }
            }
        }
        Ok(signatures)
    }
}

/// Serialize `tx` with `signature` attached. Legacy transactions use
/// EIP-155 `v`; typed transactions use the y-parity bit.
pub fn signed_transaction(tx: &TypedTransaction, signature: &MpcSignature) -> Bytes {
    let v = match (tx, tx.chain_id()) {
        (TypedTransaction::Legacy(_), Some(chain_id)) => eip155_v(signature.recovery_bit, chain_id.as_u64()),
        (TypedTransaction::Legacy(_), None) => signature.v() as u64,
        _ => signature.y_parity() as u64,
    };
    tx.rlp_signed(&signature.to_eth_signature(v))
}

/// `recovery_bit + 35 + 2 * chain_id`
pub fn eip155_v(recovery_bit: u8, chain_id: u64) -> u64 {
    recovery_bit as u64 + 35 + 2 * chain_id
}

#[derive(Default)]
pub struct AdapterBuilder {
    config: Option<AdapterConfig>,
    controller: Option<Arc<dyn ControllerChain>>,
    target: Option<Arc<dyn TargetChain>>,
}

impl AdapterBuilder {
    pub fn config(mut self, config: AdapterConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn account_id(self, account_id: &str) -> Self {
        self.config(AdapterConfig::new(account_id))
    }

    pub fn controller(mut self, controller: Arc<dyn ControllerChain>) -> Self {
        self.controller = Some(controller);
        self
    }

    pub fn target(mut self, target: Arc<dyn TargetChain>) -> Self {
        self.target = Some(target);
        self
    }

    pub fn build(self) -> AdapterResult<NearEthAdapter> {
        let config = self
            .config
            .ok_or_else(|| AdapterError::config("Adapter config is required"))?;
        let controller = self
            .controller
            .ok_or_else(|| AdapterError::config("Controller chain is required"))?;
        let target = self
            .target
            .ok_or_else(|| AdapterError::config("Target chain is required"))?;
        NearEthAdapter::new(config, controller, target)
    }
}
