use async_trait::async_trait;
use base64::Engine;
use ethers_core::types::transaction::eip2718::TypedTransaction;
use ethers_core::types::{Address, U256};
use ethers_core::utils::rlp;
use mpc_adapter::chains::{ControllerChain, FeeEstimate, TargetChain};
use mpc_adapter::eip712::TypedData;
use mpc_adapter::intent::build_transaction;
use mpc_adapter::mpc::{
    ExecutionOutcome, ExecutionStatus, FinalExecutionOutcome, FunctionCallRequest, PollConfig,
    ReceiptOutcome, SignArgs, TransactionView,
};
use mpc_adapter::{
    derive_epsilon, hash_personal_message, keccak256, recover_address, to_address, AdapterConfig,
    AdapterResult, BaseTx, ErrorCode, MpcSignature, NearEthAdapter, RecoverableMessage,
    SessionRequest, SignedArtifact, SigningIntent, TransactionIntent, TxExecutionStatus,
};
use secp256k1::{Message, PublicKey, Secp256k1, SecretKey};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

const ACCOUNT: &str = "alice.testnet";
const PATH: &str = "ethereum,1";
const CHAIN_ID: u64 = 11155111;

#[derive(Clone, Copy, PartialEq)]
enum Mode {
    Respond,
    /// Batch receipts resolve in reverse submission order
    Reversed,
    Legacy,
    WrongKey,
    Stall,
}

fn root_secret() -> SecretKey {
    SecretKey::from_slice(&[0x11; 32]).expect("valid root secret")
}

fn child_secret() -> SecretKey {
    root_secret()
        .add_tweak(&derive_epsilon(ACCOUNT, PATH))
        .expect("tweak in range")
}

fn near_public_key(secret: &SecretKey) -> String {
    let point = PublicKey::from_secret_key(&Secp256k1::new(), secret).serialize_uncompressed();
    format!("secp256k1:{}", bs58::encode(&point[1..]).into_string())
}

fn child_address() -> String {
    to_address(&PublicKey::from_secret_key(&Secp256k1::new(), &child_secret()))
}

fn b64(value: &Value) -> String {
    base64::engine::general_purpose::STANDARD.encode(value.to_string())
}

/// Plays the MPC contract: signs every requested payload with the child key
struct MockController {
    mode: Mode,
    submitted: Mutex<Vec<FunctionCallRequest>>,
    outcomes: Mutex<HashMap<String, FinalExecutionOutcome>>,
}

impl MockController {
    fn new(mode: Mode) -> Self {
        Self {
            mode,
            submitted: Mutex::new(Vec::new()),
            outcomes: Mutex::new(HashMap::new()),
        }
    }

    fn submissions(&self) -> usize {
        self.submitted.lock().unwrap().len()
    }

    fn sign(&self, payload: [u8; 32]) -> Value {
        let key = match self.mode {
            Mode::WrongKey => SecretKey::from_slice(&[0x77; 32]).unwrap(),
            _ => child_secret(),
        };
        let (recovery_id, compact) = Secp256k1::new()
            .sign_ecdsa_recoverable(&Message::from_digest(payload), &key)
            .serialize_compact();
        let recovery_id = recovery_id.to_i32() as u8;
        let big_r = format!("{:02X}{}", 2 + recovery_id, hex::encode_upper(&compact[..32]));
        let s = hex::encode_upper(&compact[32..]);

        match self.mode {
            Mode::Legacy => json!([big_r, s]),
            _ => json!({
                "big_r": {"affine_point": big_r},
                "s": {"scalar": s},
                "recovery_id": recovery_id
            }),
        }
    }
}

#[async_trait]
impl ControllerChain for MockController {
    async fn view_function(&self, _contract_id: &str, method: &str, _args: Value) -> AdapterResult<Value> {
        match method {
            "public_key" => Ok(json!(near_public_key(&root_secret()))),
            "experimental_signature_deposit" => Ok(json!("1")),
            other => Err(mpc_adapter::AdapterError::method_not_found(other)),
        }
    }

    async fn sign_and_broadcast(&self, request: &FunctionCallRequest) -> AdapterResult<String> {
        let mut submitted = self.submitted.lock().unwrap();
        submitted.push(request.clone());
        let tx_hash = format!("NearTx{}", submitted.len());

        let mut responses: Vec<Value> = request
            .actions
            .iter()
            .map(|action| {
                let args: SignArgs = serde_json::from_value(action.args.clone()).unwrap();
                self.sign(args.request.payload)
            })
            .collect();
        if self.mode == Mode::Reversed {
            responses.reverse();
        }

        let outcome = if self.mode == Mode::Stall {
            FinalExecutionOutcome {
                final_execution_status: TxExecutionStatus::Included,
                ..Default::default()
            }
        } else {
            FinalExecutionOutcome {
                final_execution_status: TxExecutionStatus::ExecutedOptimistic,
                status: match responses.as_slice() {
                    [single] => ExecutionStatus::SuccessValue(b64(single)),
                    _ => ExecutionStatus::SuccessValue(String::new()),
                },
                transaction: TransactionView {
                    hash: tx_hash.clone(),
                    signer_id: request.signer_id.clone(),
                },
                receipts_outcome: responses
                    .iter()
                    .enumerate()
                    .map(|(i, response)| ReceiptOutcome {
                        id: format!("receipt{}", i),
                        outcome: ExecutionOutcome {
                            status: ExecutionStatus::SuccessValue(b64(response)),
                            ..Default::default()
                        },
                    })
                    .collect(),
            }
        };
        self.outcomes.lock().unwrap().insert(tx_hash.clone(), outcome);
        Ok(tx_hash)
    }

    async fn transaction_status(
        &self,
        tx_hash: &str,
        _sender_id: &str,
        _wait_until: TxExecutionStatus,
    ) -> AdapterResult<FinalExecutionOutcome> {
        Ok(self
            .outcomes
            .lock()
            .unwrap()
            .get(tx_hash)
            .cloned()
            .unwrap_or_default())
    }
}

#[derive(Default)]
struct MockTarget {
    queries: AtomicUsize,
    sent: Mutex<Vec<Vec<u8>>>,
}

#[async_trait]
impl TargetChain for MockTarget {
    async fn get_transaction_count(&self, _address: &str) -> AdapterResult<U256> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        Ok(U256::from(7u64))
    }

    async fn estimate_gas(&self, _tx: &BaseTx, _from: &str) -> AdapterResult<U256> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        Ok(U256::from(21_000u64))
    }

    async fn estimate_fees_per_gas(&self) -> AdapterResult<FeeEstimate> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        Ok(FeeEstimate {
            max_fee_per_gas: U256::from(3_000_000_000u64),
            max_priority_fee_per_gas: U256::from(1_000_000_000u64),
        })
    }

    async fn send_raw_transaction(&self, raw: &[u8]) -> AdapterResult<String> {
        self.sent.lock().unwrap().push(raw.to_vec());
        Ok(format!("0x{}", hex::encode(keccak256(raw))))
    }
}

fn adapter_with(mode: Mode) -> (NearEthAdapter, Arc<MockController>, Arc<MockTarget>) {
    let controller = Arc::new(MockController::new(mode));
    let target = Arc::new(MockTarget::default());
    let mut config = AdapterConfig::new(ACCOUNT);
    config.poll = PollConfig {
        interval_ms: 1,
        max_attempts: 3,
    };
    let adapter = NearEthAdapter::builder()
        .config(config)
        .controller(controller.clone())
        .target(target.clone())
        .build()
        .expect("adapter builds");
    (adapter, controller, target)
}

fn recipient() -> Address {
    Address::from_str("0xdeADBeeF0000000000000000000000000000dEaD").unwrap()
}

fn decode_signed(raw: &[u8]) -> (TypedTransaction, ethers_core::types::Signature) {
    TypedTransaction::decode_signed(&rlp::Rlp::new(raw)).expect("signed transaction decodes")
}

fn mail_typed_data() -> TypedData {
    TypedData::from_value(&json!({
        "types": {
            "EIP712Domain": [
                {"name": "name", "type": "string"},
                {"name": "version", "type": "string"},
                {"name": "chainId", "type": "uint256"},
                {"name": "verifyingContract", "type": "address"}
            ],
            "Person": [
                {"name": "name", "type": "string"},
                {"name": "wallet", "type": "address"}
            ],
            "Mail": [
                {"name": "from", "type": "Person"},
                {"name": "to", "type": "Person"},
                {"name": "contents", "type": "string"}
            ]
        },
        "primaryType": "Mail",
        "domain": {
            "name": "Ether Mail",
            "version": "1",
            "chainId": 1,
            "verifyingContract": "0xCcCCccccCCCCcCCCCCCcCcCccCcCCCcCcccccccC"
        },
        "message": {
            "from": {"name": "Cow", "wallet": "0xCD2a3d9F938E13CD947Ec05AbC7FE734Df8DD826"},
            "to": {"name": "Bob", "wallet": "0xbBbBBBBbbBBBbbbBbbBbbbbBBbBbbbbBbBbbBBbB"},
            "contents": "Hello, Bob!"
        }
    }))
    .expect("mail typed data parses")
}

#[tokio::test]
async fn address_matches_child_key() {
    let (adapter, _, _) = adapter_with(Mode::Respond);

    let address = adapter.address().await.unwrap();
    assert_eq!(address, child_address());
    assert_eq!(adapter.address().await.unwrap(), address);
    assert_eq!(
        adapter.derived_public_key_hex().await.unwrap(),
        hex::encode(PublicKey::from_secret_key(&Secp256k1::new(), &child_secret()).serialize_uncompressed())
    );
}

#[tokio::test]
async fn sign_and_send_relays_recoverable_transaction() {
    let (adapter, controller, target) = adapter_with(Mode::Respond);
    let tx = BaseTx::new(recipient(), U256::from(1_000u64), CHAIN_ID);

    let tx_hash = adapter.sign_and_send(tx).await.unwrap();

    let sent = target.sent.lock().unwrap();
    assert_eq!(sent.len(), 1);
    assert_eq!(tx_hash, format!("0x{}", hex::encode(keccak256(&sent[0]))));

    let (decoded, signature) = decode_signed(&sent[0]);
    assert_eq!(decoded.nonce(), Some(&U256::from(7u64)));
    assert_eq!(decoded.gas(), Some(&U256::from(21_000u64)));
    assert_eq!(decoded.chain_id().map(|c| c.as_u64()), Some(CHAIN_ID));
    assert!(signature.v <= 1, "typed transactions carry y-parity");

    let recovered = signature.recover(decoded.sighash()).unwrap();
    assert_eq!(format!("{:?}", recovered), child_address().to_lowercase());

    let submitted = controller.submitted.lock().unwrap();
    assert_eq!(submitted.len(), 1);
    assert_eq!(submitted[0].receiver_id, "v1.signer-prod.testnet");
    assert_eq!(submitted[0].actions[0].deposit, 1);
}

#[tokio::test]
async fn serialized_transaction_signed_without_chain_queries() {
    let (adapter, _, target) = adapter_with(Mode::Respond);
    let sender = adapter.address().await.unwrap();

    let mut tx = BaseTx::new(recipient(), U256::from(5u64), CHAIN_ID);
    tx.nonce = Some(U256::from(3u64));
    tx.gas = Some(U256::from(21_000u64));
    tx.max_fee_per_gas = Some(U256::from(2_000_000_000u64));
    tx.max_priority_fee_per_gas = Some(U256::from(1_000_000_000u64));
    let unsigned = build_transaction(&tx, &sender).unwrap();

    let intent = SigningIntent::RawTransaction(TransactionIntent::Serialized(unsigned.rlp().to_vec()));
    let artifact = adapter.sign_intent(intent).await.unwrap();

    let SignedArtifact::Transaction { raw, hash } = artifact else {
        panic!("expected a transaction artifact");
    };
    assert_eq!(hash, keccak256(&raw));
    let (decoded, signature) = decode_signed(&raw);
    assert_eq!(decoded.sighash(), unsigned.sighash());
    assert!(signature.recover(decoded.sighash()).is_ok());
    assert_eq!(target.queries.load(Ordering::SeqCst), 0);
    assert!(target.sent.lock().unwrap().is_empty());
}

#[tokio::test]
async fn sign_message_recovers_to_adapter_address() {
    for mode in [Mode::Respond, Mode::Legacy] {
        let (adapter, _, _) = adapter_with(mode);

        let signature_hex = adapter.sign_message("Hello!").await.unwrap();
        let bytes = hex::decode(signature_hex.trim_start_matches("0x")).unwrap();
        assert_eq!(bytes.len(), 65);

        let signature = MpcSignature::from_bytes(&bytes).unwrap();
        let recovered = recover_address(&hash_personal_message(b"Hello!"), &signature).unwrap();
        assert_eq!(recovered, child_address());
    }
}

#[tokio::test]
async fn sign_typed_data_recovers_to_adapter_address() {
    let (adapter, _, _) = adapter_with(Mode::Respond);
    let typed_data = mail_typed_data();
    let digest = mpc_adapter::eip712::hash_typed_data(&typed_data).unwrap();

    let signature_hex = adapter.sign_typed_data(typed_data).await.unwrap();
    let bytes = hex::decode(signature_hex.trim_start_matches("0x")).unwrap();
    let signature = MpcSignature::from_bytes(&bytes).unwrap();

    assert_eq!(recover_address(&digest, &signature).unwrap(), child_address());
}

#[tokio::test]
async fn sign_digests_preserves_order() {
    for mode in [Mode::Respond, Mode::Reversed] {
        let (adapter, controller, _) = adapter_with(mode);
        let digests = [[0x01; 32], [0x02; 32], [0x03; 32]];

        let signatures = adapter.sign_digests(&digests).await.unwrap();

        assert_eq!(signatures.len(), 3);
        for (digest, signature) in digests.iter().zip(&signatures) {
            assert_eq!(recover_address(digest, signature).unwrap(), child_address());
        }
        assert_eq!(controller.submissions(), 1);
        assert_eq!(controller.submitted.lock().unwrap()[0].actions.len(), 3);
    }
}

#[tokio::test]
async fn sign_digests_rejects_foreign_batch() {
    let (adapter, _, _) = adapter_with(Mode::WrongKey);

    let err = adapter.sign_digests(&[[0x01; 32], [0x02; 32]]).await.unwrap_err();
    assert_eq!(err.code, ErrorCode::SignatureMismatch);
}

#[tokio::test]
async fn session_request_encodes_without_submitting() {
    let (adapter, controller, _) = adapter_with(Mode::Respond);
    let address = adapter.address().await.unwrap();

    let request = SessionRequest::parse("personal_sign", CHAIN_ID, json!(["0x48656c6c6f21", address])).unwrap();
    let encoded = adapter.handle_session_request(&request).await.unwrap();

    assert_eq!(encoded.hash_to_sign, hash_personal_message(b"Hello!"));
    assert_eq!(
        encoded.recoverable,
        RecoverableMessage::Personal {
            message: b"Hello!".to_vec(),
            signer: address,
        }
    );
    assert_eq!(encoded.near_payload.signer_id, ACCOUNT);
    assert_eq!(encoded.near_payload.receiver_id, "v1.signer-prod.testnet");

    let args: SignArgs = serde_json::from_value(encoded.near_payload.actions[0].args.clone()).unwrap();
    assert_eq!(args.request.payload, encoded.hash_to_sign);
    assert_eq!(args.request.path, PATH);
    assert_eq!(controller.submissions(), 0);
}

#[tokio::test]
async fn unsupported_session_method_rejected() {
    let err = SessionRequest::parse("eth_signTransaction", CHAIN_ID, json!([])).unwrap_err();
    assert_eq!(err.code, ErrorCode::UnsupportedSignMethod);
}

#[tokio::test]
async fn signature_from_wrong_key_is_rejected() {
    let (adapter, _, target) = adapter_with(Mode::WrongKey);

    let err = adapter.sign_message("Hello!").await.unwrap_err();
    assert_eq!(err.code, ErrorCode::SignatureMismatch);

    let err = adapter
        .sign_and_send(BaseTx::new(recipient(), U256::one(), CHAIN_ID))
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::SignatureMismatch);
    assert!(target.sent.lock().unwrap().is_empty());
}

#[tokio::test]
async fn stalled_request_reports_missing_signature() {
    let (adapter, controller, target) = adapter_with(Mode::Stall);

    let err = adapter
        .sign_and_send(BaseTx::new(recipient(), U256::one(), CHAIN_ID))
        .await
        .unwrap_err();

    assert_eq!(err.code, ErrorCode::NoSignatureFound);
    assert!(err.details.unwrap_or_default().contains("NearTx1"));
    assert_eq!(controller.submissions(), 1);
    assert!(target.sent.lock().unwrap().is_empty());
}
