//! Intent routing
//!
//! Reduces a [`SigningIntent`] to the digest the signer will sign, keeping
//! what is needed to recover the signer afterwards.
//!
//! | intent | digest |
//! |---|---|
//! | transaction | keccak256 of the unsigned serialization, type byte included |
//! | personal message | keccak256(`"\x19Ethereum Signed Message:\n" ‖ len ‖ message`) |
//! | typed data | keccak256(`0x1901 ‖ domainSeparator ‖ hashStruct(message)`) |

use super::types::*;
use crate::chains::TargetChain;
use crate::eip712::hash_typed_data;
use crate::error::{AdapterError, AdapterResult};
use crate::utils::{hash_personal_message, keccak256};
use ethers_core::types::transaction::eip2718::TypedTransaction;
use ethers_core::types::{Address, Eip1559TransactionRequest};
use ethers_core::utils::rlp;
use std::str::FromStr;

const MODULE: &str = "intent";

/// Route `intent` on behalf of `sender`; the target chain is only consulted
/// for transaction fields the caller left out
pub async fn route(
    intent: SigningIntent,
    sender: &str,
    target: &dyn TargetChain,
) -> AdapterResult<RoutedPayload> {
    match intent {
        SigningIntent::RawTransaction(TransactionIntent::Fields(fields)) => {
            let populated = populate_transaction(fields, sender, target).await?;
            let tx = build_transaction(&populated, sender)?;
            Ok(RoutedPayload {
                digest: transaction_digest(&tx),
                recoverable: RecoverableMessage::Transaction {
                    tx,
                    sender: sender.to_string(),
                },
            })
        }
        SigningIntent::RawTransaction(TransactionIntent::Serialized(bytes)) => {
            let tx = decode_unsigned_transaction(&bytes)?;
            Ok(RoutedPayload {
                digest: keccak256(&bytes),
                recoverable: RecoverableMessage::Transaction {
                    tx,
                    sender: sender.to_string(),
                },
            })
        }
        SigningIntent::PersonalMessage { message, signer } => Ok(RoutedPayload {
            digest: hash_personal_message(&message),
            recoverable: RecoverableMessage::Personal { message, signer },
        }),
        SigningIntent::StructuredMessage { typed_data, signer } => Ok(RoutedPayload {
            digest: hash_typed_data(&typed_data)?,
            recoverable: RecoverableMessage::Typed { typed_data, signer },
        }),
    }
}

/// Fill nonce, gas and fees that the caller did not set
pub async fn populate_transaction(
    mut tx: BaseTx,
    sender: &str,
    target: &dyn TargetChain,
) -> AdapterResult<BaseTx> {
    if tx.is_populated() {
        return Ok(tx);
    }

    if tx.nonce.is_none() {
        tx.nonce = Some(target.get_transaction_count(sender).await?);
    }
    if tx.gas.is_none() {
        tx.gas = Some(target.estimate_gas(&tx, sender).await?);
    }
    if tx.max_fee_per_gas.is_none() || tx.max_priority_fee_per_gas.is_none() {
        let fees = target.estimate_fees_per_gas().await?;
        tx.max_fee_per_gas.get_or_insert(fees.max_fee_per_gas);
        tx.max_priority_fee_per_gas
            .get_or_insert(fees.max_priority_fee_per_gas);
    }

    crate::log_debug!(
        MODULE,
        "Populated transaction",
        sender = sender,
        nonce = tx.nonce.unwrap_or_default(),
        gas = tx.gas.unwrap_or_default()
    );
    Ok(tx)
}

/// EIP-1559 transaction from fully populated fields
pub fn build_transaction(tx: &BaseTx, sender: &str) -> AdapterResult<TypedTransaction> {
    let from = Address::from_str(sender)
        .map_err(|e| AdapterError::invalid_input(format!("Invalid sender address: {}", e)))?;

    let missing = |field: &str| AdapterError::invalid_transaction(format!("Transaction missing {}", field));
    let request = Eip1559TransactionRequest::new()
        .from(from)
        .to(tx.to)
        .value(tx.value)
        .data(tx.data.clone())
        .chain_id(tx.chain_id)
        .nonce(tx.nonce.ok_or_else(|| missing("nonce"))?)
        .gas(tx.gas.ok_or_else(|| missing("gas"))?)
        .max_fee_per_gas(tx.max_fee_per_gas.ok_or_else(|| missing("maxFeePerGas"))?)
        .max_priority_fee_per_gas(
            tx.max_priority_fee_per_gas
                .ok_or_else(|| missing("maxPriorityFeePerGas"))?,
        );

    Ok(TypedTransaction::Eip1559(request))
}

/// keccak256 of the unsigned serialization
pub fn transaction_digest(tx: &TypedTransaction) -> [u8; 32] {
    tx.sighash().0
}

/// Decode an unsigned legacy, EIP-2930 or EIP-1559 serialization
pub fn decode_unsigned_transaction(bytes: &[u8]) -> AdapterResult<TypedTransaction> {
    if bytes.is_empty() {
        return Err(AdapterError::invalid_transaction("Empty transaction"));
    }
    rlp::decode::<TypedTransaction>(bytes)
        .map_err(|e| AdapterError::invalid_transaction(format!("Cannot decode transaction: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chains::FeeEstimate;
    use async_trait::async_trait;
    use ethers_core::types::U256;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const SENDER: &str = "0x102543f7e6B5786A444cc89Ff73012825D13000D";

    #[derive(Default)]
    struct CountingChain {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl TargetChain for CountingChain {
        async fn get_transaction_count(&self, _address: &str) -> AdapterResult<U256> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(U256::from(7))
        }

        async fn estimate_gas(&self, _tx: &BaseTx, _from: &str) -> AdapterResult<U256> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(U256::from(21_000))
        }

        async fn estimate_fees_per_gas(&self) -> AdapterResult<FeeEstimate> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(FeeEstimate {
                max_fee_per_gas: U256::from(30_000_000_000u64),
                max_priority_fee_per_gas: U256::from(1_000_000_000u64),
            })
        }

        async fn send_raw_transaction(&self, _raw: &[u8]) -> AdapterResult<String> {
            Err(AdapterError::internal("not used"))
        }
    }

    fn transfer() -> BaseTx {
        BaseTx::new(
            Address::from_str("0xdeADBeeF0000000000000000000000000000dEaD").unwrap(),
            U256::from(1_000u64),
            11155111,
        )
    }

    #[tokio::test]
    async fn test_populates_missing_fields() {
        let chain = CountingChain::default();
        let mut tx = transfer();
        tx.gas = Some(U256::from(50_000));

        let populated = populate_transaction(tx, SENDER, &chain).await.unwrap();
        assert_eq!(populated.nonce, Some(U256::from(7)));
        assert_eq!(populated.gas, Some(U256::from(50_000)));
        assert_eq!(populated.max_priority_fee_per_gas, Some(U256::from(1_000_000_000u64)));
        assert_eq!(chain.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_route_transaction_is_idempotent() {
        let chain = CountingChain::default();
        let populated = populate_transaction(transfer(), SENDER, &chain).await.unwrap();
        let calls = chain.calls.load(Ordering::SeqCst);

        let intent = SigningIntent::RawTransaction(populated.into());
        let first = route(intent.clone(), SENDER, &chain).await.unwrap();
        let second = route(intent, SENDER, &chain).await.unwrap();

        assert_eq!(first.digest, second.digest);
        assert_eq!(chain.calls.load(Ordering::SeqCst), calls);
        assert_eq!(first.recoverable.expected_signer(), SENDER);
    }

    #[tokio::test]
    async fn test_serialized_transaction_used_verbatim() {
        let chain = CountingChain::default();
        let populated = populate_transaction(transfer(), SENDER, &chain).await.unwrap();
        let tx = build_transaction(&populated, SENDER).unwrap();
        let bytes = tx.rlp().to_vec();
        assert_eq!(bytes[0], 0x02);

        let routed = route(
            SigningIntent::RawTransaction(TransactionIntent::Serialized(bytes.clone())),
            SENDER,
            &chain,
        )
        .await
        .unwrap();

        assert_eq!(routed.digest, keccak256(&bytes));
        assert_eq!(routed.digest, transaction_digest(&tx));
        match routed.recoverable {
            RecoverableMessage::Transaction { tx: decoded, .. } => {
                assert_eq!(decoded.nonce(), Some(&U256::from(7)));
                assert_eq!(decoded.chain_id().map(|c| c.as_u64()), Some(11155111));
            }
            other => panic!("unexpected recoverable {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_route_personal_message() {
        let chain = CountingChain::default();
        let routed = route(
            SigningIntent::PersonalMessage {
                message: b"Hello!".to_vec(),
                signer: SENDER.to_string(),
            },
            SENDER,
            &chain,
        )
        .await
        .unwrap();

        assert_eq!(
            hex::encode(routed.digest),
            "52b6437db56d87f5991d7c173cf11b9dd0f9fb083260bef1bf0c338042bc398c"
        );
        assert_eq!(chain.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_garbage_serialized_transaction() {
        let chain = CountingChain::default();
        let err = route(
            SigningIntent::RawTransaction(TransactionIntent::Serialized(vec![])),
            SENDER,
            &chain,
        )
        .await
        .unwrap_err();
        assert_eq!(err.code, crate::error::ErrorCode::InvalidTransaction);
    }
}
