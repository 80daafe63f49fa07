//! Wallet session requests
//!
//! Parameter order per method:
//! - `personal_sign`: `[message, address]`
//! - `eth_sign`: `[address, message]`
//! - `eth_signTypedData`, `eth_signTypedData_v4`: `[address, typedData]`
//! - `eth_sendTransaction`: `[tx]`

use super::types::*;
use crate::eip712::TypedData;
use crate::error::{AdapterError, AdapterResult};
use serde_json::Value;

impl SessionRequest {
    pub fn new(method: SignMethod, chain_id: u64, params: Value) -> Self {
        Self {
            method,
            chain_id,
            params,
        }
    }

    /// Parse a raw request; an unknown method is `UnsupportedSignMethod`
    pub fn parse(method: &str, chain_id: u64, params: Value) -> AdapterResult<Self> {
        Ok(Self::new(method.parse()?, chain_id, params))
    }
}

impl SigningIntent {
    pub fn from_session_request(request: &SessionRequest) -> AdapterResult<Self> {
        let method = request.method;
        let params = request
            .params
            .as_array()
            .ok_or_else(|| malformed(method, "params must be an array"))?;

        match method {
            SignMethod::PersonalSign => Ok(SigningIntent::PersonalMessage {
                message: message_bytes(str_param(method, params, 0)?),
                signer: str_param(method, params, 1)?.to_string(),
            }),
            SignMethod::EthSign => Ok(SigningIntent::PersonalMessage {
                signer: str_param(method, params, 0)?.to_string(),
                message: message_bytes(str_param(method, params, 1)?),
            }),
            SignMethod::EthSignTypedData | SignMethod::EthSignTypedDataV4 => {
                let signer = str_param(method, params, 0)?.to_string();
                let document = params
                    .get(1)
                    .ok_or_else(|| malformed(method, "missing typed data"))?;
                let typed_data = TypedData::from_value(document)?;
                Ok(SigningIntent::StructuredMessage { typed_data, signer })
            }
            SignMethod::EthSendTransaction => {
                let fields = params
                    .first()
                    .ok_or_else(|| malformed(method, "missing transaction"))?;
                let mut tx: BaseTx = serde_json::from_value(fields.clone())
                    .map_err(|e| malformed(method, &e.to_string()))?;
                tx.chain_id = request.chain_id;
                Ok(SigningIntent::RawTransaction(TransactionIntent::Fields(tx)))
            }
        }
    }
}

impl TryFrom<&SessionRequest> for SigningIntent {
    type Error = AdapterError;

    fn try_from(request: &SessionRequest) -> Result<Self, Self::Error> {
        Self::from_session_request(request)
    }
}

fn str_param<'a>(method: SignMethod, params: &'a [Value], index: usize) -> AdapterResult<&'a str> {
    params
        .get(index)
        .and_then(Value::as_str)
        .ok_or_else(|| malformed(method, &format!("param {} must be a string", index)))
}

/// `0x`-prefixed hex decodes to bytes; anything else is taken as UTF-8 text
fn message_bytes(param: &str) -> Vec<u8> {
    param
        .strip_prefix("0x")
        .and_then(|h| hex::decode(h).ok())
        .unwrap_or_else(|| param.as_bytes().to_vec())
}

fn malformed(method: SignMethod, reason: &str) -> AdapterError {
    AdapterError::unsupported_sign_method(format!("Malformed {} request", method)).with_details(reason)
}
