//! Minimal Cosmos SDK tx decoding: just enough of `TxRaw`/`TxBody` to label
//! a transaction

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use prost::Message;
use sha2::{Digest, Sha256};
use thiserror::Error;

#[derive(Clone, PartialEq, Message)]
struct TxRaw {
    #[prost(bytes = "vec", tag = "1")]
    body_bytes: Vec<u8>,
}

#[derive(Clone, PartialEq, Message)]
struct TxBody {
    #[prost(message, repeated, tag = "1")]
    messages: Vec<Any>,
    #[prost(string, tag = "2")]
    memo: String,
}

#[derive(Clone, PartialEq, Message)]
struct Any {
    #[prost(string, tag = "1")]
    type_url: String,
    #[prost(bytes = "vec", tag = "2")]
    value: Vec<u8>,
}

#[derive(Debug, Error)]
pub(crate) enum TxDecodeError {
    #[error("tx bytes are not base64: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("tx bytes are not a TxRaw/TxBody: {0}")]
    Protobuf(#[from] prost::DecodeError),
}

/// Fields read from a decoded tx body
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct DecodedTx {
    pub(crate) memo: String,
    pub(crate) type_urls: Vec<String>,
}

pub(crate) fn decode_base64(encoded: &str) -> Result<Vec<u8>, TxDecodeError> {
    Ok(STANDARD.decode(encoded.trim())?)
}

pub(crate) fn decode_tx_bytes(bytes: &[u8]) -> Result<DecodedTx, TxDecodeError> {
    let raw = TxRaw::decode(bytes)?;
    let body = TxBody::decode(raw.body_bytes.as_slice())?;
    Ok(DecodedTx {
        memo: body.memo,
        type_urls: body.messages.into_iter().map(|m| m.type_url).collect(),
    })
}

pub(crate) fn decode_tx(encoded: &str) -> Result<DecodedTx, TxDecodeError> {
    decode_tx_bytes(&decode_base64(encoded)?)
}

/// Tendermint tx hash: upper-case hex SHA-256 of the raw bytes
pub(crate) fn tx_hash(bytes: &[u8]) -> String {
    hex::encode_upper(Sha256::digest(bytes))
}

#[cfg(test)]
pub(crate) fn encode_tx(memo: &str, type_urls: &[&str]) -> String {
    let body = TxBody {
        messages: type_urls
            .iter()
            .map(|url| Any {
                type_url: url.to_string(),
                value: Vec::new(),
            })
            .collect(),
        memo: memo.to_string(),
    };
    let raw = TxRaw {
        body_bytes: body.encode_to_vec(),
    };
    STANDARD.encode(raw.encode_to_vec())
}
