//! Raw RPC payload shapes and their conversion into domain records
//!
//! Tendermint encodes most integers as JSON strings, and the same header
//! shows up under different parents depending on the endpoint. Everything is
//! flattened here.

use serde::{Deserialize, Deserializer};
use serde_json::Value;
use tracing::warn;

use super::error::{FetchError, FetchResult};
use super::tx_decode::{decode_base64, decode_tx, tx_hash, DecodedTx};
use crate::domain::format::{parse_timestamp, sanitize_string, short_type_url};
use crate::domain::{
    BlockRecord, Inscription, InscriptionSet, NodeStatus, Page, TxRecord, TxStatus,
    ValidatorRecord,
};

#[derive(Debug, Deserialize)]
struct TxSearchResult {
    #[serde(default)]
    txs: Vec<RawTx>,
    #[serde(default, deserialize_with = "u64_from_any")]
    total_count: u64,
}

#[derive(Debug, Deserialize)]
struct RawTx {
    hash: String,
    #[serde(deserialize_with = "u64_from_any")]
    height: u64,
    #[serde(default)]
    index: u32,
    #[serde(default)]
    tx_result: RawTxResult,
    #[serde(default)]
    tx: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct RawTxResult {
    #[serde(default)]
    code: u32,
    #[serde(default, deserialize_with = "u64_from_any")]
    gas_wanted: u64,
    #[serde(default, deserialize_with = "u64_from_any")]
    gas_used: u64,
    #[serde(default)]
    events: Vec<RawEvent>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct RawEvent {
    #[serde(rename = "type")]
    pub(crate) kind: String,
    #[serde(default)]
    pub(crate) attributes: Vec<RawAttribute>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct RawAttribute {
    pub(crate) key: String,
    #[serde(default)]
    pub(crate) value: Option<String>,
}

#[derive(Debug, Deserialize)]
struct BlockSearchResult {
    #[serde(default)]
    blocks: Vec<RawBlockResult>,
    #[serde(default, deserialize_with = "u64_from_any")]
    total_count: u64,
}

#[derive(Debug, Deserialize)]
struct RawBlockResult {
    #[serde(default)]
    block_id: RawBlockId,
    block: Option<RawBlock>,
}

#[derive(Debug, Default, Deserialize)]
struct RawBlockId {
    #[serde(default)]
    hash: String,
}

#[derive(Debug, Deserialize)]
struct RawBlock {
    header: Option<RawHeader>,
    #[serde(default)]
    data: RawBlockData,
}

#[derive(Debug, Deserialize)]
struct RawHeader {
    #[serde(deserialize_with = "u64_from_any")]
    height: u64,
    #[serde(default)]
    time: String,
    #[serde(default)]
    app_hash: String,
    #[serde(default)]
    proposer_address: String,
}

#[derive(Debug, Default, Deserialize)]
struct RawBlockData {
    #[serde(default)]
    txs: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
struct BlockchainResult {
    #[serde(deserialize_with = "u64_from_any")]
    last_height: u64,
    #[serde(default)]
    block_metas: Vec<RawBlockMeta>,
}

#[derive(Debug, Deserialize)]
struct RawBlockMeta {
    #[serde(default)]
    block_id: RawBlockId,
    header: RawHeader,
    #[serde(default, deserialize_with = "u64_from_any")]
    num_txs: u64,
}

#[derive(Debug, Deserialize)]
struct StatusResult {
    node_info: RawNodeInfo,
    sync_info: RawSyncInfo,
}

#[derive(Debug, Deserialize)]
struct RawNodeInfo {
    #[serde(default)]
    network: String,
    #[serde(default)]
    moniker: String,
    #[serde(default)]
    version: String,
}

#[derive(Debug, Deserialize)]
struct RawSyncInfo {
    #[serde(deserialize_with = "u64_from_any")]
    latest_block_height: u64,
    #[serde(default)]
    latest_block_time: String,
    #[serde(default)]
    catching_up: bool,
}

#[derive(Debug, Deserialize)]
struct ValidatorsResult {
    #[serde(default)]
    validators: Vec<RawValidator>,
    #[serde(default, deserialize_with = "u64_from_any")]
    total: u64,
}

#[derive(Debug, Deserialize)]
struct RawValidator {
    address: String,
    #[serde(default, deserialize_with = "u64_from_any")]
    voting_power: u64,
    #[serde(default, deserialize_with = "i64_from_any")]
    proposer_priority: i64,
}

#[derive(Debug, Deserialize)]
struct InscriptionsResponse {
    bitcoindata: Vec<RawInscription>,
    #[serde(default)]
    pagination: Option<RawPagination>,
}

#[derive(Debug, Deserialize)]
struct RawInscription {
    #[serde(rename = "startBlock", deserialize_with = "u64_from_any")]
    start_block: u64,
    #[serde(rename = "endBlock", deserialize_with = "u64_from_any")]
    end_block: u64,
    #[serde(rename = "revealTx", default)]
    reveal_tx: String,
}

#[derive(Debug, Deserialize)]
struct RawPagination {
    #[serde(default, deserialize_with = "u64_from_any")]
    total: u64,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum IntOrString {
    Unsigned(u64),
    Signed(i64),
    Text(String),
}

fn u64_from_any<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
    match IntOrString::deserialize(deserializer)? {
        IntOrString::Unsigned(n) => Ok(n),
        IntOrString::Signed(n) => u64::try_from(n).map_err(serde::de::Error::custom),
        IntOrString::Text(s) if s.trim().is_empty() => Ok(0),
        IntOrString::Text(s) => s.trim().parse().map_err(serde::de::Error::custom),
    }
}

fn i64_from_any<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
    match IntOrString::deserialize(deserializer)? {
        IntOrString::Unsigned(n) => i64::try_from(n).map_err(serde::de::Error::custom),
        IntOrString::Signed(n) => Ok(n),
        IntOrString::Text(s) if s.trim().is_empty() => Ok(0),
        IntOrString::Text(s) => s.trim().parse().map_err(serde::de::Error::custom),
    }
}

/// `/tx_search` result -> page of transactions (timestamps unresolved)
pub(crate) fn parse_tx_search(result: Value) -> FetchResult<Page<TxRecord>> {
    let parsed: TxSearchResult = serde_json::from_value(result)?;
    let records = parsed.txs.into_iter().map(tx_record).collect();
    Ok(Page::new(records, parsed.total_count))
}

/// `/tx?hash=` result -> transaction (timestamp unresolved)
pub(crate) fn parse_tx(result: Value, hash: &str) -> FetchResult<TxRecord> {
    if result.is_null() {
        return Err(FetchError::TxNotFound {
            hash: hash.to_string(),
        });
    }
    let parsed: RawTx = serde_json::from_value(result)?;
    Ok(tx_record(parsed))
}

/// `/block_search` result -> page of blocks
pub(crate) fn parse_block_search(result: Value) -> FetchResult<Page<BlockRecord>> {
    let parsed: BlockSearchResult = serde_json::from_value(result)?;
    let records = parsed.blocks.into_iter().filter_map(block_record).collect();
    Ok(Page::new(records, parsed.total_count))
}

/// `/blockchain` result -> page of blocks; total is the chain's last height
pub(crate) fn parse_blockchain(result: Value) -> FetchResult<Page<BlockRecord>> {
    let parsed: BlockchainResult = serde_json::from_value(result)?;
    let records = parsed
        .block_metas
        .into_iter()
        .map(|meta| BlockRecord {
            height: meta.header.height,
            hash: meta.block_id.hash,
            app_hash: meta.header.app_hash,
            timestamp: parse_timestamp(&meta.header.time),
            tx_count: meta.num_txs as usize,
            proposer: meta.header.proposer_address,
            tx_hashes: Vec::new(),
        })
        .collect();
    Ok(Page::new(records, parsed.last_height))
}

/// `/block?height=H` result -> block, `NotFound` if the block is absent
pub(crate) fn parse_block(result: Value, height: u64) -> FetchResult<BlockRecord> {
    if result.is_null() {
        return Err(FetchError::NotFound { height });
    }
    let parsed: RawBlockResult = serde_json::from_value(result)?;
    block_record(parsed).ok_or(FetchError::NotFound { height })
}

pub(crate) fn parse_status(result: Value) -> FetchResult<NodeStatus> {
    let parsed: StatusResult = serde_json::from_value(result)?;
    Ok(NodeStatus {
        chain_id: parsed.node_info.network,
        moniker: parsed.node_info.moniker,
        version: parsed.node_info.version,
        latest_height: parsed.sync_info.latest_block_height,
        latest_time: parse_timestamp(&parsed.sync_info.latest_block_time),
        catching_up: parsed.sync_info.catching_up,
    })
}

pub(crate) fn parse_validators(result: Value) -> FetchResult<Page<ValidatorRecord>> {
    let parsed: ValidatorsResult = serde_json::from_value(result)?;
    let records = parsed
        .validators
        .into_iter()
        .map(|v| ValidatorRecord {
            address: v.address,
            voting_power: v.voting_power,
            proposer_priority: v.proposer_priority,
        })
        .collect();
    Ok(Page::new(records, parsed.total))
}

pub(crate) fn parse_inscriptions(body: Value) -> FetchResult<InscriptionSet> {
    let parsed: InscriptionsResponse = serde_json::from_value(body)?;
    let records: Vec<Inscription> = parsed
        .bitcoindata
        .into_iter()
        .map(|raw| Inscription {
            start_block: raw.start_block,
            end_block: raw.end_block,
            reveal_tx: raw.reveal_tx,
        })
        .collect();
    let reported = parsed.pagination.map(|p| p.total).unwrap_or(0);
    let total = if reported == 0 {
        records.len() as u64
    } else {
        reported
    };
    Ok(InscriptionSet { records, total })
}

/// Sender and recipient of the first `transfer` event that carries both
pub(crate) fn extract_sender_and_recipient(events: &[RawEvent]) -> Option<(String, String)> {
    let mut sender = String::new();
    let mut recipient = String::new();

    for event in events.iter().filter(|e| e.kind == "transfer") {
        for attribute in &event.attributes {
            let value = attribute.value.clone().unwrap_or_default();
            match attribute.key.as_str() {
                "sender" => sender = value,
                "recipient" => recipient = value,
                _ => {}
            }
        }
        if !sender.is_empty() && !recipient.is_empty() {
            break;
        }
    }

    if sender.is_empty() || recipient.is_empty() {
        return None;
    }
    Some((sender, recipient))
}

fn tx_record(raw: RawTx) -> TxRecord {
    let events = &raw.tx_result.events;
    let (from_address, to_address) = extract_sender_and_recipient(events).unwrap_or_else(|| {
        warn!(hash = %raw.hash, "sender or recipient not found in tx events");
        (String::new(), String::new())
    });

    let decoded = raw.tx.as_deref().and_then(|encoded| match decode_tx(encoded) {
        Ok(decoded) => Some(decoded),
        Err(err) => {
            warn!(hash = %raw.hash, %err, "skipping tx body enrichment");
            None
        }
    });

    TxRecord {
        height: raw.height,
        hash: raw.hash.to_uppercase(),
        index: raw.index,
        timestamp: None,
        tx_type: tx_type_label(decoded.as_ref(), events),
        from_address,
        to_address,
        status: TxStatus::from_code(raw.tx_result.code),
        gas_wanted: raw.tx_result.gas_wanted,
        gas_used: raw.tx_result.gas_used,
        memo: decoded.as_ref().map(|d| d.memo.clone()).unwrap_or_default(),
        message_count: decoded.as_ref().map_or(0, |d| d.type_urls.len()),
    }
}

/// Memo if it has printable content, else the first message type, else the
/// `message.action` event attribute
fn tx_type_label(decoded: Option<&DecodedTx>, events: &[RawEvent]) -> String {
    if let Some(decoded) = decoded {
        let memo = sanitize_string(&decoded.memo);
        if !memo.is_empty() {
            return memo;
        }
        if let Some(first) = decoded.type_urls.first() {
            return short_type_url(first).to_string();
        }
    }
    events
        .iter()
        .filter(|e| e.kind == "message")
        .flat_map(|e| e.attributes.iter())
        .find(|a| a.key == "action")
        .and_then(|a| a.value.as_deref())
        .map(|action| short_type_url(action).to_string())
        .unwrap_or_default()
}

fn block_record(raw: RawBlockResult) -> Option<BlockRecord> {
    let block = raw.block?;
    let header = block.header?;
    let txs = block.data.txs.unwrap_or_default();
    let tx_hashes = txs
        .iter()
        .filter_map(|encoded| match decode_base64(encoded) {
            Ok(bytes) => Some(tx_hash(&bytes)),
            Err(err) => {
                warn!(height = header.height, %err, "skipping undecodable block tx");
                None
            }
        })
        .collect();
    Some(BlockRecord {
        height: header.height,
        hash: raw.block_id.hash,
        app_hash: header.app_hash,
        timestamp: parse_timestamp(&header.time),
        tx_count: txs.len(),
        proposer: header.proposer_address,
        tx_hashes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::tendermint::tx_decode::encode_tx;
    use serde_json::json;

    fn transfer_events(sender: &str, recipient: &str) -> Value {
        json!([
            {"type": "message", "attributes": [
                {"key": "action", "value": "/cosmos.bank.v1beta1.MsgSend", "index": true}
            ]},
            {"type": "transfer", "attributes": [
                {"key": "recipient", "value": recipient, "index": true},
                {"key": "sender", "value": sender, "index": true},
                {"key": "amount", "value": "10usurge", "index": true}
            ]}
        ])
    }

    #[test]
    fn tx_search_is_normalized() {
        let result = json!({
            "txs": [{
                "hash": "ab12",
                "height": "812",
                "index": 0,
                "tx_result": {
                    "code": 0,
                    "gas_wanted": "200000",
                    "gas_used": "81234",
                    "events": transfer_events("surge1from", "surge1to")
                },
                "tx": encode_tx("Inscription&Response", &["/surge.zk.MsgInscribe"])
            }],
            "total_count": "57"
        });
        let page = parse_tx_search(result).unwrap();
        assert_eq!(page.total_count, 57);
        let tx = &page.records[0];
        assert_eq!(tx.hash, "AB12");
        assert_eq!(tx.height, 812);
        assert_eq!(tx.from_address, "surge1from");
        assert_eq!(tx.to_address, "surge1to");
        assert_eq!(tx.tx_type, "Inscription");
        assert_eq!(tx.gas_used, 81234);
        assert_eq!(tx.message_count, 1);
        assert!(tx.status.is_success());
    }

    #[test]
    fn single_tx_lookup() {
        let result = json!({
            "hash": "ef56",
            "height": "77",
            "index": 2,
            "tx_result": {"code": 0, "events": transfer_events("surge1a", "surge1b")},
            "tx": encode_tx("", &["/cosmos.bank.v1beta1.MsgSend"])
        });
        let tx = parse_tx(result, "EF56").unwrap();
        assert_eq!(tx.hash, "EF56");
        assert_eq!(tx.index, 2);
        assert_eq!(tx.tx_type, "MsgSend");
        assert!(matches!(
            parse_tx(Value::Null, "EF56"),
            Err(FetchError::TxNotFound { hash }) if hash == "EF56"
        ));
    }

    #[test]
    fn undecodable_tx_keeps_identity() {
        let result = json!({
            "txs": [{
                "hash": "CD34",
                "height": 9,
                "tx_result": {"code": 5, "events": []},
                "tx": "not base64!"
            }],
            "total_count": 1
        });
        let page = parse_tx_search(result).unwrap();
        let tx = &page.records[0];
        assert_eq!(tx.hash, "CD34");
        assert_eq!(tx.height, 9);
        assert_eq!(tx.status.code, 5);
        assert_eq!(tx.tx_type, "");
        assert_eq!(tx.from_address, "");
        assert_eq!(tx.message_count, 0);
    }

    #[test]
    fn tx_type_falls_back_to_message_type_then_action() {
        let events: Vec<RawEvent> =
            serde_json::from_value(transfer_events("a", "b")).unwrap();
        let decoded = DecodedTx {
            memo: String::new(),
            type_urls: vec!["/cosmos.staking.v1beta1.MsgDelegate".into()],
        };
        assert_eq!(tx_type_label(Some(&decoded), &events), "MsgDelegate");
        assert_eq!(tx_type_label(None, &events), "MsgSend");
        assert_eq!(tx_type_label(None, &[]), "");
    }

    #[test]
    fn sender_without_recipient_is_not_a_pair() {
        let events: Vec<RawEvent> = serde_json::from_value(json!([
            {"type": "transfer", "attributes": [{"key": "sender", "value": "surge1a"}]}
        ]))
        .unwrap();
        assert_eq!(extract_sender_and_recipient(&events), None);
    }

    #[test]
    fn block_search_reads_nested_header() {
        let result = json!({
            "blocks": [{
                "block_id": {"hash": "BLOCKHASH", "parts": {"total": 1, "hash": "P"}},
                "block": {
                    "header": {
                        "chain_id": "surge-devnet",
                        "height": "42",
                        "time": "2024-06-01T11:59:30.123456789Z",
                        "app_hash": "APPHASH",
                        "proposer_address": "PROPOSER"
                    },
                    "data": {"txs": ["", "aGVsbG8="]}
                }
            }],
            "total_count": "42"
        });
        let page = parse_block_search(result).unwrap();
        let block = &page.records[0];
        assert_eq!(block.height, 42);
        assert_eq!(block.hash, "BLOCKHASH");
        assert_eq!(block.app_hash, "APPHASH");
        assert_eq!(block.tx_count, 2);
        assert_eq!(block.tx_hashes.len(), 2);
        assert_eq!(block.tx_hashes[1], tx_hash(b"hello"));
        assert_eq!(block.timestamp.map(|t| t.timestamp_subsec_millis()), Some(123));
    }

    #[test]
    fn blockchain_total_is_last_height() {
        let result = json!({
            "last_height": "812",
            "block_metas": [
                {"block_id": {"hash": "H812"}, "num_txs": "3",
                 "header": {"height": "812", "time": "2024-06-01T12:00:00Z", "app_hash": "A"}},
                {"block_id": {"hash": "H811"}, "num_txs": "0",
                 "header": {"height": "811", "time": "2024-06-01T11:59:54Z", "app_hash": "B"}}
            ]
        });
        let page = parse_blockchain(result).unwrap();
        assert_eq!(page.total_count, 812);
        assert_eq!(page.records[0].tx_count, 3);
        assert_eq!(page.records[1].hash, "H811");
    }

    #[test]
    fn null_block_is_not_found() {
        assert!(matches!(
            parse_block(Value::Null, 7),
            Err(FetchError::NotFound { height: 7 })
        ));
        let headless = json!({"block_id": {"hash": "X"}, "block": {"data": {"txs": null}}});
        assert!(matches!(
            parse_block(headless, 8),
            Err(FetchError::NotFound { height: 8 })
        ));
    }

    #[test]
    fn status_and_validators() {
        let status = parse_status(json!({
            "node_info": {"network": "surge-devnet", "moniker": "node0", "version": "0.37.2"},
            "sync_info": {
                "latest_block_height": "812",
                "latest_block_time": "2024-06-01T12:00:00Z",
                "catching_up": false
            }
        }))
        .unwrap();
        assert_eq!(status.chain_id, "surge-devnet");
        assert_eq!(status.latest_height, 812);

        let validators = parse_validators(json!({
            "block_height": "812",
            "validators": [{"address": "VAL1", "voting_power": "10", "proposer_priority": "-5"}],
            "count": "1",
            "total": "1"
        }))
        .unwrap();
        assert_eq!(validators.total_count, 1);
        assert_eq!(validators.records[0].proposer_priority, -5);
    }

    #[test]
    fn inscriptions_total_falls_back_to_len() {
        let set = parse_inscriptions(json!({
            "bitcoindata": [
                {"startBlock": "10", "endBlock": "19", "revealTx": "ff00"},
                {"startBlock": 0, "endBlock": 9, "revealTx": ""}
            ],
            "pagination": {"next_key": null, "total": "0"}
        }))
        .unwrap();
        assert_eq!(set.total, 2);
        assert_eq!(set.records[0].start_block, 10);

        assert!(parse_inscriptions(json!({"message": "not found"})).is_err());
    }
}
