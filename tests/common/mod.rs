//! Scripted gateway and JSON fixtures shared by the integration tests

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Mutex;

use serde_json::{json, Value};
use surge_explorer::infrastructure::tendermint::{FetchError, FetchResult, Gateway};

/// Gateway that answers from a table of canned `result` payloads.
///
/// A call to `method` with params `[(k, v), ..]` is answered by the first
/// registered key among `method?k=v` (per param, in order) and `method`.
#[derive(Default)]
pub struct FakeGateway {
    responses: Mutex<HashMap<String, Value>>,
    failures: Mutex<HashMap<String, String>>,
    inscriptions: Mutex<Option<Value>>,
    calls: Mutex<Vec<String>>,
}

impl FakeGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(&self, key: &str, result: Value) {
        self.failures.lock().unwrap().remove(key);
        self.responses
            .lock()
            .unwrap()
            .insert(key.to_string(), result);
    }

    /// Answer `key` with a JSON-RPC error
    pub fn fail(&self, key: &str, message: &str) {
        self.responses.lock().unwrap().remove(key);
        self.failures
            .lock()
            .unwrap()
            .insert(key.to_string(), message.to_string());
    }

    pub fn set_inscriptions(&self, body: Value) {
        *self.inscriptions.lock().unwrap() = Some(body);
    }

    pub fn set_head(&self, height: u64) {
        self.respond("status", status_json(height));
    }

    pub fn add_block(&self, height: u64, txs: &[&str]) {
        self.respond(&format!("block?height={height}"), block_json(height, txs));
    }

    /// Every call made so far, rendered as `method?k=v&k=v`
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count_calls(&self, prefix: &str) -> usize {
        self.calls()
            .iter()
            .filter(|call| call.starts_with(prefix))
            .count()
    }

    fn lookup(&self, method: &str, params: &[(&str, String)]) -> FetchResult<Value> {
        let mut keys: Vec<String> = params
            .iter()
            .map(|(k, v)| format!("{method}?{k}={v}"))
            .collect();
        keys.push(method.to_string());

        let failures = self.failures.lock().unwrap();
        let responses = self.responses.lock().unwrap();
        for key in keys {
            if let Some(message) = failures.get(&key) {
                return Err(FetchError::Rpc {
                    code: -32603,
                    message: message.clone(),
                    data: None,
                });
            }
            if let Some(result) = responses.get(&key) {
                return Ok(result.clone());
            }
        }
        Err(FetchError::Rpc {
            code: -32601,
            message: format!("no canned response for {method}"),
            data: None,
        })
    }
}

#[async_trait::async_trait]
impl Gateway for FakeGateway {
    async fn rpc(&self, method: &str, params: &[(&str, String)]) -> FetchResult<Value> {
        let rendered: Vec<String> = params.iter().map(|(k, v)| format!("{k}={v}")).collect();
        self.calls
            .lock()
            .unwrap()
            .push(format!("{method}?{}", rendered.join("&")));
        self.lookup(method, params)
    }

    async fn inscriptions(&self) -> FetchResult<Value> {
        self.calls.lock().unwrap().push("inscriptions".to_string());
        self.inscriptions
            .lock()
            .unwrap()
            .clone()
            .ok_or(FetchError::Status {
                url: "fake://inscriptions".to_string(),
                status: 503,
            })
    }

    fn endpoint_name(&self) -> String {
        "Fake (fake://rpc)".to_string()
    }
}

pub fn block_time(height: u64) -> String {
    format!("2024-06-01T12:{:02}:{:02}.123456789Z", (height / 60) % 60, height % 60)
}

pub fn block_json(height: u64, txs: &[&str]) -> Value {
    json!({
        "block_id": {"hash": format!("BLOCK{height}"), "parts": {"total": 1, "hash": "P"}},
        "block": {
            "header": {
                "chain_id": "surge-devnet",
                "height": height.to_string(),
                "time": block_time(height),
                "app_hash": format!("APP{height}"),
                "proposer_address": "PROPOSER"
            },
            "data": {"txs": txs}
        }
    })
}

pub fn status_json(height: u64) -> Value {
    json!({
        "node_info": {"network": "surge-devnet", "moniker": "fake-node", "version": "0.37.2"},
        "sync_info": {
            "latest_block_height": height.to_string(),
            "latest_block_time": block_time(height),
            "catching_up": false
        }
    })
}

pub fn tx_json(hash: &str, height: u64, code: u32) -> Value {
    json!({
        "hash": hash,
        "height": height.to_string(),
        "index": 0,
        "tx_result": {
            "code": code,
            "gas_wanted": "200000",
            "gas_used": "90000",
            "events": [
                {"type": "message", "attributes": [
                    {"key": "action", "value": "/cosmos.bank.v1beta1.MsgSend"}
                ]},
                {"type": "transfer", "attributes": [
                    {"key": "recipient", "value": "surge1recipient"},
                    {"key": "sender", "value": "surge1sender"}
                ]}
            ]
        }
    })
}

pub fn tx_search_json(txs: Vec<Value>, total: u64) -> Value {
    json!({"txs": txs, "total_count": total.to_string()})
}

pub fn block_search_json(heights: &[u64], total: u64) -> Value {
    let blocks: Vec<Value> = heights.iter().map(|h| block_json(*h, &[])).collect();
    json!({"blocks": blocks, "total_count": total.to_string()})
}
