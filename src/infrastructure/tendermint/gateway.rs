//! Gateway abstraction over the Tendermint RPC node and the inscription API
//!
//! The gateway only moves JSON. Shaping it into records is the query
//! adapter's job, so callers above this module never see raw payloads.

use std::time::Duration;

use anyhow::Context;
use serde_json::Value;
use tracing::debug;

use super::error::{FetchError, FetchResult};

/// Read-only access to chain data
#[async_trait::async_trait]
pub trait Gateway: Send + Sync + 'static {
    /// GET `{rpc}/{method}?{params}` and return the JSON-RPC `result` member
    async fn rpc(&self, method: &str, params: &[(&str, String)]) -> FetchResult<Value>;

    /// GET the inscription collection, newest first
    async fn inscriptions(&self) -> FetchResult<Value>;

    /// Get endpoint display name
    fn endpoint_name(&self) -> String;
}

/// reqwest-backed gateway
pub struct HttpGateway {
    http: reqwest::Client,
    rpc_base: String,
    inscriptions_url: String,
    name: String,
}

impl HttpGateway {
    pub fn new(
        rpc_base: &str,
        inscriptions_url: &str,
        name: &str,
        timeout: Duration,
    ) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client")?;
        Ok(Self {
            http,
            rpc_base: rpc_base.trim_end_matches('/').to_string(),
            inscriptions_url: inscriptions_url.to_string(),
            name: name.to_string(),
        })
    }

    async fn get_json(&self, url: &str, params: &[(&str, String)]) -> FetchResult<Value> {
        debug!(url, ?params, "gateway request");
        let response = self
            .http
            .get(url)
            .query(params)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|source| FetchError::Transport {
                url: url.to_string(),
                source,
            })?;

        let status = response.status();
        let body = response.bytes().await.map_err(|source| FetchError::Transport {
            url: url.to_string(),
            source,
        })?;

        // Tendermint may pair a JSON-RPC error body with a 5xx status; prefer
        // the structured error when there is one
        let parsed = serde_json::from_slice::<Value>(&body);
        if let Ok(json) = &parsed {
            if json.get("error").is_some_and(|e| !e.is_null()) {
                return Err(rpc_error(json));
            }
        }
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        Ok(parsed?)
    }
}

#[async_trait::async_trait]
impl Gateway for HttpGateway {
    async fn rpc(&self, method: &str, params: &[(&str, String)]) -> FetchResult<Value> {
        let url = format!("{}/{}", self.rpc_base, method);
        let json = self.get_json(&url, params).await?;
        Ok(json.get("result").cloned().unwrap_or(Value::Null))
    }

    async fn inscriptions(&self) -> FetchResult<Value> {
        let params = [("pagination.reverse", "true".to_string())];
        self.get_json(&self.inscriptions_url, &params).await
    }

    fn endpoint_name(&self) -> String {
        format!("{} ({})", self.name, self.rpc_base)
    }
}

fn rpc_error(json: &Value) -> FetchError {
    let error = &json["error"];
    FetchError::Rpc {
        code: error.get("code").and_then(Value::as_i64).unwrap_or(0),
        message: error
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("unknown error")
            .to_string(),
        data: error.get("data").and_then(Value::as_str).map(str::to_string),
    }
}
