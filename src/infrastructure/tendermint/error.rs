use thiserror::Error;

/// Failure of a single gateway call
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("rpc error {code}: {message}")]
    Rpc {
        code: i64,
        message: String,
        data: Option<String>,
    },

    #[error("unexpected response shape: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("block {height} not found")]
    NotFound { height: u64 },

    #[error("transaction {hash} not found")]
    TxNotFound { hash: String },

    #[error("invalid block range {start}..={end}")]
    InvalidRange { start: u64, end: u64 },
}

impl FetchError {
    /// Network-level failures worth retrying on the next poll
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            FetchError::Transport { .. } | FetchError::Status { .. } | FetchError::Rpc { .. }
        )
    }
}

pub type FetchResult<T> = std::result::Result<T, FetchError>;
