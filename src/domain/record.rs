//! Normalized chain records shared by every data source

use chrono::{DateTime, Utc};

/// A block or transaction as shown in a feed
pub trait ChainRecord: Clone {
    fn height(&self) -> u64;
    fn hash(&self) -> &str;
}

/// Block summary
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockRecord {
    pub height: u64,
    /// Block id hash, upper-case hex
    pub hash: String,
    pub app_hash: String,
    pub timestamp: Option<DateTime<Utc>>,
    pub tx_count: usize,
    pub proposer: String,
    /// SHA-256 of each tx in the block body; empty when the source only
    /// carries a count (`/blockchain` metas)
    pub tx_hashes: Vec<String>,
}

impl ChainRecord for BlockRecord {
    fn height(&self) -> u64 {
        self.height
    }

    fn hash(&self) -> &str {
        &self.hash
    }
}

/// ABCI result of a transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TxStatus {
    pub code: u32,
}

impl TxStatus {
    pub const SUCCESS: TxStatus = TxStatus { code: 0 };

    pub fn from_code(code: u32) -> Self {
        Self { code }
    }

    pub fn is_success(&self) -> bool {
        self.code == 0
    }

    pub fn label(&self) -> &'static str {
        if self.is_success() {
            "success"
        } else {
            "error"
        }
    }
}

/// Transaction summary
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxRecord {
    pub height: u64,
    /// Upper-case hex
    pub hash: String,
    pub index: u32,
    pub timestamp: Option<DateTime<Utc>>,
    pub from_address: String,
    pub to_address: String,
    pub tx_type: String,
    pub status: TxStatus,
    pub gas_wanted: u64,
    pub gas_used: u64,
    pub memo: String,
    pub message_count: usize,
}

impl ChainRecord for TxRecord {
    fn height(&self) -> u64 {
        self.height
    }

    fn hash(&self) -> &str {
        &self.hash
    }
}

/// Node identity and sync position from `/status`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeStatus {
    pub chain_id: String,
    pub moniker: String,
    pub version: String,
    pub latest_height: u64,
    pub latest_time: Option<DateTime<Utc>>,
    pub catching_up: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatorRecord {
    pub address: String,
    pub voting_power: u64,
    pub proposer_priority: i64,
}

/// Bitcoin inscription batch anchored to a range of chain blocks
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Inscription {
    pub start_block: u64,
    pub end_block: u64,
    pub reveal_tx: String,
}

impl Inscription {
    pub fn is_revealed(&self) -> bool {
        !self.reveal_tx.is_empty()
    }

    /// Number of chain blocks covered by this batch
    pub fn block_span(&self) -> u64 {
        if self.end_block < self.start_block {
            return 0;
        }
        self.end_block - self.start_block + 1
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InscriptionSet {
    pub records: Vec<Inscription>,
    /// Total reported by the API pagination block
    pub total: u64,
}

impl InscriptionSet {
    /// The newest `limit` batches that already have a reveal transaction
    pub fn recent_revealed(&self, limit: usize) -> Vec<Inscription> {
        self.records
            .iter()
            .filter(|item| item.is_revealed())
            .take(limit)
            .cloned()
            .collect()
    }
}
