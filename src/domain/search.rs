//! Search input classification and lookup results

use thiserror::Error;

use super::feed::Page;
use super::record::{BlockRecord, TxRecord};

/// What a search string points at
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchTarget {
    Block(u64),
    /// Upper-case hex, no `0x`
    Tx(String),
    Account(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SearchError {
    #[error("Please enter a value")]
    Empty,
    #[error("Invalid height, transaction hash or account address")]
    Invalid,
}

/// Sort input into a block height, a tx hash or a bech32 account address.
///
/// Heights are all digits. Hashes are 64 hex digits in either case, with an
/// optional `0x`. Addresses are lower-case alphanumerics with a `1`
/// separator followed by 38 to 58 characters.
pub fn classify_search(input: &str) -> Result<SearchTarget, SearchError> {
    let input = input.trim();
    if input.is_empty() {
        return Err(SearchError::Empty);
    }

    if input.bytes().all(|b| b.is_ascii_digit()) {
        if let Ok(height) = input.parse::<u64>() {
            return Ok(SearchTarget::Block(height));
        }
    }

    let hex = input
        .strip_prefix("0x")
        .or_else(|| input.strip_prefix("0X"))
        .unwrap_or(input);
    if hex.len() == 64 && hex.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Ok(SearchTarget::Tx(hex.to_ascii_uppercase()));
    }

    if is_account_address(input) {
        return Ok(SearchTarget::Account(input.to_string()));
    }
    Err(SearchError::Invalid)
}

fn is_account_address(input: &str) -> bool {
    let lower_alnum = |b: u8| b.is_ascii_lowercase() || b.is_ascii_digit();
    if !input.bytes().all(lower_alnum) {
        return false;
    }
    input
        .bytes()
        .enumerate()
        .any(|(i, b)| b == b'1' && i > 0 && (38..=58).contains(&(input.len() - i - 1)))
}

/// Resolved lookup shown in the detail pane
#[derive(Debug, Clone)]
pub enum Detail {
    Block {
        block: BlockRecord,
        txs: Vec<TxRecord>,
    },
    Tx(TxRecord),
    Account {
        address: String,
        txs: Page<TxRecord>,
    },
}
