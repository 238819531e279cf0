//! Stateless query adapter
//!
//! Every function takes a shared gateway and returns domain records. The
//! `fetch_latest_*` and `fetch_inscriptions` forms never fail: errors are
//! logged and an empty value comes back. The rest propagate `FetchError` so
//! the caller can surface it.

use std::collections::{BTreeSet, HashMap};

use chrono::{DateTime, Utc};
use futures::future::{join_all, try_join_all};
use tracing::{debug, warn};

use super::error::{FetchError, FetchResult};
use super::gateway::Gateway;
use super::types;
use crate::domain::{
    BlockRecord, Detail, InscriptionSet, NodeStatus, Ordering, Page, PageRequest, SearchTarget,
    TxRecord, ValidatorRecord,
};

/// Largest `per_page` the node accepts
const FULL_PAGE: u32 = 100;

/// Newest transactions, at most `limit`
pub async fn fetch_latest_transactions(gw: &dyn Gateway, limit: u32) -> Page<TxRecord> {
    if limit == 0 {
        return Page::empty();
    }
    let request = PageRequest::new(1, limit, Ordering::Desc);
    match fetch_transactions_page(gw, &request).await {
        Ok(page) => page,
        Err(err) => {
            warn!(%err, "failed to fetch latest transactions");
            Page::empty()
        }
    }
}

pub async fn fetch_transactions_page(
    gw: &dyn Gateway,
    request: &PageRequest,
) -> FetchResult<Page<TxRecord>> {
    let params = search_params("tx.height>0", request);
    let result = gw.rpc("tx_search", &params).await?;
    let mut page = types::parse_tx_search(result)?;
    resolve_timestamps(gw, &mut page.records).await;
    Ok(page)
}

/// Transactions included in block `height`, in block order
pub async fn fetch_transactions_at_height(
    gw: &dyn Gateway,
    height: u64,
) -> FetchResult<Vec<TxRecord>> {
    let request = PageRequest::new(1, FULL_PAGE, Ordering::Asc);
    let params = search_params(&format!("tx.height={height}"), &request);
    let result = gw.rpc("tx_search", &params).await?;
    Ok(types::parse_tx_search(result)?.records)
}

/// One transaction by hash, with its block time when that resolves
pub async fn fetch_tx(gw: &dyn Gateway, hash: &str) -> FetchResult<TxRecord> {
    let hash = hash.trim_start_matches("0x").to_ascii_uppercase();
    let params = [("hash", format!("0x{hash}"))];
    let result = match gw.rpc("tx", &params).await {
        Ok(result) => result,
        Err(FetchError::Rpc { message, .. }) => {
            debug!(%hash, %message, "tx lookup rejected by node");
            return Err(FetchError::TxNotFound { hash });
        }
        Err(err) => return Err(err),
    };
    let mut tx = types::parse_tx(result, &hash)?;
    match fetch_block_timestamp(gw, tx.height).await {
        Ok(stamp) => tx.timestamp = Some(stamp),
        Err(err) => warn!(height = tx.height, %err, "no timestamp for block"),
    }
    Ok(tx)
}

/// Transactions signed by `address`, newest first
pub async fn fetch_account_transactions(
    gw: &dyn Gateway,
    address: &str,
    request: &PageRequest,
) -> FetchResult<Page<TxRecord>> {
    let params = search_params(&format!("message.sender='{address}'"), request);
    let result = gw.rpc("tx_search", &params).await?;
    let mut page = types::parse_tx_search(result)?;
    resolve_timestamps(gw, &mut page.records).await;
    Ok(page)
}

/// Resolve a search target for the detail pane.
///
/// A block whose transactions cannot be searched still resolves, with an
/// empty tx list.
pub async fn fetch_detail(
    gw: &dyn Gateway,
    target: &SearchTarget,
    per_page: u32,
) -> FetchResult<Detail> {
    match target {
        SearchTarget::Block(height) => {
            let block = fetch_block(gw, *height).await?;
            let mut txs = if block.tx_count > 0 {
                fetch_transactions_at_height(gw, *height)
                    .await
                    .unwrap_or_else(|err| {
                        warn!(height, %err, "block transactions unavailable");
                        Vec::new()
                    })
            } else {
                Vec::new()
            };
            for tx in &mut txs {
                tx.timestamp = block.timestamp;
            }
            Ok(Detail::Block { block, txs })
        }
        SearchTarget::Tx(hash) => fetch_tx(gw, hash).await.map(Detail::Tx),
        SearchTarget::Account(address) => {
            let request = PageRequest::new(1, per_page, Ordering::Desc);
            let txs = fetch_account_transactions(gw, address, &request).await?;
            Ok(Detail::Account {
                address: address.clone(),
                txs,
            })
        }
    }
}

/// Latest block metas from `/blockchain`, newest first
pub async fn fetch_latest_blocks(gw: &dyn Gateway, max_height: Option<u64>) -> Page<BlockRecord> {
    match try_fetch_latest_blocks(gw, max_height).await {
        Ok(page) => page,
        Err(err) => {
            warn!(%err, "failed to fetch latest blocks");
            Page::empty()
        }
    }
}

pub async fn try_fetch_latest_blocks(
    gw: &dyn Gateway,
    max_height: Option<u64>,
) -> FetchResult<Page<BlockRecord>> {
    let params: Vec<(&str, String)> = max_height
        .map(|h| vec![("maxHeight", h.to_string())])
        .unwrap_or_default();
    let result = gw.rpc("blockchain", &params).await?;
    types::parse_blockchain(result)
}

pub async fn fetch_blocks_page(
    gw: &dyn Gateway,
    request: &PageRequest,
) -> FetchResult<Page<BlockRecord>> {
    let params = search_params("block.height>0", request);
    let result = gw.rpc("block_search", &params).await?;
    types::parse_block_search(result)
}

pub async fn fetch_block(gw: &dyn Gateway, height: u64) -> FetchResult<BlockRecord> {
    let params = [("height", height.to_string())];
    let result = match gw.rpc("block", &params).await {
        Ok(result) => result,
        Err(FetchError::Rpc { message, .. }) => {
            debug!(height, %message, "block lookup rejected by node");
            return Err(FetchError::NotFound { height });
        }
        Err(err) => return Err(err),
    };
    types::parse_block(result, height)
}

/// Every block in `start..=end`, ascending. One missing block fails the call.
pub async fn fetch_block_range(
    gw: &dyn Gateway,
    start: u64,
    end: u64,
) -> FetchResult<Vec<BlockRecord>> {
    if start > end {
        return Err(FetchError::InvalidRange { start, end });
    }
    try_join_all((start..=end).map(|height| fetch_block(gw, height))).await
}

/// The first `lead` blocks of `start..=end` plus the last one, ascending.
///
/// Enough to draw a range card without fetching every block in between.
pub async fn fetch_range_preview(
    gw: &dyn Gateway,
    start: u64,
    end: u64,
    lead: u64,
) -> FetchResult<Vec<BlockRecord>> {
    if start > end {
        return Err(FetchError::InvalidRange { start, end });
    }
    let lead_end = start.saturating_add(lead.saturating_sub(1)).min(end);
    let mut heights: Vec<u64> = (start..=lead_end).collect();
    if heights.last() != Some(&end) {
        heights.push(end);
    }
    try_join_all(heights.into_iter().map(|height| fetch_block(gw, height))).await
}

pub async fn fetch_block_timestamp(gw: &dyn Gateway, height: u64) -> FetchResult<DateTime<Utc>> {
    fetch_block(gw, height)
        .await?
        .timestamp
        .ok_or(FetchError::NotFound { height })
}

pub async fn fetch_status(gw: &dyn Gateway) -> FetchResult<NodeStatus> {
    let result = gw.rpc("status", &[]).await?;
    types::parse_status(result)
}

/// Full validator set, walking every page
pub async fn fetch_validators(gw: &dyn Gateway) -> FetchResult<Vec<ValidatorRecord>> {
    let mut validators = Vec::new();
    let mut page = 1u32;
    loop {
        let params = [
            ("page", page.to_string()),
            ("per_page", FULL_PAGE.to_string()),
        ];
        let result = gw.rpc("validators", &params).await?;
        let batch = types::parse_validators(result)?;
        let done = batch.is_empty();
        validators.extend(batch.records);
        if done || validators.len() as u64 >= batch.total_count {
            break;
        }
        page += 1;
    }
    Ok(validators)
}

pub async fn fetch_inscriptions(gw: &dyn Gateway) -> InscriptionSet {
    match try_fetch_inscriptions(gw).await {
        Ok(set) => set,
        Err(err) => {
            warn!(%err, "failed to fetch inscriptions");
            InscriptionSet::default()
        }
    }
}

pub async fn try_fetch_inscriptions(gw: &dyn Gateway) -> FetchResult<InscriptionSet> {
    let body = gw.inscriptions().await?;
    types::parse_inscriptions(body)
}

fn search_params<'a>(query: &str, request: &PageRequest) -> Vec<(&'a str, String)> {
    vec![
        ("query", format!("\"{query}\"")),
        ("page", request.page().to_string()),
        ("per_page", request.per_page().to_string()),
        ("order_by", format!("\"{}\"", request.ordering().as_str())),
    ]
}

/// Fill `timestamp` from each record's block, one lookup per distinct height
async fn resolve_timestamps(gw: &dyn Gateway, records: &mut [TxRecord]) {
    let heights: BTreeSet<u64> = records.iter().map(|r| r.height).collect();
    let lookups = heights.into_iter().map(|height| async move {
        let stamp = fetch_block_timestamp(gw, height).await;
        if let Err(err) = &stamp {
            warn!(height, %err, "no timestamp for block");
        }
        (height, stamp.ok())
    });
    let stamps: HashMap<u64, Option<DateTime<Utc>>> =
        join_all(lookups).await.into_iter().collect();
    for record in records.iter_mut() {
        record.timestamp = stamps.get(&record.height).copied().flatten();
    }
}
