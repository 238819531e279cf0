//! Live chain event source
//!
//! The node is polled for its head height; every newly observed block is
//! published, followed by its transactions. Subscribers each get their own
//! broadcast receiver, so a slow view cannot stall another.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::domain::{BlockRecord, TxRecord};
use crate::infrastructure::tendermint::{query, FetchResult, Gateway};

const CHANNEL_CAPACITY: usize = 256;

/// Consecutive failed polls before the stream reports itself stalled
pub const STALL_AFTER: u32 = 3;

#[derive(Debug, Clone)]
pub enum StreamEvent {
    NewBlock(BlockRecord),
    Tx(TxRecord),
    /// Published once when `STALL_AFTER` polls in a row have failed
    Stalled { failures: u32, message: String },
    /// First successful poll after `Stalled`
    Resumed,
}

/// Handle to the polling task. Dropping it stops the stream.
pub struct ChainStream {
    sender: broadcast::Sender<StreamEvent>,
    task: JoinHandle<()>,
}

impl ChainStream {
    /// Start polling on the current Tokio runtime. At most `backlog` blocks
    /// are published per poll.
    pub fn spawn(gateway: Arc<dyn Gateway>, poll_interval: Duration, backlog: usize) -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        let publisher = sender.clone();
        let task = tokio::spawn(async move {
            info!(endpoint = %gateway.endpoint_name(), "chain stream started");
            let mut ticker = tokio::time::interval(poll_interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            let mut head = None;
            let mut failures = 0u32;
            loop {
                ticker.tick().await;
                match poll_once(gateway.as_ref(), &mut head, backlog, &publisher).await {
                    Ok(()) => {
                        if failures >= STALL_AFTER {
                            info!(failures, "chain stream resumed");
                            let _ = publisher.send(StreamEvent::Resumed);
                        }
                        failures = 0;
                    }
                    Err(err) => {
                        failures = failures.saturating_add(1);
                        warn!(%err, failures, "stream poll failed");
                        if failures == STALL_AFTER {
                            let _ = publisher.send(StreamEvent::Stalled {
                                failures,
                                message: err.to_string(),
                            });
                        }
                    }
                }
            }
        });
        Self { sender, task }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StreamEvent> {
        self.sender.subscribe()
    }
}

impl Drop for ChainStream {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// One poll step.
///
/// The first call only records the head. Later calls publish every block
/// above the recorded head, at most `backlog` of them. `head` only advances
/// past blocks that were fetched, so a failed block is retried next time.
pub async fn poll_once(
    gw: &dyn Gateway,
    head: &mut Option<u64>,
    backlog: usize,
    publisher: &broadcast::Sender<StreamEvent>,
) -> FetchResult<()> {
    let latest = query::fetch_status(gw).await?.latest_height;
    let Some(last) = *head else {
        debug!(latest, "stream head recorded");
        *head = Some(latest);
        return Ok(());
    };
    if latest <= last {
        return Ok(());
    }

    let backlog_start = latest.saturating_sub(backlog.max(1) as u64 - 1);
    for height in (last + 1).max(backlog_start)..=latest {
        let block = query::fetch_block(gw, height).await?;
        let txs = if block.tx_count > 0 {
            query::fetch_transactions_at_height(gw, height).await?
        } else {
            Vec::new()
        };
        let timestamp = block.timestamp;

        // No subscribers is not an error
        let _ = publisher.send(StreamEvent::NewBlock(block));
        for mut tx in txs {
            tx.timestamp = timestamp;
            let _ = publisher.send(StreamEvent::Tx(tx));
        }
        *head = Some(height);
    }
    Ok(())
}
