//! Async worker - runs in Tokio runtime and handles RPC operations

use std::sync::mpsc::{Receiver, Sender, TryRecvError};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use tokio::sync::broadcast;
use tracing::{info, warn};

use crate::domain::RANGE_PREVIEW_LEAD;
use crate::infrastructure::runtime::bridge::{
    FeedId, RuntimeCommand, RuntimeEvent, WorkerSettings,
};
use crate::infrastructure::stream::{ChainStream, StreamEvent};
use crate::infrastructure::tendermint::{query, Gateway};

const RECONNECT_DELAY: Duration = Duration::from_millis(900);

/// Run the async worker loop until `Shutdown` or the TUI goes away
pub async fn run_async_worker(
    gateway: Arc<dyn Gateway>,
    settings: WorkerSettings,
    cmd_rx: Receiver<RuntimeCommand>,
    evt_tx: Sender<RuntimeEvent>,
) -> Result<()> {
    let mut stream: Option<(ChainStream, broadcast::Receiver<StreamEvent>)> = None;
    let mut last_inscription_poll: Option<Instant> = None;

    loop {
        // Connect (or reconnect) before anything else
        if stream.is_none() {
            match query::fetch_status(gateway.as_ref()).await {
                Ok(status) => {
                    info!(
                        endpoint = %gateway.endpoint_name(),
                        height = status.latest_height,
                        "connected"
                    );
                    let chain_stream = ChainStream::spawn(
                        Arc::clone(&gateway),
                        settings.poll_interval,
                        settings.backlog,
                    );
                    let receiver = chain_stream.subscribe();
                    stream = Some((chain_stream, receiver));
                    let _ = evt_tx.send(RuntimeEvent::Connected {
                        endpoint: gateway.endpoint_name(),
                        status,
                    });
                }
                Err(err) => {
                    warn!(%err, "connection failed");
                    let _ = evt_tx.send(RuntimeEvent::Error {
                        message: format!(
                            "Connection failed ({}): {}",
                            gateway.endpoint_name(),
                            err
                        ),
                    });
                    if drain_commands_while_offline(&cmd_rx) {
                        return Ok(());
                    }
                    tokio::time::sleep(RECONNECT_DELAY).await;
                    continue;
                }
            }
        }

        // Process commands (non-blocking)
        loop {
            match cmd_rx.try_recv() {
                Ok(RuntimeCommand::Shutdown) | Err(TryRecvError::Disconnected) => return Ok(()),
                Ok(cmd) => dispatch(cmd, &gateway, &evt_tx),
                Err(TryRecvError::Empty) => break,
            }
        }

        // Forward stream events
        if let Some((_, receiver)) = stream.as_mut() {
            loop {
                match receiver.try_recv() {
                    Ok(StreamEvent::Stalled { failures, message }) => {
                        let _ = evt_tx.send(RuntimeEvent::Error {
                            message: format!(
                                "No response from {} after {} polls: {}",
                                gateway.endpoint_name(),
                                failures,
                                message
                            ),
                        });
                    }
                    Ok(event) => {
                        let _ = evt_tx.send(RuntimeEvent::Stream(event));
                    }
                    Err(broadcast::error::TryRecvError::Lagged(skipped)) => {
                        warn!(skipped, "stream receiver lagged");
                    }
                    Err(broadcast::error::TryRecvError::Empty) => break,
                    Err(broadcast::error::TryRecvError::Closed) => {
                        stream = None;
                        break;
                    }
                }
            }
        }

        // Periodic inscription refresh
        let due = last_inscription_poll
            .map_or(true, |at| at.elapsed() >= settings.inscription_poll);
        if due {
            spawn_inscriptions(&gateway, &evt_tx);
            last_inscription_poll = Some(Instant::now());
        }

        // Small yield to prevent busy loop
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

/// Returns true once the TUI asked to stop. Loads issued while offline are
/// dropped; the TUI re-issues them on `Connected`.
fn drain_commands_while_offline(cmd_rx: &Receiver<RuntimeCommand>) -> bool {
    loop {
        match cmd_rx.try_recv() {
            Ok(RuntimeCommand::Shutdown) | Err(TryRecvError::Disconnected) => return true,
            Ok(_) => {}
            Err(TryRecvError::Empty) => return false,
        }
    }
}

fn dispatch(cmd: RuntimeCommand, gateway: &Arc<dyn Gateway>, evt_tx: &Sender<RuntimeEvent>) {
    let gateway = Arc::clone(gateway);
    let evt_tx = evt_tx.clone();
    match cmd {
        RuntimeCommand::LoadBlocks {
            feed,
            ticket,
            request,
        } => {
            tokio::spawn(async move {
                let result = match feed {
                    FeedId::HomeBlocks => {
                        let mut page = query::fetch_latest_blocks(gateway.as_ref(), None).await;
                        page.records.truncate(request.per_page() as usize);
                        Ok(page)
                    }
                    _ => query::fetch_blocks_page(gateway.as_ref(), &request)
                        .await
                        .map_err(|err| err.to_string()),
                };
                let _ = evt_tx.send(RuntimeEvent::BlocksPage {
                    feed,
                    ticket,
                    result,
                });
            });
        }

        RuntimeCommand::LoadTxs {
            feed,
            ticket,
            request,
        } => {
            tokio::spawn(async move {
                let result = match feed {
                    FeedId::HomeTxs => Ok(query::fetch_latest_transactions(
                        gateway.as_ref(),
                        request.per_page(),
                    )
                    .await),
                    _ => query::fetch_transactions_page(gateway.as_ref(), &request)
                        .await
                        .map_err(|err| err.to_string()),
                };
                let _ = evt_tx.send(RuntimeEvent::TxsPage {
                    feed,
                    ticket,
                    result,
                });
            });
        }

        RuntimeCommand::FetchRange { slot, start, end } => {
            tokio::spawn(async move {
                let result =
                    query::fetch_range_preview(gateway.as_ref(), start, end, RANGE_PREVIEW_LEAD)
                        .await
                        .map_err(|err| err.to_string());
                let _ = evt_tx.send(RuntimeEvent::RangeReady {
                    slot,
                    start,
                    end,
                    result,
                });
            });
        }

        RuntimeCommand::FetchValidators => {
            tokio::spawn(async move {
                let result = query::fetch_validators(gateway.as_ref())
                    .await
                    .map_err(|err| err.to_string());
                let _ = evt_tx.send(RuntimeEvent::Validators { result });
            });
        }

        RuntimeCommand::Lookup {
            ticket,
            target,
            per_page,
        } => {
            tokio::spawn(async move {
                let result = query::fetch_detail(gateway.as_ref(), &target, per_page)
                    .await
                    .map_err(|err| err.to_string());
                let _ = evt_tx.send(RuntimeEvent::Detail { ticket, result });
            });
        }

        RuntimeCommand::RefreshInscriptions => spawn_inscriptions(&gateway, &evt_tx),

        RuntimeCommand::Shutdown => {}
    }
}

/// A failed poll keeps whatever the TUI already shows
fn spawn_inscriptions(gateway: &Arc<dyn Gateway>, evt_tx: &Sender<RuntimeEvent>) {
    let gateway = Arc::clone(gateway);
    let evt_tx = evt_tx.clone();
    tokio::spawn(async move {
        match query::try_fetch_inscriptions(gateway.as_ref()).await {
            Ok(set) => {
                let _ = evt_tx.send(RuntimeEvent::Inscriptions(set));
            }
            Err(err) => warn!(%err, "inscription poll failed"),
        }
    });
}
