//! Runtime bridge - connects sync TUI thread with async Tokio runtime
//!
//! The TUI never awaits. It sends `RuntimeCommand`s and drains
//! `RuntimeEvent`s once per frame; all network work happens on the worker
//! thread.

use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use anyhow::Context;

use crate::domain::{
    BlockRecord, Detail, InscriptionSet, LoadTicket, NodeStatus, Page, PageRequest,
    SearchTarget, TxRecord, ValidatorRecord,
};
use crate::infrastructure::runtime::worker::run_async_worker;
use crate::infrastructure::stream::StreamEvent;
use crate::infrastructure::tendermint::Gateway;

/// Which list a page load belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FeedId {
    HomeBlocks,
    HomeTxs,
    Blocks,
    Txs,
}

/// Commands sent from the TUI to the async worker
#[derive(Debug, Clone)]
pub enum RuntimeCommand {
    /// Load a page of blocks for `feed`
    LoadBlocks {
        feed: FeedId,
        ticket: LoadTicket,
        request: PageRequest,
    },
    /// Load a page of transactions for `feed`
    LoadTxs {
        feed: FeedId,
        ticket: LoadTicket,
        request: PageRequest,
    },
    /// Fetch the blocks of an inscription range into cache `slot`
    FetchRange { slot: usize, start: u64, end: u64 },
    FetchValidators,
    /// Resolve a search for the detail pane; `ticket` comes back unchanged
    Lookup {
        ticket: u64,
        target: SearchTarget,
        per_page: u32,
    },
    /// Re-fetch inscriptions outside the regular poll
    RefreshInscriptions,
    Shutdown,
}

/// Events sent from the async worker to the TUI
#[derive(Debug)]
pub enum RuntimeEvent {
    Connected {
        endpoint: String,
        status: NodeStatus,
    },
    BlocksPage {
        feed: FeedId,
        ticket: LoadTicket,
        result: Result<Page<BlockRecord>, String>,
    },
    TxsPage {
        feed: FeedId,
        ticket: LoadTicket,
        result: Result<Page<TxRecord>, String>,
    },
    Stream(StreamEvent),
    Inscriptions(InscriptionSet),
    RangeReady {
        slot: usize,
        start: u64,
        end: u64,
        result: Result<Vec<BlockRecord>, String>,
    },
    Validators {
        result: Result<Vec<ValidatorRecord>, String>,
    },
    Detail {
        ticket: u64,
        result: Result<Detail, String>,
    },
    Error {
        message: String,
    },
}

/// Worker timing knobs
#[derive(Debug, Clone, Copy)]
pub struct WorkerSettings {
    pub poll_interval: Duration,
    pub inscription_poll: Duration,
    /// Most blocks the live stream publishes per poll
    pub backlog: usize,
}

/// Bridge between TUI thread and async runtime
pub struct RuntimeBridge {
    cmd_tx: Sender<RuntimeCommand>,
    evt_rx: Receiver<RuntimeEvent>,
}

impl RuntimeBridge {
    /// Start the worker thread with its own Tokio runtime
    pub fn new(gateway: Arc<dyn Gateway>, settings: WorkerSettings) -> anyhow::Result<Self> {
        let (cmd_tx, cmd_rx) = mpsc::channel::<RuntimeCommand>();
        let (evt_tx, evt_rx) = mpsc::channel::<RuntimeEvent>();

        let rt = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .thread_name("surge-worker")
            .build()
            .context("Failed to create Tokio runtime")?;

        thread::Builder::new()
            .name("surge-runtime".into())
            .spawn(move || {
                rt.block_on(async {
                    if let Err(err) =
                        run_async_worker(gateway, settings, cmd_rx, evt_tx.clone()).await
                    {
                        let _ = evt_tx.send(RuntimeEvent::Error {
                            message: format!("Worker exited: {:#}", err),
                        });
                    }
                });
            })
            .context("Failed to spawn runtime thread")?;

        Ok(Self { cmd_tx, evt_rx })
    }

    /// Send a command to the async worker
    pub fn send(&self, cmd: RuntimeCommand) -> anyhow::Result<()> {
        self.cmd_tx
            .send(cmd)
            .map_err(|_| anyhow::anyhow!("Worker channel closed"))
    }

    /// Poll for events (non-blocking)
    pub fn poll_events(&self) -> Vec<RuntimeEvent> {
        self.evt_rx.try_iter().collect()
    }
}

impl Drop for RuntimeBridge {
    fn drop(&mut self) {
        let _ = self.cmd_tx.send(RuntimeCommand::Shutdown);
    }
}
