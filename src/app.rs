use std::time::{Duration, Instant};

use crate::domain::{
    classify_search, BlockRecord, Detail, FeedState, Inscription, InscriptionSet, LoadTicket,
    NodeStatus, Page, PageRequest, RangeCache, SearchTarget, TxRecord, ValidatorRecord,
};
use crate::infrastructure::runtime::{FeedId, RuntimeCommand};
use crate::infrastructure::stream::StreamEvent;

/// Inscription cards shown on the home tab
pub const INSCRIPTION_CARDS: usize = 3;

const STATUS_TTL: Duration = Duration::from_secs(5);

/// Main tabs in the application
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tab {
    Home,
    Blocks,
    Transactions,
    Validators,
}

impl Tab {
    pub const ALL: [Tab; 4] = [Tab::Home, Tab::Blocks, Tab::Transactions, Tab::Validators];

    pub fn title(&self) -> &'static str {
        match self {
            Tab::Home => "Home",
            Tab::Blocks => "Blocks",
            Tab::Transactions => "Transactions",
            Tab::Validators => "Validators",
        }
    }

    pub fn shortcut(&self) -> char {
        match self {
            Tab::Home => '1',
            Tab::Blocks => '2',
            Tab::Transactions => '3',
            Tab::Validators => '4',
        }
    }

    pub fn from_shortcut(key: char) -> Option<Tab> {
        Tab::ALL.into_iter().find(|tab| tab.shortcut() == key)
    }

    pub fn next(&self) -> Tab {
        let index = Tab::ALL.iter().position(|t| t == self).unwrap_or(0);
        Tab::ALL[(index + 1) % Tab::ALL.len()]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusLevel {
    Info,
    Warn,
    Error,
}

#[derive(Debug, Clone)]
pub struct StatusMessage {
    pub text: String,
    pub level: StatusLevel,
    pub since: Instant,
}

/// Validator tab state
#[derive(Debug, Clone, Default)]
pub struct ValidatorList {
    pub records: Vec<ValidatorRecord>,
    pub loading: bool,
    pub error: Option<String>,
}

impl ValidatorList {
    pub fn total_power(&self) -> u64 {
        self.records.iter().map(|v| v.voting_power).sum()
    }
}

/// One inscription card and the blocks fetched for it
#[derive(Debug, Clone, Default)]
pub struct InscriptionCard {
    pub inscription: Option<Inscription>,
    pub blocks: RangeCache,
    pending: bool,
}

#[derive(Debug, Clone)]
pub enum DetailState {
    Loading,
    Ready(Detail),
    Failed(String),
}

/// Search result shown in place of the current tab
#[derive(Debug, Clone)]
pub struct DetailPane {
    pub target: SearchTarget,
    pub state: DetailState,
}

pub struct App {
    pub current_tab: Tab,
    pub endpoint: String,
    pub connected: bool,
    pub node: Option<NodeStatus>,
    pub home_blocks: FeedState<BlockRecord>,
    pub home_txs: FeedState<TxRecord>,
    pub blocks: FeedState<BlockRecord>,
    pub txs: FeedState<TxRecord>,
    pub validators: ValidatorList,
    pub inscriptions: InscriptionSet,
    pub cards: [InscriptionCard; INSCRIPTION_CARDS],
    /// Text typed at the `/` prompt while it is open
    pub search_input: Option<String>,
    pub detail: Option<DetailPane>,
    pub should_quit: bool,
    max_rows: usize,
    lookup_seq: u64,
    status: Option<StatusMessage>,
    outbox: Vec<RuntimeCommand>,
}

impl App {
    pub fn new(endpoint: impl Into<String>, max_rows: usize) -> Self {
        let mut app = Self {
            current_tab: Tab::Home,
            endpoint: endpoint.into(),
            connected: false,
            node: None,
            home_blocks: FeedState::new(max_rows),
            home_txs: FeedState::new(max_rows),
            blocks: FeedState::new(max_rows),
            txs: FeedState::new(max_rows),
            validators: ValidatorList::default(),
            inscriptions: InscriptionSet::default(),
            cards: Default::default(),
            search_input: None,
            detail: None,
            should_quit: false,
            max_rows,
            lookup_seq: 0,
            status: None,
            outbox: Vec::new(),
        };
        app.mount(Tab::Home);
        app
    }

    pub fn set_status(&mut self, text: impl Into<String>, level: StatusLevel) {
        self.status = Some(StatusMessage {
            text: text.into(),
            level,
            since: Instant::now(),
        });
    }

    pub fn status_text(&self) -> Option<(&str, StatusLevel)> {
        self.status
            .as_ref()
            .map(|status| (status.text.as_str(), status.level))
    }

    /// Drop info messages once they have been visible for a while
    pub fn on_tick(&mut self) {
        if let Some(status) = &self.status {
            if status.level == StatusLevel::Info && status.since.elapsed() >= STATUS_TTL {
                self.status = None;
            }
        }
    }

    /// Commands queued since the last call
    pub fn take_commands(&mut self) -> Vec<RuntimeCommand> {
        std::mem::take(&mut self.outbox)
    }

    pub fn max_rows(&self) -> usize {
        self.max_rows
    }

    pub fn select_tab(&mut self, tab: Tab) {
        self.detail = None;
        if tab == self.current_tab {
            return;
        }
        self.unmount(self.current_tab);
        self.current_tab = tab;
        self.mount(tab);
    }

    pub fn next_tab(&mut self) {
        self.select_tab(self.current_tab.next());
    }

    pub fn next_page(&mut self) {
        match self.current_tab {
            Tab::Blocks => {
                let page = self.blocks.page();
                if page.has_next(self.blocks.total_count()) {
                    let ticket = self.blocks.request_page(page.next());
                    self.queue_blocks(FeedId::Blocks, ticket, page.next());
                }
            }
            Tab::Transactions => {
                let page = self.txs.page();
                if page.has_next(self.txs.total_count()) {
                    let ticket = self.txs.request_page(page.next());
                    self.queue_txs(FeedId::Txs, ticket, page.next());
                }
            }
            Tab::Home | Tab::Validators => {}
        }
    }

    pub fn prev_page(&mut self) {
        match self.current_tab {
            Tab::Blocks => {
                let page = self.blocks.page();
                if !page.is_first() {
                    let ticket = self.blocks.request_page(page.prev());
                    self.queue_blocks(FeedId::Blocks, ticket, page.prev());
                }
            }
            Tab::Transactions => {
                let page = self.txs.page();
                if !page.is_first() {
                    let ticket = self.txs.request_page(page.prev());
                    self.queue_txs(FeedId::Txs, ticket, page.prev());
                }
            }
            Tab::Home | Tab::Validators => {}
        }
    }

    pub fn open_search(&mut self) {
        self.search_input = Some(String::new());
    }

    pub fn search_push(&mut self, c: char) {
        if let Some(input) = self.search_input.as_mut() {
            input.push(c);
        }
    }

    pub fn search_pop(&mut self) {
        if let Some(input) = self.search_input.as_mut() {
            input.pop();
        }
    }

    pub fn cancel_search(&mut self) {
        self.search_input = None;
    }

    /// Classify the prompt text and open its detail pane. Unusable input
    /// stays in the prompt.
    pub fn submit_search(&mut self) {
        let Some(input) = self.search_input.take() else {
            return;
        };
        match classify_search(&input) {
            Ok(target) => self.open_detail(target),
            Err(err) => {
                self.set_status(err.to_string(), StatusLevel::Warn);
                self.search_input = Some(input);
            }
        }
    }

    pub fn open_detail(&mut self, target: SearchTarget) {
        self.lookup_seq += 1;
        self.outbox.push(RuntimeCommand::Lookup {
            ticket: self.lookup_seq,
            target: target.clone(),
            per_page: self.max_rows as u32,
        });
        self.detail = Some(DetailPane {
            target,
            state: DetailState::Loading,
        });
    }

    pub fn close_detail(&mut self) {
        self.detail = None;
    }

    /// Only the latest lookup of an open pane applies
    pub fn apply_detail(&mut self, ticket: u64, result: Result<Detail, String>) {
        if ticket != self.lookup_seq {
            return;
        }
        let Some(pane) = self.detail.as_mut() else {
            return;
        };
        pane.state = match result {
            Ok(detail) => DetailState::Ready(detail),
            Err(message) => DetailState::Failed(message),
        };
    }

    /// Re-issue the current tab's requests, and the open lookup if any
    pub fn reload(&mut self) {
        if let Some(target) = self.detail.as_ref().map(|pane| pane.target.clone()) {
            self.open_detail(target);
        }
        match self.current_tab {
            Tab::Home => {
                let page = self.home_blocks.page();
                let ticket = self.home_blocks.request_page(page);
                self.queue_blocks(FeedId::HomeBlocks, ticket, page);
                let page = self.home_txs.page();
                let ticket = self.home_txs.request_page(page);
                self.queue_txs(FeedId::HomeTxs, ticket, page);
                self.outbox.push(RuntimeCommand::RefreshInscriptions);
            }
            Tab::Blocks => {
                let page = self.blocks.page();
                let ticket = self.blocks.request_page(page);
                self.queue_blocks(FeedId::Blocks, ticket, page);
            }
            Tab::Transactions => {
                let page = self.txs.page();
                let ticket = self.txs.request_page(page);
                self.queue_txs(FeedId::Txs, ticket, page);
            }
            Tab::Validators => self.request_validators(),
        }
    }

    pub fn apply_connected(&mut self, endpoint: String, status: NodeStatus) {
        self.set_status(
            format!("Connected to {} ({})", endpoint, status.chain_id),
            StatusLevel::Info,
        );
        self.endpoint = endpoint;
        self.node = Some(status);
        self.connected = true;
        // Loads queued while the worker was offline were dropped
        self.reload();
    }

    pub fn apply_blocks_page(
        &mut self,
        feed: FeedId,
        ticket: LoadTicket,
        result: Result<Page<BlockRecord>, String>,
    ) {
        let state = match feed {
            FeedId::HomeBlocks => &mut self.home_blocks,
            FeedId::Blocks => &mut self.blocks,
            FeedId::HomeTxs | FeedId::Txs => return,
        };
        let failed = match result {
            Ok(page) => {
                state.apply_page(ticket, page);
                None
            }
            Err(message) => state.apply_failure(ticket, message.clone()).then_some(message),
        };
        if let Some(message) = failed {
            self.set_status(format!("Blocks: {message}"), StatusLevel::Error);
        }
    }

    pub fn apply_txs_page(
        &mut self,
        feed: FeedId,
        ticket: LoadTicket,
        result: Result<Page<TxRecord>, String>,
    ) {
        let state = match feed {
            FeedId::HomeTxs => &mut self.home_txs,
            FeedId::Txs => &mut self.txs,
            FeedId::HomeBlocks | FeedId::Blocks => return,
        };
        let failed = match result {
            Ok(page) => {
                state.apply_page(ticket, page);
                None
            }
            Err(message) => state.apply_failure(ticket, message.clone()).then_some(message),
        };
        if let Some(message) = failed {
            self.set_status(format!("Transactions: {message}"), StatusLevel::Error);
        }
    }

    /// Feed a live event to every mounted feed; stopped feeds ignore it
    pub fn apply_stream(&mut self, event: StreamEvent) {
        match event {
            StreamEvent::NewBlock(block) => {
                if let Some(node) = self.node.as_mut() {
                    if block.height > node.latest_height {
                        node.latest_height = block.height;
                        node.latest_time = block.timestamp;
                    }
                }
                self.home_blocks.push_streamed(block.clone());
                self.blocks.push_streamed(block);
            }
            StreamEvent::Tx(tx) => {
                self.home_txs.push_streamed(tx.clone());
                self.txs.push_streamed(tx);
            }
            StreamEvent::Stalled { message, .. } => self.apply_rpc_error(message),
            StreamEvent::Resumed => {
                self.connected = true;
                self.set_status("Connection restored", StatusLevel::Info);
            }
        }
    }

    /// Last resolved inscription poll wins
    pub fn apply_inscriptions(&mut self, set: InscriptionSet) {
        self.inscriptions = set;
        let recent = self.inscriptions.recent_revealed(INSCRIPTION_CARDS);
        for (slot, card) in self.cards.iter_mut().enumerate() {
            match recent.get(slot) {
                Some(inscription) => {
                    if card.blocks.retarget(inscription.start_block, inscription.end_block) {
                        card.pending = false;
                    }
                    card.inscription = Some(inscription.clone());
                }
                None => {
                    card.inscription = None;
                    card.blocks.clear();
                    card.pending = false;
                }
            }
        }
        if self.current_tab == Tab::Home {
            self.request_card_ranges();
        }
    }

    pub fn apply_range(
        &mut self,
        slot: usize,
        start: u64,
        end: u64,
        result: Result<Vec<BlockRecord>, String>,
    ) {
        let Some(card) = self.cards.get_mut(slot) else {
            return;
        };
        let current = card
            .inscription
            .as_ref()
            .is_some_and(|i| i.start_block == start && i.end_block == end);
        if current {
            card.pending = false;
        }
        match result {
            Ok(blocks) => {
                card.blocks.store(start, end, blocks);
            }
            Err(message) if current => {
                self.set_status(format!("Blocks {start}-{end}: {message}"), StatusLevel::Warn);
            }
            Err(_) => {}
        }
    }

    pub fn apply_validators(&mut self, result: Result<Vec<ValidatorRecord>, String>) {
        self.validators.loading = false;
        match result {
            Ok(mut records) => {
                records.sort_by(|a, b| b.voting_power.cmp(&a.voting_power));
                self.validators.records = records;
                self.validators.error = None;
            }
            Err(message) => {
                self.set_status(format!("Validators: {message}"), StatusLevel::Error);
                self.validators.error = Some(message);
            }
        }
    }

    pub fn apply_rpc_error(&mut self, message: String) {
        self.connected = false;
        self.set_status(message, StatusLevel::Error);
    }

    fn mount(&mut self, tab: Tab) {
        let first = PageRequest::first(self.max_rows as u32);
        match tab {
            Tab::Home => {
                let ticket = self.home_blocks.start(first);
                self.queue_blocks(FeedId::HomeBlocks, ticket, first);
                let ticket = self.home_txs.start(first);
                self.queue_txs(FeedId::HomeTxs, ticket, first);
                self.request_card_ranges();
            }
            Tab::Blocks => {
                let ticket = self.blocks.start(first);
                self.queue_blocks(FeedId::Blocks, ticket, first);
            }
            Tab::Transactions => {
                let ticket = self.txs.start(first);
                self.queue_txs(FeedId::Txs, ticket, first);
            }
            Tab::Validators => self.request_validators(),
        }
    }

    fn unmount(&mut self, tab: Tab) {
        match tab {
            Tab::Home => {
                self.home_blocks.stop();
                self.home_txs.stop();
            }
            Tab::Blocks => self.blocks.stop(),
            Tab::Transactions => self.txs.stop(),
            Tab::Validators => {}
        }
    }

    fn request_validators(&mut self) {
        self.validators.loading = true;
        self.outbox.push(RuntimeCommand::FetchValidators);
    }

    fn request_card_ranges(&mut self) {
        for (slot, card) in self.cards.iter_mut().enumerate() {
            let Some(inscription) = &card.inscription else {
                continue;
            };
            let (start, end) = (inscription.start_block, inscription.end_block);
            if card.pending || card.blocks.contains(start, end) {
                continue;
            }
            card.pending = true;
            self.outbox.push(RuntimeCommand::FetchRange { slot, start, end });
        }
    }

    fn queue_blocks(&mut self, feed: FeedId, ticket: LoadTicket, request: PageRequest) {
        self.outbox.push(RuntimeCommand::LoadBlocks {
            feed,
            ticket,
            request,
        });
    }

    fn queue_txs(&mut self, feed: FeedId, ticket: LoadTicket, request: PageRequest) {
        self.outbox.push(RuntimeCommand::LoadTxs {
            feed,
            ticket,
            request,
        });
    }
}
