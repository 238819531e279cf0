//! Live feed reconciler
//!
//! A `FeedState` backs one list view. It merges a one-shot historical page
//! with a stream of newly observed records into a single list that is
//! newest-first, unique by hash and never longer than its cap.
//!
//! Streaming only touches page 1. Any other page is a plain snapshot that
//! is replaced wholesale when it resolves.

use std::collections::HashSet;

use super::record::ChainRecord;

/// Default cap on displayed rows
pub const MAX_ROWS: usize = 20;

/// Tendermint rejects `per_page` above this
const MAX_PER_PAGE: u32 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ordering {
    Desc,
    Asc,
}

impl Ordering {
    pub fn as_str(&self) -> &'static str {
        match self {
            Ordering::Desc => "desc",
            Ordering::Asc => "asc",
        }
    }
}

/// A bounded window of historical records
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    page: u32,
    per_page: u32,
    ordering: Ordering,
}

impl PageRequest {
    /// Build a request; `page` and `per_page` are clamped into range
    pub fn new(page: u32, per_page: u32, ordering: Ordering) -> Self {
        Self {
            page: page.max(1),
            per_page: per_page.clamp(1, MAX_PER_PAGE),
            ordering,
        }
    }

    /// Newest-first first page
    pub fn first(per_page: u32) -> Self {
        Self::new(1, per_page, Ordering::Desc)
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn per_page(&self) -> u32 {
        self.per_page
    }

    pub fn ordering(&self) -> Ordering {
        self.ordering
    }

    pub fn is_first(&self) -> bool {
        self.page == 1
    }

    pub fn next(&self) -> Self {
        Self {
            page: self.page.saturating_add(1),
            ..*self
        }
    }

    pub fn prev(&self) -> Self {
        Self {
            page: self.page.saturating_sub(1).max(1),
            ..*self
        }
    }

    /// Whether a page after this one exists for `total` records
    pub fn has_next(&self, total: u64) -> bool {
        u64::from(self.page) * u64::from(self.per_page) < total
    }

    /// Number of pages needed for `total` records (at least one)
    pub fn page_count(&self, total: u64) -> u64 {
        total.div_ceil(u64::from(self.per_page)).max(1)
    }
}

/// Result of one page query
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<R> {
    pub records: Vec<R>,
    pub total_count: u64,
}

impl<R> Page<R> {
    pub fn new(records: Vec<R>, total_count: u64) -> Self {
        Self {
            records,
            total_count,
        }
    }

    /// The "no data yet" sentinel
    pub fn empty() -> Self {
        Self {
            records: Vec::new(),
            total_count: 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedStatus {
    Idle,
    Loading,
    Ready,
    Failed,
}

/// Identifies one page request against one mount of a feed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadTicket {
    epoch: u64,
    seq: u64,
}

#[derive(Debug, Clone)]
pub struct FeedState<R> {
    records: Vec<R>,
    max_rows: usize,
    status: FeedStatus,
    page: PageRequest,
    /// Page the held rows came from; differs from `page` while a load is pending
    rows_page: u32,
    total_count: u64,
    last_height: Option<u64>,
    last_error: Option<String>,
    live: bool,
    /// Bumped on every start/stop; tickets from older mounts never apply
    epoch: u64,
    seq: u64,
}

impl<R: ChainRecord> FeedState<R> {
    pub fn new(max_rows: usize) -> Self {
        let max_rows = max_rows.max(1);
        Self {
            records: Vec::new(),
            max_rows,
            status: FeedStatus::Idle,
            page: PageRequest::first(max_rows as u32),
            rows_page: 1,
            total_count: 0,
            last_height: None,
            last_error: None,
            live: false,
            epoch: 0,
            seq: 0,
        }
    }

    /// Mount the feed and issue the first page request
    pub fn start(&mut self, page: PageRequest) -> LoadTicket {
        self.reset();
        self.epoch += 1;
        self.live = true;
        self.request_page(page)
    }

    /// Unmount. In-flight tickets and streamed events are dropped afterwards.
    pub fn stop(&mut self) {
        self.reset();
        self.epoch += 1;
        self.live = false;
    }

    /// Issue a new page request, superseding any pending one
    pub fn request_page(&mut self, page: PageRequest) -> LoadTicket {
        self.seq += 1;
        self.page = page;
        self.status = FeedStatus::Loading;
        self.last_error = None;
        LoadTicket {
            epoch: self.epoch,
            seq: self.seq,
        }
    }

    /// Replace the list with a resolved page. Returns false if the ticket
    /// no longer applies.
    pub fn apply_page(&mut self, ticket: LoadTicket, page: Page<R>) -> bool {
        if !self.accepts(ticket) {
            return false;
        }
        let mut records = page.records;
        records.truncate(self.max_rows);
        self.observe_heights(&records);
        self.records = records;
        self.rows_page = self.page.page();
        self.total_count = page.total_count;
        self.status = FeedStatus::Ready;
        true
    }

    /// Record a failed page request; current rows stay visible
    pub fn apply_failure(&mut self, ticket: LoadTicket, message: impl Into<String>) -> bool {
        if !self.accepts(ticket) {
            return false;
        }
        self.status = FeedStatus::Failed;
        self.last_error = Some(message.into());
        true
    }

    /// Merge one streamed record. Returns true if the list changed.
    ///
    /// Only a live feed whose requested page and held rows are both page 1
    /// takes streamed records. A record is accepted when the list is empty,
    /// or when it is at least as high as the current newest row and not that
    /// row's exact hash. Accepted records are prepended, the list is cut to
    /// the cap, then deduplicated by hash keeping the first occurrence. A
    /// hash not already listed counts towards `total_count`.
    pub fn push_streamed(&mut self, record: R) -> bool {
        if !self.live || !self.page.is_first() || self.rows_page != 1 {
            return false;
        }

        let Some(newest) = self.records.first() else {
            self.observe_height(record.height());
            self.total_count += 1;
            self.records.push(record);
            return true;
        };

        if record.height() < newest.height() || record.hash() == newest.hash() {
            return false;
        }

        if !self.records.iter().any(|r| r.hash() == record.hash()) {
            self.total_count += 1;
        }
        self.observe_height(record.height());
        self.records.insert(0, record);
        self.records.truncate(self.max_rows);

        let mut seen = HashSet::new();
        self.records.retain(|r| seen.insert(r.hash().to_string()));
        true
    }

    pub fn records(&self) -> &[R] {
        &self.records
    }

    pub fn newest(&self) -> Option<&R> {
        self.records.first()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn status(&self) -> FeedStatus {
        self.status
    }

    pub fn page(&self) -> PageRequest {
        self.page
    }

    pub fn total_count(&self) -> u64 {
        self.total_count
    }

    /// Highest height seen on this mount
    pub fn last_height(&self) -> Option<u64> {
        self.last_height
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn is_live(&self) -> bool {
        self.live
    }

    pub fn max_rows(&self) -> usize {
        self.max_rows
    }

    fn accepts(&self, ticket: LoadTicket) -> bool {
        self.live && ticket.epoch == self.epoch && ticket.seq == self.seq
    }

    fn reset(&mut self) {
        self.records.clear();
        self.status = FeedStatus::Idle;
        self.rows_page = 1;
        self.total_count = 0;
        self.last_height = None;
        self.last_error = None;
    }

    fn observe_heights(&mut self, records: &[R]) {
        for record in records {
            self.observe_height(record.height());
        }
    }

    fn observe_height(&mut self, height: u64) {
        self.last_height = Some(self.last_height.map_or(height, |h| h.max(height)));
    }
}

impl<R: ChainRecord> Default for FeedState<R> {
    fn default() -> Self {
        Self::new(MAX_ROWS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Row {
        height: u64,
        hash: String,
    }

    impl ChainRecord for Row {
        fn height(&self) -> u64 {
            self.height
        }

        fn hash(&self) -> &str {
            &self.hash
        }
    }

    fn row(height: u64) -> Row {
        Row {
            height,
            hash: format!("H{height}"),
        }
    }

    fn heights(feed: &FeedState<Row>) -> Vec<u64> {
        feed.records().iter().map(|r| r.height).collect()
    }

    fn loaded(rows: Vec<Row>, cap: usize) -> FeedState<Row> {
        let mut feed = FeedState::new(cap);
        let ticket = feed.start(PageRequest::first(cap as u32));
        let total = rows.len() as u64;
        assert!(feed.apply_page(ticket, Page::new(rows, total)));
        feed
    }

    #[test]
    fn newer_record_is_prepended_and_stale_one_ignored() {
        let mut feed = loaded(vec![row(100), row(99), row(98)], MAX_ROWS);
        assert!(feed.push_streamed(row(101)));
        assert_eq!(heights(&feed), vec![101, 100, 99, 98]);

        assert!(!feed.push_streamed(row(99)));
        assert_eq!(heights(&feed), vec![101, 100, 99, 98]);
    }

    #[test]
    fn full_list_drops_oldest() {
        let rows: Vec<Row> = (1..=20).rev().map(row).collect();
        let mut feed = loaded(rows, 20);
        assert!(feed.push_streamed(row(21)));
        assert_eq!(feed.len(), 20);
        assert_eq!(feed.newest().map(|r| r.height), Some(21));
        assert_eq!(feed.records().last().map(|r| r.height), Some(2));
    }

    #[test]
    fn same_hash_at_new_height_keeps_first_occurrence() {
        let mut feed = loaded(vec![row(10)], MAX_ROWS);
        let first = Row {
            height: 11,
            hash: "DUP".into(),
        };
        let second = Row {
            height: 12,
            hash: "DUP".into(),
        };
        assert!(feed.push_streamed(first));
        assert!(!feed.push_streamed(second));
        let hashes: Vec<&str> = feed.records().iter().map(|r| r.hash.as_str()).collect();
        assert_eq!(hashes, vec!["DUP", "H10"]);
        assert_eq!(feed.newest().map(|r| r.height), Some(11));
    }

    #[test]
    fn duplicate_below_newest_is_collapsed_by_dedup() {
        let mut feed = loaded(vec![row(10)], MAX_ROWS);
        feed.push_streamed(Row {
            height: 11,
            hash: "DUP".into(),
        });
        feed.push_streamed(row(12));
        // Passes the newest-row check, then the older copy is dropped
        assert!(feed.push_streamed(Row {
            height: 13,
            hash: "DUP".into(),
        }));
        assert_eq!(heights(&feed), vec![13, 12, 10]);
    }

    #[test]
    fn exact_duplicate_of_newest_is_rejected() {
        let mut feed = loaded(vec![row(10)], MAX_ROWS);
        assert!(!feed.push_streamed(row(10)));
        assert_eq!(feed.len(), 1);
    }

    #[test]
    fn equal_height_with_new_hash_is_accepted() {
        let mut feed = loaded(vec![row(10)], MAX_ROWS);
        let sibling = Row {
            height: 10,
            hash: "OTHER".into(),
        };
        assert!(feed.push_streamed(sibling));
        assert_eq!(heights(&feed), vec![10, 10]);
    }

    #[test]
    fn empty_feed_takes_first_streamed_record() {
        let mut feed: FeedState<Row> = FeedState::default();
        feed.start(PageRequest::first(20));
        assert!(feed.push_streamed(row(5)));
        assert_eq!(heights(&feed), vec![5]);
        assert_eq!(feed.last_height(), Some(5));
    }

    #[test]
    fn invariants_hold_over_long_stream() {
        let mut feed = loaded(vec![row(3), row(2), row(1)], 5);
        for step in 0..200u64 {
            let height = 3 + step / 3;
            let hash = format!("S{}", step % 17);
            feed.push_streamed(Row { height, hash });

            assert!(feed.len() <= 5);
            let hs = heights(&feed);
            assert!(hs.windows(2).all(|w| w[0] >= w[1]), "not sorted: {hs:?}");
            let mut seen = HashSet::new();
            assert!(feed.records().iter().all(|r| seen.insert(r.hash.clone())));
        }
    }

    #[test]
    fn deeper_pages_ignore_stream() {
        let mut feed: FeedState<Row> = FeedState::new(3);
        let ticket = feed.start(PageRequest::first(3).next());
        feed.apply_page(ticket, Page::new(vec![row(50), row(49), row(48)], 100));
        assert!(!feed.push_streamed(row(200)));
        assert_eq!(heights(&feed), vec![50, 49, 48]);
    }

    #[test]
    fn stream_waits_for_page_one_rows_after_paging_back() {
        let mut feed = loaded(vec![row(100), row(99), row(98)], 3);
        let ticket = feed.request_page(PageRequest::first(3).next());
        feed.apply_page(ticket, Page::new(vec![row(97), row(96), row(95)], 100));

        let back = feed.request_page(PageRequest::first(3));
        assert!(feed.page().is_first());
        assert!(!feed.push_streamed(row(101)));
        assert!(feed.apply_failure(back, "HTTP 502"));
        assert!(!feed.push_streamed(row(102)));
        assert_eq!(heights(&feed), vec![97, 96, 95]);

        let retry = feed.request_page(PageRequest::first(3));
        feed.apply_page(retry, Page::new(vec![row(102), row(101), row(100)], 102));
        assert!(feed.push_streamed(row(103)));
        assert_eq!(heights(&feed), vec![103, 102, 101]);
    }

    #[test]
    fn streamed_records_count_towards_total() {
        let mut feed = loaded(vec![row(10), row(9)], MAX_ROWS);
        assert_eq!(feed.total_count(), 2);
        feed.push_streamed(row(11));
        assert_eq!(feed.total_count(), 3);

        // rejected, then a re-listed hash: neither adds a record
        feed.push_streamed(row(11));
        feed.push_streamed(Row {
            height: 12,
            hash: "H9".into(),
        });
        assert_eq!(feed.total_count(), 3);
    }

    #[test]
    fn stopped_feed_drops_late_results() {
        let mut feed: FeedState<Row> = FeedState::default();
        let ticket = feed.start(PageRequest::first(20));
        feed.stop();
        assert!(!feed.apply_page(ticket, Page::new(vec![row(1)], 1)));
        assert!(!feed.push_streamed(row(2)));
        assert!(feed.is_empty());
        assert_eq!(feed.status(), FeedStatus::Idle);
    }

    #[test]
    fn ticket_from_previous_mount_is_rejected() {
        let mut feed: FeedState<Row> = FeedState::default();
        let old = feed.start(PageRequest::first(20));
        feed.stop();
        let fresh = feed.start(PageRequest::first(20));
        assert!(!feed.apply_page(old, Page::new(vec![row(1)], 1)));
        assert!(feed.apply_page(fresh, Page::new(vec![row(2)], 1)));
        assert_eq!(heights(&feed), vec![2]);
    }

    #[test]
    fn superseded_page_request_is_rejected() {
        let mut feed: FeedState<Row> = FeedState::default();
        let first = feed.start(PageRequest::first(20));
        let second = feed.request_page(PageRequest::first(20).next());
        assert!(!feed.apply_page(first, Page::new(vec![row(9)], 40)));
        assert!(feed.apply_page(second, Page::new(vec![row(3)], 40)));
        assert_eq!(feed.page().page(), 2);
    }

    #[test]
    fn refetch_overwrites_streamed_rows() {
        let mut feed: FeedState<Row> = FeedState::default();
        let ticket = feed.start(PageRequest::first(20));
        feed.push_streamed(row(7));
        feed.push_streamed(row(8));
        feed.apply_page(ticket, Page::new(vec![row(6), row(5)], 2));
        assert_eq!(heights(&feed), vec![6, 5]);
    }

    #[test]
    fn failure_keeps_rows_and_sets_status() {
        let mut feed = loaded(vec![row(4)], MAX_ROWS);
        let ticket = feed.request_page(PageRequest::first(20));
        assert!(feed.apply_failure(ticket, "HTTP 502"));
        assert_eq!(feed.status(), FeedStatus::Failed);
        assert_eq!(feed.last_error(), Some("HTTP 502"));
        assert_eq!(heights(&feed), vec![4]);
    }

    #[test]
    fn page_is_capped_on_load() {
        let rows: Vec<Row> = (1..=30).rev().map(row).collect();
        let feed = loaded(rows, 20);
        assert_eq!(feed.len(), 20);
        assert_eq!(feed.status(), FeedStatus::Ready);
        assert_eq!(feed.total_count(), 30);
    }

    #[test]
    fn page_request_navigation() {
        let page = PageRequest::first(20);
        assert!(page.is_first());
        assert_eq!(page.prev().page(), 1);
        assert_eq!(page.next().page(), 2);
        assert!(page.has_next(21));
        assert!(!page.has_next(20));
        assert_eq!(page.page_count(41), 3);
        assert_eq!(page.page_count(0), 1);
        assert_eq!(PageRequest::new(0, 500, Ordering::Asc).per_page(), 100);
        assert_eq!(PageRequest::new(0, 0, Ordering::Asc).page(), 1);
    }
}
