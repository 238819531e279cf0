//! Domain layer - chain records and the live feed reconciler
//!
//! Everything here is pure: no I/O, no async. The infrastructure layer
//! produces these types, the view layer consumes them.

pub mod feed;
pub mod format;
pub mod range_cache;
pub mod record;
pub mod search;

pub use feed::{FeedState, FeedStatus, LoadTicket, Ordering, Page, PageRequest, MAX_ROWS};
pub use range_cache::{range_key, RangeCache, RANGE_PREVIEW_LEAD};
pub use record::{
    BlockRecord, ChainRecord, Inscription, InscriptionSet, NodeStatus, TxRecord, TxStatus,
    ValidatorRecord,
};
pub use search::{classify_search, Detail, SearchError, SearchTarget};
