//! Runtime infrastructure - Tokio runtime bridge for async operations

mod bridge;
mod worker;

pub use bridge::{FeedId, RuntimeBridge, RuntimeCommand, RuntimeEvent, WorkerSettings};
pub use worker::run_async_worker;
