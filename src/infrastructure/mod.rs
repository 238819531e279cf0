//! Infrastructure layer - External service integrations
//!
//! This layer contains:
//! - The Tendermint gateway and the query adapter built on it
//! - The polling chain stream
//! - Tokio runtime bridge for async operations

pub mod runtime;
pub mod stream;
pub mod tendermint;

pub use runtime::{FeedId, RuntimeBridge, RuntimeCommand, RuntimeEvent, WorkerSettings};
pub use stream::{ChainStream, StreamEvent};
pub use tendermint::{FetchError, Gateway, HttpGateway};
