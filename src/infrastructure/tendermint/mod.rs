//! Tendermint RPC access - gateway, payload normalization, query adapter

mod error;
mod gateway;
pub mod query;
mod tx_decode;
mod types;

pub use error::{FetchError, FetchResult};
pub use gateway::{Gateway, HttpGateway};
