pub mod activity;

pub use activity::tx_activity;
