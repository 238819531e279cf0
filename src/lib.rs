//! Terminal block explorer for the Surge chain

pub mod app;
pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod ui;
