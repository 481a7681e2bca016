pub mod api;
pub mod app;
pub mod cli;
pub mod config;
pub mod global;
pub mod ledger;
pub mod normalizer;
pub mod session;
pub mod sink;
pub mod stats;
pub mod store;
