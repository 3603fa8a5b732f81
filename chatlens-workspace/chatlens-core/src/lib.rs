//! chatlens-core: durable classification history + statistics.
//!
//! - `services::history` is the only reader/writer of the history document.
//! - `services::aggregator` turns a history snapshot into `Statistics`.
//! - `commands` is the façade an outer layer (CLI, HTTP) calls.

pub mod commands;
pub mod config;
pub mod error;
pub mod services;
pub mod utils;

pub use error::StoreError;
pub use services::aggregator::{Statistics, summarize};
pub use services::history::{HistoryStore, Record};
