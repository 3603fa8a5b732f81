// src/services/mod.rs

pub mod aggregator;   // pure rollups over a snapshot
pub mod audit;        // JSONL action logbook
pub mod history;      // the ONLY history writer

// Public API
pub use aggregator::{Statistics, StatsPolicy, summarize, summarize_with};
pub use audit::AuditLog;
pub use history::{HistoryPolicy, HistoryStore, Record};
