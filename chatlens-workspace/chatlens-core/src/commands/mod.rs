// src/commands/mod.rs
pub mod init;
mod api;

pub use api::{Commands, DeleteOutcome, HealthReport};

pub use init::{
    InitReport, chatlens_root, ensure_initialized, ensure_initialized_at, ensure_initialized_once,
};
