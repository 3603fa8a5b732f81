// src/utils/mod.rs
pub mod fsio;
pub mod logbook;
