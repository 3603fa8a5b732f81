// src/commands/api.rs
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::json;
use std::path::Path;

use crate::commands::init::{ensure_initialized_at, ensure_initialized_once};
use crate::error::StoreError;
use crate::services::aggregator::{StatsPolicy, Statistics, summarize_with};
use crate::services::audit::AuditLog;
use crate::services::history::{HistoryStore, Record};

/// Façade over the store and the aggregator. One method per boundary
/// operation an outer layer (CLI, HTTP handler) exposes.
pub struct Commands {
    store: HistoryStore, // the one writer
    stats_policy: StatsPolicy,
    audit: AuditLog,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeleteOutcome {
    Deleted,
    NotFound,
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    pub status: &'static str,
    pub timestamp: DateTime<Utc>,
    pub records: usize,
}

impl Commands {
    /// Open against the process-wide root (`$CHATLENS_ROOT` or `.chatlens`).
    pub fn new() -> Result<Self> {
        let report = ensure_initialized_once()?;
        Self::from_report_config(&report.config)
    }

    /// Open against an explicit root, initializing it if needed.
    pub fn open_at(root: &Path) -> Result<Self> {
        let report = ensure_initialized_at(root)?;
        Self::from_report_config(&report.config)
    }

    fn from_report_config(cfg: &crate::config::CoreConfig) -> Result<Self> {
        let store = HistoryStore::open(cfg.history.path.clone(), cfg.history.policy())
            .with_context(|| format!("opening history at {}", cfg.history.path.display()))?;
        Ok(Self::from_parts(
            store,
            cfg.statistics.policy(),
            AuditLog::from_config(cfg),
        ))
    }

    pub fn from_parts(store: HistoryStore, stats_policy: StatsPolicy, audit: AuditLog) -> Self {
        Self {
            store,
            stats_policy,
            audit,
        }
    }

    pub fn store(&self) -> &HistoryStore {
        &self.store
    }

    /// Store a classification result for the submitted chat text.
    ///
    /// The store rejects empty/whitespace-only `chat_content` before touching
    /// storage and keeps only an excerpt of it. `analysis` is stored verbatim.
    pub fn submit(&self, chat_content: &str, analysis: &str) -> Result<Record, StoreError> {
        match self.store.append(chat_content, analysis) {
            Ok(record) => {
                self.audit.record_action(
                    "commands",
                    "submit_stored",
                    &json!({
                        "id": record.id,
                        "input_chars": chat_content.chars().count(),
                        "truncated": record.input_excerpt != chat_content,
                        "preview": self.audit.redact(&record.input_excerpt),
                    }),
                    "low",
                );
                Ok(record)
            }
            Err(StoreError::EmptyInput) => {
                self.audit.record_action(
                    "commands",
                    "submit_rejected",
                    &json!({"reason": "empty_input"}),
                    "medium",
                );
                Err(StoreError::EmptyInput)
            }
            Err(e) => {
                self.audit.record_action(
                    "commands",
                    "submit_failed",
                    &json!({"error": e.to_string()}),
                    "high",
                );
                Err(e)
            }
        }
    }

    /// Newest → oldest.
    pub fn history(&self) -> Vec<Record> {
        self.store.list()
    }

    pub fn delete(&self, id: &str) -> Result<DeleteOutcome, StoreError> {
        let removed = self.store.delete_by_id(id).inspect_err(|e| {
            self.audit.record_action(
                "commands",
                "delete_failed",
                &json!({"id": id, "error": e.to_string()}),
                "high",
            );
        })?;
        let outcome = if removed {
            DeleteOutcome::Deleted
        } else {
            DeleteOutcome::NotFound
        };
        self.audit.record_action(
            "commands",
            match outcome {
                DeleteOutcome::Deleted => "delete_removed",
                DeleteOutcome::NotFound => "delete_not_found",
            },
            &json!({"id": id}),
            "low",
        );
        Ok(outcome)
    }

    pub fn clear(&self) -> Result<(), StoreError> {
        let before = self.store.len();
        self.store.clear().inspect_err(|e| {
            self.audit.record_action(
                "commands",
                "clear_failed",
                &json!({"error": e.to_string()}),
                "high",
            );
        })?;
        self.audit.record_action("commands", "clear_done", &json!({"removed": before}), "medium");
        Ok(())
    }

    pub fn statistics(&self) -> Statistics {
        let snapshot = self.store.list();
        let stats = summarize_with(&snapshot, &self.stats_policy);
        self.audit.record_action(
            "commands",
            "statistics_returned",
            &json!({"total": stats.total_count}),
            "low",
        );
        stats
    }

    pub fn health(&self) -> HealthReport {
        HealthReport {
            status: "ok",
            timestamp: Utc::now(),
            records: self.store.len(),
        }
    }
}
