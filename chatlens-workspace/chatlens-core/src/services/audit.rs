//! services/audit.rs
//! Action logbook: one JSON object per store operation, appended to
//! `<root>/logbook/actions.jsonl`.
//!
//! Audit is best effort. A failed write is reported through `tracing` and
//! never fails the operation being audited.

use chrono::Utc;
use serde_json::{Value, json};
use std::path::{Path, PathBuf};

use crate::config::CoreConfig;
use crate::utils::logbook::{append_jsonl, preview};

#[derive(Debug, Clone)]
pub struct AuditLog {
    path: PathBuf,
    enabled: bool,
    preview_len: usize,
}

impl AuditLog {
    pub fn new(path: impl Into<PathBuf>, enabled: bool, preview_len: usize) -> Self {
        Self {
            path: path.into(),
            enabled,
            preview_len,
        }
    }

    pub fn from_config(cfg: &CoreConfig) -> Self {
        Self::new(
            cfg.logbook.actions.clone(),
            cfg.services.audit_enabled,
            cfg.logbook.preview_len,
        )
    }

    /// Audit that writes nothing.
    pub fn disabled() -> Self {
        Self::new(PathBuf::new(), false, 0)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Record a generic action event.
    ///
    /// # Arguments
    /// * `agent`: Logical component name (e.g., `"commands"`).
    /// * `action`: Short verb label (e.g., `"submit_stored"`, `"delete_not_found"`).
    /// * `details`: Arbitrary JSON payload (ids, counts).
    /// * `severity`: `"low" | "medium" | "high"`.
    pub fn record_action(&self, agent: &str, action: &str, details: &Value, severity: &str) {
        if !self.enabled {
            return;
        }
        let entry = json!({
            "timestamp": Utc::now().to_rfc3339(),
            "event": "action",
            "agent": agent,
            "action": action,
            "severity": severity,
            "details": details
        });
        if let Err(e) = append_jsonl(&self.path, &entry) {
            tracing::warn!(path = %self.path.display(), error = %e, action, "audit write failed");
        }
    }

    /// Privacy-safe single-line preview for audit payloads.
    pub fn redact(&self, s: &str) -> String {
        preview(s, self.preview_len)
    }
}
