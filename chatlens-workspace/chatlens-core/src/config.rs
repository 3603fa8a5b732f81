use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::services::aggregator::StatsPolicy;
use crate::services::history::HistoryPolicy;

#[derive(Debug, Clone, Deserialize, Default)]
pub struct CoreConfig {
    #[serde(default)]
    pub system: SystemConfig,
    #[serde(default)]
    pub history: HistoryConfig,
    #[serde(default)]
    pub statistics: StatisticsConfig,
    #[serde(default)]
    pub logbook: LogbookConfig,
    #[serde(default)]
    pub services: ServicesConfig,
}

impl CoreConfig {
    pub fn load(root: &Path) -> Result<Self> {
        let path = root.join("config.toml");
        let mut cfg = if path.exists() {
            let text = fs::read_to_string(&path)
                .with_context(|| format!("reading config file {}", path.display()))?;
            Self::from_toml_str(&text)
                .with_context(|| format!("parsing config file {}", path.display()))?
        } else {
            tracing::info!(
                "No config file found at {}. Using CoreConfig::default().",
                path.display()
            );
            CoreConfig::default()
        };
        cfg.resolve_paths(root);
        Ok(cfg)
    }

    /// Parse without touching the filesystem. Paths stay as written.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        Ok(toml::from_str::<CoreConfig>(text)?)
    }

    fn resolve_paths(&mut self, root: &Path) {
        self.history.path = absolutize(root, &self.history.path);
        self.logbook.path = absolutize(root, &self.logbook.path);
        self.logbook.actions = absolutize(root, &self.logbook.actions);
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SystemConfig {
    #[serde(default = "SystemConfig::default_name")]
    pub name: String,
    #[serde(default = "SystemConfig::default_version")]
    pub version: String,
}

impl SystemConfig {
    fn default_name() -> String {
        "chatlens".to_string()
    }

    fn default_version() -> String {
        "0.1.0".to_string()
    }
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            name: Self::default_name(),
            version: Self::default_version(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct HistoryConfig {
    #[serde(default = "HistoryConfig::default_path")]
    pub path: PathBuf,
    #[serde(default = "HistoryConfig::default_capacity")]
    pub capacity: usize,
    #[serde(default = "HistoryConfig::default_excerpt_max_chars")]
    pub excerpt_max_chars: usize,
    #[serde(default = "HistoryConfig::default_excerpt_marker")]
    pub excerpt_marker: String,
    #[serde(default = "HistoryConfig::default_write_retries")]
    pub write_retries: u32,
    #[serde(default = "HistoryConfig::default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
}

impl HistoryConfig {
    fn default_path() -> PathBuf {
        PathBuf::from("data/history.json")
    }

    fn default_capacity() -> usize {
        50
    }

    fn default_excerpt_max_chars() -> usize {
        200
    }

    fn default_excerpt_marker() -> String {
        "...".to_string()
    }

    fn default_write_retries() -> u32 {
        3
    }

    fn default_retry_backoff_ms() -> u64 {
        20
    }

    pub fn policy(&self) -> HistoryPolicy {
        HistoryPolicy {
            capacity: self.capacity.max(1),
            excerpt_max_chars: self.excerpt_max_chars,
            excerpt_marker: self.excerpt_marker.clone(),
            write_retries: self.write_retries,
            retry_backoff: Duration::from_millis(self.retry_backoff_ms),
        }
    }
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            path: Self::default_path(),
            capacity: Self::default_capacity(),
            excerpt_max_chars: Self::default_excerpt_max_chars(),
            excerpt_marker: Self::default_excerpt_marker(),
            write_retries: Self::default_write_retries(),
            retry_backoff_ms: Self::default_retry_backoff_ms(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct StatisticsConfig {
    #[serde(default = "StatisticsConfig::default_trend_days")]
    pub trend_days: usize,
    #[serde(default = "StatisticsConfig::default_top_keywords")]
    pub top_keywords: usize,
}

impl StatisticsConfig {
    fn default_trend_days() -> usize {
        30
    }

    fn default_top_keywords() -> usize {
        10
    }

    pub fn policy(&self) -> StatsPolicy {
        StatsPolicy {
            trend_days: self.trend_days,
            top_keywords: self.top_keywords,
        }
    }
}

impl Default for StatisticsConfig {
    fn default() -> Self {
        Self {
            trend_days: Self::default_trend_days(),
            top_keywords: Self::default_top_keywords(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LogbookConfig {
    #[serde(default = "LogbookConfig::default_path")]
    pub path: PathBuf,
    #[serde(default = "LogbookConfig::default_actions")]
    pub actions: PathBuf,
    #[serde(default = "LogbookConfig::default_preview_len")]
    pub preview_len: usize,
}

impl LogbookConfig {
    fn default_path() -> PathBuf {
        PathBuf::from("logbook")
    }

    fn default_actions() -> PathBuf {
        PathBuf::from("logbook/actions.jsonl")
    }

    fn default_preview_len() -> usize {
        120
    }
}

impl Default for LogbookConfig {
    fn default() -> Self {
        Self {
            path: Self::default_path(),
            actions: Self::default_actions(),
            preview_len: Self::default_preview_len(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServicesConfig {
    #[serde(default = "ServicesConfig::default_true")]
    pub audit_enabled: bool,
}

impl ServicesConfig {
    fn default_true() -> bool {
        true
    }
}

impl Default for ServicesConfig {
    fn default() -> Self {
        Self {
            audit_enabled: true,
        }
    }
}

fn absolutize(root: &Path, value: &Path) -> PathBuf {
    if value.is_absolute() {
        value.to_path_buf()
    } else {
        root.join(value)
    }
}
