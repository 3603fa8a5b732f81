// chatlens-core/src/commands/init.rs

use anyhow::{Context, Result};
use chrono::Utc;
use once_cell::sync::OnceCell;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::config::CoreConfig;
use crate::utils::fsio::write_atomic;

#[derive(Debug, Clone)]
pub struct InitReport {
    pub root: PathBuf,
    pub config: CoreConfig,
    pub created: Vec<String>,
    pub existed: Vec<String>,
}

// ---------- single global init gate ----------

static INIT: OnceCell<InitReport> = OnceCell::new();

/// Idempotent global initializer. Safe to call often.
/// Returns a &'static InitReport once initialization has completed.
pub fn ensure_initialized_once() -> Result<&'static InitReport> {
    INIT.get_or_try_init(ensure_initialized)
}

/// Resolve the chatlens root. Allow override via CHATLENS_ROOT (tests/deploys).
pub fn chatlens_root() -> PathBuf {
    std::env::var_os("CHATLENS_ROOT")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(".chatlens"))
}

/// Ensure the default root is initialized (idempotent).
pub fn ensure_initialized() -> Result<InitReport> {
    ensure_initialized_at(&chatlens_root())
}

/// Ensure `root` holds a usable layout: directories, config, an empty history
/// document and a seeded action log. Existing files are never overwritten.
pub fn ensure_initialized_at(root: &Path) -> Result<InitReport> {
    let root = root.to_path_buf();
    let mut created = Vec::new();
    let mut existed = Vec::new();

    // Root
    ensure_dir(&root, ".", &mut created, &mut existed)?;

    // Config
    ensure_file(
        &root,
        "config.toml",
        Some(DEFAULT_CONFIG_TOML),
        &mut created,
        &mut existed,
    )?;
    let config = CoreConfig::load(&root)?;

    // Directories named by the config
    if let Some(data_dir) = config.history.path.parent().filter(|d| *d != root.as_path()) {
        ensure_dir(data_dir, &rel_label(&root, data_dir), &mut created, &mut existed)?;
    }
    if config.logbook.path != root {
        let logbook_rel = rel_label(&root, &config.logbook.path);
        ensure_dir(&config.logbook.path, &logbook_rel, &mut created, &mut existed)?;
    }

    // History document
    let history_rel = rel_label(&root, &config.history.path);
    ensure_path(&config.history.path, &history_rel, "[]\n", &mut created, &mut existed)?;

    // Action log
    let ts = Utc::now().to_rfc3339();
    let init_event = format!(
        r#"{{"timestamp":"{}","event":"system_init","agent":"system","details":{{"version":"{}"}}}}"#,
        ts, config.system.version
    );
    let actions_rel = rel_label(&root, &config.logbook.actions);
    ensure_seeded_jsonl(&config.logbook.actions, &actions_rel, &init_event, &mut created, &mut existed)?;

    Ok(InitReport {
        root,
        config,
        created,
        existed,
    })
}

fn ensure_dir(
    p: &Path,
    label: &str,
    created: &mut Vec<String>,
    existed: &mut Vec<String>,
) -> Result<()> {
    if p.exists() {
        existed.push(label.to_string());
        return Ok(());
    }
    fs::create_dir_all(p).with_context(|| format!("create_dir_all({:?})", p))?;
    created.push(label.to_string());
    Ok(())
}

fn ensure_file(
    base: &Path,
    rel_file: &str,
    content_if_absent: Option<&str>,
    created: &mut Vec<String>,
    existed: &mut Vec<String>,
) -> Result<()> {
    let p = base.join(rel_file);
    ensure_path(&p, rel_file, content_if_absent.unwrap_or(""), created, existed)
}

fn ensure_path(
    p: &Path,
    label: &str,
    content_if_absent: &str,
    created: &mut Vec<String>,
    existed: &mut Vec<String>,
) -> Result<()> {
    if p.exists() {
        existed.push(label.to_string());
        return Ok(());
    }
    write_atomic(p, content_if_absent.as_bytes()).with_context(|| format!("write {:?}", p))?;
    created.push(label.to_string());
    Ok(())
}

fn ensure_seeded_jsonl(
    p: &Path,
    label: &str,
    init_line: &str,
    created: &mut Vec<String>,
    existed: &mut Vec<String>,
) -> Result<()> {
    if !p.exists() {
        return ensure_path(p, label, &(init_line.to_string() + "\n"), created, existed);
    }
    existed.push(label.to_string());
    // If exists but empty, seed it
    if fs::metadata(p)?.len() == 0 {
        let mut f = OpenOptions::new().append(true).open(p)?;
        f.write_all(init_line.as_bytes())?;
        f.write_all(b"\n")?;
    }
    Ok(())
}

fn rel_label(root: &Path, p: &Path) -> String {
    p.strip_prefix(root)
        .unwrap_or(p)
        .to_string_lossy()
        .replace('\\', "/")
}

// ---------- defaults ----------

const DEFAULT_CONFIG_TOML: &str = r#"[system]
name = "chatlens"
version = "0.1.0"

[history]
path = "data/history.json"
capacity = 50
excerpt_max_chars = 200
excerpt_marker = "..."
write_retries = 3
retry_backoff_ms = 20

[statistics]
trend_days = 30
top_keywords = 10

[logbook]
path = "logbook"
actions = "logbook/actions.jsonl"
preview_len = 120

[services]
audit_enabled = true
"#;
