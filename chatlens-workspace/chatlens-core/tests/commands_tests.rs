// tests/commands_tests.rs
// End-to-end through the command façade: init layout, validation, excerpting,
// delete outcomes, statistics, audit trail and config overrides.

use std::fs;
use std::path::Path;

use tempfile::TempDir;

use chatlens_core::StoreError;
use chatlens_core::commands::{Commands, DeleteOutcome, ensure_initialized_at};
use chatlens_core::services::aggregator::StatsPolicy;
use chatlens_core::services::audit::AuditLog;
use chatlens_core::services::history::{HistoryPolicy, HistoryStore};

fn audit_lines(root: &Path) -> Vec<serde_json::Value> {
    let text = fs::read_to_string(root.join("logbook").join("actions.jsonl")).unwrap_or_default();
    text.lines()
        .filter(|l| !l.trim().is_empty())
        .map(|l| serde_json::from_str(l).expect("audit line is json"))
        .collect()
}

fn actions(root: &Path) -> Vec<String> {
    audit_lines(root)
        .into_iter()
        .filter_map(|v| v["action"].as_str().map(str::to_string))
        .collect()
}

#[test]
fn init_creates_layout_and_is_idempotent() {
    let dir = TempDir::new().unwrap();
    let root = dir.path().join(".chatlens");

    let first = ensure_initialized_at(&root).expect("init");
    for entry in [".", "data", "logbook", "config.toml", "data/history.json", "logbook/actions.jsonl"] {
        assert!(first.created.iter().any(|c| c == entry), "missing {entry} in {:?}", first.created);
    }
    assert!(root.join("config.toml").is_file());
    assert_eq!(fs::read_to_string(root.join("data/history.json")).unwrap().trim(), "[]");
    let seeded = audit_lines(&root);
    assert_eq!(seeded.len(), 1);
    assert_eq!(seeded[0]["event"], "system_init");

    let second = ensure_initialized_at(&root).expect("re-init");
    assert!(second.created.is_empty(), "nothing new expected: {:?}", second.created);
    assert!(second.existed.iter().any(|e| e == "config.toml"));
    assert_eq!(audit_lines(&root).len(), 1, "re-init must not reseed a non-empty log");
}

#[test]
fn init_creates_logbook_directory_named_in_config() {
    let dir = TempDir::new().unwrap();
    let root = dir.path();
    fs::write(
        root.join("config.toml"),
        r#"
[logbook]
path = "audit"
actions = "audit/actions.jsonl"
"#,
    )
    .unwrap();

    let report = ensure_initialized_at(root).expect("init");
    assert!(report.created.iter().any(|c| c == "audit"), "{:?}", report.created);
    assert!(root.join("audit").is_dir());
    assert!(root.join("audit/actions.jsonl").is_file());
    assert!(!root.join("logbook").exists());
}

#[test]
fn init_keeps_existing_history() {
    let dir = TempDir::new().unwrap();
    let root = dir.path();
    {
        let cmds = Commands::open_at(root).unwrap();
        cmds.submit("hello", "中性").unwrap();
    }
    ensure_initialized_at(root).unwrap();
    let cmds = Commands::open_at(root).unwrap();
    assert_eq!(cmds.history().len(), 1);
}

#[test]
fn submit_rejects_blank_input_without_writing() {
    let dir = TempDir::new().unwrap();
    let cmds = Commands::open_at(dir.path()).unwrap();

    for blank in ["", "   ", "\n\t "] {
        let err = cmds.submit(blank, "积极").unwrap_err();
        assert!(matches!(err, StoreError::EmptyInput));
        assert!(err.is_caller_error());
    }
    assert!(cmds.history().is_empty());
    assert!(actions(dir.path()).iter().any(|a| a == "submit_rejected"));
}

#[test]
fn submit_truncates_long_input_and_keeps_result_verbatim() {
    let dir = TempDir::new().unwrap();
    let cmds = Commands::open_at(dir.path()).unwrap();

    let long = "问".repeat(250);
    let analysis = "  一般咨询，中性反馈\n详情见下  ";
    let rec = cmds.submit(&long, analysis).unwrap();

    assert_eq!(rec.input_excerpt, format!("{}...", "问".repeat(200)));
    assert_eq!(rec.result_text, analysis);

    let exact = "问".repeat(200);
    let rec = cmds.submit(&exact, "").unwrap();
    assert_eq!(rec.input_excerpt, exact, "no marker when nothing was cut");
}

#[test]
fn delete_reports_outcome() {
    let dir = TempDir::new().unwrap();
    let cmds = Commands::open_at(dir.path()).unwrap();
    let rec = cmds.submit("a", "").unwrap();

    assert_eq!(cmds.delete(&rec.id).unwrap(), DeleteOutcome::Deleted);
    assert_eq!(cmds.delete(&rec.id).unwrap(), DeleteOutcome::NotFound);
    assert!(cmds.history().is_empty());

    let acts = actions(dir.path());
    assert!(acts.iter().any(|a| a == "delete_removed"));
    assert!(acts.iter().any(|a| a == "delete_not_found"));
}

#[test]
fn statistics_end_to_end() {
    let dir = TempDir::new().unwrap();
    let cmds = Commands::open_at(dir.path()).unwrap();

    cmds.submit("我想买这个产品", "客户情绪积极，意图为购买").unwrap();
    cmds.submit("你们服务太差了", "服务态度消极，属于投诉").unwrap();
    cmds.submit("请问价格多少", "一般咨询，中性反馈").unwrap();

    let stats = cmds.statistics();
    assert_eq!(stats.total_count, 3);
    let s = &stats.sentiment_distribution;
    assert_eq!((s.positive, s.neutral, s.negative, s.unknown), (1, 1, 1, 0));
    let i = &stats.intent_distribution;
    assert_eq!(
        (i.purchase, i.inquiry, i.complaint, i.other, i.unknown),
        (1, 1, 1, 0, 0)
    );
    let total_daily: usize = stats.daily_trend.iter().map(|d| d.count).sum();
    assert_eq!(total_daily, 3);
    let keywords: Vec<&str> = stats.keyword_frequency.iter().map(|k| k.keyword.as_str()).collect();
    assert_eq!(keywords, vec!["价格", "产品", "服务"]);

    cmds.clear().unwrap();
    let stats = cmds.statistics();
    assert_eq!(stats.total_count, 0);
    assert!(stats.daily_trend.is_empty());
}

#[test]
fn config_overrides_capacity_and_excerpt() {
    let dir = TempDir::new().unwrap();
    let root = dir.path();
    fs::write(
        root.join("config.toml"),
        r#"
[history]
capacity = 2
excerpt_max_chars = 3
excerpt_marker = "…"

[services]
audit_enabled = false
"#,
    )
    .unwrap();

    let cmds = Commands::open_at(root).unwrap();
    cmds.submit("first", "").unwrap();
    cmds.submit("second", "").unwrap();
    cmds.submit("third", "").unwrap();

    let excerpts: Vec<String> = cmds.history().into_iter().map(|r| r.input_excerpt).collect();
    assert_eq!(excerpts, vec!["thi…", "sec…"]);
    // Only the init seed line; audit is disabled.
    assert_eq!(audit_lines(root).len(), 1);
}

#[test]
fn from_parts_with_disabled_audit_writes_no_logbook() {
    let dir = TempDir::new().unwrap();
    let store = HistoryStore::open(dir.path().join("h.json"), HistoryPolicy::default()).unwrap();
    let cmds = Commands::from_parts(store, StatsPolicy::default(), AuditLog::disabled());

    cmds.submit("x", "其他").unwrap();
    assert_eq!(cmds.statistics().intent_distribution.other, 1);
    assert!(!dir.path().join("logbook").exists());
}

#[test]
fn health_reports_record_count() {
    let dir = TempDir::new().unwrap();
    let cmds = Commands::open_at(dir.path()).unwrap();
    cmds.submit("a", "").unwrap();
    let h = cmds.health();
    assert_eq!(h.status, "ok");
    assert_eq!(h.records, 1);
}
