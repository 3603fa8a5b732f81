// src/utils/logbook.rs
use anyhow::Result;
use serde::Serialize;
use std::{fs, io::Write, path::Path};

/// Append one JSON value as a line to a JSONL file, creating parents as needed.
pub fn append_jsonl<S: Serialize>(path: &Path, val: &S) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string(val)?;
    let mut f = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)?;
    writeln!(f, "{}", json)?;
    Ok(())
}

/// Single-line preview of free text, cut at `max_chars` characters with an ellipsis.
pub fn preview(s: &str, max_chars: usize) -> String {
    let flat = s.replace(['\n', '\r'], " ");
    if flat.chars().count() <= max_chars {
        return flat;
    }
    let mut out: String = flat.chars().take(max_chars).collect();
    out.push('…');
    out
}
