// src/utils/fsio.rs
//! Crash-safe file replacement.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use uuid::Uuid;

/// Atomically replace `path` with `bytes`.
///
/// Writes a uniquely named sibling temp file, fsyncs it, then renames it over
/// `path`. A reader sees either the previous file or the new one. On failure the
/// temp file is removed and the original is left untouched.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let tmp = tmp_sibling(path);
    let res = (|| {
        let mut f = fs::File::create(&tmp)?;
        f.write_all(bytes)?;
        f.sync_all()?;
        drop(f);
        fs::rename(&tmp, path)
    })();
    if res.is_err() {
        let _ = fs::remove_file(&tmp);
    }
    res
}

/// `history.json` -> `.history.json.<uuid>.tmp` in the same directory, so the
/// rename never crosses a filesystem and two writers never share a temp file.
fn tmp_sibling(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "state".to_string());
    let tmp_name = format!(".{}.{}.tmp", name, Uuid::new_v4().simple());
    path.with_file_name(tmp_name)
}
