//! Timestamped sibling backups taken before a file is modified.
//!
//! A backup of `CLAUDE.md` made at 2026-01-15 14:30:22 local time is written
//! next to it as `CLAUDE.md.20260115-143022.bak`.

use crate::error::{MarrError, Result};
use chrono::{Local, NaiveDateTime};
use regex::Regex;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

const TIMESTAMP_FORMAT: &str = "%Y%m%d-%H%M%S";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupInfo {
    pub original_path: PathBuf,
    pub backup_path: PathBuf,
    pub timestamp: NaiveDateTime,
    pub size: u64,
}

fn suffix_re() -> &'static Regex {
    static R: OnceLock<Regex> = OnceLock::new();
    R.get_or_init(|| Regex::new(r"\.(\d{8}-\d{6})\.bak$").expect("static regex"))
}

fn parse_timestamp(backup_name: &str) -> Option<NaiveDateTime> {
    let caps = suffix_re().captures(backup_name)?;
    NaiveDateTime::parse_from_str(&caps[1], TIMESTAMP_FORMAT).ok()
}

fn backup_name(name: &str, at: NaiveDateTime) -> String {
    format!("{name}.{}.bak", at.format(TIMESTAMP_FORMAT))
}

/// Copy `path` to a timestamped sibling and return the backup's path.
///
/// Returns `None` when `path` does not exist. Fails rather than overwrite a
/// backup taken in the same second.
pub fn create_backup(path: &Path) -> Result<Option<PathBuf>> {
    if !path.is_file() {
        tracing::debug!(path = %path.display(), "nothing to back up");
        return Ok(None);
    }
    let name = crate::standard::file_name(path);
    let backup = path.with_file_name(backup_name(&name, Local::now().naive_local()));

    let mut target = std::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&backup)?;
    let mut source = std::fs::File::open(path)?;
    std::io::copy(&mut source, &mut target)?;

    tracing::debug!(backup = %backup.display(), "created backup");
    Ok(Some(backup))
}

/// The file `backup` was taken from, or `None` if the name has no
/// `.YYYYMMDD-HHMMSS.bak` suffix.
pub fn original_of(backup: &Path) -> Option<PathBuf> {
    let name = crate::standard::file_name(backup);
    let m = suffix_re().find(&name)?;
    if m.start() == 0 {
        return None;
    }
    Some(backup.with_file_name(&name[..m.start()]))
}

/// Overwrite the original file with the contents of `backup`. Returns the
/// restored original's path.
pub fn restore_backup(backup: &Path) -> Result<PathBuf> {
    let Some(original) = original_of(backup) else {
        return Err(MarrError::InvalidBackupName(backup.display().to_string()));
    };
    if !backup.is_file() {
        return Err(MarrError::BackupNotFound(backup.display().to_string()));
    }
    let data = std::fs::read(backup)?;
    crate::io::atomic_write(&original, &data)?;
    tracing::info!(original = %original.display(), "restored from backup");
    Ok(original)
}

/// Backups of `path`, newest first.
pub fn list_backups(path: &Path) -> Vec<BackupInfo> {
    let Some(dir) = path.parent() else {
        return Vec::new();
    };
    let name = crate::standard::file_name(path);
    let prefix = format!("{name}.");

    let mut backups: Vec<BackupInfo> = crate::io::list_files(dir, false)
        .into_iter()
        .filter_map(|backup_path| {
            let entry = crate::standard::file_name(&backup_path);
            let rest = entry.strip_prefix(&prefix)?;
            // `rest` must be exactly the timestamp and suffix, so backups of
            // `CLAUDE.md.old` are not mistaken for backups of `CLAUDE.md`.
            if rest.len() != "YYYYMMDD-HHMMSS.bak".len() {
                return None;
            }
            let timestamp = parse_timestamp(&entry)?;
            let size = std::fs::metadata(&backup_path).ok()?.len();
            Some(BackupInfo {
                original_path: path.to_path_buf(),
                backup_path,
                timestamp,
                size,
            })
        })
        .collect();

    backups.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    backups
}

/// Delete all but the `keep` newest backups of `path`. Returns how many were
/// removed; a backup that cannot be deleted is logged and skipped.
pub fn clean_old_backups(path: &Path, keep: usize) -> usize {
    let mut removed = 0;
    for backup in list_backups(path).into_iter().skip(keep) {
        match std::fs::remove_file(&backup.backup_path) {
            Ok(()) => {
                tracing::debug!(backup = %backup.backup_path.display(), "removed old backup");
                removed += 1;
            }
            Err(e) => {
                tracing::warn!(backup = %backup.backup_path.display(), error = %e, "cannot remove backup")
            }
        }
    }
    removed
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
