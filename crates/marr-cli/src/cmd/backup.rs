use crate::output::{display_path, print_json, print_table};
use anyhow::Context;
use clap::Subcommand;
use marr_core::backup;
use marr_core::config::DetectionConfig;
use marr_core::paths::Layout;
use std::path::{Path, PathBuf};

#[derive(Subcommand)]
pub enum BackupSubcommand {
    /// List backups of a file, newest first
    List {
        /// The original file (e.g. CLAUDE.md)
        file: PathBuf,
    },

    /// Overwrite the original file with a backup's contents
    Restore {
        /// Backup file (<name>.YYYYMMDD-HHMMSS.bak)
        backup: PathBuf,
    },

    /// Delete all but the newest backups of a file
    Clean {
        file: PathBuf,
        /// Backups to keep (default: backup_keep from .claude/marr/config.yaml)
        #[arg(long)]
        keep: Option<usize>,
    },
}

pub fn run(layout: &Layout, subcmd: BackupSubcommand, json: bool) -> anyhow::Result<()> {
    match subcmd {
        BackupSubcommand::List { file } => list(layout, &resolve(layout, &file), json),
        BackupSubcommand::Restore { backup } => restore(layout, &resolve(layout, &backup), json),
        BackupSubcommand::Clean { file, keep } => {
            let keep = match keep {
                Some(keep) => keep,
                None => {
                    DetectionConfig::load(layout)
                        .context("failed to load .claude/marr/config.yaml")?
                        .backup_keep
                }
            };
            clean(layout, &resolve(layout, &file), keep, json)
        }
    }
}

fn resolve(layout: &Layout, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        layout.project.join(path)
    }
}

fn list(layout: &Layout, file: &Path, json: bool) -> anyhow::Result<()> {
    let backups = backup::list_backups(file);
    if json {
        return print_json(&backups);
    }
    if backups.is_empty() {
        println!("No backups of {}.", display_path(&layout.project, file));
        return Ok(());
    }
    let rows = backups
        .iter()
        .map(|b| {
            vec![
                display_path(&layout.project, &b.backup_path),
                b.timestamp.format("%Y-%m-%d %H:%M:%S").to_string(),
                b.size.to_string(),
            ]
        })
        .collect();
    print_table(&["BACKUP", "TAKEN", "BYTES"], rows);
    Ok(())
}

fn restore(layout: &Layout, backup_path: &Path, json: bool) -> anyhow::Result<()> {
    let original = backup::restore_backup(backup_path)
        .with_context(|| format!("failed to restore {}", backup_path.display()))?;
    let shown = display_path(&layout.project, &original);
    if json {
        print_json(&serde_json::json!({ "restored": shown }))?;
    } else {
        println!("Restored {shown}");
    }
    Ok(())
}

fn clean(layout: &Layout, file: &Path, keep: usize, json: bool) -> anyhow::Result<()> {
    let removed = backup::clean_old_backups(file, keep);
    if json {
        print_json(&serde_json::json!({ "removed": removed, "kept": keep }))?;
    } else {
        println!(
            "Removed {removed} old backup(s) of {}",
            display_path(&layout.project, file)
        );
    }
    Ok(())
}
