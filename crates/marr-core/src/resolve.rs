//! Applying resolutions to detected conflicts.
//!
//! Every mutating resolution backs the target up first, then rewrites the
//! whole file. A failure is recorded on that conflict's [`ResolutionAction`]
//! and processing moves on; earlier resolutions stay applied.

use crate::backup;
use crate::conflict::{
    Conflict, ConflictCategory, DoctorSummary, Resolution, ResolutionAction,
    INVALID_CHOICE_LABEL,
};
use crate::error::{MarrError, Result};
use crate::io::atomic_write;
use crate::paths::{Layout, IMPORT_COMMENT};
use std::collections::BTreeSet;
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// File edits
// ---------------------------------------------------------------------------

/// Insert the import block for `import` after the first `# ` heading, or at
/// the top of the file when there is none.
pub fn insert_import(content: &str, import: &str) -> String {
    let block = format!("{IMPORT_COMMENT}\n{import}\n");
    let mut lines: Vec<&str> = content.split('\n').collect();
    match lines.iter().position(|l| l.starts_with("# ")) {
        Some(heading) => {
            lines.splice(heading + 1..heading + 1, ["", block.as_str()]);
            lines.join("\n")
        }
        None => format!("{block}\n{content}"),
    }
}

/// Add the scope's import line to the root config at `path`.
pub fn add_missing_import(layout: &Layout, path: &Path) -> Result<()> {
    let content = std::fs::read_to_string(path)?;
    let updated = insert_import(&content, layout.import_for(path));
    atomic_write(path, updated.as_bytes())
}

/// Remove the line holding `expected` (trimmed), preferring 1-based `line`.
///
/// Earlier removals in the same file shift later lines up, so when `line` no
/// longer holds `expected` (or now lies past the end) the first line that does
/// is removed instead. Line 0 never matches.
pub fn remove_line(content: &str, line: usize, expected: &str) -> Option<String> {
    let index = line.checked_sub(1)?;
    let mut lines: Vec<&str> = content.split('\n').collect();
    let index = Some(index)
        .filter(|&i| lines.get(i).is_some_and(|l| l.trim() == expected))
        .or_else(|| lines.iter().position(|l| l.trim() == expected))?;
    lines.remove(index);
    Some(lines.join("\n"))
}

fn remove_conflict_line(conflict: &Conflict) -> Result<()> {
    let location = conflict.location.display().to_string();
    let Some(line) = conflict.line else {
        return Err(MarrError::MissingLineNumber(location));
    };
    if line == 0 {
        return Err(MarrError::LineOutOfRange {
            path: location,
            line,
        });
    }
    let content = std::fs::read_to_string(&conflict.location)?;
    let updated =
        remove_line(&content, line, &conflict.existing).ok_or_else(|| MarrError::LineChanged {
            path: location,
            text: conflict.existing.clone(),
        })?;
    atomic_write(&conflict.location, updated.as_bytes())
}

// ---------------------------------------------------------------------------
// Resolver
// ---------------------------------------------------------------------------

/// How resolutions are chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Apply each conflict's recommended resolution without prompting.
    Auto,
    /// Show each conflict and read the operator's choice.
    Interactive,
}

pub struct Resolver<'a> {
    layout: &'a Layout,
    dry_run: bool,
}

impl<'a> Resolver<'a> {
    pub fn new(layout: &'a Layout, dry_run: bool) -> Self {
        Self { layout, dry_run }
    }

    /// Apply `resolution` to `conflict`. Never fails: errors are recorded on
    /// the returned action.
    pub fn apply(&self, conflict: &Conflict, resolution: &Resolution) -> ResolutionAction {
        let mut action = ResolutionAction {
            conflict_id: conflict.id.clone(),
            resolution: resolution.label.clone(),
            backup_path: None,
            success: true,
            error: None,
            note: None,
        };

        if resolution.is_skip() {
            action.note = Some(format!("Skipped: {}", conflict.description));
            return action;
        }
        if self.dry_run {
            action.note = Some(format!("Would apply: {}", resolution.label));
            return action;
        }

        match backup::create_backup(&conflict.location) {
            Ok(path) => action.backup_path = path,
            Err(MarrError::Io(e)) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                tracing::debug!(path = %conflict.location.display(), "backup already taken this second");
            }
            Err(e) => {
                tracing::warn!(path = %conflict.location.display(), error = %e, "backup failed");
            }
        }

        match self.mutate(conflict, resolution) {
            Ok(note) => {
                tracing::info!(conflict = %conflict.id, resolution = %resolution.label, "applied");
                action.note = Some(note);
            }
            Err(e) => {
                tracing::warn!(conflict = %conflict.id, error = %e, "resolution failed");
                action.success = false;
                action.error = Some(e.to_string());
            }
        }
        action
    }

    fn mutate(&self, conflict: &Conflict, resolution: &Resolution) -> Result<String> {
        let location = conflict.location.display();
        let note = match (conflict.category, resolution.key) {
            (ConflictCategory::MissingImport, 'a') => {
                add_missing_import(self.layout, &conflict.location)?;
                format!("Added MARR import to {location}")
            }
            (ConflictCategory::DirectiveConflict, 'm') => {
                remove_conflict_line(conflict)?;
                format!("Removed conflicting directive from {location}")
            }
            (ConflictCategory::OverrideAfterImport, 'r') => {
                remove_conflict_line(conflict)?;
                format!("Removed override from {location}")
            }
            // The user's file is never deleted on their behalf.
            (ConflictCategory::DuplicateStandard, 'm') => format!(
                "Consider removing {location}; MARR provides this via {}",
                conflict.marr_source.as_deref().unwrap_or("an installed standard")
            ),
            (ConflictCategory::DuplicateStandard, 'k') => "Keeping your custom standard".to_string(),
            (ConflictCategory::DuplicateStandard, 'b') => {
                "Keeping both - may cause conflicts".to_string()
            }
            (ConflictCategory::OverrideAfterImport, 'k') => {
                "Keeping intentional override".to_string()
            }
            (_, 'k') => "Keeping existing directive".to_string(),
            (_, key) => format!("No action for [{key}] {}", resolution.label),
        };
        Ok(note)
    }

    /// Apply every conflict's recommended resolution.
    pub fn resolve_auto(&self, conflicts: &[Conflict]) -> Vec<ResolutionAction> {
        conflicts
            .iter()
            .filter_map(|c| c.recommended().map(|r| self.apply(c, r)))
            .collect()
    }

    /// Prompt for each conflict on `output` and read one line per choice from
    /// `input`. End of input stops the session; conflicts not yet shown get
    /// no action.
    pub fn resolve_interactive<R: BufRead, W: Write>(
        &self,
        conflicts: &[Conflict],
        mut input: R,
        mut output: W,
    ) -> Result<Vec<ResolutionAction>> {
        let total = conflicts.len();
        let mut actions = Vec::with_capacity(total);

        for (i, conflict) in conflicts.iter().enumerate() {
            render_conflict(&mut output, conflict, i + 1, total)?;
            write!(output, "  Choice: ")?;
            output.flush()?;

            let mut line = String::new();
            if input.read_line(&mut line)? == 0 {
                writeln!(output)?;
                tracing::debug!(remaining = total - i, "input closed, stopping");
                break;
            }

            let action = match parse_choice(conflict, &line) {
                Some(resolution) => self.apply(conflict, resolution),
                None => ResolutionAction {
                    conflict_id: conflict.id.clone(),
                    resolution: INVALID_CHOICE_LABEL.to_string(),
                    backup_path: None,
                    success: false,
                    error: Some("Invalid choice".to_string()),
                    note: None,
                },
            };
            render_action(&mut output, &action)?;
            actions.push(action);
        }

        Ok(actions)
    }

    /// Trim backups of every file touched by `actions` to the `keep` newest.
    pub fn prune_backups(&self, actions: &[ResolutionAction], keep: usize) -> usize {
        let originals: BTreeSet<PathBuf> = actions
            .iter()
            .filter_map(|a| a.backup_path.as_deref())
            .filter_map(backup::original_of)
            .collect();
        originals
            .iter()
            .map(|path| backup::clean_old_backups(path, keep))
            .sum()
    }

    /// Resolve `conflicts` in `mode`, then prune backups.
    pub fn run<R: BufRead, W: Write>(
        &self,
        conflicts: &[Conflict],
        mode: Mode,
        backup_keep: usize,
        input: R,
        output: W,
    ) -> Result<DoctorSummary> {
        let actions = match mode {
            Mode::Auto => self.resolve_auto(conflicts),
            Mode::Interactive => self.resolve_interactive(conflicts, input, output)?,
        };
        if !self.dry_run {
            let removed = self.prune_backups(&actions, backup_keep);
            if removed > 0 {
                tracing::debug!(removed, "pruned old backups");
            }
        }
        Ok(DoctorSummary::new(conflicts.len(), actions))
    }
}

fn parse_choice<'c>(conflict: &'c Conflict, line: &str) -> Option<&'c Resolution> {
    let mut chars = line.trim().chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => conflict.resolution(c.to_ascii_lowercase()),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

/// Write the details and option menu for one conflict.
pub fn render_conflict<W: Write>(
    out: &mut W,
    conflict: &Conflict,
    current: usize,
    total: usize,
) -> std::io::Result<()> {
    writeln!(out)?;
    writeln!(out, "[{current}/{total}] {}", conflict.category.label())?;
    match conflict.line {
        Some(line) => writeln!(out, "  Location: {}:{line}", conflict.location.display())?,
        None => writeln!(out, "  Location: {}", conflict.location.display())?,
    }
    writeln!(out, "  Found: \"{}\"", conflict.existing)?;
    if let Some(expects) = &conflict.marr_expects {
        writeln!(out, "  MARR expects: {expects}")?;
    }
    if let Some(source) = &conflict.marr_source {
        writeln!(out, "  Source: {source}")?;
    }
    writeln!(out)?;
    writeln!(out, "  Options:")?;
    for r in &conflict.resolutions {
        let marker = if r.recommended { " (recommended)" } else { "" };
        writeln!(out, "    [{}] {}{marker}", r.key, r.label)?;
        writeln!(out, "        {}", r.description)?;
    }
    writeln!(out)
}

/// Write the one-line outcome of an action.
pub fn render_action<W: Write>(out: &mut W, action: &ResolutionAction) -> std::io::Result<()> {
    if let Some(path) = &action.backup_path {
        writeln!(out, "  Backup created: {}", path.display())?;
    }
    match (&action.error, &action.note) {
        (Some(error), _) if action.resolution == INVALID_CHOICE_LABEL => {
            writeln!(out, "  {error}, skipping...")
        }
        (Some(error), _) => writeln!(out, "  Failed: {error}"),
        (None, Some(note)) => writeln!(out, "  {note}"),
        (None, None) => Ok(()),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DetectionConfig;
    use crate::conflict::{resolutions_for, ActionCounts};
    use crate::detector::Detector;
    use crate::paths::PROJECT_IMPORT;
    use tempfile::TempDir;

    const STANDARD: &str = "---
marr: standard
version: 1
title: Testing Standard
scope: testing
triggers:
  - WHEN testing
---
## Core Rules
1. **Always run tests before committing**
";

    struct Fixture {
        _home: TempDir,
        _project: TempDir,
        layout: Layout,
    }

    impl Fixture {
        fn new() -> Self {
            let home = TempDir::new().unwrap();
            let project = TempDir::new().unwrap();
            let layout = Layout::new(home.path(), project.path());
            Self {
                _home: home,
                _project: project,
                layout,
            }
        }

        fn put(&self, rel: &str, content: &str) -> PathBuf {
            let path = self.layout.project.join(rel);
            std::fs::create_dir_all(path.parent().unwrap()).unwrap();
            std::fs::write(&path, content).unwrap();
            path
        }

        fn conflicts(&self) -> Vec<Conflict> {
            Detector::new(&self.layout, DetectionConfig::default()).detect_project_conflicts()
        }

        fn backups(&self, path: &Path) -> usize {
            backup::list_backups(path).len()
        }
    }

    #[test]
    fn import_goes_after_first_heading() {
        let out = insert_import("# Project\nBody\n", PROJECT_IMPORT);
        assert_eq!(
            out,
            format!("# Project\n\n{IMPORT_COMMENT}\n{PROJECT_IMPORT}\n\nBody\n")
        );
    }

    #[test]
    fn import_goes_on_top_without_heading() {
        let out = insert_import("Body\n", PROJECT_IMPORT);
        assert_eq!(out, format!("{IMPORT_COMMENT}\n{PROJECT_IMPORT}\n\nBody\n"));
    }

    #[test]
    fn remove_line_prefers_recorded_number() {
        let content = "a\ndup\nb\ndup\n";
        assert_eq!(remove_line(content, 4, "dup").unwrap(), "a\ndup\nb\n");
        // Shifted: line 3 is no longer "dup", fall back to the first match.
        assert_eq!(remove_line(content, 3, "dup").unwrap(), "a\nb\ndup\n");
        assert!(remove_line(content, 1, "gone").is_none());
        assert!(remove_line(content, 0, "dup").is_none());
        // Past the end after an earlier removal, still found by text.
        assert_eq!(remove_line("a\nlast", 3, "last").unwrap(), "a");
    }

    #[test]
    fn second_removal_on_final_line_follows_the_shift() {
        let fx = Fixture::new();
        fx.put(
            ".claude/marr/standards/prj-testing-standard.md",
            &format!("{STANDARD}\n## Anti-Patterns\n\n- **Skipping tests** — never skip tests to save time\n"),
        );
        let path = fx.put(
            "CLAUDE.md",
            &format!(
                "# P\n{PROJECT_IMPORT}\nNever run tests before committing hotfixes\nAlways skip tests for hotfixes"
            ),
        );

        let conflicts = fx.conflicts();
        let lines: Vec<_> = conflicts.iter().map(|c| c.line).collect();
        assert_eq!(lines, vec![Some(3), Some(4)]);

        let actions = Resolver::new(&fx.layout, false).resolve_auto(&conflicts);
        assert!(actions.iter().all(|a| a.success), "{actions:#?}");
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            format!("# P\n{PROJECT_IMPORT}")
        );
    }

    #[test]
    fn skip_is_pure() {
        let fx = Fixture::new();
        let path = fx.put("CLAUDE.md", "# Project\n");
        let conflict = fx.conflicts().remove(0);
        let skip = conflict.resolution('s').unwrap().clone();

        let action = Resolver::new(&fx.layout, false).apply(&conflict, &skip);
        assert!(action.success);
        assert!(action.backup_path.is_none());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "# Project\n");
        assert_eq!(fx.backups(&path), 0);
    }

    #[test]
    fn dry_run_touches_nothing() {
        let fx = Fixture::new();
        let path = fx.put("CLAUDE.md", "# Project\n");
        let conflicts = fx.conflicts();

        let actions = Resolver::new(&fx.layout, true).resolve_auto(&conflicts);
        assert_eq!(actions[0].note.as_deref(), Some("Would apply: Add import"));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "# Project\n");
        assert_eq!(fx.backups(&path), 0);
    }

    #[test]
    fn add_import_then_rescan_is_clean() {
        let fx = Fixture::new();
        let path = fx.put("CLAUDE.md", "# Project\n\nNotes.\n");
        let conflicts = fx.conflicts();
        assert_eq!(conflicts.len(), 1);

        let actions = Resolver::new(&fx.layout, false).resolve_auto(&conflicts);
        assert!(actions[0].success, "{:?}", actions[0]);
        assert!(actions[0].backup_path.is_some());
        assert!(std::fs::read_to_string(&path)
            .unwrap()
            .contains(PROJECT_IMPORT));
        assert!(fx.conflicts().is_empty());
    }

    #[test]
    fn user_root_config_gets_user_import() {
        let fx = Fixture::new();
        let path = fx.layout.user_root_config();
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "# Me\n").unwrap();

        add_missing_import(&fx.layout, &path).unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains(crate::paths::USER_IMPORT));
    }

    #[test]
    fn adopt_standard_removes_offending_line() {
        let fx = Fixture::new();
        fx.put(".claude/marr/standards/prj-testing-standard.md", STANDARD);
        let path = fx.put(
            "CLAUDE.md",
            &format!("# Project\n{PROJECT_IMPORT}\nNever run tests automatically\nKeep this\n"),
        );

        let conflicts = fx.conflicts();
        assert_eq!(conflicts.len(), 1);
        let actions = Resolver::new(&fx.layout, false).resolve_auto(&conflicts);
        assert!(actions[0].success);
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            format!("# Project\n{PROJECT_IMPORT}\nKeep this\n")
        );
        assert!(fx.conflicts().is_empty());
    }

    #[test]
    fn missing_line_number_fails_without_aborting() {
        let fx = Fixture::new();
        let path = fx.put("CLAUDE.md", "# Project\n");
        let broken = Conflict {
            id: "CLAUDE.md-override_after_import".into(),
            category: ConflictCategory::OverrideAfterImport,
            severity: crate::conflict::Severity::Warning,
            location: path.clone(),
            line: None,
            existing: "x".into(),
            marr_expects: None,
            marr_source: None,
            description: "override".into(),
            resolutions: resolutions_for(ConflictCategory::OverrideAfterImport),
        };
        let mut conflicts = vec![broken];
        conflicts.extend(fx.conflicts());

        let actions = Resolver::new(&fx.layout, false).resolve_auto(&conflicts);
        assert_eq!(actions.len(), 2);
        assert!(!actions[0].success);
        assert!(actions[0].error.as_deref().unwrap().contains("line number"));
        assert!(actions[1].success);
    }

    #[test]
    fn duplicate_use_standard_never_deletes() {
        let fx = Fixture::new();
        fx.put(".claude/marr/standards/prj-testing-standard.md", STANDARD);
        let rules = fx.put(".cursorrules", "Testing: run tests before committing.\n");
        let conflicts = fx.conflicts();
        assert_eq!(conflicts[0].category, ConflictCategory::DuplicateStandard);

        let actions = Resolver::new(&fx.layout, false).resolve_auto(&conflicts);
        assert!(actions[0].success);
        assert!(actions[0].note.as_deref().unwrap().contains("Consider removing"));
        assert!(rules.exists());
    }

    #[test]
    fn interactive_session() {
        let fx = Fixture::new();
        fx.put(".claude/marr/standards/prj-testing-standard.md", STANDARD);
        let path = fx.put("CLAUDE.md", "# Project\nNever run tests automatically\n");
        let conflicts = fx.conflicts();
        assert_eq!(conflicts.len(), 2);

        let input = b"x\nS\n" as &[u8];
        let mut output = Vec::new();
        let actions = Resolver::new(&fx.layout, false)
            .resolve_interactive(&conflicts, input, &mut output)
            .unwrap();
        let shown = String::from_utf8(output).unwrap();

        assert!(shown.contains("[1/2] Missing Import"));
        assert!(shown.contains("[a] Add import (recommended)"));
        assert!(shown.contains("Invalid choice, skipping..."));
        assert_eq!(actions[0].resolution, INVALID_CHOICE_LABEL);
        assert!(!actions[0].success);
        assert_eq!(actions[1].resolution, "Skip");
        assert_eq!(
            ActionCounts::of(&actions),
            ActionCounts {
                resolved: 0,
                skipped: 2,
                failed: 0
            }
        );
        assert_eq!(fx.backups(&path), 0);
    }

    #[test]
    fn end_of_input_stops_session() {
        let fx = Fixture::new();
        fx.put("CLAUDE.md", "# Project\n");
        let conflicts = fx.conflicts();
        let actions = Resolver::new(&fx.layout, false)
            .resolve_interactive(&conflicts, &b""[..], std::io::sink())
            .unwrap();
        assert!(actions.is_empty());
    }

    #[test]
    fn run_prunes_backups() {
        let fx = Fixture::new();
        let path = fx.put("CLAUDE.md", "# Project\n");
        for day in 1..=4 {
            fx.put(&format!("CLAUDE.md.202601{day:02}-000000.bak"), "old");
        }
        let conflicts = fx.conflicts();
        let summary = Resolver::new(&fx.layout, false)
            .run(&conflicts, Mode::Auto, 2, std::io::empty(), std::io::sink())
            .unwrap();

        assert_eq!(summary.conflicts_found, 1);
        assert_eq!(summary.summary.resolved, 1);
        assert_eq!(summary.backups.len(), 1);
        assert_eq!(fx.backups(&path), 2);
    }
}
