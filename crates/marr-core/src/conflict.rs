//! Conflict report types and the fixed per-category resolution menus.

use crate::scanner::Scope;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictCategory {
    DirectiveConflict,
    DuplicateStandard,
    MissingImport,
    OverrideAfterImport,
}

impl ConflictCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            ConflictCategory::DirectiveConflict => "directive_conflict",
            ConflictCategory::DuplicateStandard => "duplicate_standard",
            ConflictCategory::MissingImport => "missing_import",
            ConflictCategory::OverrideAfterImport => "override_after_import",
        }
    }

    /// Human-readable heading used in interactive output.
    pub fn label(self) -> &'static str {
        match self {
            ConflictCategory::DirectiveConflict => "Directive Conflict",
            ConflictCategory::DuplicateStandard => "Duplicate Standard",
            ConflictCategory::MissingImport => "Missing Import",
            ConflictCategory::OverrideAfterImport => "Override After Import",
        }
    }
}

impl fmt::Display for ConflictCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Selection key of the universal no-op resolution.
pub const SKIP_KEY: char = 's';
pub const SKIP_LABEL: &str = "Skip";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    pub key: char,
    pub label: String,
    pub description: String,
    #[serde(default)]
    pub recommended: bool,
}

impl Resolution {
    fn new(key: char, label: &str, description: &str, recommended: bool) -> Self {
        Self {
            key,
            label: label.to_string(),
            description: description.to_string(),
            recommended,
        }
    }

    pub fn is_skip(&self) -> bool {
        self.key == SKIP_KEY
    }
}

/// The resolution menu for `category`, in display order.
pub fn resolutions_for(category: ConflictCategory) -> Vec<Resolution> {
    let r = Resolution::new;
    match category {
        ConflictCategory::DirectiveConflict => vec![
            r('k', "Keep existing", "Keep your current directive", false),
            r('m', "Adopt standard", "Remove the conflicting directive", true),
            r(SKIP_KEY, SKIP_LABEL, "Resolve later", false),
        ],
        ConflictCategory::DuplicateStandard => vec![
            r('k', "Keep yours", "Keep your standard, disable the MARR equivalent", false),
            r('m', "Use standard", "Stop using your standard in favour of the MARR version", true),
            r('b', "Keep both", "Keep both (may cause conflicts)", false),
            r(SKIP_KEY, SKIP_LABEL, "Resolve later", false),
        ],
        ConflictCategory::MissingImport => vec![
            r('a', "Add import", "Add the MARR import to CLAUDE.md", true),
            r(SKIP_KEY, SKIP_LABEL, "Leave as is", false),
        ],
        ConflictCategory::OverrideAfterImport => vec![
            r('r', "Remove override", "Remove the conflicting section", true),
            r('k', "Keep override", "Keep your override (intentional)", false),
            r(SKIP_KEY, SKIP_LABEL, "Resolve later", false),
        ],
    }
}

/// Stable id: `{scope}:{path}-{category}`, suffixed `-L{line}` when a line is
/// known. `path` is relative to `root` when it lies inside it.
pub fn conflict_id(
    scope: Scope,
    root: &Path,
    location: &Path,
    category: ConflictCategory,
    line: Option<usize>,
) -> String {
    let path = location.strip_prefix(root).unwrap_or(location);
    let base = format!("{}:{}-{}", scope.as_str(), path.display(), category);
    match line {
        Some(line) => format!("{base}-L{line}"),
        None => base,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conflict {
    pub id: String,
    pub category: ConflictCategory,
    pub severity: Severity,
    pub location: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
    pub existing: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub marr_expects: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub marr_source: Option<String>,
    pub description: String,
    pub resolutions: Vec<Resolution>,
}

impl Conflict {
    /// The recommended resolution, falling back to the first listed.
    pub fn recommended(&self) -> Option<&Resolution> {
        self.resolutions
            .iter()
            .find(|r| r.recommended)
            .or_else(|| self.resolutions.first())
    }

    pub fn resolution(&self, key: char) -> Option<&Resolution> {
        self.resolutions.iter().find(|r| r.key == key)
    }
}

/// Keep the first conflict for each id, preserving order.
pub fn dedupe(conflicts: Vec<Conflict>) -> Vec<Conflict> {
    let mut seen = std::collections::HashSet::new();
    conflicts
        .into_iter()
        .filter(|c| seen.insert(c.id.clone()))
        .collect()
}

// ---------------------------------------------------------------------------
// Reports
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportScope {
    User,
    Project,
    Both,
}

impl ReportScope {
    pub fn includes(self, scope: Scope) -> bool {
        matches!(
            (self, scope),
            (ReportScope::Both, _)
                | (ReportScope::User, Scope::User)
                | (ReportScope::Project, Scope::Project)
        )
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeverityCounts {
    pub errors: usize,
    pub warnings: usize,
    pub total: usize,
}

impl SeverityCounts {
    pub fn of(conflicts: &[Conflict]) -> Self {
        let errors = conflicts
            .iter()
            .filter(|c| c.severity == Severity::Error)
            .count();
        Self {
            errors,
            warnings: conflicts.len() - errors,
            total: conflicts.len(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConflictReport {
    pub timestamp: String,
    pub scope: ReportScope,
    pub files_scanned: usize,
    pub conflicts: Vec<Conflict>,
    pub summary: SeverityCounts,
}

/// Outcome of applying one resolution to one conflict.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolutionAction {
    pub conflict_id: String,
    /// Label of the chosen resolution, or `skipped` for an invalid choice.
    pub resolution: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backup_path: Option<PathBuf>,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// What was done (or would be done), for display.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl ResolutionAction {
    /// Skip resolution or an unrecognised choice.
    pub fn is_skipped(&self) -> bool {
        self.resolution == SKIP_LABEL || self.resolution == INVALID_CHOICE_LABEL
    }
}

/// Resolution label recorded when the operator's choice matches no key.
pub const INVALID_CHOICE_LABEL: &str = "skipped";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionCounts {
    pub resolved: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl ActionCounts {
    /// Skips count as skipped, unsuccessful actions as failed, the rest as resolved.
    pub fn of(actions: &[ResolutionAction]) -> Self {
        let mut counts = Self::default();
        for action in actions {
            if action.is_skipped() {
                counts.skipped += 1;
            } else if !action.success {
                counts.failed += 1;
            } else {
                counts.resolved += 1;
            }
        }
        counts
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DoctorSummary {
    pub timestamp: String,
    pub conflicts_found: usize,
    pub actions: Vec<ResolutionAction>,
    pub summary: ActionCounts,
    pub backups: Vec<PathBuf>,
}

impl DoctorSummary {
    pub fn new(conflicts_found: usize, actions: Vec<ResolutionAction>) -> Self {
        let backups = actions
            .iter()
            .filter_map(|a| a.backup_path.clone())
            .collect();
        Self {
            timestamp: chrono::Utc::now().to_rfc3339(),
            conflicts_found,
            summary: ActionCounts::of(&actions),
            actions,
            backups,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
