//! Structural validation of a MARR project, optionally followed by conflict
//! detection.
//!
//! Errors make the project invalid. Warnings and conflicts only fail
//! validation in strict mode.

use crate::conflict::Conflict;
use crate::detector::Detector;
use crate::io::read_optional;
use crate::paths::{Layout, CLAUDE_DIR, PROJECT_IMPORT};
use crate::standard::file_name;
use serde::Serialize;
use std::path::{Path, PathBuf};

pub const NOT_INITIALIZED: &str = "Not a MARR-initialized project";

/// Which parts of `.claude/` exist, for diagnosing a failed validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SetupState {
    pub root: PathBuf,
    pub has_claude_dir: bool,
    pub has_marr_dir: bool,
    pub has_project_config: bool,
    pub has_standards: bool,
}

impl SetupState {
    pub fn of(layout: &Layout) -> Self {
        Self {
            root: layout.project.clone(),
            has_claude_dir: layout.project.join(CLAUDE_DIR).is_dir(),
            has_marr_dir: layout.project_marr_dir().is_dir(),
            has_project_config: layout.project_system_config().is_file(),
            has_standards: layout.project_standards_dir().exists(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ValidationResult {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub conflicts: Vec<Conflict>,
    /// Checks that passed, for human output only.
    #[serde(skip)]
    pub passed: Vec<String>,
    /// Set when `.claude/marr/` is absent and nothing else was checked.
    #[serde(skip)]
    pub not_initialized: bool,
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Whether the command should fail: any error, or in strict mode any
    /// warning or conflict.
    pub fn fails(&self, strict: bool) -> bool {
        !self.is_valid() || (strict && (!self.warnings.is_empty() || !self.conflicts.is_empty()))
    }

    pub fn report(&self) -> ValidationReport<'_> {
        ValidationReport {
            timestamp: chrono::Utc::now().to_rfc3339(),
            valid: self.is_valid(),
            errors: &self.errors,
            warnings: &self.warnings,
            conflicts: &self.conflicts,
            summary: ValidationSummary {
                errors: self.errors.len(),
                warnings: self.warnings.len(),
                conflicts: self.conflicts.len(),
            },
        }
    }

    fn pass(&mut self, message: impl Into<String>) {
        self.passed.push(message.into());
    }
}

/// Machine-readable validation output.
#[derive(Debug, Serialize)]
pub struct ValidationReport<'a> {
    pub timestamp: String,
    pub valid: bool,
    pub errors: &'a [String],
    pub warnings: &'a [String],
    pub conflicts: &'a [Conflict],
    pub summary: ValidationSummary,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationSummary {
    pub errors: usize,
    pub warnings: usize,
    pub conflicts: usize,
}

// ---------------------------------------------------------------------------
// Checks
// ---------------------------------------------------------------------------

/// Run the structural checks, then project conflict detection if the project
/// is initialized.
pub fn validate_project(detector: &Detector<'_>) -> ValidationResult {
    let layout = detector.layout();
    let mut result = ValidationResult::default();

    if !check_initialized(layout, &mut result) {
        return result;
    }
    check_system_config(layout, &mut result);
    check_standards_dir(layout, &mut result);
    check_standard_naming(layout, &mut result);
    check_root_config(layout, &mut result);

    result.conflicts = detector.detect_project_conflicts();
    result
}

/// Conflict detection only.
pub fn validate_conflicts(detector: &Detector<'_>) -> ValidationResult {
    ValidationResult {
        conflicts: detector.detect_project_conflicts(),
        ..ValidationResult::default()
    }
}

fn check_initialized(layout: &Layout, result: &mut ValidationResult) -> bool {
    if !layout.project_marr_dir().is_dir() {
        result.errors.push(NOT_INITIALIZED.to_string());
        result.not_initialized = true;
        return false;
    }
    if !layout.project_system_config().is_file() {
        result.errors.push(
            ".claude/marr/MARR-PROJECT-CLAUDE.md not found \
             (create it with a `# ` heading and a `## Standards` section)"
                .to_string(),
        );
        return false;
    }
    result.pass(".claude/marr/MARR-PROJECT-CLAUDE.md exists");
    true
}

fn check_system_config(layout: &Layout, result: &mut ValidationResult) {
    let content = read_optional(&layout.project_system_config()).unwrap_or_default();
    if content.lines().any(|l| l.starts_with("# ")) {
        result.pass("MARR-PROJECT-CLAUDE.md structure validated");
    } else {
        result
            .errors
            .push("MARR-PROJECT-CLAUDE.md missing project name heading (# Project Name)".to_string());
    }
}

fn check_standards_dir(layout: &Layout, result: &mut ValidationResult) {
    let dir = layout.project_standards_dir();
    if !dir.exists() {
        result.warnings.push(
            ".claude/marr/standards/ directory not found (no project standards installed)"
                .to_string(),
        );
    } else if !dir.is_dir() {
        result
            .errors
            .push(".claude/marr/standards exists but is not a directory".to_string());
    } else {
        result.pass(".claude/marr/standards/ directory validated");
    }
}

fn check_standard_naming(layout: &Layout, result: &mut ValidationResult) {
    let dir = layout.project_standards_dir();
    if !dir.is_dir() {
        return;
    }
    let misnamed: Vec<String> = crate::standard::standard_files(&dir)
        .iter()
        .map(|p| file_name(p))
        .filter(|name| !name.starts_with("prj-"))
        .collect();
    if misnamed.is_empty() {
        result.pass("Standard file naming validated");
    }
    for name in misnamed {
        result.warnings.push(format!(
            "Standard file doesn't follow naming convention: {name} (expected prj-*)"
        ));
    }
}

fn check_root_config(layout: &Layout, result: &mut ValidationResult) {
    let Some(path) = layout.project_root_config() else {
        result.warnings.push(
            "CLAUDE.md not found (checked ./CLAUDE.md and ./.claude/CLAUDE.md)".to_string(),
        );
        return;
    };
    let location = relative(&layout.project, &path);
    let import = PROJECT_IMPORT;
    if read_optional(&path).is_some_and(|c| c.contains(import)) {
        result.pass(format!("{location} has MARR import"));
    } else {
        result
            .warnings
            .push(format!("{location} missing MARR import line (expected: {import})"));
    }
}

fn relative(root: &Path, path: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .display()
        .to_string()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
