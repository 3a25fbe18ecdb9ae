//! Conflict detection: scanned configuration against installed standards.
//!
//! Three detectors run per configuration file:
//!
//! - **directive**: a file shares enough keywords with a directive and has a
//!   line that negates a rule ("never run ...") or affirms an anti-pattern
//!   ("always skip ...").
//! - **duplicate**: a custom rules file shares enough of a standard's keyword
//!   pool to look like a parallel version of it.
//! - **missing import**: a scope's root `CLAUDE.md` exists but does not import
//!   the MARR root config.
//!
//! A [`Detector`] holds the layout, thresholds, and the standards list for one
//! run, so nothing is cached across runs or shared between tests.

use crate::config::DetectionConfig;
use crate::conflict::{
    conflict_id, dedupe, resolutions_for, Conflict, ConflictCategory, ConflictReport,
    ReportScope, Severity, SeverityCounts,
};
use crate::io::read_optional;
use crate::keywords::{self, contains_affirmation, contains_negation, keyword_set};
use crate::paths::{Layout, PROJECT_IMPORT, USER_IMPORT};
use crate::scanner::{self, ConfigFile, Scope};
use crate::standard::{read_installed_standards, Directive, DirectiveKind, ParsedStandard};
use serde::{Deserialize, Serialize};
use std::cell::OnceCell;
use std::collections::HashSet;
use std::path::Path;

// ---------------------------------------------------------------------------
// Per-file detectors
// ---------------------------------------------------------------------------

/// Directives contradicted (rules) or encouraged (anti-patterns) by `file`.
///
/// Only reported when a concrete offending line is found; keyword overlap
/// alone is never enough. Ids are built relative to `root`.
pub fn detect_directive_conflicts<'d, I>(
    file: &ConfigFile,
    root: &Path,
    directives: I,
    min_overlap: usize,
) -> Vec<Conflict>
where
    I: IntoIterator<Item = &'d Directive>,
{
    let content_keywords = keyword_set(&file.content);
    let mut conflicts = Vec::new();

    for directive in directives {
        let overlap = keywords::overlap(&content_keywords, &directive.keywords);
        if overlap < min_overlap {
            continue;
        }

        let description = match directive.kind {
            DirectiveKind::Rule => {
                format!("Config may contradict MARR rule: \"{}\"", directive.text)
            }
            DirectiveKind::AntiPattern => {
                format!("Config may encourage forbidden pattern: \"{}\"", directive.text)
            }
            DirectiveKind::Requirement => continue,
        };
        let Some(anchor) = directive.anchor() else {
            continue;
        };
        let matches = |line: &str| match directive.kind {
            DirectiveKind::Rule => contains_negation(line, anchor),
            _ => contains_affirmation(line, anchor),
        };

        let Some((index, line)) = file
            .content
            .lines()
            .enumerate()
            .find(|(_, line)| matches(line))
        else {
            continue;
        };
        let line_number = index + 1;
        tracing::debug!(
            file = %file.path.display(),
            line = line_number,
            kind = %directive.kind,
            source = %directive.source,
            "directive conflict"
        );

        conflicts.push(Conflict {
            id: conflict_id(
                file.scope,
                root,
                &file.path,
                ConflictCategory::DirectiveConflict,
                Some(line_number),
            ),
            category: ConflictCategory::DirectiveConflict,
            severity: Severity::Warning,
            location: file.path.clone(),
            line: Some(line_number),
            existing: line.trim().to_string(),
            marr_expects: Some(directive.text.clone()),
            marr_source: Some(directive.source.clone()),
            description,
            resolutions: resolutions_for(ConflictCategory::DirectiveConflict),
        });
    }

    conflicts
}

/// The first installed standard that `file` appears to duplicate.
///
/// All duplicate conflicts for one file share an id, so only the first match
/// could survive deduplication anyway.
pub fn detect_duplicate_standards(
    file: &ConfigFile,
    root: &Path,
    standards: &[ParsedStandard],
    config: &DetectionConfig,
) -> Option<Conflict> {
    if !file.is_custom_standard() {
        return None;
    }
    let content_keywords = keyword_set(&file.content);

    standards.iter().find_map(|standard| {
        let pool = standard.keyword_pool();
        let overlap = keywords::overlap(&content_keywords, &pool);
        let similarity = overlap as f64 / pool.len().max(1) as f64;
        if overlap < config.min_keyword_overlap || similarity < config.min_similarity {
            return None;
        }

        let topic = standard.topic();
        tracing::debug!(
            file = %file.path.display(),
            standard = %standard.filename,
            overlap,
            similarity,
            "possible duplicate standard"
        );
        Some(Conflict {
            id: conflict_id(
                file.scope,
                root,
                &file.path,
                ConflictCategory::DuplicateStandard,
                None,
            ),
            category: ConflictCategory::DuplicateStandard,
            severity: Severity::Warning,
            location: file.path.clone(),
            line: None,
            existing: format!("Custom {topic} rules in {}", file.filename),
            marr_expects: Some(format!("MARR provides {}", standard.filename)),
            marr_source: Some(standard.filename.clone()),
            description: format!(
                "File \"{}\" appears to define {topic} rules that overlap with MARR standard",
                file.filename
            ),
            resolutions: resolutions_for(ConflictCategory::DuplicateStandard),
        })
    })
}

/// A `missing_import` conflict when `path` exists but lacks `import`.
pub fn check_missing_import(
    path: &Path,
    root: &Path,
    import: &str,
    scope: Scope,
) -> Option<Conflict> {
    let content = read_optional(path)?;
    if content.contains(import) {
        return None;
    }
    Some(Conflict {
        id: conflict_id(scope, root, path, ConflictCategory::MissingImport, None),
        category: ConflictCategory::MissingImport,
        severity: Severity::Warning,
        location: path.to_path_buf(),
        line: None,
        existing: "No MARR import found".to_string(),
        marr_expects: Some(format!("Import: {import}")),
        marr_source: None,
        description: format!("{} CLAUDE.md exists but doesn't import MARR", scope.label()),
        resolutions: resolutions_for(ConflictCategory::MissingImport),
    })
}

// ---------------------------------------------------------------------------
// Detector
// ---------------------------------------------------------------------------

/// Counts shown before detection runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanSummary {
    pub standards: usize,
    pub directives: usize,
    pub config_files: usize,
    pub custom_standards: usize,
}

pub struct Detector<'a> {
    layout: &'a Layout,
    config: DetectionConfig,
    standards: OnceCell<Vec<ParsedStandard>>,
}

impl<'a> Detector<'a> {
    pub fn new(layout: &'a Layout, config: DetectionConfig) -> Self {
        Self {
            layout,
            config,
            standards: OnceCell::new(),
        }
    }

    pub fn layout(&self) -> &Layout {
        self.layout
    }

    /// Installed standards, read on first use.
    pub fn standards(&self) -> &[ParsedStandard] {
        self.standards
            .get_or_init(|| read_installed_standards(self.layout))
    }

    fn directives(&self) -> impl Iterator<Item = &Directive> {
        self.standards().iter().flat_map(|s| s.directives.iter())
    }

    /// Directive and duplicate conflicts for one file.
    pub fn analyze(&self, file: &ConfigFile) -> Vec<Conflict> {
        let root = self.layout.scope_root(file.scope);
        let mut conflicts = detect_directive_conflicts(
            file,
            root,
            self.directives(),
            self.config.min_keyword_overlap,
        );
        conflicts.extend(detect_duplicate_standards(
            file,
            root,
            self.standards(),
            &self.config,
        ));
        conflicts
    }

    /// Analyze `files` and everything they import, skipping the standard
    /// system's own files.
    fn analyze_all(&self, files: &[ConfigFile]) -> Vec<Conflict> {
        let mut visited = HashSet::new();
        let mut conflicts = Vec::new();
        for file in files.iter().filter(|f| !f.is_system_owned()) {
            conflicts.extend(self.analyze(file));
            for imported in scanner::transitive_imports(file, self.layout, &mut visited) {
                if !imported.is_system_owned() {
                    conflicts.extend(self.analyze(&imported));
                }
            }
        }
        conflicts
    }

    pub fn detect_user_conflicts(&self) -> Vec<Conflict> {
        let mut conflicts: Vec<Conflict> =
            check_missing_import(
                &self.layout.user_root_config(),
                &self.layout.home,
                USER_IMPORT,
                Scope::User,
            )
            .into_iter()
            .collect();
        conflicts.extend(self.analyze_all(&scanner::scan_user_config(self.layout)));
        dedupe(conflicts)
    }

    pub fn detect_project_conflicts(&self) -> Vec<Conflict> {
        let mut conflicts: Vec<Conflict> = self
            .layout
            .project_root_config()
            .and_then(|path| {
                check_missing_import(&path, &self.layout.project, PROJECT_IMPORT, Scope::Project)
            })
            .into_iter()
            .collect();
        conflicts.extend(self.analyze_all(&scanner::scan_project_config(self.layout)));
        dedupe(conflicts)
    }

    /// Run the detectors for `scope`, merge and dedupe, and count the results.
    pub fn report(&self, scope: ReportScope) -> ConflictReport {
        let mut conflicts = Vec::new();
        let mut files_scanned = 0;

        if scope.includes(Scope::User) {
            files_scanned += scanner::scan_user_config(self.layout).len();
            conflicts.extend(self.detect_user_conflicts());
        }
        if scope.includes(Scope::Project) {
            files_scanned += scanner::scan_project_config(self.layout).len();
            conflicts.extend(self.detect_project_conflicts());
        }

        let conflicts = dedupe(conflicts);
        tracing::debug!(files_scanned, conflicts = conflicts.len(), "detection finished");
        ConflictReport {
            timestamp: chrono::Utc::now().to_rfc3339(),
            scope,
            files_scanned,
            summary: SeverityCounts::of(&conflicts),
            conflicts,
        }
    }

    pub fn scan_summary(&self) -> ScanSummary {
        let scan = scanner::scan_all_configs(self.layout);
        ScanSummary {
            standards: self.standards().len(),
            directives: self.directives().count(),
            config_files: scan.files().count(),
            custom_standards: scan.custom_standards().count(),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const TESTING_STANDARD: &str = "---
marr: standard
version: 1
title: Testing Standard
scope: All testing activities
triggers:
  - WHEN running tests
---

# Testing Standard

## Core Rules

1. **Always run tests before committing**
2. **Write unit tests for new code**
";

    const SKIPPING_STANDARD: &str = "---
marr: standard
version: 1
title: Testing Standard
scope: All testing activities
triggers:
  - WHEN running tests
---

## Anti-Patterns

- **Skipping tests** — never skip tests to save time
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

        fn put(&self, rel: &str, content: &str) -> std::path::PathBuf {
            let path = self.layout.project.join(rel);
            std::fs::create_dir_all(path.parent().unwrap()).unwrap();
            std::fs::write(&path, content).unwrap();
            path
        }

        fn standard(&self, content: &str) {
            self.put(".claude/marr/standards/prj-testing-standard.md", content);
        }

        fn detect(&self) -> Vec<Conflict> {
            Detector::new(&self.layout, DetectionConfig::default()).detect_project_conflicts()
        }
    }

    const IMPORT_HEADER: &str = "# Project\n@.claude/marr/MARR-PROJECT-CLAUDE.md\n";

    #[test]
    fn scenario_rule_contradicted() {
        let fx = Fixture::new();
        fx.standard(TESTING_STANDARD);
        fx.put(
            "CLAUDE.md",
            &format!("{IMPORT_HEADER}Never run tests automatically for hotfixes\n"),
        );

        let conflicts = fx.detect();
        assert_eq!(conflicts.len(), 1, "{conflicts:#?}");
        let c = &conflicts[0];
        assert_eq!(c.category, ConflictCategory::DirectiveConflict);
        assert_eq!(c.severity, Severity::Warning);
        assert_eq!(c.marr_source.as_deref(), Some("prj-testing-standard.md"));
        assert_eq!(c.existing, "Never run tests automatically for hotfixes");
        assert_eq!(c.line, Some(3));
        assert_eq!(c.id, "project:CLAUDE.md-directive_conflict-L3");
    }

    #[test]
    fn scenario_anti_pattern_affirmed() {
        let fx = Fixture::new();
        fx.standard(SKIPPING_STANDARD);
        fx.put(
            "CLAUDE.md",
            &format!("{IMPORT_HEADER}Always skip tests for hotfixes\n"),
        );

        let conflicts = fx.detect();
        assert_eq!(conflicts.len(), 1, "{conflicts:#?}");
        assert_eq!(conflicts[0].category, ConflictCategory::DirectiveConflict);
        assert!(conflicts[0]
            .description
            .starts_with("Config may encourage forbidden pattern"));
    }

    #[test]
    fn scenario_missing_import() {
        let fx = Fixture::new();
        fx.put("CLAUDE.md", "# Project\n\nSome notes.\n");

        let conflicts = fx.detect();
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].category, ConflictCategory::MissingImport);
        assert_eq!(
            conflicts[0].marr_expects.as_deref(),
            Some("Import: @.claude/marr/MARR-PROJECT-CLAUDE.md")
        );
        assert_eq!(
            conflicts[0].description,
            "Project CLAUDE.md exists but doesn't import MARR"
        );
    }

    #[test]
    fn missing_import_falls_back_to_dot_claude() {
        let fx = Fixture::new();
        let alt = fx.put(".claude/CLAUDE.md", "# Alt\n");
        let conflicts = fx.detect();
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].location, alt);
    }

    #[test]
    fn scenario_duplicate_standard() {
        let fx = Fixture::new();
        fx.standard(TESTING_STANDARD);
        fx.put(
            ".cursorrules",
            "Testing: write unit tests and run tests before committing.\n",
        );

        let conflicts = fx.detect();
        assert_eq!(conflicts.len(), 1, "{conflicts:#?}");
        assert_eq!(conflicts[0].category, ConflictCategory::DuplicateStandard);
        assert_eq!(
            conflicts[0].marr_source.as_deref(),
            Some("prj-testing-standard.md")
        );
        assert_eq!(conflicts[0].existing, "Custom testing rules in .cursorrules");
    }

    #[test]
    fn scenario_no_standards_only_missing_import() {
        let fx = Fixture::new();
        fx.put(
            "CLAUDE.md",
            "# Project\nNever run tests. Always skip tests. Avoid mocks.\n",
        );
        fx.put(".cursorrules", "core rules: always test, never skip, forbidden: mocks\n");

        let conflicts = fx.detect();
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].category, ConflictCategory::MissingImport);
    }

    #[test]
    fn single_shared_keyword_is_below_threshold() {
        let fx = Fixture::new();
        fx.standard(TESTING_STANDARD);
        fx.put("CLAUDE.md", &format!("{IMPORT_HEADER}Never run the linter\n"));
        assert!(fx.detect().is_empty());
    }

    #[test]
    fn overlap_without_frame_is_not_reported() {
        let fx = Fixture::new();
        fx.standard(TESTING_STANDARD);
        fx.put(
            "CLAUDE.md",
            &format!("{IMPORT_HEADER}We run tests in CI before committing.\n"),
        );
        assert!(fx.detect().is_empty());
    }

    #[test]
    fn system_files_never_duplicate() {
        let fx = Fixture::new();
        fx.standard(TESTING_STANDARD);
        fx.put(".claude/marr/MARR-PROJECT-CLAUDE.md", TESTING_STANDARD);
        fx.put(".claude/prompts/prj-testing-standard.md", TESTING_STANDARD);

        assert!(fx
            .detect()
            .iter()
            .all(|c| c.category != ConflictCategory::DuplicateStandard));
    }

    #[test]
    fn ids_are_stable_and_transitive_imports_dedupe() {
        let fx = Fixture::new();
        fx.standard(TESTING_STANDARD);
        let shared = "Never run tests automatically for hotfixes\n";
        fx.put("rules/testing-guidelines.md", shared);
        fx.put("CLAUDE.md", &format!("{IMPORT_HEADER}@rules/testing-guidelines.md\n"));
        fx.put(".claude/CLAUDE.md", "@../rules/testing-guidelines.md\n");

        let first: Vec<_> = fx.detect().into_iter().map(|c| c.id).collect();
        let second: Vec<_> = fx.detect().into_iter().map(|c| c.id).collect();
        assert_eq!(first, second);
        assert_eq!(first, vec!["project:rules/testing-guidelines.md-directive_conflict-L1"]);
    }

    #[test]
    fn report_ids_are_unique_across_scopes() {
        let fx = Fixture::new();
        fx.put("CLAUDE.md", "# Project\n");
        std::fs::create_dir_all(fx.layout.claude_root()).unwrap();
        std::fs::write(fx.layout.user_root_config(), "# User\n").unwrap();

        let detector = Detector::new(&fx.layout, DetectionConfig::default());
        let report = detector.report(ReportScope::Both);
        assert_eq!(report.conflicts.len(), 2);
        assert_eq!(report.summary.warnings, 2);
        assert_eq!(report.files_scanned, 2);

        let ids: HashSet<_> = report.conflicts.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids.len(), report.conflicts.len());
        assert!(ids.contains("user:.claude/CLAUDE.md-missing_import"));
        assert!(ids.contains("project:CLAUDE.md-missing_import"));

        let project_only = detector.report(ReportScope::Project);
        assert_eq!(project_only.conflicts.len(), 1);
    }

    #[test]
    fn both_root_configs_report_the_same_line() {
        let fx = Fixture::new();
        fx.standard(TESTING_STANDARD);
        let offending = format!("{IMPORT_HEADER}Never run tests automatically for hotfixes\n");
        fx.put("CLAUDE.md", &offending);
        fx.put(".claude/CLAUDE.md", &offending);

        let ids: Vec<_> = fx.detect().into_iter().map(|c| c.id).collect();
        assert_eq!(
            ids,
            vec![
                "project:CLAUDE.md-directive_conflict-L3",
                "project:.claude/CLAUDE.md-directive_conflict-L3",
            ]
        );
    }

    #[test]
    fn same_basename_in_different_directories() {
        let fx = Fixture::new();
        fx.standard(SKIPPING_STANDARD);
        fx.put("CLAUDE.md", IMPORT_HEADER);
        fx.put(".claude/prompts/testing-guidelines.md", "Always skip tests for hotfixes\n");
        fx.put(".claude/commands/testing-guidelines.md", "Always skip tests for hotfixes\n");

        let ids: HashSet<_> = fx.detect().into_iter().map(|c| c.id).collect();
        assert!(ids.contains("project:.claude/prompts/testing-guidelines.md-directive_conflict-L1"));
        assert!(ids.contains("project:.claude/commands/testing-guidelines.md-directive_conflict-L1"));
    }

    #[test]
    fn thresholds_come_from_config() {
        let fx = Fixture::new();
        fx.standard(TESTING_STANDARD);
        fx.put(".cursorrules", "Testing: write unit tests and run tests before committing.\n");

        let strict = DetectionConfig {
            min_similarity: 0.95,
            ..DetectionConfig::default()
        };
        let conflicts = Detector::new(&fx.layout, strict).detect_project_conflicts();
        assert!(conflicts.is_empty());
    }

    #[test]
    fn scan_summary_counts() {
        let fx = Fixture::new();
        fx.standard(TESTING_STANDARD);
        fx.put("CLAUDE.md", "# Project\n");
        fx.put(".cursorrules", "x");

        let summary = Detector::new(&fx.layout, DetectionConfig::default()).scan_summary();
        assert_eq!(
            summary,
            ScanSummary {
                standards: 1,
                directives: 2,
                config_files: 2,
                custom_standards: 1,
            }
        );
    }
}
