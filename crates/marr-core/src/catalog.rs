//! Managing the project's installed standards: frontmatter checks, listing,
//! scaffolding new standards, and regenerating the trigger table in
//! `MARR-PROJECT-CLAUDE.md`.

use crate::error::{MarrError, Result};
use crate::frontmatter::StandardFrontmatter;
use crate::io::{atomic_write, is_owned_by_current_user};
use crate::paths::{Layout, PROJECT_CONFIG_FILE, STANDARDS_DIR};
use crate::standard::{file_name, parse_standard, standard_files, ParseError, ParsedStandard};
use serde::Serialize;
use std::path::{Path, PathBuf};

const SECTION_START: &str = "## Standards";
const SECTION_END: &str = "---";

// ---------------------------------------------------------------------------
// Checking and listing
// ---------------------------------------------------------------------------

/// Frontmatter check result for one file.
#[derive(Debug, Clone, Serialize)]
pub struct StandardCheck {
    pub path: PathBuf,
    pub filename: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frontmatter: Option<StandardFrontmatter>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
}

impl StandardCheck {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

fn parse_error_messages(err: ParseError) -> Vec<String> {
    match err {
        ParseError::FrontmatterParseError { message, .. } => {
            vec![format!("Failed to parse YAML frontmatter: {message}")]
        }
        ParseError::NotAStandard(_) => {
            vec!["Missing or invalid \"marr: standard\" discriminator".to_string()]
        }
        ParseError::InvalidFrontmatter { errors, .. } => {
            errors.iter().map(ToString::to_string).collect()
        }
        other => vec![other.to_string()],
    }
}

/// Parse `path` and collect every reason it is not a valid standard.
pub fn check_standard(path: &Path) -> StandardCheck {
    let filename = file_name(path);
    match parse_standard(path) {
        Ok(standard) => StandardCheck {
            path: path.to_path_buf(),
            filename,
            frontmatter: Some(standard.frontmatter),
            errors: Vec::new(),
        },
        Err(e) => StandardCheck {
            path: path.to_path_buf(),
            filename,
            frontmatter: None,
            errors: parse_error_messages(e),
        },
    }
}

/// Check every standard file in `dir`, in filename order.
pub fn check_all(dir: &Path) -> Vec<StandardCheck> {
    standard_files(dir).iter().map(|p| check_standard(p)).collect()
}

// ---------------------------------------------------------------------------
// Scaffolding
// ---------------------------------------------------------------------------

/// `testing` -> `prj-testing.md`. Existing prefix and extension are kept.
pub fn standard_filename(name: &str) -> String {
    let mut filename = name.to_string();
    if !filename.starts_with("prj-") {
        filename.insert_str(0, "prj-");
    }
    if !filename.ends_with(".md") {
        filename.push_str(".md");
    }
    filename
}

/// `prj-code-review-standard.md` -> `Code Review Standard`.
pub fn title_for(filename: &str) -> String {
    let stem = filename.strip_prefix("prj-").unwrap_or(filename);
    let stem = stem
        .strip_suffix("-standard.md")
        .or_else(|| stem.strip_suffix(".md"))
        .unwrap_or(stem);
    let words: Vec<String> = stem
        .split('-')
        .filter(|w| !w.is_empty())
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect();
    format!("{} Standard", words.join(" "))
}

fn template(title: &str) -> String {
    format!(
        r#"---
marr: standard
version: 1
title: {title}
scope: Describe when this standard applies

triggers:
  - WHEN [describe a situation where this standard applies]
  - WHEN [describe another triggering situation]
---

# {title}

> **AI Agent Instructions**: [Brief instruction for agents]
>
> **Scope**: [When this applies]
>
> **Rationale**: [Why this standard exists]

---

## Triggers

**You MUST follow this standard when:**
- [Trigger condition 1]
- [Trigger condition 2]

---

## Core Rules (NEVER VIOLATE)

1. **[Rule name]** because [reason]
2. **[Rule name]** because [reason]

---

## Anti-Patterns (FORBIDDEN)

- **[Anti-pattern name]** - [Why it's forbidden]

---
"#
    )
}

/// Write a new standard skeleton named after `name` into the project's
/// standards directory. Never overwrites.
pub fn create_standard(layout: &Layout, name: &str) -> Result<PathBuf> {
    let dir = layout.project_standards_dir();
    if !dir.is_dir() {
        return Err(MarrError::FileNotFound(format!("{STANDARDS_DIR}/")));
    }
    let filename = standard_filename(name);
    let path = dir.join(&filename);
    if path.exists() {
        return Err(MarrError::StandardExists(filename));
    }
    atomic_write(&path, template(&title_for(&filename)).as_bytes())?;
    tracing::info!(path = %path.display(), "created standard");
    Ok(path)
}

// ---------------------------------------------------------------------------
// Trigger table sync
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedStandard {
    pub path: PathBuf,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncOutcome {
    /// Filenames listed in the regenerated section, sorted.
    pub synced: Vec<String>,
    pub skipped: Vec<SkippedStandard>,
    /// The regenerated section, empty when there was nothing to sync.
    pub section: String,
    pub written: bool,
}

fn standard_entry(standard: &ParsedStandard) -> String {
    let triggers: Vec<String> = standard
        .frontmatter
        .triggers
        .iter()
        .map(|t| format!("- {t}"))
        .collect();
    format!(
        "### `{}`\nRead this standard when:\n{}",
        standard.filename,
        triggers.join("\n")
    )
}

/// The `## Standards` section listing each standard's triggers.
pub fn render_section(standards: &[ParsedStandard]) -> String {
    let entries: Vec<String> = standards.iter().map(standard_entry).collect();
    format!(
        "{SECTION_START}

`standards/` contains standard prompt files that must be followed when working on a related activity.

**IMPORTANT: Conditional Reading Protocol**

1. **DO NOT read standards proactively**: only read a standard when its trigger condition matches your current task
2. **Evaluate triggers against your current task**: before each task, scan the trigger list below and identify which (if any) apply
3. **Read triggered standards before proceeding**: when a trigger matches, read the full standard file immediately
4. **Multiple triggers = multiple reads**: if more than one trigger matches, read all corresponding standards

{}

{SECTION_END}",
        entries.join("\n\n")
    )
}

/// Replace the lines from `## Standards` through the next `---` (inclusive)
/// with `section`. `name` is only used in errors.
pub fn replace_section(content: &str, section: &str, name: &str) -> Result<String> {
    let lines: Vec<&str> = content.split('\n').collect();
    let mut start = None;
    let mut end = None;
    for (i, line) in lines.iter().enumerate() {
        let line = line.trim();
        if line == SECTION_START {
            // A repeated heading before the closing rule restarts the section.
            start = Some(i);
        } else if start.is_some() && line == SECTION_END {
            end = Some(i + 1);
            break;
        }
    }
    let start = start.ok_or_else(|| MarrError::StandardsSectionNotFound(name.to_string()))?;
    let end = end.ok_or_else(|| MarrError::StandardsSectionUnterminated(name.to_string()))?;

    let mut out: Vec<&str> = lines[..start].to_vec();
    out.extend(section.split('\n'));
    out.extend_from_slice(&lines[end..]);
    Ok(out.join("\n"))
}

/// Regenerate the trigger table from the frontmatter of every valid standard
/// owned by the current user.
pub fn sync_triggers(layout: &Layout, dry_run: bool) -> Result<SyncOutcome> {
    let dir = layout.project_standards_dir();
    let config = layout.project_system_config();
    if !dir.is_dir() {
        return Err(MarrError::FileNotFound(format!("{STANDARDS_DIR}/")));
    }
    if !config.is_file() {
        return Err(MarrError::FileNotFound(PROJECT_CONFIG_FILE.to_string()));
    }

    let files = standard_files(&dir);
    let mut outcome = SyncOutcome {
        synced: Vec::new(),
        skipped: Vec::new(),
        section: String::new(),
        written: false,
    };
    if files.is_empty() {
        return Ok(outcome);
    }

    let mut standards = Vec::new();
    for path in files {
        if !is_owned_by_current_user(&path) {
            tracing::warn!(path = %path.display(), "skipping standard not owned by current user");
            outcome.skipped.push(SkippedStandard {
                path,
                reason: "not owned by current user".to_string(),
            });
            continue;
        }
        match parse_standard(&path) {
            Ok(standard) => standards.push(standard),
            Err(e) => {
                tracing::debug!(error = %e, "skipping invalid standard");
                outcome.skipped.push(SkippedStandard {
                    path,
                    reason: "invalid frontmatter".to_string(),
                });
            }
        }
    }
    if standards.is_empty() {
        return Err(MarrError::NoValidStandards(format!("{STANDARDS_DIR}/")));
    }

    standards.sort_by(|a, b| a.filename.cmp(&b.filename));
    outcome.section = render_section(&standards);
    outcome.synced = standards.into_iter().map(|s| s.filename).collect();

    let content = std::fs::read_to_string(&config)?;
    let updated = replace_section(&content, &outcome.section, PROJECT_CONFIG_FILE)?;
    if !dry_run {
        atomic_write(&config, updated.as_bytes())?;
        outcome.written = true;
        tracing::info!(count = outcome.synced.len(), "synced standards section");
    }
    Ok(outcome)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
