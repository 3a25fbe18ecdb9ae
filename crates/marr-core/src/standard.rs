//! Standard documents: parsing and directive extraction.
//!
//! A standard is a markdown file whose frontmatter passes
//! [`frontmatter::validate`]. Its body is scanned line by line with a small
//! section state machine; inside a "Core Rules", "Anti-Patterns" or
//! "Requirements" section, list items become [`Directive`]s.

use crate::frontmatter::{self, FieldError, StandardFrontmatter};
use crate::keywords::extract_keywords;
use crate::paths::Layout;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use thiserror::Error;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DirectiveKind {
    Rule,
    AntiPattern,
    Requirement,
}

impl DirectiveKind {
    pub fn as_str(self) -> &'static str {
        match self {
            DirectiveKind::Rule => "rule",
            DirectiveKind::AntiPattern => "anti-pattern",
            DirectiveKind::Requirement => "requirement",
        }
    }
}

impl std::fmt::Display for DirectiveKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One rule or anti-pattern extracted from a standard's body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Directive {
    pub text: String,
    pub kind: DirectiveKind,
    /// Filename of the standard the directive came from.
    pub source: String,
    pub standard_title: String,
    /// Ordered, deduplicated; the first entry is the directive's anchor term.
    pub keywords: Vec<String>,
}

impl Directive {
    /// The term negation/affirmation frames are matched against.
    pub fn anchor(&self) -> Option<&str> {
        self.keywords.first().map(String::as_str)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedStandard {
    pub path: PathBuf,
    pub filename: String,
    pub frontmatter: StandardFrontmatter,
    pub body: String,
    pub directives: Vec<Directive>,
}

impl ParsedStandard {
    /// Subject of the standard: its title lower-cased with the word
    /// "standard" removed ("Testing Standard" -> "testing").
    pub fn topic(&self) -> String {
        topic_of(&self.frontmatter.title)
    }

    /// Union of all directive keywords plus the words of the topic.
    pub fn keyword_pool(&self) -> HashSet<String> {
        let mut pool: HashSet<String> = self
            .directives
            .iter()
            .flat_map(|d| d.keywords.iter().cloned())
            .collect();
        pool.extend(self.topic().split_whitespace().map(str::to_string));
        pool
    }
}

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("file not found: {}", .0.display())]
    FileNotFound(PathBuf),

    #[error("cannot read {}: {message}", .path.display())]
    Unreadable { path: PathBuf, message: String },

    #[error("failed to parse frontmatter in {}: {message}", .path.display())]
    FrontmatterParseError { path: PathBuf, message: String },

    #[error("not a MARR standard (missing marr: standard): {}", .0.display())]
    NotAStandard(PathBuf),

    #[error("invalid frontmatter in {}: {}", .path.display(), join_errors(.errors))]
    InvalidFrontmatter {
        path: PathBuf,
        errors: Vec<FieldError>,
    },
}

fn join_errors(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

// ---------------------------------------------------------------------------
// Section state machine
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    None,
    In(DirectiveKind),
}

fn re(cell: &'static OnceLock<Regex>, pattern: &str) -> &'static Regex {
    cell.get_or_init(|| Regex::new(pattern).expect("static regex"))
}

fn rules_heading() -> &'static Regex {
    static R: OnceLock<Regex> = OnceLock::new();
    re(&R, r"(?i)^#+\s*Core\s+Rules")
}

fn anti_heading() -> &'static Regex {
    static R: OnceLock<Regex> = OnceLock::new();
    re(&R, r"(?i)^#+\s*Anti[- ]?Patterns?")
}

fn requirement_heading() -> &'static Regex {
    static R: OnceLock<Regex> = OnceLock::new();
    re(&R, r"(?i)^#+\s*(Requirements?|Must\s+Have)")
}

fn any_heading() -> &'static Regex {
    static R: OnceLock<Regex> = OnceLock::new();
    re(&R, r"^#+\s")
}

/// `1. **Rule** because reason`
fn numbered_item() -> &'static Regex {
    static R: OnceLock<Regex> = OnceLock::new();
    re(&R, r"^\d+\.\s+\*\*([^*]+)\*\*\s*(.*)$")
}

/// `- **Name**` followed by a dash and a description
fn bold_bullet() -> &'static Regex {
    static R: OnceLock<Regex> = OnceLock::new();
    re(&R, r"^[-*]\s+\*\*([^*]+)\*\*\s*[—–-]\s*(.*)$")
}

/// `- plain text`
fn plain_bullet() -> &'static Regex {
    static R: OnceLock<Regex> = OnceLock::new();
    re(&R, r"^[-*]\s+(.+)$")
}

fn because_prefix() -> &'static Regex {
    static R: OnceLock<Regex> = OnceLock::new();
    re(&R, r"(?i)^because\s*")
}

fn standard_word() -> &'static Regex {
    static R: OnceLock<Regex> = OnceLock::new();
    re(&R, r"(?i)\s*standard\s*")
}

fn topic_of(title: &str) -> String {
    standard_word()
        .replace(&title.to_lowercase(), "")
        .trim()
        .to_string()
}

/// Next section state for a heading line, or `None` if `line` is not a heading.
///
/// Unrecognised headings that still mention "Rules" or "Anti" (sub-headings
/// such as "### Commit Rules") keep the current section open.
fn heading_transition(line: &str, current: Section) -> Option<Section> {
    if rules_heading().is_match(line) {
        return Some(Section::In(DirectiveKind::Rule));
    }
    if anti_heading().is_match(line) {
        return Some(Section::In(DirectiveKind::AntiPattern));
    }
    if requirement_heading().is_match(line) {
        return Some(Section::In(DirectiveKind::Requirement));
    }
    if any_heading().is_match(line) {
        if line.contains("Rules") || line.contains("Anti") {
            return Some(current);
        }
        return Some(Section::None);
    }
    None
}

/// Match one trimmed line against the directive shapes, in priority order.
/// Returns the directive text and the text keywords are derived from.
fn match_line(line: &str) -> Option<(String, String)> {
    if let Some(caps) = numbered_item().captures(line) {
        let rule = caps[1].trim();
        let reason = because_prefix().replace(&caps[2], "");
        let reason = reason.trim();
        let text = if reason.is_empty() {
            rule.to_string()
        } else {
            format!("{rule} ({reason})")
        };
        return Some((text, format!("{rule} {reason}")));
    }

    if let Some(caps) = bold_bullet().captures(line) {
        let name = caps[1].trim();
        let description = caps[2].trim();
        return Some((
            format!("{name}: {description}"),
            format!("{name} {description}"),
        ));
    }

    let caps = plain_bullet().captures(line)?;
    if caps[1].starts_with('*') {
        return None;
    }
    let text = caps[1].trim();
    if text.chars().count() > 10 && !text.starts_with('(') && !text.starts_with('[') {
        return Some((text.to_string(), text.to_string()));
    }
    None
}

/// Extract directives from a standard body, in document order.
pub fn extract_directives(body: &str, source: &str, title: &str) -> Vec<Directive> {
    let mut section = Section::None;
    let mut directives = Vec::new();

    for raw in body.lines() {
        let line = raw.trim();

        if let Some(next) = heading_transition(line, section) {
            section = next;
            continue;
        }

        let Section::In(kind) = section else {
            continue;
        };

        if let Some((text, keyword_source)) = match_line(line) {
            directives.push(Directive {
                text,
                kind,
                source: source.to_string(),
                standard_title: title.to_string(),
                keywords: extract_keywords(&keyword_source),
            });
        }
    }

    directives
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

/// Parse already-loaded standard content. `path` is used for the filename and
/// for error reporting only.
pub fn parse_content(path: &Path, content: &str) -> Result<ParsedStandard, ParseError> {
    let doc = frontmatter::decode(content).map_err(|message| ParseError::FrontmatterParseError {
        path: path.to_path_buf(),
        message,
    })?;

    if !frontmatter::has_standard_discriminator(&doc.data) {
        return Err(ParseError::NotAStandard(path.to_path_buf()));
    }

    let fm = frontmatter::validate(&doc.data).map_err(|errors| ParseError::InvalidFrontmatter {
        path: path.to_path_buf(),
        errors,
    })?;

    let filename = file_name(path);
    let directives = extract_directives(doc.body, &filename, &fm.title);

    Ok(ParsedStandard {
        path: path.to_path_buf(),
        filename,
        frontmatter: fm,
        body: doc.body.to_string(),
        directives,
    })
}

/// Read and parse the standard at `path`.
pub fn parse_standard(path: &Path) -> Result<ParsedStandard, ParseError> {
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(ParseError::FileNotFound(path.to_path_buf()))
        }
        Err(e) => {
            return Err(ParseError::Unreadable {
                path: path.to_path_buf(),
                message: e.to_string(),
            })
        }
    };
    parse_content(path, &content)
}

pub(crate) fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Candidate standard files in `dir`: immediate `.md` children except `README.md`.
pub fn standard_files(dir: &Path) -> Vec<PathBuf> {
    crate::io::list_files(dir, false)
        .into_iter()
        .filter(|p| p.extension().is_some_and(|e| e == "md"))
        .filter(|p| file_name(p) != "README.md")
        .collect()
}

/// Parse every standard in `dir`. Files that fail to parse are skipped.
pub fn read_standards_from_dir(dir: &Path) -> Vec<ParsedStandard> {
    standard_files(dir)
        .into_iter()
        .filter_map(|path| match parse_standard(&path) {
            Ok(standard) => Some(standard),
            Err(ParseError::NotAStandard(_)) => None,
            Err(e) => {
                tracing::debug!(error = %e, "skipping standard");
                None
            }
        })
        .collect()
}

/// Project-scope standards followed by user-scope standards.
///
/// Both scopes are kept even when they define a standard with the same
/// filename; the user directory is read once when it is the project's own.
pub fn read_installed_standards(layout: &Layout) -> Vec<ParsedStandard> {
    let project_dir = layout.project_standards_dir();
    let user_dir = layout.user_standards_dir();

    let mut standards = read_standards_from_dir(&project_dir);
    if user_dir != project_dir {
        standards.extend(read_standards_from_dir(&user_dir));
    }
    standards
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
