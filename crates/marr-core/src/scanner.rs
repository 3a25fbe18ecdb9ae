//! Discovery and classification of assistant configuration files.
//!
//! Each scope has a fixed set of candidate locations. Files found there are
//! classified by filename; files with no recognised name are kept only when
//! they are markdown whose content reads like a standard.

use crate::io::{list_files, read_optional};
use crate::paths::{self, is_in_standards_dir, Layout};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConfigFileType {
    /// `CLAUDE.md`
    PrimaryAssistantConfig,
    /// `MARR-*-CLAUDE.md`
    StandardSystemRootConfig,
    /// `prj-*-standard.md`
    StandardDocument,
    /// `.cursorrules`
    CustomRuleFile,
    /// `copilot-instructions.md`
    CustomInstructionsFile,
    /// `*prompt.md`, `*instructions.md`
    GenericAiPrompt,
    /// `*rules`, `*guidelines.md`, `*standards.md`, `*conventions.md`, or any
    /// markdown whose content looks like a standard.
    #[serde(rename = "custom-standard-like-document")]
    CustomStandardLike,
    Unknown,
}

impl ConfigFileType {
    pub fn as_str(self) -> &'static str {
        match self {
            ConfigFileType::PrimaryAssistantConfig => "primary-assistant-config",
            ConfigFileType::StandardSystemRootConfig => "standard-system-root-config",
            ConfigFileType::StandardDocument => "standard-document",
            ConfigFileType::CustomRuleFile => "custom-rule-file",
            ConfigFileType::CustomInstructionsFile => "custom-instructions-file",
            ConfigFileType::GenericAiPrompt => "generic-ai-prompt",
            ConfigFileType::CustomStandardLike => "custom-standard-like-document",
            ConfigFileType::Unknown => "unknown",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    User,
    Project,
}

impl Scope {
    pub fn as_str(self) -> &'static str {
        match self {
            Scope::User => "user",
            Scope::Project => "project",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Scope::User => "User",
            Scope::Project => "Project",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigFile {
    pub path: PathBuf,
    pub filename: String,
    #[serde(rename = "type")]
    pub kind: ConfigFileType,
    pub scope: Scope,
    #[serde(skip)]
    pub content: String,
    /// Raw `@path.md` references, as written.
    pub imports: Vec<String>,
}

impl ConfigFile {
    /// The standard system's own files: its root configs and its standards.
    pub fn is_system_owned(&self) -> bool {
        matches!(
            self.kind,
            ConfigFileType::StandardSystemRootConfig | ConfigFileType::StandardDocument
        ) || is_in_standards_dir(&self.path)
    }

    /// Whether the file plausibly defines its own rules and should be compared
    /// against installed standards.
    pub fn is_custom_standard(&self) -> bool {
        if self.is_system_owned() {
            return false;
        }
        match self.kind {
            ConfigFileType::CustomStandardLike
            | ConfigFileType::CustomRuleFile
            | ConfigFileType::CustomInstructionsFile => true,
            ConfigFileType::GenericAiPrompt => looks_like_standard(&self.content),
            _ => false,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ScanResult {
    pub user_files: Vec<ConfigFile>,
    pub project_files: Vec<ConfigFile>,
}

impl ScanResult {
    /// User files followed by project files.
    pub fn files(&self) -> impl Iterator<Item = &ConfigFile> {
        self.user_files.iter().chain(self.project_files.iter())
    }

    pub fn custom_standards(&self) -> impl Iterator<Item = &ConfigFile> {
        self.files().filter(|f| f.is_custom_standard())
    }
}

// ---------------------------------------------------------------------------
// Classification
// ---------------------------------------------------------------------------

fn patterns() -> &'static [(Regex, ConfigFileType)] {
    static PATTERNS: OnceLock<Vec<(Regex, ConfigFileType)>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        use ConfigFileType::*;
        [
            (r"^CLAUDE\.md$", PrimaryAssistantConfig),
            (r"^MARR-.*-CLAUDE\.md$", StandardSystemRootConfig),
            (r"^prj-.*-standard\.md$", StandardDocument),
            (r"^\.cursorrules$", CustomRuleFile),
            (r"^copilot-instructions\.md$", CustomInstructionsFile),
            (r"\.?rules$", CustomStandardLike),
            (r"prompts?\.md$", GenericAiPrompt),
            (r"instructions?\.md$", GenericAiPrompt),
            (r"guidelines?\.md$", CustomStandardLike),
            (r"standards?\.md$", CustomStandardLike),
            (r"conventions?\.md$", CustomStandardLike),
        ]
        .into_iter()
        .map(|(p, kind)| {
            let re = Regex::new(&format!("(?i){p}")).expect("static regex");
            (re, kind)
        })
        .collect()
    })
}

/// Classify a file by its name alone. First matching pattern wins.
pub fn classify(filename: &str) -> ConfigFileType {
    patterns()
        .iter()
        .find(|(re, _)| re.is_match(filename))
        .map(|(_, kind)| *kind)
        .unwrap_or(ConfigFileType::Unknown)
}

const STANDARD_INDICATORS: &[&str] = &[
    "core rules",
    "anti-patterns",
    "never violate",
    "must follow",
    "always ",
    "never ",
    "forbidden",
    "required",
    "standards",
    "guidelines",
    "conventions",
];

/// Content contains at least three standard indicator phrases.
pub fn looks_like_standard(content: &str) -> bool {
    let lower = content.to_lowercase();
    STANDARD_INDICATORS
        .iter()
        .filter(|i| lower.contains(*i))
        .count()
        >= 3
}

fn import_re() -> &'static Regex {
    static R: OnceLock<Regex> = OnceLock::new();
    R.get_or_init(|| Regex::new(r"(?m)^@(\S+\.md)\s*$").expect("static regex"))
}

/// `@path.md` references standing alone on their own line.
pub fn extract_imports(content: &str) -> Vec<String> {
    import_re()
        .captures_iter(content)
        .map(|c| c[1].to_string())
        .collect()
}

// ---------------------------------------------------------------------------
// Scanning
// ---------------------------------------------------------------------------

/// Read and classify one file. `None` when the file is absent, unreadable or
/// neither recognised by name nor standard-like markdown.
pub fn scan_file(path: &Path, scope: Scope) -> Option<ConfigFile> {
    if !path.is_file() {
        return None;
    }
    let filename = crate::standard::file_name(path);
    let mut kind = classify(&filename);

    if kind == ConfigFileType::Unknown && !filename.ends_with(".md") {
        return None;
    }

    let content = read_optional(path)?;
    if kind == ConfigFileType::Unknown {
        if !looks_like_standard(&content) {
            return None;
        }
        kind = ConfigFileType::CustomStandardLike;
    }
    tracing::trace!(path = %path.display(), kind = kind.as_str(), "classified");

    Some(ConfigFile {
        path: path.to_path_buf(),
        filename,
        kind,
        scope,
        imports: extract_imports(&content),
        content,
    })
}

fn scan_directory(dir: &Path, scope: Scope, recursive: bool) -> Vec<ConfigFile> {
    list_files(dir, recursive)
        .into_iter()
        .filter(|p| !is_in_standards_dir(p))
        .filter_map(|p| scan_file(&p, scope))
        .collect()
}

/// `~/.claude/CLAUDE.md`, the user system config, and `~/.claude/{prompts,commands}/**`.
pub fn scan_user_config(layout: &Layout) -> Vec<ConfigFile> {
    let root = layout.claude_root();
    let mut files = Vec::new();

    files.extend(scan_file(&layout.user_root_config(), Scope::User));
    files.extend(scan_file(&layout.user_system_config(), Scope::User));
    files.extend(scan_directory(&root.join(paths::PROMPTS_DIR), Scope::User, true));
    files.extend(scan_directory(&root.join(paths::COMMANDS_DIR), Scope::User, true));

    tracing::debug!(count = files.len(), "scanned user config");
    files
}

/// Both root config locations, the project system config, `.claude/{prompts,commands}/**`,
/// `.cursorrules`, the copilot instructions file and standard-like files directly in `docs/`.
pub fn scan_project_config(layout: &Layout) -> Vec<ConfigFile> {
    let claude = layout.project.join(paths::CLAUDE_DIR);
    let mut files = Vec::new();

    for candidate in layout.project_root_config_candidates() {
        files.extend(scan_file(&candidate, Scope::Project));
    }
    files.extend(scan_file(&layout.project_system_config(), Scope::Project));
    files.extend(scan_directory(&claude.join(paths::PROMPTS_DIR), Scope::Project, true));
    files.extend(scan_directory(&claude.join(paths::COMMANDS_DIR), Scope::Project, true));
    files.extend(scan_file(&layout.project.join(paths::CURSOR_RULES), Scope::Project));
    files.extend(scan_file(
        &layout.project.join(paths::COPILOT_INSTRUCTIONS),
        Scope::Project,
    ));
    files.extend(
        scan_directory(&layout.project.join(paths::DOCS_DIR), Scope::Project, false)
            .into_iter()
            .filter(|f| f.kind == ConfigFileType::CustomStandardLike),
    );

    tracing::debug!(count = files.len(), "scanned project config");
    files
}

pub fn scan_all_configs(layout: &Layout) -> ScanResult {
    ScanResult {
        user_files: scan_user_config(layout),
        project_files: scan_project_config(layout),
    }
}

/// Resolve an import reference: `~/` against home, absolute as-is, otherwise
/// relative to the importing file's directory. `.` and `..` are folded away so
/// the same file always resolves to the same path.
pub fn resolve_import(import: &str, from: &Path, layout: &Layout) -> PathBuf {
    if let Some(expanded) = layout.expand_home(import) {
        return normalize(&expanded);
    }
    let path = Path::new(import);
    if path.is_absolute() {
        return normalize(path);
    }
    normalize(&from.parent().unwrap_or(Path::new(".")).join(path))
}

fn normalize(path: &Path) -> PathBuf {
    use std::path::Component;
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Every file reachable through `file`'s imports, depth first.
///
/// `visited` persists across the whole walk, so each resolved path is scanned
/// at most once and import cycles terminate. Unresolvable targets are skipped.
pub fn transitive_imports(
    file: &ConfigFile,
    layout: &Layout,
    visited: &mut HashSet<PathBuf>,
) -> Vec<ConfigFile> {
    let mut found = Vec::new();
    for import in &file.imports {
        let resolved = resolve_import(import, &file.path, layout);
        if !visited.insert(resolved.clone()) {
            continue;
        }
        let Some(imported) = scan_file(&resolved, file.scope) else {
            tracing::debug!(import = %import, "import target not found");
            continue;
        };
        let nested = transitive_imports(&imported, layout, visited);
        found.push(imported);
        found.extend(nested);
    }
    found
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
