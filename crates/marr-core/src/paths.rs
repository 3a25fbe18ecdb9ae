use crate::error::{MarrError, Result};
use crate::scanner::Scope;
use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// Directory constants
// ---------------------------------------------------------------------------

pub const CLAUDE_DIR: &str = ".claude";
pub const MARR_DIR: &str = ".claude/marr";
pub const STANDARDS_DIR: &str = ".claude/marr/standards";
pub const PROMPTS_DIR: &str = "prompts";
pub const COMMANDS_DIR: &str = "commands";
pub const DOCS_DIR: &str = "docs";

pub const ROOT_CONFIG: &str = "CLAUDE.md";
pub const PROJECT_CONFIG_FILE: &str = ".claude/marr/MARR-PROJECT-CLAUDE.md";
pub const USER_CONFIG_NAME: &str = "MARR-USER-CLAUDE.md";
pub const DETECTION_CONFIG_FILE: &str = ".claude/marr/config.yaml";
pub const CURSOR_RULES: &str = ".cursorrules";
pub const COPILOT_INSTRUCTIONS: &str = ".github/copilot-instructions.md";

/// Import line a user-level `CLAUDE.md` needs to load MARR.
pub const USER_IMPORT: &str = "@~/.claude/marr/MARR-USER-CLAUDE.md";
/// Import line a project-level `CLAUDE.md` needs to load MARR.
pub const PROJECT_IMPORT: &str = "@.claude/marr/MARR-PROJECT-CLAUDE.md";
/// Comment placed above an inserted import line.
pub const IMPORT_COMMENT: &str = "<!-- MARR: Making Agents Really Reliable -->";

// ---------------------------------------------------------------------------
// Layout
// ---------------------------------------------------------------------------

/// The two filesystem roots every scan and resolution works against.
///
/// Passed explicitly instead of looking up `$HOME` deep inside the scanner, so
/// tests can point both roots at temporary directories.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    pub home: PathBuf,
    pub project: PathBuf,
}

impl Layout {
    pub fn new(home: impl Into<PathBuf>, project: impl Into<PathBuf>) -> Self {
        Self {
            home: home.into(),
            project: project.into(),
        }
    }

    /// Build a layout for `project` using the current user's home directory.
    pub fn discover(project: impl Into<PathBuf>) -> Result<Self> {
        let home = home::home_dir().ok_or(MarrError::HomeNotFound)?;
        Ok(Self::new(home, project))
    }

    // -- user scope ---------------------------------------------------------

    /// `~/.claude`
    pub fn claude_root(&self) -> PathBuf {
        self.home.join(CLAUDE_DIR)
    }

    /// `~/.claude/marr`
    pub fn user_marr_dir(&self) -> PathBuf {
        self.claude_root().join("marr")
    }

    pub fn user_standards_dir(&self) -> PathBuf {
        self.user_marr_dir().join("standards")
    }

    pub fn user_root_config(&self) -> PathBuf {
        self.claude_root().join(ROOT_CONFIG)
    }

    pub fn user_system_config(&self) -> PathBuf {
        self.user_marr_dir().join(USER_CONFIG_NAME)
    }

    // -- project scope ------------------------------------------------------

    pub fn project_marr_dir(&self) -> PathBuf {
        self.project.join(MARR_DIR)
    }

    pub fn project_standards_dir(&self) -> PathBuf {
        self.project.join(STANDARDS_DIR)
    }

    pub fn project_system_config(&self) -> PathBuf {
        self.project.join(PROJECT_CONFIG_FILE)
    }

    pub fn detection_config(&self) -> PathBuf {
        self.project.join(DETECTION_CONFIG_FILE)
    }

    /// Root config locations in lookup order: `./CLAUDE.md`, then `./.claude/CLAUDE.md`.
    pub fn project_root_config_candidates(&self) -> [PathBuf; 2] {
        [
            self.project.join(ROOT_CONFIG),
            self.project.join(CLAUDE_DIR).join(ROOT_CONFIG),
        ]
    }

    /// The first project root config that exists, if any.
    pub fn project_root_config(&self) -> Option<PathBuf> {
        self.project_root_config_candidates()
            .into_iter()
            .find(|p| p.exists())
    }

    /// The directory a scope's paths are reported relative to.
    pub fn scope_root(&self, scope: Scope) -> &Path {
        match scope {
            Scope::User => &self.home,
            Scope::Project => &self.project,
        }
    }

    /// Expand a leading `~/` against this layout's home directory.
    pub fn expand_home(&self, path: &str) -> Option<PathBuf> {
        path.strip_prefix("~/").map(|rest| self.home.join(rest))
    }

    /// The import line `path` needs, based on which scope's root config it is.
    pub fn import_for(&self, path: &Path) -> &'static str {
        if path == self.user_root_config() {
            USER_IMPORT
        } else {
            PROJECT_IMPORT
        }
    }
}

/// Whether `path` lies inside a MARR standards directory (`.claude/marr/standards/`).
pub fn is_in_standards_dir(path: &Path) -> bool {
    let components: Vec<_> = path
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    components
        .windows(3)
        .any(|w| w[0] == CLAUDE_DIR && w[1] == "marr" && w[2] == "standards")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
