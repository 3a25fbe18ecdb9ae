use thiserror::Error;

#[derive(Debug, Error)]
pub enum MarrError {
    #[error("file not found: {0}")]
    FileNotFound(String),

    #[error("home directory not found: set HOME environment variable")]
    HomeNotFound,

    #[error("invalid backup filename '{0}': expected <name>.YYYYMMDD-HHMMSS.bak")]
    InvalidBackupName(String),

    #[error("backup not found: {0}")]
    BackupNotFound(String),

    #[error("cannot remove directive without a line number: {0}")]
    MissingLineNumber(String),

    #[error("line {line} is out of range for {path}")]
    LineOutOfRange { path: String, line: usize },

    #[error("{path} no longer contains the line: {text}")]
    LineChanged { path: String, text: String },

    #[error("could not find '## Standards' section in {0}")]
    StandardsSectionNotFound(String),

    #[error("could not find end of '## Standards' section (---) in {0}")]
    StandardsSectionUnterminated(String),

    #[error("no valid standards to sync in {0}")]
    NoValidStandards(String),

    #[error("standard already exists: {0}")]
    StandardExists(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),
}

pub type Result<T> = std::result::Result<T, MarrError>;
