pub mod backup;
pub mod doctor;
pub mod standard;
pub mod validate;

// ---------------------------------------------------------------------------
// Exit: a non-zero exit after the command has already printed its results
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub enum Exit {
    /// Validation found errors, or warnings in strict mode.
    ValidationFailed,
    /// One or more standards have invalid frontmatter.
    InvalidStandards { invalid: usize, total: usize },
}

impl Exit {
    pub fn code(&self) -> i32 {
        match self {
            Exit::ValidationFailed | Exit::InvalidStandards { .. } => 1,
        }
    }
}

impl std::fmt::Display for Exit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Exit::ValidationFailed => write!(f, "validation failed"),
            Exit::InvalidStandards { invalid, total } => {
                write!(f, "{invalid} of {total} standard(s) invalid")
            }
        }
    }
}

impl std::error::Error for Exit {}
