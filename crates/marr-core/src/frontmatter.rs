//! Standard frontmatter: decoding and schema validation.
//!
//! Decoding and validation are separate stages. [`decode`] turns the `---`
//! block into an untyped YAML mapping; [`validate`] checks that mapping against
//! the standard schema and reports every violated field at once.

use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value};
use std::fmt;

/// Discriminator value every standard must carry under the `marr` key.
pub const STANDARD_DISCRIMINATOR: &str = "standard";

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Validated metadata header of a standard document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StandardFrontmatter {
    pub marr: String,
    pub version: u64,
    pub title: String,
    pub scope: String,
    /// Natural-language situations in which the standard applies.
    pub triggers: Vec<String>,
}

/// One schema violation, addressed by field path (`triggers.1`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub path: String,
    pub message: String,
}

impl FieldError {
    fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

/// Frontmatter and body of a markdown document.
#[derive(Debug, Clone)]
pub struct Document<'a> {
    pub data: Mapping,
    pub body: &'a str,
}

// ---------------------------------------------------------------------------
// Decoding
// ---------------------------------------------------------------------------

/// Split `content` into its YAML block and the body after the closing `---`.
///
/// Returns `None` when the document does not open with a `---` line.
fn split_frontmatter(content: &str) -> Option<(&str, &str)> {
    let rest = content.strip_prefix("---")?;
    let rest = if let Some(r) = rest.strip_prefix('\n') {
        r
    } else if let Some(r) = rest.strip_prefix("\r\n") {
        r
    } else {
        return None;
    };

    // Closing delimiter may be the very first line (empty frontmatter).
    if let Some(body) = rest.strip_prefix("---") {
        return Some(("", body.strip_prefix('\n').unwrap_or(body)));
    }

    let end = rest.find("\n---")?;
    let yaml = &rest[..end];
    let after = &rest[end + 4..];
    let body = match after.find('\n') {
        Some(nl) => &after[nl + 1..],
        None => "",
    };
    Some((yaml, body))
}

/// Decode the frontmatter of `content` into an untyped mapping.
///
/// A document without frontmatter decodes to an empty mapping and its full
/// text as body. Malformed YAML, or YAML that is not a mapping, is an error.
pub fn decode(content: &str) -> Result<Document<'_>, String> {
    let Some((yaml, body)) = split_frontmatter(content) else {
        return Ok(Document {
            data: Mapping::new(),
            body: content,
        });
    };

    if yaml.trim().is_empty() {
        return Ok(Document {
            data: Mapping::new(),
            body,
        });
    }

    match serde_yaml::from_str::<Value>(yaml) {
        Ok(Value::Mapping(data)) => Ok(Document { data, body }),
        Ok(Value::Null) => Ok(Document {
            data: Mapping::new(),
            body,
        }),
        Ok(_) => Err("frontmatter is not a key/value mapping".to_string()),
        Err(e) => Err(e.to_string()),
    }
}

/// Whether the mapping carries `marr: standard`.
pub fn has_standard_discriminator(data: &Mapping) -> bool {
    matches!(data.get("marr"), Some(Value::String(s)) if s == STANDARD_DISCRIMINATOR)
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn non_empty_string(data: &Mapping, key: &str, errors: &mut Vec<FieldError>) -> Option<String> {
    match data.get(key) {
        None | Some(Value::Null) => {
            errors.push(FieldError::new(key, "required"));
            None
        }
        Some(Value::String(s)) if s.is_empty() => {
            errors.push(FieldError::new(key, "must not be empty"));
            None
        }
        Some(Value::String(s)) => Some(s.clone()),
        Some(_) => {
            errors.push(FieldError::new(key, "expected a string"));
            None
        }
    }
}

fn positive_integer(value: Option<&Value>, errors: &mut Vec<FieldError>) -> Option<u64> {
    let Some(value) = value.filter(|v| !v.is_null()) else {
        errors.push(FieldError::new("version", "required"));
        return None;
    };
    let Value::Number(n) = value else {
        errors.push(FieldError::new("version", "expected a number"));
        return None;
    };
    if let Some(v) = n.as_u64() {
        if v > 0 {
            return Some(v);
        }
    } else if let Some(f) = n.as_f64() {
        if f.fract() != 0.0 {
            errors.push(FieldError::new("version", "expected an integer"));
            return None;
        }
        if f > 0.0 {
            return Some(f as u64);
        }
    }
    errors.push(FieldError::new("version", "must be a positive integer"));
    None
}

fn trigger_list(value: Option<&Value>, errors: &mut Vec<FieldError>) -> Option<Vec<String>> {
    let items = match value {
        None | Some(Value::Null) => {
            errors.push(FieldError::new("triggers", "required"));
            return None;
        }
        Some(Value::Sequence(items)) => items,
        Some(_) => {
            errors.push(FieldError::new("triggers", "expected a list"));
            return None;
        }
    };
    if items.is_empty() {
        errors.push(FieldError::new("triggers", "must contain at least 1 trigger"));
        return None;
    }

    let before = errors.len();
    let mut triggers = Vec::with_capacity(items.len());
    for (i, item) in items.iter().enumerate() {
        match item {
            Value::String(s) if !s.is_empty() => triggers.push(s.clone()),
            Value::String(_) => {
                errors.push(FieldError::new(format!("triggers.{i}"), "must not be empty"))
            }
            _ => errors.push(FieldError::new(format!("triggers.{i}"), "expected a string")),
        }
    }
    (errors.len() == before).then_some(triggers)
}

/// Validate an untyped frontmatter mapping against the standard schema.
///
/// Never panics: every violation is collected and returned together.
pub fn validate(data: &Mapping) -> Result<StandardFrontmatter, Vec<FieldError>> {
    let mut errors = Vec::new();

    if !has_standard_discriminator(data) {
        errors.push(FieldError::new(
            "marr",
            format!("expected literal \"{STANDARD_DISCRIMINATOR}\""),
        ));
    }
    let version = positive_integer(data.get("version"), &mut errors);
    let title = non_empty_string(data, "title", &mut errors);
    let scope = non_empty_string(data, "scope", &mut errors);
    let triggers = trigger_list(data.get("triggers"), &mut errors);

    match (version, title, scope, triggers) {
        (Some(version), Some(title), Some(scope), Some(triggers)) if errors.is_empty() => {
            Ok(StandardFrontmatter {
                marr: STANDARD_DISCRIMINATOR.to_string(),
                version,
                title,
                scope,
                triggers,
            })
        }
        _ => Err(errors),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
