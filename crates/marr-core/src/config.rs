use crate::error::Result;
use crate::paths::Layout;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// ConfigWarning / WarnLevel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigWarning {
    pub level: WarnLevel,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarnLevel {
    Warning,
    Error,
}

// ---------------------------------------------------------------------------
// DetectionConfig
// ---------------------------------------------------------------------------

/// Tuning knobs for conflict detection and backup retention.
///
/// Read from `.claude/marr/config.yaml`; every field is optional and a
/// missing file yields the defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionConfig {
    /// Shared keywords required before a file and a directive are compared.
    #[serde(default = "default_min_overlap")]
    pub min_keyword_overlap: usize,
    /// Fraction of a standard's keywords a file must share to count as a duplicate.
    #[serde(default = "default_min_similarity")]
    pub min_similarity: f64,
    /// Backups kept per file after `doctor` finishes.
    #[serde(default = "default_backup_keep")]
    pub backup_keep: usize,
}

fn default_min_overlap() -> usize {
    2
}

fn default_min_similarity() -> f64 {
    0.3
}

fn default_backup_keep() -> usize {
    5
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            min_keyword_overlap: default_min_overlap(),
            min_similarity: default_min_similarity(),
            backup_keep: default_backup_keep(),
        }
    }
}

impl DetectionConfig {
    pub fn load(layout: &Layout) -> Result<Self> {
        let path = layout.detection_config();
        if !path.exists() {
            return Ok(Self::default());
        }
        let data = std::fs::read_to_string(&path)?;
        if data.trim().is_empty() {
            return Ok(Self::default());
        }
        let cfg: DetectionConfig = serde_yaml::from_str(&data)?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();

        if self.min_keyword_overlap == 0 {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: "min_keyword_overlap=0 compares every file against every directive"
                    .to_string(),
            });
        }

        if !(0.0..=1.0).contains(&self.min_similarity) {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: format!(
                    "min_similarity={} must be between 0.0 and 1.0",
                    self.min_similarity
                ),
            });
        }

        if self.backup_keep == 0 {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: "backup_keep=0 deletes every backup after doctor runs".to_string(),
            });
        }

        warnings
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = TempDir::new().unwrap();
        let layout = Layout::new(dir.path(), dir.path());
        let cfg = DetectionConfig::load(&layout).unwrap();
        assert_eq!(cfg, DetectionConfig::default());
        assert_eq!(cfg.min_keyword_overlap, 2);
        assert_eq!(cfg.backup_keep, 5);
    }

    #[test]
    fn partial_file_fills_defaults() {
        let dir = TempDir::new().unwrap();
        let layout = Layout::new(dir.path(), dir.path());
        std::fs::create_dir_all(layout.project_marr_dir()).unwrap();
        std::fs::write(layout.detection_config(), "min_similarity: 0.5\n").unwrap();

        let cfg = DetectionConfig::load(&layout).unwrap();
        assert_eq!(cfg.min_similarity, 0.5);
        assert_eq!(cfg.min_keyword_overlap, 2);
    }

    #[test]
    fn defaults_have_no_warnings() {
        assert!(DetectionConfig::default().validate().is_empty());
    }

    #[test]
    fn out_of_range_similarity_is_error() {
        let cfg = DetectionConfig {
            min_similarity: 1.5,
            ..DetectionConfig::default()
        };
        let warnings = cfg.validate();
        assert!(warnings
            .iter()
            .any(|w| w.level == WarnLevel::Error && w.message.contains("min_similarity")));
    }
}
