//! Optional settings file (stagehand-tests.toml)
//!
//! Lets a checkout pin harness settings without repeating CLI flags:
//!
//! ```toml
//! timeout_secs = 300
//! quit_after = 3
//! godot = "/opt/godot/godot"
//! benign_patterns = ["Unable to load addon script"]
//! link_addon = false
//! register_extension = true
//! ```

use crate::{ConfigError, ConfigResult};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Contents of `stagehand-tests.toml`; every key is optional
#[derive(Debug, Clone, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct HarnessFile {
    /// Per-test wall-clock budget in seconds
    pub timeout_secs: Option<u64>,

    /// Value passed to Godot's `--quit-after`
    pub quit_after: Option<u32>,

    /// Godot executable, used when `GODOT` is unset
    pub godot: Option<PathBuf>,

    /// Extra error-line substrings to treat as benign
    #[serde(default)]
    pub benign_patterns: Vec<String>,

    pub link_addon: Option<bool>,

    pub register_extension: Option<bool>,
}

impl HarnessFile {
    /// Load and validate a settings file
    pub fn load_from_file(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path)?;

        let file: Self = toml::from_str(&content).map_err(|e| ConfigError::TomlParseError {
            file: path.to_path_buf(),
            error: e,
        })?;

        file.validate()?;
        Ok(file)
    }

    /// Load a settings file, treating a missing file as empty
    pub fn load_optional(path: &Path) -> ConfigResult<Self> {
        match Self::load_from_file(path) {
            Err(ConfigError::IoError(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                Ok(Self::default())
            }
            other => other,
        }
    }

    /// Validate the settings
    pub fn validate(&self) -> ConfigResult<()> {
        if self.timeout_secs == Some(0) {
            return Err(ConfigError::InvalidValue {
                field: "timeout_secs".to_string(),
                reason: "timeout must be at least one second".to_string(),
            });
        }
        if self.quit_after == Some(0) {
            return Err(ConfigError::InvalidValue {
                field: "quit_after".to_string(),
                reason: "quit_after must be at least one frame".to_string(),
            });
        }
        if self.benign_patterns.iter().any(|p| p.trim().is_empty()) {
            return Err(ConfigError::InvalidValue {
                field: "benign_patterns".to_string(),
                reason: "patterns cannot be empty".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_load_full_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("stagehand-tests.toml");
        fs::write(
            &path,
            r#"
timeout_secs = 30
quit_after = 5
godot = "/opt/godot"
benign_patterns = ["Unable to load addon script"]
link_addon = false
"#,
        )
        .unwrap();

        let file = HarnessFile::load_from_file(&path).unwrap();
        assert_eq!(file.timeout_secs, Some(30));
        assert_eq!(file.quit_after, Some(5));
        assert_eq!(file.godot, Some(PathBuf::from("/opt/godot")));
        assert_eq!(file.benign_patterns, vec!["Unable to load addon script"]);
        assert_eq!(file.link_addon, Some(false));
        assert_eq!(file.register_extension, None);
    }

    #[test]
    fn test_missing_file_is_empty() {
        let dir = tempdir().unwrap();
        let file = HarnessFile::load_optional(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(file, HarnessFile::default());
    }

    #[test]
    fn test_unknown_key_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("stagehand-tests.toml");
        fs::write(&path, "parallel = true\n").unwrap();

        let err = HarnessFile::load_optional(&path).unwrap_err();
        assert!(matches!(err, ConfigError::TomlParseError { .. }));
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let file = HarnessFile {
            timeout_secs: Some(0),
            ..Default::default()
        };
        assert!(matches!(
            file.validate(),
            Err(ConfigError::InvalidValue { .. })
        ));
    }
}
