//! Stagehand Test Harness Configuration
//!
//! Provides the read-only configuration for a harness run:
//! - Directory layout of the integration project (`ProjectLayout`)
//! - Per-platform default location of the Godot executable (`Platform`)
//! - Optional settings file (`stagehand-tests.toml`)
//! - The merged, immutable `RunConfig`
//!
//! # Configuration Hierarchy
//!
//! Values are merged in the following order (later overrides earlier):
//! 1. Built-in defaults
//! 2. Settings file (`<repo_root>/stagehand-tests.toml`)
//! 3. Environment variables (`GODOT`)
//! 4. CLI flags
//!
//! # Example
//!
//! ```no_run
//! use stagehand_config::{RunConfig, RunOptions};
//! use std::path::PathBuf;
//!
//! let options = RunOptions::new(PathBuf::from("."));
//! let config = RunConfig::load(options).unwrap();
//! println!("{}", config.godot().display());
//! ```

pub mod file;
pub mod layout;
pub mod platform;
pub mod run;

use std::path::PathBuf;
use thiserror::Error;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Godot binary not found at '{}'", .0.display())]
    ExecutableNotFound(PathBuf),

    #[error("Failed to read configuration file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Invalid TOML syntax in {file}: {error}")]
    TomlParseError {
        file: PathBuf,
        error: toml::de::Error,
    },

    #[error("Invalid value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, ConfigError>;

// Re-export main types
pub use file::HarnessFile;
pub use layout::ProjectLayout;
pub use platform::{default_binary, find_on_path, Platform};
pub use run::{EnvOverrides, RunConfig, RunOptions, Verbosity};
