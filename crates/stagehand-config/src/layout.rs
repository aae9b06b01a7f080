//! Directory layout of the integration test project
//!
//! The Godot project, its tests and its addons folder live at fixed
//! locations beneath the repository root. These paths are defined by the
//! Godot project itself; the harness only reads them.

use crate::platform::Platform;
use std::path::{Path, PathBuf};

/// Extension of a test scene, compared case-insensitively
pub const ARTIFACT_EXTENSION: &str = "tscn";

/// Entry the Godot project must list to load the Stagehand extension
pub const EXTENSION_ENTRY: &str = "res://addons/stagehand/stagehand.gdextension";

/// Prefix every recognized registration entry starts with
pub const ENTRY_PREFIX: &str = "res://";

/// Suffix every recognized registration entry ends with
pub const ENTRY_SUFFIX: &str = ".gdextension";

/// Target of the addon symlink, relative to the addons directory
pub const ADDON_LINK_TARGET: &str = "../../..";

/// Name of the optional settings file at the repository root
pub const SETTINGS_FILE: &str = "stagehand-tests.toml";

/// Paths of the integration project relative to a repository root
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectLayout {
    repo_root: PathBuf,
}

impl ProjectLayout {
    /// Create a layout rooted at `repo_root`
    pub fn new(repo_root: impl Into<PathBuf>) -> Self {
        Self {
            repo_root: repo_root.into(),
        }
    }

    pub fn repo_root(&self) -> &Path {
        &self.repo_root
    }

    /// Godot project directory (`tests/integration`)
    pub fn project_dir(&self) -> PathBuf {
        self.repo_root.join("tests").join("integration")
    }

    /// Root of the discoverable test scenes (`tests/integration/tests`)
    pub fn tests_dir(&self) -> PathBuf {
        self.project_dir().join("tests")
    }

    /// Godot's per-project state directory
    pub fn godot_dir(&self) -> PathBuf {
        self.project_dir().join(".godot")
    }

    /// Registration list of enabled GDExtensions
    pub fn extension_list(&self) -> PathBuf {
        self.godot_dir().join("extension_list.cfg")
    }

    pub fn addons_dir(&self) -> PathBuf {
        self.project_dir().join("addons")
    }

    /// Location of the addon symlink inside the addons directory
    pub fn addon_link(&self) -> PathBuf {
        self.addons_dir().join("stagehand")
    }

    /// Settings file consulted by [`crate::RunConfig::load`]
    pub fn settings_file(&self) -> PathBuf {
        self.repo_root.join(SETTINGS_FILE)
    }

    /// Unit test binary produced by the `unit_tests` build target
    pub fn unit_test_binary(&self, platform: Platform) -> PathBuf {
        let name = match platform {
            Platform::Windows => "stagehand_tests.exe",
            _ => "stagehand_tests",
        };
        self.repo_root
            .join("tests")
            .join("unit")
            .join("build")
            .join(name)
    }
}
