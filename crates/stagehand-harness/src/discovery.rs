//! Test discovery - find test scenes under the tests root

use stagehand_config::layout::ARTIFACT_EXTENSION;
use std::cmp::Ordering;
use std::ffi::OsStr;
use std::path::{Component, Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

/// A discovered test scene
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestArtifact {
    /// Absolute path of the scene file
    path: PathBuf,
    /// Path relative to the tests root, or the raw path outside it
    name: String,
}

impl TestArtifact {
    /// Create an artifact, naming it relative to `tests_root` when possible
    pub fn new(path: impl Into<PathBuf>, tests_root: &Path) -> Self {
        let path = path.into();
        let name = match path.strip_prefix(tests_root) {
            Ok(relative) if !relative.as_os_str().is_empty() => relative.display().to_string(),
            _ => path.display().to_string(),
        };
        Self { path, name }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Display name used in progress lines
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Discover all test scenes beneath `root`, in deterministic order.
///
/// A missing root yields an empty list.
pub fn discover(root: &Path) -> Vec<TestArtifact> {
    if !root.is_dir() {
        debug!(root = %root.display(), "tests root does not exist");
        return Vec::new();
    }

    let mut artifacts: Vec<TestArtifact> = WalkDir::new(root)
        .follow_links(true)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file() && is_test_scene(entry.path()))
        .map(|entry| TestArtifact::new(entry.into_path(), root))
        .collect();

    sort_artifacts(&mut artifacts);
    debug!(count = artifacts.len(), root = %root.display(), "discovered test scenes");
    artifacts
}

/// Order artifacts by (directory components, file name).
///
/// Comparing decomposed components instead of raw strings keeps the order
/// independent of the platform's path separator.
pub fn sort_artifacts(artifacts: &mut [TestArtifact]) {
    artifacts.sort_by(|a, b| compare_paths(&a.path, &b.path));
}

fn compare_paths(a: &Path, b: &Path) -> Ordering {
    let (a_dirs, a_file) = split_key(a);
    let (b_dirs, b_file) = split_key(b);
    a_dirs.cmp(&b_dirs).then_with(|| a_file.cmp(&b_file))
}

fn split_key(path: &Path) -> (Vec<&OsStr>, Option<&OsStr>) {
    let dirs = path
        .parent()
        .map(|parent| {
            parent
                .components()
                .filter_map(|c| match c {
                    Component::Normal(part) => Some(part),
                    _ => None,
                })
                .collect()
        })
        .unwrap_or_default();
    (dirs, path.file_name())
}

fn is_test_scene(path: &Path) -> bool {
    path.extension()
        .and_then(OsStr::to_str)
        .is_some_and(|ext| ext.eq_ignore_ascii_case(ARTIFACT_EXTENSION))
}
