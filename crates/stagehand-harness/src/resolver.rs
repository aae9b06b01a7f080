//! Target resolution - map a user-supplied selector to test scenes
//!
//! Resolution order, first match wins:
//! 1. the selector as given (absolute, or relative to the process)
//! 2. the selector relative to the tests root
//! 3. the selector relative to the caller's working directory
//! 4. nothing matched: fall back to every discovered scene
//!
//! Step 1 bypasses discovery entirely.

use crate::discovery::{discover, TestArtifact};
use std::path::Path;
use tracing::{debug, warn};

/// How the selection was made
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedBy {
    /// No selector was supplied
    AllTests,
    /// Selector named an existing file directly
    Direct,
    /// Selector was relative to the tests root
    TestsRoot,
    /// Selector was relative to the working directory
    WorkingDir,
    /// Selector matched nothing; running every discovered scene
    NotFound(String),
}

/// Scenes selected for a run
#[derive(Debug, Clone)]
pub struct Resolution {
    pub artifacts: Vec<TestArtifact>,
    pub resolved_by: ResolvedBy,
}

/// Resolve `target` into the scenes to run.
///
/// `cwd` is the directory relative selectors are interpreted against in
/// step 3; `tests_root` is both the discovery root and the base of step 2.
pub fn resolve(target: Option<&str>, tests_root: &Path, cwd: &Path) -> Resolution {
    let Some(target) = target else {
        return Resolution {
            artifacts: discover(tests_root),
            resolved_by: ResolvedBy::AllTests,
        };
    };

    let direct = Path::new(target);
    let found = if direct.is_file() {
        let absolute = std::path::absolute(direct).unwrap_or_else(|_| direct.to_path_buf());
        Some((absolute, ResolvedBy::Direct))
    } else {
        [
            (tests_root.join(target), ResolvedBy::TestsRoot),
            (cwd.join(target), ResolvedBy::WorkingDir),
        ]
        .into_iter()
        .find(|(candidate, _)| candidate.is_file())
    };

    if let Some((path, resolved_by)) = found {
        debug!(target, path = %path.display(), ?resolved_by, "resolved test target");
        return Resolution {
            artifacts: vec![TestArtifact::new(path, tests_root)],
            resolved_by,
        };
    }

    warn!(target, "test target not found, running all tests");
    Resolution {
        artifacts: discover(tests_root),
        resolved_by: ResolvedBy::NotFound(target.to_string()),
    }
}
