//! Environment preparation for the integration project
//!
//! Two independent side effects, each optional:
//! - the extension registration list (`.godot/extension_list.cfg`) is
//!   made to contain the Stagehand entry; this change is kept after the run
//! - the addon symlink is created if nothing occupies its path, and
//!   removed again when the [`EnvironmentGuard`] is dropped, or earlier
//!   through a shared [`LinkTeardown`] handle

use crate::error::{HarnessError, HarnessResult};
use stagehand_config::layout::{
    ADDON_LINK_TARGET, ENTRY_PREFIX, ENTRY_SUFFIX, EXTENSION_ENTRY,
};
use stagehand_config::RunConfig;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, warn};

/// Ensure `entry` is listed in the registration list at `list_path`.
///
/// Recognized entries already present are kept in order, everything else is
/// dropped. The file is only written when its content changes, always with
/// `\n` line endings and a single trailing newline. Returns whether the file
/// was rewritten.
pub fn register_extension(list_path: &Path, entry: &str) -> HarnessResult<bool> {
    let existing = match fs::read_to_string(list_path) {
        Ok(content) => content,
        Err(e) if e.kind() == io::ErrorKind::NotFound => String::new(),
        Err(e) => return Err(HarnessError::io(list_path, e)),
    };

    let desired = merged_registration(&existing, entry);
    if existing == desired {
        debug!(path = %list_path.display(), "extension list already up to date");
        return Ok(false);
    }

    if let Some(parent) = list_path.parent() {
        fs::create_dir_all(parent).map_err(|e| HarnessError::io(parent, e))?;
    }
    fs::write(list_path, desired).map_err(|e| HarnessError::io(list_path, e))?;
    debug!(path = %list_path.display(), entry, "extension list updated");
    Ok(true)
}

fn merged_registration(existing: &str, entry: &str) -> String {
    let mut entries: Vec<&str> = existing
        .lines()
        .map(str::trim)
        .filter(|line| line.starts_with(ENTRY_PREFIX) && line.ends_with(ENTRY_SUFFIX))
        .collect();
    if !entries.contains(&entry) {
        entries.push(entry);
    }
    let mut content = entries.join("\n");
    content.push('\n');
    content
}

/// Removal of the symlink created by this run, shareable across threads.
///
/// Armed with the link path once the link exists. Whichever holder runs it
/// first removes the link; later calls do nothing.
#[derive(Debug, Clone, Default)]
pub struct LinkTeardown(Arc<Mutex<Option<PathBuf>>>);

impl LinkTeardown {
    pub fn new() -> Self {
        Self::default()
    }

    fn arm(&self, link: PathBuf) {
        *self.0.lock().unwrap_or_else(PoisonError::into_inner) = Some(link);
    }

    /// Whether a created link is still waiting to be removed
    pub fn is_armed(&self) -> bool {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).is_some()
    }

    /// Remove the link if it is still pending
    pub fn run(&self) {
        let pending = self.0.lock().unwrap_or_else(PoisonError::into_inner).take();
        let Some(link) = pending else {
            return;
        };
        match remove_symlink(&link) {
            Ok(()) => debug!(link = %link.display(), "removed addon symlink"),
            Err(e) => debug!(link = %link.display(), error = %e, "failed to remove addon symlink"),
        }
    }
}

/// Scoped ownership of the addon symlink.
///
/// The link is created on construction only when its path is free, and
/// removed on drop only when this guard created it. Setup problems are
/// collected as warnings instead of failing the run.
#[derive(Debug)]
pub struct EnvironmentGuard {
    link: PathBuf,
    teardown: LinkTeardown,
    warnings: Vec<String>,
}

impl EnvironmentGuard {
    /// Apply every preparation step enabled in `config`.
    ///
    /// A created link is registered with `teardown`, so it can be removed
    /// from outside the guard, for example by an interrupt handler.
    pub fn prepare(config: &RunConfig, teardown: LinkTeardown) -> Self {
        let layout = config.layout();
        let mut warnings = Vec::new();

        if config.register_extension() {
            if let Err(e) = register_extension(&layout.extension_list(), EXTENSION_ENTRY) {
                warn!(error = %e, "could not update extension list");
                warnings.push(format!("Could not update extension list: {e}"));
            }
        }

        let mut guard = if config.link_addon() {
            Self::provision(layout.addon_link(), Path::new(ADDON_LINK_TARGET), teardown)
        } else {
            Self::inactive(layout.addon_link(), teardown)
        };
        warnings.append(&mut guard.warnings);
        guard.warnings = warnings;
        guard
    }

    /// Create the parent directory of `link` and a symlink to `target`,
    /// unless something already occupies `link`.
    pub fn provision(link: PathBuf, target: &Path, teardown: LinkTeardown) -> Self {
        let mut guard = Self::inactive(link, teardown);

        // symlink_metadata also sees links whose target is missing
        if fs::symlink_metadata(&guard.link).is_ok() {
            debug!(link = %guard.link.display(), "addon path already occupied, leaving it alone");
            return guard;
        }

        if let Some(parent) = guard.link.parent() {
            if let Err(e) = fs::create_dir_all(parent) {
                warn!(dir = %parent.display(), error = %e, "could not create addons directory");
                guard.warnings.push(format!(
                    "Could not create directory {}: {e}",
                    parent.display()
                ));
                return guard;
            }
        }

        match create_symlink(target, &guard.link) {
            Ok(()) => {
                debug!(link = %guard.link.display(), target = %target.display(), "created addon symlink");
                guard.teardown.arm(guard.link.clone());
            }
            Err(e) => {
                warn!(link = %guard.link.display(), error = %e, "could not create addon symlink");
                guard.warnings.push(format!(
                    "Could not create symlink {} -> {}: {e}",
                    guard.link.display(),
                    target.display()
                ));
            }
        }
        guard
    }

    fn inactive(link: PathBuf, teardown: LinkTeardown) -> Self {
        Self {
            link,
            teardown,
            warnings: Vec::new(),
        }
    }

    /// Whether this guard created the link and will remove it
    pub fn created_link(&self) -> bool {
        self.teardown.is_armed()
    }

    /// Non-fatal problems met while preparing
    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }
}

impl Drop for EnvironmentGuard {
    fn drop(&mut self) {
        self.teardown.run();
    }
}

#[cfg(unix)]
fn create_symlink(target: &Path, link: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(target, link)
}

#[cfg(windows)]
fn create_symlink(target: &Path, link: &Path) -> io::Result<()> {
    std::os::windows::fs::symlink_dir(target, link)
}

#[cfg(not(any(unix, windows)))]
fn create_symlink(_target: &Path, _link: &Path) -> io::Result<()> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        "symlinks are unsupported on this platform",
    ))
}

fn remove_symlink(link: &Path) -> io::Result<()> {
    // Directory symlinks on Windows must be removed as directories
    fs::remove_file(link).or_else(|e| {
        if cfg!(windows) {
            fs::remove_dir(link)
        } else {
            Err(e)
        }
    })
}
