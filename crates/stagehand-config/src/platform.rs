//! Platform detection and executable lookup

use std::ffi::OsStr;
use std::path::{Path, PathBuf};

/// Host platform, as far as locating Godot is concerned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    MacOs,
    Windows,
    /// Linux and every other Unix-like host
    Other,
}

impl Platform {
    /// Platform this binary was compiled for
    pub fn current() -> Self {
        if cfg!(target_os = "macos") {
            Platform::MacOs
        } else if cfg!(windows) {
            Platform::Windows
        } else {
            Platform::Other
        }
    }
}

/// Default Godot executable for a platform when `GODOT` is not set.
///
/// Relative defaults are resolved against the repository root by the caller.
pub fn default_binary(platform: Platform) -> &'static str {
    match platform {
        Platform::MacOs => "/Applications/Godot.app/Contents/MacOS/Godot",
        Platform::Windows => "Godot_console.exe",
        Platform::Other => "./bin/godot",
    }
}

/// Search a `PATH`-style variable for an executable named `name`.
///
/// Names with more than one path component are never searched.
pub fn find_on_path(name: &Path, path_var: Option<&OsStr>) -> Option<PathBuf> {
    if name.components().count() != 1 {
        return None;
    }
    let path_var = path_var?;

    std::env::split_paths(path_var).find_map(|dir| {
        let candidate = dir.join(name);
        if candidate.is_file() {
            return Some(candidate);
        }
        if cfg!(windows) && name.extension().is_none() {
            let with_exe = candidate.with_extension("exe");
            if with_exe.is_file() {
                return Some(with_exe);
            }
        }
        None
    })
}
