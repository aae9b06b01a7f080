//! Merged run configuration
//!
//! `RunConfig` is built exactly once per invocation from CLI options,
//! environment lookups and the optional settings file, and is never
//! mutated afterwards.

use crate::file::HarnessFile;
use crate::layout::ProjectLayout;
use crate::platform::{default_binary, find_on_path, Platform};
use crate::{ConfigError, ConfigResult};
use std::env;
use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default per-test wall-clock budget
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

/// Default value of Godot's `--quit-after`
pub const DEFAULT_QUIT_AFTER: u32 = 3;

/// Output policy for a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Verbosity {
    /// Hide test output unless the test fails, stop on first failure
    #[default]
    Quiet,
    /// Stream every test's output and run the whole suite
    Verbose,
}

impl Verbosity {
    /// Quiet is the default, so only `--verbose` changes the policy; given
    /// together with `--quiet`, verbose wins
    pub fn from_verbose_flag(verbose: bool) -> Self {
        if verbose {
            Verbosity::Verbose
        } else {
            Verbosity::Quiet
        }
    }

    pub fn is_quiet(self) -> bool {
        self == Verbosity::Quiet
    }
}

/// Values taken from the command line
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Repository root containing `tests/integration`
    pub repo_root: PathBuf,
    pub verbosity: Verbosity,
    /// Single test selector (path fragment or absolute path)
    pub target: Option<String>,
    /// Per-test timeout override
    pub timeout: Option<Duration>,
    /// Skip creating the addon symlink
    pub no_link: bool,
    /// Skip updating the extension registration list
    pub no_register: bool,
}

impl RunOptions {
    pub fn new(repo_root: impl Into<PathBuf>) -> Self {
        Self {
            repo_root: repo_root.into(),
            ..Default::default()
        }
    }
}

/// Environment lookups, captured once so tests can supply their own
#[derive(Debug, Clone, Default)]
pub struct EnvOverrides {
    /// `GODOT`: explicit path to the Godot executable
    pub godot: Option<PathBuf>,
    /// `PATH`: searched for bare executable names
    pub path: Option<OsString>,
}

impl EnvOverrides {
    /// Read overrides from the process environment
    pub fn from_env() -> Self {
        Self {
            godot: env::var_os("GODOT")
                .filter(|v| !v.is_empty())
                .map(PathBuf::from),
            path: env::var_os("PATH"),
        }
    }
}

/// Read-only configuration of a harness run
#[derive(Debug, Clone)]
pub struct RunConfig {
    godot: PathBuf,
    layout: ProjectLayout,
    verbosity: Verbosity,
    target: Option<String>,
    timeout: Duration,
    quit_after: u32,
    benign_patterns: Vec<String>,
    link_addon: bool,
    register_extension: bool,
}

impl RunConfig {
    /// Build the configuration from the real environment and settings file
    pub fn load(options: RunOptions) -> ConfigResult<Self> {
        let layout = ProjectLayout::new(&options.repo_root);
        let file = HarnessFile::load_optional(&layout.settings_file())?;
        Self::build(options, &EnvOverrides::from_env(), Platform::current(), file)
    }

    /// Build the configuration from explicit inputs.
    ///
    /// Fails with [`ConfigError::ExecutableNotFound`] when the selected Godot
    /// binary neither exists nor can be found on `PATH`.
    pub fn build(
        options: RunOptions,
        env: &EnvOverrides,
        platform: Platform,
        file: HarnessFile,
    ) -> ConfigResult<Self> {
        let layout = ProjectLayout::new(options.repo_root);

        let requested = match env.godot.clone().or(file.godot) {
            Some(path) => path,
            None => {
                let default = Path::new(default_binary(platform));
                if default.is_relative() && default.components().count() > 1 {
                    layout.repo_root().join(default)
                } else {
                    default.to_path_buf()
                }
            }
        };
        let godot = resolve_executable(&requested, env.path.as_deref())?;

        let timeout = options
            .timeout
            .or(file.timeout_secs.map(Duration::from_secs))
            .unwrap_or(DEFAULT_TIMEOUT);
        if timeout.is_zero() {
            return Err(ConfigError::InvalidValue {
                field: "timeout".to_string(),
                reason: "timeout must be greater than zero".to_string(),
            });
        }

        Ok(Self {
            godot,
            layout,
            verbosity: options.verbosity,
            target: options.target,
            timeout,
            quit_after: file.quit_after.unwrap_or(DEFAULT_QUIT_AFTER),
            benign_patterns: file.benign_patterns,
            link_addon: !options.no_link && file.link_addon.unwrap_or(true),
            register_extension: !options.no_register && file.register_extension.unwrap_or(true),
        })
    }

    /// Godot executable under test
    pub fn godot(&self) -> &Path {
        &self.godot
    }

    pub fn layout(&self) -> &ProjectLayout {
        &self.layout
    }

    pub fn verbosity(&self) -> Verbosity {
        self.verbosity
    }

    pub fn target(&self) -> Option<&str> {
        self.target.as_deref()
    }

    /// Per-test wall-clock budget
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn quit_after(&self) -> u32 {
        self.quit_after
    }

    /// Benign patterns added on top of the built-in allow-list
    pub fn benign_patterns(&self) -> &[String] {
        &self.benign_patterns
    }

    pub fn link_addon(&self) -> bool {
        self.link_addon
    }

    pub fn register_extension(&self) -> bool {
        self.register_extension
    }
}

fn resolve_executable(requested: &Path, path_var: Option<&OsStr>) -> ConfigResult<PathBuf> {
    if requested.exists() {
        return Ok(requested.to_path_buf());
    }
    find_on_path(requested, path_var)
        .ok_or_else(|| ConfigError::ExecutableNotFound(requested.to_path_buf()))
}
