//! Integration command - run the Godot integration test scenes

use anyhow::{Context, Result};
use colored::*;
use stagehand_config::{ConfigError, RunConfig, RunOptions, Verbosity};
use stagehand_harness::{
    resolve, CancelFlag, EnvironmentGuard, HarnessError, LinkTeardown, ResolvedBy, TestReporter,
    TestRunner,
};
use std::env;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use crate::interrupt::INTERRUPTED_EXIT_CODE;

/// Arguments for the integration command
#[derive(Debug, Clone)]
pub struct IntegrationArgs {
    /// Single scene to run (path, or path relative to the tests root)
    pub target: Option<String>,
    /// Show output of every test instead of the quiet default
    pub verbose: bool,
    /// Repository root containing `tests/integration`
    pub root: PathBuf,
    /// Per-test timeout in seconds
    pub timeout: Option<u64>,
    /// Do not create the addon symlink
    pub no_link: bool,
    /// Do not touch the extension registration list
    pub no_register: bool,
    /// Disable colored output
    pub no_color: bool,
}

impl Default for IntegrationArgs {
    fn default() -> Self {
        Self {
            target: None,
            verbose: false,
            root: PathBuf::from("."),
            timeout: None,
            no_link: false,
            no_register: false,
            no_color: false,
        }
    }
}

impl IntegrationArgs {
    fn run_options(&self) -> Result<RunOptions> {
        let root = std::path::absolute(&self.root)
            .with_context(|| format!("invalid root directory '{}'", self.root.display()))?;
        Ok(RunOptions {
            repo_root: root,
            verbosity: Verbosity::from_verbose_flag(self.verbose),
            target: self.target.clone(),
            timeout: self.timeout.map(Duration::from_secs),
            no_link: self.no_link,
            no_register: self.no_register,
        })
    }
}

/// Run the integration command.
///
/// `teardown` receives the addon symlink created by this run so an
/// interrupt handler can remove it.
pub fn run(args: IntegrationArgs, cancel: CancelFlag, teardown: LinkTeardown) -> Result<ExitCode> {
    if args.no_color {
        colored::control::set_override(false);
    }

    let config = match RunConfig::load(args.run_options()?) {
        Ok(config) => config,
        Err(e @ ConfigError::ExecutableNotFound(_)) => {
            eprintln!("{} {}", "Error:".red().bold(), e);
            return Ok(ExitCode::FAILURE);
        }
        Err(e) => return Err(e).context("invalid harness configuration"),
    };

    let mut reporter = TestReporter::stdout(config.verbosity());

    let guard = EnvironmentGuard::prepare(&config, teardown);
    for warning in guard.warnings() {
        reporter.warning(warning)?;
    }

    reporter.banner("Running Stagehand integration tests...")?;

    let cwd = env::current_dir().context("cannot determine current directory")?;
    let resolution = resolve(config.target(), &config.layout().tests_dir(), &cwd);
    if let ResolvedBy::NotFound(target) = &resolution.resolved_by {
        reporter.target_not_found(target)?;
    }

    let runner = TestRunner::from_config(&config, cancel);
    let exit = match runner.run(&resolution.artifacts, &mut reporter) {
        Ok(summary) => {
            reporter.summary(&summary)?;
            ExitCode::from(summary.exit_code())
        }
        Err(HarnessError::Interrupted) => {
            println!();
            eprintln!("{}", "Interrupted".yellow().bold());
            ExitCode::from(INTERRUPTED_EXIT_CODE)
        }
        Err(e @ (HarnessError::ExecutableNotFound(_) | HarnessError::Spawn { .. })) => {
            println!();
            eprintln!("{} {}", "Error:".red().bold(), e);
            ExitCode::FAILURE
        }
        Err(e) => return Err(e.into()),
    };

    drop(guard);
    Ok(exit)
}
