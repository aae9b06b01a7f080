//! Unit command - build the native unit tests and run the test binary

use anyhow::{anyhow, Result};
use colored::*;
use stagehand_config::{Platform, ProjectLayout, Verbosity};
use stagehand_harness::TestReporter;
use std::env;
use std::ffi::OsString;
use std::path::PathBuf;
use std::process::{Command, ExitCode};
use tracing::debug;

/// Arguments for the unit command
#[derive(Debug, Clone)]
pub struct UnitArgs {
    /// Repository root containing the SConstruct
    pub root: PathBuf,
    /// Run the existing binary without building first
    pub skip_build: bool,
    /// Arguments forwarded to the test binary
    pub args: Vec<OsString>,
}

/// Build settings read from the environment
#[derive(Debug, Clone, Default)]
pub struct BuildEnv {
    /// `TARGET`: build target; debug symbols are used when unset
    pub target: Option<String>,
    /// `CXX`: compiler override
    pub cxx: Option<String>,
    /// `SCONS_ARGS`: extra SCons arguments, split with shell quoting rules
    pub scons_args: Option<String>,
}

impl BuildEnv {
    pub fn from_env() -> Self {
        let non_empty = |name: &str| env::var(name).ok().filter(|v| !v.is_empty());
        Self {
            target: non_empty("TARGET"),
            cxx: non_empty("CXX"),
            scons_args: non_empty("SCONS_ARGS"),
        }
    }

    /// Arguments passed to `scons` to build the unit tests.
    ///
    /// Fails when `SCONS_ARGS` cannot be split, e.g. on an unclosed quote.
    pub fn scons_arguments(&self) -> Result<Vec<String>> {
        let mut args = vec!["--quiet".to_string(), "unit_tests".to_string()];

        match &self.target {
            Some(target) => args.push(format!("target={target}")),
            None => {
                args.push("debug_symbols=yes".to_string());
                args.push("optimize=debug".to_string());
            }
        }
        if let Some(cxx) = &self.cxx {
            args.push(format!("CXX={cxx}"));
        }
        if let Some(extra) = &self.scons_args {
            let words = shlex::split(extra)
                .ok_or_else(|| anyhow!("cannot parse SCONS_ARGS: {extra}"))?;
            args.extend(words);
        }
        Ok(args)
    }
}

/// Run the unit command
pub fn run(args: UnitArgs) -> Result<ExitCode> {
    let layout = ProjectLayout::new(std::path::absolute(&args.root)?);
    let mut reporter = TestReporter::stdout(Verbosity::Verbose);

    if !args.skip_build {
        reporter.banner("Building Stagehand unit tests...")?;

        let scons_args = BuildEnv::from_env().scons_arguments()?;
        debug!(?scons_args, "building unit tests");
        let status = match Command::new("scons")
            .args(&scons_args)
            .current_dir(layout.repo_root())
            .status()
        {
            Ok(status) => status,
            Err(e) => {
                eprintln!("{} could not run scons: {}", "Error:".red().bold(), e);
                return Ok(ExitCode::FAILURE);
            }
        };
        if !status.success() {
            return Ok(ExitCode::FAILURE);
        }
    }

    reporter.banner("Running Stagehand unit tests...")?;

    let binary = layout.unit_test_binary(Platform::current());
    if !binary.exists() {
        eprintln!(
            "{} Test binary not found at {}",
            "Error:".red().bold(),
            binary.display()
        );
        return Ok(ExitCode::FAILURE);
    }

    let mut command = Command::new(&binary);
    command.args(&args.args);
    Ok(run_test_binary(command))
}

#[cfg(unix)]
fn run_test_binary(mut command: Command) -> ExitCode {
    use std::os::unix::process::CommandExt;

    // exec only returns on failure
    let error = command.exec();
    eprintln!("{} executing test binary: {}", "Error:".red().bold(), error);
    ExitCode::FAILURE
}

#[cfg(not(unix))]
fn run_test_binary(mut command: Command) -> ExitCode {
    match command.status() {
        Ok(status) => match status.code() {
            Some(code) => ExitCode::from(u8::try_from(code).unwrap_or(1)),
            None => ExitCode::FAILURE,
        },
        Err(e) => {
            eprintln!("{} executing test binary: {}", "Error:".red().bold(), e);
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_default_build_uses_debug_symbols() {
        assert_eq!(
            BuildEnv::default().scons_arguments().unwrap(),
            vec!["--quiet", "unit_tests", "debug_symbols=yes", "optimize=debug"]
        );
    }

    #[test]
    fn test_build_with_target_compiler_and_extra_args() {
        let env = BuildEnv {
            target: Some("template_release".to_string()),
            cxx: Some("clang++".to_string()),
            scons_args: Some(r#"  -j8  use_llvm=yes CCFLAGS="-O2 -g" 'name=a b' "#.to_string()),
        };
        assert_eq!(
            env.scons_arguments().unwrap(),
            vec![
                "--quiet",
                "unit_tests",
                "target=template_release",
                "CXX=clang++",
                "-j8",
                "use_llvm=yes",
                "CCFLAGS=-O2 -g",
                "name=a b",
            ]
        );
    }

    #[test]
    fn test_unbalanced_quote_in_extra_args_is_error() {
        let env = BuildEnv {
            scons_args: Some(r#"CCFLAGS="-O2"#.to_string()),
            ..Default::default()
        };
        let err = env.scons_arguments().unwrap_err();
        assert!(err.to_string().contains("SCONS_ARGS"));
    }
}
