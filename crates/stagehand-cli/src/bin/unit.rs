use clap::Parser;
use colored::*;
use stagehand_cli::commands::unit::{self, UnitArgs};
use stagehand_cli::logging;
use std::ffi::OsString;
use std::path::PathBuf;
use std::process::ExitCode;

/// Stagehand unit test runner.
///
/// Builds the `unit_tests` SCons target and runs the resulting test binary,
/// forwarding every trailing argument to it.
///
/// EXAMPLES:
///     stagehand-unit-tests                           Build and run all unit tests
///     stagehand-unit-tests -- --gtest_filter=Prefab* Forward a filter
///     stagehand-unit-tests --skip-build              Run the last build
///
/// ENVIRONMENT VARIABLES:
///     TARGET      SCons build target (default: debug build)
///     CXX         Compiler override
///     SCONS_ARGS  Extra arguments for SCons
#[derive(Parser)]
#[command(name = "stagehand-unit-tests")]
#[command(version)]
struct Cli {
    /// Repository root containing the SConstruct
    #[arg(long, env = "STAGEHAND_ROOT", default_value = ".")]
    root: PathBuf,
    /// Run the existing test binary without building
    #[arg(long)]
    skip_build: bool,
    /// Arguments forwarded to the test binary
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    args: Vec<OsString>,
}

fn main() -> ExitCode {
    logging::init();
    let cli = Cli::parse();

    let args = UnitArgs {
        root: cli.root,
        skip_build: cli.skip_build,
        args: cli.args,
    };

    match unit::run(args) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{} {:#}", "Error:".red().bold(), e);
            ExitCode::FAILURE
        }
    }
}
