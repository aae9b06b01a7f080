use clap::Parser;
use colored::*;
use stagehand_cli::commands::integration::{self, IntegrationArgs};
use stagehand_cli::{interrupt, logging};
use stagehand_harness::{CancelFlag, LinkTeardown};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::debug;

/// Stagehand integration test runner.
///
/// Runs every Godot test scene under tests/integration/tests in a headless
/// Godot process and reports which scenes passed. Quiet mode (the default)
/// hides each scene's log unless it fails, then stops. Verbose mode shows
/// every log and runs all scenes.
///
/// EXAMPLES:
///     stagehand-integration-tests                    Run all scenes
///     stagehand-integration-tests -v                 Show Godot output
///     stagehand-integration-tests ecs/world.tscn     Run a single scene
///
/// ENVIRONMENT VARIABLES:
///     GODOT           Path to the Godot executable (default: ./bin/godot
///                     under --root, or the platform's standard install)
///     STAGEHAND_ROOT  Repository root (default: current directory)
///     NO_COLOR        Disable colored output
///     RUST_LOG        Diagnostic log filter (default: warn)
#[derive(Parser)]
#[command(name = "stagehand-integration-tests")]
#[command(version)]
struct Cli {
    /// Scene file to run instead of the whole suite
    target: Option<String>,
    /// Suppress test output unless a test fails (default)
    #[arg(long, short = 'q')]
    quiet: bool,
    /// Show the output of every test; overrides --quiet
    #[arg(long, short = 'v')]
    verbose: bool,
    /// Repository root containing tests/integration; the default Godot
    /// path ./bin/godot is resolved against it, not the current directory
    #[arg(long, env = "STAGEHAND_ROOT", default_value = ".")]
    root: PathBuf,
    /// Per-test timeout in seconds
    #[arg(long, value_name = "SECS")]
    timeout: Option<u64>,
    /// Do not create the addons/stagehand symlink
    #[arg(long)]
    no_link: bool,
    /// Do not update .godot/extension_list.cfg
    #[arg(long)]
    no_register: bool,
    /// Disable colored output
    #[arg(long, env = "NO_COLOR")]
    no_color: bool,
}

fn main() -> ExitCode {
    logging::init();
    let cli = Cli::parse();

    if cli.quiet && cli.verbose {
        debug!("both --quiet and --verbose given, verbose wins");
    }

    let cancel = CancelFlag::new();
    let teardown = LinkTeardown::new();
    interrupt::install(cancel.clone(), teardown.clone());

    let args = IntegrationArgs {
        target: cli.target,
        verbose: cli.verbose,
        root: cli.root,
        timeout: cli.timeout,
        no_link: cli.no_link,
        no_register: cli.no_register,
        no_color: cli.no_color,
    };

    match integration::run(args, cancel, teardown) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{} {:#}", "Error:".red().bold(), e);
            ExitCode::FAILURE
        }
    }
}
