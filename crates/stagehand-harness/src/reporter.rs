//! Test reporter - progress lines, failure replay and the final summary

use crate::classifier::FailureReason;
use crate::executor::ExecutionResult;
use crate::runner::RunSummary;
use colored::*;
use stagehand_config::Verbosity;
use std::io::{self, Write};

const RULE: &str = "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━";

/// Writes harness output to a stream
pub struct TestReporter<W: Write> {
    out: W,
    verbosity: Verbosity,
}

impl TestReporter<io::Stdout> {
    /// Reporter writing to standard output
    pub fn stdout(verbosity: Verbosity) -> Self {
        Self::new(io::stdout(), verbosity)
    }
}

impl<W: Write> TestReporter<W> {
    pub fn new(out: W, verbosity: Verbosity) -> Self {
        Self { out, verbosity }
    }

    /// Print a ruled section header
    pub fn banner(&mut self, title: &str) -> io::Result<()> {
        writeln!(self.out)?;
        writeln!(self.out, "{RULE}")?;
        writeln!(self.out, "  {title}")?;
        writeln!(self.out, "{RULE}")
    }

    /// Print a non-fatal setup problem
    pub fn warning(&mut self, message: &str) -> io::Result<()> {
        writeln!(self.out, "{} {}", "Warning:".yellow().bold(), message)
    }

    /// Announce that a selector matched nothing
    pub fn target_not_found(&mut self, target: &str) -> io::Result<()> {
        writeln!(
            self.out,
            "{}",
            format!("Test scene file '{target}' not found. Running all integration test scenes.")
                .yellow()
        )
    }

    /// Print the progress line for a test about to run
    pub fn test_started(&mut self, name: &str) -> io::Result<()> {
        if self.verbosity.is_quiet() {
            write!(self.out, "Running test: {name} ... ")?;
            self.out.flush()
        } else {
            writeln!(self.out, "Running test: {name}")
        }
    }

    /// Print captured output as it is shown in verbose mode
    pub fn test_output(&mut self, result: &ExecutionResult) -> io::Result<()> {
        if !self.verbosity.is_quiet() {
            writeln!(self.out, "{}", result.output)?;
        }
        Ok(())
    }

    pub fn passed(&mut self) -> io::Result<()> {
        writeln!(self.out, "{}", "PASSED".green().bold())
    }

    pub fn failed(&mut self, reason: &FailureReason, result: &ExecutionResult) -> io::Result<()> {
        let detail = match reason {
            FailureReason::TimedOut => format!("timed out after {:.2?}", result.duration),
            other => other.to_string(),
        };
        writeln!(self.out, "{} ({})", "FAILED".red().bold(), detail.dimmed())
    }

    /// Replay the output of a failed quiet-mode test without re-running it
    pub fn replay(&mut self, name: &str, result: &ExecutionResult) -> io::Result<()> {
        writeln!(self.out, "Re-running test {name} with output...")?;
        writeln!(self.out, "{}", result.output)
    }

    /// Print the final counts
    pub fn summary(&mut self, summary: &RunSummary) -> io::Result<()> {
        self.banner("Summary")?;
        writeln!(self.out, "Total:  {}", summary.total)?;
        writeln!(self.out, "Passed: {}", summary.passed)?;
        writeln!(self.out, "Failed: {}", summary.failed)?;
        self.out.flush()
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}
