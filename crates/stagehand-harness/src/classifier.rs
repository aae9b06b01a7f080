//! Output classification - decide pass/fail for a finished test
//!
//! Godot can exit 0 after logging a fatal script error, and the log of a
//! healthy run contains analyzer noise that looks like errors. The
//! classifier reconciles both channels:
//!
//! - a timeout or nonzero exit code fails the test
//! - `FATAL:` or `SCRIPT ERROR` anywhere in the output fails the test
//! - an `ERROR:` line fails the test unless it contains a benign pattern

use crate::executor::ExecutionResult;
use std::fmt;

/// Generic error marker in Godot's log
pub const ERROR_MARKER: &str = "ERROR:";

/// Marker of an unrecoverable engine error
pub const FATAL_MARKER: &str = "FATAL:";

/// Marker of a GDScript runtime error
pub const SCRIPT_ERROR_MARKER: &str = "SCRIPT ERROR";

/// Error-line substrings produced by the GDScript analyzer on test fixtures.
/// Typed dictionary conversion errors are expected.
pub const BENIGN_PATTERNS: &[&str] = &[
    "Could not find element type from property hint of a typed dictionary",
    "Unable to convert key from",
];

/// Pass/fail verdict for one test
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Pass,
    Fail,
}

/// Why a test was classified as failed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureReason {
    TimedOut,
    /// Process was killed without an exit code
    Killed,
    ExitCode(i32),
    Fatal,
    ScriptError,
    /// First error line not covered by a benign pattern
    ErrorLine(String),
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureReason::TimedOut => write!(f, "timed out"),
            FailureReason::Killed => write!(f, "terminated without exit code"),
            FailureReason::ExitCode(code) => write!(f, "exit code {code}"),
            FailureReason::Fatal => write!(f, "fatal error"),
            FailureReason::ScriptError => write!(f, "script error"),
            FailureReason::ErrorLine(line) => write!(f, "{line}"),
        }
    }
}

/// Decides whether a finished test passed
pub trait Classifier {
    /// The reason `result` fails, or `None` if it passes
    fn failure(&self, result: &ExecutionResult) -> Option<FailureReason>;

    fn classify(&self, result: &ExecutionResult) -> Verdict {
        match self.failure(result) {
            Some(_) => Verdict::Fail,
            None => Verdict::Pass,
        }
    }
}

/// Classifier based on exit code and log markers
#[derive(Debug, Clone)]
pub struct OutputClassifier {
    benign: Vec<String>,
}

impl Default for OutputClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl OutputClassifier {
    /// Create a classifier with the built-in benign patterns
    pub fn new() -> Self {
        Self {
            benign: BENIGN_PATTERNS.iter().map(|p| p.to_string()).collect(),
        }
    }

    /// Add benign patterns on top of the built-in ones
    pub fn with_benign_patterns<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.benign.extend(patterns.into_iter().map(Into::into));
        self
    }

    fn is_benign(&self, line: &str) -> bool {
        self.benign.iter().any(|pattern| line.contains(pattern.as_str()))
    }

    /// Scan the log text alone, ignoring the exit code
    pub fn scan_output(&self, output: &str) -> Option<FailureReason> {
        if output.contains(FATAL_MARKER) {
            return Some(FailureReason::Fatal);
        }
        if output.contains(SCRIPT_ERROR_MARKER) {
            return Some(FailureReason::ScriptError);
        }
        output
            .lines()
            .find(|line| line.contains(ERROR_MARKER) && !self.is_benign(line))
            .map(|line| FailureReason::ErrorLine(line.trim().to_string()))
    }
}

impl Classifier for OutputClassifier {
    fn failure(&self, result: &ExecutionResult) -> Option<FailureReason> {
        if result.timed_out() {
            return Some(FailureReason::TimedOut);
        }
        match result.exit_code {
            Some(0) => self.scan_output(&result.output),
            Some(code) => Some(FailureReason::ExitCode(code)),
            None => Some(FailureReason::Killed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::Completion;
    use rstest::rstest;
    use std::time::Duration;

    fn exited(code: i32, output: &str) -> ExecutionResult {
        ExecutionResult {
            exit_code: Some(code),
            output: output.to_string(),
            completion: Completion::Exited,
            duration: Duration::from_millis(10),
        }
    }

    #[test]
    fn test_clean_run_passes() {
        let result = exited(0, "Godot Engine v4.3\nAll systems ran\n");
        assert_eq!(OutputClassifier::new().classify(&result), Verdict::Pass);
    }

    #[test]
    fn test_benign_only_output_passes() {
        let output = "\
ERROR: Could not find element type from property hint of a typed dictionary.
   at: get_element_type (core/variant/typed_dictionary.cpp:42)
ERROR: Unable to convert key from \"String\" to \"StringName\".
";
        assert_eq!(
            OutputClassifier::new().classify(&exited(0, output)),
            Verdict::Pass
        );
    }

    #[rstest]
    #[case("FATAL: Condition \"!world\" is true.")]
    #[case("SCRIPT ERROR: Invalid call. Nonexistent function 'spawn'.")]
    #[case("ERROR: Failed to load resource 'res://missing.tres'.")]
    #[case("noise\nERROR: Unable to convert key from x\nERROR: Entity 42 is not alive\n")]
    fn test_disqualifying_output_fails(#[case] output: &str) {
        assert_eq!(
            OutputClassifier::new().classify(&exited(0, output)),
            Verdict::Fail
        );
    }

    #[rstest]
    #[case(0)]
    #[case(1)]
    fn test_fatal_marker_always_fails(#[case] code: i32) {
        let result = exited(code, "ERROR: Unable to convert key from a\nFATAL: crash\n");
        assert_eq!(OutputClassifier::new().classify(&result), Verdict::Fail);
    }

    #[test]
    fn test_nonzero_exit_fails_with_clean_output() {
        let classifier = OutputClassifier::new();
        let result = exited(1, "");
        assert_eq!(classifier.failure(&result), Some(FailureReason::ExitCode(1)));
    }

    #[test]
    fn test_timeout_fails_regardless_of_output() {
        let result = ExecutionResult {
            exit_code: None,
            output: "all good\n".to_string(),
            completion: Completion::TimedOut,
            duration: Duration::from_secs(120),
        };
        assert_eq!(
            OutputClassifier::new().failure(&result),
            Some(FailureReason::TimedOut)
        );
    }

    #[test]
    fn test_reports_first_unexpected_error_line() {
        let output = "ERROR: Unable to convert key from a\n  ERROR: Entity 42 is not alive  \n";
        assert_eq!(
            OutputClassifier::new().scan_output(output),
            Some(FailureReason::ErrorLine("ERROR: Entity 42 is not alive".to_string()))
        );
    }

    #[test]
    fn test_extra_benign_patterns() {
        let output = "ERROR: Unable to load addon script from path\n";
        assert_eq!(
            OutputClassifier::new().classify(&exited(0, output)),
            Verdict::Fail
        );

        let classifier = OutputClassifier::new().with_benign_patterns(["Unable to load addon script"]);
        assert_eq!(classifier.classify(&exited(0, output)), Verdict::Pass);
    }
}
