//! Test runner - drive the per-test loop and fold verdicts into a summary
//!
//! Tests run one at a time in discovery order. In quiet mode the first
//! failure replays its captured output and stops the run; in verbose mode
//! every selected test runs.

use crate::classifier::{Classifier, OutputClassifier, Verdict};
use crate::discovery::TestArtifact;
use crate::error::{HarnessError, HarnessResult};
use crate::executor::{CancelFlag, Executor, ProcessExecutor};
use crate::reporter::TestReporter;
use stagehand_config::{RunConfig, Verbosity};
use std::io::Write;
use tracing::debug;

/// Pass/fail counts of a run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
}

impl RunSummary {
    /// Fold one verdict into the counts
    pub fn record(self, verdict: Verdict) -> Self {
        match verdict {
            Verdict::Pass => Self {
                total: self.total + 1,
                passed: self.passed + 1,
                ..self
            },
            Verdict::Fail => Self {
                total: self.total + 1,
                failed: self.failed + 1,
                ..self
            },
        }
    }

    pub fn is_success(&self) -> bool {
        self.failed == 0
    }

    /// Process exit status for the run
    pub fn exit_code(&self) -> u8 {
        if self.is_success() {
            0
        } else {
            1
        }
    }
}

/// Runs test scenes with an executor and a classifier
pub struct TestRunner<E, C> {
    executor: E,
    classifier: C,
    verbosity: Verbosity,
    cancel: CancelFlag,
}

impl TestRunner<ProcessExecutor, OutputClassifier> {
    /// Runner launching Godot as described by `config`
    pub fn from_config(config: &RunConfig, cancel: CancelFlag) -> Self {
        let executor = ProcessExecutor::new(config.godot(), config.layout().project_dir())
            .with_quit_after(config.quit_after())
            .with_timeout(config.timeout())
            .with_cancel(cancel.clone());
        let classifier =
            OutputClassifier::new().with_benign_patterns(config.benign_patterns().iter().cloned());

        TestRunner::new(executor, classifier)
            .with_verbosity(config.verbosity())
            .with_cancel(cancel)
    }
}

impl<E: Executor, C: Classifier> TestRunner<E, C> {
    /// Create a quiet runner
    pub fn new(executor: E, classifier: C) -> Self {
        Self {
            executor,
            classifier,
            verbosity: Verbosity::Quiet,
            cancel: CancelFlag::new(),
        }
    }

    pub fn with_verbosity(mut self, verbosity: Verbosity) -> Self {
        self.verbosity = verbosity;
        self
    }

    /// Stop before the next test once `cancel` is set
    pub fn with_cancel(mut self, cancel: CancelFlag) -> Self {
        self.cancel = cancel;
        self
    }

    /// Run `artifacts` in order, reporting progress to `reporter`
    pub fn run<W: Write>(
        &self,
        artifacts: &[TestArtifact],
        reporter: &mut TestReporter<W>,
    ) -> HarnessResult<RunSummary> {
        let mut summary = RunSummary::default();

        for artifact in artifacts {
            if self.cancel.is_cancelled() {
                return Err(HarnessError::Interrupted);
            }

            let verdict = self.run_single(artifact, reporter)?;
            summary = summary.record(verdict);

            if verdict == Verdict::Fail && self.verbosity.is_quiet() {
                debug!(test = artifact.name(), "stopping after first failure");
                break;
            }
        }

        Ok(summary)
    }

    fn run_single<W: Write>(
        &self,
        artifact: &TestArtifact,
        reporter: &mut TestReporter<W>,
    ) -> HarnessResult<Verdict> {
        reporter.test_started(artifact.name())?;
        let result = self.executor.execute(artifact)?;
        reporter.test_output(&result)?;

        match self.classifier.failure(&result) {
            None => {
                reporter.passed()?;
                Ok(Verdict::Pass)
            }
            Some(reason) => {
                reporter.failed(&reason, &result)?;
                if self.verbosity.is_quiet() {
                    reporter.replay(artifact.name(), &result)?;
                }
                Ok(Verdict::Fail)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::{Completion, ExecutionResult};
    use pretty_assertions::assert_eq;
    use std::cell::RefCell;
    use std::collections::HashMap;
    use std::path::Path;
    use std::time::Duration;

    /// Executor returning canned results and recording what it ran
    #[derive(Default)]
    struct ScriptedExecutor {
        results: HashMap<String, (i32, String)>,
        invoked: RefCell<Vec<String>>,
    }

    impl ScriptedExecutor {
        fn with(mut self, name: &str, code: i32, output: &str) -> Self {
            self.results
                .insert(name.to_string(), (code, output.to_string()));
            self
        }
    }

    impl Executor for &ScriptedExecutor {
        fn execute(&self, artifact: &TestArtifact) -> HarnessResult<ExecutionResult> {
            self.invoked.borrow_mut().push(artifact.name().to_string());
            let (code, output) = self
                .results
                .get(artifact.name())
                .cloned()
                .unwrap_or((0, String::new()));
            Ok(ExecutionResult {
                exit_code: Some(code),
                output,
                completion: Completion::Exited,
                duration: Duration::from_millis(1),
            })
        }
    }

    fn artifacts(names: &[&str]) -> Vec<TestArtifact> {
        let root = Path::new("/tests");
        names
            .iter()
            .map(|n| TestArtifact::new(root.join(n), root))
            .collect()
    }

    fn run(
        executor: &ScriptedExecutor,
        names: &[&str],
        verbosity: Verbosity,
    ) -> (RunSummary, String) {
        let mut reporter = TestReporter::new(Vec::new(), verbosity);
        let summary = TestRunner::new(executor, OutputClassifier::new())
            .with_verbosity(verbosity)
            .run(&artifacts(names), &mut reporter)
            .unwrap();
        (summary, String::from_utf8(reporter.into_inner()).unwrap())
    }

    #[test]
    fn test_summary_record() {
        let summary = RunSummary::default()
            .record(Verdict::Pass)
            .record(Verdict::Fail)
            .record(Verdict::Pass);
        assert_eq!(
            summary,
            RunSummary {
                total: 3,
                passed: 2,
                failed: 1
            }
        );
        assert_eq!(summary.exit_code(), 1);
        assert_eq!(RunSummary::default().exit_code(), 0);
    }

    #[test]
    fn test_empty_run() {
        let executor = ScriptedExecutor::default();
        let (summary, _) = run(&executor, &[], Verbosity::Quiet);
        assert_eq!(summary, RunSummary::default());
        assert_eq!(summary.exit_code(), 0);
    }

    #[test]
    fn test_quiet_stops_at_first_failure() {
        let executor = ScriptedExecutor::default().with("b.tscn", 1, "boom");
        let (summary, out) = run(&executor, &["a.tscn", "b.tscn", "c.tscn"], Verbosity::Quiet);

        assert_eq!(
            summary,
            RunSummary {
                total: 2,
                passed: 1,
                failed: 1
            }
        );
        assert_eq!(*executor.invoked.borrow(), vec!["a.tscn", "b.tscn"]);
        assert!(out.contains("Re-running test b.tscn with output..."));
        assert!(out.contains("boom"));
    }

    #[test]
    fn test_verbose_runs_everything() {
        let executor = ScriptedExecutor::default().with("b.tscn", 1, "boom");
        let (summary, out) = run(&executor, &["a.tscn", "b.tscn", "c.tscn"], Verbosity::Verbose);

        assert_eq!(
            summary,
            RunSummary {
                total: 3,
                passed: 2,
                failed: 1
            }
        );
        assert_eq!(executor.invoked.borrow().len(), 3);
        assert!(!out.contains("Re-running"));
    }

    #[test]
    fn test_fatal_marker_with_zero_exit_fails() {
        let executor = ScriptedExecutor::default().with("a.tscn", 0, "FATAL: world gone\n");
        let (summary, _) = run(&executor, &["a.tscn"], Verbosity::Verbose);
        assert_eq!(summary.failed, 1);
    }

    #[test]
    fn test_cancelled_run_stops_before_next_test() {
        let executor = ScriptedExecutor::default();
        let cancel = CancelFlag::new();
        cancel.cancel();

        let mut reporter = TestReporter::new(Vec::new(), Verbosity::Quiet);
        let err = TestRunner::new(&executor, OutputClassifier::new())
            .with_cancel(cancel)
            .run(&artifacts(&["a.tscn"]), &mut reporter)
            .unwrap_err();

        assert!(matches!(err, HarnessError::Interrupted));
        assert!(executor.invoked.borrow().is_empty());
    }
}
