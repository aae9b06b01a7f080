//! Stagehand integration test harness
//!
//! Runs every Godot test scene of the integration project as a separate
//! headless Godot process and decides pass/fail from the exit code and the
//! captured log. Pipeline:
//!
//! discovery -> resolver -> environment -> executor -> classifier -> runner
//!
//! The runner folds per-test verdicts into a [`RunSummary`] and the
//! [`TestReporter`] prints progress and the final summary.

pub mod classifier;
pub mod discovery;
pub mod environment;
pub mod error;
pub mod executor;
pub mod reporter;
pub mod resolver;
pub mod runner;

pub use classifier::{Classifier, FailureReason, OutputClassifier, Verdict};
pub use discovery::{discover, TestArtifact};
pub use environment::{register_extension, EnvironmentGuard, LinkTeardown};
pub use error::{HarnessError, HarnessResult};
pub use executor::{CancelFlag, Completion, ExecutionResult, Executor, ProcessExecutor};
pub use reporter::TestReporter;
pub use resolver::{resolve, Resolution, ResolvedBy};
pub use runner::{RunSummary, TestRunner};
