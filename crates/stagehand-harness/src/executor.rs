//! Process execution - run one test scene in a headless Godot process
//!
//! Launches the Godot binary with the fixed harness argument list, waits up
//! to the per-test timeout and captures stdout and stderr as one text, in
//! arrival order. A nonzero exit code is data, not an error; only a failure
//! to launch the program is.

use crate::discovery::TestArtifact;
use crate::error::{HarnessError, HarnessResult};
use stagehand_config::run::{DEFAULT_QUIT_AFTER, DEFAULT_TIMEOUT};
use std::ffi::OsString;
use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::debug;

/// How often a running child is polled for exit, timeout and interrupt
const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// How long output still in flight is collected once the process group is gone
const DRAIN_GRACE: Duration = Duration::from_millis(500);

/// Shared cancellation flag, set on operator interrupt
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// How a test process ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    /// The process exited on its own
    Exited,
    /// The process outlived its budget and was killed
    TimedOut,
}

/// Outcome of running one test scene
#[derive(Debug, Clone)]
pub struct ExecutionResult {
    /// Exit code, absent when the process was killed
    pub exit_code: Option<i32>,
    /// Combined stdout and stderr
    pub output: String,
    pub completion: Completion,
    pub duration: Duration,
}

impl ExecutionResult {
    pub fn timed_out(&self) -> bool {
        self.completion == Completion::TimedOut
    }
}

/// Runs a test scene and captures its result
pub trait Executor {
    fn execute(&self, artifact: &TestArtifact) -> HarnessResult<ExecutionResult>;
}

/// Executes test scenes as headless Godot processes
#[derive(Debug, Clone)]
pub struct ProcessExecutor {
    program: PathBuf,
    project_dir: PathBuf,
    quit_after: u32,
    timeout: Duration,
    cancel: CancelFlag,
}

impl ProcessExecutor {
    /// Create an executor for `program` running scenes of `project_dir`
    pub fn new(program: impl Into<PathBuf>, project_dir: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            project_dir: project_dir.into(),
            quit_after: DEFAULT_QUIT_AFTER,
            timeout: DEFAULT_TIMEOUT,
            cancel: CancelFlag::new(),
        }
    }

    /// Set the `--quit-after` budget
    pub fn with_quit_after(mut self, quit_after: u32) -> Self {
        self.quit_after = quit_after;
        self
    }

    /// Set the per-test timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Observe `cancel` while waiting on a test
    pub fn with_cancel(mut self, cancel: CancelFlag) -> Self {
        self.cancel = cancel;
        self
    }

    /// Argument list passed to Godot for `scene`
    pub fn arguments(&self, scene: &Path) -> Vec<OsString> {
        vec![
            "--headless".into(),
            "--no-header".into(),
            "--quit-after".into(),
            self.quit_after.to_string().into(),
            "--path".into(),
            self.project_dir.clone().into_os_string(),
            "--scene".into(),
            scene.as_os_str().to_os_string(),
        ]
    }

    fn wait(&self, child: &mut Child, start: Instant) -> HarnessResult<(Option<i32>, Completion)> {
        loop {
            if let Some(status) = child
                .try_wait()
                .map_err(|e| HarnessError::io(&self.program, e))?
            {
                // Anything the test left behind in its group goes with it
                kill_group(child);
                if self.cancel.is_cancelled() {
                    return Err(HarnessError::Interrupted);
                }
                return Ok((status.code(), Completion::Exited));
            }

            if self.cancel.is_cancelled() {
                reap(child);
                return Err(HarnessError::Interrupted);
            }

            if start.elapsed() >= self.timeout {
                debug!(timeout = ?self.timeout, "test exceeded timeout, killing");
                reap(child);
                return Ok((None, Completion::TimedOut));
            }

            thread::sleep(POLL_INTERVAL);
        }
    }
}

impl Executor for ProcessExecutor {
    fn execute(&self, artifact: &TestArtifact) -> HarnessResult<ExecutionResult> {
        let args = self.arguments(artifact.path());
        debug!(program = %self.program.display(), ?args, "launching test");

        let mut command = Command::new(&self.program);
        command
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        own_process_group(&mut command);

        let start = Instant::now();
        let mut child = command
            .spawn()
            .map_err(|e| HarnessError::spawn(&self.program, e))?;

        let (tx, rx) = mpsc::channel();
        if let Some(out) = child.stdout.take() {
            forward_lines(out, tx.clone());
        }
        if let Some(err) = child.stderr.take() {
            forward_lines(err, tx.clone());
        }
        drop(tx);

        let (exit_code, completion) = self.wait(&mut child, start)?;

        let output = collect_output(&rx, DRAIN_GRACE);
        let duration = start.elapsed();
        debug!(test = artifact.name(), ?exit_code, ?completion, ?duration, "test finished");

        Ok(ExecutionResult {
            exit_code,
            output,
            completion,
            duration,
        })
    }
}

/// Forward each line read from `stream` to `tx` until end of stream.
///
/// The reader thread is detached: a descendant that escaped the process
/// group may hold the pipe open, and the run must not wait on it.
fn forward_lines<R: Read + Send + 'static>(stream: R, tx: Sender<String>) {
    thread::spawn(move || {
        let mut reader = BufReader::new(stream);
        let mut line = Vec::new();
        loop {
            line.clear();
            match reader.read_until(b'\n', &mut line) {
                Ok(0) | Err(_) => break,
                Ok(_) => {
                    if tx.send(String::from_utf8_lossy(&line).into_owned()).is_err() {
                        break;
                    }
                }
            }
        }
    });
}

/// Collect forwarded lines until every writer is gone or `grace` runs out
fn collect_output(rx: &Receiver<String>, grace: Duration) -> String {
    let deadline = Instant::now() + grace;
    let mut output = String::new();
    loop {
        match rx.recv_timeout(deadline.saturating_duration_since(Instant::now())) {
            Ok(line) => output.push_str(&line),
            Err(RecvTimeoutError::Disconnected) => break,
            Err(RecvTimeoutError::Timeout) => {
                debug!("output pipes still open after the test ended, detaching readers");
                output.extend(rx.try_iter());
                break;
            }
        }
    }
    output
}

/// Kill a child with its whole process group and wait for it
fn reap(child: &mut Child) {
    kill_group(child);
    let _ = child.kill();
    let _ = child.wait();
}

/// Start the child as leader of a new process group
#[cfg(unix)]
fn own_process_group(command: &mut Command) {
    use std::os::unix::process::CommandExt;
    command.process_group(0);
}

#[cfg(not(unix))]
fn own_process_group(_command: &mut Command) {}

/// Send SIGKILL to every process left in the child's group
#[cfg(unix)]
fn kill_group(child: &Child) {
    use nix::sys::signal::{killpg, Signal};
    use nix::unistd::Pid;

    let Ok(pid) = i32::try_from(child.id()) else {
        return;
    };
    match killpg(Pid::from_raw(pid), Signal::SIGKILL) {
        Ok(()) => debug!(pgid = pid, "killed test process group"),
        // ESRCH: the group is already empty
        Err(errno) => debug!(pgid = pid, %errno, "process group not signalled"),
    }
}

#[cfg(not(unix))]
fn kill_group(_child: &Child) {}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_argument_contract() {
        let executor = ProcessExecutor::new("godot", "/repo/tests/integration").with_quit_after(3);
        let args = executor.arguments(Path::new("/repo/tests/integration/tests/a.tscn"));

        assert_eq!(
            args,
            vec![
                OsString::from("--headless"),
                OsString::from("--no-header"),
                OsString::from("--quit-after"),
                OsString::from("3"),
                OsString::from("--path"),
                OsString::from("/repo/tests/integration"),
                OsString::from("--scene"),
                OsString::from("/repo/tests/integration/tests/a.tscn"),
            ]
        );
    }

    #[test]
    fn test_missing_program_is_error() {
        let executor = ProcessExecutor::new("/nonexistent/godot-binary", "/tmp");
        let artifact = TestArtifact::new("/tmp/a.tscn", Path::new("/tmp"));

        let err = executor.execute(&artifact).unwrap_err();
        assert!(matches!(err, HarnessError::ExecutableNotFound(_)));
    }

    #[test]
    fn test_cancel_flag_is_shared() {
        let flag = CancelFlag::new();
        let clone = flag.clone();
        assert!(!flag.is_cancelled());
        clone.cancel();
        assert!(flag.is_cancelled());
    }

    #[cfg(unix)]
    mod process {
        use super::*;
        use pretty_assertions::assert_eq;
        use std::fs;
        use std::os::unix::fs::PermissionsExt;
        use tempfile::{tempdir, TempDir};

        /// A fake Godot that runs the scene file as a shell script
        fn fake_godot() -> (TempDir, PathBuf) {
            let dir = tempdir().unwrap();
            let program = dir.path().join("godot");
            fs::write(
                &program,
                "#!/bin/sh\nwhile [ \"$1\" != \"--scene\" ]; do shift; done\nexec sh \"$2\"\n",
            )
            .unwrap();
            fs::set_permissions(&program, fs::Permissions::from_mode(0o755)).unwrap();
            (dir, program)
        }

        fn scene(dir: &TempDir, name: &str, body: &str) -> TestArtifact {
            let path = dir.path().join(name);
            fs::write(&path, body).unwrap();
            TestArtifact::new(path, dir.path())
        }

        #[test]
        fn test_captures_stdout_and_stderr() {
            let (dir, program) = fake_godot();
            let artifact = scene(&dir, "ok.tscn", "echo out\necho err >&2\nexit 0\n");

            let result = ProcessExecutor::new(&program, dir.path())
                .execute(&artifact)
                .unwrap();

            assert_eq!(result.exit_code, Some(0));
            assert_eq!(result.completion, Completion::Exited);
            assert!(result.output.contains("out\n"));
            assert!(result.output.contains("err\n"));
        }

        #[test]
        fn test_nonzero_exit_is_data() {
            let (dir, program) = fake_godot();
            let artifact = scene(&dir, "fail.tscn", "exit 7\n");

            let result = ProcessExecutor::new(&program, dir.path())
                .execute(&artifact)
                .unwrap();
            assert_eq!(result.exit_code, Some(7));
        }

        #[test]
        fn test_timeout_kills_process() {
            let (dir, program) = fake_godot();
            let artifact = scene(&dir, "hang.tscn", "echo started\nexec sleep 30\n");

            let result = ProcessExecutor::new(&program, dir.path())
                .with_timeout(Duration::from_millis(300))
                .execute(&artifact)
                .unwrap();

            assert!(result.timed_out());
            assert_eq!(result.exit_code, None);
            assert!(result.output.contains("started"));
            assert!(result.duration < Duration::from_secs(10));
        }

        #[test]
        fn test_timeout_kills_grandchildren() {
            let (dir, program) = fake_godot();
            // `sleep` runs as a child of the shell and holds the output pipes
            let artifact = scene(&dir, "hang.tscn", "echo started\nsleep 8\necho after\n");

            let start = Instant::now();
            let result = ProcessExecutor::new(&program, dir.path())
                .with_timeout(Duration::from_millis(300))
                .execute(&artifact)
                .unwrap();

            assert!(result.timed_out());
            assert!(start.elapsed() < Duration::from_secs(3));
            assert!(result.output.contains("started"));
            assert!(!result.output.contains("after"));
        }

        #[test]
        fn test_background_process_does_not_hold_run() {
            let (dir, program) = fake_godot();
            let artifact = scene(&dir, "bg.tscn", "sleep 8 &\necho done\nexit 0\n");

            let start = Instant::now();
            let result = ProcessExecutor::new(&program, dir.path())
                .execute(&artifact)
                .unwrap();

            assert_eq!(result.exit_code, Some(0));
            assert!(result.output.contains("done"));
            assert!(start.elapsed() < Duration::from_secs(3));
        }

        #[test]
        fn test_cancelled_run_is_interrupted() {
            let (dir, program) = fake_godot();
            let artifact = scene(&dir, "hang.tscn", "sleep 30\n");
            let cancel = CancelFlag::new();
            cancel.cancel();

            let start = Instant::now();
            let err = ProcessExecutor::new(&program, dir.path())
                .with_cancel(cancel)
                .execute(&artifact)
                .unwrap_err();
            assert!(matches!(err, HarnessError::Interrupted));
            assert!(start.elapsed() < Duration::from_secs(3));
        }
    }
}
