//! Process execution for package-manager binaries.
//!
//! Every adapter operation ends in a [`CommandResult`]. The spawning itself sits
//! behind the [`CommandRunner`] trait so adapters can be driven by a scripted
//! runner in tests.

use crate::config::Config;
use async_trait::async_trait;
use serde::Serialize;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{ChildStderr, ChildStdout, Command};
use tracing::{debug, warn};

/// Receives one line of package-manager output (without the newline).
pub type OutputSink = Arc<dyn Fn(&str) + Send + Sync>;

/// Optional destinations for streamed output.
#[derive(Clone, Default)]
pub struct OutputSinks {
    /// Receives stdout lines only.
    pub stdout: Option<OutputSink>,
    /// Receives stderr lines only.
    pub stderr: Option<OutputSink>,
    /// Receives both streams in arrival order.
    pub combined: Option<OutputSink>,
}

impl OutputSinks {
    /// No sinks: output is captured but not streamed.
    #[must_use]
    pub fn none() -> Self {
        Self::default()
    }

    /// Set the stdout sink.
    #[must_use]
    pub fn with_stdout(mut self, sink: OutputSink) -> Self {
        self.stdout = Some(sink);
        self
    }

    /// Set the stderr sink.
    #[must_use]
    pub fn with_stderr(mut self, sink: OutputSink) -> Self {
        self.stderr = Some(sink);
        self
    }

    /// Set the combined sink.
    #[must_use]
    pub fn with_combined(mut self, sink: OutputSink) -> Self {
        self.combined = Some(sink);
        self
    }
}

impl fmt::Debug for OutputSinks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OutputSinks")
            .field("stdout", &self.stdout.is_some())
            .field("stderr", &self.stderr.is_some())
            .field("combined", &self.combined.is_some())
            .finish()
    }
}

/// Result of a package-manager operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommandResult {
    /// Whether the operation succeeded.
    pub success: bool,
    /// Exit code of the process (-1 when it was terminated by a signal).
    pub exit_code: i32,
    /// Captured stdout, final newline stripped.
    pub stdout: String,
    /// Captured stderr.
    pub stderr: String,
    /// Both streams interleaved in arrival order.
    pub combined_output: String,
}

impl CommandResult {
    /// A failed result that never reached a process.
    pub fn fail(message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            success: false,
            exit_code: 1,
            stdout: String::new(),
            stderr: message.clone(),
            combined_output: message,
        }
    }

    /// Replace stdout, keeping everything else.
    #[must_use]
    pub fn with_stdout(mut self, stdout: impl Into<String>) -> Self {
        self.stdout = stdout.into();
        self
    }
}

impl From<ProcessOutcome> for CommandResult {
    fn from(outcome: ProcessOutcome) -> Self {
        let success = outcome.exit_code == Some(0)
            && !outcome.killed
            && !outcome.timed_out
            && !outcome.canceled;
        Self {
            success,
            exit_code: outcome.exit_code.unwrap_or(-1),
            stdout: outcome.stdout,
            stderr: outcome.stderr,
            combined_output: outcome.all,
        }
    }
}

/// What a runner observed about a finished process.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessOutcome {
    /// Exit code, `None` when the process did not exit normally.
    pub exit_code: Option<i32>,
    /// Terminated by a signal.
    pub killed: bool,
    /// Killed because the runner's timeout elapsed.
    pub timed_out: bool,
    /// Canceled before completion.
    pub canceled: bool,
    pub stdout: String,
    pub stderr: String,
    /// Both streams in arrival order.
    pub all: String,
}

impl ProcessOutcome {
    /// An outcome for a process that exited with `code` and printed `stdout`.
    #[must_use]
    pub fn exited(code: i32, stdout: impl Into<String>, stderr: impl Into<String>) -> Self {
        let stdout = stdout.into();
        let stderr = stderr.into();
        let all = match (stdout.is_empty(), stderr.is_empty()) {
            (_, true) => stdout.clone(),
            (true, false) => stderr.clone(),
            (false, false) => format!("{stdout}\n{stderr}"),
        };
        Self {
            exit_code: Some(code),
            stdout,
            stderr,
            all,
            ..Self::default()
        }
    }
}

/// A single process invocation.
#[derive(Debug, Clone, Copy)]
pub struct Invocation<'a> {
    pub program: &'a str,
    pub args: &'a [String],
    pub cwd: &'a Path,
    pub sinks: &'a OutputSinks,
}

/// Spawns processes and captures their output.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run the invocation to completion.
    ///
    /// # Errors
    /// Returns an error if the process cannot be spawned or its output cannot be read.
    async fn run(&self, invocation: Invocation<'_>) -> io::Result<ProcessOutcome>;
}

/// Runs package managers as child processes with `tokio::process`.
#[derive(Debug, Clone, Default)]
pub struct ProcessRunner {
    timeout: Option<Duration>,
}

impl ProcessRunner {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Kill the child when it runs longer than `timeout`.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }
}

#[async_trait]
impl CommandRunner for ProcessRunner {
    async fn run(&self, invocation: Invocation<'_>) -> io::Result<ProcessOutcome> {
        // `which` resolves npm.cmd / yarn.cmd shims on Windows
        let program = which::which(invocation.program)
            .unwrap_or_else(|_| PathBuf::from(invocation.program));

        debug!(
            program = invocation.program,
            args = ?invocation.args,
            cwd = %invocation.cwd.display(),
            "spawning package manager"
        );

        let mut child = Command::new(&program)
            .args(invocation.args)
            .current_dir(invocation.cwd)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| io::Error::other("failed to capture stdout"))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| io::Error::other("failed to capture stderr"))?;

        let mut capture = Capture::default();
        let mut timed_out = false;
        let collected = collect_output(&mut capture, stdout, stderr, invocation.sinks);
        match self.timeout {
            Some(limit) => {
                if let Ok(result) = tokio::time::timeout(limit, collected).await {
                    result?;
                } else {
                    warn!(program = invocation.program, ?limit, "package manager timed out");
                    timed_out = true;
                    child.start_kill()?;
                }
            }
            None => collected.await?,
        }

        let status = child.wait().await?;
        let exit_code = status.code();

        Ok(ProcessOutcome {
            exit_code,
            killed: exit_code.is_none(),
            timed_out,
            canceled: false,
            stdout: capture.stdout,
            stderr: capture.stderr,
            all: capture.all,
        })
    }
}

#[derive(Default)]
struct Capture {
    stdout: String,
    stderr: String,
    all: String,
}

fn push_line(buf: &mut String, line: &str) {
    if !buf.is_empty() {
        buf.push('\n');
    }
    buf.push_str(line);
}

impl Capture {
    fn stdout_line(&mut self, line: &str, sinks: &OutputSinks) {
        if let Some(sink) = &sinks.stdout {
            sink(line);
        }
        if let Some(sink) = &sinks.combined {
            sink(line);
        }
        push_line(&mut self.stdout, line);
        push_line(&mut self.all, line);
    }

    fn stderr_line(&mut self, line: &str, sinks: &OutputSinks) {
        if let Some(sink) = &sinks.stderr {
            sink(line);
        }
        if let Some(sink) = &sinks.combined {
            sink(line);
        }
        push_line(&mut self.stderr, line);
        push_line(&mut self.all, line);
    }
}

/// Drain both pipes line by line until they close.
async fn collect_output(
    capture: &mut Capture,
    stdout: ChildStdout,
    stderr: ChildStderr,
    sinks: &OutputSinks,
) -> io::Result<()> {
    let mut out = BufReader::new(stdout).lines();
    let mut err = BufReader::new(stderr).lines();
    let mut out_open = true;
    let mut err_open = true;

    while out_open || err_open {
        tokio::select! {
            line = out.next_line(), if out_open => match line? {
                Some(line) => capture.stdout_line(&line, sinks),
                None => out_open = false,
            },
            line = err.next_line(), if err_open => match line? {
                Some(line) => capture.stderr_line(&line, sinks),
                None => err_open = false,
            },
        }
    }

    Ok(())
}

/// Fixed per-adapter state: configuration, runner and output sinks.
#[derive(Clone)]
pub struct Session {
    config: Config,
    runner: Arc<dyn CommandRunner>,
    sinks: OutputSinks,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("config", &self.config)
            .field("sinks", &self.sinks)
            .finish_non_exhaustive()
    }
}

impl Session {
    /// Create a session that spawns real processes.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self {
            config,
            runner: Arc::new(ProcessRunner::new()),
            sinks: OutputSinks::none(),
        }
    }

    /// Use a different command runner.
    #[must_use]
    pub fn with_runner(mut self, runner: Arc<dyn CommandRunner>) -> Self {
        self.runner = runner;
        self
    }

    /// Stream output into the given sinks.
    #[must_use]
    pub fn with_sinks(mut self, sinks: OutputSinks) -> Self {
        self.sinks = sinks;
        self
    }

    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    #[must_use]
    pub fn cwd(&self) -> &Path {
        &self.config.cwd
    }

    /// The same session rooted at another directory.
    #[must_use]
    pub fn relocate(&self, cwd: PathBuf) -> Self {
        Self {
            config: self.config.clone().with_cwd(cwd),
            runner: Arc::clone(&self.runner),
            sinks: self.sinks.clone(),
        }
    }

    /// Run `program` in the session's working directory.
    pub async fn exec(&self, program: &str, args: &[String]) -> CommandResult {
        self.exec_in(program, args, self.cwd()).await
    }

    /// Run `program` in `cwd`.
    pub async fn exec_in(&self, program: &str, args: &[String], cwd: &Path) -> CommandResult {
        let invocation = Invocation {
            program,
            args,
            cwd,
            sinks: &self.sinks,
        };
        match self.runner.run(invocation).await {
            Ok(outcome) => outcome.into(),
            Err(e) => {
                warn!(program, error = %e, "failed to run package manager");
                CommandResult::fail(format!("Failed to run {program}: {e}"))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pkg::testing::RecordingRunner;
    use std::sync::Mutex;

    #[test]
    fn test_success_requires_zero_exit() {
        let ok: CommandResult = ProcessOutcome::exited(0, "ok", "").into();
        assert!(ok.success);
        assert_eq!(ok.exit_code, 0);
        assert_eq!(ok.stdout, "ok");

        let failed: CommandResult = ProcessOutcome::exited(1, "not ok", "error").into();
        assert!(!failed.success);
        assert_eq!(failed.exit_code, 1);
        assert_eq!(failed.stderr, "error");
        assert_eq!(failed.combined_output, "not ok\nerror");
    }

    #[test]
    fn test_killed_timed_out_canceled_are_failures() {
        let killed: CommandResult = ProcessOutcome {
            exit_code: None,
            killed: true,
            ..ProcessOutcome::default()
        }
        .into();
        assert!(!killed.success);
        assert_eq!(killed.exit_code, -1);

        let timed_out: CommandResult = ProcessOutcome {
            timed_out: true,
            ..ProcessOutcome::exited(0, "", "")
        }
        .into();
        assert!(!timed_out.success);

        let canceled: CommandResult = ProcessOutcome {
            canceled: true,
            ..ProcessOutcome::exited(0, "", "")
        }
        .into();
        assert!(!canceled.success);
    }

    #[test]
    fn test_fail_constructor() {
        let result = CommandResult::fail("nope");
        assert!(!result.success);
        assert_eq!(result.exit_code, 1);
        assert!(result.stdout.is_empty());
        assert_eq!(result.stderr, "nope");
        assert_eq!(result.combined_output, "nope");
    }

    #[test]
    fn test_capture_feeds_sinks() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let combined = Arc::clone(&seen);
        let sinks = OutputSinks::none().with_combined(Arc::new(move |line: &str| {
            combined.lock().unwrap().push(line.to_string());
        }));

        let mut capture = Capture::default();
        capture.stdout_line("added 1 package", &sinks);
        capture.stderr_line("npm WARN deprecated", &sinks);
        capture.stdout_line("done", &sinks);

        assert_eq!(capture.stdout, "added 1 package\ndone");
        assert_eq!(capture.stderr, "npm WARN deprecated");
        assert_eq!(
            capture.all,
            "added 1 package\nnpm WARN deprecated\ndone"
        );
        assert_eq!(seen.lock().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_session_runs_in_cwd() {
        let runner = RecordingRunner::ok("ok");
        let session = Session::new(Config::new(PathBuf::from("/foo/bar")))
            .with_runner(runner.clone());

        let result = session.exec("npm", &["-v".to_string()]).await;
        assert!(result.success);

        let calls = runner.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].program, "npm");
        assert_eq!(calls[0].cwd, PathBuf::from("/foo/bar"));
    }

    #[tokio::test]
    async fn test_session_relocate_keeps_runner() {
        let runner = RecordingRunner::ok("ok");
        let session = Session::new(Config::new(PathBuf::from("/a")))
            .with_runner(runner.clone())
            .relocate(PathBuf::from("/b"));

        session.exec("yarn", &[]).await;
        assert_eq!(runner.calls()[0].cwd, PathBuf::from("/b"));
    }

    #[tokio::test]
    async fn test_spawn_error_becomes_failed_result() {
        let runner = RecordingRunner::spawn_error();
        let session =
            Session::new(Config::new(PathBuf::from("/a"))).with_runner(runner.clone());

        let result = session.exec("npm", &["install".to_string()]).await;
        assert!(!result.success);
        assert!(result.stderr.contains("Failed to run npm"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_process_runner_captures_output() {
        let dir = tempfile::tempdir().unwrap();
        let sinks = OutputSinks::none();
        let args = vec!["-c".to_string(), "echo out; echo err 1>&2; exit 3".to_string()];
        let outcome = ProcessRunner::new()
            .run(Invocation {
                program: "sh",
                args: &args,
                cwd: dir.path(),
                sinks: &sinks,
            })
            .await
            .unwrap();

        assert_eq!(outcome.exit_code, Some(3));
        assert_eq!(outcome.stdout, "out");
        assert_eq!(outcome.stderr, "err");
        assert!(!outcome.killed);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_process_runner_timeout_kills_child() {
        let dir = tempfile::tempdir().unwrap();
        let sinks = OutputSinks::none();
        let args = vec!["-c".to_string(), "sleep 5".to_string()];
        let outcome = ProcessRunner::new()
            .with_timeout(Some(Duration::from_millis(100)))
            .run(Invocation {
                program: "sh",
                args: &args,
                cwd: dir.path(),
                sinks: &sinks,
            })
            .await
            .unwrap();

        assert!(outcome.timed_out);
        let result: CommandResult = outcome.into();
        assert!(!result.success);
    }
}
