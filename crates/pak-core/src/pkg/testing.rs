//! Scripted command runner for adapter tests.

use super::exec::{CommandRunner, Invocation, ProcessOutcome};
use async_trait::async_trait;
use std::io;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

/// One recorded invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCall {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: PathBuf,
}

type Responder = Box<dyn Fn(&RecordedCall) -> io::Result<ProcessOutcome> + Send + Sync>;

/// Records every invocation and answers with a scripted outcome.
pub struct RecordingRunner {
    calls: Mutex<Vec<RecordedCall>>,
    responder: Responder,
}

impl RecordingRunner {
    pub fn with_responder(
        responder: impl Fn(&RecordedCall) -> io::Result<ProcessOutcome> + Send + Sync + 'static,
    ) -> Arc<Self> {
        Arc::new(Self {
            calls: Mutex::new(Vec::new()),
            responder: Box::new(responder),
        })
    }

    /// Every call exits 0 and prints `stdout`.
    pub fn ok(stdout: &str) -> Arc<Self> {
        let stdout = stdout.to_string();
        Self::with_responder(move |_| Ok(ProcessOutcome::exited(0, stdout.clone(), "")))
    }

    /// Every call exits 1 with "error" on stderr.
    pub fn failing() -> Arc<Self> {
        Self::with_responder(|_| Ok(ProcessOutcome::exited(1, "not ok", "error")))
    }

    /// `<bin> -v` prints `version`, everything else prints `stdout`.
    pub fn with_version(version: &str, stdout: &str) -> Arc<Self> {
        let version = version.to_string();
        let stdout = stdout.to_string();
        Self::with_responder(move |call| {
            if call.args == ["-v"] {
                Ok(ProcessOutcome::exited(0, version.clone(), ""))
            } else {
                Ok(ProcessOutcome::exited(0, stdout.clone(), ""))
            }
        })
    }

    /// Every call fails to spawn.
    pub fn spawn_error() -> Arc<Self> {
        Self::with_responder(|_| {
            Err(io::Error::new(io::ErrorKind::NotFound, "program not found"))
        })
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Argument vectors of all calls, in order.
    pub fn args(&self) -> Vec<Vec<String>> {
        self.calls().into_iter().map(|c| c.args).collect()
    }
}

#[async_trait]
impl CommandRunner for RecordingRunner {
    async fn run(&self, invocation: Invocation<'_>) -> io::Result<ProcessOutcome> {
        let call = RecordedCall {
            program: invocation.program.to_string(),
            args: invocation.args.to_vec(),
            cwd: invocation.cwd.to_path_buf(),
        };
        let outcome = (self.responder)(&call);
        self.calls.lock().unwrap().push(call);
        outcome
    }
}

/// Owned argument vector from string literals.
pub fn args(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| (*s).to_string()).collect()
}
