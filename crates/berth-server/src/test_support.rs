//! Canned-output runner for server-side tests.
//!
//! Answers scripted outputs in order, then falls back to exit 0 with
//! empty output. The invocation log lives behind an `Arc` so tests can
//! keep a handle after the runner moves into the engine.

use std::collections::VecDeque;
use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use berth_core::{CommandOutput, CommandRunner, Result};

pub(crate) type CallLog = Arc<Mutex<Vec<Vec<String>>>>;

pub(crate) struct ScriptRunner {
    script: Mutex<VecDeque<CommandOutput>>,
    calls: CallLog,
}

impl ScriptRunner {
    /// Runner that answers exit 0 with empty output forever.
    pub(crate) fn ok() -> Self {
        Self::scripted([])
    }

    /// Runner that answers with `outputs` in order, then exit 0.
    pub(crate) fn scripted(outputs: impl IntoIterator<Item = CommandOutput>) -> Self {
        Self {
            script: Mutex::new(outputs.into_iter().collect()),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Handle onto the invocation log that survives moving the runner.
    pub(crate) fn call_log(&self) -> CallLog {
        self.calls.clone()
    }
}

pub(crate) fn output(exit_code: i32, stdout: &str, stderr: &str) -> CommandOutput {
    CommandOutput {
        exit_code,
        stdout: stdout.to_string(),
        stderr: stderr.to_string(),
    }
}

impl CommandRunner for ScriptRunner {
    async fn run(&self, argv: &[&str], _cwd: Option<&Path>) -> Result<CommandOutput> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(argv.iter().map(ToString::to_string).collect());
        let next = self
            .script
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front();
        Ok(next.unwrap_or_else(|| output(0, "", "")))
    }

    async fn run_with_timeout(
        &self,
        argv: &[&str],
        cwd: Option<&Path>,
        _timeout: Duration,
    ) -> Result<CommandOutput> {
        self.run(argv, cwd).await
    }
}
