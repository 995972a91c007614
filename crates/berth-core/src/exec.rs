//! Command execution with timeout and bounded output capture.
//!
//! Every step operation shells out through [`CommandRunner`]; this module is
//! the only place that spawns child processes, so timeout and capture policy
//! live here and nowhere else. A non-zero exit is data, never an error; the
//! only `Err` a runner produces is a failure to launch the process at all.

use std::future::Future;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::error::{Error, Result};

/// Default timeout for every spawned command.
pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(600);

/// Each captured stream is truncated to its last this-many characters.
pub const OUTPUT_TAIL_CHARS: usize = 4000;

/// Bytes retained per stream while reading. Worst-case UTF-8 is four bytes
/// per character, so this always recovers `OUTPUT_TAIL_CHARS` characters
/// after lossy conversion.
const TAIL_BUF_BYTES: usize = OUTPUT_TAIL_CHARS * 4;

/// Captured result of one child process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandOutput {
    /// Process exit code; `-1` for a timeout or signal death.
    pub exit_code: i32,
    /// Last [`OUTPUT_TAIL_CHARS`] characters of stdout.
    pub stdout: String,
    /// Last [`OUTPUT_TAIL_CHARS`] characters of stderr.
    pub stderr: String,
}

impl CommandOutput {
    /// True when the command exited zero.
    #[must_use]
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    fn timed_out(timeout: Duration) -> Self {
        Self {
            exit_code: -1,
            stdout: String::new(),
            stderr: format!("command timed out after {}s", timeout.as_secs()),
        }
    }
}

/// Generic command execution with timeout and guaranteed process kill.
///
/// The production implementation uses tokio; test doubles return canned
/// results without spawning processes. Futures are `Send` so callers can
/// stay generic inside spawned request handlers.
pub trait CommandRunner: Send + Sync {
    /// Run `argv` with the runner's default timeout.
    ///
    /// # Errors
    ///
    /// Returns an error only if the process fails to launch.
    fn run(
        &self,
        argv: &[&str],
        cwd: Option<&Path>,
    ) -> impl Future<Output = Result<CommandOutput>> + Send;

    /// Run `argv` with an explicit timeout (overrides the default).
    ///
    /// # Errors
    ///
    /// Returns an error only if the process fails to launch.
    fn run_with_timeout(
        &self,
        argv: &[&str],
        cwd: Option<&Path>,
        timeout: Duration,
    ) -> impl Future<Output = Result<CommandOutput>> + Send;
}

/// Production [`CommandRunner`]: tokio process execution with explicit
/// kill when the timeout fires.
///
/// `tokio::time::timeout` around `.output().await` would drop the future
/// but leave the OS process running; this implementation uses
/// `tokio::select!` with `child.kill()` so the child is terminated before
/// the synthetic timeout result is returned.
pub struct TokioCommandRunner {
    timeout: Duration,
}

impl TokioCommandRunner {
    #[must_use]
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl Default for TokioCommandRunner {
    fn default() -> Self {
        Self::new(DEFAULT_COMMAND_TIMEOUT)
    }
}

impl CommandRunner for TokioCommandRunner {
    async fn run(&self, argv: &[&str], cwd: Option<&Path>) -> Result<CommandOutput> {
        self.run_with_timeout(argv, cwd, self.timeout).await
    }

    async fn run_with_timeout(
        &self,
        argv: &[&str],
        cwd: Option<&Path>,
        timeout: Duration,
    ) -> Result<CommandOutput> {
        let (program, args) = argv.split_first().ok_or_else(|| Error::Spawn {
            program: String::new(),
            source: std::io::Error::other("empty argv"),
        })?;

        let mut command = tokio::process::Command::new(program);
        command
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = cwd {
            command.current_dir(dir);
        }

        let mut child = command.spawn().map_err(|e| Error::Spawn {
            program: (*program).to_string(),
            source: e,
        })?;

        let stdout_handle = child.stdout.take();
        let stderr_handle = child.stderr.take();

        // Drain stdout/stderr CONCURRENTLY with wait() to avoid pipe
        // deadlock: a child writing more than the OS pipe buffer blocks on
        // write, and wait() alone would never resolve.
        tokio::select! {
            result = async {
                let (status, stdout, stderr) = tokio::join!(
                    child.wait(),
                    drain_tail(stdout_handle),
                    drain_tail(stderr_handle),
                );
                let status = status.map_err(|e| Error::Spawn {
                    program: (*program).to_string(),
                    source: e,
                })?;
                Ok(CommandOutput {
                    exit_code: status.code().unwrap_or(-1),
                    stdout: tail_chars(&stdout),
                    stderr: tail_chars(&stderr),
                })
            } => result,
            () = tokio::time::sleep(timeout) => {
                let _ = child.kill().await;
                tracing::warn!(
                    program,
                    timeout_secs = timeout.as_secs(),
                    "command timed out",
                );
                Ok(CommandOutput::timed_out(timeout))
            }
        }
    }
}

/// Read a stream to EOF, retaining only the last [`TAIL_BUF_BYTES`] bytes.
async fn drain_tail(stream: Option<impl AsyncRead + Unpin>) -> Vec<u8> {
    let Some(mut stream) = stream else {
        return Vec::new();
    };
    let mut kept = Vec::new();
    let mut chunk = [0u8; 8192];
    loop {
        match stream.read(&mut chunk).await {
            Ok(0) | Err(_) => break,
            Ok(n) => {
                kept.extend_from_slice(&chunk[..n]);
                if kept.len() > TAIL_BUF_BYTES {
                    kept.drain(..kept.len() - TAIL_BUF_BYTES);
                }
            }
        }
    }
    kept
}

/// Lossy-decode `bytes` and keep the last [`OUTPUT_TAIL_CHARS`] characters.
fn tail_chars(bytes: &[u8]) -> String {
    let text = String::from_utf8_lossy(bytes);
    let count = text.chars().count();
    if count <= OUTPUT_TAIL_CHARS {
        text.into_owned()
    } else {
        text.chars().skip(count - OUTPUT_TAIL_CHARS).collect()
    }
}
