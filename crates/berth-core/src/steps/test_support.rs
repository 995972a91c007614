//! Shared test helpers for step and workflow tests.
//!
//! Provides a scripted [`CommandRunner`] stub that records every
//! invocation, and a small registry builder pointed at temp directories.

#![allow(clippy::unwrap_used)]

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use crate::config::Registry;
use crate::error::{Error, Result};
use crate::exec::{CommandOutput, CommandRunner, DEFAULT_COMMAND_TIMEOUT};

pub(crate) fn output(exit_code: i32, stdout: &str, stderr: &str) -> CommandOutput {
    CommandOutput {
        exit_code,
        stdout: stdout.into(),
        stderr: stderr.into(),
    }
}

/// Scripted [`CommandRunner`]: pops canned outputs in order, then falls
/// back to exit 0 (or exit 1 for a designated failing program). Records
/// `(argv, cwd)` for every call.
pub(crate) struct StubRunner {
    script: Mutex<VecDeque<CommandOutput>>,
    fail_program: Option<String>,
    spawn_error_prefix: Option<Vec<String>>,
    calls: Mutex<Vec<(Vec<String>, Option<PathBuf>)>>,
}

impl StubRunner {
    fn with(
        script: impl IntoIterator<Item = CommandOutput>,
        fail_program: Option<String>,
        spawn_error_prefix: Option<Vec<String>>,
    ) -> Self {
        Self {
            script: Mutex::new(script.into_iter().collect()),
            fail_program,
            spawn_error_prefix,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Every command exits 0.
    pub fn ok() -> Self {
        Self::with([], None, None)
    }

    /// Replay `outputs` in order, then exit 0.
    pub fn scripted(outputs: impl IntoIterator<Item = CommandOutput>) -> Self {
        Self::with(outputs, None, None)
    }

    /// Commands whose program matches exit 1; everything else exits 0.
    pub fn failing_on(program: &str) -> Self {
        Self::with([], Some(program.to_string()), None)
    }

    /// Every command fails to launch.
    pub fn failing_to_spawn() -> Self {
        Self::failing_to_spawn_on(&[])
    }

    /// Commands whose argv starts with `prefix` fail to launch; everything
    /// else exits 0.
    pub fn failing_to_spawn_on(prefix: &[&str]) -> Self {
        Self::with(
            [],
            None,
            Some(prefix.iter().map(ToString::to_string).collect()),
        )
    }

    pub fn calls(&self) -> Vec<(Vec<String>, Option<PathBuf>)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn argvs(&self) -> Vec<Vec<String>> {
        self.calls().into_iter().map(|(argv, _)| argv).collect()
    }
}

impl CommandRunner for StubRunner {
    async fn run(&self, argv: &[&str], cwd: Option<&Path>) -> Result<CommandOutput> {
        self.run_with_timeout(argv, cwd, DEFAULT_COMMAND_TIMEOUT)
            .await
    }

    async fn run_with_timeout(
        &self,
        argv: &[&str],
        cwd: Option<&Path>,
        _timeout: Duration,
    ) -> Result<CommandOutput> {
        self.calls.lock().unwrap().push((
            argv.iter().map(ToString::to_string).collect(),
            cwd.map(Path::to_path_buf),
        ));
        let spawn_fails = self
            .spawn_error_prefix
            .as_deref()
            .is_some_and(|prefix| argv.len() >= prefix.len() && argv[..prefix.len()] == *prefix);
        if spawn_fails {
            return Err(Error::Spawn {
                program: argv.first().map_or_else(String::new, ToString::to_string),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "stubbed"),
            });
        }
        if let Some(next) = self.script.lock().unwrap().pop_front() {
            return Ok(next);
        }
        if self.fail_program.as_deref() == argv.first().copied() {
            return Ok(output(1, "", "unit failed"));
        }
        Ok(output(0, "ok", ""))
    }
}

/// Registry with a single application `alpha` rooted in temp directories.
pub(crate) fn alpha_registry(
    base_repo_dir: &Path,
    deploy_dir: &Path,
    artifact_pattern: &str,
    stable_link_name: Option<&str>,
) -> Registry {
    let link = stable_link_name
        .map(|name| format!("    stable_link_name: {name}\n"))
        .unwrap_or_default();
    let yaml = format!(
        "base_repo_dir: {}\n\
         applications:\n\
         \x20 alpha:\n\
         \x20   git_url: https://example.invalid/alpha.git\n\
         \x20   branch: main\n\
         \x20   build: maven\n\
         \x20   artifact_pattern: {artifact_pattern}\n\
         \x20   service_name: alpha\n\
         \x20   deploy_dir: {}\n\
         {link}",
        base_repo_dir.display(),
        deploy_dir.display(),
    );
    Registry::from_yaml(&yaml).unwrap()
}
