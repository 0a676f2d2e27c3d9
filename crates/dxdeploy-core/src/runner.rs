//! External test runner invocation.

use std::path::Path;

use async_trait::async_trait;
use tokio::process::Command;

use crate::error::RunnerError;

/// Captured result of a test runner invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestRun {
    /// Whether the runner exited with status zero.
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
    /// Exit code, `None` when the process was killed by a signal.
    pub exit_code: Option<i32>,
}

/// Runs the test specs matched by a glob pattern.
#[async_trait]
pub trait TestRunner: Send + Sync {
    async fn run(&self, pattern: &str) -> Result<TestRun, RunnerError>;
}

/// Glob matching every `.js` test file below `<dir>/<source>`.
#[must_use]
pub fn test_glob(dir: &Path, source: &Path) -> String {
    let base = dir.join(source);
    let base = base.to_string_lossy();
    format!("{}/**/*.js", base.trim_end_matches('/'))
}

/// Spawns a command line with the glob appended as its last argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandTestRunner {
    program: String,
    args: Vec<String>,
}

impl CommandTestRunner {
    /// Builds a runner from a whitespace separated command line.
    pub fn from_command_line(command: &str) -> Result<Self, RunnerError> {
        let mut parts = command.split_whitespace().map(str::to_string);
        let program = parts.next().ok_or(RunnerError::NoCommand)?;
        Ok(Self {
            program,
            args: parts.collect(),
        })
    }

    /// The full command line, for logging.
    #[must_use]
    pub fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[async_trait]
impl TestRunner for CommandTestRunner {
    async fn run(&self, pattern: &str) -> Result<TestRun, RunnerError> {
        let output = Command::new(&self.program)
            .args(&self.args)
            .arg(pattern)
            .output()
            .await
            .map_err(|source| RunnerError::Spawn {
                command: self.command_line(),
                source,
            })?;

        Ok(TestRun {
            success: output.status.success(),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            exit_code: output.status.code(),
        })
    }
}
