//! Test script execution.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::{Duration, Instant};

use revhunt_core::{Result, RevhuntError};
use serde::{Deserialize, Serialize};
use tokio::process::Command;
use tracing::debug;

/// Configuration for a test script invocation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScriptConfig {
    /// Human-readable script name.
    pub name: String,

    /// Command to execute (first element is executable).
    pub command: Vec<String>,

    /// Working directory; inherits the current one when `None`.
    pub working_dir: Option<PathBuf>,

    /// Timeout in seconds (0 = wait indefinitely).
    pub timeout_secs: u64,
}

impl ScriptConfig {
    /// Create a script configuration.
    pub fn custom(name: impl Into<String>, command: Vec<String>) -> Self {
        Self {
            name: name.into(),
            command,
            working_dir: None,
            timeout_secs: 0,
        }
    }

    pub fn in_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    pub fn with_timeout_secs(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    /// Same script with `arg` appended to the command line.
    pub fn with_arg(&self, arg: impl Into<String>) -> Self {
        let mut config = self.clone();
        config.command.push(arg.into());
        config
    }
}

/// Result of a script execution.
#[derive(Debug, Clone)]
pub struct ScriptResult {
    /// Script name.
    pub name: String,

    /// Exit code (-1 when terminated by a signal).
    pub exit_code: i32,

    /// Captured stdout.
    pub stdout: String,

    /// Captured stderr.
    pub stderr: String,

    /// Duration in milliseconds.
    pub duration_ms: u64,

    /// Whether the process exited successfully.
    pub success: bool,
}

impl ScriptResult {
    /// Whether this script passed (exit code 0).
    pub fn passed(&self) -> bool {
        self.success && self.exit_code == 0
    }
}

/// Runs test scripts as child processes.
pub struct ScriptRunner;

impl ScriptRunner {
    /// Execute a script and wait for it to exit.
    ///
    /// A non-zero exit is a normal result. Failing to spawn the process or
    /// hitting the timeout is a `RevhuntError::Validator`.
    pub async fn execute(config: &ScriptConfig) -> Result<ScriptResult> {
        let start = Instant::now();

        let Some((exe, args)) = config.command.split_first() else {
            return Err(RevhuntError::Validator(format!(
                "script {} has empty command",
                config.name
            )));
        };

        let mut command = Command::new(exe);
        command
            .args(args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = &config.working_dir {
            command.current_dir(dir);
        }

        let child = command.spawn().map_err(|e| {
            RevhuntError::Validator(format!("failed to spawn script {}: {e}", config.name))
        })?;

        let output = if config.timeout_secs > 0 {
            tokio::time::timeout(
                Duration::from_secs(config.timeout_secs),
                child.wait_with_output(),
            )
            .await
            .map_err(|_| {
                RevhuntError::Validator(format!(
                    "script {} timed out after {} seconds",
                    config.name, config.timeout_secs
                ))
            })??
        } else {
            child.wait_with_output().await?
        };

        let duration_ms = start.elapsed().as_millis() as u64;
        let exit_code = output.status.code().unwrap_or(-1);
        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();
        debug!(
            script = %config.name,
            exit_code,
            duration_ms,
            %stdout,
            %stderr,
            "script finished"
        );

        Ok(ScriptResult {
            name: config.name.clone(),
            exit_code,
            stdout,
            stderr,
            duration_ms,
            success: output.status.success(),
        })
    }
}
