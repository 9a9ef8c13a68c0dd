//! Runs stactools item commands in a throwaway working directory.

use std::future::Future;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tempfile::TempDir;
use tokio::process::Command;
use tracing::{debug, info};

use crate::domain::ItemCommand;
use crate::domain::ports::{ItemCommandRunner, ItemCommandRunnerError};

/// Executes [`ItemCommand`]s with `tokio::process`.
///
/// Each run gets its own temporary directory, removed when the run ends, so
/// concurrent invocations never share output files.
#[derive(Debug, Clone, Default)]
pub struct UvxItemCommandRunner {
    program_override: Option<String>,
    timeout: Option<Duration>,
}

impl UvxItemCommandRunner {
    /// Create a runner that uses the command's own program.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the launcher, e.g. with an absolute path to `uvx`.
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program_override = Some(program.into());
        self
    }

    /// Kill commands that run longer than `timeout`.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

async fn bounded<F: Future>(
    timeout: Option<Duration>,
    future: F,
) -> Result<F::Output, ItemCommandRunnerError> {
    match timeout {
        Some(limit) => tokio::time::timeout(limit, future)
            .await
            .map_err(|_| ItemCommandRunnerError::timed_out(limit.as_secs())),
        None => Ok(future.await),
    }
}

async fn read_output(workdir: &Path, output_path: &Path) -> Result<Value, ItemCommandRunnerError> {
    let path = workdir.join(output_path);
    let raw = tokio::fs::read(&path).await.map_err(|err| {
        ItemCommandRunnerError::output(format!("{}: {err}", path.display()))
    })?;
    serde_json::from_slice(&raw)
        .map_err(|err| ItemCommandRunnerError::output(format!("{}: {err}", path.display())))
}

#[async_trait]
impl ItemCommandRunner for UvxItemCommandRunner {
    async fn run(&self, command: &ItemCommand) -> Result<Value, ItemCommandRunnerError> {
        let workdir = TempDir::new().map_err(|err| ItemCommandRunnerError::spawn(err.to_string()))?;
        let program = self.program_override.as_deref().unwrap_or(command.program());

        info!(%command, "running item command");
        let child = Command::new(program)
            .args(command.args())
            .current_dir(workdir.path())
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output();
        let output = bounded(self.timeout, child)
            .await?
            .map_err(|err| ItemCommandRunnerError::spawn(format!("{program}: {err}")))?;

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
        if !output.status.success() {
            return Err(ItemCommandRunnerError::exit(output.status.code(), stdout, stderr));
        }
        debug!(%stdout, "item command finished");

        read_output(workdir.path(), command.output_path()).await
    }
}
