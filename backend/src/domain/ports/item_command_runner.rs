//! Driven port for running a stactools item-creation command.

use async_trait::async_trait;
use serde_json::Value;

use super::define_port_error;
use crate::domain::ItemCommand;

define_port_error! {
    /// Errors raised while running an item command.
    pub enum ItemCommandRunnerError {
        /// The process could not be started.
        Spawn { message: String } =>
            "failed to start item command: {message}",
        /// The process exited unsuccessfully.
        Exit { status: Option<i32>, stdout: String, stderr: String } =>
            "item command exited with status {status:?}: {stderr}",
        /// The process outlived its time budget and was killed.
        TimedOut { seconds: u64 } =>
            "item command timed out after {seconds}s",
        /// The process succeeded but its output file is unusable.
        Output { message: String } =>
            "item command output is invalid: {message}",
    }
}

/// Port for executing item-generation commands in isolation.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ItemCommandRunner: Send + Sync {
    /// Run `command` and return the JSON document it wrote.
    async fn run(&self, command: &ItemCommand) -> Result<Value, ItemCommandRunnerError>;
}
