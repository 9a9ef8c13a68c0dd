//! Driven port for the remote-command service managing the pooler host.

use std::time::Duration;

use async_trait::async_trait;

use super::define_port_error;

/// Agent connectivity reported for a managed instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PingStatus {
    /// The agent is connected and accepts commands.
    Online,
    /// The agent lost its connection.
    ConnectionLost,
    /// The instance is not running.
    Inactive,
    /// Any status this crate does not model.
    Other(String),
}

impl PingStatus {
    /// Parse a service status string.
    ///
    /// # Examples
    /// ```
    /// use stac_backend::domain::ports::PingStatus;
    ///
    /// assert_eq!(PingStatus::parse("Online"), PingStatus::Online);
    /// assert_eq!(PingStatus::parse("Hibernating"), PingStatus::Other("Hibernating".into()));
    /// ```
    pub fn parse(raw: &str) -> Self {
        match raw {
            "Online" => Self::Online,
            "ConnectionLost" => Self::ConnectionLost,
            "Inactive" => Self::Inactive,
            other => Self::Other(other.to_owned()),
        }
    }

    /// Service spelling of the status.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Online => "Online",
            Self::ConnectionLost => "ConnectionLost",
            Self::Inactive => "Inactive",
            Self::Other(raw) => raw,
        }
    }
}

/// Lifecycle state of a command invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandStatus {
    Pending,
    InProgress,
    Delayed,
    Success,
    Failed,
    Cancelled,
    Cancelling,
    TimedOut,
    Other(String),
}

impl CommandStatus {
    /// Parse a service status string.
    pub fn parse(raw: &str) -> Self {
        match raw {
            "Pending" => Self::Pending,
            "InProgress" => Self::InProgress,
            "Delayed" => Self::Delayed,
            "Success" => Self::Success,
            "Failed" => Self::Failed,
            "Cancelled" => Self::Cancelled,
            "Cancelling" => Self::Cancelling,
            "TimedOut" => Self::TimedOut,
            other => Self::Other(other.to_owned()),
        }
    }

    /// Whether the invocation ended without success and will not recover.
    pub fn is_aborted(&self) -> bool {
        matches!(self, Self::Cancelled | Self::Cancelling | Self::TimedOut)
    }

    /// Service spelling of the status.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Pending => "Pending",
            Self::InProgress => "InProgress",
            Self::Delayed => "Delayed",
            Self::Success => "Success",
            Self::Failed => "Failed",
            Self::Cancelled => "Cancelled",
            Self::Cancelling => "Cancelling",
            Self::TimedOut => "TimedOut",
            Self::Other(raw) => raw,
        }
    }
}

/// Snapshot of one command invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandInvocation {
    /// Current status.
    pub status: CommandStatus,
    /// Captured standard output so far.
    pub stdout: String,
    /// Captured standard error so far.
    pub stderr: String,
}

define_port_error! {
    /// Errors raised by the remote-command adapter.
    pub enum PoolerHostControlError {
        /// The invocation is not registered yet; callers should poll again.
        InvocationDoesNotExist { command_id: String } =>
            "command invocation {command_id} does not exist yet",
        /// The request failed in transit.
        Transport { message: String } =>
            "remote command request failed: {message}",
        /// The service refused the request.
        Rejected { message: String } =>
            "remote command request rejected: {message}",
    }
}

/// Port over the instance management service.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PoolerHostControl: Send + Sync {
    /// Agent status for `instance_id`, or `None` when the instance is not
    /// registered.
    async fn ping_status(
        &self,
        instance_id: &str,
    ) -> Result<Option<PingStatus>, PoolerHostControlError>;

    /// Send a shell script for execution and return the command id.
    async fn send_command(
        &self,
        instance_id: &str,
        script: &str,
        timeout: Duration,
    ) -> Result<String, PoolerHostControlError>;

    /// Fetch the invocation state of `command_id` on `instance_id`.
    async fn command_invocation(
        &self,
        instance_id: &str,
        command_id: &str,
    ) -> Result<CommandInvocation, PoolerHostControlError>;
}
