//! Scripted remote-command host for the pooler health check.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use super::lock;
use crate::domain::ports::{
    CommandInvocation, CommandStatus, PingStatus, PoolerHostControl, PoolerHostControlError,
};

const COMMAND_ID: &str = "cmd-scripted";

/// Replays queued responses. When a queue has one entry left, that entry
/// repeats for every later call.
#[derive(Debug)]
pub struct ScriptedPoolerHost {
    pings: Mutex<VecDeque<Option<PingStatus>>>,
    invocations: Mutex<VecDeque<CommandInvocation>>,
    sent: Mutex<Vec<String>>,
}

impl Default for ScriptedPoolerHost {
    fn default() -> Self {
        Self::healthy()
    }
}

impl ScriptedPoolerHost {
    /// Online host whose check succeeds on the first poll.
    pub fn healthy() -> Self {
        Self {
            pings: Mutex::new(VecDeque::from([Some(PingStatus::Online)])),
            invocations: Mutex::new(VecDeque::from([CommandInvocation {
                status: CommandStatus::Success,
                stdout: "health check passed\n".to_owned(),
                stderr: String::new(),
            }])),
            sent: Mutex::new(Vec::new()),
        }
    }

    /// Host that never registers with the management agent.
    pub fn never_ready() -> Self {
        Self::healthy().with_pings([None])
    }

    pub fn with_pings(self, pings: impl IntoIterator<Item = Option<PingStatus>>) -> Self {
        *lock(&self.pings, "pooler host") = pings.into_iter().collect();
        self
    }

    pub fn with_invocations(self, invocations: impl IntoIterator<Item = CommandInvocation>) -> Self {
        *lock(&self.invocations, "pooler host") = invocations.into_iter().collect();
        self
    }

    /// Scripts passed to `send_command`.
    pub fn sent_scripts(&self) -> Vec<String> {
        lock(&self.sent, "pooler host").clone()
    }
}

fn next<T: Clone>(queue: &mut VecDeque<T>) -> Option<T> {
    if queue.len() > 1 {
        queue.pop_front()
    } else {
        queue.front().cloned()
    }
}

#[async_trait]
impl PoolerHostControl for ScriptedPoolerHost {
    async fn ping_status(
        &self,
        _instance_id: &str,
    ) -> Result<Option<PingStatus>, PoolerHostControlError> {
        Ok(next(&mut *lock(&self.pings, "pooler host")).flatten())
    }

    async fn send_command(
        &self,
        _instance_id: &str,
        script: &str,
        _timeout: Duration,
    ) -> Result<String, PoolerHostControlError> {
        lock(&self.sent, "pooler host").push(script.to_owned());
        Ok(COMMAND_ID.to_owned())
    }

    async fn command_invocation(
        &self,
        _instance_id: &str,
        command_id: &str,
    ) -> Result<CommandInvocation, PoolerHostControlError> {
        next(&mut *lock(&self.invocations, "pooler host"))
            .ok_or_else(|| PoolerHostControlError::invocation_does_not_exist(command_id))
    }
}
