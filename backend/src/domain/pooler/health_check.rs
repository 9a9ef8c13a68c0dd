//! Two-phase health check of the pooler host.
//!
//! Phase one waits for the management agent on the instance to report
//! `Online`. Phase two runs [`HEALTH_CHECK_SCRIPT`] remotely and polls the
//! invocation until it settles. Both loops are bounded by
//! [`HealthCheckPolicy`].

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::domain::PollSleeper;
use crate::domain::ports::{CommandStatus, PingStatus, PoolerHostControl, PoolerHostControlError};

/// Shell script run on the pooler host. It exits non-zero when PgBouncer
/// is not serving.
pub const HEALTH_CHECK_SCRIPT: &str = r#"#!/bin/bash
set -euo pipefail

if [ -f /var/log/pgbouncer-setup-complete ]; then
  echo "setup marker present"
else
  echo "setup has not completed" >&2
  exit 1
fi

systemctl is-active --quiet pgbouncer || { echo "pgbouncer service is not active" >&2; exit 1; }
echo "pgbouncer service is active"

ss -ltn | grep -q ':5432 ' || { echo "pgbouncer is not listening on 5432" >&2; exit 1; }
echo "pgbouncer is listening on 5432"

test -s /etc/pgbouncer/pgbouncer.ini || { echo "pgbouncer.ini is missing" >&2; exit 1; }
test -s /etc/pgbouncer/userlist.txt || { echo "userlist.txt is missing" >&2; exit 1; }
echo "configuration files present"

echo "health check passed"
"#;

/// Bounds for both phases.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HealthCheckPolicy {
    /// Ping status lookups before the instance counts as not ready.
    pub readiness_attempts: u32,
    /// Pause between ping status lookups.
    pub readiness_interval: Duration,
    /// Execution timeout handed to the remote command.
    pub command_timeout: Duration,
    /// Invocation lookups before the check counts as timed out.
    pub command_poll_attempts: u32,
    /// Pause before each invocation lookup.
    pub command_poll_interval: Duration,
}

impl Default for HealthCheckPolicy {
    fn default() -> Self {
        Self {
            readiness_attempts: 32,
            readiness_interval: Duration::from_secs(15),
            command_timeout: Duration::from_secs(600),
            command_poll_attempts: 60,
            command_poll_interval: Duration::from_secs(10),
        }
    }
}

/// Successful health check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HealthCheckReport {
    pub instance_id: String,
    /// Remote command identifier, useful for looking up the full output.
    pub command_id: String,
    /// Script output from the successful run.
    pub stdout: String,
}

/// Fatal health check outcomes.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HealthCheckError {
    /// The management agent never reported `Online`. `last_observation`
    /// is the final ping status or readiness error.
    #[error(
        "instance {instance_id} did not become ready for remote commands after {attempts} attempts (last observation: {last_observation})"
    )]
    PoolerNotReady {
        instance_id: String,
        attempts: u32,
        last_observation: String,
    },
    /// The script exited non-zero. Output is kept out of the message so
    /// callers decide how much of it to show.
    #[error("health check command failed")]
    HealthCheckFailed { stderr: String, stdout: String },
    #[error("health check {status}")]
    HealthCheckAborted { status: String },
    #[error("health check timed out waiting for command completion after {polls} polls")]
    HealthCheckTimedOut {
        polls: u32,
        stdout: String,
        stderr: String,
    },
    #[error("health check error: {0}")]
    Remote(#[from] PoolerHostControlError),
}

/// Domain service running the pooler health check.
#[derive(Clone)]
pub struct PoolerHealthCheckService<H> {
    host: Arc<H>,
    sleeper: Arc<dyn PollSleeper>,
    policy: HealthCheckPolicy,
}

impl<H> PoolerHealthCheckService<H>
where
    H: PoolerHostControl,
{
    pub fn new(host: Arc<H>, sleeper: Arc<dyn PollSleeper>, policy: HealthCheckPolicy) -> Self {
        Self {
            host,
            sleeper,
            policy,
        }
    }

    /// Wait for the instance, run the check script, and report its output.
    pub async fn check(&self, instance_id: &str) -> Result<HealthCheckReport, HealthCheckError> {
        self.wait_until_ready(instance_id).await?;
        self.run_check(instance_id).await
    }

    async fn wait_until_ready(&self, instance_id: &str) -> Result<(), HealthCheckError> {
        let attempts = self.policy.readiness_attempts;
        let mut last_observation = String::from("no readiness check ran");
        for attempt in 1..=attempts {
            match self.host.ping_status(instance_id).await {
                Ok(Some(PingStatus::Online)) => {
                    info!(instance_id, attempt, "instance is ready for remote commands");
                    return Ok(());
                }
                Ok(Some(status)) => {
                    info!(instance_id, attempt, attempts, ?status, "instance not online yet");
                    last_observation = format!("ping status {}", status.as_str());
                }
                Ok(None) => {
                    info!(instance_id, attempt, attempts, "instance not registered yet");
                    last_observation = String::from("instance not registered");
                }
                Err(error) => {
                    warn!(instance_id, attempt, attempts, %error, "readiness check failed");
                    last_observation = error.to_string();
                }
            }
            if attempt < attempts {
                self.sleeper.sleep(self.policy.readiness_interval).await;
            }
        }
        Err(HealthCheckError::PoolerNotReady {
            instance_id: instance_id.to_owned(),
            attempts,
            last_observation,
        })
    }

    async fn run_check(&self, instance_id: &str) -> Result<HealthCheckReport, HealthCheckError> {
        let command_id = self
            .host
            .send_command(instance_id, HEALTH_CHECK_SCRIPT, self.policy.command_timeout)
            .await?;
        info!(instance_id, command_id, "health check command sent");

        let mut last_stdout = String::new();
        let mut last_stderr = String::new();
        for poll in 1..=self.policy.command_poll_attempts {
            self.sleeper.sleep(self.policy.command_poll_interval).await;

            let invocation = match self.host.command_invocation(instance_id, &command_id).await {
                Ok(invocation) => invocation,
                Err(PoolerHostControlError::InvocationDoesNotExist { .. }) => {
                    debug!(command_id, poll, "command invocation not available yet");
                    continue;
                }
                Err(error) => return Err(error.into()),
            };

            match invocation.status {
                CommandStatus::Success => {
                    info!(instance_id, command_id, "health check passed");
                    return Ok(HealthCheckReport {
                        instance_id: instance_id.to_owned(),
                        command_id,
                        stdout: invocation.stdout,
                    });
                }
                CommandStatus::Failed => {
                    return Err(HealthCheckError::HealthCheckFailed {
                        stderr: invocation.stderr,
                        stdout: invocation.stdout,
                    });
                }
                status if status.is_aborted() => {
                    return Err(HealthCheckError::HealthCheckAborted {
                        status: status.as_str().to_lowercase(),
                    });
                }
                status => {
                    debug!(command_id, poll, status = status.as_str(), "command still running");
                    last_stdout = invocation.stdout;
                    last_stderr = invocation.stderr;
                }
            }
        }

        Err(HealthCheckError::HealthCheckTimedOut {
            polls: self.policy.command_poll_attempts,
            stdout: last_stdout,
            stderr: last_stderr,
        })
    }
}

#[cfg(test)]
#[path = "health_check_tests.rs"]
mod tests;
