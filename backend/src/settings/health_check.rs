//! Settings for the pooler health check.

use std::time::Duration;

use ortho_config::OrthoConfig;
use serde::Deserialize;

use crate::domain::HealthCheckPolicy;

/// Bounds for [`HealthCheckPolicy`]; intervals are in seconds.
///
/// Defaults match [`HealthCheckPolicy::default`], so a deployment that sets
/// no `POOLER_HEALTH_*` variable gets the standard policy.
#[derive(Debug, Clone, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "POOLER_HEALTH")]
pub struct HealthCheckSettings {
    /// Ping status lookups before giving up on the instance.
    #[ortho_config(default = 32)]
    pub readiness_attempts: u32,
    #[ortho_config(default = 15)]
    pub readiness_interval_secs: u64,
    /// Execution timeout handed to the remote command.
    #[ortho_config(default = 600)]
    pub command_timeout_secs: u64,
    #[ortho_config(default = 60)]
    pub command_poll_attempts: u32,
    #[ortho_config(default = 10)]
    pub command_poll_interval_secs: u64,
}

impl HealthCheckSettings {
    /// Build the policy. Zero attempt counts fall back to the defaults.
    pub fn policy(&self) -> HealthCheckPolicy {
        let defaults = HealthCheckPolicy::default();
        let attempts = |configured: u32, default: u32| {
            if configured == 0 { default } else { configured }
        };
        HealthCheckPolicy {
            readiness_attempts: attempts(self.readiness_attempts, defaults.readiness_attempts),
            readiness_interval: Duration::from_secs(self.readiness_interval_secs),
            command_timeout: Duration::from_secs(self.command_timeout_secs),
            command_poll_attempts: attempts(
                self.command_poll_attempts,
                defaults.command_poll_attempts,
            ),
            command_poll_interval: Duration::from_secs(self.command_poll_interval_secs),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::OsString;

    use env_lock::lock_env;
    use rstest::rstest;

    const VARIABLES: [&str; 5] = [
        "POOLER_HEALTH_READINESS_ATTEMPTS",
        "POOLER_HEALTH_READINESS_INTERVAL_SECS",
        "POOLER_HEALTH_COMMAND_TIMEOUT_SECS",
        "POOLER_HEALTH_COMMAND_POLL_ATTEMPTS",
        "POOLER_HEALTH_COMMAND_POLL_INTERVAL_SECS",
    ];

    fn load() -> HealthCheckSettings {
        HealthCheckSettings::load_from_iter([OsString::from("pooler-health")])
            .expect("config should load")
    }

    #[rstest]
    fn unset_values_keep_default_policy() {
        let _guard = lock_env(VARIABLES.map(|name| (name, None::<String>)));

        assert_eq!(load().policy(), HealthCheckPolicy::default());
    }

    #[rstest]
    fn overrides_replace_individual_bounds() {
        let _guard = lock_env([
            ("POOLER_HEALTH_READINESS_ATTEMPTS", Some("5".to_owned())),
            ("POOLER_HEALTH_READINESS_INTERVAL_SECS", None),
            ("POOLER_HEALTH_COMMAND_TIMEOUT_SECS", None),
            ("POOLER_HEALTH_COMMAND_POLL_ATTEMPTS", Some("0".to_owned())),
            ("POOLER_HEALTH_COMMAND_POLL_INTERVAL_SECS", Some("3".to_owned())),
        ]);

        let policy = load().policy();

        assert_eq!(policy.readiness_attempts, 5);
        assert_eq!(policy.readiness_interval, Duration::from_secs(15));
        assert_eq!(policy.command_poll_attempts, 60);
        assert_eq!(policy.command_poll_interval, Duration::from_secs(3));
    }
}
