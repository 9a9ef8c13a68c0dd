//! PgBouncer sizing, verification, and cut-over.
//!
//! The pooler is trusted only after [`PoolerHealthCheckService`] passes;
//! [`PoolerRollout`] enforces that the credentials secret is repointed
//! afterwards and never before.

mod config;
mod health_check;
mod rollout;
mod secret_sync;

pub use config::{PoolMode, PoolerConfig, PoolerConfigError, PoolerOverrides};
pub use health_check::{
    HEALTH_CHECK_SCRIPT, HealthCheckError, HealthCheckPolicy, HealthCheckReport,
    PoolerHealthCheckService,
};
pub use rollout::{DatabaseDependencies, PoolerRollout, RolloutError};
pub use secret_sync::{SecretHostRewriteService, SecretRewriteError};
