//! Ordering between the pooler health check and the secret rewrite.

use tracing::info;

use super::{HealthCheckError, PoolerHealthCheckService, SecretHostRewriteService, SecretRewriteError};
use crate::domain::DatabaseCredentials;
use crate::domain::ports::{PoolerHostControl, SecretStore};

/// What downstream services connect through.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatabaseDependencies {
    /// Clients connect straight to the database.
    Direct { credentials: DatabaseCredentials },
    /// Clients connect through a verified pooler.
    Pooled {
        pooler_host: String,
        credentials: DatabaseCredentials,
    },
}

impl DatabaseDependencies {
    /// Host that consumers should connect to.
    ///
    /// # Examples
    /// ```
    /// use stac_backend::domain::{DatabaseCredentials, DatabaseDependencies};
    ///
    /// let credentials = DatabaseCredentials::from_secret_string(
    ///     r#"{"dbname":"postgis","port":5432,"host":"db","username":"u","password":"p"}"#,
    /// )
    /// .expect("valid");
    /// let direct = DatabaseDependencies::Direct { credentials };
    /// assert_eq!(direct.connection_host(), "db");
    /// ```
    pub fn connection_host(&self) -> &str {
        match self {
            Self::Direct { credentials } => &credentials.host,
            Self::Pooled { pooler_host, .. } => pooler_host,
        }
    }

    pub fn credentials(&self) -> &DatabaseCredentials {
        match self {
            Self::Direct { credentials } | Self::Pooled { credentials, .. } => credentials,
        }
    }

    pub fn is_pooled(&self) -> bool {
        matches!(self, Self::Pooled { .. })
    }
}

/// Rollout failure, tagged with the step that failed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RolloutError {
    #[error("PgBouncer health check failed: {0}")]
    HealthCheck(#[from] HealthCheckError),
    #[error("pooler secret update failed: {0}")]
    SecretRewrite(#[from] SecretRewriteError),
}

/// Runs the health check and only then repoints the credentials secret.
pub struct PoolerRollout<H, S> {
    health: PoolerHealthCheckService<H>,
    secrets: SecretHostRewriteService<S>,
    source_secret: String,
    target_secret: String,
}

impl<H, S> PoolerRollout<H, S>
where
    H: PoolerHostControl,
    S: SecretStore,
{
    pub fn new(
        health: PoolerHealthCheckService<H>,
        secrets: SecretHostRewriteService<S>,
        source_secret: impl Into<String>,
        target_secret: impl Into<String>,
    ) -> Self {
        Self {
            health,
            secrets,
            source_secret: source_secret.into(),
            target_secret: target_secret.into(),
        }
    }

    /// Verify the pooler on `instance_id`, then rewrite the secret to use
    /// `pooler_host`.
    pub async fn complete(
        &self,
        instance_id: &str,
        pooler_host: &str,
    ) -> Result<DatabaseDependencies, RolloutError> {
        self.health.check(instance_id).await?;
        let credentials = self
            .secrets
            .rewrite_host(&self.source_secret, &self.target_secret, pooler_host)
            .await?;
        info!(instance_id, pooler_host, "pooler rollout complete");
        Ok(DatabaseDependencies::Pooled {
            pooler_host: pooler_host.to_owned(),
            credentials,
        })
    }
}
