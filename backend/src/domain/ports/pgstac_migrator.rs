//! Driven port for migrating the pgstac schema.

use async_trait::async_trait;

use super::define_port_error;
use crate::domain::DatabaseCredentials;

define_port_error! {
    /// Errors raised by the schema migrator.
    pub enum PgstacMigratorError {
        /// The migration tool could not be started.
        Spawn { message: String } =>
            "failed to start pgstac migration: {message}",
        /// The migration tool reported failure.
        Failed { status: Option<i32>, stderr: String } =>
            "pgstac migration exited with status {status:?}: {stderr}",
    }
}

/// Port for bringing the pgstac schema to a given version.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PgstacMigrator: Send + Sync {
    /// Migrate the database behind `target` to `version`.
    async fn migrate(
        &self,
        target: &DatabaseCredentials,
        version: &str,
    ) -> Result<(), PgstacMigratorError>;
}
