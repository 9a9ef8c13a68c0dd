//! Driven port for administrative SQL used during first-time setup.

use async_trait::async_trait;

use super::define_port_error;
use crate::domain::DatabaseCredentials;

define_port_error! {
    /// Errors raised while running administrative statements.
    pub enum DatabaseBootstrapperError {
        /// A connection to the target database could not be opened.
        Connection { message: String } =>
            "bootstrap connection failed: {message}",
        /// A statement failed.
        Statement { message: String } =>
            "bootstrap statement failed: {message}",
    }
}

/// Port for running administrative statements against a database.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DatabaseBootstrapper: Send + Sync {
    /// Whether a database named `dbname` exists on the server behind
    /// `admin`.
    async fn database_exists(
        &self,
        admin: &DatabaseCredentials,
        dbname: &str,
    ) -> Result<bool, DatabaseBootstrapperError>;

    /// Whether a role named `role` exists on the server behind `admin`.
    async fn role_exists(
        &self,
        admin: &DatabaseCredentials,
        role: &str,
    ) -> Result<bool, DatabaseBootstrapperError>;

    /// Run `statements` in order on one connection to `target`.
    async fn execute(
        &self,
        target: &DatabaseCredentials,
        statements: &[String],
    ) -> Result<(), DatabaseBootstrapperError>;
}
