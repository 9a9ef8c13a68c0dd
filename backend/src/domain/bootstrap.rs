//! First-time setup of the catalogue database.
//!
//! Runs as the administrative role: creates the catalogue database and the
//! application role, installs PostGIS and pgstac, and grants the
//! application role the pgstac roles. Every step is idempotent so the
//! bootstrap can run again on stack updates.

use std::sync::Arc;

use tracing::info;

use crate::domain::ports::{
    DatabaseBootstrapper, DatabaseBootstrapperError, PgstacMigrator, PgstacMigratorError,
    SecretStore, SecretStoreError,
};
use crate::domain::{DatabaseCredentials, Error};

const PGSTAC_ROLES: [&str; 3] = ["pgstac_read", "pgstac_ingest", "pgstac_admin"];

/// Inputs for one bootstrap run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootstrapRequest {
    /// Secret holding the administrative credentials.
    pub admin_secret: String,
    /// Secret holding the application role and catalogue database name.
    pub user_secret: String,
    /// pgstac schema version to migrate to.
    pub pgstac_version: String,
    /// Enable pgstac search context (result counts).
    pub context: bool,
    /// Index searches registered as mosaics.
    pub mosaic_index: bool,
}

/// What the run changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootstrapReport {
    pub dbname: String,
    pub username: String,
    pub database_created: bool,
    pub role_created: bool,
}

/// Quote an SQL identifier, doubling embedded double quotes.
///
/// # Examples
/// ```
/// use stac_backend::domain::quote_identifier;
///
/// assert_eq!(quote_identifier("pgstac_user"), "\"pgstac_user\"");
/// assert_eq!(quote_identifier("we\"ird"), "\"we\"\"ird\"");
/// ```
pub fn quote_identifier(identifier: &str) -> String {
    format!("\"{}\"", identifier.replace('"', "\"\""))
}

/// Quote an SQL string literal, doubling embedded single quotes.
///
/// # Examples
/// ```
/// use stac_backend::domain::quote_literal;
///
/// assert_eq!(quote_literal("it's"), "'it''s'");
/// ```
pub fn quote_literal(literal: &str) -> String {
    format!("'{}'", literal.replace('\'', "''"))
}

fn role_statement(username: &str, password: &str, exists: bool) -> String {
    let verb = if exists { "ALTER" } else { "CREATE" };
    format!(
        "{verb} USER {} WITH PASSWORD {}",
        quote_identifier(username),
        quote_literal(password)
    )
}

fn grant_statements(dbname: &str, username: &str) -> Vec<String> {
    let db = quote_identifier(dbname);
    let user = quote_identifier(username);
    let mut statements = vec![
        format!("GRANT CONNECT ON DATABASE {db} TO {user}"),
        format!("GRANT CREATE ON DATABASE {db} TO {user}"),
        format!("GRANT USAGE ON SCHEMA public TO {user}"),
        format!("ALTER DEFAULT PRIVILEGES IN SCHEMA public GRANT ALL PRIVILEGES ON TABLES TO {user}"),
        format!(
            "ALTER DEFAULT PRIVILEGES IN SCHEMA public GRANT ALL PRIVILEGES ON SEQUENCES TO {user}"
        ),
    ];
    statements.extend(
        PGSTAC_ROLES
            .iter()
            .map(|role| format!("GRANT {role} TO {user}")),
    );
    statements
}

fn customization_statements(context: bool, mosaic_index: bool) -> Vec<String> {
    let mut statements = Vec::new();
    if context {
        statements.push(
            "INSERT INTO pgstac_settings (name, value) VALUES ('context', 'on') \
             ON CONFLICT ON CONSTRAINT pgstac_settings_pkey DO UPDATE SET value = excluded.value"
                .to_owned(),
        );
    }
    if mosaic_index {
        statements.push(
            "CREATE INDEX IF NOT EXISTS searches_mosaic ON searches ((true)) \
             WHERE metadata->>'type'='mosaic'"
                .to_owned(),
        );
    }
    statements
}

/// Domain service performing the bootstrap.
#[derive(Clone)]
pub struct DatabaseBootstrapService<B, S, M> {
    bootstrapper: Arc<B>,
    secrets: Arc<S>,
    migrator: Arc<M>,
}

impl<B, S, M> DatabaseBootstrapService<B, S, M>
where
    B: DatabaseBootstrapper,
    S: SecretStore,
    M: PgstacMigrator,
{
    pub fn new(bootstrapper: Arc<B>, secrets: Arc<S>, migrator: Arc<M>) -> Self {
        Self {
            bootstrapper,
            secrets,
            migrator,
        }
    }

    pub async fn bootstrap(&self, request: &BootstrapRequest) -> Result<BootstrapReport, Error> {
        if request.pgstac_version.trim().is_empty() {
            return Err(Error::invalid_request("pgstac_version must not be empty"));
        }
        let admin = self.read_credentials(&request.admin_secret).await?;
        let user = self.read_credentials(&request.user_secret).await?;

        let database_created = !self
            .bootstrapper
            .database_exists(&admin, &user.dbname)
            .await
            .map_err(map_bootstrapper_error)?;
        if database_created {
            info!(dbname = %user.dbname, "creating catalogue database");
            self.run(
                &admin,
                vec![format!("CREATE DATABASE {}", quote_identifier(&user.dbname))],
            )
            .await?;
        }

        let role_exists = self
            .bootstrapper
            .role_exists(&admin, &user.username)
            .await
            .map_err(map_bootstrapper_error)?;
        info!(username = %user.username, role_exists, "ensuring application role");
        self.run(
            &admin,
            vec![role_statement(&user.username, &user.password, role_exists)],
        )
        .await?;

        let catalogue_admin = admin.with_dbname(&user.dbname);
        self.run(
            &catalogue_admin,
            vec!["CREATE EXTENSION IF NOT EXISTS postgis".to_owned()],
        )
        .await?;

        info!(version = %request.pgstac_version, "migrating pgstac");
        self.migrator
            .migrate(&catalogue_admin, &request.pgstac_version)
            .await
            .map_err(map_migrator_error)?;

        let mut statements = vec!["SET search_path TO pgstac, public".to_owned()];
        statements.extend(grant_statements(&user.dbname, &user.username));
        statements.extend(customization_statements(request.context, request.mosaic_index));
        self.run(&catalogue_admin, statements).await?;

        let application = DatabaseCredentials {
            host: admin.host.clone(),
            port: admin.port,
            ..user.clone()
        };
        self.run(&application, vec!["SELECT pgstac.get_version()".to_owned()])
            .await?;
        info!(dbname = %user.dbname, "application role can reach pgstac");

        Ok(BootstrapReport {
            dbname: user.dbname,
            username: user.username,
            database_created,
            role_created: !role_exists,
        })
    }

    async fn read_credentials(&self, secret_id: &str) -> Result<DatabaseCredentials, Error> {
        let raw = self
            .secrets
            .get_secret_string(secret_id)
            .await
            .map_err(map_secret_error)?;
        DatabaseCredentials::from_secret_string(&raw)
            .map_err(|err| Error::invalid_request(format!("secret {secret_id}: {err}")))
    }

    async fn run(&self, target: &DatabaseCredentials, statements: Vec<String>) -> Result<(), Error> {
        self.bootstrapper
            .execute(target, &statements)
            .await
            .map_err(map_bootstrapper_error)
    }
}

fn map_secret_error(error: SecretStoreError) -> Error {
    match error {
        SecretStoreError::NotFound { secret_id } => {
            Error::not_found(format!("secret {secret_id} was not found"))
        }
        SecretStoreError::Empty { secret_id } => {
            Error::invalid_request(format!("secret {secret_id} is empty"))
        }
        SecretStoreError::Transport { message } => {
            Error::service_unavailable(format!("failed to read secret: {message}"))
        }
    }
}

fn map_bootstrapper_error(error: DatabaseBootstrapperError) -> Error {
    match error {
        DatabaseBootstrapperError::Connection { message } => {
            Error::service_unavailable(format!("bootstrap connection failed: {message}"))
        }
        DatabaseBootstrapperError::Statement { message } => {
            Error::internal(format!("bootstrap statement failed: {message}"))
        }
    }
}

fn map_migrator_error(error: PgstacMigratorError) -> Error {
    Error::internal(error.to_string())
}

#[cfg(test)]
#[path = "bootstrap_tests.rs"]
mod tests;
