//! Administrative SQL adapter used during first-time database setup.
//!
//! Bootstrap statements include `CREATE DATABASE`, which PostgreSQL refuses
//! inside a transaction block, so each call opens a dedicated connection and
//! runs statements one at a time without a pool.

use async_trait::async_trait;
use diesel::QueryableByName;
use diesel::sql_query;
use diesel::sql_types::{Bool, Text};
use diesel_async::{AsyncConnection, AsyncPgConnection, RunQueryDsl, SimpleAsyncConnection};
use tracing::debug;

use crate::domain::DatabaseCredentials;
use crate::domain::ports::{DatabaseBootstrapper, DatabaseBootstrapperError};

const DATABASE_EXISTS_SQL: &str =
    "SELECT EXISTS (SELECT 1 FROM pg_database WHERE datname = $1) AS exists";
const ROLE_EXISTS_SQL: &str = "SELECT EXISTS (SELECT 1 FROM pg_roles WHERE rolname = $1) AS exists";

#[derive(QueryableByName)]
struct ExistsRow {
    #[diesel(sql_type = Bool)]
    exists: bool,
}

/// Diesel-backed implementation of [`DatabaseBootstrapper`].
#[derive(Debug, Clone, Copy, Default)]
pub struct DieselDatabaseBootstrapper;

impl DieselDatabaseBootstrapper {
    /// Create a bootstrapper.
    pub fn new() -> Self {
        Self
    }

    async fn connect(
        credentials: &DatabaseCredentials,
    ) -> Result<AsyncPgConnection, DatabaseBootstrapperError> {
        let url = credentials
            .to_database_url()
            .map_err(|err| DatabaseBootstrapperError::connection(err.to_string()))?;
        AsyncPgConnection::establish(&url).await.map_err(|err| {
            DatabaseBootstrapperError::connection(format!(
                "{}@{}/{}: {err}",
                credentials.username, credentials.host, credentials.dbname
            ))
        })
    }

    async fn exists(
        credentials: &DatabaseCredentials,
        sql: &'static str,
        name: &str,
    ) -> Result<bool, DatabaseBootstrapperError> {
        let mut conn = Self::connect(credentials).await?;
        let row = sql_query(sql)
            .bind::<Text, _>(name)
            .get_result::<ExistsRow>(&mut conn)
            .await
            .map_err(|err| DatabaseBootstrapperError::statement(err.to_string()))?;
        Ok(row.exists)
    }
}

#[async_trait]
impl DatabaseBootstrapper for DieselDatabaseBootstrapper {
    async fn database_exists(
        &self,
        admin: &DatabaseCredentials,
        dbname: &str,
    ) -> Result<bool, DatabaseBootstrapperError> {
        Self::exists(admin, DATABASE_EXISTS_SQL, dbname).await
    }

    async fn role_exists(
        &self,
        admin: &DatabaseCredentials,
        role: &str,
    ) -> Result<bool, DatabaseBootstrapperError> {
        Self::exists(admin, ROLE_EXISTS_SQL, role).await
    }

    async fn execute(
        &self,
        target: &DatabaseCredentials,
        statements: &[String],
    ) -> Result<(), DatabaseBootstrapperError> {
        let mut conn = Self::connect(target).await?;
        for statement in statements {
            debug!(dbname = %target.dbname, "running bootstrap statement");
            conn.batch_execute(statement)
                .await
                .map_err(|err| DatabaseBootstrapperError::statement(err.to_string()))?;
        }
        Ok(())
    }
}
