//! Runs `pypgstac migrate` against the application database.

use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::info;

use crate::domain::DatabaseCredentials;
use crate::domain::ports::{PgstacMigrator, PgstacMigratorError};

const DEFAULT_PROGRAM: &str = "pypgstac";

/// Migrator backed by the `pypgstac` command-line tool.
///
/// Connection details travel as libpq environment variables so the password
/// never appears in the process arguments.
#[derive(Debug, Clone)]
pub struct PypgstacMigrator {
    program: String,
}

impl Default for PypgstacMigrator {
    fn default() -> Self {
        Self {
            program: DEFAULT_PROGRAM.to_owned(),
        }
    }
}

impl PypgstacMigrator {
    /// Create a migrator that runs `pypgstac` from `PATH`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a different executable.
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    fn environment(target: &DatabaseCredentials) -> [(&'static str, String); 5] {
        [
            ("PGHOST", target.host.clone()),
            ("PGPORT", target.port.to_string()),
            ("PGUSER", target.username.clone()),
            ("PGPASSWORD", target.password.clone()),
            ("PGDATABASE", target.dbname.clone()),
        ]
    }
}

#[async_trait]
impl PgstacMigrator for PypgstacMigrator {
    async fn migrate(
        &self,
        target: &DatabaseCredentials,
        version: &str,
    ) -> Result<(), PgstacMigratorError> {
        info!(dbname = %target.dbname, version, "migrating pgstac schema");
        let output = Command::new(&self.program)
            .args(["migrate", "--toversion", version])
            .envs(Self::environment(target))
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|err| PgstacMigratorError::spawn(format!("{}: {err}", self.program)))?;

        if output.status.success() {
            Ok(())
        } else {
            Err(PgstacMigratorError::failed(
                output.status.code(),
                String::from_utf8_lossy(&output.stderr),
            ))
        }
    }
}
