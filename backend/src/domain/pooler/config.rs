//! PgBouncer sizing derived from the database connection limit.

use std::fmt;

use serde::Deserialize;

/// Connections kept free on the database for administrative sessions.
const ADMIN_HEADROOM: u32 = 10;

/// How server connections are shared between clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PoolMode {
    Session,
    #[default]
    Transaction,
    Statement,
}

impl fmt::Display for PoolMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Session => "session",
            Self::Transaction => "transaction",
            Self::Statement => "statement",
        })
    }
}

/// Operator-supplied values replacing individual defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
pub struct PoolerOverrides {
    /// Each field replaces the same-named [`PoolerConfig`] value when set.
    pub pool_mode: Option<PoolMode>,
    pub max_client_conn: Option<u32>,
    pub default_pool_size: Option<u32>,
    pub min_pool_size: Option<u32>,
    pub reserve_pool_size: Option<u32>,
    pub reserve_pool_timeout_secs: Option<u32>,
    pub max_db_connections: Option<u32>,
    pub max_user_connections: Option<u32>,
}

/// Rejected pooler settings.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PoolerConfigError {
    /// `default_pool_size` is zero.
    #[error("default_pool_size must be positive")]
    EmptyPool,
    /// More warm connections requested than the pool holds.
    #[error("min_pool_size {min} exceeds default_pool_size {default}")]
    MinAboveDefault { min: u32, default: u32 },
    /// A full pool plus its reserve would exceed the server-side limit.
    #[error("default_pool_size {default} plus reserve_pool_size {reserve} exceeds max_db_connections {max_db}")]
    PoolAboveDatabaseLimit { default: u32, reserve: u32, max_db: u32 },
    /// The database leaves no connections after admin headroom.
    #[error("max_db_connections must be positive")]
    NoDatabaseConnections,
}

/// Resolved PgBouncer settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolerConfig {
    pub pool_mode: PoolMode,
    /// Client connections PgBouncer accepts.
    pub max_client_conn: u32,
    /// Server connections per user and database pair.
    pub default_pool_size: u32,
    /// Server connections kept open while idle.
    pub min_pool_size: u32,
    /// Extra connections allowed once a client has waited
    /// `reserve_pool_timeout_secs`.
    pub reserve_pool_size: u32,
    pub reserve_pool_timeout_secs: u32,
    /// Server connections across all pools, below the database's own limit.
    pub max_db_connections: u32,
    pub max_user_connections: u32,
}

impl PoolerConfig {
    /// Defaults for a database accepting `db_max_connections`.
    ///
    /// # Examples
    /// ```
    /// use stac_backend::domain::PoolerConfig;
    ///
    /// let config = PoolerConfig::for_database(901);
    /// assert_eq!(config.max_db_connections, 891);
    /// assert_eq!(PoolerConfig::for_database(4).max_db_connections, 0);
    /// ```
    pub fn for_database(db_max_connections: u32) -> Self {
        let server_limit = db_max_connections.saturating_sub(ADMIN_HEADROOM);
        Self {
            pool_mode: PoolMode::Transaction,
            max_client_conn: 1000,
            default_pool_size: 5,
            min_pool_size: 0,
            reserve_pool_size: 5,
            reserve_pool_timeout_secs: 5,
            max_db_connections: server_limit,
            max_user_connections: server_limit,
        }
    }

    /// Values used when the catalogue platform deploys its own pooler.
    pub fn platform_defaults(db_max_connections: u32) -> Self {
        Self {
            default_pool_size: 20,
            min_pool_size: 10,
            ..Self::for_database(db_max_connections)
        }
    }

    /// Apply `overrides` on top of these settings.
    pub fn merge(self, overrides: PoolerOverrides) -> Self {
        Self {
            pool_mode: overrides.pool_mode.unwrap_or(self.pool_mode),
            max_client_conn: overrides.max_client_conn.unwrap_or(self.max_client_conn),
            default_pool_size: overrides.default_pool_size.unwrap_or(self.default_pool_size),
            min_pool_size: overrides.min_pool_size.unwrap_or(self.min_pool_size),
            reserve_pool_size: overrides.reserve_pool_size.unwrap_or(self.reserve_pool_size),
            reserve_pool_timeout_secs: overrides
                .reserve_pool_timeout_secs
                .unwrap_or(self.reserve_pool_timeout_secs),
            max_db_connections: overrides
                .max_db_connections
                .unwrap_or(self.max_db_connections),
            max_user_connections: overrides
                .max_user_connections
                .unwrap_or(self.max_user_connections),
        }
    }

    /// Reject settings PgBouncer would start with but cannot honour.
    pub fn validate(&self) -> Result<(), PoolerConfigError> {
        if self.max_db_connections == 0 {
            return Err(PoolerConfigError::NoDatabaseConnections);
        }
        if self.default_pool_size == 0 {
            return Err(PoolerConfigError::EmptyPool);
        }
        if self.min_pool_size > self.default_pool_size {
            return Err(PoolerConfigError::MinAboveDefault {
                min: self.min_pool_size,
                default: self.default_pool_size,
            });
        }
        if self.default_pool_size.saturating_add(self.reserve_pool_size) > self.max_db_connections {
            return Err(PoolerConfigError::PoolAboveDatabaseLimit {
                default: self.default_pool_size,
                reserve: self.reserve_pool_size,
                max_db: self.max_db_connections,
            });
        }
        Ok(())
    }

    /// Render `pgbouncer.ini` for a single upstream database.
    pub fn render_ini(&self, database: &str, host: &str, port: u16) -> String {
        format!(
            "[databases]\n\
             {database} = host={host} port={port} dbname={database}\n\
             \n\
             [pgbouncer]\n\
             listen_addr = 0.0.0.0\n\
             listen_port = 5432\n\
             auth_type = scram-sha-256\n\
             auth_file = /etc/pgbouncer/userlist.txt\n\
             pool_mode = {pool_mode}\n\
             max_client_conn = {max_client_conn}\n\
             default_pool_size = {default_pool_size}\n\
             min_pool_size = {min_pool_size}\n\
             reserve_pool_size = {reserve_pool_size}\n\
             reserve_pool_timeout = {reserve_pool_timeout}\n\
             max_db_connections = {max_db_connections}\n\
             max_user_connections = {max_user_connections}\n",
            pool_mode = self.pool_mode,
            max_client_conn = self.max_client_conn,
            default_pool_size = self.default_pool_size,
            min_pool_size = self.min_pool_size,
            reserve_pool_size = self.reserve_pool_size,
            reserve_pool_timeout = self.reserve_pool_timeout_secs,
            max_db_connections = self.max_db_connections,
            max_user_connections = self.max_user_connections,
        )
    }

    /// Environment variables consumed by the host setup script.
    pub fn to_environment(&self) -> Vec<(&'static str, String)> {
        vec![
            ("POOL_MODE", self.pool_mode.to_string()),
            ("MAX_CLIENT_CONN", self.max_client_conn.to_string()),
            ("DEFAULT_POOL_SIZE", self.default_pool_size.to_string()),
            ("MIN_POOL_SIZE", self.min_pool_size.to_string()),
            ("RESERVE_POOL_SIZE", self.reserve_pool_size.to_string()),
            ("RESERVE_POOL_TIMEOUT", self.reserve_pool_timeout_secs.to_string()),
            ("MAX_DB_CONNECTIONS", self.max_db_connections.to_string()),
            ("MAX_USER_CONNECTIONS", self.max_user_connections.to_string()),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn defaults_leave_admin_headroom() {
        let config = PoolerConfig::for_database(901);
        assert_eq!(config.pool_mode, PoolMode::Transaction);
        assert_eq!(config.max_client_conn, 1000);
        assert_eq!(config.default_pool_size, 5);
        assert_eq!(config.min_pool_size, 0);
        assert_eq!(config.reserve_pool_size, 5);
        assert_eq!(config.reserve_pool_timeout_secs, 5);
        assert_eq!(config.max_db_connections, 891);
        assert_eq!(config.max_user_connections, 891);
        assert_eq!(config.validate(), Ok(()));
    }

    #[rstest]
    #[case(10, 0)]
    #[case(3, 0)]
    #[case(0, 0)]
    fn tiny_databases_saturate_to_zero(#[case] db_max: u32, #[case] expected: u32) {
        let config = PoolerConfig::for_database(db_max);
        assert_eq!(config.max_db_connections, expected);
        assert_eq!(config.validate(), Err(PoolerConfigError::NoDatabaseConnections));
    }

    #[rstest]
    fn platform_defaults_widen_the_pool() {
        let config = PoolerConfig::platform_defaults(901);
        assert_eq!(config.default_pool_size, 20);
        assert_eq!(config.min_pool_size, 10);
        assert_eq!(config.reserve_pool_size, 5);
        assert_eq!(config.max_db_connections, 891);
    }

    #[rstest]
    fn merge_replaces_only_given_fields() {
        let merged = PoolerConfig::for_database(100).merge(PoolerOverrides {
            pool_mode: Some(PoolMode::Session),
            default_pool_size: Some(12),
            ..PoolerOverrides::default()
        });
        assert_eq!(merged.pool_mode, PoolMode::Session);
        assert_eq!(merged.default_pool_size, 12);
        assert_eq!(merged.max_client_conn, 1000);
        assert_eq!(merged.max_db_connections, 90);
    }

    #[rstest]
    #[case(PoolerOverrides { default_pool_size: Some(0), ..PoolerOverrides::default() }, PoolerConfigError::EmptyPool)]
    #[case(PoolerOverrides { min_pool_size: Some(6), ..PoolerOverrides::default() }, PoolerConfigError::MinAboveDefault { min: 6, default: 5 })]
    #[case(PoolerOverrides { max_db_connections: Some(9), ..PoolerOverrides::default() }, PoolerConfigError::PoolAboveDatabaseLimit { default: 5, reserve: 5, max_db: 9 })]
    fn validate_rejects_inconsistent_sizes(
        #[case] overrides: PoolerOverrides,
        #[case] expected: PoolerConfigError,
    ) {
        let config = PoolerConfig::for_database(100).merge(overrides);
        assert_eq!(config.validate(), Err(expected));
    }

    #[rstest]
    fn renders_ini_sections() {
        let ini = PoolerConfig::for_database(100).render_ini("postgis", "db.internal", 5432);
        assert!(ini.starts_with("[databases]\npostgis = host=db.internal port=5432 dbname=postgis\n"));
        assert!(ini.contains("\n[pgbouncer]\n"));
        assert!(ini.contains("pool_mode = transaction\n"));
        assert!(ini.contains("max_db_connections = 90\n"));
        assert!(ini.contains("reserve_pool_timeout = 5\n"));
    }

    #[rstest]
    fn environment_lists_every_setting() {
        let env = PoolerConfig::for_database(100).to_environment();
        assert_eq!(env.len(), 8);
        assert!(env.contains(&("MAX_USER_CONNECTIONS", "90".to_owned())));
    }

    #[rstest]
    fn pool_mode_deserialises_lowercase() {
        let mode: PoolMode = serde_json::from_str("\"statement\"").expect("valid mode");
        assert_eq!(mode, PoolMode::Statement);
    }
}
