//! Database credentials as stored in the secret store.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use url::Url;

/// Failures raised while reading or rendering credentials.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CredentialsError {
    /// The secret string is not a JSON object.
    #[error("credentials secret must be a non-empty JSON object")]
    NotAnObject,
    /// A field is missing or has the wrong shape.
    #[error("invalid credentials secret: {message}")]
    Invalid {
        /// Parser diagnostics.
        message: String,
    },
    /// The credentials cannot be rendered as a connection URL.
    #[error("cannot build connection URL: {message}")]
    Url {
        /// Description of the rejected component.
        message: String,
    },
}

/// Connection details for one PostgreSQL role.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseCredentials {
    /// Database name.
    pub dbname: String,
    /// Engine label, normally `postgres`.
    #[serde(default = "default_engine")]
    pub engine: String,
    /// TCP port.
    #[serde(deserialize_with = "port_from_number_or_string")]
    pub port: u16,
    /// Host name or address.
    pub host: String,
    /// Role name.
    pub username: String,
    /// Role password.
    pub password: String,
}

fn default_engine() -> String {
    "postgres".to_owned()
}

fn port_from_number_or_string<'de, D>(deserializer: D) -> Result<u16, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawPort {
        Number(u16),
        Text(String),
    }

    match RawPort::deserialize(deserializer)? {
        RawPort::Number(port) => Ok(port),
        RawPort::Text(text) => text
            .trim()
            .parse::<u16>()
            .map_err(|err| serde::de::Error::custom(format!("invalid port {text:?}: {err}"))),
    }
}

impl DatabaseCredentials {
    /// Parse a secret string.
    ///
    /// # Examples
    /// ```
    /// use stac_backend::domain::DatabaseCredentials;
    ///
    /// let creds = DatabaseCredentials::from_secret_string(
    ///     r#"{"dbname":"postgis","engine":"postgres","port":"5432",
    ///         "host":"db.internal","username":"admin","password":"s3cret"}"#,
    /// )
    /// .expect("valid secret");
    /// assert_eq!(creds.port, 5432);
    /// ```
    pub fn from_secret_string(secret: &str) -> Result<Self, CredentialsError> {
        let value: Value = serde_json::from_str(secret).map_err(|err| CredentialsError::Invalid {
            message: err.to_string(),
        })?;
        match value {
            Value::Object(map) => Self::from_map(map),
            _ => Err(CredentialsError::NotAnObject),
        }
    }

    /// Parse an already decoded secret object.
    pub fn from_map(map: Map<String, Value>) -> Result<Self, CredentialsError> {
        if map.is_empty() {
            return Err(CredentialsError::NotAnObject);
        }
        serde_json::from_value(Value::Object(map)).map_err(|err| CredentialsError::Invalid {
            message: err.to_string(),
        })
    }

    /// Copy of these credentials pointing at `host`.
    pub fn with_host(&self, host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            ..self.clone()
        }
    }

    /// Copy of these credentials pointing at database `dbname`.
    pub fn with_dbname(&self, dbname: impl Into<String>) -> Self {
        Self {
            dbname: dbname.into(),
            ..self.clone()
        }
    }

    /// Render a `postgres://` URL with user and password percent-encoded.
    ///
    /// # Examples
    /// ```
    /// use stac_backend::domain::DatabaseCredentials;
    ///
    /// let creds = DatabaseCredentials::from_secret_string(
    ///     r#"{"dbname":"postgis","port":5432,"host":"db",
    ///         "username":"app","password":"p@ss:word"}"#,
    /// )
    /// .expect("valid secret");
    /// assert_eq!(
    ///     creds.to_database_url().expect("url"),
    ///     "postgres://app:p%40ss%3Aword@db:5432/postgis",
    /// );
    /// ```
    pub fn to_database_url(&self) -> Result<String, CredentialsError> {
        let mut url = Url::parse(&format!("postgres://{}", self.host)).map_err(|err| {
            CredentialsError::Url {
                message: format!("host {:?}: {err}", self.host),
            }
        })?;
        url.set_username(&self.username)
            .map_err(|()| CredentialsError::Url {
                message: "username rejected".to_owned(),
            })?;
        url.set_password(Some(&self.password))
            .map_err(|()| CredentialsError::Url {
                message: "password rejected".to_owned(),
            })?;
        url.set_port(Some(self.port))
            .map_err(|()| CredentialsError::Url {
                message: "port rejected".to_owned(),
            })?;
        url.set_path(&self.dbname);
        Ok(url.into())
    }
}

impl fmt::Debug for DatabaseCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseCredentials")
            .field("dbname", &self.dbname)
            .field("engine", &self.engine)
            .field("port", &self.port)
            .field("host", &self.host)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}
