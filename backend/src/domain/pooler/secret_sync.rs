//! Point a credentials secret at the pooler instead of the database.

use std::sync::Arc;

use serde_json::Value;
use tracing::info;

use crate::domain::ports::{SecretStore, SecretStoreError};
use crate::domain::{CredentialsError, DatabaseCredentials};

/// Failures while rewriting a credentials secret.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SecretRewriteError {
    #[error("pooler host must not be empty")]
    EmptyHost,
    #[error(transparent)]
    Store(#[from] SecretStoreError),
    #[error(transparent)]
    Credentials(#[from] CredentialsError),
}

/// Copies the database secret with its `host` replaced.
#[derive(Clone)]
pub struct SecretHostRewriteService<S> {
    secrets: Arc<S>,
    pooler_port: Option<u16>,
}

impl<S> SecretHostRewriteService<S>
where
    S: SecretStore,
{
    pub fn new(secrets: Arc<S>) -> Self {
        Self {
            secrets,
            pooler_port: None,
        }
    }

    /// Also replace `port` with the port the pooler listens on.
    pub fn with_pooler_port(mut self, port: u16) -> Self {
        self.pooler_port = Some(port);
        self
    }

    /// Read `source_secret`, set `host`, and store the result in
    /// `target_secret`. Fields other than `host` are kept verbatim.
    pub async fn rewrite_host(
        &self,
        source_secret: &str,
        target_secret: &str,
        pooler_host: &str,
    ) -> Result<DatabaseCredentials, SecretRewriteError> {
        if pooler_host.trim().is_empty() {
            return Err(SecretRewriteError::EmptyHost);
        }

        let raw = self.secrets.get_secret_string(source_secret).await?;
        let mut fields = match serde_json::from_str::<Value>(&raw) {
            Ok(Value::Object(fields)) if !fields.is_empty() => fields,
            Ok(_) => return Err(CredentialsError::NotAnObject.into()),
            Err(err) => {
                return Err(CredentialsError::Invalid {
                    message: err.to_string(),
                }
                .into());
            }
        };
        fields.insert("host".to_owned(), Value::String(pooler_host.to_owned()));
        if let Some(port) = self.pooler_port {
            fields.insert("port".to_owned(), Value::from(port));
        }
        let credentials = DatabaseCredentials::from_map(fields.clone())?;

        let rendered = Value::Object(fields).to_string();
        self.secrets
            .put_secret_string(target_secret, &rendered)
            .await?;
        info!(target_secret, pooler_host, "pooler secret updated");
        Ok(credentials)
    }
}
