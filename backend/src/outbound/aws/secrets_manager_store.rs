//! Secrets Manager-backed secret store.

use async_trait::async_trait;
use aws_sdk_secretsmanager::Client;
use aws_sdk_secretsmanager::error::DisplayErrorContext;
use tracing::info;

use crate::domain::ports::{SecretStore, SecretStoreError};

/// Reads and writes database credential secrets.
#[derive(Clone, Debug)]
pub struct SecretsManagerStore {
    client: Client,
}

impl SecretsManagerStore {
    /// Build an adapter from shared SDK configuration.
    pub fn new(sdk_config: &aws_config::SdkConfig) -> Self {
        Self::from_client(Client::new(sdk_config))
    }

    /// Wrap a pre-built client.
    pub fn from_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl SecretStore for SecretsManagerStore {
    async fn get_secret_string(&self, secret_id: &str) -> Result<String, SecretStoreError> {
        let output = self
            .client
            .get_secret_value()
            .secret_id(secret_id)
            .send()
            .await
            .map_err(|err| {
                if err
                    .as_service_error()
                    .is_some_and(|service_error| service_error.is_resource_not_found_exception())
                {
                    SecretStoreError::not_found(secret_id)
                } else {
                    SecretStoreError::transport(DisplayErrorContext(&err).to_string())
                }
            })?;

        match output.secret_string() {
            Some(value) if !value.trim().is_empty() => Ok(value.to_owned()),
            _ => Err(SecretStoreError::empty(secret_id)),
        }
    }

    async fn put_secret_string(&self, secret_id: &str, value: &str) -> Result<(), SecretStoreError> {
        let output = self
            .client
            .put_secret_value()
            .secret_id(secret_id)
            .secret_string(value)
            .send()
            .await
            .map_err(|err| {
                if err
                    .as_service_error()
                    .is_some_and(|service_error| service_error.is_resource_not_found_exception())
                {
                    SecretStoreError::not_found(secret_id)
                } else {
                    SecretStoreError::transport(DisplayErrorContext(&err).to_string())
                }
            })?;

        info!(
            secret_id,
            version_id = output.version_id().unwrap_or_default(),
            "secret version stored"
        );
        Ok(())
    }
}
