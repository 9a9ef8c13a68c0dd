//! Driven port for reading and writing credential secrets.

use async_trait::async_trait;

use super::define_port_error;

define_port_error! {
    /// Errors raised by secret storage adapters.
    pub enum SecretStoreError {
        /// The secret does not exist.
        NotFound { secret_id: String } =>
            "secret {secret_id} was not found",
        /// The secret has no string payload.
        Empty { secret_id: String } =>
            "secret {secret_id} has an empty secret string",
        /// The request failed in transit or was refused.
        Transport { message: String } =>
            "secret store request failed: {message}",
    }
}

/// Port for string-valued secrets.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SecretStore: Send + Sync {
    /// Read the current secret string.
    async fn get_secret_string(&self, secret_id: &str) -> Result<String, SecretStoreError>;

    /// Store a new version of the secret string.
    async fn put_secret_string(&self, secret_id: &str, value: &str) -> Result<(), SecretStoreError>;
}
