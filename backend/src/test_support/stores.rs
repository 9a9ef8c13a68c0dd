//! In-memory object and secret stores.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use super::lock;
use crate::domain::ObjectLocation;
use crate::domain::ports::{ObjectStore, ObjectStoreError, SecretStore, SecretStoreError};

/// Objects addressed by `(bucket, key)`.
#[derive(Debug, Default)]
pub struct InMemoryObjectStore {
    objects: Mutex<HashMap<(String, String), Vec<u8>>>,
}

impl InMemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_object(self, bucket: &str, key: &str, body: impl Into<Vec<u8>>) -> Self {
        lock(&self.objects, "object store")
            .insert((bucket.to_owned(), key.to_owned()), body.into());
        self
    }
}

#[async_trait]
impl ObjectStore for InMemoryObjectStore {
    async fn get_object(&self, location: &ObjectLocation) -> Result<Vec<u8>, ObjectStoreError> {
        lock(&self.objects, "object store")
            .get(&(location.bucket.clone(), location.key.clone()))
            .cloned()
            .ok_or_else(|| ObjectStoreError::not_found(location.to_string()))
    }
}

/// Secrets keyed by id; writes replace the current value.
#[derive(Debug, Default)]
pub struct InMemorySecretStore {
    secrets: Mutex<HashMap<String, String>>,
    writes: Mutex<Vec<String>>,
}

impl InMemorySecretStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_secret(self, secret_id: &str, value: impl Into<String>) -> Self {
        lock(&self.secrets, "secret store").insert(secret_id.to_owned(), value.into());
        self
    }

    pub fn secret(&self, secret_id: &str) -> Option<String> {
        lock(&self.secrets, "secret store").get(secret_id).cloned()
    }

    /// Ids passed to `put_secret_string`, in call order.
    pub fn writes(&self) -> Vec<String> {
        lock(&self.writes, "secret store").clone()
    }
}

#[async_trait]
impl SecretStore for InMemorySecretStore {
    async fn get_secret_string(&self, secret_id: &str) -> Result<String, SecretStoreError> {
        match lock(&self.secrets, "secret store").get(secret_id) {
            Some(value) if !value.is_empty() => Ok(value.clone()),
            Some(_) => Err(SecretStoreError::empty(secret_id)),
            None => Err(SecretStoreError::not_found(secret_id)),
        }
    }

    async fn put_secret_string(&self, secret_id: &str, value: &str) -> Result<(), SecretStoreError> {
        lock(&self.writes, "secret store").push(secret_id.to_owned());
        lock(&self.secrets, "secret store").insert(secret_id.to_owned(), value.to_owned());
        Ok(())
    }
}
