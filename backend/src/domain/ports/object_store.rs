//! Driven port for fetching STAC documents referenced by storage events.

use async_trait::async_trait;

use super::define_port_error;
use crate::domain::ObjectLocation;

define_port_error! {
    /// Errors raised while reading objects.
    pub enum ObjectStoreError {
        /// The object does not exist.
        NotFound { location: String } =>
            "object {location} was not found",
        /// The caller is not allowed to read the object.
        Access { message: String } =>
            "object access denied: {message}",
        /// The request failed in transit.
        Transport { message: String } =>
            "object fetch failed: {message}",
    }
}

/// Port for reading whole objects from blob storage.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Return the full object body at `location`.
    async fn get_object(&self, location: &ObjectLocation) -> Result<Vec<u8>, ObjectStoreError>;
}

/// Fixture implementation that reports every object as missing.
#[derive(Debug, Clone, Copy, Default)]
pub struct FixtureObjectStore;

#[async_trait]
impl ObjectStore for FixtureObjectStore {
    async fn get_object(&self, location: &ObjectLocation) -> Result<Vec<u8>, ObjectStoreError> {
        Err(ObjectStoreError::not_found(location.to_string()))
    }
}
