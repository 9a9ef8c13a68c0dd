//! Driven port for writing STAC records into the pgstac catalogue.

use async_trait::async_trait;

use super::define_port_error;
use crate::domain::{StacCollection, StacItem};

define_port_error! {
    /// Errors raised by catalogue persistence adapters.
    pub enum CatalogRepositoryError {
        /// Repository connection could not be established.
        Connection { message: String } =>
            "catalog connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } =>
            "catalog query failed: {message}",
        /// Items reference a collection that is not in the catalogue.
        MissingCollection { collection_id: String } =>
            "collection {collection_id} is not present in the database",
    }
}

impl CatalogRepositoryError {
    /// Whether redelivering the same records could succeed without
    /// operator intervention.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, Self::MissingCollection { .. })
    }
}

/// Port for idempotent catalogue upserts.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CatalogRepository: Send + Sync {
    /// Report whether `collection_id` exists.
    async fn collection_exists(&self, collection_id: &str) -> Result<bool, CatalogRepositoryError>;

    /// Upsert collections keyed by `id`.
    async fn upsert_collections(
        &self,
        collections: &[StacCollection],
    ) -> Result<(), CatalogRepositoryError>;

    /// Upsert items of one collection keyed by `(collection, id)`.
    async fn upsert_items(
        &self,
        collection_id: &str,
        items: &[StacItem],
    ) -> Result<(), CatalogRepositoryError>;
}

/// Fixture implementation for tests that do not exercise persistence.
#[derive(Debug, Clone, Copy, Default)]
pub struct FixtureCatalogRepository;

#[async_trait]
impl CatalogRepository for FixtureCatalogRepository {
    async fn collection_exists(&self, _collection_id: &str) -> Result<bool, CatalogRepositoryError> {
        Ok(true)
    }

    async fn upsert_collections(
        &self,
        _collections: &[StacCollection],
    ) -> Result<(), CatalogRepositoryError> {
        Ok(())
    }

    async fn upsert_items(
        &self,
        _collection_id: &str,
        _items: &[StacItem],
    ) -> Result<(), CatalogRepositoryError> {
        Ok(())
    }
}
