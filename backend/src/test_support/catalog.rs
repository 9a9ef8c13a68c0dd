//! In-memory stand-in for the pgstac catalogue.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Mutex;

use async_trait::async_trait;

use super::lock;
use crate::domain::ports::{CatalogRepository, CatalogRepositoryError};
use crate::domain::{StacCollection, StacItem};

#[derive(Debug, Default)]
struct CatalogState {
    collections: BTreeMap<String, StacCollection>,
    items: BTreeMap<(String, String), StacItem>,
    unavailable_collections: BTreeSet<String>,
    collection_writes: usize,
    item_writes: usize,
}

/// Catalogue keyed the way pgstac keys rows: collections by id, items by
/// `(collection, id)`.
///
/// Item writes for an unknown collection fail with
/// [`CatalogRepositoryError::MissingCollection`], mirroring the foreign key
/// pgstac enforces.
#[derive(Debug, Default)]
pub struct InMemoryCatalogRepository {
    state: Mutex<CatalogState>,
}

impl InMemoryCatalogRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an existing collection.
    pub fn with_collection(self, collection: StacCollection) -> Self {
        lock(&self.state, "catalog")
            .collections
            .insert(collection.id().to_owned(), collection);
        self
    }

    /// Make every item write for `collection_id` fail with a query error.
    pub fn fail_item_writes_for(&self, collection_id: &str) {
        lock(&self.state, "catalog")
            .unavailable_collections
            .insert(collection_id.to_owned());
    }

    pub fn collection(&self, collection_id: &str) -> Option<StacCollection> {
        lock(&self.state, "catalog")
            .collections
            .get(collection_id)
            .cloned()
    }

    pub fn item(&self, collection_id: &str, item_id: &str) -> Option<StacItem> {
        lock(&self.state, "catalog")
            .items
            .get(&(collection_id.to_owned(), item_id.to_owned()))
            .cloned()
    }

    /// Stored items in `(collection, id)` order.
    pub fn items(&self) -> Vec<StacItem> {
        lock(&self.state, "catalog").items.values().cloned().collect()
    }

    pub fn collection_count(&self) -> usize {
        lock(&self.state, "catalog").collections.len()
    }

    /// Number of `upsert_collections` and `upsert_items` calls that reached
    /// storage.
    pub fn write_calls(&self) -> (usize, usize) {
        let state = lock(&self.state, "catalog");
        (state.collection_writes, state.item_writes)
    }
}

#[async_trait]
impl CatalogRepository for InMemoryCatalogRepository {
    async fn collection_exists(&self, collection_id: &str) -> Result<bool, CatalogRepositoryError> {
        Ok(lock(&self.state, "catalog")
            .collections
            .contains_key(collection_id))
    }

    async fn upsert_collections(
        &self,
        collections: &[StacCollection],
    ) -> Result<(), CatalogRepositoryError> {
        let mut state = lock(&self.state, "catalog");
        state.collection_writes += 1;
        for collection in collections {
            state
                .collections
                .insert(collection.id().to_owned(), collection.clone());
        }
        Ok(())
    }

    async fn upsert_items(
        &self,
        collection_id: &str,
        items: &[StacItem],
    ) -> Result<(), CatalogRepositoryError> {
        let mut state = lock(&self.state, "catalog");
        state.item_writes += 1;
        if state.unavailable_collections.contains(collection_id) {
            return Err(CatalogRepositoryError::query(format!(
                "partition for {collection_id} is unavailable"
            )));
        }
        if !state.collections.contains_key(collection_id) {
            return Err(CatalogRepositoryError::missing_collection(collection_id));
        }
        for item in items {
            state.items.insert(
                (item.collection().to_owned(), item.id().to_owned()),
                item.clone(),
            );
        }
        Ok(())
    }
}
