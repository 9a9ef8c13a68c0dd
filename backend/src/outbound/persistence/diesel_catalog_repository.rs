//! pgstac-backed catalogue write adapter.
//!
//! Every statement runs inside a short transaction that pins `search_path`
//! with `SET LOCAL`, so the adapter works the same behind a transaction-mode
//! pooler as it does against the database directly.

use async_trait::async_trait;
use diesel::sql_query;
use diesel::sql_types::{Bool, Jsonb, Text};
use diesel::QueryableByName;
use diesel_async::AsyncConnection as _;
use diesel_async::scoped_futures::ScopedFutureExt as _;
use diesel_async::RunQueryDsl;
use serde_json::Value;
use tracing::debug;

use crate::domain::ports::{CatalogRepository, CatalogRepositoryError};
use crate::domain::{StacCollection, StacItem};

use super::diesel_helpers::{map_diesel_error, map_item_write_error, map_pool_error};
use super::pool::DbPool;

const SET_SEARCH_PATH_SQL: &str = "SET LOCAL search_path TO pgstac, public";
const COLLECTION_EXISTS_SQL: &str =
    "SELECT EXISTS (SELECT 1 FROM collections WHERE id = $1) AS exists";
const UPSERT_COLLECTION_SQL: &str = "SELECT upsert_collection($1::jsonb)";
const UPSERT_ITEMS_SQL: &str = "SELECT upsert_items($1::jsonb)";

#[derive(QueryableByName)]
struct ExistsRow {
    #[diesel(sql_type = Bool)]
    exists: bool,
}

/// Diesel-backed implementation of [`CatalogRepository`].
#[derive(Clone)]
pub struct DieselCatalogRepository {
    pool: DbPool,
}

impl DieselCatalogRepository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CatalogRepository for DieselCatalogRepository {
    async fn collection_exists(&self, collection_id: &str) -> Result<bool, CatalogRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let id = collection_id.to_owned();
        let row = conn
            .transaction(|conn| {
                async move {
                    sql_query(SET_SEARCH_PATH_SQL).execute(conn).await?;
                    sql_query(COLLECTION_EXISTS_SQL)
                        .bind::<Text, _>(id)
                        .get_result::<ExistsRow>(conn)
                        .await
                }
                .scope_boxed()
            })
            .await
            .map_err(|err| map_diesel_error(err, "collection lookup"))?;
        Ok(row.exists)
    }

    async fn upsert_collections(
        &self,
        collections: &[StacCollection],
    ) -> Result<(), CatalogRepositoryError> {
        if collections.is_empty() {
            return Ok(());
        }

        let documents: Vec<Value> = collections
            .iter()
            .map(|collection| Value::Object(collection.document().clone()))
            .collect();

        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        conn.transaction(|conn| {
            async move {
                sql_query(SET_SEARCH_PATH_SQL).execute(conn).await?;
                for document in &documents {
                    sql_query(UPSERT_COLLECTION_SQL)
                        .bind::<Jsonb, _>(document)
                        .execute(conn)
                        .await?;
                }
                Ok::<_, diesel::result::Error>(())
            }
            .scope_boxed()
        })
        .await
        .map_err(|err| map_diesel_error(err, "upsert collections"))?;

        debug!(count = collections.len(), "collections upserted");
        Ok(())
    }

    async fn upsert_items(
        &self,
        collection_id: &str,
        items: &[StacItem],
    ) -> Result<(), CatalogRepositoryError> {
        if items.is_empty() {
            return Ok(());
        }

        let payload = Value::Array(
            items
                .iter()
                .map(|item| Value::Object(item.document().clone()))
                .collect(),
        );

        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        conn.transaction(|conn| {
            async move {
                sql_query(SET_SEARCH_PATH_SQL).execute(conn).await?;
                sql_query(UPSERT_ITEMS_SQL)
                    .bind::<Jsonb, _>(&payload)
                    .execute(conn)
                    .await?;
                Ok::<_, diesel::result::Error>(())
            }
            .scope_boxed()
        })
        .await
        .map_err(|err| map_item_write_error(err, collection_id))?;

        debug!(collection_id, count = items.len(), "items upserted");
        Ok(())
    }
}
