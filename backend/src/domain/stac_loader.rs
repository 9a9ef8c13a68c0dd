//! Batch consumer that loads STAC records into pgstac.
//!
//! One invocation handles one queue batch:
//! - decode each SNS envelope and resolve S3 references;
//! - keep only the newest delivery per record key;
//! - upsert collections, then items grouped by collection.
//!
//! Failures are reported per message so the queue redelivers only what
//! did not land.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::domain::ports::{
    BatchLoadReport, BatchRecord, CatalogRepository, CatalogRepositoryError, LoadOptions,
    ObjectStore, ObjectStoreError, StacBatchLoader,
};
use crate::domain::{
    CatalogRecord, DedupedBatch, Delivered, Error, IngestionPayload, MessageDecodeError,
    ObjectLocation, RecordError, SnsEnvelope, StacCollection, StacItem,
};

/// Whether redelivery can fix a failed record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Storage or network trouble; the message is handed back to the queue.
    Transient,
    /// The message itself is unusable and will fail the same way again.
    Permanent,
}

/// Reason a single queue message could not be loaded.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RecordFailure {
    #[error("queue record has no body")]
    MissingBody,
    #[error(transparent)]
    Decode(#[from] MessageDecodeError),
    #[error(transparent)]
    Object(#[from] ObjectStoreError),
    #[error("object {location} is not a JSON document: {message}")]
    ObjectContent { location: String, message: String },
    #[error(transparent)]
    Record(#[from] RecordError),
    #[error(transparent)]
    Catalog(#[from] CatalogRepositoryError),
}

impl RecordFailure {
    /// Classify the failure for logging and alerting.
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::Catalog(err) if !err.is_retryable() => FailureKind::Permanent,
            _ => FailureKind::Transient,
        }
    }
}

/// Domain service implementing the batch loader.
#[derive(Clone)]
pub struct StacLoaderService<O, R> {
    objects: Arc<O>,
    catalog: Arc<R>,
}

impl<O, R> StacLoaderService<O, R> {
    /// Create a loader over an object store and a catalogue repository.
    pub fn new(objects: Arc<O>, catalog: Arc<R>) -> Self {
        Self { objects, catalog }
    }
}

#[async_trait]
impl<O, R> StacBatchLoader for StacLoaderService<O, R>
where
    O: ObjectStore,
    R: CatalogRepository,
{
    async fn load_batch(
        &self,
        records: Vec<BatchRecord>,
        options: LoadOptions,
    ) -> Result<BatchLoadReport, Error> {
        let received = records.len();
        let mut report = BatchLoadReport::default();
        let mut batch = DedupedBatch::new();

        for record in records {
            let Some(message_id) = record.message_id else {
                warn!("skipping queue record without a message id");
                continue;
            };
            match self.decode(record.body.as_deref()).await {
                Ok((delivered_at, value)) => batch.offer(Delivered {
                    message_id,
                    delivered_at,
                    value,
                }),
                Err(failure) => {
                    log_failure(&message_id, &failure);
                    report.fail(&message_id);
                }
            }
        }

        report.discarded_duplicates = batch.discarded();
        let (collections, items) = batch.into_parts();
        self.load_collections(collections, &mut report).await;
        for (collection_id, group) in items {
            self.load_item_group(&collection_id, group, options, &mut report)
                .await;
        }

        info!(
            received,
            loaded_items = report.loaded_items,
            loaded_collections = report.loaded_collections,
            discarded_duplicates = report.discarded_duplicates,
            failed = report.failed_message_ids.len(),
            "processed STAC batch"
        );
        Ok(report)
    }
}

impl<O, R> StacLoaderService<O, R>
where
    O: ObjectStore,
    R: CatalogRepository,
{
    async fn decode(
        &self,
        body: Option<&str>,
    ) -> Result<(chrono::DateTime<chrono::Utc>, CatalogRecord), RecordFailure> {
        let body = body.ok_or(RecordFailure::MissingBody)?;
        let envelope = SnsEnvelope::from_body(body)?;
        let document = match IngestionPayload::classify(&envelope.message)? {
            IngestionPayload::Record(value) => value,
            IngestionPayload::ObjectReference(location) => self.fetch_document(&location).await?,
        };
        let record = CatalogRecord::from_value(document)?;
        Ok((envelope.timestamp, record))
    }

    async fn fetch_document(&self, location: &ObjectLocation) -> Result<Value, RecordFailure> {
        debug!(%location, "fetching STAC document");
        let bytes = self.objects.get_object(location).await?;
        let content_error = |message: String| RecordFailure::ObjectContent {
            location: location.to_string(),
            message,
        };
        let text = String::from_utf8(bytes).map_err(|err| content_error(err.to_string()))?;
        serde_json::from_str(&text).map_err(|err| content_error(err.to_string()))
    }

    async fn load_collections(
        &self,
        collections: BTreeMap<String, Delivered<StacCollection>>,
        report: &mut BatchLoadReport,
    ) {
        if collections.is_empty() {
            return;
        }
        let (message_ids, documents): (Vec<String>, Vec<StacCollection>) = collections
            .into_values()
            .map(|delivered| (delivered.message_id, delivered.value))
            .unzip();

        match self.catalog.upsert_collections(&documents).await {
            Ok(()) => report.loaded_collections += documents.len(),
            Err(err) => {
                let failure = RecordFailure::from(err);
                for message_id in &message_ids {
                    log_failure(message_id, &failure);
                    report.fail(message_id);
                }
            }
        }
    }

    async fn load_item_group(
        &self,
        collection_id: &str,
        group: BTreeMap<String, Delivered<StacItem>>,
        options: LoadOptions,
        report: &mut BatchLoadReport,
    ) {
        let stac_version = group
            .values()
            .next()
            .map(|delivered| delivered.value.stac_version().to_owned())
            .unwrap_or_default();
        let (message_ids, items): (Vec<String>, Vec<StacItem>) = group
            .into_values()
            .map(|delivered| (delivered.message_id, delivered.value))
            .unzip();

        let outcome = match self
            .ensure_collection(collection_id, &stac_version, options)
            .await
        {
            Ok(created) => {
                if created {
                    report.loaded_collections += 1;
                }
                self.catalog.upsert_items(collection_id, &items).await
            }
            Err(err) => Err(err),
        };

        match outcome {
            Ok(()) => {
                debug!(collection_id, count = items.len(), "upserted items");
                report.loaded_items += items.len();
            }
            Err(err) => {
                let failure = RecordFailure::from(err);
                warn!(
                    collection_id,
                    count = message_ids.len(),
                    kind = ?failure.kind(),
                    error = %failure,
                    "item group failed"
                );
                for message_id in &message_ids {
                    report.fail(message_id);
                }
            }
        }
    }

    /// Returns `true` when a placeholder collection was inserted.
    async fn ensure_collection(
        &self,
        collection_id: &str,
        stac_version: &str,
        options: LoadOptions,
    ) -> Result<bool, CatalogRepositoryError> {
        if self.catalog.collection_exists(collection_id).await? {
            return Ok(false);
        }
        if !options.create_collections_if_missing {
            return Err(CatalogRepositoryError::missing_collection(collection_id));
        }
        info!(collection_id, "creating placeholder collection");
        let placeholder = StacCollection::placeholder(collection_id, stac_version);
        self.catalog
            .upsert_collections(std::slice::from_ref(&placeholder))
            .await?;
        Ok(true)
    }
}

fn log_failure(message_id: &str, failure: &RecordFailure) {
    warn!(message_id, kind = ?failure.kind(), error = %failure, "failed to load record");
}

#[cfg(test)]
#[path = "stac_loader_tests.rs"]
mod tests;
