//! Driving port for loading one queue batch into the catalogue.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::Error;

/// One queue record as handed over by the event source.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchRecord {
    /// Queue message identifier used for partial batch failure reporting.
    pub message_id: Option<String>,
    /// Raw message body (an SNS envelope).
    pub body: Option<String>,
}

impl BatchRecord {
    /// Build a record with both identifier and body present.
    ///
    /// # Examples
    /// ```
    /// use stac_backend::domain::ports::BatchRecord;
    ///
    /// let record = BatchRecord::new("m-1", "{}");
    /// assert_eq!(record.message_id.as_deref(), Some("m-1"));
    /// ```
    pub fn new(message_id: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            message_id: Some(message_id.into()),
            body: Some(body.into()),
        }
    }
}

/// Per-invocation switches for the loader.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LoadOptions {
    /// Insert a placeholder collection when items reference an unknown one.
    pub create_collections_if_missing: bool,
}

/// Outcome of one batch.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchLoadReport {
    /// Message identifiers to hand back for redelivery, in encounter order.
    pub failed_message_ids: Vec<String>,
    /// Items written to the catalogue.
    pub loaded_items: usize,
    /// Collections written to the catalogue, placeholders included.
    pub loaded_collections: usize,
    /// Superseded duplicates dropped before writing.
    pub discarded_duplicates: usize,
}

impl BatchLoadReport {
    /// Record `message_id` as failed unless it is already listed.
    pub fn fail(&mut self, message_id: &str) {
        if !self.failed_message_ids.iter().any(|id| id == message_id) {
            self.failed_message_ids.push(message_id.to_owned());
        }
    }

    /// Whether every record in the batch succeeded.
    pub fn is_clean(&self) -> bool {
        self.failed_message_ids.is_empty()
    }
}

/// Driving port for batch ingestion.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait StacBatchLoader: Send + Sync {
    /// Load one batch, reporting per-message failures in the result.
    ///
    /// `Err` means the whole invocation failed and every record should be
    /// redelivered.
    async fn load_batch(
        &self,
        records: Vec<BatchRecord>,
        options: LoadOptions,
    ) -> Result<BatchLoadReport, Error>;
}

/// Fixture loader that accepts every batch without side effects.
#[derive(Debug, Clone, Copy, Default)]
pub struct FixtureStacBatchLoader;

#[async_trait]
impl StacBatchLoader for FixtureStacBatchLoader {
    async fn load_batch(
        &self,
        _records: Vec<BatchRecord>,
        _options: LoadOptions,
    ) -> Result<BatchLoadReport, Error> {
        Ok(BatchLoadReport::default())
    }
}
