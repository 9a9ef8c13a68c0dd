//! Item generation: run a stactools command and publish its item.
//!
//! Each queue record carries an [`ItemRequest`] inside an SNS envelope. The
//! generated item is published to the ingestion topic, so it reaches the
//! catalogue through the same path as directly published records.

mod command;

use std::sync::Arc;

use serde_json::{Value, json};
use tracing::{info, warn};

pub use command::{ItemCommand, ItemRequest};

use crate::domain::ports::{
    BatchLoadReport, BatchRecord, ItemCommandRunner, ItemCommandRunnerError, PublishReceipt,
    RecordPublisher, RecordPublisherError,
};
use crate::domain::{Error, SnsEnvelope, StacItem};

/// File name the command writes inside the runner's working directory.
const OUTPUT_FILE: &str = "item.json";

/// Item produced and published for one request.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedItem {
    pub item: StacItem,
    pub receipt: PublishReceipt,
}

/// Domain service generating and publishing STAC items.
#[derive(Clone)]
pub struct ItemGenerationService<C, P> {
    runner: Arc<C>,
    publisher: Arc<P>,
    topic_arn: String,
}

impl<C, P> ItemGenerationService<C, P>
where
    C: ItemCommandRunner,
    P: RecordPublisher,
{
    pub fn new(runner: Arc<C>, publisher: Arc<P>, topic_arn: impl Into<String>) -> Self {
        Self {
            runner,
            publisher,
            topic_arn: topic_arn.into(),
        }
    }

    /// Generate one item and publish it.
    pub async fn generate(&self, request: ItemRequest) -> Result<GeneratedItem, Error> {
        request.validate()?;
        let command = ItemCommand::for_request(&request, OUTPUT_FILE);
        info!(package = %request.package_name, %command, "running item command");

        let mut document = self.runner.run(&command).await.map_err(map_runner_error)?;
        let collection_override = request
            .collection_id
            .as_deref()
            .map(str::trim)
            .filter(|collection_id| !collection_id.is_empty());
        if let Some(collection_id) = collection_override {
            if let Value::Object(fields) = &mut document {
                fields.insert("collection".to_owned(), Value::String(collection_id.to_owned()));
            }
        }
        let item = StacItem::from_value(document)
            .map_err(|err| Error::invalid_request(format!("generated item is invalid: {err}")))?;

        let message = item.clone().into_value().to_string();
        let receipt = self
            .publisher
            .publish(&self.topic_arn, &message)
            .await
            .map_err(map_publisher_error)?;
        info!(
            item_id = item.id(),
            collection_id = item.collection(),
            publish_message_id = receipt.message_id.as_deref().unwrap_or_default(),
            "published generated item"
        );
        Ok(GeneratedItem { item, receipt })
    }

    /// Process one queue batch; each failed record is reported for
    /// redelivery.
    pub async fn generate_batch(&self, records: Vec<BatchRecord>) -> BatchLoadReport {
        let mut report = BatchLoadReport::default();
        for record in records {
            let Some(message_id) = record.message_id else {
                warn!("skipping queue record without a message id");
                continue;
            };
            match self.process(record.body.as_deref()).await {
                Ok(_) => report.loaded_items += 1,
                Err(error) => {
                    warn!(message_id, code = ?error.code(), error = %error, "item generation failed");
                    report.fail(&message_id);
                }
            }
        }
        report
    }

    async fn process(&self, body: Option<&str>) -> Result<GeneratedItem, Error> {
        let body = body.ok_or_else(|| Error::invalid_request("queue record has no body"))?;
        let envelope =
            SnsEnvelope::from_body(body).map_err(|err| Error::invalid_request(err.to_string()))?;
        let request: ItemRequest = serde_json::from_str(&envelope.message)
            .map_err(|err| Error::invalid_request(format!("invalid item request: {err}")))?;
        self.generate(request).await
    }
}

fn map_runner_error(error: ItemCommandRunnerError) -> Error {
    match error {
        ItemCommandRunnerError::Spawn { message } => {
            Error::service_unavailable(format!("failed to start item command: {message}"))
        }
        ItemCommandRunnerError::Exit {
            status,
            stdout,
            stderr,
        } => Error::internal(format!("item command exited with status {status:?}"))
            .with_details(json!({"status": status, "stdout": stdout, "stderr": stderr})),
        ItemCommandRunnerError::TimedOut { seconds } => {
            Error::service_unavailable(format!("item command timed out after {seconds}s"))
        }
        ItemCommandRunnerError::Output { message } => {
            Error::internal(format!("item command output is invalid: {message}"))
        }
    }
}

fn map_publisher_error(error: RecordPublisherError) -> Error {
    match error {
        RecordPublisherError::Rejected { message } => {
            Error::invalid_request(format!("item publish rejected: {message}"))
        }
        RecordPublisherError::Transport { message } => {
            Error::service_unavailable(format!("item publish failed: {message}"))
        }
    }
}
