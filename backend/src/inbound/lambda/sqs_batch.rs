//! SQS batch decoding and partial-failure responses.
//!
//! The event source mapping is configured with `ReportBatchItemFailures`, so
//! only message ids listed in the response are redelivered.

use aws_lambda_events::event::sqs::SqsEvent;
use serde::Serialize;

use crate::domain::ports::{BatchLoadReport, BatchRecord};

/// One message the queue should redeliver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchItemFailure {
    pub item_identifier: String,
}

/// Partial batch response returned to the event source mapping.
///
/// # Examples
/// ```
/// use stac_backend::domain::ports::BatchLoadReport;
/// use stac_backend::inbound::lambda::BatchResponse;
///
/// let response = BatchResponse::from(&BatchLoadReport::default());
/// assert_eq!(
///     serde_json::to_string(&response).expect("serialise"),
///     r#"{"batchItemFailures":[]}"#
/// );
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchResponse {
    pub batch_item_failures: Vec<BatchItemFailure>,
}

impl From<&BatchLoadReport> for BatchResponse {
    fn from(report: &BatchLoadReport) -> Self {
        Self {
            batch_item_failures: report
                .failed_message_ids
                .iter()
                .map(|id| BatchItemFailure {
                    item_identifier: id.clone(),
                })
                .collect(),
        }
    }
}

/// Convert an SQS event into domain batch records, preserving order.
pub fn records_from_event(event: SqsEvent) -> Vec<BatchRecord> {
    event
        .records
        .into_iter()
        .map(|message| BatchRecord {
            message_id: message.message_id,
            body: message.body,
        })
        .collect()
}
