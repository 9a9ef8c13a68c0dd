//! Driven port for publishing catalogue records to the ingestion topic.

use async_trait::async_trait;

use super::define_port_error;

/// Acknowledgement returned by the message bus.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PublishReceipt {
    /// Bus-assigned message identifier, when the bus returns one.
    pub message_id: Option<String>,
}

define_port_error! {
    /// Errors raised while publishing messages.
    pub enum RecordPublisherError {
        /// The bus refused the message (size limit, permissions, bad topic).
        Rejected { message: String } =>
            "publish rejected: {message}",
        /// The request failed in transit.
        Transport { message: String } =>
            "publish failed: {message}",
    }
}

/// Port for fan-out publication of JSON payloads.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RecordPublisher: Send + Sync {
    /// Publish `message` to `topic_arn`.
    async fn publish(
        &self,
        topic_arn: &str,
        message: &str,
    ) -> Result<PublishReceipt, RecordPublisherError>;
}

/// Fixture implementation that accepts everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct FixtureRecordPublisher;

#[async_trait]
impl RecordPublisher for FixtureRecordPublisher {
    async fn publish(
        &self,
        _topic_arn: &str,
        _message: &str,
    ) -> Result<PublishReceipt, RecordPublisherError> {
        Ok(PublishReceipt::default())
    }
}
