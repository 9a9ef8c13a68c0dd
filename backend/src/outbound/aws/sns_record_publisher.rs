//! SNS-backed record publisher.

use async_trait::async_trait;
use aws_sdk_sns::Client;
use aws_sdk_sns::error::{DisplayErrorContext, SdkError};
use aws_sdk_sns::operation::publish::PublishError;

use crate::domain::ports::{PublishReceipt, RecordPublisher, RecordPublisherError};

/// Publishes generated records to the ingestion topic.
#[derive(Clone, Debug)]
pub struct SnsRecordPublisher {
    client: Client,
}

impl SnsRecordPublisher {
    /// Build an adapter from shared SDK configuration.
    pub fn new(sdk_config: &aws_config::SdkConfig) -> Self {
        Self::from_client(Client::new(sdk_config))
    }

    /// Wrap a pre-built client.
    pub fn from_client(client: Client) -> Self {
        Self { client }
    }
}

fn map_publish_error(error: SdkError<PublishError>) -> RecordPublisherError {
    let rejected = error.as_service_error().is_some_and(|service_error| {
        service_error.is_invalid_parameter_exception()
            || service_error.is_invalid_parameter_value_exception()
            || service_error.is_not_found_exception()
            || service_error.is_authorization_error_exception()
    });
    let message = DisplayErrorContext(&error).to_string();
    if rejected {
        RecordPublisherError::rejected(message)
    } else {
        RecordPublisherError::transport(message)
    }
}

#[async_trait]
impl RecordPublisher for SnsRecordPublisher {
    async fn publish(
        &self,
        topic_arn: &str,
        message: &str,
    ) -> Result<PublishReceipt, RecordPublisherError> {
        let output = self
            .client
            .publish()
            .topic_arn(topic_arn)
            .message(message)
            .send()
            .await
            .map_err(map_publish_error)?;

        Ok(PublishReceipt {
            message_id: output.message_id().map(str::to_owned),
        })
    }
}
