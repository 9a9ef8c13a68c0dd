//! S3-backed object store.

use async_trait::async_trait;
use aws_sdk_s3::Client;
use aws_sdk_s3::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_s3::operation::get_object::GetObjectError;
use tracing::debug;

use crate::domain::ObjectLocation;
use crate::domain::ports::{ObjectStore, ObjectStoreError};

/// Reads STAC documents referenced by bucket notifications.
#[derive(Clone, Debug)]
pub struct S3ObjectStore {
    client: Client,
}

impl S3ObjectStore {
    /// Build an adapter from shared SDK configuration.
    pub fn new(sdk_config: &aws_config::SdkConfig) -> Self {
        Self::from_client(Client::new(sdk_config))
    }

    /// Wrap a pre-built client.
    pub fn from_client(client: Client) -> Self {
        Self { client }
    }
}

fn map_get_error(error: SdkError<GetObjectError>, location: &ObjectLocation) -> ObjectStoreError {
    if let Some(service_error) = error.as_service_error() {
        if service_error.is_no_such_key() {
            return ObjectStoreError::not_found(location.to_string());
        }
        if matches!(service_error.code(), Some("AccessDenied" | "NoSuchBucket")) {
            return ObjectStoreError::access(format!(
                "{location}: {}",
                DisplayErrorContext(&error)
            ));
        }
    }
    ObjectStoreError::transport(format!("{location}: {}", DisplayErrorContext(&error)))
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn get_object(&self, location: &ObjectLocation) -> Result<Vec<u8>, ObjectStoreError> {
        let output = self
            .client
            .get_object()
            .bucket(&location.bucket)
            .key(&location.key)
            .send()
            .await
            .map_err(|err| map_get_error(err, location))?;

        let bytes = output
            .body
            .collect()
            .await
            .map_err(|err| ObjectStoreError::transport(format!("{location}: {err}")))?
            .into_bytes();
        debug!(%location, size = bytes.len(), "object fetched");
        Ok(bytes.to_vec())
    }
}
