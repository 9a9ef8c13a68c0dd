//! AWS SDK adapters for the driven ports.
//!
//! Each adapter is built from a shared [`aws_config::SdkConfig`] so region,
//! credentials and retry settings come from the Lambda environment. Tests
//! construct adapters with `from_client` against a stubbed client instead.

mod s3_object_store;
mod secrets_manager_store;
mod sns_record_publisher;
mod ssm_pooler_host_control;

pub use s3_object_store::S3ObjectStore;
pub use secrets_manager_store::SecretsManagerStore;
pub use sns_record_publisher::SnsRecordPublisher;
pub use ssm_pooler_host_control::SsmPoolerHostControl;

/// Load the SDK configuration from the process environment.
pub async fn load_sdk_config() -> aws_config::SdkConfig {
    aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await
}
