//! Lambda event shapes and response encoding.

pub mod custom_resource;
pub mod sqs_batch;

pub use custom_resource::{
    CustomResourceEvent, RequestType, ResourceOutcome, bootstrap_request, deliver,
    handle_bootstrap, handle_health_check, handle_secret_update,
};
pub use sqs_batch::{BatchItemFailure, BatchResponse, records_from_event};
