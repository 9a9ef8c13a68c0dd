//! Driven port for reporting custom-resource outcomes to the deployment
//! engine.

use async_trait::async_trait;
use serde::Serialize;
use serde_json::{Map, Value};

use super::define_port_error;

/// Final status of a custom-resource request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeploymentStatus {
    Success,
    Failed,
}

/// Response document expected at the pre-signed response URL.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct DeploymentReport {
    pub status: DeploymentStatus,
    pub reason: String,
    pub physical_resource_id: String,
    pub stack_id: String,
    pub request_id: String,
    pub logical_resource_id: String,
    pub data: Map<String, Value>,
}

define_port_error! {
    /// Errors raised while delivering a report.
    pub enum DeploymentStatusReporterError {
        /// The request could not be sent.
        Transport { message: String } =>
            "failed to send deployment status: {message}",
        /// The endpoint answered with a non-success status.
        Rejected { status: u16 } =>
            "deployment status endpoint returned HTTP {status}",
    }
}

/// Port for delivering custom-resource responses.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DeploymentStatusReporter: Send + Sync {
    /// PUT `report` to `response_url`.
    async fn report(
        &self,
        response_url: &str,
        report: &DeploymentReport,
    ) -> Result<(), DeploymentStatusReporterError>;
}
