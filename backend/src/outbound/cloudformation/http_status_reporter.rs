//! Reqwest-backed custom-resource status reporter.
//!
//! The response URL is a pre-signed S3 URL. The signature covers the
//! `Content-Type` header, which the deployment engine signs as empty, so the
//! body is sent with an explicitly empty content type.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use tracing::info;

use crate::domain::ports::{
    DeploymentReport, DeploymentStatusReporter, DeploymentStatusReporterError,
};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Sends [`DeploymentReport`]s to the pre-signed response URL.
#[derive(Clone, Debug)]
pub struct HttpDeploymentStatusReporter {
    client: Client,
}

impl HttpDeploymentStatusReporter {
    /// Build a reporter with a 30 second request timeout.
    ///
    /// # Errors
    ///
    /// Returns an error when the reqwest client cannot be constructed.
    pub fn new() -> Result<Self, reqwest::Error> {
        Self::with_timeout(DEFAULT_TIMEOUT)
    }

    /// Build a reporter with an explicit request timeout.
    ///
    /// # Errors
    ///
    /// Returns an error when the reqwest client cannot be constructed.
    pub fn with_timeout(timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }
}

fn map_status(status: StatusCode) -> Result<(), DeploymentStatusReporterError> {
    if status.is_success() {
        Ok(())
    } else {
        Err(DeploymentStatusReporterError::rejected(status.as_u16()))
    }
}

#[async_trait]
impl DeploymentStatusReporter for HttpDeploymentStatusReporter {
    async fn report(
        &self,
        response_url: &str,
        report: &DeploymentReport,
    ) -> Result<(), DeploymentStatusReporterError> {
        let body = serde_json::to_vec(report)
            .map_err(|err| DeploymentStatusReporterError::transport(err.to_string()))?;

        let response = self
            .client
            .put(response_url)
            .header(reqwest::header::CONTENT_TYPE, "")
            .header(reqwest::header::CONTENT_LENGTH, body.len())
            .body(body)
            .send()
            .await
            .map_err(|err| DeploymentStatusReporterError::transport(err.without_url().to_string()))?;

        map_status(response.status())?;
        info!(
            logical_resource_id = %report.logical_resource_id,
            status = ?report.status,
            "deployment status delivered"
        );
        Ok(())
    }
}
