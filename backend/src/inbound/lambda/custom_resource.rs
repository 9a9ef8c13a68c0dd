//! CloudFormation custom-resource events and their handlers.
//!
//! Handlers never fail: every outcome, including malformed properties, is
//! turned into a [`DeploymentReport`] so the stack operation always receives
//! a reply instead of waiting for its timeout.

use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::{error, info};

use crate::domain::ports::{
    DatabaseBootstrapper, DeploymentReport, DeploymentStatus, DeploymentStatusReporter,
    DeploymentStatusReporterError, PgstacMigrator, PoolerHostControl, SecretStore,
};
use crate::domain::{
    BootstrapRequest, DatabaseBootstrapService, Error, HealthCheckError, PoolerHealthCheckService,
    RolloutError, SecretHostRewriteService,
};

/// Upper bound for each command output stream echoed into a failure reason.
const MAX_DIAGNOSTIC_CHARS: usize = 1024;
/// Upper bound for a whole failure reason; CloudFormation rejects response
/// bodies over 4096 bytes.
const MAX_REASON_CHARS: usize = 2048;

/// Lifecycle phase of the resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum RequestType {
    Create,
    Update,
    Delete,
}

/// Event delivered to a custom-resource function.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CustomResourceEvent {
    pub request_type: RequestType,
    #[serde(rename = "ResponseURL")]
    pub response_url: String,
    pub stack_id: String,
    pub request_id: String,
    pub logical_resource_id: String,
    #[serde(default)]
    pub physical_resource_id: Option<String>,
    #[serde(default)]
    pub resource_properties: Map<String, Value>,
}

/// Result of handling one event, before it is addressed to the stack.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceOutcome {
    status: DeploymentStatus,
    reason: Option<String>,
    physical_resource_id: Option<String>,
    data: Map<String, Value>,
}

impl ResourceOutcome {
    pub fn success(physical_resource_id: Option<String>, data: Map<String, Value>) -> Self {
        Self {
            status: DeploymentStatus::Success,
            reason: None,
            physical_resource_id,
            data,
        }
    }

    pub fn failure(
        physical_resource_id: Option<String>,
        reason: impl Into<String>,
        data: Map<String, Value>,
    ) -> Self {
        Self {
            status: DeploymentStatus::Failed,
            reason: Some(reason.into()),
            physical_resource_id,
            data,
        }
    }
}

fn data<const N: usize>(entries: [(&str, String); N]) -> Map<String, Value> {
    entries
        .into_iter()
        .map(|(key, value)| (key.to_owned(), Value::String(value)))
        .collect()
}

impl CustomResourceEvent {
    /// Non-blank string property.
    pub fn string_property(&self, key: &str) -> Option<&str> {
        self.resource_properties
            .get(key)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|value| !value.is_empty())
    }

    /// Boolean property. CloudFormation stringifies scalars, so `"true"` and
    /// `"false"` are accepted alongside JSON booleans.
    pub fn bool_property(&self, key: &str, default: bool) -> Result<bool, Error> {
        match self.resource_properties.get(key) {
            None | Some(Value::Null) => Ok(default),
            Some(Value::Bool(value)) => Ok(*value),
            Some(Value::String(raw)) if raw.eq_ignore_ascii_case("true") => Ok(true),
            Some(Value::String(raw)) if raw.eq_ignore_ascii_case("false") => Ok(false),
            Some(other) => Err(Error::invalid_request(format!(
                "ResourceProperties.{key} must be a boolean, got {other}"
            ))),
        }
    }

    fn required_property(&self, key: &str) -> Result<&str, Error> {
        self.string_property(key)
            .ok_or_else(|| Error::invalid_request(format!("{key} is required")))
    }

    /// Address `outcome` to this event.
    ///
    /// Without an explicit physical id or reason, the log stream name is used
    /// so operators can find the invocation's logs.
    pub fn report(&self, outcome: ResourceOutcome, log_stream: &str) -> DeploymentReport {
        DeploymentReport {
            status: outcome.status,
            reason: outcome.reason.unwrap_or_else(|| {
                format!("See the details in CloudWatch Log Stream: {log_stream}")
            }),
            physical_resource_id: outcome
                .physical_resource_id
                .unwrap_or_else(|| log_stream.to_owned()),
            stack_id: self.stack_id.clone(),
            request_id: self.request_id.clone(),
            logical_resource_id: self.logical_resource_id.clone(),
            data: outcome.data,
        }
    }

    fn is_delete(&self) -> bool {
        self.request_type == RequestType::Delete
    }
}

/// Address `outcome` to `event` and send it to the response URL.
pub async fn deliver<R>(
    reporter: &R,
    event: &CustomResourceEvent,
    outcome: ResourceOutcome,
    log_stream: &str,
) -> Result<(), DeploymentStatusReporterError>
where
    R: DeploymentStatusReporter + ?Sized,
{
    let report = event.report(outcome, log_stream);
    info!(
        status = ?report.status,
        physical_resource_id = %report.physical_resource_id,
        "sending custom resource response"
    );
    reporter.report(&event.response_url, &report).await
}

fn truncate(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((index, _)) => &text[..index],
        None => text,
    }
}

/// Failure reason carrying whatever output the check produced, capped so
/// the response always fits.
fn health_check_reason(error: HealthCheckError) -> String {
    let (stdout, stderr) = match &error {
        HealthCheckError::HealthCheckFailed { stdout, stderr }
        | HealthCheckError::HealthCheckTimedOut { stdout, stderr, .. } => {
            (stdout.clone(), stderr.clone())
        }
        _ => (String::new(), String::new()),
    };
    let mut reason = RolloutError::from(error).to_string();
    if !stderr.trim().is_empty() {
        reason.push_str(&format!(
            "; stderr: {}",
            truncate(stderr.trim(), MAX_DIAGNOSTIC_CHARS)
        ));
    }
    if !stdout.trim().is_empty() {
        reason.push_str(&format!(
            "; stdout: {}",
            truncate(stdout.trim(), MAX_DIAGNOSTIC_CHARS)
        ));
    }
    truncate(&reason, MAX_REASON_CHARS).to_owned()
}

/// Run the pooler health check for `ResourceProperties.InstanceId`.
pub async fn handle_health_check<H>(
    service: &PoolerHealthCheckService<H>,
    event: &CustomResourceEvent,
) -> ResourceOutcome
where
    H: PoolerHostControl,
{
    if event.is_delete() {
        info!("delete request, nothing to check");
        return ResourceOutcome::success(event.physical_resource_id.clone(), Map::new());
    }

    let instance_id = event.string_property("InstanceId");
    let physical_id = format!("pgbouncer-health-{}", instance_id.unwrap_or("unknown"));
    let Some(instance_id) = instance_id else {
        return ResourceOutcome::failure(Some(physical_id), "InstanceId is required", Map::new());
    };

    match service.check(instance_id).await {
        Ok(report) => ResourceOutcome::success(
            Some(physical_id),
            data([
                ("Message", "PgBouncer is healthy".to_owned()),
                ("CommandId", report.command_id),
            ]),
        ),
        Err(err) => {
            let reason = health_check_reason(err);
            error!(instance_id, %reason, "pooler health check failed");
            ResourceOutcome::failure(Some(physical_id), reason, Map::new())
        }
    }
}

/// Point the pooled credentials secret at `ResourceProperties.instanceIp`.
pub async fn handle_secret_update<S>(
    service: &SecretHostRewriteService<S>,
    source_secret: &str,
    target_secret: &str,
    event: &CustomResourceEvent,
) -> ResourceOutcome
where
    S: SecretStore,
{
    if event.is_delete() {
        return ResourceOutcome::success(event.physical_resource_id.clone(), Map::new());
    }

    let Some(pooler_host) = event.string_property("instanceIp") else {
        let message = "instanceIp is required";
        return ResourceOutcome::failure(None, message, data([("Error", message.to_owned())]));
    };

    match service
        .rewrite_host(source_secret, target_secret, pooler_host)
        .await
    {
        Ok(_) => ResourceOutcome::success(
            Some(target_secret.to_owned()),
            data([("SecretArn", target_secret.to_owned())]),
        ),
        Err(err) => {
            let message = err.to_string();
            error!(target_secret, %message, "pooler secret update failed");
            ResourceOutcome::failure(None, message.clone(), data([("Error", message)]))
        }
    }
}

/// Parse bootstrap inputs from the resource properties.
pub fn bootstrap_request(event: &CustomResourceEvent) -> Result<BootstrapRequest, Error> {
    Ok(BootstrapRequest {
        admin_secret: event.required_property("conn_secret_arn")?.to_owned(),
        user_secret: event.required_property("new_user_secret_arn")?.to_owned(),
        pgstac_version: event.required_property("pgstac_version")?.to_owned(),
        context: event.bool_property("context", false)?,
        mosaic_index: event.bool_property("mosaic_index", true)?,
    })
}

/// Create the catalogue database, role and pgstac schema.
pub async fn handle_bootstrap<B, S, M>(
    service: &DatabaseBootstrapService<B, S, M>,
    event: &CustomResourceEvent,
) -> ResourceOutcome
where
    B: DatabaseBootstrapper,
    S: SecretStore,
    M: PgstacMigrator,
{
    if event.is_delete() {
        return ResourceOutcome::success(
            event.physical_resource_id.clone(),
            data([("msg", "No action to be taken".to_owned())]),
        );
    }

    let result = match bootstrap_request(event) {
        Ok(request) => service.bootstrap(&request).await,
        Err(err) => Err(err),
    };
    match result {
        Ok(report) => {
            info!(
                dbname = %report.dbname,
                database_created = report.database_created,
                role_created = report.role_created,
                "database bootstrap complete"
            );
            ResourceOutcome::success(event.physical_resource_id.clone(), Map::new())
        }
        Err(err) => {
            let message = err.to_string();
            error!(%message, "unable to bootstrap database");
            ResourceOutcome::failure(
                event.physical_resource_id.clone(),
                message.clone(),
                data([("message", message)]),
            )
        }
    }
}

#[cfg(test)]
#[path = "custom_resource_tests.rs"]
mod tests;
