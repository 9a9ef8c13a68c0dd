//! Custom-resource Lambda verifying PgBouncer before consumers switch to it.
#![cfg_attr(not(any(test, doctest)), deny(clippy::unwrap_used))]
#![cfg_attr(not(any(test, doctest)), deny(clippy::expect_used))]

use std::ffi::OsString;
use std::sync::Arc;

use lambda_runtime::{Error, LambdaEvent, run, service_fn};
use ortho_config::OrthoConfig as _;
use stac_backend::domain::{PoolerHealthCheckService, TokioSleeper};
use stac_backend::inbound::lambda::{CustomResourceEvent, deliver, handle_health_check};
use stac_backend::outbound::aws::{SsmPoolerHostControl, load_sdk_config};
use stac_backend::outbound::cloudformation::HttpDeploymentStatusReporter;
use stac_backend::settings::HealthCheckSettings;
use stac_backend::telemetry::init_tracing;

struct Handler {
    service: PoolerHealthCheckService<SsmPoolerHostControl>,
    reporter: HttpDeploymentStatusReporter,
}

async fn handle(handler: &Handler, event: LambdaEvent<CustomResourceEvent>) -> Result<(), Error> {
    let (resource, context) = event.into_parts();
    let outcome = handle_health_check(&handler.service, &resource).await;
    deliver(
        &handler.reporter,
        &resource,
        outcome,
        &context.env_config.log_stream,
    )
    .await?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    init_tracing();

    let settings = HealthCheckSettings::load_from_iter([OsString::from("pooler-health-check")])
        .map_err(|error| Error::from(format!("load settings: {error}")))?;
    let sdk_config = load_sdk_config().await;

    let handler = Handler {
        service: PoolerHealthCheckService::new(
            Arc::new(SsmPoolerHostControl::new(&sdk_config)),
            Arc::new(TokioSleeper),
            settings.policy(),
        ),
        reporter: HttpDeploymentStatusReporter::new()?,
    };
    let handler = &handler;

    run(service_fn(move |event| async move { handle(handler, event).await })).await
}
