//! Custom-resource Lambda creating the catalogue database, role and pgstac
//! schema.
#![cfg_attr(not(any(test, doctest)), deny(clippy::unwrap_used))]
#![cfg_attr(not(any(test, doctest)), deny(clippy::expect_used))]

use std::sync::Arc;

use lambda_runtime::{Error, LambdaEvent, run, service_fn};
use stac_backend::domain::DatabaseBootstrapService;
use stac_backend::inbound::lambda::{CustomResourceEvent, deliver, handle_bootstrap};
use stac_backend::outbound::aws::{SecretsManagerStore, load_sdk_config};
use stac_backend::outbound::cloudformation::HttpDeploymentStatusReporter;
use stac_backend::outbound::persistence::DieselDatabaseBootstrapper;
use stac_backend::outbound::process::PypgstacMigrator;
use stac_backend::telemetry::init_tracing;

type Bootstrapper =
    DatabaseBootstrapService<DieselDatabaseBootstrapper, SecretsManagerStore, PypgstacMigrator>;

struct Handler {
    service: Bootstrapper,
    reporter: HttpDeploymentStatusReporter,
}

async fn handle(handler: &Handler, event: LambdaEvent<CustomResourceEvent>) -> Result<(), Error> {
    let (resource, context) = event.into_parts();
    let outcome = handle_bootstrap(&handler.service, &resource).await;
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

    let sdk_config = load_sdk_config().await;
    let handler = Handler {
        service: Bootstrapper::new(
            Arc::new(DieselDatabaseBootstrapper::new()),
            Arc::new(SecretsManagerStore::new(&sdk_config)),
            Arc::new(PypgstacMigrator::new()),
        ),
        reporter: HttpDeploymentStatusReporter::new()?,
    };
    let handler = &handler;

    run(service_fn(move |event| async move { handle(handler, event).await })).await
}
