//! Custom-resource Lambda pointing the pooled credentials secret at PgBouncer.
#![cfg_attr(not(any(test, doctest)), deny(clippy::unwrap_used))]
#![cfg_attr(not(any(test, doctest)), deny(clippy::expect_used))]

use std::ffi::OsString;
use std::sync::Arc;

use lambda_runtime::{Error, LambdaEvent, run, service_fn};
use ortho_config::OrthoConfig as _;
use stac_backend::domain::SecretHostRewriteService;
use stac_backend::inbound::lambda::{CustomResourceEvent, deliver, handle_secret_update};
use stac_backend::outbound::aws::{SecretsManagerStore, load_sdk_config};
use stac_backend::outbound::cloudformation::HttpDeploymentStatusReporter;
use stac_backend::settings::PoolerSecretSettings;
use stac_backend::telemetry::init_tracing;

struct Handler {
    service: SecretHostRewriteService<SecretsManagerStore>,
    reporter: HttpDeploymentStatusReporter,
    source_secret: String,
    target_secret: String,
}

async fn handle(handler: &Handler, event: LambdaEvent<CustomResourceEvent>) -> Result<(), Error> {
    let (resource, context) = event.into_parts();
    let outcome = handle_secret_update(
        &handler.service,
        &handler.source_secret,
        &handler.target_secret,
        &resource,
    )
    .await;
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

    let settings = PoolerSecretSettings::load_from_iter([OsString::from("pooler-secret-updater")])
        .map_err(|error| Error::from(format!("load settings: {error}")))?;
    let sdk_config = load_sdk_config().await;

    let handler = Handler {
        service: SecretHostRewriteService::new(Arc::new(SecretsManagerStore::new(&sdk_config)))
            .with_pooler_port(settings.pooler_port),
        reporter: HttpDeploymentStatusReporter::new()?,
        source_secret: settings.source_secret_arn()?.to_owned(),
        target_secret: settings.target_secret_arn()?.to_owned(),
    };
    let handler = &handler;

    run(service_fn(move |event| async move { handle(handler, event).await })).await
}
