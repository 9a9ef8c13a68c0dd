//! Lambda consuming SQS batches of STAC records and upserting them into pgstac.
#![cfg_attr(not(any(test, doctest)), deny(clippy::unwrap_used))]
#![cfg_attr(not(any(test, doctest)), deny(clippy::expect_used))]

use std::ffi::OsString;
use std::sync::Arc;

use aws_lambda_events::event::sqs::SqsEvent;
use lambda_runtime::{Error, LambdaEvent, run, service_fn};
use ortho_config::OrthoConfig as _;
use stac_backend::domain::DatabaseCredentials;
use stac_backend::domain::StacLoaderService;
use stac_backend::domain::ports::{LoadOptions, SecretStore, StacBatchLoader};
use stac_backend::inbound::lambda::{BatchResponse, records_from_event};
use stac_backend::outbound::aws::{S3ObjectStore, SecretsManagerStore, load_sdk_config};
use stac_backend::outbound::persistence::{DbPool, DieselCatalogRepository, PoolConfig};
use stac_backend::settings::LoaderSettings;
use stac_backend::telemetry::init_tracing;
use tracing::info;

type Loader = StacLoaderService<S3ObjectStore, DieselCatalogRepository>;

async fn handle(
    loader: &Loader,
    options: LoadOptions,
    event: LambdaEvent<SqsEvent>,
) -> Result<BatchResponse, Error> {
    let records = records_from_event(event.payload);
    info!(records = records.len(), "received batch");
    let report = loader.load_batch(records, options).await?;
    Ok(BatchResponse::from(&report))
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    init_tracing();

    let settings = LoaderSettings::load_from_iter([OsString::from("stac-loader")])
        .map_err(|error| Error::from(format!("load settings: {error}")))?;
    let sdk_config = load_sdk_config().await;

    let secrets = SecretsManagerStore::new(&sdk_config);
    let raw = secrets
        .get_secret_string(settings.pgstac_secret_arn()?)
        .await?;
    let credentials = DatabaseCredentials::from_secret_string(&raw)?;
    let pool = DbPool::new(
        PoolConfig::from_credentials(&credentials)?.with_max_size(settings.pool_max_size()),
    )
    .await?;

    let loader = Loader::new(
        Arc::new(S3ObjectStore::new(&sdk_config)),
        Arc::new(DieselCatalogRepository::new(pool)),
    );
    let options = settings.load_options();
    let loader = &loader;

    run(service_fn(move |event| async move { handle(loader, options, event).await })).await
}
