//! Lambda running stactools item commands and publishing the resulting items.
#![cfg_attr(not(any(test, doctest)), deny(clippy::unwrap_used))]
#![cfg_attr(not(any(test, doctest)), deny(clippy::expect_used))]

use std::ffi::OsString;
use std::sync::Arc;

use aws_lambda_events::event::sqs::SqsEvent;
use lambda_runtime::{Error, LambdaEvent, run, service_fn};
use ortho_config::OrthoConfig as _;
use stac_backend::domain::ItemGenerationService;
use stac_backend::inbound::lambda::{BatchResponse, records_from_event};
use stac_backend::outbound::aws::{SnsRecordPublisher, load_sdk_config};
use stac_backend::outbound::process::UvxItemCommandRunner;
use stac_backend::settings::ItemGeneratorSettings;
use stac_backend::telemetry::init_tracing;
use tracing::info;

type Generator = ItemGenerationService<UvxItemCommandRunner, SnsRecordPublisher>;

async fn handle(generator: &Generator, event: LambdaEvent<SqsEvent>) -> Result<BatchResponse, Error> {
    let records = records_from_event(event.payload);
    let report = generator.generate_batch(records).await;
    info!(
        generated = report.loaded_items,
        failed = report.failed_message_ids.len(),
        "item generation batch finished"
    );
    Ok(BatchResponse::from(&report))
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    init_tracing();

    let settings = ItemGeneratorSettings::load_from_iter([OsString::from("item-generator")])
        .map_err(|error| Error::from(format!("load settings: {error}")))?;
    let sdk_config = load_sdk_config().await;

    let generator = Generator::new(
        Arc::new(UvxItemCommandRunner::new().with_timeout(settings.command_timeout())),
        Arc::new(SnsRecordPublisher::new(&sdk_config)),
        settings.item_load_topic_arn()?,
    );
    let generator = &generator;

    run(service_fn(move |event| async move { handle(generator, event).await })).await
}
