//! Behaviour-driven tests for the STAC batch loader.
//!
//! Scenarios run the loader service against the in-memory catalogue and
//! object store, covering last-write-wins ordering, per-message failures,
//! placeholder collections, and redelivery.

use std::future::Future;
use std::sync::Arc;

use rstest::fixture;
use rstest_bdd::Slot;
use rstest_bdd_macros::{ScenarioState, given, scenario, then, when};
use serde_json::{Value, json};
use stac_backend::domain::ports::{BatchLoadReport, BatchRecord, LoadOptions, StacBatchLoader};
use stac_backend::domain::{StacCollection, StacLoaderService};
use stac_backend::test_support::{InMemoryCatalogRepository, InMemoryObjectStore};
use tokio::runtime::Runtime;

// -----------------------------------------------------------------------------
// Test World
// -----------------------------------------------------------------------------

/// Wrapper for non-Clone runtime handle.
#[derive(Clone)]
struct RuntimeHandle(Arc<Runtime>);

#[derive(Default, ScenarioState)]
struct StacLoaderWorld {
    runtime: Slot<RuntimeHandle>,
    catalog: Slot<Arc<InMemoryCatalogRepository>>,
    objects: Slot<Vec<(String, String, Value)>>,
    records: Slot<Vec<BatchRecord>>,
    create_collections: Slot<bool>,
    last_report: Slot<Result<BatchLoadReport, String>>,
}

impl StacLoaderWorld {
    fn block_on<F: Future>(&self, future: F) -> F::Output {
        let handle = match self.runtime.get() {
            Some(handle) => handle,
            None => {
                let handle = RuntimeHandle(Arc::new(Runtime::new().expect("create runtime")));
                self.runtime.set(handle.clone());
                handle
            }
        };
        handle.0.block_on(future)
    }

    fn catalog(&self) -> Arc<InMemoryCatalogRepository> {
        self.catalog.get().expect("catalogue should be set up")
    }

    fn push_record(&self, record: BatchRecord) {
        let mut records = self.records.get().unwrap_or_default();
        records.push(record);
        self.records.set(records);
    }

    fn run_batch(&self) {
        let objects = self
            .objects
            .get()
            .unwrap_or_default()
            .into_iter()
            .fold(InMemoryObjectStore::new(), |store, (bucket, key, body)| {
                store.with_object(&bucket, &key, body.to_string())
            });
        let service = StacLoaderService::new(Arc::new(objects), self.catalog());
        let options = LoadOptions {
            create_collections_if_missing: self.create_collections.get().unwrap_or(false),
        };
        let records = self.records.get().unwrap_or_default();

        let result = self
            .block_on(service.load_batch(records, options))
            .map_err(|err| err.to_string());
        self.last_report.set(result);
    }

    fn report(&self) -> BatchLoadReport {
        self.last_report
            .get()
            .expect("batch should have been loaded")
            .expect("batch load should not fail as a whole")
    }
}

fn item_document(item_id: &str, collection_id: &str, marker: &str) -> Value {
    json!({
        "type": "Feature",
        "stac_version": "1.0.0",
        "id": item_id,
        "collection": collection_id,
        "geometry": {"type": "Point", "coordinates": [-2.97, 53.4]},
        "bbox": [-2.97, 53.4, -2.97, 53.4],
        "properties": {"datetime": "2026-03-01T10:00:00Z", "marker": marker},
        "links": [],
        "assets": {}
    })
}

fn collection_document(collection_id: &str) -> Value {
    json!({
        "type": "Collection",
        "stac_version": "1.0.0",
        "id": collection_id,
        "description": "Seeded for behaviour tests",
        "license": "proprietary",
        "extent": {
            "spatial": {"bbox": [[-180.0, -90.0, 180.0, 90.0]]},
            "temporal": {"interval": [[null, null]]}
        },
        "links": []
    })
}

fn envelope(message: &str, offset_seconds: u32) -> String {
    json!({
        "Type": "Notification",
        "Message": message,
        "Timestamp": format!("2026-03-01T10:00:{offset_seconds:02}.000Z"),
    })
    .to_string()
}

#[fixture]
fn world() -> StacLoaderWorld {
    StacLoaderWorld::default()
}

// -----------------------------------------------------------------------------
// Given Steps
// -----------------------------------------------------------------------------

#[given("an empty catalogue")]
fn an_empty_catalogue(world: &StacLoaderWorld) {
    world.catalog.set(Arc::new(InMemoryCatalogRepository::new()));
}

#[given("a catalogue with collection {collection_id}")]
fn a_catalogue_with_collection(world: &StacLoaderWorld, collection_id: String) {
    let collection = StacCollection::from_value(collection_document(&collection_id))
        .expect("seed collection is valid");
    world
        .catalog
        .set(Arc::new(InMemoryCatalogRepository::new().with_collection(collection)));
}

#[given("placeholder collections are enabled")]
fn placeholder_collections_are_enabled(world: &StacLoaderWorld) {
    world.create_collections.set(true);
}

#[given(
    "an item {item_id} in {collection_id} marked {marker} delivered as {message_id} after {offset} seconds"
)]
fn an_item_delivered(
    world: &StacLoaderWorld,
    item_id: String,
    collection_id: String,
    marker: String,
    message_id: String,
    offset: u32,
) {
    let document = item_document(&item_id, &collection_id, &marker);
    world.push_record(BatchRecord::new(
        message_id,
        envelope(&document.to_string(), offset),
    ));
}

#[given("an object {key} in bucket {bucket} holding item {item_id} in {collection_id}")]
fn an_object_holding_item(
    world: &StacLoaderWorld,
    key: String,
    bucket: String,
    item_id: String,
    collection_id: String,
) {
    let mut objects = world.objects.get().unwrap_or_default();
    objects.push((bucket, key, item_document(&item_id, &collection_id, "stored")));
    world.objects.set(objects);
}

#[given("a reference to {key} in bucket {bucket} delivered as {message_id}")]
fn a_reference_delivered(world: &StacLoaderWorld, key: String, bucket: String, message_id: String) {
    let event = json!({"Records": [{
        "eventSource": "aws:s3",
        "eventName": "ObjectCreated:Put",
        "s3": {"bucket": {"name": bucket}, "object": {"key": key}}
    }]});
    world.push_record(BatchRecord::new(message_id, envelope(&event.to_string(), 0)));
}

// -----------------------------------------------------------------------------
// When Steps
// -----------------------------------------------------------------------------

#[when("the batch is loaded")]
fn the_batch_is_loaded(world: &StacLoaderWorld) {
    world.run_batch();
}

#[when("the same batch is redelivered")]
fn the_same_batch_is_redelivered(world: &StacLoaderWorld) {
    world.run_batch();
}

// -----------------------------------------------------------------------------
// Then Steps
// -----------------------------------------------------------------------------

#[then("{count} items are stored")]
fn items_are_stored(world: &StacLoaderWorld, count: usize) {
    assert_eq!(world.catalog().items().len(), count);
}

#[then("no messages are reported as failed")]
fn no_messages_are_reported_as_failed(world: &StacLoaderWorld) {
    let report = world.report();
    assert!(
        report.is_clean(),
        "unexpected failures: {:?}",
        report.failed_message_ids
    );
}

#[then("only message {message_id} is reported as failed")]
fn only_message_is_reported_as_failed(world: &StacLoaderWorld, message_id: String) {
    assert_eq!(world.report().failed_message_ids, vec![message_id]);
}

#[then("item {item_id} in {collection_id} is marked {marker}")]
fn item_is_marked(world: &StacLoaderWorld, item_id: String, collection_id: String, marker: String) {
    let item = world
        .catalog()
        .item(&collection_id, &item_id)
        .expect("item should be stored");
    assert_eq!(item.document()["properties"]["marker"], json!(marker));
}

#[then("collection {collection_id} exists")]
fn collection_exists(world: &StacLoaderWorld, collection_id: String) {
    let collection = world
        .catalog()
        .collection(&collection_id)
        .expect("collection should be stored");
    assert_eq!(collection.id(), collection_id);
}

// -----------------------------------------------------------------------------
// Scenario Bindings
// -----------------------------------------------------------------------------

#[scenario(
    path = "tests/features/stac_loader.feature",
    name = "A published item is stored once"
)]
fn a_published_item_is_stored_once(world: StacLoaderWorld) {
    let _ = world;
}

#[scenario(
    path = "tests/features/stac_loader.feature",
    name = "The newest delivery of an item wins"
)]
fn the_newest_delivery_of_an_item_wins(world: StacLoaderWorld) {
    let _ = world;
}

#[scenario(
    path = "tests/features/stac_loader.feature",
    name = "Items for an unknown collection fail on their own"
)]
fn items_for_an_unknown_collection_fail_on_their_own(world: StacLoaderWorld) {
    let _ = world;
}

#[scenario(
    path = "tests/features/stac_loader.feature",
    name = "Unknown collections are created when placeholders are enabled"
)]
fn unknown_collections_are_created_when_enabled(world: StacLoaderWorld) {
    let _ = world;
}

#[scenario(
    path = "tests/features/stac_loader.feature",
    name = "A missing referenced object fails only its message"
)]
fn a_missing_referenced_object_fails_only_its_message(world: StacLoaderWorld) {
    let _ = world;
}

#[scenario(
    path = "tests/features/stac_loader.feature",
    name = "Loading the same batch twice leaves one row per item"
)]
fn loading_the_same_batch_twice_is_idempotent(world: StacLoaderWorld) {
    let _ = world;
}
