//! Within-batch de-duplication of catalogue records.
//!
//! Standard SNS topics and SQS queues do not preserve order, so one batch can
//! hold several versions of the same record. Only the version with the newest
//! SNS publish timestamp survives; older versions are dropped without being
//! written or retried. Ordering across batches is not guarded here: pgstac
//! upserts are unconditional, so a later batch always wins.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use tracing::debug;

use super::stac::{CatalogRecord, StacCollection, StacItem};

/// A decoded value tagged with its delivery metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct Delivered<T> {
    /// SQS message identifier used for failure reporting.
    pub message_id: String,
    /// SNS publish timestamp.
    pub delivered_at: DateTime<Utc>,
    /// Decoded payload.
    pub value: T,
}

/// Newest-wins view over one batch of decoded records.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DedupedBatch {
    collections: BTreeMap<String, Delivered<StacCollection>>,
    items: BTreeMap<String, BTreeMap<String, Delivered<StacItem>>>,
    discarded: usize,
}

impl DedupedBatch {
    /// Create an empty batch.
    pub fn new() -> Self {
        Self::default()
    }

    /// Offer a record to the batch, keeping it only if it is the newest
    /// version of its key seen so far.
    ///
    /// # Examples
    /// ```
    /// use chrono::{TimeZone, Utc};
    /// use serde_json::json;
    /// use stac_backend::domain::{CatalogRecord, DedupedBatch, Delivered};
    ///
    /// let record = |datetime: &str| {
    ///     CatalogRecord::from_value(json!({
    ///         "type": "Feature", "stac_version": "1.1.0", "id": "item-1",
    ///         "collection": "col-a", "geometry": null,
    ///         "properties": {"datetime": datetime}
    ///     }))
    ///     .expect("valid item")
    /// };
    /// let t1 = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).single().expect("t1");
    /// let t2 = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 5).single().expect("t2");
    ///
    /// let mut batch = DedupedBatch::new();
    /// batch.offer(Delivered { message_id: "m2".into(), delivered_at: t2, value: record("2021-02-01T00:00:00Z") });
    /// batch.offer(Delivered { message_id: "m1".into(), delivered_at: t1, value: record("2021-01-01T00:00:00Z") });
    ///
    /// assert_eq!(batch.item_count(), 1);
    /// assert_eq!(batch.discarded(), 1);
    /// ```
    pub fn offer(&mut self, delivered: Delivered<CatalogRecord>) {
        let Delivered {
            message_id,
            delivered_at,
            value,
        } = delivered;
        match value {
            CatalogRecord::Item(item) => {
                let group = self.items.entry(item.collection().to_owned()).or_default();
                let key = item.id().to_owned();
                let candidate = Delivered {
                    message_id,
                    delivered_at,
                    value: item,
                };
                if !keep_newest(group, key, candidate, "item") {
                    self.discarded += 1;
                }
            }
            CatalogRecord::Collection(collection) => {
                let key = collection.id().to_owned();
                let candidate = Delivered {
                    message_id,
                    delivered_at,
                    value: collection,
                };
                if !keep_newest(&mut self.collections, key, candidate, "collection") {
                    self.discarded += 1;
                }
            }
        }
    }

    /// Surviving collections keyed by id.
    pub fn collections(&self) -> &BTreeMap<String, Delivered<StacCollection>> {
        &self.collections
    }

    /// Surviving items grouped by collection id, then keyed by item id.
    pub fn items_by_collection(&self) -> &BTreeMap<String, BTreeMap<String, Delivered<StacItem>>> {
        &self.items
    }

    /// Number of surviving items across all collections.
    pub fn item_count(&self) -> usize {
        self.items.values().map(BTreeMap::len).sum()
    }

    /// Number of records dropped as superseded duplicates.
    pub fn discarded(&self) -> usize {
        self.discarded
    }

    /// Split the batch into its collection and item parts.
    pub fn into_parts(
        self,
    ) -> (
        BTreeMap<String, Delivered<StacCollection>>,
        BTreeMap<String, BTreeMap<String, Delivered<StacItem>>>,
    ) {
        (self.collections, self.items)
    }
}

/// Insert `candidate` under `key` unless an entry at least as new exists.
///
/// Returns `true` when the slot was empty. A clash always discards exactly
/// one record (the older one) and returns `false`. Ties keep the first
/// arrival.
fn keep_newest<T>(
    slots: &mut BTreeMap<String, Delivered<T>>,
    key: String,
    candidate: Delivered<T>,
    kind: &'static str,
) -> bool {
    match slots.get(&key) {
        None => {
            slots.insert(key, candidate);
            true
        }
        Some(existing) if candidate.delivered_at > existing.delivered_at => {
            debug!(
                message_id = %candidate.message_id,
                superseded_message_id = %existing.message_id,
                record_kind = kind,
                record_id = %key,
                old_timestamp = %existing.delivered_at,
                new_timestamp = %candidate.delivered_at,
                "replacing older version of record"
            );
            slots.insert(key, candidate);
            // The displaced entry is the discarded duplicate.
            false
        }
        Some(existing) => {
            debug!(
                message_id = %candidate.message_id,
                record_kind = kind,
                record_id = %key,
                existing_timestamp = %existing.delivered_at,
                message_timestamp = %candidate.delivered_at,
                "skipping older version of record"
            );
            false
        }
    }
}

#[cfg(test)]
mod tests {
    //! Newest-wins selection coverage.

    use super::*;
    use chrono::TimeZone;
    use rstest::rstest;
    use serde_json::json;

    fn at(seconds: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, seconds)
            .single()
            .expect("valid timestamp")
    }

    fn item(collection: &str, id: &str, datetime: &str) -> CatalogRecord {
        CatalogRecord::from_value(json!({
            "type": "Feature",
            "stac_version": "1.1.0",
            "id": id,
            "collection": collection,
            "geometry": null,
            "properties": {"datetime": datetime}
        }))
        .expect("valid item")
    }

    fn collection(id: &str, title: &str) -> CatalogRecord {
        CatalogRecord::from_value(json!({
            "type": "Collection",
            "id": id,
            "title": title,
            "description": id,
            "license": "proprietary",
            "extent": {"spatial": {"bbox": [[-180, -90, 180, 90]]}, "temporal": {"interval": [[null, null]]}},
            "links": [],
            "stac_version": "1.1.0"
        }))
        .expect("valid collection")
    }

    fn delivered(message_id: &str, seconds: u32, value: CatalogRecord) -> Delivered<CatalogRecord> {
        Delivered {
            message_id: message_id.to_owned(),
            delivered_at: at(seconds),
            value,
        }
    }

    fn surviving_item<'a>(batch: &'a DedupedBatch, collection: &str, id: &str) -> &'a Delivered<StacItem> {
        batch
            .items_by_collection()
            .get(collection)
            .and_then(|group| group.get(id))
            .expect("item should survive")
    }

    #[rstest]
    #[case(&[1, 2, 3], "m3")]
    #[case(&[3, 2, 1], "m3")]
    #[case(&[2, 3, 1], "m3")]
    fn newest_timestamp_wins_regardless_of_arrival_order(
        #[case] timestamps: &[u32],
        #[case] expected_message: &str,
    ) {
        let mut batch = DedupedBatch::new();
        for seconds in timestamps {
            let message_id = format!("m{seconds}");
            let datetime = format!("2021-01-0{seconds}T00:00:00Z");
            batch.offer(delivered(&message_id, *seconds, item("col-a", "item-1", &datetime)));
        }

        let survivor = surviving_item(&batch, "col-a", "item-1");
        assert_eq!(survivor.message_id, expected_message);
        assert_eq!(
            survivor.value.document()["properties"]["datetime"],
            "2021-01-03T00:00:00Z"
        );
        assert_eq!(batch.item_count(), 1);
        assert_eq!(batch.discarded(), 2);
    }

    #[rstest]
    fn equal_timestamps_keep_the_first_arrival() {
        let mut batch = DedupedBatch::new();
        batch.offer(delivered("first", 5, item("col-a", "item-1", "2021-01-01T00:00:00Z")));
        batch.offer(delivered("second", 5, item("col-a", "item-1", "2021-02-01T00:00:00Z")));

        assert_eq!(surviving_item(&batch, "col-a", "item-1").message_id, "first");
        assert_eq!(batch.discarded(), 1);
    }

    #[rstest]
    fn same_item_id_in_different_collections_is_not_a_duplicate() {
        let mut batch = DedupedBatch::new();
        batch.offer(delivered("m1", 1, item("col-a", "item-1", "2021-01-01T00:00:00Z")));
        batch.offer(delivered("m2", 2, item("col-b", "item-1", "2021-01-01T00:00:00Z")));

        assert_eq!(batch.item_count(), 2);
        assert_eq!(batch.discarded(), 0);
    }

    #[rstest]
    fn collections_are_deduplicated_by_id() {
        let mut batch = DedupedBatch::new();
        batch.offer(delivered("m1", 4, collection("col-a", "newest")));
        batch.offer(delivered("m2", 1, collection("col-a", "oldest")));
        batch.offer(delivered("m3", 2, collection("col-b", "only")));

        let collections = batch.collections();
        assert_eq!(collections.len(), 2);
        let survivor = collections.get("col-a").expect("col-a survives");
        assert_eq!(survivor.message_id, "m1");
        assert_eq!(survivor.value.document()["title"], "newest");
        assert_eq!(batch.discarded(), 1);
    }

    #[rstest]
    fn into_parts_returns_both_groups() {
        let mut batch = DedupedBatch::new();
        batch.offer(delivered("m1", 1, collection("col-a", "a")));
        batch.offer(delivered("m2", 1, item("col-a", "item-1", "2021-01-01T00:00:00Z")));

        let (collections, items) = batch.into_parts();
        assert_eq!(collections.len(), 1);
        assert_eq!(items.get("col-a").map(BTreeMap::len), Some(1));
    }
}
