use super::*;
use rstest::rstest;
use serde_json::{Map, json};

#[rstest]
#[case("Pending", CommandStatus::Pending)]
#[case("InProgress", CommandStatus::InProgress)]
#[case("Delayed", CommandStatus::Delayed)]
#[case("Success", CommandStatus::Success)]
#[case("Failed", CommandStatus::Failed)]
#[case("Cancelled", CommandStatus::Cancelled)]
#[case("Cancelling", CommandStatus::Cancelling)]
#[case("TimedOut", CommandStatus::TimedOut)]
fn command_status_parses_known_values(#[case] raw: &str, #[case] expected: CommandStatus) {
    let parsed = CommandStatus::parse(raw);
    assert_eq!(parsed, expected);
    assert_eq!(parsed.as_str(), raw);
}

#[rstest]
fn command_status_keeps_unknown_values() {
    let parsed = CommandStatus::parse("Terminated");
    assert_eq!(parsed, CommandStatus::Other("Terminated".into()));
    assert_eq!(parsed.as_str(), "Terminated");
    assert!(!parsed.is_aborted());
}

#[rstest]
#[case(CommandStatus::Cancelled, true)]
#[case(CommandStatus::Cancelling, true)]
#[case(CommandStatus::TimedOut, true)]
#[case(CommandStatus::Failed, false)]
#[case(CommandStatus::InProgress, false)]
fn aborted_statuses(#[case] status: CommandStatus, #[case] aborted: bool) {
    assert_eq!(status.is_aborted(), aborted);
}

#[rstest]
fn batch_report_lists_each_failure_once() {
    let mut report = BatchLoadReport::default();
    report.fail("m-2");
    report.fail("m-1");
    report.fail("m-2");

    assert_eq!(report.failed_message_ids, vec!["m-2", "m-1"]);
    assert!(!report.is_clean());
}

#[rstest]
fn missing_collection_is_not_retryable() {
    assert!(!CatalogRepositoryError::missing_collection("landsat").is_retryable());
    assert!(CatalogRepositoryError::query("deadlock detected").is_retryable());
    assert!(CatalogRepositoryError::connection("refused").is_retryable());
}

#[rstest]
fn deployment_report_uses_pascal_case_keys() {
    let mut data = Map::new();
    data.insert("SecretArn".into(), json!("arn:aws:secretsmanager:target"));
    let report = DeploymentReport {
        status: DeploymentStatus::Failed,
        reason: "boom".into(),
        physical_resource_id: "pgbouncer-health-i-123".into(),
        stack_id: "stack".into(),
        request_id: "req".into(),
        logical_resource_id: "Health".into(),
        data,
    };

    let value = serde_json::to_value(&report).expect("serialise report");
    assert_eq!(
        value,
        json!({
            "Status": "FAILED",
            "Reason": "boom",
            "PhysicalResourceId": "pgbouncer-health-i-123",
            "StackId": "stack",
            "RequestId": "req",
            "LogicalResourceId": "Health",
            "Data": {"SecretArn": "arn:aws:secretsmanager:target"}
        })
    );
}

#[tokio::test]
async fn fixture_object_store_reports_missing_objects() {
    let location = crate::domain::ObjectLocation {
        bucket: "bucket".into(),
        key: "items/a.json".into(),
    };
    let err = FixtureObjectStore
        .get_object(&location)
        .await
        .expect_err("fixture has no objects");
    assert_eq!(err, ObjectStoreError::not_found("s3://bucket/items/a.json"));
}

#[tokio::test]
async fn fixture_loader_reports_clean_batches() {
    let report = FixtureStacBatchLoader
        .load_batch(vec![BatchRecord::new("m-1", "{}")], LoadOptions::default())
        .await
        .expect("fixture succeeds");
    assert!(report.is_clean());
}

#[tokio::test]
async fn fixture_catalog_accepts_every_write() {
    let repository = FixtureCatalogRepository;
    assert!(repository.collection_exists("landsat").await.expect("lookup"));
    repository
        .upsert_items("landsat", &[])
        .await
        .expect("fixture accepts items");
}

#[tokio::test]
async fn fixture_publisher_returns_default_receipt() {
    let receipt = FixtureRecordPublisher
        .publish("arn:aws:sns:topic", "{}")
        .await
        .expect("fixture publishes");
    assert_eq!(receipt, PublishReceipt::default());
}
