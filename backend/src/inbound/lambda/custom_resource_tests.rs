//! Unit coverage for custom-resource handling.

use std::sync::Arc;
use std::time::Duration;

use rstest::{fixture, rstest};
use serde_json::{Value, json};

use super::*;
use crate::domain::ports::{
    CommandInvocation, CommandStatus, MockDatabaseBootstrapper, MockPgstacMigrator,
    MockSecretStore,
};
use crate::domain::HealthCheckPolicy;
use crate::test_support::{ImmediateSleeper, InMemorySecretStore, ScriptedPoolerHost};

const SOURCE: &str = "arn:secret:source";
const TARGET: &str = "arn:secret:target";

fn event(request_type: &str, properties: Value) -> CustomResourceEvent {
    serde_json::from_value(json!({
        "RequestType": request_type,
        "ResponseURL": "https://example.invalid/presigned",
        "StackId": "stack-1",
        "RequestId": "req-1",
        "LogicalResourceId": "PoolerHealth",
        "ResourceType": "Custom::PgBouncerHealth",
        "ResourceProperties": properties,
    }))
    .expect("event parses")
}

#[fixture]
fn quick_policy() -> HealthCheckPolicy {
    HealthCheckPolicy {
        readiness_attempts: 2,
        readiness_interval: Duration::from_secs(1),
        command_timeout: Duration::from_secs(60),
        command_poll_attempts: 2,
        command_poll_interval: Duration::from_secs(1),
    }
}

fn health_service(
    host: ScriptedPoolerHost,
    policy: HealthCheckPolicy,
) -> (Arc<ScriptedPoolerHost>, PoolerHealthCheckService<ScriptedPoolerHost>) {
    let host = Arc::new(host);
    let service = PoolerHealthCheckService::new(host.clone(), Arc::new(ImmediateSleeper), policy);
    (host, service)
}

#[rstest]
fn event_parses_cloudformation_shape() {
    let parsed = event("Update", json!({"InstanceId": "i-1"}));

    assert_eq!(parsed.request_type, RequestType::Update);
    assert_eq!(parsed.response_url, "https://example.invalid/presigned");
    assert_eq!(parsed.physical_resource_id, None);
    assert_eq!(parsed.string_property("InstanceId"), Some("i-1"));
}

#[rstest]
fn report_falls_back_to_log_stream() {
    let parsed = event("Create", json!({}));

    let report = parsed.report(ResourceOutcome::success(None, Map::new()), "2026/10/15/[$LATEST]abc");

    assert_eq!(report.status, DeploymentStatus::Success);
    assert_eq!(report.physical_resource_id, "2026/10/15/[$LATEST]abc");
    assert_eq!(
        report.reason,
        "See the details in CloudWatch Log Stream: 2026/10/15/[$LATEST]abc"
    );
    assert_eq!(report.stack_id, "stack-1");
    assert_eq!(report.request_id, "req-1");
    assert_eq!(report.logical_resource_id, "PoolerHealth");
}

#[rstest]
#[case(json!(true), true)]
#[case(json!("TRUE"), true)]
#[case(json!("false"), false)]
#[case(Value::Null, true)]
fn bool_property_accepts_stringified_values(#[case] raw: Value, #[case] expected: bool) {
    let parsed = event("Create", json!({"flag": raw}));

    assert_eq!(parsed.bool_property("flag", true).expect("boolean"), expected);
}

#[rstest]
fn bool_property_rejects_other_shapes() {
    let parsed = event("Create", json!({"flag": 1}));

    assert!(parsed.bool_property("flag", false).is_err());
}

#[rstest]
#[tokio::test]
async fn health_check_delete_does_no_work(quick_policy: HealthCheckPolicy) {
    let (host, service) = health_service(ScriptedPoolerHost::never_ready(), quick_policy);
    let mut parsed = event("Delete", json!({"InstanceId": "i-1"}));
    parsed.physical_resource_id = Some("pgbouncer-health-i-1".to_owned());

    let outcome = handle_health_check(&service, &parsed).await;

    assert_eq!(outcome.status, DeploymentStatus::Success);
    assert_eq!(outcome.physical_resource_id.as_deref(), Some("pgbouncer-health-i-1"));
    assert!(host.sent_scripts().is_empty());
}

#[rstest]
#[tokio::test]
async fn health_check_requires_instance_id(quick_policy: HealthCheckPolicy) {
    let (_host, service) = health_service(ScriptedPoolerHost::healthy(), quick_policy);

    let outcome = handle_health_check(&service, &event("Create", json!({}))).await;

    assert_eq!(outcome.status, DeploymentStatus::Failed);
    assert_eq!(outcome.physical_resource_id.as_deref(), Some("pgbouncer-health-unknown"));
    assert_eq!(outcome.reason.as_deref(), Some("InstanceId is required"));
}

#[rstest]
#[tokio::test]
async fn healthy_pooler_reports_success(quick_policy: HealthCheckPolicy) {
    let (host, service) = health_service(ScriptedPoolerHost::healthy(), quick_policy);

    let outcome = handle_health_check(&service, &event("Create", json!({"InstanceId": "i-1"}))).await;

    assert_eq!(outcome.status, DeploymentStatus::Success);
    assert_eq!(outcome.physical_resource_id.as_deref(), Some("pgbouncer-health-i-1"));
    assert_eq!(outcome.data.get("Message"), Some(&json!("PgBouncer is healthy")));
    assert_eq!(host.sent_scripts().len(), 1);
}

#[rstest]
#[tokio::test]
async fn unready_pooler_fails_with_diagnostic_reason(quick_policy: HealthCheckPolicy) {
    let (host, service) = health_service(ScriptedPoolerHost::never_ready(), quick_policy);

    let outcome = handle_health_check(&service, &event("Create", json!({"InstanceId": "i-1"}))).await;

    assert_eq!(outcome.status, DeploymentStatus::Failed);
    let reason = outcome.reason.expect("reason");
    assert!(
        reason.starts_with("PgBouncer health check failed: instance i-1 did not become ready"),
        "unexpected reason: {reason}"
    );
    assert!(reason.ends_with("(last observation: instance not registered)"));
    assert!(host.sent_scripts().is_empty());
}

#[rstest]
#[tokio::test]
async fn timed_out_check_carries_last_output(quick_policy: HealthCheckPolicy) {
    let host = ScriptedPoolerHost::healthy().with_invocations([CommandInvocation {
        status: CommandStatus::InProgress,
        stdout: "setup marker present".to_owned(),
        stderr: "waiting on listener".to_owned(),
    }]);
    let (_host, service) = health_service(host, quick_policy);

    let outcome = handle_health_check(&service, &event("Update", json!({"InstanceId": "i-1"}))).await;

    let reason = outcome.reason.expect("reason");
    assert!(reason.contains("timed out"));
    assert!(reason.contains("stdout: setup marker present"));
    assert!(reason.contains("stderr: waiting on listener"));
}

#[rstest]
#[tokio::test]
async fn failed_check_reports_output_once(quick_policy: HealthCheckPolicy) {
    let host = ScriptedPoolerHost::healthy().with_invocations([CommandInvocation {
        status: CommandStatus::Failed,
        stdout: "setup marker present".to_owned(),
        stderr: "pgbouncer is not listening on 5432".to_owned(),
    }]);
    let (_host, service) = health_service(host, quick_policy);

    let outcome = handle_health_check(&service, &event("Create", json!({"InstanceId": "i-1"}))).await;

    assert_eq!(
        outcome.reason.as_deref(),
        Some(
            "PgBouncer health check failed: health check command failed; \
             stderr: pgbouncer is not listening on 5432; stdout: setup marker present"
        )
    );
    assert!(outcome.data.is_empty());
}

#[rstest]
fn verbose_failure_output_is_capped() {
    let reason = health_check_reason(HealthCheckError::HealthCheckFailed {
        stderr: "e".repeat(5000),
        stdout: "x".repeat(5000),
    });

    assert!(reason.chars().count() <= MAX_REASON_CHARS);
    assert!(!reason.contains(&"e".repeat(MAX_DIAGNOSTIC_CHARS + 1)));
    assert!(reason.contains(&"e".repeat(MAX_DIAGNOSTIC_CHARS)));
}

#[rstest]
fn long_readiness_errors_are_capped() {
    let reason = health_check_reason(HealthCheckError::PoolerNotReady {
        instance_id: "i-1".to_owned(),
        attempts: 32,
        last_observation: "z".repeat(10_000),
    });

    assert_eq!(reason.chars().count(), MAX_REASON_CHARS);
}

#[rstest]
#[tokio::test]
async fn secret_update_points_target_at_pooler() {
    let secrets = Arc::new(InMemorySecretStore::new().with_secret(
        SOURCE,
        r#"{"dbname":"postgis","engine":"postgres","port":5432,"host":"db","username":"app","password":"pw"}"#,
    ));
    let service = SecretHostRewriteService::new(secrets.clone());

    let outcome =
        handle_secret_update(&service, SOURCE, TARGET, &event("Create", json!({"instanceIp": "10.0.0.5"}))).await;

    assert_eq!(outcome.status, DeploymentStatus::Success);
    assert_eq!(outcome.physical_resource_id.as_deref(), Some(TARGET));
    assert_eq!(outcome.data.get("SecretArn"), Some(&json!(TARGET)));
    let stored: Value =
        serde_json::from_str(&secrets.secret(TARGET).expect("target written")).expect("json");
    assert_eq!(stored["host"], json!("10.0.0.5"));
    assert_eq!(stored["password"], json!("pw"));
}

#[rstest]
#[tokio::test]
async fn secret_update_requires_instance_ip() {
    let secrets = Arc::new(InMemorySecretStore::new());
    let service = SecretHostRewriteService::new(secrets.clone());

    let outcome = handle_secret_update(&service, SOURCE, TARGET, &event("Create", json!({}))).await;

    assert_eq!(outcome.status, DeploymentStatus::Failed);
    assert_eq!(outcome.data.get("Error"), Some(&json!("instanceIp is required")));
    assert!(secrets.writes().is_empty());
}

#[rstest]
#[tokio::test]
async fn secret_update_reports_missing_source() {
    let service = SecretHostRewriteService::new(Arc::new(InMemorySecretStore::new()));

    let outcome =
        handle_secret_update(&service, SOURCE, TARGET, &event("Update", json!({"instanceIp": "10.0.0.5"}))).await;

    assert_eq!(outcome.status, DeploymentStatus::Failed);
    assert!(outcome.reason.expect("reason").contains(SOURCE));
}

#[rstest]
fn bootstrap_request_reads_properties() {
    let parsed = event(
        "Create",
        json!({
            "conn_secret_arn": "arn:admin",
            "new_user_secret_arn": "arn:user",
            "pgstac_version": "0.9.6",
            "context": "TRUE",
        }),
    );

    let request = bootstrap_request(&parsed).expect("request parses");

    assert_eq!(
        request,
        BootstrapRequest {
            admin_secret: "arn:admin".to_owned(),
            user_secret: "arn:user".to_owned(),
            pgstac_version: "0.9.6".to_owned(),
            context: true,
            mosaic_index: true,
        }
    );
}

#[rstest]
fn bootstrap_request_requires_version() {
    let parsed = event(
        "Create",
        json!({"conn_secret_arn": "arn:admin", "new_user_secret_arn": "arn:user"}),
    );

    let err = bootstrap_request(&parsed).expect_err("version missing");

    assert_eq!(err.to_string(), "pgstac_version is required");
}

#[rstest]
#[tokio::test]
async fn bootstrap_delete_takes_no_action() {
    let service = DatabaseBootstrapService::new(
        Arc::new(MockDatabaseBootstrapper::new()),
        Arc::new(MockSecretStore::new()),
        Arc::new(MockPgstacMigrator::new()),
    );

    let outcome = handle_bootstrap(&service, &event("Delete", json!({}))).await;

    assert_eq!(outcome.status, DeploymentStatus::Success);
    assert_eq!(outcome.data.get("msg"), Some(&json!("No action to be taken")));
}

#[rstest]
#[tokio::test]
async fn bootstrap_failure_is_reported() {
    let mut secrets = MockSecretStore::new();
    secrets
        .expect_get_secret_string()
        .returning(|id| Err(crate::domain::ports::SecretStoreError::not_found(id)));
    let service = DatabaseBootstrapService::new(
        Arc::new(MockDatabaseBootstrapper::new()),
        Arc::new(secrets),
        Arc::new(MockPgstacMigrator::new()),
    );
    let parsed = event(
        "Create",
        json!({
            "conn_secret_arn": "arn:admin",
            "new_user_secret_arn": "arn:user",
            "pgstac_version": "0.9.6",
        }),
    );

    let outcome = handle_bootstrap(&service, &parsed).await;

    assert_eq!(outcome.status, DeploymentStatus::Failed);
    assert_eq!(
        outcome.data.get("message"),
        Some(&json!("secret arn:admin was not found"))
    );
}
