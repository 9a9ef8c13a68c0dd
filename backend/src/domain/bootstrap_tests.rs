//! Unit coverage for database bootstrapping.

use std::sync::{Arc, Mutex};

use rstest::{fixture, rstest};
use serde_json::json;

use super::{
    BootstrapRequest, DatabaseBootstrapService, customization_statements, grant_statements,
    quote_identifier, quote_literal, role_statement,
};
use crate::domain::ErrorCode;
use crate::domain::ports::{
    DatabaseBootstrapperError, MockDatabaseBootstrapper, MockPgstacMigrator, MockSecretStore,
    PgstacMigratorError, SecretStoreError,
};

type Executed = Arc<Mutex<Vec<(String, String, Vec<String>)>>>;

fn secrets() -> MockSecretStore {
    let mut store = MockSecretStore::new();
    store.expect_get_secret_string().returning(|id| match id {
        "admin" => Ok(json!({
            "dbname": "postgres", "engine": "postgres", "port": 5432,
            "host": "db.internal", "username": "postgres", "password": "root"
        })
        .to_string()),
        "user" => Ok(json!({
            "dbname": "postgis", "engine": "postgres", "port": "5432",
            "host": "ignored", "username": "pgstac_user", "password": "o'brien"
        })
        .to_string()),
        other => Err(SecretStoreError::not_found(other)),
    });
    store
}

#[fixture]
fn request() -> BootstrapRequest {
    BootstrapRequest {
        admin_secret: "admin".to_owned(),
        user_secret: "user".to_owned(),
        pgstac_version: "0.9.5".to_owned(),
        context: false,
        mosaic_index: true,
    }
}

fn recording_bootstrapper(
    database_exists: bool,
    role_exists: bool,
) -> (MockDatabaseBootstrapper, Executed) {
    let executed: Executed = Arc::default();
    let mut bootstrapper = MockDatabaseBootstrapper::new();
    bootstrapper
        .expect_database_exists()
        .withf(|admin, dbname| admin.dbname == "postgres" && dbname == "postgis")
        .returning(move |_, _| Ok(database_exists));
    bootstrapper
        .expect_role_exists()
        .withf(|_, role| role == "pgstac_user")
        .returning(move |_, _| Ok(role_exists));
    let sink = Arc::clone(&executed);
    bootstrapper.expect_execute().returning(move |target, statements| {
        sink.lock().expect("lock").push((
            target.dbname.clone(),
            target.username.clone(),
            statements.to_vec(),
        ));
        Ok(())
    });
    (bootstrapper, executed)
}

fn migrator_expecting(version: &'static str) -> MockPgstacMigrator {
    let mut migrator = MockPgstacMigrator::new();
    migrator
        .expect_migrate()
        .withf(move |target, requested| {
            target.dbname == "postgis" && target.username == "postgres" && requested == version
        })
        .times(1)
        .returning(|_, _| Ok(()));
    migrator
}

#[rstest]
#[tokio::test]
async fn fresh_server_gets_database_role_and_grants(request: BootstrapRequest) {
    let (bootstrapper, executed) = recording_bootstrapper(false, false);
    let service = DatabaseBootstrapService::new(
        Arc::new(bootstrapper),
        Arc::new(secrets()),
        Arc::new(migrator_expecting("0.9.5")),
    );

    let report = service.bootstrap(&request).await.expect("bootstrap succeeds");

    assert!(report.database_created);
    assert!(report.role_created);
    let executed = executed.lock().expect("lock").clone();
    assert_eq!(executed[0].0, "postgres");
    assert_eq!(executed[0].2, vec![r#"CREATE DATABASE "postgis""#]);
    assert_eq!(
        executed[1].2,
        vec![r#"CREATE USER "pgstac_user" WITH PASSWORD 'o''brien'"#]
    );
    assert_eq!(executed[2].0, "postgis");
    assert_eq!(executed[2].2, vec!["CREATE EXTENSION IF NOT EXISTS postgis"]);
    assert_eq!(executed[3].2[0], "SET search_path TO pgstac, public");
    assert!(executed[3].2.iter().any(|s| s == r#"GRANT pgstac_admin TO "pgstac_user""#));
    assert!(executed[3].2.iter().any(|s| s.starts_with("CREATE INDEX IF NOT EXISTS searches_mosaic")));
    assert_eq!(executed[4].1, "pgstac_user");
    assert_eq!(executed.len(), 5);
}

#[rstest]
#[tokio::test]
async fn rerun_resets_password_without_recreating(request: BootstrapRequest) {
    let (bootstrapper, executed) = recording_bootstrapper(true, true);
    let service = DatabaseBootstrapService::new(
        Arc::new(bootstrapper),
        Arc::new(secrets()),
        Arc::new(migrator_expecting("0.9.5")),
    );

    let report = service.bootstrap(&request).await.expect("bootstrap succeeds");

    assert!(!report.database_created);
    assert!(!report.role_created);
    let executed = executed.lock().expect("lock").clone();
    assert!(executed[0].2[0].starts_with(r#"ALTER USER "pgstac_user""#));
    assert!(
        executed
            .iter()
            .all(|(_, _, statements)| statements.iter().all(|s| !s.starts_with("CREATE DATABASE")))
    );
}

#[rstest]
#[tokio::test]
async fn missing_secret_is_not_found(mut request: BootstrapRequest) {
    request.user_secret = "absent".to_owned();
    let service = DatabaseBootstrapService::new(
        Arc::new(MockDatabaseBootstrapper::new()),
        Arc::new(secrets()),
        Arc::new(MockPgstacMigrator::new()),
    );

    let err = service.bootstrap(&request).await.expect_err("secret missing");

    assert_eq!(err.code(), ErrorCode::NotFound);
}

#[rstest]
#[tokio::test]
async fn migration_failure_stops_before_grants(request: BootstrapRequest) {
    let (bootstrapper, executed) = recording_bootstrapper(true, true);
    let mut migrator = MockPgstacMigrator::new();
    migrator
        .expect_migrate()
        .returning(|_, _| Err(PgstacMigratorError::failed(Some(1), "relation missing")));
    let service =
        DatabaseBootstrapService::new(Arc::new(bootstrapper), Arc::new(secrets()), Arc::new(migrator));

    let err = service.bootstrap(&request).await.expect_err("migration fails");

    assert_eq!(err.code(), ErrorCode::InternalError);
    assert_eq!(executed.lock().expect("lock").len(), 2);
}

#[rstest]
#[tokio::test]
async fn connection_failure_is_service_unavailable(request: BootstrapRequest) {
    let mut bootstrapper = MockDatabaseBootstrapper::new();
    bootstrapper
        .expect_database_exists()
        .returning(|_, _| Err(DatabaseBootstrapperError::connection("timeout")));
    let service = DatabaseBootstrapService::new(
        Arc::new(bootstrapper),
        Arc::new(secrets()),
        Arc::new(MockPgstacMigrator::new()),
    );

    let err = service.bootstrap(&request).await.expect_err("unreachable");

    assert_eq!(err.code(), ErrorCode::ServiceUnavailable);
}

#[rstest]
fn quoting_doubles_delimiters() {
    assert_eq!(quote_identifier(r#"a"b"#), r#""a""b""#);
    assert_eq!(quote_literal("a'b"), "'a''b'");
    assert_eq!(
        role_statement("u", "p'w", false),
        r#"CREATE USER "u" WITH PASSWORD 'p''w'"#
    );
}

#[rstest]
fn grants_cover_every_pgstac_role() {
    let statements = grant_statements("postgis", "app");
    for role in ["pgstac_read", "pgstac_ingest", "pgstac_admin"] {
        assert!(statements.contains(&format!(r#"GRANT {role} TO "app""#)));
    }
    assert!(statements.contains(&r#"GRANT CONNECT ON DATABASE "postgis" TO "app""#.to_owned()));
}

#[rstest]
#[case(false, false, 0)]
#[case(true, false, 1)]
#[case(false, true, 1)]
#[case(true, true, 2)]
fn customization_follows_flags(#[case] context: bool, #[case] mosaic: bool, #[case] count: usize) {
    assert_eq!(customization_statements(context, mosaic).len(), count);
}
