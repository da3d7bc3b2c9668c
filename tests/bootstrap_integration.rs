//! Integration tests for tracking-table bootstrap, transactions and dry-run.

use pretty_assertions::assert_eq;
use strata::prelude::*;
use strata::strata_core::TrackingKind;
use strata::strata_core::testing::RecordingConnection;

/// A connection whose catalog reports a table once a CREATE TABLE for it has been seen
fn catalog_backed() -> RecordingConnection {
    RecordingConnection::new()
        .respond(
            "version()",
            vec![Row::new().with("version", "PostgreSQL 16.2 on x86_64-pc-linux-gnu")],
        )
        .respond(
            "SHOW search_path",
            vec![Row::new().with("search_path", "\"$user\", public")],
        )
        .respond_with("information_schema.tables", |params, history| {
            let table = params.first().and_then(Value::as_str).unwrap_or_default();
            let quoted = format!("\"{}\" (", table);
            let created = history
                .iter()
                .any(|s| s.sql.starts_with("CREATE TABLE") && s.sql.contains(&quoted));
            if created {
                vec![Row::new().with("table_name", table)]
            } else {
                Vec::new()
            }
        })
}

/// Bootstrapping twice creates the table once
#[tokio::test]
async fn test_bootstrap_is_idempotent() {
    let conn = catalog_backed();
    let driver = PgDriver::new(conn.clone(), DriverConfig::default()).unwrap();

    driver.create_migrations_table().await.unwrap();
    driver.create_migrations_table().await.unwrap();

    assert_eq!(conn.count_matching("CREATE TABLE"), 1);
    assert_eq!(
        conn.count_matching(r#"CREATE TABLE IF NOT EXISTS "migrations""#),
        1
    );

    driver.create_seeds_table().await.unwrap();
    assert_eq!(conn.count_matching("CREATE TABLE"), 2);
    assert_eq!(conn.count_matching(r#""seeds" ("id" SERIAL"#), 1);
}

/// A custom schema goes to the front of the search path once
#[tokio::test]
async fn test_custom_schema_search_path() {
    let conn = catalog_backed();
    let driver = PgDriver::new(
        conn.clone(),
        DriverConfig::new().schema("billing").migrations_table("schema_versions"),
    )
    .unwrap();

    driver.create_migrations_table().await.unwrap();

    let sets: Vec<String> = conn
        .sql_log()
        .into_iter()
        .filter(|sql| sql.starts_with("SET search_path"))
        .collect();
    assert_eq!(sets, vec![r#"SET search_path TO "billing", "$user", public"#]);

    let lookup = conn
        .statements()
        .into_iter()
        .find(|s| s.sql.contains("information_schema.tables"))
        .unwrap();
    assert_eq!(
        lookup.params,
        vec![Value::from("schema_versions"), Value::from("billing")]
    );
    assert_eq!(conn.count_matching(r#"CREATE TABLE IF NOT EXISTS "billing"."schema_versions""#), 1);
    assert_eq!(driver.schema_context().schema, "billing");
}

/// A schema the session already lists further back is moved to the front
#[tokio::test]
async fn test_custom_schema_moves_to_front_of_search_path() {
    let conn = RecordingConnection::new()
        .respond(
            "version()",
            vec![Row::new().with("version", "PostgreSQL 15.4 on x86_64-pc-linux-gnu")],
        )
        .respond(
            "SHOW search_path",
            vec![Row::new().with("search_path", "public, billing")],
        );
    let driver = PgDriver::new(conn.clone(), DriverConfig::new().schema("billing")).unwrap();

    driver.create_migrations_table().await.unwrap();

    assert_eq!(conn.count_matching(r#"SET search_path TO "billing", public"#), 1);
    assert_eq!(
        driver.schema_context().search_path,
        vec!["\"billing\"", "public"]
    );
}

/// The default schema leaves the search path as the server reported it
#[tokio::test]
async fn test_default_schema_search_path() {
    let conn = catalog_backed();
    let driver = PgDriver::new(conn.clone(), DriverConfig::default()).unwrap();

    driver.create_seeds_table().await.unwrap();

    assert_eq!(
        driver.schema_context().search_path,
        vec!["\"$user\"", "public"]
    );
    assert_eq!(conn.count_matching(r#"SET search_path TO "$user", public"#), 1);
}

/// Dry-run never reaches the connection but journals every statement
#[tokio::test]
async fn test_dry_run_isolation() {
    let conn = RecordingConnection::new();
    let driver = PgDriver::new(conn.clone(), DriverConfig::new().dry_run(true)).unwrap();

    driver.start_migration().await.unwrap();
    driver.create_migrations_table().await.unwrap();
    driver
        .create_table(
            &TableSpec::new("widgets")
                .column(ColumnSpec::new("id", DataType::Integer).primary_key()),
        )
        .await
        .unwrap();
    driver
        .insert("widgets", &["id"], vec![Value::from(1)])
        .await
        .unwrap();
    let rows = driver
        .all(Statement::new("SELECT * FROM \"widgets\""))
        .await
        .unwrap();
    let records = driver.applied_records(TrackingKind::Migrations).await.unwrap();
    driver.end_migration().await.unwrap();
    driver.close().await.unwrap();

    assert!(conn.statements().is_empty());
    assert!(!conn.is_closed());
    assert!(rows.is_empty());
    assert!(records.is_empty());

    let journal: Vec<String> = driver
        .executor()
        .journal()
        .into_iter()
        .map(|s| s.sql)
        .collect();
    assert_eq!(journal.first().map(String::as_str), Some("BEGIN"));
    assert_eq!(journal.last().map(String::as_str), Some("COMMIT"));
    assert!(journal.contains(&r#"INSERT INTO "widgets" ("id") VALUES ($1)"#.to_string()));
    assert!(journal.iter().any(|sql| sql.starts_with(r#"CREATE TABLE "migrations""#)));
}

/// A failing batch statement leaves the transaction uncommitted
#[tokio::test]
async fn test_batch_failure_skips_commit() {
    let conn = RecordingConnection::new().reject_matching("DROP TABLE");
    let driver = PgDriver::new(conn.clone(), DriverConfig::default()).unwrap();

    let err = driver
        .run_batch(&[
            Statement::new("CREATE TABLE \"a\" (\"id\" INTEGER)"),
            Statement::new("DROP TABLE \"missing\""),
            Statement::new("CREATE TABLE \"b\" (\"id\" INTEGER)"),
        ])
        .await
        .unwrap_err();

    assert_eq!(err.failing_statement(), Some("DROP TABLE \"missing\""));
    assert_eq!(
        conn.sql_log(),
        vec![
            "BEGIN",
            "CREATE TABLE \"a\" (\"id\" INTEGER)",
            "DROP TABLE \"missing\"",
        ]
    );
}

/// With transactions disabled no BEGIN or COMMIT is issued
#[tokio::test]
async fn test_transactions_disabled() {
    let conn = RecordingConnection::new();
    let driver =
        PgDriver::new(conn.clone(), DriverConfig::new().disable_transactions()).unwrap();

    driver.start_migration().await.unwrap();
    driver.remove_index("stale_idx").await.unwrap();
    driver.end_migration().await.unwrap();
    driver.close().await.unwrap();

    assert_eq!(conn.sql_log(), vec![r#"DROP INDEX "stale_idx""#]);
    assert!(conn.is_closed());
}
