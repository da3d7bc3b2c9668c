//! Integration tests for the completion-handler adapter.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use strata::adapter::{complete, complete_silently};
use strata::prelude::*;
use strata::strata_core::testing::RecordingConnection;

/// The handler sees the outcome once and the caller still receives it
#[tokio::test]
async fn test_handler_receives_outcome() {
    let conn = RecordingConnection::new().reject_matching("DROP INDEX");
    let driver = PgDriver::new(conn, DriverConfig::default()).unwrap();
    let calls = Arc::new(AtomicUsize::new(0));

    let seen = calls.clone();
    let outcome = complete(
        driver.remove_index("missing_idx"),
        Some(move |result: &MigrateResult<()>| {
            assert!(result.is_err());
            seen.fetch_add(1, Ordering::SeqCst);
        }),
    )
    .await;

    assert!(matches!(outcome, Err(MigrateError::Sql { .. })));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

/// Without a handler the outcome passes straight through
#[tokio::test]
async fn test_without_handler() {
    let driver = PgDriver::new(RecordingConnection::new(), DriverConfig::default()).unwrap();
    let affected = complete_silently(driver.run_sql(Statement::new("SELECT 1")))
        .await
        .unwrap();
    assert_eq!(affected, 0);
}
