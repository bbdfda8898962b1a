mod common;

use std::time::Duration;

use common::{StopRow, seeded_gateway, text, unique_temp_dir};
use rusqlite::Connection;
use securecheck::gateway::{Gateway, GatewayConfig, GatewayError, SELECT_ALL_STOPS_SQL};
use serde_json::json;

#[test]
fn select_all_preserves_column_order_and_values() {
    let (gateway, _) = seeded_gateway(
        "securecheck-gateway-select",
        &[StopRow {
            search_type: text("Frisk"),
            ..StopRow::vehicle("TN01AB1234")
        }],
    );

    let table = gateway
        .execute_query(SELECT_ALL_STOPS_SQL)
        .expect("select all should succeed");
    assert_eq!(table.columns[0], "vehicle_number");
    assert_eq!(table.columns.len(), 14);
    assert_eq!(table.row_count(), 1);
    assert_eq!(table.cell(0, "vehicle_number"), Some(&json!("TN01AB1234")));
    assert_eq!(table.cell(0, "SEARCH_TYPE"), Some(&json!("Frisk")));
    assert_eq!(table.cell(0, "driver_age"), Some(&json!(30)));
}

#[test]
fn missing_database_file_is_a_connection_error() {
    let dir = unique_temp_dir("securecheck-gateway-missing");
    let gateway = Gateway::new(GatewayConfig::new(dir.join("absent.sqlite")));

    let error = gateway
        .execute_query(SELECT_ALL_STOPS_SQL)
        .expect_err("missing file must fail");
    assert!(error.is_connection(), "unexpected error: {error:?}");
    assert_eq!(error.code(), "connection_error");
    assert!(!dir.join("absent.sqlite").exists(), "read-only open must not create the file");
}

#[test]
fn fetch_degrades_connection_errors_to_an_empty_table() {
    let dir = unique_temp_dir("securecheck-gateway-degrade");
    let gateway = Gateway::new(GatewayConfig::new(dir.join("absent.sqlite")));

    let fetched = gateway
        .fetch(SELECT_ALL_STOPS_SQL)
        .expect("connection errors degrade");
    assert!(fetched.table.is_empty());
    assert!(
        fetched
            .connection_error
            .as_ref()
            .is_some_and(GatewayError::is_connection)
    );

    let (records, connection_error) = gateway.load_stops().expect("load degrades too");
    assert!(records.is_empty());
    assert!(connection_error.is_some());
}

#[test]
fn missing_table_is_a_schema_error() {
    let dir = unique_temp_dir("securecheck-gateway-no-table");
    let path = dir.join("empty.sqlite");
    Connection::open(&path)
        .and_then(|connection| connection.execute_batch("CREATE TABLE unrelated (id INTEGER);"))
        .expect("fixture should be writable");

    let error = Gateway::new(GatewayConfig::new(path))
        .execute_query(SELECT_ALL_STOPS_SQL)
        .expect_err("missing table must fail");
    assert!(
        matches!(&error, GatewayError::Schema { detail, .. } if detail.contains("does not exist")),
        "unexpected error: {error:?}"
    );

    let fetch_error = Gateway::new(GatewayConfig::new(dir.join("empty.sqlite")))
        .fetch(SELECT_ALL_STOPS_SQL)
        .expect_err("schema errors are not degraded");
    assert_eq!(fetch_error.code(), "schema_error");
}

#[test]
fn missing_required_column_is_a_schema_error() {
    let dir = unique_temp_dir("securecheck-gateway-missing-column");
    let path = dir.join("partial.sqlite");
    Connection::open(&path)
        .and_then(|connection| {
            connection.execute_batch(
                "CREATE TABLE police_post_logs (vehicle_number TEXT, stop_date TEXT, extra TEXT);",
            )
        })
        .expect("fixture should be writable");

    let error = Gateway::new(GatewayConfig::new(path))
        .execute_query(SELECT_ALL_STOPS_SQL)
        .expect_err("missing columns must fail");
    match error {
        GatewayError::Schema { detail, .. } => {
            assert!(detail.contains("stop_outcome"), "unexpected detail: {detail}");
        }
        other => panic!("expected schema error, got {other:?}"),
    }
}

#[test]
fn mutating_sql_is_rejected_before_opening_the_store() {
    let gateway = Gateway::new(GatewayConfig::new("/nonexistent/securecheck.sqlite"));

    for sql in [
        "DELETE FROM police_post_logs",
        "SELECT 1; DROP TABLE police_post_logs",
        "   ",
    ] {
        let error = gateway
            .execute_query(sql)
            .expect_err("guardrail must reject");
        assert_eq!(error.code(), "sql_guardrail_violation", "sql: {sql}");
    }
}

#[test]
fn malformed_sql_is_a_query_execution_error() {
    let (gateway, _) = seeded_gateway("securecheck-gateway-bad-sql", &[StopRow::default()]);
    let error = gateway
        .execute_query("SELECT no_such_column FROM police_post_logs")
        .expect_err("bad column must fail");
    assert_eq!(error.code(), "query_execution_error");
}

#[test]
fn long_running_query_is_interrupted_at_the_deadline() {
    let (_, path) = seeded_gateway("securecheck-gateway-timeout", &[StopRow::default()]);
    let gateway =
        Gateway::new(GatewayConfig::new(path).with_query_timeout(Duration::from_millis(20)));

    let error = gateway
        .execute_query(
            "WITH RECURSIVE counter(x) AS (SELECT 1 UNION ALL SELECT x + 1 FROM counter) \
             SELECT COUNT(*) FROM counter",
        )
        .expect_err("unbounded query must time out");
    assert!(
        matches!(error, GatewayError::Timeout { timeout_ms: 20 }),
        "unexpected error: {error:?}"
    );
}

#[test]
fn oversized_timeout_is_rejected_instead_of_panicking() {
    let (_, path) = seeded_gateway("securecheck-gateway-huge-timeout", &[StopRow::default()]);

    for millis in [3_000_000_000, u64::MAX] {
        let gateway = Gateway::new(
            GatewayConfig::new(path.clone()).with_query_timeout(Duration::from_millis(millis)),
        );
        let error = gateway
            .execute_query("SELECT 1")
            .expect_err("unsupported timeout must fail");
        assert_eq!(error.code(), "invalid_query_timeout", "timeout_ms: {millis}");
    }

    let largest = Gateway::new(
        GatewayConfig::new(path).with_query_timeout(securecheck::gateway::MAX_QUERY_TIMEOUT),
    );
    assert!(largest.execute_query("SELECT 1").is_ok());
}
