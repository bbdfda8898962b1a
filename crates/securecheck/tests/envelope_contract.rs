use securecheck::gateway::{Gateway, GatewayConfig, GatewayError, SELECT_ALL_STOPS_SQL, Table};
use securecheck::models::{
    ENVELOPE_SCHEMA_VERSION, Envelope, EnvelopeCommandFailure, WARNING_CONNECTION_ERROR,
    WARNING_NO_RESULT_FOUND,
};
use serde_json::json;

#[test]
fn table_envelope_carries_shape_and_row_count() {
    let table = Table {
        columns: vec!["country_name".to_string(), "total_stops".to_string()],
        rows: vec![vec![json!("USA"), json!(15)]],
    };
    let envelope = Envelope::table("catalog.run", &table).with_no_result_warning(false);

    assert!(envelope.ok);
    assert!(envelope.generated_at_utc.ends_with('Z'));
    assert_eq!(
        envelope.meta.get("schema_version"),
        Some(&json!(ENVELOPE_SCHEMA_VERSION))
    );
    assert_eq!(
        envelope.data,
        Some(json!({
            "columns": ["country_name", "total_stops"],
            "rows": [["USA", 15]]
        }))
    );
    assert_eq!(envelope.meta.get("row_count"), Some(&json!(1)));
    assert!(envelope.warnings.is_empty());
    assert!(envelope.error.is_none());
}

#[test]
fn ok_envelope_omits_error_when_serialized() {
    let encoded = serde_json::to_value(Envelope::ok("schema", json!({})))
        .expect("envelope should serialize");
    let object = encoded.as_object().expect("envelope JSON should be object");

    assert_eq!(object.get("ok"), Some(&json!(true)));
    assert!(object.contains_key("generated_at_utc"));
    assert!(object.contains_key("warnings"));
    assert!(!object.contains_key("error"));
}

#[test]
fn command_failure_displays_the_error_envelope_as_json() {
    let failure = EnvelopeCommandFailure::new(
        Envelope::error("predict", "invalid_form_input", "invalid driver_age")
            .with_error_details(json!({"field": "driver_age"})),
    );
    let decoded: serde_json::Value =
        serde_json::from_str(&failure.to_string()).expect("display should be JSON");

    assert_eq!(decoded["ok"], false);
    assert_eq!(decoded["error"]["code"], "invalid_form_input");
    assert_eq!(decoded["error"]["details"]["field"], "driver_age");
    assert!(decoded.get("data").is_none());
}

#[test]
fn degraded_reads_collect_connection_and_empty_result_warnings() {
    let gateway = Gateway::new(GatewayConfig::new("/nonexistent/securecheck.sqlite"));
    let fetched = gateway
        .fetch(SELECT_ALL_STOPS_SQL)
        .expect("connection errors degrade");

    let envelope = Envelope::table("logs", &fetched.table)
        .with_connection_warning(fetched.connection_error.as_ref())
        .with_no_result_warning(fetched.table.is_empty());

    assert!(envelope.ok);
    assert!(envelope.has_warning(WARNING_CONNECTION_ERROR));
    assert!(envelope.has_warning(WARNING_NO_RESULT_FOUND));
    assert_eq!(envelope.warnings[1].message, "No Result Found");
    assert_eq!(
        envelope.warnings[0].details.as_ref().map(|details| details["database_path"].clone()),
        Some(json!("/nonexistent/securecheck.sqlite"))
    );
}

#[test]
fn gateway_error_envelope_keeps_code_and_details() {
    let error = GatewayError::InvalidTimeout {
        timeout_ms: 3_000_000_000,
    };

    let envelope = Envelope::gateway_error("metrics", &error);
    assert!(!envelope.ok);
    assert!(envelope.data.is_none());
    let notice = envelope.error.expect("error slot should be filled");
    assert_eq!(notice.code, "invalid_query_timeout");
    assert_eq!(
        notice.details,
        Some(json!({"timeout_ms": 3_000_000_000_u64, "max_timeout_ms": i32::MAX}))
    );
}

#[test]
fn connection_warning_is_skipped_when_the_store_answered() {
    let envelope = Envelope::ok("metrics", json!({})).with_connection_warning(None);
    assert!(!envelope.has_warning(WARNING_CONNECTION_ERROR));
    assert!(envelope.warnings.is_empty());
}
