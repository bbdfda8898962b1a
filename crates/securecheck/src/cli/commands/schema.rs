use anyhow::Result;
use serde_json::json;

use super::emit;
use crate::gateway::{CREATE_POLICE_POST_LOGS_SQL, REQUIRED_COLUMNS, STOPS_TABLE};
use crate::models::{Envelope, json_schema};

pub fn run() -> Result<()> {
    let envelope = Envelope::ok(
        "schema",
        json!({
            "table": STOPS_TABLE,
            "ddl": CREATE_POLICE_POST_LOGS_SQL.trim(),
            "required_columns": REQUIRED_COLUMNS,
            "stop_record_schema": json_schema(),
        }),
    );
    emit(&envelope)
}
