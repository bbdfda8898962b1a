#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use rusqlite::types::Value as SqlValue;
use rusqlite::{Connection, params};
use securecheck::gateway::{CREATE_POLICE_POST_LOGS_SQL, Gateway, GatewayConfig};

pub fn unique_temp_dir(prefix: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system time should be after unix epoch")
        .as_nanos();
    let dir = std::env::temp_dir().join(format!("{prefix}-{nanos}"));
    std::fs::create_dir_all(&dir).expect("temp dir should be creatable");
    dir
}

pub fn text(value: &str) -> SqlValue {
    SqlValue::Text(value.to_string())
}

pub fn int(value: i64) -> SqlValue {
    SqlValue::Integer(value)
}

/// One `police_post_logs` row; every cell is stored exactly as given so
/// fixtures can mix flag encodings.
#[derive(Debug, Clone)]
pub struct StopRow {
    pub vehicle_number: SqlValue,
    pub stop_date: SqlValue,
    pub stop_time: SqlValue,
    pub country_name: SqlValue,
    pub driver_gender: SqlValue,
    pub driver_age: SqlValue,
    pub driver_race: SqlValue,
    pub violation: SqlValue,
    pub search_conducted: SqlValue,
    pub search_type: SqlValue,
    pub stop_outcome: SqlValue,
    pub is_arrested: SqlValue,
    pub stop_duration: SqlValue,
    pub drugs_related_stop: SqlValue,
}

impl Default for StopRow {
    fn default() -> Self {
        Self {
            vehicle_number: text("TN00AA0000"),
            stop_date: text("2020-01-01"),
            stop_time: text("10:00:00"),
            country_name: text("Canada"),
            driver_gender: text("M"),
            driver_age: int(30),
            driver_race: text("Asian"),
            violation: text("Speeding"),
            search_conducted: int(0),
            search_type: SqlValue::Null,
            stop_outcome: text("Citation"),
            is_arrested: int(0),
            stop_duration: text("0-15 Min"),
            drugs_related_stop: int(0),
        }
    }
}

impl StopRow {
    pub fn vehicle(vehicle_number: &str) -> Self {
        Self {
            vehicle_number: text(vehicle_number),
            ..Self::default()
        }
    }
}

pub fn seed_database(path: &Path, rows: &[StopRow]) {
    let connection = Connection::open(path).expect("fixture database should open");
    connection
        .execute_batch(CREATE_POLICE_POST_LOGS_SQL)
        .expect("fixture table should be created");

    for row in rows {
        connection
            .execute(
                "INSERT INTO police_post_logs (
                    vehicle_number, stop_date, stop_time, country_name, driver_gender,
                    driver_age, driver_race, violation, search_conducted, search_type,
                    stop_outcome, is_arrested, stop_duration, drugs_related_stop
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
                params![
                    row.vehicle_number,
                    row.stop_date,
                    row.stop_time,
                    row.country_name,
                    row.driver_gender,
                    row.driver_age,
                    row.driver_race,
                    row.violation,
                    row.search_conducted,
                    row.search_type,
                    row.stop_outcome,
                    row.is_arrested,
                    row.stop_duration,
                    row.drugs_related_stop,
                ],
            )
            .expect("fixture row should insert");
    }
}

pub fn seeded_gateway(prefix: &str, rows: &[StopRow]) -> (Gateway, PathBuf) {
    let dir = unique_temp_dir(prefix);
    let path = dir.join("policeledger.sqlite");
    seed_database(&path, rows);
    (Gateway::new(GatewayConfig::new(path.clone())), path)
}
