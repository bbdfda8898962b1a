use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use rusqlite::types::Value as SqlValue;
use rusqlite::{Connection, ErrorCode, OpenFlags};
use serde::Serialize;
use serde_json::{Value, json};
use thiserror::Error;

use crate::models::StopRecord;

pub const STOPS_TABLE: &str = "police_post_logs";
pub const SELECT_ALL_STOPS_SQL: &str = "SELECT * FROM police_post_logs";
pub const DEFAULT_QUERY_TIMEOUT: Duration = Duration::from_secs(30);
/// SQLite takes the busy timeout as an `int` of milliseconds.
pub const MAX_QUERY_TIMEOUT: Duration = Duration::from_millis(i32::MAX as u64);
const PROGRESS_HANDLER_OPS: i32 = 1_000;

pub const REQUIRED_COLUMNS: &[&str] = &[
    "vehicle_number",
    "stop_date",
    "stop_time",
    "country_name",
    "driver_age",
    "driver_gender",
    "driver_race",
    "violation",
    "search_conducted",
    "search_type",
    "stop_duration",
    "is_arrested",
    "drugs_related_stop",
    "stop_outcome",
];

pub const CREATE_POLICE_POST_LOGS_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS police_post_logs (
    vehicle_number TEXT NOT NULL,
    stop_date TEXT,
    stop_time TEXT,
    country_name TEXT,
    driver_gender TEXT,
    driver_age INTEGER,
    driver_race TEXT,
    violation TEXT,
    search_conducted,
    search_type TEXT,
    stop_outcome TEXT,
    is_arrested,
    stop_duration TEXT,
    drugs_related_stop
);
"#;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("unable to connect to store `{}`: {source}", .path.display())]
    Connection {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    #[error("query execution failed ({stage}): {source}")]
    QueryExecution {
        stage: &'static str,
        #[source]
        source: rusqlite::Error,
    },

    #[error("schema mismatch on `{table}`: {detail}")]
    Schema { table: String, detail: String },

    #[error("query exceeded the configured timeout of {timeout_ms} ms")]
    Timeout { timeout_ms: u64 },

    #[error("query timeout of {timeout_ms} ms is outside the supported range")]
    InvalidTimeout { timeout_ms: u64 },

    #[error("{message}")]
    Guardrail { message: String, details: Value },
}

impl GatewayError {
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Connection { .. } => "connection_error",
            Self::QueryExecution { .. } => "query_execution_error",
            Self::Schema { .. } => "schema_error",
            Self::Timeout { .. } => "query_timeout",
            Self::InvalidTimeout { .. } => "invalid_query_timeout",
            Self::Guardrail { .. } => "sql_guardrail_violation",
        }
    }

    #[must_use]
    pub const fn is_connection(&self) -> bool {
        matches!(self, Self::Connection { .. })
    }

    #[must_use]
    pub fn details(&self) -> Value {
        match self {
            Self::Connection { path, source } => json!({
                "database_path": path.display().to_string(),
                "cause": source.to_string(),
            }),
            Self::QueryExecution { stage, source } => json!({
                "stage": stage,
                "cause": source.to_string(),
            }),
            Self::Schema { table, detail } => json!({ "table": table, "detail": detail }),
            Self::Timeout { timeout_ms } => json!({ "timeout_ms": timeout_ms }),
            Self::InvalidTimeout { timeout_ms } => json!({
                "timeout_ms": timeout_ms,
                "max_timeout_ms": i32::MAX,
            }),
            Self::Guardrail { details, .. } => details.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl Table {
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    #[must_use]
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns
            .iter()
            .position(|column| column.eq_ignore_ascii_case(name))
    }

    #[must_use]
    pub fn cell(&self, row: usize, column: &str) -> Option<&Value> {
        let index = self.column_index(column)?;
        self.rows.get(row).and_then(|values| values.get(index))
    }

    #[must_use]
    pub fn head(&self, limit: usize) -> Self {
        Self {
            columns: self.columns.clone(),
            rows: self.rows.iter().take(limit).cloned().collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayConfig {
    pub database_path: PathBuf,
    pub query_timeout: Duration,
}

impl GatewayConfig {
    #[must_use]
    pub fn new(database_path: impl Into<PathBuf>) -> Self {
        Self {
            database_path: database_path.into(),
            query_timeout: DEFAULT_QUERY_TIMEOUT,
        }
    }

    #[must_use]
    pub fn with_query_timeout(mut self, query_timeout: Duration) -> Self {
        self.query_timeout = query_timeout;
        self
    }
}

/// Result of a read that keeps going when the store is unreachable.
#[derive(Debug)]
pub struct Fetched {
    pub table: Table,
    pub connection_error: Option<GatewayError>,
}

#[derive(Debug, Clone)]
pub struct Gateway {
    config: GatewayConfig,
}

impl Gateway {
    #[must_use]
    pub fn new(config: GatewayConfig) -> Self {
        Self { config }
    }

    /// Runs one read-only statement on a fresh connection. The connection is
    /// dropped (and closed) before this returns, whatever the outcome.
    pub fn execute_query(&self, sql: &str) -> Result<Table, GatewayError> {
        validate_read_only_sql(sql)?;

        let connection = open_read_only(&self.config.database_path)?;
        verify_stops_schema(&connection, &self.config.database_path)?;
        install_deadline(&connection, self.config.query_timeout)?;

        let started = Instant::now();
        let table = read_table(&connection, sql).map_err(|error| self.classify(error))?;
        log::debug!(
            "gateway: query returned rows={} columns={} duration_ms={}",
            table.row_count(),
            table.columns.len(),
            started.elapsed().as_millis()
        );
        Ok(table)
    }

    /// Like [`Gateway::execute_query`], but a connection failure degrades to
    /// an empty table and is handed back for the caller to surface.
    pub fn fetch(&self, sql: &str) -> Result<Fetched, GatewayError> {
        match self.execute_query(sql) {
            Ok(table) => Ok(Fetched {
                table,
                connection_error: None,
            }),
            Err(error) if error.is_connection() => {
                log::warn!("gateway: {error}; continuing with an empty result");
                Ok(Fetched {
                    table: Table::empty(),
                    connection_error: Some(error),
                })
            }
            Err(error) => Err(error),
        }
    }

    pub fn load_stops(&self) -> Result<(Vec<StopRecord>, Option<GatewayError>), GatewayError> {
        let fetched = self.fetch(SELECT_ALL_STOPS_SQL)?;
        Ok((
            StopRecord::from_table(&fetched.table),
            fetched.connection_error,
        ))
    }

    fn classify(&self, error: QueryFailure) -> GatewayError {
        let QueryFailure { stage, source } = error;
        match source.sqlite_error_code() {
            Some(ErrorCode::OperationInterrupted) => GatewayError::Timeout {
                timeout_ms: u64::try_from(self.config.query_timeout.as_millis())
                    .unwrap_or(u64::MAX),
            },
            Some(ErrorCode::NotADatabase | ErrorCode::CannotOpen) => GatewayError::Connection {
                path: self.config.database_path.clone(),
                source,
            },
            _ => GatewayError::QueryExecution { stage, source },
        }
    }
}

pub fn open_read_only(path: &Path) -> Result<Connection, GatewayError> {
    log::debug!("gateway: opening {} read-only", path.display());
    let flags = OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX;
    Connection::open_with_flags(path, flags).map_err(|source| GatewayError::Connection {
        path: path.to_path_buf(),
        source,
    })
}

fn install_deadline(connection: &Connection, timeout: Duration) -> Result<(), GatewayError> {
    let invalid = || GatewayError::InvalidTimeout {
        timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
    };
    if timeout > MAX_QUERY_TIMEOUT {
        return Err(invalid());
    }
    let deadline = Instant::now().checked_add(timeout).ok_or_else(invalid)?;

    connection
        .busy_timeout(timeout)
        .map_err(|source| GatewayError::QueryExecution {
            stage: "configure_timeout",
            source,
        })?;

    connection.progress_handler(
        PROGRESS_HANDLER_OPS,
        Some(move || Instant::now() >= deadline),
    );
    Ok(())
}

/// Confirms `police_post_logs` exists and carries every column the catalog
/// and the record loader read. Extra columns are fine.
pub fn verify_stops_schema(connection: &Connection, path: &Path) -> Result<(), GatewayError> {
    let columns = load_table_columns(connection, STOPS_TABLE).map_err(|source| {
        match source.sqlite_error_code() {
            Some(ErrorCode::NotADatabase | ErrorCode::CannotOpen) => GatewayError::Connection {
                path: path.to_path_buf(),
                source,
            },
            _ => GatewayError::QueryExecution {
                stage: "schema_introspection",
                source,
            },
        }
    })?;

    if columns.is_empty() {
        return Err(GatewayError::Schema {
            table: STOPS_TABLE.to_string(),
            detail: "table does not exist".to_string(),
        });
    }

    let missing = REQUIRED_COLUMNS
        .iter()
        .filter(|required| {
            !columns
                .iter()
                .any(|column| column.eq_ignore_ascii_case(required))
        })
        .copied()
        .collect::<Vec<_>>();
    if !missing.is_empty() {
        return Err(GatewayError::Schema {
            table: STOPS_TABLE.to_string(),
            detail: format!("missing required columns: {}", missing.join(", ")),
        });
    }

    Ok(())
}

fn load_table_columns(
    connection: &Connection,
    table_name: &str,
) -> Result<Vec<String>, rusqlite::Error> {
    let pragma_sql = format!("PRAGMA table_info({})", sqlite_single_quoted(table_name));
    let mut statement = connection.prepare(&pragma_sql)?;
    let rows = statement.query_map([], |row| row.get::<usize, String>(1))?;
    rows.collect()
}

fn sqlite_single_quoted(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

#[derive(Debug)]
struct QueryFailure {
    stage: &'static str,
    source: rusqlite::Error,
}

fn failure(stage: &'static str) -> impl FnOnce(rusqlite::Error) -> QueryFailure {
    move |source| QueryFailure { stage, source }
}

fn read_table(connection: &Connection, sql: &str) -> Result<Table, QueryFailure> {
    let mut statement = connection.prepare(sql).map_err(failure("prepare"))?;
    let columns = statement
        .column_names()
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>();

    let mut rows = statement.query([]).map_err(failure("execute"))?;
    let mut table_rows = Vec::new();
    while let Some(row) = rows.next().map_err(failure("fetch_row"))? {
        let mut values = Vec::with_capacity(columns.len());
        for index in 0..columns.len() {
            let value = row
                .get::<usize, SqlValue>(index)
                .map_err(failure("decode_column"))?;
            values.push(json_value_from_sql(value));
        }
        table_rows.push(values);
    }

    Ok(Table {
        columns,
        rows: table_rows,
    })
}

fn json_value_from_sql(value: SqlValue) -> Value {
    match value {
        SqlValue::Null => Value::Null,
        SqlValue::Integer(value) => json!(value),
        SqlValue::Real(value) => json!(value),
        SqlValue::Text(value) => json!(value),
        SqlValue::Blob(value) => json!(encode_blob_hex(&value)),
    }
}

fn encode_blob_hex(bytes: &[u8]) -> String {
    const HEX: &[u8; 16] = b"0123456789abcdef";
    let mut output = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        output.push(HEX[(byte >> 4) as usize] as char);
        output.push(HEX[(byte & 0x0f) as usize] as char);
    }
    output
}

pub fn validate_read_only_sql(raw_sql: &str) -> Result<(), GatewayError> {
    let candidate = strip_trailing_semicolons(raw_sql);
    if candidate.is_empty() {
        return Err(guardrail_violation(
            "SQL query is empty; provide a SELECT or WITH ... SELECT statement",
            json!({"reason":"empty_statement"}),
        ));
    }

    if candidate.contains(';') {
        return Err(guardrail_violation(
            "Multi-statement SQL is not allowed; submit exactly one read-only statement",
            json!({"reason":"multi_statement"}),
        ));
    }

    let normalized = candidate.to_ascii_lowercase();
    if let Some(keyword) = first_mutating_keyword(&normalized) {
        return Err(guardrail_violation(
            format!("Mutating SQL keyword `{keyword}` is not allowed"),
            json!({"reason":"mutating_statement","detected_keyword":keyword}),
        ));
    }

    if !(normalized.starts_with("select") || normalized.starts_with("with")) {
        return Err(guardrail_violation(
            "Only SELECT and WITH ... SELECT statements are allowed",
            json!({"reason":"unsupported_statement","leading_keyword":leading_keyword(&normalized)}),
        ));
    }

    Ok(())
}

fn strip_trailing_semicolons(raw_sql: &str) -> &str {
    let mut candidate = raw_sql.trim();
    while let Some(stripped) = candidate.strip_suffix(';') {
        candidate = stripped.trim_end();
    }
    candidate
}

fn first_mutating_keyword(normalized_sql: &str) -> Option<String> {
    const MUTATING_KEYWORDS: &[&str] = &[
        "insert", "update", "delete", "create", "alter", "drop", "replace", "truncate", "attach",
        "detach", "pragma", "vacuum", "reindex", "analyze", "begin", "commit", "rollback",
    ];

    normalized_sql
        .split(|ch: char| !ch.is_ascii_alphanumeric() && ch != '_')
        .find_map(|token| {
            MUTATING_KEYWORDS
                .contains(&token)
                .then_some(token.to_string())
        })
}

fn leading_keyword(normalized_sql: &str) -> String {
    normalized_sql
        .split(|ch: char| !ch.is_ascii_alphanumeric() && ch != '_')
        .find(|token| !token.is_empty())
        .unwrap_or("unknown")
        .to_string()
}

fn guardrail_violation(message: impl Into<String>, details: Value) -> GatewayError {
    GatewayError::Guardrail {
        message: message.into(),
        details: json!({
            "allowed_forms": ["SELECT ...", "WITH ... SELECT ..."],
            "guardrail": "read_only_sql_single_statement",
            "violation": details
        }),
    }
}
