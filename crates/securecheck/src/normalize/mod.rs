//! Value normalization shared by the in-memory path and the SQL path.
//!
//! The source table stores boolean-like columns inconsistently (`0/1`,
//! `Yes/No`, `TRUE/FALSE`, empty strings). Every reader goes through the
//! rules below: numbers are true when non-zero, text is matched against
//! [`TRUE_TOKENS`] / [`FALSE_TOKENS`] after trimming and lower-casing, and
//! anything else (NULL, empty, unrecognised) is unknown. Aggregations treat
//! unknown as false.

use serde_json::Value;

use crate::gateway::STOPS_TABLE;

pub const TRUE_TOKENS: &[&str] = &["1", "true", "t", "yes", "y"];
pub const FALSE_TOKENS: &[&str] = &["0", "false", "f", "no", "n"];

pub const FLAG_COLUMNS: &[&str] = &["search_conducted", "is_arrested", "drugs_related_stop"];
pub const TEXT_COLUMNS: &[&str] = &[
    "vehicle_number",
    "stop_date",
    "stop_time",
    "country_name",
    "driver_gender",
    "driver_race",
    "violation",
    "search_type",
    "stop_duration",
    "stop_outcome",
];

#[must_use]
pub fn normalize_flag(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(flag) => Some(*flag),
        Value::Number(number) => number.as_f64().map(|number| number != 0.0),
        Value::String(text) => normalize_flag_text(text),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

#[must_use]
pub fn normalize_flag_text(raw: &str) -> Option<bool> {
    let token = raw.trim().to_ascii_lowercase();
    if TRUE_TOKENS.contains(&token.as_str()) {
        Some(true)
    } else if FALSE_TOKENS.contains(&token.as_str()) {
        Some(false)
    } else {
        None
    }
}

#[must_use]
pub fn normalize_text(value: &Value) -> Option<String> {
    let text = match value {
        Value::String(text) => text.trim().to_string(),
        Value::Number(number) => number.to_string(),
        Value::Bool(flag) => flag.to_string(),
        Value::Null | Value::Array(_) | Value::Object(_) => return None,
    };
    (!text.is_empty()).then_some(text)
}

#[must_use]
pub fn normalize_integer(value: &Value) -> Option<i64> {
    match value {
        Value::Number(number) => number
            .as_i64()
            .or_else(|| number.as_f64().map(|real| real.trunc() as i64)),
        Value::String(text) => {
            let trimmed = text.trim();
            trimmed
                .parse::<i64>()
                .ok()
                .or_else(|| trimmed.parse::<f64>().ok().map(|real| real.trunc() as i64))
        }
        Value::Null | Value::Bool(_) | Value::Array(_) | Value::Object(_) => None,
    }
}

#[must_use]
pub fn flag_sql_expression(column: &str) -> String {
    format!(
        "CASE \
WHEN {column} IS NULL THEN NULL \
WHEN typeof({column}) IN ('integer', 'real') THEN ({column} <> 0) \
WHEN lower(trim({column})) IN ({true_list}) THEN 1 \
WHEN lower(trim({column})) IN ({false_list}) THEN 0 \
ELSE NULL END",
        true_list = sql_string_list(TRUE_TOKENS),
        false_list = sql_string_list(FALSE_TOKENS),
    )
}

#[must_use]
pub fn text_sql_expression(column: &str) -> String {
    format!("NULLIF(trim({column}), '')")
}

/// `stops` CTE body: every catalog query reads normalized columns from here
/// instead of touching `police_post_logs` directly.
#[must_use]
pub fn normalized_stops_sql() -> String {
    let mut projections = Vec::new();
    for column in TEXT_COLUMNS {
        projections.push(format!("{} AS {column}", text_sql_expression(column)));
    }
    projections.push(
        "CASE \
WHEN typeof(driver_age) IN ('integer', 'real') THEN CAST(driver_age AS INTEGER) \
WHEN trim(driver_age) GLOB '[0-9]*' THEN CAST(trim(driver_age) AS INTEGER) \
ELSE NULL END AS driver_age"
            .to_string(),
    );
    for column in FLAG_COLUMNS {
        projections.push(format!("{} AS {column}", flag_sql_expression(column)));
    }
    projections.push("CAST(strftime('%Y', trim(stop_date)) AS INTEGER) AS stop_year".to_string());
    projections.push("CAST(strftime('%m', trim(stop_date)) AS INTEGER) AS stop_month".to_string());
    projections.push("CAST(strftime('%H', trim(stop_time)) AS INTEGER) AS stop_hour".to_string());

    format!("SELECT {} FROM {STOPS_TABLE}", projections.join(", "))
}

fn sql_string_list(tokens: &[&str]) -> String {
    tokens
        .iter()
        .map(|token| format!("'{token}'"))
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{normalize_flag, normalize_integer, normalize_text, normalized_stops_sql};

    #[test]
    fn flags_accept_numeric_and_textual_forms() {
        assert_eq!(normalize_flag(&json!(1)), Some(true));
        assert_eq!(normalize_flag(&json!(0)), Some(false));
        assert_eq!(normalize_flag(&json!(" Yes ")), Some(true));
        assert_eq!(normalize_flag(&json!("NO")), Some(false));
        assert_eq!(normalize_flag(&json!("TRUE")), Some(true));
        assert_eq!(normalize_flag(&json!("false")), Some(false));
        assert_eq!(normalize_flag(&json!(true)), Some(true));
    }

    #[test]
    fn flags_treat_empty_null_and_noise_as_unknown() {
        assert_eq!(normalize_flag(&json!(null)), None);
        assert_eq!(normalize_flag(&json!("")), None);
        assert_eq!(normalize_flag(&json!("maybe")), None);
    }

    #[test]
    fn text_values_are_trimmed_and_empty_is_missing() {
        assert_eq!(normalize_text(&json!("  Canada ")), Some("Canada".to_string()));
        assert_eq!(normalize_text(&json!("   ")), None);
        assert_eq!(normalize_text(&json!(null)), None);
        assert_eq!(normalize_text(&json!(42)), Some("42".to_string()));
    }

    #[test]
    fn integers_parse_from_text_and_reals() {
        assert_eq!(normalize_integer(&json!(27)), Some(27));
        assert_eq!(normalize_integer(&json!(" 31 ")), Some(31));
        assert_eq!(normalize_integer(&json!(44.0)), Some(44));
        assert_eq!(normalize_integer(&json!("n/a")), None);
    }

    #[test]
    fn stops_projection_covers_every_derived_column() {
        let sql = normalized_stops_sql();
        for column in [
            "AS search_conducted",
            "AS is_arrested",
            "AS drugs_related_stop",
            "AS driver_age",
            "AS stop_year",
            "AS stop_month",
            "AS stop_hour",
            "FROM police_post_logs",
        ] {
            assert!(sql.contains(column), "missing `{column}` in {sql}");
        }
        assert!(!sql.contains(';'));
    }
}
