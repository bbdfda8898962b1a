use std::fmt::{Display, Formatter};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::gateway::Table;
use crate::normalize::{normalize_flag, normalize_integer, normalize_text};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub enum DriverGender {
    Male,
    Female,
}

impl DriverGender {
    pub const ALL: [Self; 2] = [Self::Male, Self::Female];

    /// Accepts the form labels as well as the single-letter codes the
    /// source table uses.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "m" | "male" => Some(Self::Male),
            "f" | "female" => Some(Self::Female),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Male => "Male",
            Self::Female => "Female",
        }
    }
}

impl Display for DriverGender {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One logged traffic stop, with boolean-like and text columns already
/// normalized.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct StopRecord {
    pub vehicle_number: Option<String>,
    pub stop_date: Option<String>,
    pub stop_time: Option<String>,
    pub country_name: Option<String>,
    pub driver_age: Option<i64>,
    pub driver_gender: Option<String>,
    pub driver_race: Option<String>,
    pub violation: Option<String>,
    pub search_conducted: Option<bool>,
    pub search_type: Option<String>,
    pub stop_duration: Option<String>,
    pub is_arrested: Option<bool>,
    pub drugs_related_stop: Option<bool>,
    pub stop_outcome: Option<String>,
}

struct ColumnMap {
    vehicle_number: Option<usize>,
    stop_date: Option<usize>,
    stop_time: Option<usize>,
    country_name: Option<usize>,
    driver_age: Option<usize>,
    driver_gender: Option<usize>,
    driver_race: Option<usize>,
    violation: Option<usize>,
    search_conducted: Option<usize>,
    search_type: Option<usize>,
    stop_duration: Option<usize>,
    is_arrested: Option<usize>,
    drugs_related_stop: Option<usize>,
    stop_outcome: Option<usize>,
}

impl ColumnMap {
    fn resolve(table: &Table) -> Self {
        Self {
            vehicle_number: table.column_index("vehicle_number"),
            stop_date: table.column_index("stop_date"),
            stop_time: table.column_index("stop_time"),
            country_name: table.column_index("country_name"),
            driver_age: table.column_index("driver_age"),
            driver_gender: table.column_index("driver_gender"),
            driver_race: table.column_index("driver_race"),
            violation: table.column_index("violation"),
            search_conducted: table.column_index("search_conducted"),
            search_type: table.column_index("search_type"),
            stop_duration: table.column_index("stop_duration"),
            is_arrested: table.column_index("is_arrested"),
            drugs_related_stop: table.column_index("drugs_related_stop"),
            stop_outcome: table.column_index("stop_outcome"),
        }
    }
}

impl StopRecord {
    #[must_use]
    pub fn from_table(table: &Table) -> Vec<Self> {
        let columns = ColumnMap::resolve(table);
        table
            .rows
            .iter()
            .map(|row| Self::from_row(row, &columns))
            .collect()
    }

    fn from_row(row: &[Value], columns: &ColumnMap) -> Self {
        let cell = |index: Option<usize>| index.and_then(|index| row.get(index));
        let text = |index| cell(index).and_then(normalize_text);
        let flag = |index| cell(index).and_then(normalize_flag);

        Self {
            vehicle_number: text(columns.vehicle_number),
            stop_date: text(columns.stop_date),
            stop_time: text(columns.stop_time),
            country_name: text(columns.country_name),
            driver_age: cell(columns.driver_age).and_then(normalize_integer),
            driver_gender: text(columns.driver_gender),
            driver_race: text(columns.driver_race),
            violation: text(columns.violation),
            search_conducted: flag(columns.search_conducted),
            search_type: text(columns.search_type),
            stop_duration: text(columns.stop_duration),
            is_arrested: flag(columns.is_arrested),
            drugs_related_stop: flag(columns.drugs_related_stop),
            stop_outcome: text(columns.stop_outcome),
        }
    }

    #[must_use]
    pub fn gender(&self) -> Option<DriverGender> {
        self.driver_gender.as_deref().and_then(DriverGender::parse)
    }

    #[must_use]
    pub fn searched(&self) -> bool {
        self.search_conducted.unwrap_or(false)
    }

    #[must_use]
    pub fn drug_related(&self) -> bool {
        self.drugs_related_stop.unwrap_or(false)
    }
}

#[must_use]
pub fn json_schema() -> Value {
    let schema = schemars::schema_for!(StopRecord);
    match serde_json::to_value(schema) {
        Ok(value) => value,
        Err(error) => {
            panic!("failed to serialize generated stop record schema: {error}");
        }
    }
}
