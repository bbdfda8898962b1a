//! Mode-of-exact-matches lookup behind the "predict outcome" form.
//!
//! Historical rows are kept only when gender, age, search flag, stop
//! duration, and drug flag all equal the submitted values. The predicted
//! violation and outcome are the most frequent values among those rows;
//! ties go to whichever value appears first in table order. With no match
//! the prediction is [`DEFAULT_VIOLATION`] / [`DEFAULT_OUTCOME`].

use std::collections::HashMap;

use serde::Serialize;
use serde_json::{Value, json};
use thiserror::Error;
use time::{Date, Time};

use crate::models::{DriverGender, StopRecord};
use crate::normalize::normalize_flag_text;
use crate::utils::time::{format_clock_12h, format_date, parse_stop_date, parse_stop_time};

pub const DEFAULT_VIOLATION: &str = "Speeding";
pub const DEFAULT_OUTCOME: &str = "Warning";
pub const MIN_DRIVER_AGE: i64 = 16;
pub const MAX_DRIVER_AGE: i64 = 100;
pub const COUNTRY_OPTIONS: &[&str] = &["Canada", "USA", "India"];
pub const RACE_OPTIONS: &[&str] = &["Asian", "Black", "White", "Hispanic", "Other"];
pub const SEARCH_TYPE_OPTIONS: &[&str] = &["Vehicle Search", "Frisk", "None"];

#[derive(Debug, Error)]
pub enum PredictError {
    #[error("invalid {field}: {message}")]
    InvalidInput {
        field: &'static str,
        message: String,
    },
}

impl PredictError {
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InvalidInput { .. } => "invalid_form_input",
        }
    }

    fn invalid(field: &'static str, message: impl Into<String>) -> Self {
        Self::InvalidInput {
            field,
            message: message.into(),
        }
    }
}

/// Form values exactly as typed, before validation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawStopForm {
    pub vehicle_number: String,
    pub stop_date: String,
    pub stop_time: String,
    pub country_name: String,
    pub driver_age: i64,
    pub driver_race: String,
    pub search_type: String,
    pub stop_duration: String,
    pub driver_gender: String,
    pub drugs_related_stop: String,
    pub search_conducted: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StopForm {
    pub vehicle_number: String,
    pub stop_date: Date,
    pub stop_time: Time,
    pub country_name: String,
    pub driver_age: i64,
    pub driver_race: String,
    pub search_type: String,
    pub stop_duration: String,
    pub driver_gender: DriverGender,
    pub drugs_related_stop: bool,
    pub search_conducted: bool,
}

impl StopForm {
    pub fn validate(raw: &RawStopForm) -> Result<Self, PredictError> {
        let vehicle_number = raw.vehicle_number.trim();
        if vehicle_number.is_empty() {
            return Err(PredictError::invalid(
                "vehicle_number",
                "vehicle number must not be empty",
            ));
        }

        let stop_date = parse_stop_date(&raw.stop_date)
            .map_err(|error| PredictError::invalid("stop_date", format!("{error:#}")))?;
        let stop_time = parse_stop_time(&raw.stop_time)
            .map_err(|error| PredictError::invalid("stop_time", format!("{error:#}")))?;

        if !(MIN_DRIVER_AGE..=MAX_DRIVER_AGE).contains(&raw.driver_age) {
            return Err(PredictError::invalid(
                "driver_age",
                format!(
                    "driver age must be between {MIN_DRIVER_AGE} and {MAX_DRIVER_AGE}, got {}",
                    raw.driver_age
                ),
            ));
        }

        let driver_gender = DriverGender::parse(&raw.driver_gender).ok_or_else(|| {
            PredictError::invalid(
                "driver_gender",
                format!("expected Male or Female, got `{}`", raw.driver_gender.trim()),
            )
        })?;

        let stop_duration = raw.stop_duration.trim();
        if stop_duration.is_empty() {
            return Err(PredictError::invalid(
                "stop_duration",
                "stop duration must not be empty",
            ));
        }

        Ok(Self {
            vehicle_number: vehicle_number.to_string(),
            stop_date,
            stop_time,
            country_name: pick_option("country_name", &raw.country_name, COUNTRY_OPTIONS)?,
            driver_age: raw.driver_age,
            driver_race: pick_option("driver_race", &raw.driver_race, RACE_OPTIONS)?,
            search_type: pick_option("search_type", &raw.search_type, SEARCH_TYPE_OPTIONS)?,
            stop_duration: stop_duration.to_string(),
            driver_gender,
            drugs_related_stop: parse_yes_no("drugs_related_stop", &raw.drugs_related_stop)?,
            search_conducted: parse_yes_no("search_conducted", &raw.search_conducted)?,
        })
    }

    /// Exact equality on the five lookup attributes. Unknown flags on the
    /// historical row count as `false`.
    #[must_use]
    pub fn matches(&self, record: &StopRecord) -> bool {
        record.gender() == Some(self.driver_gender)
            && record.driver_age == Some(self.driver_age)
            && record.searched() == self.search_conducted
            && record.stop_duration.as_deref() == Some(self.stop_duration.as_str())
            && record.drug_related() == self.drugs_related_stop
    }

    #[must_use]
    pub fn describe(&self) -> Value {
        json!({
            "vehicle_number": self.vehicle_number,
            "stop_date": format_date(self.stop_date),
            "stop_time": format_clock_12h(self.stop_time),
            "country_name": self.country_name,
            "driver_age": self.driver_age,
            "driver_race": self.driver_race,
            "search_type": self.search_type,
            "stop_duration": self.stop_duration,
            "driver_gender": self.driver_gender,
            "drugs_related_stop": self.drugs_related_stop,
            "search_conducted": self.search_conducted,
        })
    }
}

fn pick_option(
    field: &'static str,
    raw: &str,
    options: &[&'static str],
) -> Result<String, PredictError> {
    let wanted = raw.trim();
    options
        .iter()
        .find(|option| option.eq_ignore_ascii_case(wanted))
        .map(|option| (*option).to_string())
        .ok_or_else(|| {
            PredictError::invalid(
                field,
                format!("expected one of {}, got `{wanted}`", options.join(", ")),
            )
        })
}

fn parse_yes_no(field: &'static str, raw: &str) -> Result<bool, PredictError> {
    normalize_flag_text(raw)
        .ok_or_else(|| PredictError::invalid(field, format!("expected YES or NO, got `{raw}`")))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PredictionBasis {
    HistoricalMode,
    Default,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Prediction {
    pub predicted_violation: String,
    pub predicted_outcome: String,
    pub matched_records: usize,
    pub basis: PredictionBasis,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PredictionSummary {
    pub vehicle_number: String,
    pub predicted_violation: String,
    pub predicted_outcome: String,
    pub stop_duration: String,
    pub matched_records: usize,
    pub basis: PredictionBasis,
    pub narrative: String,
}

#[must_use]
pub fn predict(form: &StopForm, records: &[StopRecord]) -> Prediction {
    let matches = records
        .iter()
        .filter(|record| form.matches(record))
        .collect::<Vec<_>>();

    let violation = first_mode(matches.iter().map(|record| record.violation.as_deref()));
    let outcome = first_mode(matches.iter().map(|record| record.stop_outcome.as_deref()));

    match (violation, outcome) {
        (Some(violation), Some(outcome)) => Prediction {
            predicted_violation: violation,
            predicted_outcome: outcome,
            matched_records: matches.len(),
            basis: PredictionBasis::HistoricalMode,
        },
        (violation, outcome) => Prediction {
            predicted_violation: violation.unwrap_or_else(|| DEFAULT_VIOLATION.to_string()),
            predicted_outcome: outcome.unwrap_or_else(|| DEFAULT_OUTCOME.to_string()),
            matched_records: matches.len(),
            basis: PredictionBasis::Default,
        },
    }
}

/// Most frequent non-missing value; among equally frequent values the one
/// seen first wins.
#[must_use]
pub fn first_mode<'a>(values: impl IntoIterator<Item = Option<&'a str>>) -> Option<String> {
    let mut counts: HashMap<&str, (usize, usize)> = HashMap::new();
    for (position, value) in values.into_iter().flatten().enumerate() {
        counts
            .entry(value)
            .and_modify(|(count, _)| *count += 1)
            .or_insert((1, position));
    }

    counts
        .into_iter()
        .max_by(|(_, (left_count, left_first)), (_, (right_count, right_first))| {
            left_count
                .cmp(right_count)
                .then_with(|| right_first.cmp(left_first))
        })
        .map(|(value, _)| value.to_string())
}

#[must_use]
pub fn summarize(form: &StopForm, prediction: &Prediction) -> PredictionSummary {
    let search_text = if form.search_conducted {
        "A search was conducted"
    } else {
        "No search was conducted"
    };
    let drug_text = if form.drugs_related_stop {
        "it's drug-related"
    } else {
        "it's not drug-related"
    };

    let narrative = format!(
        "A {age}-year-old {gender} driver in {country} was stopped for {violation} at {clock} on {date}. \
{search_text}, received a {outcome} and {drug_text}.",
        age = form.driver_age,
        gender = form.driver_gender,
        country = form.country_name,
        violation = prediction.predicted_violation,
        clock = format_clock_12h(form.stop_time),
        date = format_date(form.stop_date),
        outcome = prediction.predicted_outcome,
    );

    PredictionSummary {
        vehicle_number: form.vehicle_number.clone(),
        predicted_violation: prediction.predicted_violation.clone(),
        predicted_outcome: prediction.predicted_outcome.clone(),
        stop_duration: form.stop_duration.clone(),
        matched_records: prediction.matched_records,
        basis: prediction.basis,
        narrative,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FormOptions {
    pub countries: Vec<&'static str>,
    pub races: Vec<&'static str>,
    pub search_types: Vec<&'static str>,
    pub genders: Vec<DriverGender>,
    pub min_driver_age: i64,
    pub max_driver_age: i64,
    pub stop_durations: Vec<String>,
}

/// Choices offered by the prediction form. Stop durations come from the
/// historical table in first-seen order.
#[must_use]
pub fn form_options(records: &[StopRecord]) -> FormOptions {
    let mut stop_durations: Vec<String> = Vec::new();
    for duration in records
        .iter()
        .filter_map(|record| record.stop_duration.as_deref())
    {
        if !stop_durations.iter().any(|seen| seen == duration) {
            stop_durations.push(duration.to_string());
        }
    }

    FormOptions {
        countries: COUNTRY_OPTIONS.to_vec(),
        races: RACE_OPTIONS.to_vec(),
        search_types: SEARCH_TYPE_OPTIONS.to_vec(),
        genders: DriverGender::ALL.to_vec(),
        min_driver_age: MIN_DRIVER_AGE,
        max_driver_age: MAX_DRIVER_AGE,
        stop_durations,
    }
}

/// Lifecycle of one prediction form: nothing submitted, captured values
/// awaiting a lookup, or a finished prediction. Submitting again from any
/// state starts over with the new values.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum PredictionState {
    #[default]
    Idle,
    Submitted(StopForm),
    Predicted {
        form: StopForm,
        summary: PredictionSummary,
    },
}

impl PredictionState {
    #[must_use]
    pub fn submit(self, form: StopForm) -> Self {
        Self::Submitted(form)
    }

    #[must_use]
    pub fn resolve(self, records: &[StopRecord]) -> Self {
        match self {
            Self::Submitted(form) => {
                let prediction = predict(&form, records);
                let summary = summarize(&form, &prediction);
                log::info!(
                    "predict: matched_records={} basis={:?}",
                    summary.matched_records,
                    summary.basis
                );
                Self::Predicted { form, summary }
            }
            other => other,
        }
    }

    #[must_use]
    pub fn summary(&self) -> Option<&PredictionSummary> {
        match self {
            Self::Predicted { summary, .. } => Some(summary),
            Self::Idle | Self::Submitted(_) => None,
        }
    }
}
