use anyhow::Result;
use clap::Args;
use serde_json::json;

use super::{command_failure, emit, gateway_failure};
use crate::config::RuntimeConfig;
use crate::models::Envelope;
use crate::predict::{PredictionState, RawStopForm, StopForm};

const COMMAND: &str = "predict";

#[derive(Debug, Clone, Args)]
pub struct PredictArgs {
    #[arg(long)]
    pub vehicle_number: String,

    /// YYYY-MM-DD
    #[arg(long, value_name = "DATE")]
    pub stop_date: String,

    /// HH:MM or HH:MM:SS
    #[arg(long, value_name = "TIME")]
    pub stop_time: String,

    #[arg(long)]
    pub country_name: String,

    #[arg(long, allow_negative_numbers = true)]
    pub driver_age: i64,

    #[arg(long)]
    pub driver_race: String,

    #[arg(long)]
    pub search_type: String,

    #[arg(long)]
    pub stop_duration: String,

    #[arg(long, value_name = "Male|Female")]
    pub driver_gender: String,

    #[arg(long, value_name = "yes|no")]
    pub drugs_related_stop: String,

    #[arg(long, value_name = "yes|no")]
    pub search_conducted: String,
}

impl PredictArgs {
    fn raw_form(&self) -> RawStopForm {
        RawStopForm {
            vehicle_number: self.vehicle_number.clone(),
            stop_date: self.stop_date.clone(),
            stop_time: self.stop_time.clone(),
            country_name: self.country_name.clone(),
            driver_age: self.driver_age,
            driver_race: self.driver_race.clone(),
            search_type: self.search_type.clone(),
            stop_duration: self.stop_duration.clone(),
            driver_gender: self.driver_gender.clone(),
            drugs_related_stop: self.drugs_related_stop.clone(),
            search_conducted: self.search_conducted.clone(),
        }
    }
}

pub fn run(args: &PredictArgs, config: &RuntimeConfig) -> Result<()> {
    let form = StopForm::validate(&args.raw_form()).map_err(|error| {
        log::error!("{COMMAND}: {error}");
        command_failure(Envelope::error(COMMAND, error.code(), error.to_string()))
    })?;
    let submitted = PredictionState::default().submit(form.clone());

    let gateway = super::gateway_for(config);
    let (records, connection_error) = gateway
        .load_stops()
        .map_err(|error| gateway_failure(COMMAND, &error))?;

    let resolved = submitted.resolve(&records);
    let Some(summary) = resolved.summary() else {
        return Err(command_failure(Envelope::error(
            COMMAND,
            "prediction_unresolved",
            "prediction did not complete",
        )));
    };

    let envelope = Envelope::ok(COMMAND, json!(summary))
        .with_meta("form", form.describe())
        .with_meta("historical_rows", json!(records.len()));
    emit(&envelope.with_connection_warning(connection_error.as_ref()))
}
