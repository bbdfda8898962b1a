use anyhow::Result;
use serde_json::json;

use super::{emit, gateway_failure};
use crate::config::RuntimeConfig;
use crate::metrics;
use crate::models::Envelope;

const COMMAND: &str = "metrics";

pub fn run(config: &RuntimeConfig) -> Result<()> {
    let gateway = super::gateway_for(config);
    let (records, connection_error) = gateway
        .load_stops()
        .map_err(|error| gateway_failure(COMMAND, &error))?;

    let metrics = metrics::compute(&records);
    log::info!(
        "metrics: total_stops={} total_arrests={} total_warnings={} drug_stops={}",
        metrics.total_stops,
        metrics.total_arrests,
        metrics.total_warnings,
        metrics.drug_stops
    );

    let envelope = Envelope::ok(COMMAND, json!(metrics))
        .with_meta("distinct_outcomes", json!(metrics.outcome_distribution.len()));
    emit(&envelope.with_connection_warning(connection_error.as_ref()))
}
