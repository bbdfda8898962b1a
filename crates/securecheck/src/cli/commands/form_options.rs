use anyhow::Result;
use serde_json::json;

use super::{emit, gateway_failure};
use crate::config::RuntimeConfig;
use crate::models::Envelope;
use crate::predict::form_options;

const COMMAND: &str = "form-options";

pub fn run(config: &RuntimeConfig) -> Result<()> {
    let gateway = super::gateway_for(config);
    let (records, connection_error) = gateway
        .load_stops()
        .map_err(|error| gateway_failure(COMMAND, &error))?;

    let options = form_options(&records);
    let envelope = Envelope::ok(COMMAND, json!(options));
    emit(&envelope.with_connection_warning(connection_error.as_ref()))
}
