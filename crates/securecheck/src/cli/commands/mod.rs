pub mod catalog;
pub mod form_options;
pub mod logs;
pub mod metrics;
pub mod predict;
pub mod schema;

use anyhow::{Error, Result};
use serde_json::json;

use crate::gateway::{Gateway, GatewayError};
use crate::models::{Envelope, EnvelopeCommandFailure};

/// Writes the envelope as a single JSON line on stdout.
pub fn emit(envelope: &Envelope) -> Result<()> {
    let encoded = serde_json::to_string(envelope).map_err(|error| {
        command_failure(
            Envelope::error(
                envelope.command.clone(),
                "response_encode_failed",
                "failed to encode command response",
            )
            .with_error_details(json!({ "cause": format!("{error:#}") })),
        )
    })?;
    println!("{encoded}");
    Ok(())
}

#[must_use]
pub fn command_failure(envelope: Envelope) -> Error {
    Error::new(EnvelopeCommandFailure::new(envelope))
}

#[must_use]
pub fn gateway_failure(command: &str, error: &GatewayError) -> Error {
    log::error!("{command}: {error}");
    command_failure(Envelope::gateway_error(command, error))
}

pub(crate) fn gateway_for(config: &crate::config::RuntimeConfig) -> Gateway {
    let gateway_config = config.gateway_config();
    log::debug!(
        "gateway: database={} timeout_ms={}",
        gateway_config.database_path.display(),
        gateway_config.query_timeout.as_millis()
    );
    Gateway::new(gateway_config)
}
