use anyhow::Result;
use clap::Args;
use serde_json::json;

use super::{emit, gateway_failure};
use crate::config::RuntimeConfig;
use crate::gateway::SELECT_ALL_STOPS_SQL;
use crate::models::Envelope;

const COMMAND: &str = "logs";

#[derive(Debug, Clone, Args)]
pub struct LogsArgs {
    /// Show at most this many rows.
    #[arg(long, value_name = "N")]
    pub limit: Option<usize>,
}

pub fn run(args: &LogsArgs, config: &RuntimeConfig) -> Result<()> {
    let gateway = super::gateway_for(config);
    let fetched = gateway
        .fetch(SELECT_ALL_STOPS_SQL)
        .map_err(|error| gateway_failure(COMMAND, &error))?;

    let total_rows = fetched.table.row_count();
    let table = match args.limit {
        Some(limit) => fetched.table.head(limit),
        None => fetched.table,
    };
    let truncated = table.row_count() < total_rows;

    let envelope = Envelope::ok(COMMAND, json!(table))
        .with_meta("total_rows", json!(total_rows))
        .with_meta("returned_rows", json!(table.row_count()))
        .with_meta("truncated", json!(truncated))
        .with_connection_warning(fetched.connection_error.as_ref())
        .with_no_result_warning(total_rows == 0);

    emit(&envelope)
}
