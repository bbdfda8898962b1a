use anyhow::Result;
use clap::{Args, Subcommand};
use serde_json::{Value, json};

use super::{command_failure, emit, gateway_failure};
use crate::catalog::{self, CatalogError, QueryTier};
use crate::config::RuntimeConfig;
use crate::gateway::Table;
use crate::models::Envelope;

#[derive(Debug, Clone, Args)]
pub struct CatalogArgs {
    #[command(subcommand)]
    pub command: CatalogCommand,
}

#[derive(Debug, Clone, Subcommand)]
pub enum CatalogCommand {
    /// List catalog queries, optionally for one tier.
    List(CatalogListArgs),
    /// Run one catalog query by menu label or id.
    Run(CatalogRunArgs),
}

#[derive(Debug, Clone, Args)]
pub struct CatalogListArgs {
    #[arg(long, value_enum)]
    pub tier: Option<QueryTier>,
}

#[derive(Debug, Clone, Args)]
pub struct CatalogRunArgs {
    #[arg(long, value_enum)]
    pub tier: QueryTier,

    #[arg(value_name = "LABEL")]
    pub label: String,
}

pub fn run(args: &CatalogArgs, config: &RuntimeConfig) -> Result<()> {
    match &args.command {
        CatalogCommand::List(list_args) => run_list(list_args),
        CatalogCommand::Run(run_args) => run_query(run_args, config),
    }
}

fn run_list(args: &CatalogListArgs) -> Result<()> {
    let entries = catalog::descriptors()
        .iter()
        .filter(|descriptor| args.tier.is_none_or(|tier| descriptor.tier == tier))
        .map(catalog::QueryDescriptor::describe)
        .collect::<Vec<Value>>();

    let envelope = Envelope::ok("catalog.list", json!({ "queries": entries }))
        .with_meta("query_count", json!(entries.len()))
        .with_meta("tier", json!(args.tier));
    emit(&envelope)
}

fn run_query(args: &CatalogRunArgs, config: &RuntimeConfig) -> Result<()> {
    const COMMAND: &str = "catalog.run";

    let descriptor = catalog::find(args.tier, &args.label).map_err(|error| {
        log::error!("{COMMAND}: {error}");
        let options = catalog::tier_descriptors(args.tier)
            .map(|descriptor| descriptor.label)
            .collect::<Vec<_>>();
        command_failure(
            Envelope::error(COMMAND, error.code(), error.to_string())
                .with_error_details(json!({ "tier": args.tier, "options": options })),
        )
    })?;

    let gateway = super::gateway_for(config);
    let (table, connection_error) = match catalog::run(&gateway, args.tier, descriptor.label) {
        Ok(table) => (table, None),
        Err(CatalogError::Gateway(error)) if error.is_connection() => {
            log::warn!("{COMMAND}: {error}; continuing with an empty result");
            (Table::empty(), Some(error))
        }
        Err(CatalogError::Gateway(error)) => return Err(gateway_failure(COMMAND, &error)),
        Err(error @ CatalogError::UnknownLabel { .. }) => {
            return Err(command_failure(Envelope::error(
                COMMAND,
                error.code(),
                error.to_string(),
            )));
        }
    };

    let envelope = Envelope::table(COMMAND, &table)
        .with_meta("query", descriptor.describe())
        .with_connection_warning(connection_error.as_ref())
        .with_no_result_warning(table.is_empty());

    emit(&envelope)
}
