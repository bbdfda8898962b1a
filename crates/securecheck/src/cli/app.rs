use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use super::commands::{catalog::CatalogArgs, logs::LogsArgs, predict::PredictArgs};

#[derive(Debug, Parser)]
#[command(
    name = "securecheck",
    version,
    about = "Police post log analytics over a read-only SQLite store"
)]
pub struct Cli {
    #[command(flatten)]
    pub runtime: RuntimeArgs,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Args)]
pub struct RuntimeArgs {
    #[arg(long, global = true, value_name = "PATH")]
    pub home_dir: Option<PathBuf>,

    #[arg(long, global = true, value_name = "PATH")]
    pub cwd: Option<PathBuf>,

    /// SQLite file holding `police_post_logs`.
    #[arg(long, global = true, value_name = "PATH")]
    pub database: Option<PathBuf>,

    #[arg(long, global = true, value_name = "MILLIS")]
    pub query_timeout_ms: Option<u64>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Raw police log table.
    Logs(LogsArgs),
    /// Headline counts and the outcome distribution.
    Metrics,
    /// Canned medium and complex analytical queries.
    Catalog(CatalogArgs),
    /// Predict violation and outcome for a described stop.
    Predict(PredictArgs),
    /// Choices offered by the prediction form.
    FormOptions,
    /// Expected table DDL and the stop record JSON schema.
    Schema,
}

impl Command {
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Logs(_) => "logs",
            Self::Metrics => "metrics",
            Self::Catalog(_) => "catalog",
            Self::Predict(_) => "predict",
            Self::FormOptions => "form-options",
            Self::Schema => "schema",
        }
    }
}
