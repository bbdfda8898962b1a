#![forbid(unsafe_code)]

use std::path::PathBuf;

use anyhow::{Result, anyhow};
use clap::Parser;
use clap::error::ErrorKind;
use securecheck::cli::app::{Cli, Command, RuntimeArgs};
use securecheck::cli::commands;
use securecheck::config::RuntimeConfig;
use securecheck::models::EnvelopeCommandFailure;

const EXIT_SUCCESS: i32 = 0;
const EXIT_RUNTIME_FAILURE: i32 = 1;
const EXIT_USAGE_ERROR: i32 = 64;

fn main() {
    pretty_env_logger::init_custom_env("RUST_LOG");
    std::process::exit(run());
}

fn run() -> i32 {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(error) => return exit_code_for_parse_error(error),
    };
    let command_name = cli.command.name();
    log::info!("securecheck: starting `{command_name}`");

    match execute(cli) {
        Ok(()) => {
            log::info!("securecheck: completed `{command_name}` (exit_code={EXIT_SUCCESS})");
            EXIT_SUCCESS
        }
        Err(error) => {
            log::error!("securecheck: failed `{command_name}` (exit_code={EXIT_RUNTIME_FAILURE})");
            report_failure(&error);
            EXIT_RUNTIME_FAILURE
        }
    }
}

fn execute(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Schema => commands::schema::run(),
        Command::Logs(args) => commands::logs::run(&args, &resolve_runtime_config(&cli.runtime)?),
        Command::Metrics => commands::metrics::run(&resolve_runtime_config(&cli.runtime)?),
        Command::Catalog(args) => {
            commands::catalog::run(&args, &resolve_runtime_config(&cli.runtime)?)
        }
        Command::Predict(args) => {
            commands::predict::run(&args, &resolve_runtime_config(&cli.runtime)?)
        }
        Command::FormOptions => {
            commands::form_options::run(&resolve_runtime_config(&cli.runtime)?)
        }
    }
}

/// Envelope failures go to stdout like any other envelope; anything else is
/// a plain message on stderr.
fn report_failure(error: &anyhow::Error) {
    match error.downcast_ref::<EnvelopeCommandFailure>() {
        Some(failure) => println!("{failure}"),
        None => eprintln!("{error:#}"),
    }
}

fn exit_code_for_parse_error(error: clap::Error) -> i32 {
    let _ = error.print();
    match error.kind() {
        ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => EXIT_SUCCESS,
        _ => EXIT_USAGE_ERROR,
    }
}

fn resolve_runtime_config(args: &RuntimeArgs) -> Result<RuntimeConfig> {
    let home_dir = match &args.home_dir {
        Some(path) => path.clone(),
        None => std::env::var_os("HOME")
            .map(PathBuf::from)
            .ok_or_else(|| anyhow!("HOME is not set; pass --home-dir"))?,
    };

    let cwd = match &args.cwd {
        Some(path) => path.clone(),
        None => std::env::current_dir()?,
    };

    securecheck::config::resolve_runtime_config(
        &home_dir,
        &cwd,
        args.database.as_deref(),
        args.query_timeout_ms,
    )
}
