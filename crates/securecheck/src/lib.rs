#![forbid(unsafe_code)]

pub mod catalog;
pub mod cli;
pub mod config;
pub mod gateway;
pub mod metrics;
pub mod models;
pub mod normalize;
pub mod predict;
pub mod utils;

pub use cli::app::{Cli, Command};
