//! Typebench CLI library
//!
//! Command-line front end for the typebench resolver: loads targets, drives
//! Chromium through each one and writes `<target>.json` traces and
//! `<target>.pdf` renderings.

#![warn(missing_docs)]

pub mod bench;
#[cfg(feature = "browser")]
pub mod cdp_page;
mod commands;
mod config;
mod error;
pub mod logging;
#[cfg(test)]
mod mock_page;
mod output;
pub mod runner;

pub use bench::{run_target, BenchOptions, BenchPage, TargetReport, DEFAULT_WORDS};
#[cfg(feature = "browser")]
pub use cdp_page::CdpBenchPage;
pub use commands::{Cli, ColorArg, Commands, RunArgs};
pub use config::{CliConfig, ColorChoice, Verbosity};
pub use error::{CliError, CliResult};
pub use logging::init_logging;
pub use output::{target_lines, Reporter};
pub use runner::{run_targets, run_with_chromium, RunPlan, RunSummary};
