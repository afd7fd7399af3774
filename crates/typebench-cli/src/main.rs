//! Typebench CLI
//!
//! ## Usage
//!
//! ```bash
//! typebench targets                         # List configured targets
//! typebench run vanilla lit --out traces    # Benchmark two targets
//! typebench --config my.yaml run app -v     # Custom targets, debug logs
//! ```

use clap::Parser;
use std::process::ExitCode;
use typebench_cli::{
    init_logging, run_with_chromium, Cli, CliConfig, CliResult, ColorChoice, Commands, Reporter,
    RunArgs, RunPlan, Verbosity,
};

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> CliResult<()> {
    let cli = Cli::parse();
    let config = build_config(&cli);
    let use_color = config.color.should_color();
    init_logging(config.verbosity, use_color);

    let reporter = Reporter::new(use_color, config.verbosity.is_quiet());
    let targets = config.load_targets()?;

    match cli.command {
        Commands::Targets => {
            reporter.targets(&targets);
            Ok(())
        }
        Commands::Run(ref args) => run_benchmarks(&targets, args, &reporter).await,
    }
}

fn build_config(cli: &Cli) -> CliConfig {
    let color: ColorChoice = cli.color.into();
    CliConfig::new()
        .with_verbosity(Verbosity::from_flags(cli.quiet, cli.verbose))
        .with_color(color)
        .with_targets_file(cli.config.clone())
}

async fn run_benchmarks(
    targets: &typebench::TargetConfig,
    args: &RunArgs,
    reporter: &Reporter,
) -> CliResult<()> {
    let plan = RunPlan::from_args(targets, args)?;
    run_with_chromium(&plan, reporter).await?.into_result()?;
    Ok(())
}
