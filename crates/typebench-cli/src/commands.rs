//! CLI command definitions using clap

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Typebench: type into to-do apps in headless Chromium and capture traces
#[derive(Parser, Debug)]
#[command(name = "typebench")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (errors only)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Color output (auto, always, never)
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorArg,

    /// Target file (YAML); defaults to the built-in localhost targets
    #[arg(long, global = true, env = "TYPEBENCH_CONFIG")]
    pub config: Option<PathBuf>,

    /// Subcommand to run
    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Benchmark one or more targets
    Run(RunArgs),

    /// List configured targets
    Targets,
}

/// Arguments for the run command
#[derive(Parser, Debug)]
#[allow(clippy::struct_excessive_bools)]
pub struct RunArgs {
    /// Targets to benchmark, in order
    #[arg(required = true, num_args = 1..)]
    pub targets: Vec<String>,

    /// Directory for `<target>.json` and `<target>.pdf`
    #[arg(short, long, default_value = ".")]
    pub out: PathBuf,

    /// Words to type (comma separated or repeated)
    #[arg(short, long, value_delimiter = ',')]
    pub words: Vec<String>,

    /// Show the browser window
    #[arg(long)]
    pub headful: bool,

    /// Disable the Chromium sandbox (containers/CI)
    #[arg(long)]
    pub no_sandbox: bool,

    /// Path to the Chromium binary
    #[arg(long)]
    pub chromium: Option<PathBuf>,

    /// Override the per-wait timeout in milliseconds
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Skip performance trace capture
    #[arg(long)]
    pub no_trace: bool,

    /// Skip PDF rendering
    #[arg(long)]
    pub no_pdf: bool,
}

/// Color argument
#[derive(ValueEnum, Clone, Copy, Debug, Default)]
pub enum ColorArg {
    /// Automatic color detection
    #[default]
    Auto,
    /// Always use colors
    Always,
    /// Never use colors
    Never,
}

impl From<ColorArg> for crate::config::ColorChoice {
    fn from(arg: ColorArg) -> Self {
        match arg {
            ColorArg::Auto => Self::Auto,
            ColorArg::Always => Self::Always,
            ColorArg::Never => Self::Never,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    mod parse_tests {
        use super::*;

        #[test]
        fn test_cli_definition_is_valid() {
            Cli::command().debug_assert();
        }

        #[test]
        fn test_run_defaults() {
            let cli = Cli::try_parse_from(["typebench", "run", "vanilla"]).unwrap();
            let Commands::Run(args) = cli.command else {
                panic!("expected run");
            };
            assert_eq!(args.targets, vec!["vanilla"]);
            assert_eq!(args.out, PathBuf::from("."));
            assert!(args.words.is_empty());
            assert!(!args.headful && !args.no_sandbox && !args.no_trace && !args.no_pdf);
            assert!(args.timeout.is_none());
        }

        #[test]
        fn test_run_all_flags() {
            let cli = Cli::try_parse_from([
                "typebench",
                "-vv",
                "--config",
                "targets.yaml",
                "run",
                "lit",
                "vanilla",
                "--out",
                "traces",
                "--words",
                "one,two",
                "--words",
                "three",
                "--headful",
                "--no-sandbox",
                "--chromium",
                "/opt/chromium",
                "--timeout",
                "750",
                "--no-trace",
                "--no-pdf",
            ])
            .unwrap();
            assert_eq!(cli.verbose, 2);
            assert_eq!(cli.config, Some(PathBuf::from("targets.yaml")));
            let Commands::Run(args) = cli.command else {
                panic!("expected run");
            };
            assert_eq!(args.targets, vec!["lit", "vanilla"]);
            assert_eq!(args.words, vec!["one", "two", "three"]);
            assert_eq!(args.timeout, Some(750));
            assert!(args.headful && args.no_sandbox && args.no_trace && args.no_pdf);
        }

        #[test]
        fn test_run_requires_a_target() {
            assert!(Cli::try_parse_from(["typebench", "run"]).is_err());
        }

        #[test]
        fn test_targets_subcommand() {
            let cli = Cli::try_parse_from(["typebench", "targets", "-q"]).unwrap();
            assert!(cli.quiet);
            assert!(matches!(cli.command, Commands::Targets));
        }
    }
}
