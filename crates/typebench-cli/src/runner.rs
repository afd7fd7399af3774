//! Sequential execution of several targets

use std::future::Future;
use std::time::Duration;

use tracing::{error, info};
use typebench::{BrowserConfig, Target, TargetConfig};

use crate::bench::{run_target, BenchOptions, BenchPage, TargetReport};
use crate::commands::RunArgs;
use crate::error::{CliError, CliResult};
use crate::output::Reporter;

/// Outcome of a whole run
#[derive(Debug, Default)]
pub struct RunSummary {
    /// Targets that completed
    pub reports: Vec<TargetReport>,
    /// Targets that failed, with the error message
    pub failures: Vec<(String, String)>,
}

impl RunSummary {
    /// Number of targets attempted
    #[must_use]
    pub fn total(&self) -> usize {
        self.reports.len() + self.failures.len()
    }

    /// `Ok` when every target completed
    pub fn into_result(self) -> CliResult<Self> {
        if self.failures.is_empty() {
            Ok(self)
        } else {
            Err(CliError::TargetsFailed {
                failed: self.failures.len(),
                total: self.total(),
            })
        }
    }
}

/// Everything `run` needs, resolved from the command line and config file
#[derive(Debug, Clone)]
pub struct RunPlan {
    /// Targets in execution order
    pub targets: Vec<Target>,
    /// Per-target options
    pub options: BenchOptions,
    /// Browser launch settings
    pub browser: BrowserConfig,
}

impl RunPlan {
    /// Resolve target names and apply overrides. Unknown names fail before
    /// anything is launched.
    pub fn from_args(config: &TargetConfig, args: &RunArgs) -> CliResult<Self> {
        if args.timeout == Some(0) {
            return Err(CliError::invalid_argument("--timeout must be greater than zero"));
        }
        let mut targets = Vec::with_capacity(args.targets.len());
        for name in &args.targets {
            let mut target = config.resolve(name)?;
            if let Some(ms) = args.timeout {
                target.timeout = Duration::from_millis(ms);
            }
            targets.push(target);
        }

        let viewport = config.defaults.viewport;
        let mut browser = BrowserConfig::default()
            .with_viewport(viewport.width, viewport.height)
            .with_headless(!args.headful);
        if args.no_sandbox {
            browser = browser.with_no_sandbox();
        }
        if let Some(ref path) = args.chromium {
            browser = browser.with_chromium_path(path.to_string_lossy());
        }

        Ok(Self {
            targets,
            options: BenchOptions::default()
                .with_words(args.words.clone())
                .with_out_dir(&args.out)
                .with_trace(!args.no_trace)
                .with_pdf(!args.no_pdf),
            browser,
        })
    }
}

/// Run every target on a page from `open_page`, one after another.
///
/// A failing target is reported and the run moves on.
pub async fn run_targets<P, F, Fut>(
    targets: &[Target],
    options: &BenchOptions,
    mut open_page: F,
    reporter: &Reporter,
) -> RunSummary
where
    P: BenchPage,
    F: FnMut() -> Fut,
    Fut: Future<Output = CliResult<P>>,
{
    let mut summary = RunSummary::default();
    for target in targets {
        let outcome = match open_page().await {
            Ok(mut page) => {
                let outcome = run_target(&mut page, target, options).await;
                if let Err(err) = page.close().await {
                    error!(name = %target.name, error = %err, "failed to close page");
                }
                outcome
            }
            Err(err) => Err(err),
        };
        match outcome {
            Ok(report) => {
                info!(name = %report.target, elapsed = ?report.elapsed, "target finished");
                reporter.target_done(&report);
                summary.reports.push(report);
            }
            Err(err) => {
                error!(name = %target.name, error = %err, "target failed");
                reporter.target_failed(&target.name, &err.to_string());
                summary.failures.push((target.name.clone(), err.to_string()));
            }
        }
    }
    summary
}

/// Launch Chromium and run the plan against it
#[cfg(feature = "browser")]
pub async fn run_with_chromium(plan: &RunPlan, reporter: &Reporter) -> CliResult<RunSummary> {
    use crate::cdp_page::CdpBenchPage;

    tokio::fs::create_dir_all(&plan.options.out_dir).await?;
    let browser = typebench::Browser::launch(plan.browser.clone()).await?;
    let summary = run_targets(
        &plan.targets,
        &plan.options,
        || async {
            let page = browser.new_page().await?;
            Ok::<_, CliError>(CdpBenchPage::new(page))
        },
        reporter,
    )
    .await;
    if let Err(err) = browser.close().await {
        error!(error = %err, "failed to close browser");
    }
    Ok(summary)
}

/// Without chromiumoxide there is nothing to run against
#[cfg(not(feature = "browser"))]
pub async fn run_with_chromium(_plan: &RunPlan, _reporter: &Reporter) -> CliResult<RunSummary> {
    Err(CliError::BrowserUnavailable)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock_page::MockPage;
    use clap::Parser;
    use std::path::PathBuf;

    fn run_args(argv: &[&str]) -> RunArgs {
        let mut full = vec!["typebench", "run"];
        full.extend_from_slice(argv);
        match crate::Cli::parse_from(full).command {
            crate::Commands::Run(args) => args,
            crate::Commands::Targets => unreachable!("parsed run"),
        }
    }

    mod plan_tests {
        use super::*;

        #[test]
        fn test_plan_from_args() {
            let args = run_args(&[
                "lit",
                "vanilla",
                "--out",
                "out",
                "--words",
                "a,b",
                "--timeout",
                "900",
                "--no-sandbox",
                "--no-pdf",
            ]);
            let plan = RunPlan::from_args(&TargetConfig::builtin(), &args).unwrap();
            let names: Vec<_> = plan.targets.iter().map(|t| t.name.as_str()).collect();
            assert_eq!(names, vec!["lit", "vanilla"]);
            assert!(plan
                .targets
                .iter()
                .all(|t| t.timeout == Duration::from_millis(900)));
            assert_eq!(plan.options.words, vec!["a", "b"]);
            assert_eq!(plan.options.out_dir, PathBuf::from("out"));
            assert!(plan.options.trace);
            assert!(!plan.options.pdf);
            assert!(plan.browser.headless);
            assert!(!plan.browser.sandbox);
        }

        #[test]
        fn test_unknown_target_rejected() {
            let args = run_args(&["vanilla", "svelte"]);
            let err = RunPlan::from_args(&TargetConfig::builtin(), &args).unwrap_err();
            assert!(err.to_string().contains("unknown target 'svelte'"));
        }

        #[test]
        fn test_zero_timeout_rejected() {
            let args = run_args(&["vanilla", "--timeout", "0"]);
            assert!(matches!(
                RunPlan::from_args(&TargetConfig::builtin(), &args),
                Err(CliError::InvalidArgument { .. })
            ));
        }
    }

    mod run_targets_tests {
        use super::*;

        fn targets(names: &[&str]) -> Vec<Target> {
            let config = TargetConfig::builtin();
            names
                .iter()
                .map(|name| {
                    let mut target = config.resolve(name).unwrap();
                    target.timeout = Duration::from_millis(150);
                    target
                })
                .collect()
        }

        #[tokio::test]
        async fn test_failure_does_not_stop_the_run() {
            let dir = tempfile::tempdir().unwrap();
            let options = BenchOptions::default()
                .with_words(vec!["one".into()])
                .with_out_dir(dir.path());
            let mut opened = 0;
            let summary = run_targets(
                &targets(&["lit", "react", "vanilla"]),
                &options,
                || {
                    opened += 1;
                    let page = if opened == 2 {
                        MockPage::light_dom().dropping_submissions()
                    } else {
                        MockPage::light_dom()
                    };
                    async move { Ok::<_, CliError>(page) }
                },
                &Reporter::new(false, true),
            )
            .await;

            assert_eq!(summary.total(), 3);
            assert_eq!(summary.reports.len(), 2);
            assert_eq!(summary.failures[0].0, "react");
            assert!(dir.path().join("lit.json").exists());
            assert!(dir.path().join("vanilla.pdf").exists());
            assert!(!dir.path().join("react.pdf").exists());
            assert!(matches!(
                summary.into_result(),
                Err(CliError::TargetsFailed { failed: 1, total: 3 })
            ));
        }

        #[tokio::test]
        async fn test_page_open_failure_is_a_target_failure() {
            let summary = run_targets(
                &targets(&["lit"]),
                &BenchOptions::default(),
                || async { Err::<MockPage, _>(CliError::BrowserUnavailable) },
                &Reporter::new(false, true),
            )
            .await;
            assert_eq!(summary.failures.len(), 1);
            assert!(summary.reports.is_empty());
        }

        #[tokio::test]
        async fn test_all_passing_is_ok() {
            let dir = tempfile::tempdir().unwrap();
            let options = BenchOptions::default()
                .with_words(vec!["x".into()])
                .with_out_dir(dir.path())
                .with_trace(false);
            let summary = run_targets(
                &targets(&["vanilla"]),
                &options,
                || async { Ok::<_, CliError>(MockPage::light_dom()) },
                &Reporter::new(false, true),
            )
            .await;
            let summary = summary.into_result().unwrap();
            assert_eq!(summary.reports[0].items, 1);
            assert!(summary.reports[0].trace_path.is_none());
        }
    }

    #[cfg(not(feature = "browser"))]
    #[tokio::test]
    async fn test_without_browser_feature() {
        let plan = RunPlan::from_args(&TargetConfig::builtin(), &run_args(&["lit"])).unwrap();
        let result = run_with_chromium(&plan, &Reporter::new(false, true)).await;
        assert!(matches!(result, Err(CliError::BrowserUnavailable)));
    }
}
