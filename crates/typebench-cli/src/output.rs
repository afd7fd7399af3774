//! Human-facing status lines and tables

use console::{style, Term};
use typebench::TargetConfig;

use crate::bench::TargetReport;

/// Writes status lines to stderr and tables to stdout
#[derive(Debug)]
pub struct Reporter {
    err: Term,
    out: Term,
    /// Whether to use colors
    pub use_color: bool,
    /// Quiet mode
    pub quiet: bool,
}

impl Default for Reporter {
    fn default() -> Self {
        Self::new(true, false)
    }
}

impl Reporter {
    /// Create a reporter
    #[must_use]
    pub fn new(use_color: bool, quiet: bool) -> Self {
        Self {
            err: Term::stderr(),
            out: Term::stdout(),
            use_color,
            quiet,
        }
    }

    /// Print a success line for a finished target
    pub fn target_done(&self, report: &TargetReport) {
        if self.quiet {
            return;
        }
        let prefix = if self.use_color {
            style("✓").green().bold().to_string()
        } else {
            "DONE".to_string()
        };
        let _ = self.err.write_line(&format!("{prefix} {}", report.summary()));
    }

    /// Print a failure line; shown even in quiet mode
    pub fn target_failed(&self, target: &str, error: &str) {
        let prefix = if self.use_color {
            style("✗").red().bold().to_string()
        } else {
            "FAIL".to_string()
        };
        let _ = self.err.write_line(&format!("{prefix} {target}: {error}"));
    }

    /// Print the target table
    pub fn targets(&self, config: &TargetConfig) {
        for line in target_lines(config, self.use_color) {
            let _ = self.out.write_line(&line);
        }
    }
}

/// One `name  url` line per target, names padded to align
#[must_use]
pub fn target_lines(config: &TargetConfig, use_color: bool) -> Vec<String> {
    let width = config.names().map(str::len).max().unwrap_or(0);
    config
        .targets
        .iter()
        .map(|(name, entry)| {
            let padded = format!("{name:<width$}");
            let name = if use_color {
                style(padded).cyan().bold().to_string()
            } else {
                padded
            };
            format!("{name}  {}", entry.url)
        })
        .collect()
}
