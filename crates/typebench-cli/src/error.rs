//! CLI errors.
//!
//! Configuration and resolver failures come from the library and are shown
//! as-is; the CLI adds its own argument checks and the overall run outcome.

use thiserror::Error;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug, Error)]
pub enum CliError {
    /// Creating the output directory or writing a trace/PDF failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Typebench(#[from] typebench::TypebenchError),

    /// A flag value clap accepted but the run cannot use
    #[error("Invalid argument: {message}")]
    InvalidArgument { message: String },

    /// Binary built without chromiumoxide
    #[error("Browser support not enabled. Rebuild with --features browser")]
    BrowserUnavailable,

    /// One or more targets did not complete
    #[error("{failed} of {total} target(s) failed")]
    TargetsFailed { failed: usize, total: usize },
}

impl CliError {
    #[must_use]
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }
}
