//! Result and error types for typebench.

use thiserror::Error;

/// Result type for typebench operations
pub type TypebenchResult<T> = Result<T, TypebenchError>;

/// Errors that can occur while resolving elements or driving a page
#[derive(Debug, Error)]
pub enum TypebenchError {
    /// A polling wait reached its deadline without the condition holding
    #[error("Timed out after {ms}ms")]
    Timeout {
        /// Wait budget in milliseconds
        ms: u64,
    },

    /// A selector chain produced no element at some step
    #[error("Could not find element: {chain}")]
    ElementNotFound {
        /// The full chain, rendered as `a >> b >> c`
        chain: String,
    },

    /// Every chain of a selector set failed
    #[error("Could not find element for selectors: {selectors}")]
    NoSelectorsMatched {
        /// The full selector set, rendered as JSON
        selectors: String,
    },

    /// Empty selector chain or selector set
    #[error("Invalid input: {message}")]
    InvalidInput {
        /// Error message
        message: String,
    },

    /// Browser executable could not be started
    #[error("Failed to launch browser: {message}")]
    BrowserLaunchError {
        /// Error message
        message: String,
    },

    /// Page-level protocol failure
    #[error("Page error: {message}")]
    PageError {
        /// Error message
        message: String,
    },

    /// In-page function threw or returned an unexpected value
    #[error("Evaluation failed: {message}")]
    EvaluationError {
        /// Error message
        message: String,
    },

    /// Navigation error
    #[error("Navigation to {url} failed: {message}")]
    NavigationError {
        /// URL that failed
        url: String,
        /// Error message
        message: String,
    },

    /// Synthetic input could not be dispatched
    #[error("Input simulation failed: {message}")]
    InputError {
        /// Error message
        message: String,
    },

    /// Performance trace could not be started or collected
    #[error("Trace failed: {message}")]
    TraceError {
        /// Error message
        message: String,
    },

    /// Page could not be printed
    #[error("PDF rendering failed: {message}")]
    PdfError {
        /// Error message
        message: String,
    },

    /// Target configuration is invalid
    #[error("Configuration error: {message}")]
    Config {
        /// Error message
        message: String,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),
}

impl TypebenchError {
    /// Create an invalid input error
    #[must_use]
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    /// Create a configuration error
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Whether this error is a wait deadline expiring
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}
