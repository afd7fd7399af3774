//! Headless Chromium launch.
//!
//! [`BrowserConfig`] is always available so the CLI can build one from its
//! flags; [`Browser`] needs the `browser` feature, which pulls in
//! chromiumoxide.

use crate::result::{TypebenchError, TypebenchResult};

/// Default viewport width
pub const DEFAULT_VIEWPORT_WIDTH: u32 = 1280;

/// Default viewport height
pub const DEFAULT_VIEWPORT_HEIGHT: u32 = 800;

/// How `typebench run` launches Chromium
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrowserConfig {
    /// `false` with `--headful`
    pub headless: bool,
    /// Viewport width in CSS pixels
    pub viewport_width: u32,
    /// Viewport height in CSS pixels
    pub viewport_height: u32,
    /// Chromium executable; chromiumoxide searches the usual locations when unset
    pub chromium_path: Option<String>,
    /// Cleared by `--no-sandbox`, needed when running as root in containers
    pub sandbox: bool,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            headless: true,
            viewport_width: DEFAULT_VIEWPORT_WIDTH,
            viewport_height: DEFAULT_VIEWPORT_HEIGHT,
            chromium_path: None,
            sandbox: true,
        }
    }
}

impl BrowserConfig {
    /// Window size used for every page; targets share one browser
    #[must_use]
    pub const fn with_viewport(mut self, width: u32, height: u32) -> Self {
        self.viewport_width = width;
        self.viewport_height = height;
        self
    }

    /// Show the browser window when `false`
    #[must_use]
    pub const fn with_headless(mut self, headless: bool) -> Self {
        self.headless = headless;
        self
    }

    /// Use this Chromium executable
    #[must_use]
    pub fn with_chromium_path(mut self, path: impl Into<String>) -> Self {
        self.chromium_path = Some(path.into());
        self
    }

    /// Launch with `--no-sandbox`
    #[must_use]
    pub const fn with_no_sandbox(mut self) -> Self {
        self.sandbox = false;
        self
    }
}

/// Stop the CDP handler task, then report how closing the browser went.
/// The task is stopped even when closing failed.
#[cfg_attr(not(feature = "browser"), allow(dead_code))]
fn stop_handler<E: std::fmt::Display>(
    handle: &tokio::task::JoinHandle<()>,
    closed: Result<(), E>,
) -> TypebenchResult<()> {
    handle.abort();
    closed.map_err(|e| TypebenchError::PageError {
        message: e.to_string(),
    })
}

#[cfg(feature = "browser")]
mod cdp {
    use std::sync::Arc;

    use chromiumoxide::browser::{Browser as CdpBrowser, BrowserConfig as CdpConfig};
    use chromiumoxide::handler::viewport::Viewport;
    use chromiumoxide::Page;
    use futures::StreamExt;
    use tokio::sync::Mutex;
    use tracing::{debug, info};

    use super::{stop_handler, BrowserConfig};
    use crate::result::{TypebenchError, TypebenchResult};

    /// A running Chromium with its CDP event handler task
    #[derive(Debug)]
    pub struct Browser {
        headless: bool,
        inner: Arc<Mutex<CdpBrowser>>,
        handle: tokio::task::JoinHandle<()>,
    }

    impl Browser {
        /// Launch Chromium and start driving its CDP connection.
        ///
        /// The handler task must keep running for any page call to complete.
        pub async fn launch(config: BrowserConfig) -> TypebenchResult<Self> {
            let mut builder = CdpConfig::builder().viewport(Viewport {
                width: config.viewport_width,
                height: config.viewport_height,
                ..Viewport::default()
            });

            if !config.headless {
                builder = builder.with_head();
            }

            if !config.sandbox {
                builder = builder.no_sandbox();
            }

            if let Some(ref path) = config.chromium_path {
                builder = builder.chrome_executable(path);
            }

            let cdp_config = builder
                .build()
                .map_err(|message| TypebenchError::BrowserLaunchError { message })?;

            let (browser, mut handler) = CdpBrowser::launch(cdp_config).await.map_err(|e| {
                TypebenchError::BrowserLaunchError {
                    message: e.to_string(),
                }
            })?;

            let handle = tokio::spawn(async move {
                while let Some(event) = handler.next().await {
                    if let Err(err) = event {
                        debug!(error = %err, "CDP handler stopped");
                        break;
                    }
                }
            });

            info!(headless = config.headless, "browser launched");
            Ok(Self {
                headless: config.headless,
                inner: Arc::new(Mutex::new(browser)),
                handle,
            })
        }

        /// Open a blank tab; each target gets its own
        pub async fn new_page(&self) -> TypebenchResult<Page> {
            let browser = self.inner.lock().await;
            browser
                .new_page("about:blank")
                .await
                .map_err(|e| TypebenchError::PageError {
                    message: e.to_string(),
                })
        }

        /// Close Chromium, reap the child process and stop the handler task
        pub async fn close(self) -> TypebenchResult<()> {
            let closed = {
                let mut browser = self.inner.lock().await;
                let closed = browser.close().await.map(|_| ());
                if closed.is_ok() {
                    // The child may already be gone after close; either way we are done with it.
                    let _ = browser.wait().await;
                }
                closed
            };
            stop_handler(&self.handle, closed)?;
            debug!(headless = self.headless, "browser closed");
            Ok(())
        }
    }
}

#[cfg(feature = "browser")]
pub use cdp::Browser;

#[cfg(test)]
mod tests {
    use super::*;

    mod config_tests {
        use super::*;

        #[test]
        fn test_defaults() {
            let config = BrowserConfig::default();
            assert!(config.headless);
            assert!(config.sandbox);
            assert_eq!(config.viewport_width, DEFAULT_VIEWPORT_WIDTH);
            assert_eq!(config.viewport_height, DEFAULT_VIEWPORT_HEIGHT);
            assert!(config.chromium_path.is_none());
        }

        #[test]
        fn test_builders() {
            let config = BrowserConfig::default()
                .with_viewport(1920, 1080)
                .with_headless(false)
                .with_chromium_path("/usr/bin/chromium")
                .with_no_sandbox();
            assert_eq!((config.viewport_width, config.viewport_height), (1920, 1080));
            assert!(!config.headless);
            assert!(!config.sandbox);
            assert_eq!(config.chromium_path.as_deref(), Some("/usr/bin/chromium"));
        }
    }

    mod close_tests {
        use super::*;

        #[tokio::test]
        async fn test_handler_stopped_when_close_fails() {
            let handle = tokio::spawn(std::future::pending::<()>());
            let result = stop_handler(&handle, Err("connection reset"));
            assert!(matches!(
                result,
                Err(TypebenchError::PageError { ref message }) if message == "connection reset"
            ));
            assert!(handle.await.unwrap_err().is_cancelled());
        }

        #[tokio::test]
        async fn test_handler_stopped_after_clean_close() {
            let handle = tokio::spawn(std::future::pending::<()>());
            assert!(stop_handler(&handle, Ok::<(), String>(())).is_ok());
            assert!(handle.await.unwrap_err().is_cancelled());
        }
    }
}
