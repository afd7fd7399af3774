//! Per-target benchmark: open, locate the input, type, capture.
//!
//! ```text
//! viewport → start trace → navigate → resolve input → scroll → click
//!     → for each word: type, Enter, wait for item count
//!     → stop trace → <target>.json → pdf → <target>.pdf
//! ```

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::Serialize;
use tracing::{debug, info};
use typebench::{
    query_selectors_all, scroll_into_view_if_needed, wait_for_element_count, wait_for_selectors,
    CountOperator, ElementHandle, ResolveOptions, SearchContext, Target, TypebenchError,
    TypebenchResult, Viewport,
};
use url::Url;

use crate::error::CliResult;

/// Words typed when none are given on the command line
pub const DEFAULT_WORDS: &[&str] = &[
    "buy", "milk", "walk", "the", "dog", "write", "benchmark", "report", "call", "mom",
];

/// Key that submits the to-do form
pub const SUBMIT_KEY: &str = "Enter";

/// Element type produced by a page's document context
pub type PageElement<P> = <<P as BenchPage>::Context as SearchContext>::Element;

/// Page operations the benchmark needs beyond element resolution
#[async_trait]
pub trait BenchPage: Send + Sync {
    /// Search context for the current document
    type Context: SearchContext;

    /// Emulate a viewport size
    async fn set_viewport(&self, viewport: Viewport) -> TypebenchResult<()>;

    /// Load `url` and wait for it
    async fn navigate(&self, url: &Url) -> TypebenchResult<()>;

    /// Fresh context for the loaded document
    async fn document(&self) -> TypebenchResult<Self::Context>;

    /// Click the center of `element`
    async fn click(&self, element: &PageElement<Self>) -> TypebenchResult<()>;

    /// Type `text` into the focused element
    async fn type_text(&self, text: &str) -> TypebenchResult<()>;

    /// Press and release a named key
    async fn press_key(&self, key: &str) -> TypebenchResult<()>;

    /// Begin recording a performance trace
    async fn start_trace(&mut self) -> TypebenchResult<()>;

    /// End the trace and return its events
    async fn stop_trace(&mut self) -> TypebenchResult<Vec<serde_json::Value>>;

    /// Render the page as PDF
    async fn pdf(&self) -> TypebenchResult<Vec<u8>>;

    /// Release the page
    async fn close(&mut self) -> TypebenchResult<()> {
        Ok(())
    }
}

/// What to do for every target
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BenchOptions {
    /// Words to submit, one to-do item each
    pub words: Vec<String>,
    /// Output directory
    pub out_dir: PathBuf,
    /// Capture `<target>.json`
    pub trace: bool,
    /// Capture `<target>.pdf`
    pub pdf: bool,
}

impl Default for BenchOptions {
    fn default() -> Self {
        Self {
            words: DEFAULT_WORDS.iter().map(ToString::to_string).collect(),
            out_dir: PathBuf::from("."),
            trace: true,
            pdf: true,
        }
    }
}

impl BenchOptions {
    /// Replace the word list; an empty list keeps the defaults
    #[must_use]
    pub fn with_words(mut self, words: Vec<String>) -> Self {
        if !words.is_empty() {
            self.words = words;
        }
        self
    }

    /// Set the output directory
    #[must_use]
    pub fn with_out_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.out_dir = dir.into();
        self
    }

    /// Enable or disable trace capture
    #[must_use]
    pub const fn with_trace(mut self, trace: bool) -> Self {
        self.trace = trace;
        self
    }

    /// Enable or disable PDF capture
    #[must_use]
    pub const fn with_pdf(mut self, pdf: bool) -> Self {
        self.pdf = pdf;
        self
    }

    /// `<out>/<target>.json`
    #[must_use]
    pub fn trace_path(&self, target: &str) -> PathBuf {
        self.out_dir.join(format!("{target}.json"))
    }

    /// `<out>/<target>.pdf`
    #[must_use]
    pub fn pdf_path(&self, target: &str) -> PathBuf {
        self.out_dir.join(format!("{target}.pdf"))
    }
}

/// Outcome of one target
#[derive(Debug, Clone, Serialize)]
pub struct TargetReport {
    /// Target name
    pub target: String,
    /// Words submitted
    pub words_typed: usize,
    /// Items present after the last word
    pub items: usize,
    /// Wall-clock time for the whole target
    pub elapsed: Duration,
    /// Trace file, if captured
    pub trace_path: Option<PathBuf>,
    /// PDF file, if captured
    pub pdf_path: Option<PathBuf>,
}

impl TargetReport {
    /// One-line description for the terminal
    #[must_use]
    pub fn summary(&self) -> String {
        let mut line = format!(
            "{}: {} word(s) in {:.2?}",
            self.target, self.words_typed, self.elapsed
        );
        for path in [&self.trace_path, &self.pdf_path].into_iter().flatten() {
            line.push_str(&format!(" → {}", path.display()));
        }
        line
    }
}

/// Run the benchmark for `target` on `page`.
///
/// A failure after tracing started still stops the trace before the error
/// is returned; nothing is written for that target.
pub async fn run_target<P: BenchPage>(
    page: &mut P,
    target: &Target,
    options: &BenchOptions,
) -> CliResult<TargetReport> {
    let started = Instant::now();
    info!(name = %target.name, url = %target.url, "starting target");

    page.set_viewport(target.viewport).await?;
    if options.trace {
        page.start_trace().await?;
    }
    let items = match type_words(&*page, target, &options.words).await {
        Ok(items) => items,
        Err(err) => {
            if options.trace {
                if let Err(stop) = page.stop_trace().await {
                    debug!(error = %stop, "could not stop trace after failure");
                }
            }
            return Err(err);
        }
    };

    let trace_path = if options.trace {
        let events = page.stop_trace().await?;
        let path = options.trace_path(&target.name);
        write_trace(&path, events).await?;
        info!(path = %path.display(), "trace written");
        Some(path)
    } else {
        None
    };

    let pdf_path = if options.pdf {
        let bytes = page.pdf().await?;
        let path = options.pdf_path(&target.name);
        tokio::fs::write(&path, bytes).await?;
        info!(path = %path.display(), "pdf written");
        Some(path)
    } else {
        None
    };

    Ok(TargetReport {
        target: target.name.clone(),
        words_typed: options.words.len(),
        items,
        elapsed: started.elapsed(),
        trace_path,
        pdf_path,
    })
}

/// Navigate, focus the input and submit every word. Returns the final item
/// count.
async fn type_words<P: BenchPage>(
    page: &P,
    target: &Target,
    words: &[String],
) -> CliResult<usize> {
    page.navigate(&target.url).await?;
    let document = page.document().await?;

    let resolve = ResolveOptions::new().with_timeout(target.timeout);
    let input = wait_for_selectors(&document, &target.input_selectors, &resolve).await?;
    debug!(input = %input.describe(), "input located");
    let focused = match scroll_into_view_if_needed(&input, target.timeout).await {
        Ok(_) => page.click(&input).await,
        Err(err) => Err(err),
    };
    input.release().await;
    focused?;

    let baseline = query_selectors_all(&document, &target.item_selectors).await?;
    let baseline_count = baseline.len();
    <PageElement<P> as ElementHandle>::release_all(baseline).await;

    let mut items = baseline_count;
    for (index, word) in words.iter().enumerate() {
        page.type_text(word).await?;
        page.press_key(SUBMIT_KEY).await?;
        items = wait_for_element_count(
            &document,
            &target.item_selectors,
            baseline_count + index + 1,
            CountOperator::AtLeast,
            target.timeout,
        )
        .await?;
        debug!(word = %word, items, "word submitted");
    }
    Ok(items)
}

/// Write events in the Chrome trace file format
async fn write_trace(path: &Path, events: Vec<serde_json::Value>) -> TypebenchResult<()> {
    let body = serde_json::to_vec(&serde_json::json!({ "traceEvents": events }))?;
    tokio::fs::write(path, body).await.map_err(TypebenchError::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock_page::MockPage;
    use typebench::{SelectorChain, SelectorSet, TargetConfig};

    fn target(name: &str) -> Target {
        let mut target = TargetConfig::builtin().resolve("vanilla").unwrap();
        target.name = name.to_string();
        target.timeout = Duration::from_millis(500);
        target
    }

    fn options(dir: &Path) -> BenchOptions {
        BenchOptions::default()
            .with_words(vec!["alpha".into(), "beta".into(), "gamma".into()])
            .with_out_dir(dir)
    }

    mod options_tests {
        use super::*;

        #[test]
        fn test_defaults() {
            let opts = BenchOptions::default();
            assert_eq!(opts.words.len(), DEFAULT_WORDS.len());
            assert!(opts.trace && opts.pdf);
            assert_eq!(opts.trace_path("lit"), PathBuf::from("./lit.json"));
            assert_eq!(opts.pdf_path("lit"), PathBuf::from("./lit.pdf"));
        }

        #[test]
        fn test_empty_words_keep_defaults() {
            let opts = BenchOptions::default().with_words(Vec::new());
            assert_eq!(opts.words.len(), DEFAULT_WORDS.len());
        }
    }

    mod run_target_tests {
        use super::*;

        #[tokio::test]
        async fn test_full_run_writes_outputs() {
            let dir = tempfile::tempdir().unwrap();
            let mut page = MockPage::light_dom();
            let report = run_target(&mut page, &target("vanilla"), &options(dir.path()))
                .await
                .unwrap();

            assert_eq!(report.words_typed, 3);
            assert_eq!(report.items, 3);
            assert_eq!(page.item_texts(), vec!["alpha", "beta", "gamma"]);

            let trace: serde_json::Value =
                serde_json::from_slice(&std::fs::read(dir.path().join("vanilla.json")).unwrap())
                    .unwrap();
            assert!(trace["traceEvents"].is_array());
            assert_eq!(
                std::fs::read(dir.path().join("vanilla.pdf")).unwrap(),
                MockPage::PDF_BYTES
            );
            assert_eq!(report.trace_path, Some(dir.path().join("vanilla.json")));
        }

        #[tokio::test]
        async fn test_call_order() {
            let dir = tempfile::tempdir().unwrap();
            let mut page = MockPage::light_dom();
            let mut opts = options(dir.path());
            opts.words.truncate(1);
            run_target(&mut page, &target("vanilla"), &opts).await.unwrap();

            assert_eq!(
                page.calls(),
                vec![
                    "viewport 1280x800",
                    "start_trace",
                    "navigate http://localhost:8000/",
                    "click <input.new-todo>",
                    "type alpha",
                    "key Enter",
                    "stop_trace",
                    "pdf",
                ]
            );
        }

        #[tokio::test]
        async fn test_shadow_input_via_fallback_chain() {
            let dir = tempfile::tempdir().unwrap();
            let mut page = MockPage::shadow_dom();
            let mut target = target("lit");
            target.input_selectors = SelectorSet::new([
                SelectorChain::single("input.new-todo"),
                SelectorChain::new(["todo-app", "input.new-todo"]),
            ]);
            target.item_selectors =
                SelectorSet::from(SelectorChain::new(["todo-app", ".todo-list li"]));
            target.timeout = Duration::from_millis(150);

            let report = run_target(&mut page, &target, &options(dir.path()).with_pdf(false))
                .await
                .unwrap();
            assert_eq!(report.items, 3);
            assert!(report.pdf_path.is_none());
            assert!(!dir.path().join("lit.pdf").exists());
        }

        #[tokio::test]
        async fn test_offscreen_input_is_scrolled() {
            let dir = tempfile::tempdir().unwrap();
            let mut page = MockPage::light_dom();
            page.input().set_in_viewport(false);
            run_target(&mut page, &target("vanilla"), &options(dir.path()))
                .await
                .unwrap();
            assert_eq!(page.input().scroll_requests(), 1);
        }

        #[tokio::test]
        async fn test_missing_input_fails() {
            let dir = tempfile::tempdir().unwrap();
            let mut page = MockPage::light_dom();
            let mut target = target("vanilla");
            target.input_selectors = SelectorSet::from(SelectorChain::single("#nope"));
            target.timeout = Duration::from_millis(100);

            let err = run_target(&mut page, &target, &options(dir.path()))
                .await
                .unwrap_err();
            assert!(err.to_string().contains("Could not find element for selectors"));
            assert!(!dir.path().join("vanilla.json").exists());
            assert!(!page.is_tracing());
            assert_eq!(page.calls().last().map(String::as_str), Some("stop_trace"));
        }

        #[tokio::test]
        async fn test_items_that_never_appear_time_out() {
            let dir = tempfile::tempdir().unwrap();
            let mut page = MockPage::light_dom().dropping_submissions();
            let mut target = target("vanilla");
            target.timeout = Duration::from_millis(150);

            let err = run_target(&mut page, &target, &options(dir.path()))
                .await
                .unwrap_err();
            assert!(matches!(
                err,
                crate::CliError::Typebench(TypebenchError::Timeout { ms: 150 })
            ));
            assert!(!page.is_tracing());
            assert!(!dir.path().join("vanilla.json").exists());
        }

        #[tokio::test]
        async fn test_failure_without_tracing_skips_stop() {
            let dir = tempfile::tempdir().unwrap();
            let mut page = MockPage::light_dom();
            let mut target = target("vanilla");
            target.input_selectors = SelectorSet::from(SelectorChain::single("#nope"));
            target.timeout = Duration::from_millis(50);

            run_target(&mut page, &target, &options(dir.path()).with_trace(false))
                .await
                .unwrap_err();
            assert!(!page.calls().iter().any(|call| call.ends_with("_trace")));
        }

        #[tokio::test]
        async fn test_input_handle_released_after_click() {
            let dir = tempfile::tempdir().unwrap();
            let mut page = MockPage::light_dom();
            page.add_item("already there");
            run_target(&mut page, &target("vanilla"), &options(dir.path()))
                .await
                .unwrap();
            assert_eq!(page.input().releases(), 1);
        }

        #[tokio::test]
        async fn test_existing_items_raise_the_baseline() {
            let dir = tempfile::tempdir().unwrap();
            let mut page = MockPage::light_dom();
            page.add_item("already there");
            let report = run_target(&mut page, &target("vanilla"), &options(dir.path()))
                .await
                .unwrap();
            assert_eq!(report.items, 4);
        }
    }

    #[test]
    fn test_summary_lists_outputs() {
        let report = TargetReport {
            target: "lit".to_string(),
            words_typed: 2,
            items: 2,
            elapsed: Duration::from_millis(1500),
            trace_path: Some(PathBuf::from("out/lit.json")),
            pdf_path: None,
        };
        let line = report.summary();
        assert!(line.starts_with("lit: 2 word(s)"));
        assert!(line.contains("out/lit.json"));
        assert!(!line.contains(".pdf"));
    }
}
