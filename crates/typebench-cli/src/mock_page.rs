//! In-memory [`BenchPage`] over the library's mock DOM.
//!
//! Typing fills a buffer; pressing Enter turns the buffer into an `<li>` in
//! `ul.todo-list`, like a to-do app's submit handler.

use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use typebench::{ElementHandle, MockDom, MockNode, TypebenchError, TypebenchResult, Viewport};
use url::Url;

use crate::bench::{BenchPage, SUBMIT_KEY};

#[derive(Debug, Default)]
struct PageState {
    buffer: String,
    calls: Vec<String>,
    tracing: bool,
}

/// Scripted page that records every call
#[derive(Debug)]
pub struct MockPage {
    dom: MockDom,
    input: MockNode,
    list: MockNode,
    state: Mutex<PageState>,
    drop_submissions: bool,
}

impl MockPage {
    /// Bytes returned by [`BenchPage::pdf`]
    pub const PDF_BYTES: &'static [u8] = b"%PDF-1.7 mock";

    /// Input and list directly in the document
    #[must_use]
    pub fn light_dom() -> Self {
        let input = MockNode::new("input").with_class("new-todo");
        let list = MockNode::new("ul").with_class("todo-list");
        let dom = MockDom::new().with(input.clone()).with(list.clone());
        Self::from_parts(dom, input, list)
    }

    /// Input and list inside `<todo-app>`'s shadow root
    #[must_use]
    pub fn shadow_dom() -> Self {
        let input = MockNode::new("input").with_class("new-todo");
        let list = MockNode::new("ul").with_class("todo-list");
        let dom = MockDom::new().with(
            MockNode::new("todo-app")
                .with_shadow_child(input.clone())
                .with_shadow_child(list.clone()),
        );
        Self::from_parts(dom, input, list)
    }

    fn from_parts(dom: MockDom, input: MockNode, list: MockNode) -> Self {
        Self {
            dom,
            input,
            list,
            state: Mutex::new(PageState::default()),
            drop_submissions: false,
        }
    }

    /// Ignore Enter, so items never appear
    #[must_use]
    pub fn dropping_submissions(mut self) -> Self {
        self.drop_submissions = true;
        self
    }

    /// The to-do input
    #[must_use]
    pub const fn input(&self) -> &MockNode {
        &self.input
    }

    /// Add an item without typing
    pub fn add_item(&self, text: &str) {
        self.list.append_child(MockNode::new("li").with_text(text));
    }

    /// Texts of the list items in order
    #[must_use]
    pub fn item_texts(&self) -> Vec<String> {
        self.list.children().iter().map(MockNode::text).collect()
    }

    /// Calls received so far
    #[must_use]
    pub fn calls(&self) -> Vec<String> {
        self.lock().calls.clone()
    }

    /// Whether a trace is being recorded
    #[must_use]
    pub fn is_tracing(&self) -> bool {
        self.lock().tracing
    }

    fn lock(&self) -> MutexGuard<'_, PageState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn record(&self, call: String) {
        self.lock().calls.push(call);
    }
}

#[async_trait]
impl BenchPage for MockPage {
    type Context = MockDom;

    async fn set_viewport(&self, viewport: Viewport) -> TypebenchResult<()> {
        self.record(format!("viewport {}x{}", viewport.width, viewport.height));
        Ok(())
    }

    async fn navigate(&self, url: &Url) -> TypebenchResult<()> {
        self.record(format!("navigate {url}"));
        Ok(())
    }

    async fn document(&self) -> TypebenchResult<MockDom> {
        Ok(self.dom.clone())
    }

    async fn click(&self, element: &MockNode) -> TypebenchResult<()> {
        self.record(format!("click {}", element.describe()));
        Ok(())
    }

    async fn type_text(&self, text: &str) -> TypebenchResult<()> {
        let mut state = self.lock();
        state.buffer.push_str(text);
        state.calls.push(format!("type {text}"));
        Ok(())
    }

    async fn press_key(&self, key: &str) -> TypebenchResult<()> {
        let submitted = {
            let mut state = self.lock();
            state.calls.push(format!("key {key}"));
            if key != SUBMIT_KEY {
                return Err(TypebenchError::InputError {
                    message: format!("unsupported key {key}"),
                });
            }
            std::mem::take(&mut state.buffer)
        };
        if !self.drop_submissions {
            self.add_item(&submitted);
        }
        Ok(())
    }

    async fn start_trace(&mut self) -> TypebenchResult<()> {
        let mut state = self.lock();
        state.tracing = true;
        state.calls.push("start_trace".to_string());
        Ok(())
    }

    async fn stop_trace(&mut self) -> TypebenchResult<Vec<serde_json::Value>> {
        let mut state = self.lock();
        if !std::mem::replace(&mut state.tracing, false) {
            return Err(TypebenchError::TraceError {
                message: "tracing was not started".to_string(),
            });
        }
        state.calls.push("stop_trace".to_string());
        Ok(vec![serde_json::json!({ "name": "RunTask", "ph": "X", "ts": 0 })])
    }

    async fn pdf(&self) -> TypebenchResult<Vec<u8>> {
        self.record("pdf".to_string());
        Ok(Self::PDF_BYTES.to_vec())
    }

    async fn close(&mut self) -> TypebenchResult<()> {
        self.record("close".to_string());
        Ok(())
    }
}
