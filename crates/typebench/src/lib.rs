//! Typebench: element resolution and polling waits for browser benchmarks.
//!
//! The core finds elements through selector chains that cross shadow-DOM
//! boundaries and waits for page conditions with a fixed poll interval and a
//! wall-clock deadline. It is written against two small capability traits,
//! so the same code runs on a live Chromium page (feature `browser`) and on
//! the in-memory [`MockDom`].
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                       TYPEBENCH core                         │
//! ├──────────────────────────────────────────────────────────────┤
//! │  resolver ──────► wait_for_value / wait_for_function         │
//! │     │                         ▲                              │
//! │     ▼                         │                              │
//! │  SearchContext ◄──► ElementHandle ◄── viewport waits         │
//! │     │                     │                                  │
//! │     ├── CdpContext / CdpElement   (chromiumoxide)            │
//! │     └── MockDom / MockNode        (tests)                    │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```
//! use typebench::{wait_for_selector, MockDom, MockNode, ResolveOptions, SelectorChain};
//!
//! # tokio_test_block(async {
//! let dom = MockDom::new().with(
//!     MockNode::new("todo-app").with_shadow_child(MockNode::new("input").with_id("new-todo")),
//! );
//! let chain = SelectorChain::new(["todo-app", "#new-todo"]);
//! let input = wait_for_selector(&dom, &chain, &ResolveOptions::default()).await.unwrap();
//! assert_eq!(input.id().as_deref(), Some("new-todo"));
//! # });
//! # fn tokio_test_block(f: impl std::future::Future<Output = ()>) {
//! #     tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap().block_on(f);
//! # }
//! ```

#![warn(missing_docs)]
// Lints are configured in workspace Cargo.toml [workspace.lints.clippy]

mod browser;
#[cfg(feature = "browser")]
#[allow(clippy::missing_errors_doc)]
mod cdp;
mod config;
mod driver;
pub mod mock_dom;
mod resolver;
mod result;
mod selector;
mod viewport;
mod wait;

#[cfg(feature = "browser")]
pub use browser::Browser;
pub use browser::{BrowserConfig, DEFAULT_VIEWPORT_HEIGHT, DEFAULT_VIEWPORT_WIDTH};
#[cfg(feature = "browser")]
pub use cdp::{CdpContext, CdpElement};
pub use config::{Defaults, Target, TargetConfig, TargetEntry, Viewport};
pub use driver::{ElementHandle, SearchContext, SCROLL_INTO_VIEW_CENTER_JS, VIEWPORT_THRESHOLD_ANY};
pub use mock_dom::{MockDom, MockNode, MockScope};
pub use resolver::{
    query_selector_all, query_selectors_all, wait_for_element_count, wait_for_selector,
    wait_for_selectors,
};
pub use result::{TypebenchError, TypebenchResult};
pub use selector::{
    CountOperator, ResolveOptions, SelectorChain, SelectorSet, CHAIN_SEPARATOR,
    DEFAULT_RESOLVE_TIMEOUT_MS,
};
pub use viewport::{scroll_into_view_if_needed, wait_for_connected, wait_for_in_viewport};
pub use wait::{
    duration_ms, wait_for_function, wait_for_function_with, wait_for_value, WaitOptions,
    WaitResult, DEFAULT_POLL_INTERVAL_MS, DEFAULT_WAIT_TIMEOUT_MS,
};
