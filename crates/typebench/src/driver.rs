//! Host capabilities the resolver is written against.
//!
//! The resolver never talks to a browser directly. It needs a place to search
//! ([`SearchContext`]) and something it found ([`ElementHandle`]); the CDP
//! backend and the in-memory mock DOM both provide these.
//!
//! ```text
//! SearchContext ──find_first/find_all──► ElementHandle
//!       ▲                                      │
//!       └──────── shadow_root_or_self ─────────┘
//! ```
//!
//! Handles may pin objects in the host (remote object ids over CDP). The
//! resolver calls `release` on every handle and scope it creates but does not
//! hand back, so polling does not grow the page's object table.

use async_trait::async_trait;

use crate::result::TypebenchResult;

/// Zero threshold: any intersecting pixel counts as in the viewport
pub const VIEWPORT_THRESHOLD_ANY: f64 = 0.0;

/// In-page function that scrolls `this` to the center of the viewport
pub const SCROLL_INTO_VIEW_CENTER_JS: &str = "function() { \
    this.scrollIntoView({ block: 'center', inline: 'center', behavior: 'auto' }); \
}";

/// A scope that selectors are evaluated in: a document, a frame, or the
/// shadow-root-or-self of an element.
#[async_trait]
pub trait SearchContext: Send + Sync + Sized {
    /// Handle type produced by queries in this context
    type Element: ElementHandle;

    /// First element matching `selector`, in document order
    async fn find_first(&self, selector: &str) -> TypebenchResult<Option<Self::Element>>;

    /// All elements matching `selector`, in document order
    async fn find_all(&self, selector: &str) -> TypebenchResult<Vec<Self::Element>>;

    /// Drop the host object behind a scope from
    /// [`ElementHandle::shadow_root_or_self`]. Elements found in it stay valid.
    async fn release(self) {}
}

/// A located DOM node, valid for the lifetime of the page that produced it.
#[async_trait]
pub trait ElementHandle: Clone + Send + Sync + Sized + 'static {
    /// Context type used for searches scoped under this element
    type Context: SearchContext<Element = Self>;

    /// The element's shadow root if it has one, otherwise the element itself
    async fn shadow_root_or_self(&self) -> TypebenchResult<Self::Context>;

    /// Whether the node is attached to the live document
    async fn is_connected(&self) -> TypebenchResult<bool>;

    /// Whether the node is rendered with a non-empty box and not hidden
    async fn is_visible(&self) -> TypebenchResult<bool>;

    /// Whether at least `threshold` of the element intersects the viewport
    async fn is_intersecting_viewport(&self, threshold: f64) -> TypebenchResult<bool>;

    /// Call `function_declaration` in the page with `this` bound to the element
    async fn evaluate(&self, function_declaration: &str) -> TypebenchResult<serde_json::Value>;

    /// Ask the host to scroll the element to the center of the viewport
    async fn scroll_into_view_centered(&self) -> TypebenchResult<()> {
        self.evaluate(SCROLL_INTO_VIEW_CENTER_JS).await.map(|_| ())
    }

    /// Short human-readable description for logs
    fn describe(&self) -> String;

    /// Drop the host object behind this handle. Clones share it, so none of
    /// them may be used afterwards. Failures are logged, not returned.
    async fn release(self) {}

    /// Release the results of a query together
    async fn release_all(handles: Vec<Self>) {
        for handle in handles {
            handle.release().await;
        }
    }
}
