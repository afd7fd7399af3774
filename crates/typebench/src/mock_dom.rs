//! In-memory DOM for exercising the resolver without a browser.
//!
//! Nodes carry a tag, id, classes, attributes, text, light children and an
//! optional shadow root. Connectedness, visibility and viewport intersection
//! are plain flags that tests flip, from other tasks if needed, to simulate a
//! page rendering over time.
//!
//! Supported selectors are compound selectors (`input`, `#id`, `.class`,
//! `[attr]`, `[attr=value]`, `*` and combinations) joined by the descendant
//! combinator. Queries never descend into shadow roots, like `querySelector`.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use crate::driver::{ElementHandle, SearchContext};
use crate::result::{TypebenchError, TypebenchResult};

#[derive(Debug)]
struct NodeData {
    tag: String,
    id: Option<String>,
    classes: Vec<String>,
    attributes: Vec<(String, String)>,
    text: String,
    children: Vec<MockNode>,
    shadow_root: Option<Vec<MockNode>>,
    connected: bool,
    visible: bool,
    in_viewport: bool,
    scroll_brings_into_view: bool,
    scroll_requests: u32,
    evaluations: Vec<String>,
    releases: u32,
    scope_releases: u32,
}

/// A node in the mock DOM. Cloning shares the node.
#[derive(Debug, Clone)]
pub struct MockNode(Arc<Mutex<NodeData>>);

impl MockNode {
    /// Create a connected, visible, in-viewport element
    #[must_use]
    pub fn new(tag: impl Into<String>) -> Self {
        Self(Arc::new(Mutex::new(NodeData {
            tag: tag.into().to_ascii_lowercase(),
            id: None,
            classes: Vec::new(),
            attributes: Vec::new(),
            text: String::new(),
            children: Vec::new(),
            shadow_root: None,
            connected: true,
            visible: true,
            in_viewport: true,
            scroll_brings_into_view: true,
            scroll_requests: 0,
            evaluations: Vec::new(),
            releases: 0,
            scope_releases: 0,
        })))
    }

    fn lock(&self) -> MutexGuard<'_, NodeData> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Set the `id` attribute
    #[must_use]
    pub fn with_id(self, id: impl Into<String>) -> Self {
        self.lock().id = Some(id.into());
        self
    }

    /// Add a class
    #[must_use]
    pub fn with_class(self, class: impl Into<String>) -> Self {
        self.lock().classes.push(class.into());
        self
    }

    /// Add an attribute
    #[must_use]
    pub fn with_attr(self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.lock().attributes.push((name.into(), value.into()));
        self
    }

    /// Set text content
    #[must_use]
    pub fn with_text(self, text: impl Into<String>) -> Self {
        self.lock().text = text.into();
        self
    }

    /// Append a light-DOM child
    #[must_use]
    pub fn with_child(self, child: Self) -> Self {
        self.append_child(child);
        self
    }

    /// Attach a shadow root (if missing) and append `child` to it
    #[must_use]
    pub fn with_shadow_child(self, child: Self) -> Self {
        self.append_shadow_child(child);
        self
    }

    /// Attach an empty shadow root
    #[must_use]
    pub fn with_shadow_root(self) -> Self {
        self.lock().shadow_root.get_or_insert_with(Vec::new);
        self
    }

    /// Mark the element as not rendered
    #[must_use]
    pub fn hidden(self) -> Self {
        self.set_visible(false);
        self
    }

    /// Place the element outside the viewport
    #[must_use]
    pub fn out_of_viewport(self) -> Self {
        self.set_in_viewport(false);
        self
    }

    /// Make scroll requests leave the element outside the viewport
    #[must_use]
    pub fn unscrollable(self) -> Self {
        self.lock().scroll_brings_into_view = false;
        self
    }

    /// Append a light-DOM child
    pub fn append_child(&self, child: Self) {
        self.lock().children.push(child);
    }

    /// Append to the shadow root, attaching one first if needed
    pub fn append_shadow_child(&self, child: Self) {
        self.lock()
            .shadow_root
            .get_or_insert_with(Vec::new)
            .push(child);
    }

    /// Remove a light-DOM child and mark its subtree disconnected
    pub fn remove_child(&self, child: &Self) -> bool {
        let removed = {
            let mut data = self.lock();
            let before = data.children.len();
            data.children.retain(|c| !c.same_node(child));
            before != data.children.len()
        };
        if removed {
            child.set_connected_recursive(false);
        }
        removed
    }

    fn set_connected_recursive(&self, connected: bool) {
        let (children, shadow) = {
            let mut data = self.lock();
            data.connected = connected;
            (data.children.clone(), data.shadow_root.clone().unwrap_or_default())
        };
        for node in children.iter().chain(shadow.iter()) {
            node.set_connected_recursive(connected);
        }
    }

    /// Toggle visibility
    pub fn set_visible(&self, visible: bool) {
        self.lock().visible = visible;
    }

    /// Toggle viewport intersection
    pub fn set_in_viewport(&self, in_viewport: bool) {
        self.lock().in_viewport = in_viewport;
    }

    /// Toggle connectedness of this node only
    pub fn set_connected(&self, connected: bool) {
        self.lock().connected = connected;
    }

    /// Whether two handles refer to the same node
    #[must_use]
    pub fn same_node(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    /// Tag name (lowercase)
    #[must_use]
    pub fn tag(&self) -> String {
        self.lock().tag.clone()
    }

    /// Value of the `id` attribute
    #[must_use]
    pub fn id(&self) -> Option<String> {
        self.lock().id.clone()
    }

    /// Text content
    #[must_use]
    pub fn text(&self) -> String {
        self.lock().text.clone()
    }

    /// Whether the node has a shadow root attached
    #[must_use]
    pub fn has_shadow_root(&self) -> bool {
        self.lock().shadow_root.is_some()
    }

    /// Number of scroll-into-view requests received
    #[must_use]
    pub fn scroll_requests(&self) -> u32 {
        self.lock().scroll_requests
    }

    /// Function declarations evaluated against this node
    #[must_use]
    pub fn evaluations(&self) -> Vec<String> {
        self.lock().evaluations.clone()
    }

    /// Times a handle to this node was released
    #[must_use]
    pub fn releases(&self) -> u32 {
        self.lock().releases
    }

    /// Times a search scope rooted at this node was released
    #[must_use]
    pub fn scope_releases(&self) -> u32 {
        self.lock().scope_releases
    }

    /// Light-DOM children
    #[must_use]
    pub fn children(&self) -> Vec<Self> {
        self.lock().children.clone()
    }

    /// Shadow-root children, empty without a shadow root
    #[must_use]
    pub fn shadow_children(&self) -> Vec<Self> {
        self.lock().shadow_root.clone().unwrap_or_default()
    }

    fn matches(&self, compound: &Compound) -> bool {
        let data = self.lock();
        if let Some(ref tag) = compound.tag {
            if &data.tag != tag {
                return false;
            }
        }
        if let Some(ref id) = compound.id {
            if data.id.as_ref() != Some(id) {
                return false;
            }
        }
        if !compound
            .classes
            .iter()
            .all(|class| data.classes.contains(class))
        {
            return false;
        }
        compound.attributes.iter().all(|(name, expected)| {
            let actual = match name.as_str() {
                "id" => data.id.clone(),
                "class" => (!data.classes.is_empty()).then(|| data.classes.join(" ")),
                _ => data
                    .attributes
                    .iter()
                    .find(|(n, _)| n == name)
                    .map(|(_, v)| v.clone()),
            };
            match (actual, expected) {
                (Some(actual), Some(expected)) => &actual == expected,
                (Some(_), None) => true,
                (None, _) => false,
            }
        })
    }
}

/// Search scope inside the mock DOM
#[derive(Debug, Clone)]
pub enum MockScope {
    /// Descendants of a node, excluding the node itself
    Subtree(MockNode),
    /// Contents of a node's shadow root
    ShadowRoot(MockNode),
}

impl MockScope {
    fn query(&self, selector: &str, first_only: bool) -> TypebenchResult<Vec<MockNode>> {
        let compiled = parse_selector(selector)?;
        let (roots, mut ancestors) = match self {
            Self::Subtree(node) => (node.children(), vec![node.clone()]),
            Self::ShadowRoot(host) => (host.shadow_children(), Vec::new()),
        };
        let mut out = Vec::new();
        collect(&roots, &mut ancestors, &compiled, first_only, &mut out);
        Ok(out)
    }
}

#[async_trait]
impl SearchContext for MockScope {
    type Element = MockNode;

    async fn find_first(&self, selector: &str) -> TypebenchResult<Option<MockNode>> {
        Ok(self.query(selector, true)?.into_iter().next())
    }

    async fn find_all(&self, selector: &str) -> TypebenchResult<Vec<MockNode>> {
        self.query(selector, false)
    }

    async fn release(self) {
        let (Self::Subtree(node) | Self::ShadowRoot(node)) = self;
        node.lock().scope_releases += 1;
    }
}

#[async_trait]
impl ElementHandle for MockNode {
    type Context = MockScope;

    async fn shadow_root_or_self(&self) -> TypebenchResult<MockScope> {
        Ok(if self.has_shadow_root() {
            MockScope::ShadowRoot(self.clone())
        } else {
            MockScope::Subtree(self.clone())
        })
    }

    async fn is_connected(&self) -> TypebenchResult<bool> {
        Ok(self.lock().connected)
    }

    async fn is_visible(&self) -> TypebenchResult<bool> {
        let data = self.lock();
        Ok(data.connected && data.visible)
    }

    async fn is_intersecting_viewport(&self, _threshold: f64) -> TypebenchResult<bool> {
        let data = self.lock();
        Ok(data.connected && data.visible && data.in_viewport)
    }

    async fn evaluate(&self, function_declaration: &str) -> TypebenchResult<serde_json::Value> {
        let mut data = self.lock();
        data.evaluations.push(function_declaration.to_string());
        if function_declaration.contains("scrollIntoView") {
            data.scroll_requests += 1;
            if data.scroll_brings_into_view {
                data.in_viewport = true;
            }
        }
        Ok(serde_json::Value::Null)
    }

    fn describe(&self) -> String {
        let data = self.lock();
        let mut out = format!("<{}", data.tag);
        if let Some(ref id) = data.id {
            out.push('#');
            out.push_str(id);
        }
        for class in &data.classes {
            out.push('.');
            out.push_str(class);
        }
        out.push('>');
        out
    }

    async fn release(self) {
        self.lock().releases += 1;
    }
}

/// A whole mock document
#[derive(Debug, Clone)]
pub struct MockDom {
    document: MockNode,
    queries: Arc<AtomicUsize>,
}

impl Default for MockDom {
    fn default() -> Self {
        Self::new()
    }
}

impl MockDom {
    /// Create an empty document
    #[must_use]
    pub fn new() -> Self {
        Self {
            document: MockNode::new("#document"),
            queries: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Append a top-level node
    #[must_use]
    pub fn with(self, node: MockNode) -> Self {
        self.document.append_child(node);
        self
    }

    /// Append a top-level node
    pub fn append(&self, node: MockNode) {
        self.document.append_child(node);
    }

    /// Remove a top-level node
    pub fn remove(&self, node: &MockNode) -> bool {
        self.document.remove_child(node)
    }

    /// Number of document-level queries served so far
    #[must_use]
    pub fn query_count(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }

    fn scope(&self) -> MockScope {
        MockScope::Subtree(self.document.clone())
    }
}

#[async_trait]
impl SearchContext for MockDom {
    type Element = MockNode;

    async fn find_first(&self, selector: &str) -> TypebenchResult<Option<MockNode>> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        self.scope().find_first(selector).await
    }

    async fn find_all(&self, selector: &str) -> TypebenchResult<Vec<MockNode>> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        self.scope().find_all(selector).await
    }
}

// =============================================================================
// SELECTOR MATCHING
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Compound {
    tag: Option<String>,
    id: Option<String>,
    classes: Vec<String>,
    attributes: Vec<(String, Option<String>)>,
}

fn collect(
    nodes: &[MockNode],
    ancestors: &mut Vec<MockNode>,
    selector: &[Compound],
    first_only: bool,
    out: &mut Vec<MockNode>,
) {
    for node in nodes {
        if first_only && !out.is_empty() {
            return;
        }
        if matches_with_ancestors(node, ancestors, selector) {
            out.push(node.clone());
        }
        ancestors.push(node.clone());
        collect(&node.children(), ancestors, selector, first_only, out);
        ancestors.pop();
    }
}

fn matches_with_ancestors(node: &MockNode, ancestors: &[MockNode], selector: &[Compound]) -> bool {
    let Some((last, rest)) = selector.split_last() else {
        return false;
    };
    if !node.matches(last) {
        return false;
    }
    let mut remaining = rest.iter().rev().peekable();
    for ancestor in ancestors.iter().rev() {
        match remaining.peek() {
            Some(compound) if ancestor.matches(compound) => {
                remaining.next();
            }
            Some(_) => {}
            None => break,
        }
    }
    remaining.peek().is_none()
}

fn invalid_selector(selector: &str) -> TypebenchError {
    TypebenchError::EvaluationError {
        message: format!("'{selector}' is not a valid selector"),
    }
}

fn is_ident(s: &str) -> bool {
    !s.is_empty()
        && s
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

fn parse_selector(selector: &str) -> TypebenchResult<Vec<Compound>> {
    let parts: Vec<&str> = selector.split_whitespace().collect();
    if parts.is_empty() {
        return Err(invalid_selector(selector));
    }
    parts
        .into_iter()
        .map(|part| parse_compound(part).ok_or_else(|| invalid_selector(selector)))
        .collect()
}

fn parse_compound(src: &str) -> Option<Compound> {
    let is_delimiter = |c: char| matches!(c, '#' | '.' | '[');
    let mut compound = Compound::default();

    let tag_end = src.find(is_delimiter).unwrap_or(src.len());
    let tag = &src[..tag_end];
    if !tag.is_empty() && tag != "*" {
        if !is_ident(tag) {
            return None;
        }
        compound.tag = Some(tag.to_ascii_lowercase());
    }

    let mut rest = &src[tag_end..];
    while let Some(first) = rest.chars().next() {
        match first {
            '#' | '.' => {
                let body = &rest[1..];
                let end = body.find(is_delimiter).unwrap_or(body.len());
                let name = &body[..end];
                if !is_ident(name) {
                    return None;
                }
                if first == '#' {
                    compound.id = Some(name.to_string());
                } else {
                    compound.classes.push(name.to_string());
                }
                rest = &body[end..];
            }
            '[' => {
                let close = rest.find(']')?;
                let inner = &rest[1..close];
                let (name, value) = match inner.split_once('=') {
                    Some((name, value)) => {
                        let value = value.trim().trim_matches(|c| c == '"' || c == '\'');
                        (name.trim(), Some(value.to_string()))
                    }
                    None => (inner.trim(), None),
                };
                if !is_ident(name) {
                    return None;
                }
                compound.attributes.push((name.to_string(), value));
                rest = &rest[close + 1..];
            }
            _ => return None,
        }
    }
    Some(compound)
}
