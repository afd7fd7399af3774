//! [`SearchContext`] and [`ElementHandle`] over the Chrome `DevTools` Protocol.
//!
//! The document, shadow roots and elements are all `Runtime` remote objects.
//! Each query is a single `Runtime.callFunctionOn` against the previous
//! object, so a chain never leaves the page between steps.
//!
//! Remote objects live until released. `find_all` puts its matches in a
//! fresh object group so a whole result set can be dropped with one
//! `Runtime.releaseObjectGroup`.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chromiumoxide::cdp::js_protocol::runtime::{
    CallArgument, CallFunctionOnParams, EvaluateParams, ExceptionDetails, GetPropertiesParams,
    ReleaseObjectGroupParams, ReleaseObjectParams, RemoteObject, RemoteObjectId,
};
use chromiumoxide::Page;
use serde_json::Value;
use tracing::debug;

use crate::driver::{ElementHandle, SearchContext};
use crate::result::{TypebenchError, TypebenchResult};

const QUERY_SELECTOR_JS: &str = "function(selector) { return this.querySelector(selector); }";

const QUERY_SELECTOR_ALL_JS: &str =
    "function(selector) { return Array.from(this.querySelectorAll(selector)); }";

const SHADOW_ROOT_OR_SELF_JS: &str = "function() { return this.shadowRoot || this; }";

const CONTENT_DOCUMENT_JS: &str = "function() { return this.contentDocument || null; }";

const IS_CONNECTED_JS: &str = "function() { return this.isConnected; }";

const IS_VISIBLE_JS: &str = "function() {
    if (!this.isConnected) { return false; }
    const style = window.getComputedStyle(this);
    const rect = this.getBoundingClientRect();
    return !!style && style.visibility !== 'hidden' && rect.width > 0 && rect.height > 0;
}";

const IS_INTERSECTING_VIEWPORT_JS: &str = "function(threshold) {
    return new Promise(resolve => {
        const observer = new IntersectionObserver(entries => {
            const ratio = entries[0].intersectionRatio;
            observer.disconnect();
            resolve(threshold === 1 ? ratio === 1 : ratio > threshold);
        });
        observer.observe(this);
    });
}";

/// A remote object selectors run against: a document or a shadow root (or an
/// element standing in for one).
#[derive(Debug, Clone)]
pub struct CdpContext {
    page: Page,
    object_id: RemoteObjectId,
    // false for the document and for elements standing in as their own scope
    owned: bool,
}

impl CdpContext {
    /// The page's main document
    ///
    /// # Errors
    ///
    /// Returns error if the page cannot evaluate `document`
    pub async fn document(page: &Page) -> TypebenchResult<Self> {
        let returns = page
            .execute(EvaluateParams::new("document"))
            .await
            .map_err(page_error)?
            .result;
        check_exception(returns.exception_details.as_ref())?;
        let object_id = returns
            .result
            .object_id
            .ok_or_else(|| TypebenchError::EvaluationError {
                message: "document is not a remote object".to_string(),
            })?;
        Ok(Self {
            page: page.clone(),
            object_id,
            owned: false,
        })
    }

    /// Page this context belongs to
    #[must_use]
    pub const fn page(&self) -> &Page {
        &self.page
    }
}

#[async_trait]
impl SearchContext for CdpContext {
    type Element = CdpElement;

    async fn find_first(&self, selector: &str) -> TypebenchResult<Option<CdpElement>> {
        let remote = call_function(
            &self.page,
            &self.object_id,
            QUERY_SELECTOR_JS,
            vec![Value::from(selector)],
            false,
            None,
        )
        .await?;
        Ok(CdpElement::from_remote(&self.page, remote, None))
    }

    async fn find_all(&self, selector: &str) -> TypebenchResult<Vec<CdpElement>> {
        let group = next_object_group();
        let array = call_function(
            &self.page,
            &self.object_id,
            QUERY_SELECTOR_ALL_JS,
            vec![Value::from(selector)],
            false,
            Some(&group),
        )
        .await?;
        let Some(array_id) = array.object_id else {
            return Ok(Vec::new());
        };

        let collected = collect_array(&self.page, &array_id, &group).await;
        if collected.is_err() {
            release_object_group(&self.page, &group).await;
        } else {
            // The elements are separate remote objects and survive this.
            release_object(&self.page, array_id).await;
        }
        collected
    }

    async fn release(self) {
        if self.owned {
            release_object(&self.page, self.object_id).await;
        }
    }
}

/// Object group shared by the elements of one `find_all`
#[derive(Debug)]
struct QueryGroup {
    name: String,
    size: usize,
}

fn next_object_group() -> String {
    static NEXT: AtomicU64 = AtomicU64::new(1);
    format!("typebench-query-{}", NEXT.fetch_add(1, Ordering::Relaxed))
}

/// Array elements in index order, fetched with one `Runtime.getProperties`.
/// Property values are wrapped in the array's object group.
async fn collect_array(
    page: &Page,
    array_id: &RemoteObjectId,
    group: &str,
) -> TypebenchResult<Vec<CdpElement>> {
    let mut params = GetPropertiesParams::new(array_id.clone());
    params.own_properties = Some(true);
    let returns = page.execute(params).await.map_err(page_error)?.result;
    check_exception(returns.exception_details.as_ref())?;

    let mut indexed: Vec<(usize, RemoteObject)> = returns
        .result
        .into_iter()
        .filter_map(|property| Some((property.name.parse().ok()?, property.value?)))
        .collect();
    indexed.sort_by_key(|(index, _)| *index);

    let group = Arc::new(QueryGroup {
        name: group.to_string(),
        size: indexed.iter().filter(|(_, remote)| remote.object_id.is_some()).count(),
    });
    Ok(indexed
        .into_iter()
        .filter_map(|(_, remote)| CdpElement::from_remote(page, remote, Some(Arc::clone(&group))))
        .collect())
}

/// A DOM element held as a remote object
#[derive(Debug, Clone)]
pub struct CdpElement {
    page: Page,
    object_id: RemoteObjectId,
    description: String,
    group: Option<Arc<QueryGroup>>,
}

impl CdpElement {
    fn from_remote(
        page: &Page,
        remote: RemoteObject,
        group: Option<Arc<QueryGroup>>,
    ) -> Option<Self> {
        let object_id = remote.object_id?;
        Some(Self {
            page: page.clone(),
            object_id,
            description: remote.description.unwrap_or_else(|| "element".to_string()),
            group,
        })
    }

    /// Remote object id of the element
    #[must_use]
    pub const fn object_id(&self) -> &RemoteObjectId {
        &self.object_id
    }

    /// Document of a same-origin `<iframe>`, or `None` if the element has no
    /// accessible content document
    ///
    /// # Errors
    ///
    /// Returns error if the page call fails
    pub async fn content_frame(&self) -> TypebenchResult<Option<CdpContext>> {
        let remote = call_function(
            &self.page,
            &self.object_id,
            CONTENT_DOCUMENT_JS,
            Vec::new(),
            false,
            None,
        )
        .await?;
        Ok(remote.object_id.map(|object_id| CdpContext {
            page: self.page.clone(),
            object_id,
            owned: true,
        }))
    }

    async fn call_bool(&self, declaration: &str, args: Vec<Value>) -> TypebenchResult<bool> {
        let remote =
            call_function(&self.page, &self.object_id, declaration, args, true, None).await?;
        Ok(remote.value.and_then(|v| v.as_bool()).unwrap_or(false))
    }
}

#[async_trait]
impl ElementHandle for CdpElement {
    type Context = CdpContext;

    async fn shadow_root_or_self(&self) -> TypebenchResult<CdpContext> {
        let remote = call_function(
            &self.page,
            &self.object_id,
            SHADOW_ROOT_OR_SELF_JS,
            Vec::new(),
            false,
            None,
        )
        .await?;
        Ok(match remote.object_id {
            Some(object_id) => CdpContext {
                page: self.page.clone(),
                object_id,
                owned: true,
            },
            None => CdpContext {
                page: self.page.clone(),
                object_id: self.object_id.clone(),
                owned: false,
            },
        })
    }

    async fn is_connected(&self) -> TypebenchResult<bool> {
        self.call_bool(IS_CONNECTED_JS, Vec::new()).await
    }

    async fn is_visible(&self) -> TypebenchResult<bool> {
        self.call_bool(IS_VISIBLE_JS, Vec::new()).await
    }

    async fn is_intersecting_viewport(&self, threshold: f64) -> TypebenchResult<bool> {
        self.call_bool(IS_INTERSECTING_VIEWPORT_JS, vec![Value::from(threshold)])
            .await
    }

    async fn evaluate(&self, function_declaration: &str) -> TypebenchResult<Value> {
        let remote = call_function(
            &self.page,
            &self.object_id,
            function_declaration,
            Vec::new(),
            true,
            None,
        )
        .await?;
        Ok(remote.value.unwrap_or(Value::Null))
    }

    fn describe(&self) -> String {
        self.description.clone()
    }

    async fn release(self) {
        release_object(&self.page, self.object_id).await;
    }

    /// Complete `find_all` result sets go with one `releaseObjectGroup`;
    /// anything else is released object by object.
    async fn release_all(handles: Vec<Self>) {
        let mut groups: Vec<(Arc<QueryGroup>, Vec<Self>)> = Vec::new();
        let mut singles = Vec::new();
        for handle in handles {
            let Some(group) = handle.group.clone() else {
                singles.push(handle);
                continue;
            };
            match groups.iter_mut().find(|(g, _)| Arc::ptr_eq(g, &group)) {
                Some((_, members)) => members.push(handle),
                None => groups.push((group, vec![handle])),
            }
        }
        for (group, members) in groups {
            if members.len() == group.size {
                release_object_group(&members[0].page, &group.name).await;
            } else {
                singles.extend(members);
            }
        }
        for handle in singles {
            handle.release().await;
        }
    }
}

/// `Runtime.callFunctionOn` with `this` bound to `object_id`.
///
/// Promises are awaited. With `by_value` the result is serialized into
/// `RemoteObject::value`; otherwise it stays a remote object (`object_id` is
/// `None` for `null` and primitives) in `object_group`, or the default group.
async fn call_function(
    page: &Page,
    object_id: &RemoteObjectId,
    declaration: &str,
    args: Vec<Value>,
    by_value: bool,
    object_group: Option<&str>,
) -> TypebenchResult<RemoteObject> {
    let mut params = CallFunctionOnParams::new(declaration);
    params.object_id = Some(object_id.clone());
    params.arguments = Some(
        args.into_iter()
            .map(|value| CallArgument {
                value: Some(value),
                unserializable_value: None,
                object_id: None,
            })
            .collect(),
    );
    params.return_by_value = Some(by_value);
    params.await_promise = Some(true);
    params.object_group = object_group.map(str::to_string);

    let returns = page.execute(params).await.map_err(page_error)?.result;
    check_exception(returns.exception_details.as_ref())?;
    Ok(returns.result)
}

async fn release_object(page: &Page, object_id: RemoteObjectId) {
    if let Err(err) = page.execute(ReleaseObjectParams::new(object_id)).await {
        debug!(error = %err, "Runtime.releaseObject failed");
    }
}

async fn release_object_group(page: &Page, name: &str) {
    if let Err(err) = page.execute(ReleaseObjectGroupParams::new(name)).await {
        debug!(group = name, error = %err, "Runtime.releaseObjectGroup failed");
    }
}

fn check_exception(details: Option<&ExceptionDetails>) -> TypebenchResult<()> {
    match details {
        None => Ok(()),
        Some(details) => Err(TypebenchError::EvaluationError {
            message: details
                .exception
                .as_ref()
                .and_then(|e| e.description.clone())
                .unwrap_or_else(|| details.text.clone()),
        }),
    }
}

fn page_error(err: chromiumoxide::error::CdpError) -> TypebenchError {
    TypebenchError::PageError {
        message: err.to_string(),
    }
}
