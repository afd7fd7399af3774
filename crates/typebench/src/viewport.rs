//! Connectedness and viewport waits for a located element.

use std::time::Duration;

use tracing::debug;

use crate::driver::{ElementHandle, VIEWPORT_THRESHOLD_ANY};
use crate::result::TypebenchResult;
use crate::wait::{wait_for_function_with, WaitOptions, WaitResult};

/// Wait until `element` is attached to the live document.
pub async fn wait_for_connected<E: ElementHandle>(
    element: &E,
    timeout: Duration,
) -> TypebenchResult<WaitResult> {
    wait_for_function_with(
        || element.is_connected(),
        &WaitOptions::from(timeout),
        "element connected",
    )
    .await
}

/// Wait until any part of `element` intersects the viewport.
pub async fn wait_for_in_viewport<E: ElementHandle>(
    element: &E,
    timeout: Duration,
) -> TypebenchResult<WaitResult> {
    wait_for_function_with(
        || element.is_intersecting_viewport(VIEWPORT_THRESHOLD_ANY),
        &WaitOptions::from(timeout),
        "element in viewport",
    )
    .await
}

/// Bring `element` into view unless it already is.
///
/// Waits for the element to be connected, then checks the viewport once. If
/// it is already visible nothing else happens; otherwise a centered
/// scroll is requested and the element is awaited in the viewport. Returns
/// whether a scroll was requested.
pub async fn scroll_into_view_if_needed<E: ElementHandle>(
    element: &E,
    timeout: Duration,
) -> TypebenchResult<bool> {
    wait_for_connected(element, timeout).await?;
    if element
        .is_intersecting_viewport(VIEWPORT_THRESHOLD_ANY)
        .await?
    {
        return Ok(false);
    }
    debug!(element = %element.describe(), "scrolling element into view");
    element.scroll_into_view_centered().await?;
    wait_for_in_viewport(element, timeout).await?;
    Ok(true)
}
