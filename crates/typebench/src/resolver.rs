//! Element resolution across shadow-DOM boundaries.
//!
//! - [`wait_for_selector`]: one chain to one element, waiting at every step
//! - [`wait_for_selectors`]: first chain of a set that resolves
//! - [`query_selector_all`] / [`query_selectors_all`]: every match, no waiting
//! - [`wait_for_element_count`]: poll a set's match count against a comparator

use std::time::Duration;

use tracing::{debug, warn};

use crate::driver::{ElementHandle, SearchContext};
use crate::result::{TypebenchError, TypebenchResult};
use crate::selector::{CountOperator, ResolveOptions, SelectorChain, SelectorSet};
use crate::wait::{duration_ms, wait_for_value, WaitOptions, DEFAULT_POLL_INTERVAL_MS};

/// Resolve `chain` to a single element, starting in `context`.
///
/// Every step waits up to `options.timeout` for an attached (and, if
/// `options.visible`, visible) match inside the shadow-root-or-self of the
/// previous step's element.
pub async fn wait_for_selector<C>(
    context: &C,
    chain: &SelectorChain,
    options: &ResolveOptions,
) -> TypebenchResult<C::Element>
where
    C: SearchContext,
{
    chain.ensure_not_empty()?;
    let (first, rest) = chain
        .steps()
        .split_first()
        .ok_or_else(|| TypebenchError::invalid_input("empty selector chain provided"))?;

    let mut element = wait_for_step(context, first, chain, options).await?;
    for step in rest {
        let scope = match element.shadow_root_or_self().await {
            Ok(scope) => scope,
            Err(err) => {
                element.release().await;
                return Err(err);
            }
        };
        let next = wait_for_step(&scope, step, chain, options).await;
        scope.release().await;
        element.release().await;
        element = next?;
    }
    debug!(chain = %chain, element = %element.describe(), "resolved selector chain");
    Ok(element)
}

async fn wait_for_step<S>(
    context: &S,
    selector: &str,
    chain: &SelectorChain,
    options: &ResolveOptions,
) -> TypebenchResult<S::Element>
where
    S: SearchContext,
{
    let wait = WaitOptions::new()
        .with_timeout(duration_ms(options.timeout))
        .with_poll_interval(duration_ms(options.poll_interval));
    let visible = options.visible;

    let probe = || async move {
        let Some(element) = context.find_first(selector).await? else {
            return Ok(None);
        };
        if visible && !element.is_visible().await? {
            element.release().await;
            return Ok(None);
        }
        Ok::<_, TypebenchError>(Some(element))
    };

    match wait_for_value(probe, &wait, selector).await {
        Ok((element, _)) => Ok(element),
        Err(TypebenchError::Timeout { .. }) => Err(TypebenchError::ElementNotFound {
            chain: chain.to_string(),
        }),
        Err(err) => Err(err),
    }
}

/// Resolve the first chain of `set` that succeeds.
///
/// A failing chain is logged and the next one is tried.
pub async fn wait_for_selectors<C>(
    context: &C,
    set: &SelectorSet,
    options: &ResolveOptions,
) -> TypebenchResult<C::Element>
where
    C: SearchContext,
{
    set.ensure_not_empty()?;
    for chain in set.chains() {
        match wait_for_selector(context, chain, options).await {
            Ok(element) => return Ok(element),
            Err(err) => warn!(chain = %chain, error = %err, "selector chain failed, trying next"),
        }
    }
    Err(TypebenchError::NoSelectorsMatched {
        selectors: set.to_json(),
    })
}

/// All elements matching `chain`, without waiting.
///
/// Intermediate steps expand every candidate through its
/// shadow-root-or-self; a step with no candidates ends the query with an
/// empty result.
pub async fn query_selector_all<C>(
    context: &C,
    chain: &SelectorChain,
) -> TypebenchResult<Vec<C::Element>>
where
    C: SearchContext,
{
    chain.ensure_not_empty()?;
    let (first, rest) = chain
        .steps()
        .split_first()
        .ok_or_else(|| TypebenchError::invalid_input("empty selector chain provided"))?;

    let mut elements = context.find_all(first).await?;
    for step in rest {
        if elements.is_empty() {
            break;
        }
        let next = expand_step(&elements, step).await;
        <C::Element as ElementHandle>::release_all(elements).await;
        elements = next?;
    }
    Ok(elements)
}

/// Matches of `selector` under each candidate's shadow-root-or-self, in
/// candidate order. Partial results are released on error.
async fn expand_step<E>(candidates: &[E], selector: &str) -> TypebenchResult<Vec<E>>
where
    E: ElementHandle,
{
    let mut next = Vec::new();
    for candidate in candidates {
        let found = match candidate.shadow_root_or_self().await {
            Ok(scope) => {
                let found = scope.find_all(selector).await;
                scope.release().await;
                found
            }
            Err(err) => Err(err),
        };
        match found {
            Ok(found) => next.extend(found),
            Err(err) => {
                E::release_all(next).await;
                return Err(err);
            }
        }
    }
    Ok(next)
}

/// Matches of the first chain in `set` that has any, or nothing.
pub async fn query_selectors_all<C>(
    context: &C,
    set: &SelectorSet,
) -> TypebenchResult<Vec<C::Element>>
where
    C: SearchContext,
{
    set.ensure_not_empty()?;
    for chain in set.chains() {
        let elements = query_selector_all(context, chain).await?;
        if !elements.is_empty() {
            return Ok(elements);
        }
    }
    Ok(Vec::new())
}

/// Wait until the number of elements matching `set` satisfies
/// `operator.compare(count, expected)`. Returns the satisfying count.
pub async fn wait_for_element_count<C>(
    context: &C,
    set: &SelectorSet,
    expected: usize,
    operator: CountOperator,
    timeout: Duration,
) -> TypebenchResult<usize>
where
    C: SearchContext,
{
    set.ensure_not_empty()?;
    let wait = WaitOptions::new()
        .with_timeout(duration_ms(timeout))
        .with_poll_interval(DEFAULT_POLL_INTERVAL_MS);
    let description = format!("count {operator} {expected}");

    let probe = || async move {
        let matches = query_selectors_all(context, set).await?;
        let count = matches.len();
        <C::Element as ElementHandle>::release_all(matches).await;
        Ok::<_, TypebenchError>(operator.compare(count, expected).then_some(count))
    };

    let (count, _) = wait_for_value(probe, &wait, &description).await?;
    Ok(count)
}
