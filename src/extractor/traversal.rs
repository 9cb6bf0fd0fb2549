//! Selector and recursive passes.
//!
//! Both passes feed the per-element pipeline and stop as soon as the output
//! budget is used up. Only a closed session aborts a pass; everything else is
//! recorded and skipped.

use tracing::{debug, trace};

use crate::browser::{BrowserError, PageSession};
use crate::metrics::ErrorKind;
use crate::result::ComponentType;
use crate::selector::{Catalog, CatalogEntry};

use super::pipeline::{build_component, inspect, BuildError, RunContext, Target, Verdict};
use super::state::ExtractionState;

/// Containers tried in order when looking for the main content root.
pub const MAIN_ROOT_SELECTORS: &[&str] = &[
    "main",
    "#main",
    "#content",
    "article",
    ".main-content",
    "[role='main']",
    "#root",
    ".content",
    "#app",
    "body > div",
    "body",
];

/// Run every plan entry against the page.
pub async fn selector_pass<P: PageSession>(
    page: &P,
    ctx: &RunContext<'_>,
    plan: &[CatalogEntry],
    state: &mut ExtractionState,
) -> Result<(), BrowserError> {
    let batch = ctx.config.batch_size.max(1);
    let mut processed = 0usize;

    for entry in plan {
        if state.is_full() {
            break;
        }

        let elements = match page.query_all(&entry.selector).await {
            Ok(elements) => elements,
            Err(BrowserError::Closed) => return Err(BrowserError::Closed),
            Err(err) => {
                state.record(ErrorKind::SelectorError, err.to_string(), Some(&entry.selector));
                continue;
            }
        };
        trace!(entry = %entry, matches = elements.len(), "selector evaluated");

        let mut taken = 0usize;
        for element in &elements {
            if state.is_full() || entry.max_instances.is_some_and(|cap| taken >= cap) {
                break;
            }

            processed += 1;
            if processed % batch == 0 {
                tokio::task::yield_now().await;
            }

            if let Some(exclude) = &entry.exclude {
                match page.closest(element, exclude).await {
                    Ok(true) => continue,
                    Ok(false) => {}
                    Err(BrowserError::Closed) => return Err(BrowserError::Closed),
                    Err(err) => {
                        state.record(ErrorKind::SelectorError, err.to_string(), Some(&entry.selector));
                        break;
                    }
                }
            }

            state.saw_element();
            let probe = match page.probe(element).await {
                Ok(probe) => probe,
                Err(BrowserError::Closed) => return Err(BrowserError::Closed),
                Err(err) => {
                    state.record(ErrorKind::ElementError, err.to_string(), Some(&entry.selector));
                    continue;
                }
            };

            let inspection = match inspect(probe, ctx.config.visibility_floor, &ctx.scorer, entry.high_value) {
                Verdict::Visible(inspection) => inspection,
                Verdict::Rejected { kind, reason } => {
                    state.record(kind, reason, Some(&entry.selector));
                    continue;
                }
            };

            let target = Target {
                kind: entry.kind,
                selector: &entry.selector,
            };
            match build_component(page, ctx, state, element, &inspection, target).await {
                Ok(component) => {
                    if state.push(component) {
                        taken += 1;
                    }
                }
                Err(BuildError::Skipped) => {}
                Err(BuildError::Fatal(err)) => return Err(err),
            }
        }
    }
    Ok(())
}

/// First element matching the main-root fallbacks, with the selector that found it.
pub async fn find_main_root<P: PageSession>(page: &P) -> Result<Option<(P::Element, &'static str)>, BrowserError> {
    for &selector in MAIN_ROOT_SELECTORS {
        match page.query_all(selector).await {
            Ok(elements) => {
                if let Some(root) = elements.into_iter().next() {
                    return Ok(Some((root, selector)));
                }
            }
            Err(BrowserError::Closed) => return Err(BrowserError::Closed),
            Err(err) => debug!(selector, error = %err, "main root selector failed"),
        }
    }
    Ok(None)
}

/// Depth budget handed to the children of a node with `remaining` budget.
#[must_use]
pub fn child_budget(remaining: usize, score: f64, expand_threshold: f64, reduced_depth: usize) -> usize {
    let next = remaining.saturating_sub(1);
    if score > expand_threshold {
        next
    } else {
        next.min(reduced_depth)
    }
}

/// Depth-bounded descent into the main content root.
///
/// Uses an explicit worklist of `(element, remaining depth)`; children are
/// pushed in reverse so they pop in document order. Nodes that fail the
/// visibility filters are pruned with their subtree without being recorded.
pub async fn recursive_pass<P: PageSession>(
    page: &P,
    ctx: &RunContext<'_>,
    catalog: &Catalog,
    state: &mut ExtractionState,
) -> Result<(), BrowserError> {
    let max_depth = ctx.options.max_depth;
    if max_depth == 0 || state.is_full() {
        return Ok(());
    }

    let Some((root, root_selector)) = find_main_root(page).await? else {
        debug!("no main content root found");
        return Ok(());
    };
    debug!(root = root_selector, "recursive pass root");

    let config = ctx.config;
    let batch = config.batch_size.max(1);
    let mut stack: Vec<(P::Element, usize)> = Vec::new();
    push_children(page, &root, max_depth, &mut stack).await?;

    let mut visited = 0usize;
    while let Some((element, remaining)) = stack.pop() {
        if state.is_full() || visited >= config.max_recursive_nodes {
            break;
        }
        visited += 1;
        if visited % batch == 0 {
            tokio::task::yield_now().await;
        }

        let probe = match page.probe(&element).await {
            Ok(probe) => probe,
            Err(BrowserError::Closed) => return Err(BrowserError::Closed),
            Err(err) => {
                trace!(error = %err, "probe failed, pruning subtree");
                continue;
            }
        };

        let kind = ComponentType::infer_from_tag(&probe.tag);
        let high_value = catalog.is_high_value(kind);
        let inspection = match inspect(probe, config.visibility_floor, &ctx.scorer, high_value) {
            Verdict::Visible(inspection) => inspection,
            Verdict::Rejected { .. } => continue,
        };

        let worth_keeping = inspection.probe.has_image
            || inspection.probe.has_background()
            || inspection.score > config.recursive_keep_threshold;
        if worth_keeping && ctx.options.allows(kind) {
            state.saw_element();
            let selector = format!("{root_selector} >> {}", inspection.probe.tag);
            let target = Target {
                kind,
                selector: &selector,
            };
            match build_component(page, ctx, state, &element, &inspection, target).await {
                Ok(component) => {
                    state.push(component);
                }
                Err(BuildError::Skipped) => {}
                Err(BuildError::Fatal(err)) => return Err(err),
            }
        }

        let next = child_budget(
            remaining,
            inspection.score,
            config.recursive_expand_threshold,
            config.reduced_depth,
        );
        if next >= 1 {
            push_children(page, &element, next, &mut stack).await?;
        }
    }

    debug!(visited, collected = state.components().len(), "recursive pass finished");
    Ok(())
}

async fn push_children<P: PageSession>(
    page: &P,
    element: &P::Element,
    remaining: usize,
    stack: &mut Vec<(P::Element, usize)>,
) -> Result<(), BrowserError> {
    match page.children(element).await {
        Ok(children) => {
            stack.extend(children.into_iter().rev().map(|child| (child, remaining)));
            Ok(())
        }
        Err(BrowserError::Closed) => Err(BrowserError::Closed),
        Err(err) => {
            trace!(error = %err, "children unavailable");
            Ok(())
        }
    }
}
