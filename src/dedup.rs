//! Fingerprints and deduplication.
//!
//! A fingerprint combines the component type, the fragment markup with
//! `class` / `id` / `style` stripped and whitespace collapsed, the size
//! quantized to 10px buckets, and the first few text runs. Components with
//! equal fingerprints are duplicates; scores above the keep threshold are
//! never dropped.

use std::collections::HashSet;
use std::hash::{DefaultHasher, Hash, Hasher};

use crate::patterns::{IDENTITY_ATTR, INTER_TAG_WHITESPACE, TEXT_RUN, WHITESPACE};
use crate::result::{ComponentType, Dimensions, ExtractedComponent};
use crate::serializer::strip_rules_block;

/// Size bucket for quantized dimensions.
pub const DIMENSION_BUCKET: f64 = 10.0;

/// Number of text runs folded into the fingerprint.
pub const TEXT_RUNS: usize = 3;

/// Maximum characters kept per text run.
pub const TEXT_RUN_CHARS: usize = 50;

/// Markup with identity attributes removed and whitespace collapsed.
#[must_use]
pub fn normalize_markup(html: &str) -> String {
    let stripped = IDENTITY_ATTR.replace_all(html, "");
    let tight = INTER_TAG_WHITESPACE.replace_all(&stripped, "><");
    WHITESPACE.replace_all(tight.trim(), " ").into_owned()
}

/// Round a length to the nearest bucket.
#[must_use]
pub fn quantize(value: f64) -> i64 {
    ((value / DIMENSION_BUCKET).round() * DIMENSION_BUCKET) as i64
}

/// First [`TEXT_RUNS`] non-empty `>text<` runs, trimmed and shortened.
#[must_use]
pub fn leading_text_runs(html: &str) -> Vec<String> {
    TEXT_RUN
        .captures_iter(html)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str().trim())
        .filter(|text| !text.is_empty())
        .take(TEXT_RUNS)
        .map(|text| text.chars().take(TEXT_RUN_CHARS).collect())
        .collect()
}

/// Structural fingerprint as a 16-digit hex string.
#[must_use]
pub fn fingerprint(kind: ComponentType, html: &str, dimensions: Dimensions) -> String {
    let normalized = normalize_markup(html);
    let mut hasher = DefaultHasher::new();
    kind.as_str().hash(&mut hasher);
    normalized.hash(&mut hasher);
    quantize(dimensions.width).hash(&mut hasher);
    quantize(dimensions.height).hash(&mut hasher);
    leading_text_runs(&normalized).hash(&mut hasher);
    format!("{:016x}", hasher.finish())
}

/// Fingerprint of an extracted component, computed if not yet stored.
///
/// A computed fingerprint ignores the trailing stylesheet rules block.
#[must_use]
pub fn component_fingerprint(component: &ExtractedComponent) -> String {
    component.metadata.fingerprint.clone().unwrap_or_else(|| {
        fingerprint(
            component.kind,
            strip_rules_block(&component.html),
            component.metadata.dimensions,
        )
    })
}

/// Drop duplicate components, keeping the first-seen one.
///
/// Only components at or below `keep_threshold` take part in collision
/// checks: a component scoring above it is always kept and does not
/// suppress later duplicates.
#[must_use]
pub fn deduplicate(components: Vec<ExtractedComponent>, keep_threshold: f64) -> Vec<ExtractedComponent> {
    let mut seen: HashSet<String> = HashSet::new();
    components
        .into_iter()
        .filter(|component| {
            if component.importance() > keep_threshold {
                return true;
            }
            seen.insert(component_fingerprint(component))
        })
        .collect()
}

/// Sort by importance (when scoring is enabled) and apply the output budget.
#[must_use]
pub fn rank(mut components: Vec<ExtractedComponent>, scoring: bool, max_components: usize) -> Vec<ExtractedComponent> {
    if scoring {
        components.sort_by(|a, b| b.importance().total_cmp(&a.importance()));
    }
    components.truncate(max_components);
    components
}
