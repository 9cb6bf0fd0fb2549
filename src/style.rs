//! Style capture.
//!
//! The browser reads computed values for a fixed, explicit list of CSS
//! properties. [`CAPTURED_PROPERTIES`] is the single source of that list: it
//! is injected into the snapshot script and drives the order in which the
//! serializer writes declarations.

use std::collections::BTreeMap;

use crate::dom::{NodeSnapshot, PageContext};

/// Properties captured for every node, grouped by concern.
pub const CAPTURED_PROPERTIES: &[&str] = &[
    // Typography
    "color",
    "font-family",
    "font-size",
    "font-weight",
    "font-style",
    "line-height",
    "letter-spacing",
    "text-align",
    "text-decoration",
    "text-transform",
    "white-space",
    "word-spacing",
    // Box model
    "display",
    "box-sizing",
    "width",
    "height",
    "min-width",
    "min-height",
    "max-width",
    "max-height",
    "margin-top",
    "margin-right",
    "margin-bottom",
    "margin-left",
    "padding-top",
    "padding-right",
    "padding-bottom",
    "padding-left",
    // Border and shadow
    "border-top",
    "border-right",
    "border-bottom",
    "border-left",
    "border-radius",
    "box-shadow",
    "outline",
    // Layout
    "flex-direction",
    "flex-wrap",
    "justify-content",
    "align-items",
    "align-content",
    "align-self",
    "flex-grow",
    "flex-shrink",
    "flex-basis",
    "gap",
    "grid-template-columns",
    "grid-template-rows",
    "grid-column",
    "grid-row",
    // Position
    "position",
    "top",
    "right",
    "bottom",
    "left",
    "z-index",
    "float",
    "clear",
    "overflow",
    // Visual effects
    "background-color",
    "background-image",
    "background-size",
    "background-position",
    "background-repeat",
    "opacity",
    "transform",
    "filter",
    "cursor",
    "visibility",
    "object-fit",
];

/// Spacing properties, used by the metrics engine.
pub const SPACING_PROPERTIES: &[&str] = &[
    "margin-top",
    "margin-right",
    "margin-bottom",
    "margin-left",
    "padding-top",
    "padding-right",
    "padding-bottom",
    "padding-left",
];

/// Alignment properties, used by the metrics engine.
pub const ALIGNMENT_PROPERTIES: &[&str] = &["justify-content", "align-items", "text-align"];

/// Offset properties that are neutralized when a node is re-embedded.
pub const OFFSET_PROPERTIES: &[&str] = &["top", "right", "bottom", "left"];

/// Capture the listed computed properties of a snapshot node.
///
/// Properties the browser failed to read are absent from the snapshot and
/// therefore absent here; empty values are dropped.
#[must_use]
pub fn capture_styles(node: &NodeSnapshot) -> BTreeMap<String, String> {
    CAPTURED_PROPERTIES
        .iter()
        .filter_map(|property| {
            let value = node.style(property)?.trim();
            if value.is_empty() {
                None
            } else {
                Some(((*property).to_string(), value.to_string()))
            }
        })
        .collect()
}

/// Captured properties of a node in list order, as `(property, value)` pairs.
pub fn ordered_declarations(node: &NodeSnapshot) -> impl Iterator<Item = (&'static str, &str)> {
    CAPTURED_PROPERTIES.iter().filter_map(move |property| {
        let value = node.style(property)?.trim();
        (!value.is_empty()).then_some((*property, value))
    })
}

/// Whether a page context carries any information.
#[must_use]
pub fn is_meaningful(context: &PageContext) -> bool {
    !context.background_color.is_empty() || !context.color.is_empty() || !context.font_family.is_empty()
}
