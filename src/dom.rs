//! DOM snapshot model.
//!
//! The browser collaborator never hands live engine objects to the pipeline.
//! Instead it answers narrow questions with plain data: a cheap
//! [`ElementProbe`] per candidate, a full [`NodeSnapshot`] subtree (tags,
//! attributes, text, computed styles, boxes) for nodes that pass the filters,
//! and [`ContainerScan`] records for repeated-pattern detection.
//!
//! Everything downstream (style capture, image inspection, serialization,
//! scoring, fingerprinting) is pure Rust over these types.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Tags whose content is never text for scoring purposes.
const NON_TEXT_TAGS: &[&str] = &["script", "style", "noscript", "template"];

/// Axis-aligned box in CSS pixels, document-relative.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    /// Create a rect from its components.
    #[must_use]
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height }
    }

    /// Area in square pixels.
    #[inline]
    #[must_use]
    pub fn area(&self) -> f64 {
        self.width * self.height
    }

    /// Whether both sides reach `floor`.
    #[inline]
    #[must_use]
    pub fn meets_floor(&self, floor: f64) -> bool {
        self.width >= floor && self.height >= floor
    }
}

/// Size of the layout viewport.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 1440.0,
            height: 900.0,
        }
    }
}

/// Cheap per-element facts gathered before any serialization.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ElementProbe {
    /// Lowercase tag name.
    pub tag: String,

    /// Raw `class` attribute.
    pub class_name: String,

    /// Bounding box, absent when the element is not rendered.
    pub rect: Option<Rect>,

    /// Computed `position`.
    pub position: String,

    /// Computed `display`.
    pub display: String,

    /// Computed `visibility`.
    pub visibility: String,

    /// Length of the trimmed text content.
    pub text_length: usize,

    /// Leading text, whitespace-collapsed.
    pub text_sample: String,

    /// Whether the subtree contains an `<img>`.
    pub has_image: bool,

    /// Whether the element is or contains an `h1`-`h3`.
    pub has_heading: bool,

    /// Computed `background-image` of the element itself.
    pub background_image: String,
}

impl ElementProbe {
    /// Whether layout removed the element from rendering.
    #[must_use]
    pub fn is_hidden(&self) -> bool {
        self.display == "none" || self.visibility == "hidden"
    }

    /// Whether computed position is `fixed`.
    #[must_use]
    pub fn is_fixed(&self) -> bool {
        self.position == "fixed"
    }

    /// Whether a background image or gradient is set.
    #[must_use]
    pub fn has_background(&self) -> bool {
        let value = self.background_image.trim();
        !value.is_empty() && value != "none"
    }
}

/// A child entry of a snapshot element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum SnapshotNode {
    Element(NodeSnapshot),
    Text { value: String },
}

/// Serializable copy of one element and its subtree.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct NodeSnapshot {
    /// Lowercase tag name.
    pub tag: String,

    /// Attributes in source order.
    pub attributes: Vec<(String, String)>,

    /// Computed style values keyed by property name. Properties whose
    /// retrieval failed are absent.
    pub styles: BTreeMap<String, String>,

    /// Bounding box.
    pub rect: Option<Rect>,

    /// `naturalWidth` / `naturalHeight` for images.
    pub natural_size: Option<(f64, f64)>,

    /// Set when the browser failed to capture this node.
    pub error: Option<String>,

    /// Child elements and text runs in document order.
    pub children: Vec<SnapshotNode>,
}

impl NodeSnapshot {
    /// Create an empty element snapshot.
    #[must_use]
    pub fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_ascii_lowercase(),
            ..Self::default()
        }
    }

    /// Attribute value by name.
    #[must_use]
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Computed style value by property name.
    #[must_use]
    pub fn style(&self, property: &str) -> Option<&str> {
        self.styles.get(property).map(String::as_str)
    }

    /// Class tokens.
    #[must_use]
    pub fn class_list(&self) -> Vec<String> {
        self.attr("class")
            .map(|class| class.split_whitespace().map(str::to_string).collect())
            .unwrap_or_default()
    }

    /// Child element snapshots, skipping text.
    pub fn element_children(&self) -> impl Iterator<Item = &NodeSnapshot> {
        self.children.iter().filter_map(|child| match child {
            SnapshotNode::Element(node) => Some(node),
            SnapshotNode::Text { .. } => None,
        })
    }

    /// Depth-first iterator over this node and every descendant element.
    #[must_use]
    pub fn descendants(&self) -> Descendants<'_> {
        Descendants { stack: vec![self] }
    }

    /// Concatenated text of the subtree, excluding script-like content.
    #[must_use]
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        collect_text(self, &mut out);
        out
    }
}

fn collect_text(node: &NodeSnapshot, out: &mut String) {
    if NON_TEXT_TAGS.contains(&node.tag.as_str()) {
        return;
    }
    for child in &node.children {
        match child {
            SnapshotNode::Text { value } => out.push_str(value),
            SnapshotNode::Element(element) => collect_text(element, out),
        }
    }
}

/// Pre-order iterator returned by [`NodeSnapshot::descendants`].
pub struct Descendants<'a> {
    stack: Vec<&'a NodeSnapshot>,
}

impl<'a> Iterator for Descendants<'a> {
    type Item = &'a NodeSnapshot;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        let children: Vec<&NodeSnapshot> = node.element_children().collect();
        self.stack.extend(children.into_iter().rev());
        Some(node)
    }
}

/// Sampled direct child of a repeated-pattern candidate container.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ChildSample {
    pub tag: String,
    pub width: f64,
    pub height: f64,
    pub has_image: bool,
}

/// A container that might hold repeated siblings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ContainerScan {
    /// Selector that uniquely addresses the container.
    pub selector: String,

    /// Lowercase tag name.
    pub tag: String,

    /// Computed `display`.
    pub display: String,

    /// Raw `class` attribute.
    pub class_name: String,

    /// Total number of element children.
    pub child_count: usize,

    /// Leading children, in order.
    pub children: Vec<ChildSample>,
}

/// Ambient styles inherited from `<body>`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PageContext {
    pub background_color: String,
    pub color: String,
    pub font_family: String,
}

/// Collapse runs of whitespace and trim.
#[must_use]
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
