//! Result types for extraction output.
//!
//! This module defines the structured output of an extraction run: the
//! closed component taxonomy, one [`ExtractedComponent`] per qualifying DOM
//! node, and the [`ExtractionResult`] wrapper returned to callers.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::dom::PageContext;
use crate::metrics::ExtractionMetrics;

/// Closed taxonomy of component types.
///
/// Catalog entries map to the plural catalog names (`"buttons"`, `"cards"`),
/// the pattern detector emits `card-item` / `list-item`, and nodes found by
/// the recursive pass are typed from their tag or fall back to `element`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ComponentType {
    Navigation,
    Header,
    Hero,
    Carousel,
    Product,
    Pricing,
    Features,
    Testimonial,
    Cta,
    Cards,
    Buttons,
    Forms,
    Search,
    Tabs,
    Accordion,
    Gallery,
    Breadcrumbs,
    Pagination,
    Table,
    Sidebar,
    Footer,
    CardItem,
    ListItem,
    Section,
    Element,
}

impl ComponentType {
    /// Every type, in declaration order.
    pub const ALL: [ComponentType; 25] = [
        Self::Navigation,
        Self::Header,
        Self::Hero,
        Self::Carousel,
        Self::Product,
        Self::Pricing,
        Self::Features,
        Self::Testimonial,
        Self::Cta,
        Self::Cards,
        Self::Buttons,
        Self::Forms,
        Self::Search,
        Self::Tabs,
        Self::Accordion,
        Self::Gallery,
        Self::Breadcrumbs,
        Self::Pagination,
        Self::Table,
        Self::Sidebar,
        Self::Footer,
        Self::CardItem,
        Self::ListItem,
        Self::Section,
        Self::Element,
    ];

    /// Wire name, as used in options and JSON output.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Navigation => "navigation",
            Self::Header => "header",
            Self::Hero => "hero",
            Self::Carousel => "carousel",
            Self::Product => "product",
            Self::Pricing => "pricing",
            Self::Features => "features",
            Self::Testimonial => "testimonial",
            Self::Cta => "cta",
            Self::Cards => "cards",
            Self::Buttons => "buttons",
            Self::Forms => "forms",
            Self::Search => "search",
            Self::Tabs => "tabs",
            Self::Accordion => "accordion",
            Self::Gallery => "gallery",
            Self::Breadcrumbs => "breadcrumbs",
            Self::Pagination => "pagination",
            Self::Table => "table",
            Self::Sidebar => "sidebar",
            Self::Footer => "footer",
            Self::CardItem => "card-item",
            Self::ListItem => "list-item",
            Self::Section => "section",
            Self::Element => "element",
        }
    }

    /// Human-readable label used in component names.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Navigation => "Navigation",
            Self::Header => "Header",
            Self::Hero => "Hero",
            Self::Carousel => "Carousel",
            Self::Product => "Product",
            Self::Pricing => "Pricing",
            Self::Features => "Features",
            Self::Testimonial => "Testimonial",
            Self::Cta => "Call To Action",
            Self::Cards => "Card",
            Self::Buttons => "Button",
            Self::Forms => "Form",
            Self::Search => "Search",
            Self::Tabs => "Tabs",
            Self::Accordion => "Accordion",
            Self::Gallery => "Gallery",
            Self::Breadcrumbs => "Breadcrumbs",
            Self::Pagination => "Pagination",
            Self::Table => "Table",
            Self::Sidebar => "Sidebar",
            Self::Footer => "Footer",
            Self::CardItem => "Card Item",
            Self::ListItem => "List Item",
            Self::Section => "Section",
            Self::Element => "Element",
        }
    }

    /// Type for a node found by the recursive pass, inferred from its tag.
    #[must_use]
    pub fn infer_from_tag(tag: &str) -> Self {
        match tag {
            "nav" => Self::Navigation,
            "header" => Self::Header,
            "footer" => Self::Footer,
            "form" => Self::Forms,
            "table" => Self::Table,
            "aside" => Self::Sidebar,
            "button" => Self::Buttons,
            "section" | "article" => Self::Section,
            _ => Self::Element,
        }
    }
}

impl fmt::Display for ComponentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown component type name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown component type: {0}")]
pub struct UnknownComponentType(pub String);

impl FromStr for ComponentType {
    type Err = UnknownComponentType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == needle)
            .ok_or_else(|| UnknownComponentType(s.to_string()))
    }
}

/// Pixel size of a component.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Dimensions {
    pub width: f64,
    pub height: f64,
}

/// Document-relative position of a component's top-left corner.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

/// Where an image reference came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageKind {
    /// An `<img>` element.
    Foreground,
    /// A CSS `background-image: url(...)`.
    Background,
}

/// One image referenced inside a component.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageInfo {
    /// Absolute image URL (`data:` URLs are kept verbatim).
    pub src: String,

    /// Alt text, empty for background images.
    pub alt: String,

    /// Natural width for `<img>`, bounding-box width for backgrounds.
    pub width: f64,

    /// Natural height for `<img>`, bounding-box height for backgrounds.
    pub height: f64,

    /// Origin of the reference.
    pub kind: ImageKind,
}

/// Captured style of a component's root node.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ComponentStyles {
    /// CSS property name to computed value.
    #[serde(flatten)]
    pub properties: BTreeMap<String, String>,

    /// Ambient page styles inherited from `<body>`.
    #[serde(skip_serializing_if = "Option::is_none", rename = "pageContext")]
    pub page_context: Option<PageContext>,
}

/// Metadata describing where and how a component was found.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentMetadata {
    /// Lowercase tag name of the root node.
    pub tag_name: String,

    /// Class tokens of the root node.
    pub class_list: Vec<String>,

    /// Pixel size of the bounding box.
    pub dimensions: Dimensions,

    /// Document-relative position of the bounding box.
    pub position: Position,

    /// Importance score in `[0, 100]`, `0` when scoring is disabled.
    pub importance: f64,

    /// Whether the root node has a computed background image or gradient.
    pub has_background_image: bool,

    /// Background image URL, absent for gradients.
    pub background_image_url: Option<String>,

    /// Images found in the subtree.
    pub images: Vec<ImageInfo>,

    /// The page the component was extracted from.
    pub source_url: String,

    /// The selector that matched, or the recursive-pass marker.
    pub selector: String,

    /// Structural fingerprint used for deduplication.
    pub fingerprint: Option<String>,

    /// When the component was extracted.
    pub extracted_at: DateTime<Utc>,
}

/// One detected UI component.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedComponent {
    /// Component type.
    #[serde(rename = "type")]
    pub kind: ComponentType,

    /// Human-readable label.
    pub name: String,

    /// Self-contained fragment with inlined computed styles.
    pub html: String,

    /// `html` without scripts, comments, handlers and tracking attributes.
    pub clean_html: String,

    /// `data:image/png;base64,...` capture, empty when skipped or failed.
    pub screenshot: String,

    /// Captured computed style of the root node.
    pub styles: ComponentStyles,

    /// Location, size, importance and image inventory.
    pub metadata: ComponentMetadata,
}

impl ExtractedComponent {
    /// Importance score shorthand.
    #[must_use]
    pub fn importance(&self) -> f64 {
        self.metadata.importance
    }
}

/// Result of one `extract` call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionResult {
    /// Components, sorted by importance when scoring is enabled.
    pub components: Vec<ExtractedComponent>,

    /// Summary metrics for the run.
    pub metrics: Option<ExtractionMetrics>,
}
