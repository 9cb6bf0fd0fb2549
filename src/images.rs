//! Background and image inspection.
//!
//! Detects background images and gradients on a node and inventories every
//! image reference in a subtree: foreground `<img>` elements followed by
//! descendants (including the root) whose computed `background-image`
//! resolves to a URL.

use url::Url;

use crate::dom::NodeSnapshot;
use crate::patterns::CSS_URL;
use crate::result::{ImageInfo, ImageKind};
use crate::url_utils::create_absolute_url;

/// Background state of a node.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Background {
    /// A background image or gradient is set.
    pub present: bool,

    /// The first `url(...)` token, if any.
    pub url: Option<String>,
}

/// Parse a computed `background-image` value.
///
/// Any value other than `none` or empty flags `present`; gradients carry no URL.
#[must_use]
pub fn parse_background(value: &str) -> Background {
    let value = value.trim();
    if value.is_empty() || value.eq_ignore_ascii_case("none") {
        return Background::default();
    }

    let url = CSS_URL
        .captures(value)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|url| !url.is_empty());

    Background { present: true, url }
}

/// Background state of a snapshot node.
#[must_use]
pub fn has_background(node: &NodeSnapshot) -> Background {
    node.style("background-image")
        .map(parse_background)
        .unwrap_or_default()
}

/// Collect every image referenced in the subtree rooted at `root`.
///
/// Foreground images come first, in document order, followed by background
/// images in document order. URLs are made absolute against `base`.
#[must_use]
pub fn collect_images(root: &NodeSnapshot, base: &Url) -> Vec<ImageInfo> {
    let mut images = Vec::new();

    for node in root.descendants().filter(|node| node.tag == "img") {
        let Some(src) = image_source(node) else {
            continue;
        };
        let (width, height) = node
            .natural_size
            .or_else(|| node.rect.map(|r| (r.width, r.height)))
            .unwrap_or((0.0, 0.0));
        images.push(ImageInfo {
            src: create_absolute_url(src, base),
            alt: node.attr("alt").unwrap_or_default().to_string(),
            width,
            height,
            kind: ImageKind::Foreground,
        });
    }

    for node in root.descendants() {
        let Some(url) = has_background(node).url else {
            continue;
        };
        let (width, height) = node.rect.map_or((0.0, 0.0), |r| (r.width, r.height));
        images.push(ImageInfo {
            src: create_absolute_url(&url, base),
            alt: String::new(),
            width,
            height,
            kind: ImageKind::Background,
        });
    }

    images
}

/// Effective source of an `<img>`: `src`, then lazy-loading fallbacks.
#[must_use]
pub fn image_source(node: &NodeSnapshot) -> Option<&str> {
    ["src", "data-src", "data-lazy-src"]
        .into_iter()
        .filter_map(|name| node.attr(name))
        .map(str::trim)
        .find(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::{Rect, SnapshotNode};

    fn base() -> Url {
        Url::parse("https://shop.test/catalog/").unwrap_or_else(|e| panic!("base url: {e}"))
    }

    fn img(src: &str, alt: &str) -> NodeSnapshot {
        let mut node = NodeSnapshot::new("img");
        node.attributes.push(("src".into(), src.into()));
        node.attributes.push(("alt".into(), alt.into()));
        node.natural_size = Some((640.0, 480.0));
        node
    }

    #[test]
    fn gradient_is_present_without_url() {
        let bg = parse_background("linear-gradient(90deg, red, blue)");
        assert!(bg.present);
        assert!(bg.url.is_none());
    }

    #[test]
    fn url_background_is_extracted() {
        let bg = parse_background(r#"url("hero.jpg"), linear-gradient(red, blue)"#);
        assert!(bg.present);
        assert_eq!(bg.url.as_deref(), Some("hero.jpg"));
        assert!(!parse_background("none").present);
    }

    #[test]
    fn collects_foreground_then_background() {
        let mut banner = NodeSnapshot::new("div");
        banner
            .styles
            .insert("background-image".into(), "url(/bg.png)".into());
        banner.rect = Some(Rect::new(0.0, 0.0, 300.0, 120.0));

        let mut root = NodeSnapshot::new("section");
        root.children = vec![
            SnapshotNode::Element(banner),
            SnapshotNode::Element(img("shoe.png", "Shoe")),
        ];

        let images = collect_images(&root, &base());
        assert_eq!(images.len(), 2);
        assert_eq!(images[0].kind, ImageKind::Foreground);
        assert_eq!(images[0].src, "https://shop.test/catalog/shoe.png");
        assert_eq!(images[0].alt, "Shoe");
        assert_eq!(images[0].width, 640.0);
        assert_eq!(images[1].kind, ImageKind::Background);
        assert_eq!(images[1].src, "https://shop.test/bg.png");
        assert_eq!(images[1].width, 300.0);
    }

    #[test]
    fn root_background_is_included() {
        let mut root = NodeSnapshot::new("div");
        root.styles
            .insert("background-image".into(), "url('https://cdn.test/a.webp')".into());
        let images = collect_images(&root, &base());
        assert_eq!(images.len(), 1);
        assert_eq!(images[0].src, "https://cdn.test/a.webp");
    }

    #[test]
    fn lazy_image_source_falls_back_to_data_src() {
        let mut node = NodeSnapshot::new("img");
        node.attributes.push(("src".into(), " ".into()));
        node.attributes.push(("data-src".into(), "lazy.png".into()));
        assert_eq!(image_source(&node), Some("lazy.png"));
    }
}
