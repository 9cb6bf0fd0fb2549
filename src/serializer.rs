//! Fragment serialization.
//!
//! Turns a [`NodeSnapshot`] subtree into a self-contained HTML string:
//!
//! - every node carries its captured computed style inline, appended after
//!   any existing inline style;
//! - `fixed` / `absolute` nodes become `relative` with zeroed offsets so the
//!   fragment cannot escape its new container;
//! - the root is pinned to its captured pixel size and will not flex;
//! - `<img>` sources are made absolute and natural sizes are kept as
//!   `data-natural-width` / `data-natural-height`;
//! - matching stylesheet rules are appended as a trailing `<style>` block.
//!
//! Nodes the browser failed to capture are skipped; the rest of the tree is
//! still written.

use std::fmt::Write as _;

use url::Url;

use crate::dom::{NodeSnapshot, SnapshotNode};
use crate::images::image_source;
use crate::style::{ordered_declarations, OFFSET_PROPERTIES};
use crate::url_utils::create_absolute_url;

/// Elements that never have children or closing tags.
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param",
    "source", "track", "wbr",
];

/// Elements whose text content is written verbatim.
const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style"];

const RULES_OPEN: &str = "<style>";
const RULES_CLOSE: &str = "\n</style>";

/// Inputs shared by every node of one serialization.
#[derive(Debug, Clone, Copy)]
pub struct SerializeContext<'a> {
    /// Page URL used to absolutize image sources.
    pub base: &'a Url,

    /// Stylesheet rules appended after the fragment.
    pub rules: &'a [String],
}

/// A serialized fragment, split so the structure can be hashed without the
/// page's stylesheet rules.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Fragment {
    /// The element tree with inline styles.
    pub markup: String,
    /// Trailing `<style>` block, empty when no rules matched.
    pub rules: String,
}

impl Fragment {
    /// The root could not be captured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.markup.trim().is_empty()
    }

    /// Markup followed by the rules block.
    #[must_use]
    pub fn into_html(self) -> String {
        let mut html = self.markup;
        html.push_str(&self.rules);
        html
    }
}

/// Serialize `root` into markup and a rules block.
///
/// Both parts are empty when the root itself could not be captured.
#[must_use]
pub fn serialize(root: &NodeSnapshot, ctx: &SerializeContext<'_>) -> Fragment {
    if root.error.is_some() || !is_valid_name(&root.tag) {
        return Fragment::default();
    }

    let mut markup = String::new();
    write_element(&mut markup, root, true, ctx);

    Fragment {
        markup,
        rules: rules_block(ctx.rules),
    }
}

/// Serialize `root` into a self-contained fragment.
///
/// Returns an empty string when the root itself could not be captured.
#[must_use]
pub fn serialize_fragment(root: &NodeSnapshot, ctx: &SerializeContext<'_>) -> String {
    serialize(root, ctx).into_html()
}

fn rules_block(rules: &[String]) -> String {
    if rules.is_empty() {
        return String::new();
    }
    let mut out = String::from(RULES_OPEN);
    for rule in rules {
        out.push('\n');
        out.push_str(&rule.replace("</", "<\\/"));
    }
    out.push_str(RULES_CLOSE);
    out
}

/// `html` without a trailing rules block written by [`serialize_fragment`].
#[must_use]
pub fn strip_rules_block(html: &str) -> &str {
    if !html.ends_with(RULES_CLOSE) {
        return html;
    }
    match html.rfind(RULES_OPEN) {
        Some(start) if html[start + RULES_OPEN.len()..].starts_with('\n') => &html[..start],
        _ => html,
    }
}

fn write_element(out: &mut String, node: &NodeSnapshot, is_root: bool, ctx: &SerializeContext<'_>) {
    let tag = node.tag.as_str();
    out.push('<');
    out.push_str(tag);

    for (name, value) in &node.attributes {
        let lower = name.to_ascii_lowercase();
        if lower == "style" || !is_valid_name(name) {
            continue;
        }
        if tag == "img" && matches!(lower.as_str(), "src" | "data-natural-width" | "data-natural-height") {
            continue;
        }
        write_attribute(out, name, value);
    }

    if tag == "img" {
        if let Some(src) = image_source(node) {
            write_attribute(out, "src", &create_absolute_url(src, ctx.base));
        }
        if let Some((width, height)) = node.natural_size {
            write_attribute(out, "data-natural-width", &format_px_number(width));
            write_attribute(out, "data-natural-height", &format_px_number(height));
        }
    }

    let style = inline_style(node, is_root);
    if !style.is_empty() {
        write_attribute(out, "style", &style);
    }
    out.push('>');

    if VOID_ELEMENTS.contains(&tag) {
        return;
    }

    let raw = RAW_TEXT_ELEMENTS.contains(&tag);
    for child in &node.children {
        match child {
            SnapshotNode::Text { value } if raw => out.push_str(&value.replace("</", "<\\/")),
            SnapshotNode::Text { value } => escape_text(out, value),
            SnapshotNode::Element(element) => {
                if element.error.is_some() || !is_valid_name(&element.tag) {
                    continue;
                }
                write_element(out, element, false, ctx);
            }
        }
    }

    out.push_str("</");
    out.push_str(tag);
    out.push('>');
}

/// Build the inline style for one node.
///
/// Order: existing inline declarations, captured computed declarations,
/// position neutralization, then the root size pin. Later declarations win.
#[must_use]
pub fn inline_style(node: &NodeSnapshot, is_root: bool) -> String {
    let mut style = String::new();

    if let Some(existing) = node.attr("style") {
        let existing = existing.trim().trim_end_matches(';').trim();
        if !existing.is_empty() {
            style.push_str(existing);
            style.push(';');
        }
    }

    for (property, value) in ordered_declarations(node) {
        push_declaration(&mut style, property, value);
    }

    let escapes_layout = matches!(node.style("position"), Some("fixed" | "absolute"));
    if escapes_layout {
        push_declaration(&mut style, "position", "relative");
        for offset in OFFSET_PROPERTIES {
            push_declaration(&mut style, offset, "0px");
        }
    }

    if is_root {
        if let Some(rect) = node.rect {
            push_declaration(&mut style, "width", &format!("{}px", format_px_number(rect.width)));
            push_declaration(&mut style, "height", &format!("{}px", format_px_number(rect.height)));
        }
        push_declaration(&mut style, "box-sizing", "border-box");
        push_declaration(&mut style, "flex-grow", "0");
        push_declaration(&mut style, "flex-shrink", "0");
    }

    style
}

fn push_declaration(style: &mut String, property: &str, value: &str) {
    if !style.is_empty() {
        style.push(' ');
    }
    let _ = write!(style, "{property}: {value};");
}

/// Render a pixel quantity without trailing zeros (`120`, `33.5`).
#[must_use]
pub fn format_px_number(value: f64) -> String {
    let rounded = (value * 100.0).round() / 100.0;
    if rounded.fract() == 0.0 {
        format!("{rounded:.0}")
    } else {
        let text = format!("{rounded:.2}");
        text.trim_end_matches('0').to_string()
    }
}

fn write_attribute(out: &mut String, name: &str, value: &str) {
    out.push(' ');
    out.push_str(name);
    out.push_str("=\"");
    for ch in value.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(ch),
        }
    }
    out.push('"');
}

fn escape_text(out: &mut String, text: &str) {
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(ch),
        }
    }
}

/// Reject tag and attribute names that would break the markup.
fn is_valid_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| !c.is_whitespace() && !c.is_control() && !matches!(c, '"' | '\'' | '<' | '>' | '/' | '='))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::Rect;

    fn base() -> Url {
        Url::parse("https://site.test/blog/post").unwrap_or_else(|e| panic!("base url: {e}"))
    }

    fn text(value: &str) -> SnapshotNode {
        SnapshotNode::Text {
            value: value.to_string(),
        }
    }

    fn render(root: &NodeSnapshot) -> String {
        let base = base();
        serialize_fragment(root, &SerializeContext { base: &base, rules: &[] })
    }

    #[test]
    fn root_is_pinned_to_captured_size() {
        let mut root = NodeSnapshot::new("div");
        root.rect = Some(Rect::new(5.0, 5.0, 320.0, 180.5));
        root.styles.insert("display".into(), "flex".into());
        root.children.push(text("Hi"));

        let html = render(&root);
        assert!(html.starts_with("<div style=\""));
        assert!(html.contains("display: flex;"));
        assert!(html.contains("width: 320px;"));
        assert!(html.contains("height: 180.5px;"));
        assert!(html.contains("flex-grow: 0;"));
        assert!(html.contains("flex-shrink: 0;"));
        assert!(html.ends_with(">Hi</div>"));
    }

    #[test]
    fn existing_inline_style_is_kept_first() {
        let mut root = NodeSnapshot::new("p");
        root.attributes.push(("style".into(), "color: red".into()));
        root.styles.insert("color".into(), "rgb(255, 0, 0)".into());
        let style = inline_style(&root, false);
        assert!(style.starts_with("color: red; color: rgb(255, 0, 0);"));
    }

    #[test]
    fn absolute_descendants_become_relative() {
        let mut badge = NodeSnapshot::new("span");
        badge.styles.insert("position".into(), "absolute".into());
        badge.styles.insert("top".into(), "-8px".into());

        let mut root = NodeSnapshot::new("div");
        root.children.push(SnapshotNode::Element(badge));

        let html = render(&root);
        let span_style = html
            .split("<span style=\"")
            .nth(1)
            .and_then(|rest| rest.split('"').next())
            .unwrap_or_default();
        assert!(span_style.ends_with("position: relative; top: 0px; right: 0px; bottom: 0px; left: 0px;"));
    }

    #[test]
    fn image_sources_are_absolutized_with_natural_size() {
        let mut image = NodeSnapshot::new("img");
        image.attributes.push(("src".into(), "../img/cat.png".into()));
        image.attributes.push(("alt".into(), "Cat".into()));
        image.natural_size = Some((800.0, 600.0));

        let mut inline = NodeSnapshot::new("img");
        inline.attributes.push(("src".into(), "data:image/png;base64,AAAA".into()));

        let mut root = NodeSnapshot::new("figure");
        root.children.push(SnapshotNode::Element(image));
        root.children.push(SnapshotNode::Element(inline));

        let html = render(&root);
        assert!(html.contains(r#"alt="Cat" src="https://site.test/img/cat.png""#));
        assert!(html.contains(r#"data-natural-width="800" data-natural-height="600""#));
        assert!(html.contains(r#"src="data:image/png;base64,AAAA""#));
        assert!(!html.contains("</img>"));
    }

    #[test]
    fn failed_nodes_are_skipped_not_fatal() {
        let mut broken = NodeSnapshot::new("div");
        broken.error = Some("getComputedStyle threw".into());
        broken.children.push(text("lost"));

        let mut root = NodeSnapshot::new("section");
        root.children.push(SnapshotNode::Element(broken));
        root.children.push(text("kept"));

        let html = render(&root);
        assert!(html.contains("kept"));
        assert!(!html.contains("lost"));

        let mut broken_root = NodeSnapshot::new("div");
        broken_root.error = Some("detached".into());
        assert_eq!(render(&broken_root), "");
    }

    #[test]
    fn text_and_attributes_are_escaped() {
        let mut root = NodeSnapshot::new("a");
        root.attributes.push(("title".into(), "\"quoted\" <b>".into()));
        root.attributes.push(("bad name".into(), "x".into()));
        root.children.push(text("1 < 2 & 3"));
        let html = render(&root);
        assert!(html.contains(r#"title="&quot;quoted&quot; &lt;b&gt;""#));
        assert!(!html.contains("bad name"));
        assert!(html.contains("1 &lt; 2 &amp; 3"));
    }

    #[test]
    fn stylesheet_rules_are_appended() {
        let base = base();
        let rules = vec![".card { color: red; }".to_string()];
        let root = NodeSnapshot::new("div");
        let html = serialize_fragment(&root, &SerializeContext { base: &base, rules: &rules });
        assert!(html.ends_with("<style>\n.card { color: red; }\n</style>"));
        assert_eq!(strip_rules_block(&html), render(&root));
    }

    #[test]
    fn rules_are_kept_apart_from_markup() {
        let base = base();
        let rules = vec![".a { color: red; }".to_string()];
        let mut root = NodeSnapshot::new("div");
        root.children.push(text("Card"));

        let fragment = serialize(&root, &SerializeContext { base: &base, rules: &rules });
        assert_eq!(fragment.markup, render(&root));
        assert!(fragment.rules.starts_with("<style>"));
        assert_eq!(strip_rules_block(&fragment.clone().into_html()), fragment.markup);

        let bare = serialize(&root, &SerializeContext { base: &base, rules: &[] });
        assert!(bare.rules.is_empty());
        assert_eq!(bare.into_html(), fragment.markup);
    }

    #[test]
    fn inner_style_elements_are_not_mistaken_for_rules() {
        let mut sheet = NodeSnapshot::new("style");
        sheet.children.push(text("p { margin: 0; }"));
        let mut root = NodeSnapshot::new("div");
        root.children.push(SnapshotNode::Element(sheet));

        let html = render(&root);
        assert_eq!(strip_rules_block(&html), html);
    }

    #[test]
    fn px_numbers_are_compact() {
        assert_eq!(format_px_number(120.0), "120");
        assert_eq!(format_px_number(33.5), "33.5");
        assert_eq!(format_px_number(10.256), "10.26");
    }
}
