//! Reuse-oriented HTML cleaning.
//!
//! [`clean_html`] derives the `clean_html` copy of a fragment: no scripts,
//! no comments, no inline handlers, no `data-*` or analytics attributes, and
//! bounded `class` attributes. The styled `html` copy is never modified.

use dom_query::{Document, Selection};

use crate::patterns::{DATA_ATTR, EVENT_HANDLER_ATTR, HTML_COMMENT, TRACKING_ATTR};

/// Elements removed together with their content.
const TAGS_TO_REMOVE: &str = "script, style, noscript";

/// `class` attributes longer than this are truncated.
pub const MAX_CLASS_LENGTH: usize = 100;

/// Number of class tokens kept when truncating.
pub const MAX_CLASS_TOKENS: usize = 10;

/// Clean a serialized fragment for reuse.
///
/// Comments are stripped textually first so that conditional comments and
/// comments inside raw-text elements disappear too; the rest is done on a
/// parsed tree.
#[must_use]
pub fn clean_html(html: &str) -> String {
    if html.trim().is_empty() {
        return String::new();
    }

    let without_comments = HTML_COMMENT.replace_all(html, "");
    let doc = Document::from(format!("<html><body>{without_comments}</body></html>"));

    doc.select(TAGS_TO_REMOVE).remove();

    for node in doc.select("body *").nodes() {
        let sel = Selection::from(*node);
        let attrs: Vec<(String, String)> = node
            .attrs()
            .iter()
            .map(|attr| (attr.name.local.to_string(), attr.value.to_string()))
            .collect();

        for (name, value) in attrs {
            if is_stripped_attribute(&name) {
                sel.remove_attr(&name);
            } else if name.eq_ignore_ascii_case("class") && value.len() > MAX_CLASS_LENGTH {
                sel.set_attr(&name, &truncate_class(&value));
            }
        }
    }

    doc.select("body").inner_html().to_string()
}

/// Whether an attribute is dropped from the clean copy.
#[must_use]
pub fn is_stripped_attribute(name: &str) -> bool {
    EVENT_HANDLER_ATTR.is_match(name) || DATA_ATTR.is_match(name) || TRACKING_ATTR.is_match(name)
}

/// Keep the first [`MAX_CLASS_TOKENS`] tokens of a class list.
#[must_use]
pub fn truncate_class(value: &str) -> String {
    value
        .split_whitespace()
        .take(MAX_CLASS_TOKENS)
        .collect::<Vec<_>>()
        .join(" ")
}
