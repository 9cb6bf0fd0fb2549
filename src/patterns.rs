//! Compiled regex patterns shared across the pipeline.
//!
//! All patterns are compiled once at first use with `LazyLock`.
//! Patterns are organized by the stage that consumes them.

#![allow(clippy::expect_used)]

use std::sync::LazyLock;

use regex::Regex;

// =============================================================================
// CSS values
// =============================================================================

/// Captures the first `url(...)` token of a CSS value, with or without quotes.
pub static CSS_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"url\(\s*['"]?([^'")]+?)['"]?\s*\)"#).expect("CSS_URL regex")
});

/// Matches a pixel length such as `12px` or `-3.5px`.
pub static PX_VALUE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(-?\d+(?:\.\d+)?)px\s*$").expect("PX_VALUE regex")
});

/// Captures the three channels of `rgb()` / `rgba()` in comma or space syntax.
pub static RGB_COLOR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*rgba?\(\s*(\d+(?:\.\d+)?)[\s,]+(\d+(?:\.\d+)?)[\s,]+(\d+(?:\.\d+)?)")
        .expect("RGB_COLOR regex")
});

/// Matches a `#rgb` or `#rrggbb` hex color.
pub static HEX_COLOR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*#(?:[0-9a-fA-F]{3}|[0-9a-fA-F]{6}|[0-9a-fA-F]{8})\s*$")
        .expect("HEX_COLOR regex")
});

// =============================================================================
// Fragment cleaning
// =============================================================================

/// Matches an HTML comment, including multi-line ones.
pub static HTML_COMMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<!--.*?-->").expect("HTML_COMMENT regex"));

/// Inline event handler attribute names (`onclick`, `onload`, ...).
pub static EVENT_HANDLER_ATTR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^on[a-z]+$").expect("EVENT_HANDLER_ATTR regex"));

/// `data-*` attribute names.
pub static DATA_ATTR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^data-").expect("DATA_ATTR regex"));

/// Analytics and tracking attribute names.
pub static TRACKING_ATTR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^(?:(?:ga|gtm|fb|pixel|analytics|track|tracking)(?:[-_].*)?|jsaction|jsname|jscontroller|jslog|ping)$",
    )
    .expect("TRACKING_ATTR regex")
});

// =============================================================================
// Fingerprinting
// =============================================================================

/// `class`, `id` and `style` attributes including their values.
pub static IDENTITY_ATTR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)\s(?:class|id|style)\s*=\s*(?:"[^"]*"|'[^']*'|[^\s>]+)"#)
        .expect("IDENTITY_ATTR regex")
});

/// Whitespace between two tags.
pub static INTER_TAG_WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r">\s+<").expect("INTER_TAG_WHITESPACE regex"));

/// Any run of whitespace.
pub static WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("WHITESPACE regex"));

/// Text between a closing `>` and the next `<`.
pub static TEXT_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r">([^<]+)<").expect("TEXT_RUN regex"));

// =============================================================================
// Pattern detection
// =============================================================================

/// Class names suggesting a list, grid or card container.
pub static LIST_CONTAINER_CLASS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)(?:^|[\s_-])(?:list|grid|cards?|items|products|results|tiles|collection)(?:$|[\s_-])",
    )
    .expect("LIST_CONTAINER_CLASS regex")
});
