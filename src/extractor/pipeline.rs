//! Per-element pipeline.
//!
//! Every candidate goes through the same steps:
//!
//! 1. probe: box, position, visibility and content signals;
//! 2. filter: no box or hidden, below the visibility floor, fixed position;
//! 3. score;
//! 4. snapshot the subtree and inspect backgrounds and images;
//! 5. serialize, then derive the clean copy;
//! 6. screenshot (failures are recorded, the component is kept);
//! 7. assemble the component.
//!
//! Only steps 1 to 3 run for nodes the recursive pass ends up not keeping.

use base64::Engine;
use chrono::Utc;
use tracing::debug;
use url::Url;

use crate::browser::{BrowserError, PageSession};
use crate::dedup::fingerprint;
use crate::dom::{collapse_whitespace, ElementProbe, PageContext, Rect};
use crate::html_processing::clean_html;
use crate::images::{collect_images, has_background};
use crate::metrics::ErrorKind;
use crate::options::{ExtractionOptions, ExtractorConfig};
use crate::result::{
    ComponentMetadata, ComponentStyles, ComponentType, Dimensions, ExtractedComponent, Position,
};
use crate::scoring::{ImportanceScorer, ScoreInput};
use crate::serializer::{serialize, SerializeContext};
use crate::style::capture_styles;

use super::state::ExtractionState;

/// Characters of text used in component names.
pub const NAME_TEXT_CHARS: usize = 40;

/// Read-only inputs shared by every element of one run.
#[derive(Debug)]
pub struct RunContext<'a> {
    pub url: &'a Url,
    pub options: &'a ExtractionOptions,
    pub config: &'a ExtractorConfig,
    pub scorer: ImportanceScorer,
    pub page_context: Option<PageContext>,
}

/// A candidate that passed the visibility filters.
#[derive(Debug, Clone)]
pub struct Inspection {
    pub probe: ElementProbe,
    pub rect: Rect,
    /// Importance used for gating, computed even when scoring is disabled.
    pub score: f64,
}

/// Outcome of the filter step.
#[derive(Debug, Clone)]
pub enum Verdict {
    Visible(Inspection),
    Rejected { kind: ErrorKind, reason: String },
}

/// Apply the visibility filters to a probe and score the survivors.
#[must_use]
pub fn inspect(probe: ElementProbe, floor: f64, scorer: &ImportanceScorer, high_value: bool) -> Verdict {
    let Some(rect) = probe.rect else {
        return Verdict::Rejected {
            kind: ErrorKind::NotVisible,
            reason: format!("<{}> has no layout box", probe.tag),
        };
    };
    if probe.is_hidden() {
        return Verdict::Rejected {
            kind: ErrorKind::NotVisible,
            reason: format!("<{}> is hidden", probe.tag),
        };
    }
    if !rect.meets_floor(floor) {
        return Verdict::Rejected {
            kind: ErrorKind::TooSmall,
            reason: format!("<{}> is {:.0}x{:.0}px", probe.tag, rect.width, rect.height),
        };
    }
    if probe.is_fixed() {
        return Verdict::Rejected {
            kind: ErrorKind::FixedPosition,
            reason: format!("<{}> has position: fixed", probe.tag),
        };
    }

    let score = ScoreInput::from_probe(&probe, high_value).map_or(0.0, |input| scorer.score(&input));
    Verdict::Visible(Inspection { probe, rect, score })
}

/// What to call a component and where it came from.
#[derive(Debug, Clone, Copy)]
pub struct Target<'a> {
    pub kind: ComponentType,
    pub selector: &'a str,
}

/// Why building a component stopped.
#[derive(Debug)]
pub enum BuildError {
    /// The element was skipped and recorded.
    Skipped,
    /// The session is gone; the run cannot continue.
    Fatal(BrowserError),
}

/// Snapshot, serialize and assemble one component.
///
/// Recoverable failures are recorded in `state` and reported as
/// [`BuildError::Skipped`]. A failed screenshot is recorded but the
/// component is still returned.
pub async fn build_component<P: PageSession>(
    page: &P,
    ctx: &RunContext<'_>,
    state: &mut ExtractionState,
    element: &P::Element,
    inspection: &Inspection,
    target: Target<'_>,
) -> Result<ExtractedComponent, BuildError> {
    let snapshot = match page.snapshot(element).await {
        Ok(snapshot) => snapshot,
        Err(BrowserError::Closed) => return Err(BuildError::Fatal(BrowserError::Closed)),
        Err(err) => {
            state.record(ErrorKind::ElementError, err.to_string(), Some(target.selector));
            return Err(BuildError::Skipped);
        }
    };
    if let Some(error) = &snapshot.error {
        state.record(ErrorKind::ElementError, error.clone(), Some(target.selector));
        return Err(BuildError::Skipped);
    }

    let background = has_background(&snapshot);
    let images = collect_images(&snapshot, ctx.url);

    let rules = if ctx.config.include_stylesheet_rules {
        match page.matched_rules(element, ctx.config.max_stylesheet_rules).await {
            Ok(rules) => rules,
            Err(BrowserError::Closed) => return Err(BuildError::Fatal(BrowserError::Closed)),
            Err(err) => {
                debug!(selector = target.selector, error = %err, "stylesheet rules unavailable");
                Vec::new()
            }
        }
    } else {
        Vec::new()
    };

    let fragment = serialize(
        &snapshot,
        &SerializeContext {
            base: ctx.url,
            rules: &rules,
        },
    );
    if fragment.is_empty() {
        state.record(
            ErrorKind::EmptyHtml,
            format!("<{}> serialized to nothing", snapshot.tag),
            Some(target.selector),
        );
        return Err(BuildError::Skipped);
    }
    let dimensions = Dimensions {
        width: inspection.rect.width,
        height: inspection.rect.height,
    };
    // Matched rules differ between otherwise identical siblings.
    let structure = fingerprint(target.kind, &fragment.markup, dimensions);
    let html = fragment.into_html();
    let clean = clean_html(&html);

    let screenshot = if ctx.options.skip_screenshots {
        String::new()
    } else {
        match page.screenshot(element).await {
            Ok(png) => encode_png(&png),
            Err(BrowserError::Closed) => return Err(BuildError::Fatal(BrowserError::Closed)),
            Err(err) => {
                state.record(ErrorKind::ScreenshotError, err.to_string(), Some(target.selector));
                String::new()
            }
        }
    };

    let importance = if ctx.options.dynamic_scoring {
        inspection.score
    } else {
        0.0
    };

    Ok(ExtractedComponent {
        kind: target.kind,
        name: component_name(target.kind, &snapshot.text_content(), state.next_ordinal()),
        html,
        clean_html: clean,
        screenshot,
        styles: ComponentStyles {
            properties: capture_styles(&snapshot),
            page_context: ctx.page_context.clone(),
        },
        metadata: ComponentMetadata {
            tag_name: snapshot.tag.clone(),
            class_list: snapshot.class_list(),
            dimensions,
            position: Position {
                x: inspection.rect.x,
                y: inspection.rect.y,
            },
            importance,
            has_background_image: background.present,
            background_image_url: background
                .url
                .map(|url| crate::url_utils::create_absolute_url(&url, ctx.url)),
            images,
            source_url: ctx.url.to_string(),
            selector: target.selector.to_string(),
            fingerprint: Some(structure),
            extracted_at: Utc::now(),
        },
    })
}

/// `"{Label}: {text}"`, or `"{Label} #{n}"` for components without text.
#[must_use]
pub fn component_name(kind: ComponentType, text: &str, ordinal: usize) -> String {
    let text = collapse_whitespace(text);
    if text.is_empty() {
        return format!("{} #{ordinal}", kind.label());
    }
    let short: String = text.chars().take(NAME_TEXT_CHARS).collect();
    let short = short.trim_end();
    if text.chars().count() > NAME_TEXT_CHARS {
        format!("{}: {short}…", kind.label())
    } else {
        format!("{}: {short}", kind.label())
    }
}

/// `data:` URL for a PNG capture.
#[must_use]
pub fn encode_png(png: &[u8]) -> String {
    if png.is_empty() {
        return String::new();
    }
    format!(
        "data:image/png;base64,{}",
        base64::engine::general_purpose::STANDARD.encode(png)
    )
}
