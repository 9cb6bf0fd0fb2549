//! Extraction metrics.
//!
//! Accuracy figures are a self-reported capture-fidelity heuristic: each
//! extracted component is checked against the tolerances its fragment is
//! supposed to honour (offsets neutralized within 2px, pinned size within
//! 1%, spacing in pixels, colors in a parseable form, typography in pixels),
//! with partial credit outside the tolerance. No second render is compared.
//!
//! Composite scores are fixed blends of the sub-scores:
//!
//! - `layout = 0.3·position + 0.3·dimension + 0.2·spacing + 0.2·alignment`,
//!   or `0.375·position + 0.375·dimension + 0.25·spacing` without alignment data
//! - `style = 0.6·color + 0.4·typography`
//! - `content = 0.5·typography + 0.5·dimension`
//! - `overall = 0.4·layout + 0.4·style + 0.2·content`

use std::collections::VecDeque;
use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::patterns::{HEX_COLOR, PX_VALUE, RGB_COLOR};
use crate::result::ExtractedComponent;
use crate::serializer::format_px_number;
use crate::style::{ALIGNMENT_PROPERTIES, SPACING_PROPERTIES};

/// Offset deviation tolerated without penalty, in px.
pub const POSITION_TOLERANCE_PX: f64 = 2.0;

/// Relative size deviation tolerated without penalty.
pub const DIMENSION_TOLERANCE: f64 = 0.01;

const COLOR_PROPERTIES: &[&str] = &["color", "background-color"];
const TYPOGRAPHY_PROPERTIES: &[&str] = &["font-size", "line-height", "letter-spacing"];
const CSS_WIDE_KEYWORDS: &[&str] = &["initial", "inherit", "unset", "revert"];

/// Category of a recoverable failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Bounding box below the visibility floor.
    TooSmall,
    /// No bounding box, or hidden by `display` / `visibility`.
    NotVisible,
    /// Computed `position: fixed`.
    FixedPosition,
    /// Serialization produced no markup.
    EmptyHtml,
    /// The browser failed while processing one element.
    ElementError,
    /// A catalog selector could not be evaluated.
    SelectorError,
    /// Screenshot capture failed; the component is kept.
    ScreenshotError,
    /// The page could not be loaded.
    NavigationError,
    /// The wall-clock budget ran out.
    Timeout,
}

impl ErrorKind {
    /// Wire name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::TooSmall => "too_small",
            Self::NotVisible => "not_visible",
            Self::FixedPosition => "fixed_position",
            Self::EmptyHtml => "empty_html",
            Self::ElementError => "element_error",
            Self::SelectorError => "selector_error",
            Self::ScreenshotError => "screenshot_error",
            Self::NavigationError => "navigation_error",
            Self::Timeout => "timeout",
        }
    }

    /// Whether the record stands for a skipped component.
    #[must_use]
    pub fn is_skip(self) -> bool {
        matches!(
            self,
            Self::TooSmall | Self::NotVisible | Self::FixedPosition | Self::EmptyHtml | Self::ElementError
        )
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One recorded recoverable failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorRecord {
    #[serde(rename = "type")]
    pub kind: ErrorKind,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selector: Option<String>,
}

/// Counters and error records accumulated during one run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunStats {
    /// Elements that entered the per-element pipeline.
    pub total_elements: usize,

    /// Elements skipped by a filter or a failure.
    pub failed_extractions: usize,

    pub errors: Vec<ErrorRecord>,
}

impl RunStats {
    /// Count one element entering the pipeline.
    pub fn saw_element(&mut self) {
        self.total_elements += 1;
    }

    /// Record a failure. Skip kinds also count as failed extractions.
    pub fn record(&mut self, kind: ErrorKind, message: impl Into<String>, selector: Option<&str>) {
        if kind.is_skip() {
            self.failed_extractions += 1;
        }
        self.errors.push(ErrorRecord {
            kind,
            message: message.into(),
            selector: selector.map(str::to_string),
        });
    }

    /// Number of records of `kind`.
    #[must_use]
    pub fn count(&self, kind: ErrorKind) -> usize {
        self.errors.iter().filter(|e| e.kind == kind).count()
    }
}

/// Sub-scores of one component, each in `[0, 100]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ComponentScores {
    pub position: f64,
    pub dimension: f64,
    pub spacing: f64,
    pub color: f64,
    pub typography: f64,
    /// Absent when the component has no alignment properties.
    pub alignment: Option<f64>,
}

/// Summary of one extraction call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionMetrics {
    /// The requested page.
    pub url: String,

    /// When the record was produced.
    pub timestamp: DateTime<Utc>,

    /// Time spent extracting, excluding cache lookup.
    pub extraction_time_ms: u64,

    /// Time from call to return.
    pub response_time_ms: u64,

    /// Whether the result was served from cache.
    pub cache_hit: bool,

    pub position_accuracy: f64,
    pub dimension_accuracy: f64,
    pub spacing_accuracy: f64,
    pub color_accuracy: f64,
    pub typography_accuracy: f64,
    pub alignment_accuracy: Option<f64>,

    pub layout_accuracy: f64,
    pub style_accuracy: f64,
    pub content_accuracy: f64,
    pub overall_accuracy: f64,

    pub total_elements: usize,
    pub extracted_components: usize,
    pub failed_extractions: usize,

    pub errors: Vec<ErrorRecord>,
}

impl ExtractionMetrics {
    /// Metrics for a completed run.
    #[must_use]
    pub fn from_run(url: &str, components: &[ExtractedComponent], stats: RunStats, elapsed: Duration) -> Self {
        let per_component: Vec<ComponentScores> = components.iter().map(score_component).collect();

        let position = mean(per_component.iter().map(|s| s.position));
        let dimension = mean(per_component.iter().map(|s| s.dimension));
        let spacing = mean(per_component.iter().map(|s| s.spacing));
        let color = mean(per_component.iter().map(|s| s.color));
        let typography = mean(per_component.iter().map(|s| s.typography));
        let alignment_values: Vec<f64> = per_component.iter().filter_map(|s| s.alignment).collect();
        let alignment = (!alignment_values.is_empty()).then(|| mean(alignment_values.into_iter()));

        let layout = layout_accuracy(position, dimension, spacing, alignment);
        let style = style_accuracy(color, typography);
        let content = content_accuracy(typography, dimension);
        let elapsed_ms = millis(elapsed);

        Self {
            url: url.to_string(),
            timestamp: Utc::now(),
            extraction_time_ms: elapsed_ms,
            response_time_ms: elapsed_ms,
            cache_hit: false,
            position_accuracy: position,
            dimension_accuracy: dimension,
            spacing_accuracy: spacing,
            color_accuracy: color,
            typography_accuracy: typography,
            alignment_accuracy: alignment,
            layout_accuracy: layout,
            style_accuracy: style,
            content_accuracy: content,
            overall_accuracy: overall_accuracy(layout, style, content),
            total_elements: stats.total_elements,
            extracted_components: components.len(),
            failed_extractions: stats.failed_extractions,
            errors: stats.errors,
        }
    }

    /// Metrics for a failed run: every accuracy is zero.
    #[must_use]
    pub fn failed(url: &str, kind: ErrorKind, message: impl Into<String>, elapsed: Duration) -> Self {
        let mut stats = RunStats::default();
        stats.record(kind, message, None);
        Self::from_run(url, &[], stats, elapsed)
    }

    /// Copy served from cache, with a fresh response time.
    #[must_use]
    pub fn cache_hit(&self, response_time: Duration) -> Self {
        Self {
            cache_hit: true,
            response_time_ms: millis(response_time),
            timestamp: Utc::now(),
            ..self.clone()
        }
    }

    /// Set the end-to-end response time.
    pub fn set_response_time(&mut self, response_time: Duration) {
        self.response_time_ms = millis(response_time);
    }
}

/// `0.3·position + 0.3·dimension + 0.2·spacing + 0.2·alignment`, re-weighted
/// to `0.375 / 0.375 / 0.25` when there is no alignment data.
#[must_use]
pub fn layout_accuracy(position: f64, dimension: f64, spacing: f64, alignment: Option<f64>) -> f64 {
    match alignment {
        Some(alignment) => 0.3 * position + 0.3 * dimension + 0.2 * spacing + 0.2 * alignment,
        None => 0.375 * position + 0.375 * dimension + 0.25 * spacing,
    }
}

/// `0.6·color + 0.4·typography`.
#[must_use]
pub fn style_accuracy(color: f64, typography: f64) -> f64 {
    0.6 * color + 0.4 * typography
}

/// `0.5·typography + 0.5·dimension`.
#[must_use]
pub fn content_accuracy(typography: f64, dimension: f64) -> f64 {
    0.5 * typography + 0.5 * dimension
}

/// `0.4·layout + 0.4·style + 0.2·content`.
#[must_use]
pub fn overall_accuracy(layout: f64, style: f64, content: f64) -> f64 {
    0.4 * layout + 0.4 * style + 0.2 * content
}

/// Sub-scores for one component.
#[must_use]
pub fn score_component(component: &ExtractedComponent) -> ComponentScores {
    let styles = &component.styles.properties;
    let get = |name: &str| styles.get(name).map(String::as_str);

    let position = match get("position") {
        None | Some("static") => 100.0,
        Some(_) => {
            let offsets = ["top", "left"].map(|side| match get(side).and_then(parse_px) {
                Some(px) => tolerance_score(px.abs(), POSITION_TOLERANCE_PX),
                None => 100.0,
            });
            mean(offsets.into_iter())
        }
    };

    let dims = component.metadata.dimensions;
    let dimension = if dims.width <= 0.0 || dims.height <= 0.0 {
        0.0
    } else {
        let sides = [dims.width, dims.height].map(|side| {
            let written: f64 = format_px_number(side).parse().unwrap_or(0.0);
            tolerance_score((written - side).abs() / side, DIMENSION_TOLERANCE)
        });
        mean(sides.into_iter())
    };

    let spacing = share_matching(styles, SPACING_PROPERTIES, |v| parse_px(v).is_some());
    let color = share_matching(styles, COLOR_PROPERTIES, is_parseable_color);
    let typography = share_matching(styles, TYPOGRAPHY_PROPERTIES, |v| v == "normal" || parse_px(v).is_some());

    let alignment = ALIGNMENT_PROPERTIES
        .iter()
        .any(|p| styles.contains_key(*p))
        .then(|| share_matching(styles, ALIGNMENT_PROPERTIES, |v| !CSS_WIDE_KEYWORDS.contains(&v)));

    ComponentScores {
        position,
        dimension,
        spacing,
        color,
        typography,
        alignment,
    }
}

/// Full credit within `tolerance`, decaying as `tolerance / deviation` beyond it.
#[must_use]
pub fn tolerance_score(deviation: f64, tolerance: f64) -> f64 {
    if !deviation.is_finite() {
        return 0.0;
    }
    if deviation <= tolerance {
        100.0
    } else {
        100.0 * tolerance / deviation
    }
}

fn share_matching(
    styles: &std::collections::BTreeMap<String, String>,
    properties: &[&str],
    ok: impl Fn(&str) -> bool,
) -> f64 {
    let present: Vec<&str> = properties
        .iter()
        .filter_map(|p| styles.get(*p))
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .collect();
    if present.is_empty() {
        return 100.0;
    }
    let good = present.iter().copied().filter(|v| ok(v)).count();
    percent(good, present.len())
}

fn parse_px(value: &str) -> Option<f64> {
    if value.trim() == "0" {
        return Some(0.0);
    }
    PX_VALUE.captures(value)?.get(1)?.as_str().parse().ok()
}

fn is_parseable_color(value: &str) -> bool {
    value == "transparent" || RGB_COLOR.is_match(value) || HEX_COLOR.is_match(value)
}

#[allow(clippy::cast_precision_loss)]
fn percent(part: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        part as f64 / total as f64 * 100.0
    }
}

#[allow(clippy::cast_precision_loss)]
fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, n) = values.fold((0.0, 0usize), |(sum, n), v| (sum + v, n + 1));
    if n == 0 {
        0.0
    } else {
        sum / n as f64
    }
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// Bounded most-recent-first history of metrics records.
#[derive(Debug)]
pub struct MetricsHistory {
    limit: usize,
    records: Mutex<VecDeque<ExtractionMetrics>>,
}

impl MetricsHistory {
    /// History keeping at most `limit` records.
    #[must_use]
    pub fn new(limit: usize) -> Self {
        Self {
            limit,
            records: Mutex::new(VecDeque::with_capacity(limit)),
        }
    }

    /// Add a record, evicting the oldest beyond the limit.
    pub fn push(&self, metrics: ExtractionMetrics) {
        if self.limit == 0 {
            return;
        }
        let mut records = self.records.lock();
        records.push_front(metrics);
        records.truncate(self.limit);
    }

    /// Records, most recent first.
    #[must_use]
    pub fn snapshot(&self) -> Vec<ExtractionMetrics> {
        self.records.lock().iter().cloned().collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }

    pub fn clear(&self) {
        self.records.lock().clear();
    }
}
