//! Importance scoring.
//!
//! A deterministic weighted sum over layout and content signals, capped at
//! 100. The weights live in one versioned [`ScoreWeights`] block so each
//! factor can be tested in isolation.
//!
//! Scores rank the final output and gate the recursive pass: nodes above
//! the keep threshold are retained, nodes above the expand threshold keep
//! the full depth budget for their children.

use crate::dom::{ElementProbe, Rect, Viewport};

/// Tags that earn the structural bonus.
pub const STRUCTURAL_TAGS: &[&str] = &["header", "section", "article", "main", "nav"];

/// Upper bound of every score.
pub const MAX_SCORE: f64 = 100.0;

/// Weights of the importance heuristic.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreWeights {
    /// Version tag, bumped whenever a weight changes.
    pub version: u32,

    /// Full bonus for a node at the top of the page, fading to 0 at one viewport height.
    pub above_fold: f64,

    /// Bonus for a node covering the whole viewport, proportional below that.
    pub area: f64,

    /// Bonus for an image in the subtree or a background on the node.
    pub imagery: f64,

    /// Full bonus at [`ScoreWeights::text_saturation`] characters.
    pub text: f64,

    /// Text length at which the text bonus saturates.
    pub text_saturation: f64,

    /// Bonus for an `h1`-`h3` on or inside the node.
    pub heading: f64,

    /// Bonus for one of [`STRUCTURAL_TAGS`].
    pub structural: f64,

    /// Bonus for matching a high-value catalog entry.
    pub high_value: f64,
}

impl ScoreWeights {
    /// Current weights.
    pub const V1: Self = Self {
        version: 1,
        above_fold: 20.0,
        area: 30.0,
        imagery: 15.0,
        text: 10.0,
        text_saturation: 500.0,
        heading: 15.0,
        structural: 10.0,
        high_value: 20.0,
    };
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self::V1
    }
}

/// Signals the scorer reads for one node.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreInput<'a> {
    pub rect: Rect,
    pub tag: &'a str,
    pub text_length: usize,
    pub has_image: bool,
    pub has_background: bool,
    pub has_heading: bool,
    pub high_value: bool,
}

impl<'a> ScoreInput<'a> {
    /// Build the input from a probe. `None` when the node has no box.
    #[must_use]
    pub fn from_probe(probe: &'a ElementProbe, high_value: bool) -> Option<Self> {
        Some(Self {
            rect: probe.rect?,
            tag: &probe.tag,
            text_length: probe.text_length,
            has_image: probe.has_image,
            has_background: probe.has_background(),
            has_heading: probe.has_heading,
            high_value,
        })
    }
}

/// Per-factor contributions, before capping.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ScoreBreakdown {
    pub above_fold: f64,
    pub area: f64,
    pub imagery: f64,
    pub text: f64,
    pub heading: f64,
    pub structural: f64,
    pub high_value: f64,
}

impl ScoreBreakdown {
    /// Sum of all factors, capped at [`MAX_SCORE`].
    #[must_use]
    pub fn total(&self) -> f64 {
        let sum = self.above_fold
            + self.area
            + self.imagery
            + self.text
            + self.heading
            + self.structural
            + self.high_value;
        sum.clamp(0.0, MAX_SCORE)
    }
}

/// Scores nodes against a fixed viewport.
#[derive(Debug, Clone, Copy)]
pub struct ImportanceScorer {
    viewport: Viewport,
    weights: ScoreWeights,
}

impl ImportanceScorer {
    /// Scorer using the current weights.
    #[must_use]
    pub fn new(viewport: Viewport) -> Self {
        Self::with_weights(viewport, ScoreWeights::default())
    }

    /// Scorer using explicit weights.
    #[must_use]
    pub fn with_weights(viewport: Viewport, weights: ScoreWeights) -> Self {
        Self { viewport, weights }
    }

    /// Weights in use.
    #[must_use]
    pub fn weights(&self) -> ScoreWeights {
        self.weights
    }

    /// Factor-by-factor contributions for one node.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn breakdown(&self, input: &ScoreInput<'_>) -> ScoreBreakdown {
        let w = &self.weights;
        let rect = input.rect;

        let above_fold = if self.viewport.height > 0.0 {
            (1.0 - rect.y / self.viewport.height).max(0.0).min(1.0) * w.above_fold
        } else {
            0.0
        };

        let viewport_area = self.viewport.width * self.viewport.height;
        let area = if viewport_area > 0.0 {
            (rect.area().max(0.0) / viewport_area) * w.area
        } else {
            0.0
        };

        let text = if w.text_saturation > 0.0 {
            (input.text_length as f64 / w.text_saturation).min(1.0) * w.text
        } else {
            0.0
        };

        let flag = |on: bool, weight: f64| if on { weight } else { 0.0 };

        ScoreBreakdown {
            above_fold,
            area,
            imagery: flag(input.has_image || input.has_background, w.imagery),
            text,
            heading: flag(input.has_heading, w.heading),
            structural: flag(STRUCTURAL_TAGS.contains(&input.tag), w.structural),
            high_value: flag(input.high_value, w.high_value),
        }
    }

    /// Importance score in `[0, 100]`.
    #[must_use]
    pub fn score(&self, input: &ScoreInput<'_>) -> f64 {
        self.breakdown(input).total()
    }
}
