//! Configuration for component extraction.
//!
//! Two layers of configuration exist:
//!
//! - [`ExtractionOptions`] is supplied per call. Its JSON serialization is part
//!   of the result cache key, so two calls with equal options share a cache entry.
//! - [`ExtractorConfig`] is fixed for the lifetime of an [`Extractor`](crate::Extractor)
//!   and tunes thresholds, budgets and resource limits.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::result::ComponentType;

/// Per-call extraction options.
///
/// All fields are public for easy configuration. Use `Default::default()`
/// for standard settings.
///
/// # Example
///
/// ```rust
/// use component_extractor::ExtractionOptions;
///
/// let options = ExtractionOptions {
///     max_components: 20,
///     skip_screenshots: true,
///     ..ExtractionOptions::default()
/// };
/// assert_eq!(options.max_depth, 3);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
#[allow(clippy::struct_excessive_bools)]
pub struct ExtractionOptions {
    /// Upper bound on the number of returned components.
    ///
    /// Default: `50`
    pub max_components: usize,

    /// Restrict extraction to these catalog type names (e.g. `"buttons"`).
    ///
    /// Unknown names are ignored. `None` extracts every type.
    ///
    /// Default: `None`
    pub component_types: Option<Vec<String>>,

    /// Skip per-component screenshots.
    ///
    /// Default: `false`
    pub skip_screenshots: bool,

    /// Depth bound for the recursive main-content pass.
    ///
    /// Default: `3`
    pub max_depth: usize,

    /// Hard wall-clock budget for the whole operation, in milliseconds.
    ///
    /// Default: `60000`
    #[serde(rename = "timeout")]
    pub timeout_ms: u64,

    /// Run the recursive pass over the main content container.
    ///
    /// Default: `true`
    pub extract_main_content: bool,

    /// Compute importance scores. When disabled, output keeps traversal order
    /// and every score is `0`.
    ///
    /// Default: `true`
    pub dynamic_scoring: bool,
}

impl Default for ExtractionOptions {
    fn default() -> Self {
        Self {
            max_components: 50,
            component_types: None,
            skip_screenshots: false,
            max_depth: 3,
            timeout_ms: 60_000,
            extract_main_content: true,
            dynamic_scoring: true,
        }
    }
}

impl ExtractionOptions {
    /// Wall-clock budget as a `Duration`.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Parsed type filter. `None` means every type is allowed.
    ///
    /// Names that do not correspond to a known type are dropped.
    #[must_use]
    pub fn type_filter(&self) -> Option<Vec<ComponentType>> {
        self.component_types.as_ref().map(|names| {
            names
                .iter()
                .filter_map(|name| name.parse::<ComponentType>().ok())
                .collect()
        })
    }

    /// Whether components of `kind` should be extracted.
    #[must_use]
    pub fn allows(&self, kind: ComponentType) -> bool {
        self.type_filter().is_none_or(|types| types.contains(&kind))
    }

    /// Stable string used as the options half of the cache key.
    #[must_use]
    pub fn cache_key(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

/// Engine-wide configuration.
///
/// # Example
///
/// ```rust
/// use component_extractor::ExtractorConfig;
/// use std::time::Duration;
///
/// let config = ExtractorConfig {
///     cache_ttl: Duration::from_secs(60),
///     max_concurrent_sessions: 2,
///     ..ExtractorConfig::default()
/// };
/// assert_eq!(config.visibility_floor, 10.0);
/// ```
#[derive(Debug, Clone)]
pub struct ExtractorConfig {
    /// How long a cached result stays valid.
    ///
    /// Default: 5 minutes
    pub cache_ttl: Duration,

    /// Maximum number of browser sessions open at the same time.
    ///
    /// Default: `4`
    pub max_concurrent_sessions: usize,

    /// Number of recent metrics records kept in history.
    ///
    /// Default: `20`
    pub metrics_history_limit: usize,

    /// Minimum width and height (px) of a visible component.
    ///
    /// Default: `10.0`
    pub visibility_floor: f64,

    /// Elements processed between yields to the runtime.
    ///
    /// Default: `5`
    pub batch_size: usize,

    /// Cap on instances extracted per detected (dynamic) selector.
    ///
    /// Default: `10`
    pub dynamic_selector_cap: usize,

    /// Recursively discovered nodes without images are kept only above this score.
    ///
    /// Default: `40.0`
    pub recursive_keep_threshold: f64,

    /// Nodes scoring above this keep the full depth budget for their children.
    ///
    /// Default: `60.0`
    pub recursive_expand_threshold: f64,

    /// Depth budget granted to children of low-importance nodes.
    ///
    /// Default: `1`
    pub reduced_depth: usize,

    /// Hard cap on nodes visited by the recursive pass.
    ///
    /// Default: `400`
    pub max_recursive_nodes: usize,

    /// Components scoring above this survive fingerprint collisions.
    ///
    /// Default: `70.0`
    pub dedup_keep_threshold: f64,

    /// Append matching same-origin stylesheet rules to each fragment.
    ///
    /// Default: `true`
    pub include_stylesheet_rules: bool,

    /// Maximum stylesheet rules collected per component.
    ///
    /// Default: `200`
    pub max_stylesheet_rules: usize,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            cache_ttl: Duration::from_secs(300),
            max_concurrent_sessions: 4,
            metrics_history_limit: 20,
            visibility_floor: 10.0,
            batch_size: 5,
            dynamic_selector_cap: 10,
            recursive_keep_threshold: 40.0,
            recursive_expand_threshold: 60.0,
            reduced_depth: 1,
            max_recursive_nodes: 400,
            dedup_keep_threshold: 70.0,
            include_stylesheet_rules: true,
            max_stylesheet_rules: 200,
        }
    }
}
