//! # component-extractor
//!
//! Headless-browser UI component extraction.
//!
//! Given a page URL, the extractor loads the page in a browser session,
//! finds UI components (heroes, cards, navigation, pricing tables, buttons
//! and so on), scores their visual importance, and serializes each one into
//! a self-contained HTML fragment with its computed styles inlined. Results
//! are deduplicated, ranked, cached per `(url, options)`, and summarized by
//! fidelity metrics.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! # #[cfg(feature = "chromium")]
//! # async fn run() -> component_extractor::Result<()> {
//! use component_extractor::{extract_components, ExtractionOptions};
//!
//! let options = ExtractionOptions {
//!     max_components: 20,
//!     skip_screenshots: true,
//!     ..ExtractionOptions::default()
//! };
//! let result = extract_components("https://example.com", &options).await?;
//! for component in &result.components {
//!     println!("{:>5.1}  {}", component.importance(), component.name);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! For repeated extractions, keep one [`Extractor`] around: it owns the
//! browser backend, the result cache, the metrics history and the session
//! pool.
//!
//! ## Features
//!
//! - **Detection**: a priority-ordered selector catalog plus repeated-pattern
//!   detection for grids and lists
//! - **Scoring**: position, size, imagery, text and structure heuristics
//! - **Serialization**: inlined computed styles, absolute image URLs, pinned
//!   root size, matched stylesheet rules
//! - **Metrics**: position, dimension, spacing, color and typography accuracy
//!
//! ## Cargo features
//!
//! - `chromium` (default): the [`ChromiumBackend`] over `chromiumoxide`
//! - `cli` (default): the `extract-components` binary

mod error;
mod options;
mod patterns;
mod result;

/// Browser capability traits and backends.
pub mod browser;

/// Time-bounded result cache.
pub mod cache;

/// Structural fingerprints, deduplication and ranking.
pub mod dedup;

/// Plain-data DOM snapshot model.
pub mod dom;

/// Extraction engine (traversal, per-element pipeline, orchestration).
pub mod extractor;

/// Fragment cleaning.
pub mod html_processing;

/// Background and foreground image inspection.
pub mod images;

/// Fidelity metrics and run history.
pub mod metrics;

/// Importance scoring.
pub mod scoring;

/// Selector catalog and repeated-pattern detection.
pub mod selector;

/// Style-preserving fragment serialization.
pub mod serializer;

/// Computed style capture.
pub mod style;

/// URL utilities for validation and resolution.
pub mod url_utils;

// Public API - re-exports
pub use browser::{BrowserBackend, BrowserError, PageSession};
pub use error::{Error, Result};
pub use extractor::Extractor;
pub use metrics::{ErrorKind, ErrorRecord, ExtractionMetrics};
pub use options::{ExtractionOptions, ExtractorConfig};
pub use result::{
    ComponentMetadata, ComponentStyles, ComponentType, Dimensions, ExtractedComponent, ExtractionResult, ImageInfo,
    ImageKind, Position, UnknownComponentType,
};
pub use selector::{Catalog, CatalogEntry};

#[cfg(feature = "chromium")]
pub use browser::chromium::{ChromiumBackend, ChromiumConfig, ChromiumPage};

/// One-shot extraction with a freshly launched headless Chromium.
///
/// The URL is validated before the browser starts. The browser is shut down
/// before returning, whatever the outcome.
///
/// # Errors
///
/// See [`Extractor::extract`]; launch failures surface as [`Error::Browser`].
#[cfg(feature = "chromium")]
pub async fn extract_components(url: &str, options: &ExtractionOptions) -> Result<ExtractionResult> {
    url_utils::validate_page_url(url).map_err(|reason| Error::invalid_url(url, reason))?;

    let backend = std::sync::Arc::new(ChromiumBackend::launch(ChromiumConfig::default()).await?);
    let extractor = Extractor::from_shared(std::sync::Arc::clone(&backend), ExtractorConfig::default());
    let result = extractor.extract(url, options).await;

    if let Err(err) = backend.shutdown().await {
        tracing::warn!(error = %err, "browser shutdown failed");
    }
    result
}
