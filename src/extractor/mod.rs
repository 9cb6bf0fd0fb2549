//! Extraction engine.
//!
//! # Module Structure
//!
//! - `state`: Run state (phase, budget, counters and error records)
//! - `pipeline`: Per-element pipeline (filter, score, snapshot, serialize, name)
//! - `traversal`: Selector pass and depth-bounded recursive pass
//!
//! [`Extractor`] ties these together. One call owns one page from open to
//! close; concurrent calls are bounded by a session semaphore and share the
//! result cache and metrics history.
//!
//! # Usage
//!
//! ```rust,ignore
//! use component_extractor::{ChromiumBackend, ChromiumConfig, ExtractionOptions, Extractor};
//!
//! let backend = ChromiumBackend::launch(ChromiumConfig::default()).await?;
//! let extractor = Extractor::new(backend);
//! let result = extractor.extract("https://example.com", &ExtractionOptions::default()).await?;
//! for component in &result.components {
//!     println!("{} {:.0}", component.name, component.importance());
//! }
//! ```

pub mod pipeline;
pub mod state;
pub mod traversal;

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tokio::time::{timeout, timeout_at, Instant};
use tracing::{debug, info, instrument, warn};
use url::Url;

use crate::browser::{BrowserBackend, BrowserError, PageSession};
use crate::cache::{CacheKey, ResultCache};
use crate::dedup::{deduplicate, rank};
use crate::error::{Error, Result};
use crate::metrics::{ErrorKind, ExtractionMetrics, MetricsHistory};
use crate::options::{ExtractionOptions, ExtractorConfig};
use crate::result::ExtractionResult;
use crate::scoring::ImportanceScorer;
use crate::selector::dynamic::detect_patterns;
use crate::selector::Catalog;
use crate::style;
use crate::url_utils::validate_page_url;

pub use pipeline::{inspect, Inspection, RunContext, Verdict};
pub use state::{ExtractionState, Phase};

/// Upper bound on releasing a page once a run is over.
const CLOSE_TIMEOUT: Duration = Duration::from_secs(5);

/// Component extractor over a browser backend.
///
/// Cloning is cheap; clones share the backend, cache, history and session pool.
pub struct Extractor<B: BrowserBackend> {
    inner: Arc<Inner<B>>,
}

struct Inner<B> {
    backend: Arc<B>,
    config: ExtractorConfig,
    catalog: Catalog,
    cache: ResultCache,
    history: MetricsHistory,
    sessions: Semaphore,
}

impl<B: BrowserBackend> Clone for Extractor<B> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<B: BrowserBackend> std::fmt::Debug for Extractor<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Extractor")
            .field("config", &self.inner.config)
            .field("cached", &self.inner.cache.len())
            .finish_non_exhaustive()
    }
}

impl<B: BrowserBackend> Extractor<B> {
    /// Extractor with the default configuration and the standard catalog.
    #[must_use]
    pub fn new(backend: B) -> Self {
        Self::with_config(backend, ExtractorConfig::default())
    }

    #[must_use]
    pub fn with_config(backend: B, config: ExtractorConfig) -> Self {
        Self::from_shared(Arc::new(backend), config)
    }

    /// Extractor over a backend shared with other owners.
    #[must_use]
    pub fn from_shared(backend: Arc<B>, config: ExtractorConfig) -> Self {
        Self::with_parts(backend, config, Catalog::standard())
    }

    /// Extractor with a custom selector catalog.
    #[must_use]
    pub fn with_parts(backend: Arc<B>, config: ExtractorConfig, catalog: Catalog) -> Self {
        let permits = config.max_concurrent_sessions.max(1);
        Self {
            inner: Arc::new(Inner {
                backend,
                cache: ResultCache::new(config.cache_ttl),
                history: MetricsHistory::new(config.metrics_history_limit),
                sessions: Semaphore::new(permits),
                catalog,
                config,
            }),
        }
    }

    #[must_use]
    pub fn config(&self) -> &ExtractorConfig {
        &self.inner.config
    }

    #[must_use]
    pub fn catalog(&self) -> &Catalog {
        &self.inner.catalog
    }

    #[must_use]
    pub fn cache(&self) -> &ResultCache {
        &self.inner.cache
    }

    /// Metrics of recent runs, failures included.
    #[must_use]
    pub fn metrics_history(&self) -> &MetricsHistory {
        &self.inner.history
    }

    #[must_use]
    pub fn backend(&self) -> &Arc<B> {
        &self.inner.backend
    }

    /// Extract components from `url`.
    ///
    /// The URL is validated before any browser work. Cached results for the
    /// same `(url, options)` are returned with `cache_hit` set. The page is
    /// closed on every exit path, and no partial result is returned when the
    /// time budget runs out.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidUrl`] for anything but an absolute http(s) URL
    /// - [`Error::Timeout`] when `options.timeout_ms` elapses
    /// - [`Error::Navigation`] when the page cannot be loaded
    /// - [`Error::Browser`] when no page can be opened
    /// - [`Error::Extraction`] when the session dies mid-run
    #[instrument(skip(self, options), fields(max_components = options.max_components))]
    pub async fn extract(&self, url: &str, options: &ExtractionOptions) -> Result<ExtractionResult> {
        let target = validate_page_url(url).map_err(|reason| Error::invalid_url(url, reason))?;
        let start = Instant::now();

        let key = CacheKey::new(target.as_str(), options);
        if let Some(entry) = self.inner.cache.get(&key) {
            debug!("cache hit");
            let metrics = entry.metrics.cache_hit(start.elapsed());
            return Ok(ExtractionResult {
                components: entry.components,
                metrics: Some(metrics),
            });
        }

        let deadline = start + options.timeout();
        match self.run(&target, options, start, deadline).await {
            Ok(mut result) => {
                if let Some(metrics) = result.metrics.as_mut() {
                    metrics.set_response_time(start.elapsed());
                    self.inner.history.push(metrics.clone());
                    self.inner.cache.insert(key, result.components.clone(), metrics.clone());
                    info!(
                        components = result.components.len(),
                        failed = metrics.failed_extractions,
                        overall = metrics.overall_accuracy,
                        elapsed_ms = metrics.response_time_ms,
                        "extraction completed"
                    );
                }
                Ok(result)
            }
            Err(err) => {
                let kind = match &err {
                    Error::Timeout { .. } => ErrorKind::Timeout,
                    Error::Navigation { .. } => ErrorKind::NavigationError,
                    _ => ErrorKind::ElementError,
                };
                self.inner
                    .history
                    .push(ExtractionMetrics::failed(target.as_str(), kind, err.to_string(), start.elapsed()));
                warn!(error = %err, "extraction failed");
                Err(err)
            }
        }
    }

    async fn run(
        &self,
        target: &Url,
        options: &ExtractionOptions,
        start: Instant,
        deadline: Instant,
    ) -> Result<ExtractionResult> {
        let timed_out = || Error::Timeout {
            timeout_ms: options.timeout_ms,
        };

        let _permit = timeout_at(deadline, self.inner.sessions.acquire())
            .await
            .map_err(|_| timed_out())?
            .map_err(|_| Error::Browser(BrowserError::Closed))?;

        let opening = self.inner.backend.open_page();
        tokio::pin!(opening);
        let page = match timeout_at(deadline, &mut opening).await {
            Ok(page) => page?,
            Err(_) => {
                // The tab may already exist; let the open finish so it can be closed.
                match timeout(CLOSE_TIMEOUT, opening).await {
                    Ok(Ok(page)) => close_page(&page).await,
                    Ok(Err(err)) => debug!(error = %err, "late page open failed"),
                    Err(_) => warn!("page open still pending after the time budget"),
                }
                return Err(timed_out());
            }
        };

        let outcome = timeout_at(deadline, self.pipeline(&page, target, options, start)).await;
        close_page(&page).await;

        outcome.map_err(|_| timed_out())?
    }

    async fn pipeline(
        &self,
        page: &B::Page,
        target: &Url,
        options: &ExtractionOptions,
        start: Instant,
    ) -> Result<ExtractionResult> {
        let config = &self.inner.config;
        let catalog = &self.inner.catalog;
        let mut state = ExtractionState::new(options.max_components);

        state.enter(Phase::LoadingPage);
        page.navigate(target.as_str())
            .await
            .map_err(|source| Error::Navigation {
                url: target.to_string(),
                source,
            })?;

        let viewport = match page.viewport().await {
            Ok(viewport) => viewport,
            Err(BrowserError::Closed) => return Err(fatal(state.phase(), BrowserError::Closed)),
            Err(err) => {
                warn!(error = %err, "viewport unavailable, using default");
                crate::dom::Viewport::default()
            }
        };

        let page_context = match page.page_context().await {
            Ok(context) => Some(context).filter(style::is_meaningful),
            Err(BrowserError::Closed) => return Err(fatal(state.phase(), BrowserError::Closed)),
            Err(err) => {
                debug!(error = %err, "page context unavailable");
                None
            }
        };

        state.enter(Phase::PatternDetection);
        let dynamic = match page.scan_containers().await {
            Ok(scans) => detect_patterns(&scans, config.dynamic_selector_cap),
            Err(BrowserError::Closed) => return Err(fatal(state.phase(), BrowserError::Closed)),
            Err(err) => {
                warn!(error = %err, "pattern detection failed");
                Vec::new()
            }
        };
        debug!(detected = dynamic.len(), "repeated patterns");
        let plan = catalog.plan(dynamic, options);

        let ctx = RunContext {
            url: target,
            options,
            config,
            scorer: ImportanceScorer::new(viewport),
            page_context,
        };

        state.enter(Phase::SelectorPass);
        traversal::selector_pass(page, &ctx, &plan, &mut state)
            .await
            .map_err(|source| fatal(state.phase(), source))?;

        if options.extract_main_content && !state.is_full() && options.max_depth > 0 {
            state.enter(Phase::RecursivePass);
            traversal::recursive_pass(page, &ctx, catalog, &mut state)
                .await
                .map_err(|source| fatal(state.phase(), source))?;
        }

        state.enter(Phase::Dedup);
        let components = deduplicate(state.take_components(), config.dedup_keep_threshold);

        state.enter(Phase::Sort);
        let components = rank(components, options.dynamic_scoring, options.max_components);

        state.enter(Phase::Metrics);
        let stats = std::mem::take(state.stats_mut());
        let metrics = ExtractionMetrics::from_run(target.as_str(), &components, stats, start.elapsed());
        state.enter(Phase::Completed);

        Ok(ExtractionResult {
            components,
            metrics: Some(metrics),
        })
    }
}

async fn close_page<P: PageSession>(page: &P) {
    match timeout(CLOSE_TIMEOUT, page.close()).await {
        Ok(Ok(())) => debug!("page closed"),
        Ok(Err(err)) => warn!(error = %err, "page close failed"),
        Err(_) => warn!("page close timed out"),
    }
}

fn fatal(phase: Phase, source: BrowserError) -> Error {
    Error::Extraction {
        context: phase.to_string(),
        source,
    }
}
