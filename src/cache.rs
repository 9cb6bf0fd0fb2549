//! Result cache.
//!
//! Memoizes extraction results per `(url, options)` for a fixed time to live.
//! Expired entries are pruned lazily on read and insert; nothing runs in the
//! background. A miss is always safe.

use std::collections::HashMap;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::time::Instant;
use tracing::debug;

use crate::metrics::ExtractionMetrics;
use crate::options::ExtractionOptions;
use crate::result::ExtractedComponent;

/// Cache key: the page URL and the serialized options.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub url: String,
    pub options: String,
}

impl CacheKey {
    #[must_use]
    pub fn new(url: &str, options: &ExtractionOptions) -> Self {
        Self {
            url: url.to_string(),
            options: options.cache_key(),
        }
    }
}

/// A cached extraction.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// When the entry was stored.
    pub timestamp: Instant,

    pub components: Vec<ExtractedComponent>,

    pub metrics: ExtractionMetrics,
}

/// Process-wide result cache with lazy expiry.
#[derive(Debug)]
pub struct ResultCache {
    ttl: Duration,
    entries: Mutex<HashMap<CacheKey, CacheEntry>>,
}

impl ResultCache {
    /// Empty cache whose entries live for `ttl`.
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Time to live of new entries.
    #[must_use]
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Fresh entry for `key`, pruning expired entries first.
    #[must_use]
    pub fn get(&self, key: &CacheKey) -> Option<CacheEntry> {
        let mut entries = self.entries.lock();
        let now = Instant::now();
        prune(&mut entries, now, self.ttl);
        entries.get(key).cloned()
    }

    /// Store a result. A zero TTL disables caching.
    pub fn insert(&self, key: CacheKey, components: Vec<ExtractedComponent>, metrics: ExtractionMetrics) {
        if self.ttl.is_zero() {
            return;
        }
        let mut entries = self.entries.lock();
        let now = Instant::now();
        prune(&mut entries, now, self.ttl);
        entries.insert(
            key,
            CacheEntry {
                timestamp: now,
                components,
                metrics,
            },
        );
    }

    /// Drop every expired entry; returns how many were removed.
    pub fn prune_expired(&self) -> usize {
        let mut entries = self.entries.lock();
        prune(&mut entries, Instant::now(), self.ttl)
    }

    /// Number of stored entries, including expired ones not yet pruned.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }
}

fn prune(entries: &mut HashMap<CacheKey, CacheEntry>, now: Instant, ttl: Duration) -> usize {
    let before = entries.len();
    entries.retain(|_, entry| now.duration_since(entry.timestamp) < ttl);
    let removed = before - entries.len();
    if removed > 0 {
        debug!(removed, "pruned expired cache entries");
    }
    removed
}
