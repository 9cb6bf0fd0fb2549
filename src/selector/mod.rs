//! Selector Catalog
//!
//! The catalog maps component types to CSS selectors. Each entry carries an
//! optional exclusion selector (matches inside an excluded ancestor are
//! skipped), a priority (lower runs first), a high-value flag that feeds the
//! scorer, and an optional per-entry instance cap.
//!
//! Static entries live in [`catalog`]; synthetic entries for repeated
//! sibling structures are produced per page by [`dynamic`].

pub mod catalog;
pub mod dynamic;

use std::fmt;

use crate::options::ExtractionOptions;
use crate::result::ComponentType;

/// Priority assigned to synthetic selectors.
pub const DYNAMIC_PRIORITY: u8 = 2;

/// Where a catalog entry came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectorOrigin {
    /// Built into the catalog.
    Static,
    /// Produced by the pattern detector for the current page.
    Dynamic,
}

/// One selector in the traversal plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogEntry {
    /// Type assigned to matches.
    pub kind: ComponentType,

    /// CSS selector, possibly a comma-separated group.
    pub selector: String,

    /// Matches with an ancestor (or self) matching this selector are skipped.
    pub exclude: Option<String>,

    /// Lower runs first.
    pub priority: u8,

    /// Matches earn the high-value scoring bonus.
    pub high_value: bool,

    /// At most this many instances are extracted for the entry.
    pub max_instances: Option<usize>,

    pub origin: SelectorOrigin,
}

impl CatalogEntry {
    /// Static entry without exclusion or cap.
    #[must_use]
    pub fn new(kind: ComponentType, selector: &str, priority: u8) -> Self {
        Self {
            kind,
            selector: selector.to_string(),
            exclude: None,
            priority,
            high_value: false,
            max_instances: None,
            origin: SelectorOrigin::Static,
        }
    }

    /// Synthetic entry from pattern detection, capped at `cap` instances.
    #[must_use]
    pub fn dynamic(kind: ComponentType, selector: String, cap: usize) -> Self {
        Self {
            kind,
            selector,
            exclude: None,
            priority: DYNAMIC_PRIORITY,
            high_value: false,
            max_instances: Some(cap),
            origin: SelectorOrigin::Dynamic,
        }
    }

    /// Set the exclusion selector.
    #[must_use]
    pub fn excluding(mut self, exclude: &str) -> Self {
        self.exclude = Some(exclude.to_string());
        self
    }

    /// Flag the entry as high-value.
    #[must_use]
    pub fn high_value(mut self) -> Self {
        self.high_value = true;
        self
    }

    fn sort_key(&self) -> (bool, u8) {
        (!self.high_value, self.priority)
    }
}

impl fmt::Display for CatalogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.kind, self.selector)
    }
}

/// An ordered set of catalog entries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Catalog {
    entries: Vec<CatalogEntry>,
}

impl Default for Catalog {
    fn default() -> Self {
        Self::standard()
    }
}

impl Catalog {
    /// The built-in catalog.
    #[must_use]
    pub fn standard() -> Self {
        Self::new(catalog::standard_entries())
    }

    /// A catalog over explicit entries.
    #[must_use]
    pub fn new(entries: Vec<CatalogEntry>) -> Self {
        Self { entries }
    }

    /// Entries in declaration order.
    #[must_use]
    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    /// Whether the catalog has an entry flagged high-value for `kind`.
    #[must_use]
    pub fn is_high_value(&self, kind: ComponentType) -> bool {
        self.entries.iter().any(|e| e.kind == kind && e.high_value)
    }

    /// Build the traversal plan for one page.
    ///
    /// Static entries are ordered high-value first, then by priority.
    /// Dynamic entries are merged in at their own priority after static
    /// entries of the same rank. Entries whose type the options exclude are
    /// dropped.
    #[must_use]
    pub fn plan(&self, dynamic: Vec<CatalogEntry>, options: &ExtractionOptions) -> Vec<CatalogEntry> {
        let filter = options.type_filter();
        let allowed = |entry: &CatalogEntry| filter.as_ref().is_none_or(|types| types.contains(&entry.kind));

        let mut plan: Vec<CatalogEntry> = self
            .entries
            .iter()
            .filter(|entry| allowed(entry))
            .cloned()
            .collect();
        plan.sort_by_key(CatalogEntry::sort_key);

        let mut dynamic: Vec<CatalogEntry> = dynamic.into_iter().filter(|entry| allowed(entry)).collect();
        dynamic.retain(|entry| !plan.iter().any(|existing| existing.selector == entry.selector));

        plan.extend(dynamic);
        plan.sort_by_key(CatalogEntry::sort_key);
        plan
    }
}
