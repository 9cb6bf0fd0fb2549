//! Error types for component-extractor.
//!
//! This module defines the errors returned by [`Extractor::extract`](crate::Extractor::extract).
//! Failures scoped to a single element or selector never surface here; they are
//! recorded in [`ExtractionMetrics::errors`](crate::ExtractionMetrics) instead.

use crate::browser::BrowserError;

/// Error type for extraction operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The URL was rejected before any browser work started.
    #[error("Invalid URL {url:?}: {reason}")]
    InvalidUrl {
        /// The rejected input.
        url: String,
        /// Why it was rejected.
        reason: String,
    },

    /// The wall-clock budget for the whole operation was exceeded.
    #[error("Extraction timed out after {timeout_ms} ms")]
    Timeout {
        /// The budget that was exceeded.
        timeout_ms: u64,
    },

    /// The target page could not be loaded.
    #[error("Navigation to {url} failed: {source}")]
    Navigation {
        /// The page that failed to load.
        url: String,
        /// Underlying browser failure.
        #[source]
        source: BrowserError,
    },

    /// A browser session could not be opened.
    #[error("Browser unavailable: {0}")]
    Browser(#[from] BrowserError),

    /// Any other unrecoverable failure, wrapped with context.
    #[error("Extraction failed while {context}: {source}")]
    Extraction {
        /// What the extractor was doing.
        context: String,
        /// Underlying cause.
        #[source]
        source: BrowserError,
    },
}

impl Error {
    pub(crate) fn invalid_url(url: &str, reason: impl Into<String>) -> Self {
        Self::InvalidUrl {
            url: url.to_string(),
            reason: reason.into(),
        }
    }

    /// Whether the caller may reasonably retry the same request.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Timeout { .. } | Self::Navigation { .. } | Self::Browser(_))
    }
}

/// Result type alias for extraction operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_url_message_includes_input() {
        let err = Error::invalid_url("ftp://example.com", "scheme must be http or https");
        let msg = err.to_string();
        assert!(msg.contains("ftp://example.com"));
        assert!(msg.contains("http or https"));
        assert!(!err.is_retryable());
    }

    #[test]
    fn timeout_is_retryable() {
        let err = Error::Timeout { timeout_ms: 1 };
        assert!(err.is_retryable());
        assert_eq!(err.to_string(), "Extraction timed out after 1 ms");
    }
}
