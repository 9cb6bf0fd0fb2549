//! Browser capability interface.
//!
//! The extractor never talks to a browser engine directly. It opens a
//! [`PageSession`] through a [`BrowserBackend`] and asks narrow questions:
//! query elements, probe them, snapshot their subtree, scan for repeated
//! containers, take screenshots. Answers are plain data from [`crate::dom`].
//!
//! The Chromium implementation lives in [`chromium`] behind the `chromium`
//! feature. Tests substitute an in-memory page.

#[cfg(feature = "chromium")]
pub mod chromium;
pub mod scripts;

use async_trait::async_trait;

use crate::dom::{ContainerScan, ElementProbe, NodeSnapshot, PageContext, Viewport};

/// Errors raised by a browser backend.
#[derive(Debug, thiserror::Error)]
pub enum BrowserError {
    /// The browser process could not be started or reached.
    #[error("Browser launch failed: {0}")]
    Launch(String),

    /// The page could not be loaded.
    #[error("Navigation failed: {0}")]
    Navigation(String),

    /// A selector was rejected by the engine.
    #[error("Invalid selector {selector:?}: {message}")]
    InvalidSelector { selector: String, message: String },

    /// Script evaluation failed or returned nothing.
    #[error("Script evaluation failed: {0}")]
    Script(String),

    /// Screenshot capture failed.
    #[error("Screenshot failed: {0}")]
    Screenshot(String),

    /// A script result did not have the expected shape.
    #[error("Unexpected script result: {0}")]
    Decode(#[from] serde_json::Error),

    /// The page or browser is gone.
    #[error("Browser session closed")]
    Closed,
}

/// One open page.
///
/// Element handles are opaque to the extractor and only valid for the
/// session that produced them.
#[async_trait]
pub trait PageSession: Send + Sync {
    /// Engine-specific element handle.
    type Element: Send + Sync;

    /// Load `url` and wait until the page settles.
    async fn navigate(&self, url: &str) -> Result<(), BrowserError>;

    /// Size of the layout viewport.
    async fn viewport(&self) -> Result<Viewport, BrowserError>;

    /// Elements matching `selector`, in document order.
    async fn query_all(&self, selector: &str) -> Result<Vec<Self::Element>, BrowserError>;

    /// Direct element children of `element`.
    async fn children(&self, element: &Self::Element) -> Result<Vec<Self::Element>, BrowserError>;

    /// Whether `element` or an ancestor matches `selector`.
    async fn closest(&self, element: &Self::Element, selector: &str) -> Result<bool, BrowserError>;

    /// Cheap per-element facts.
    async fn probe(&self, element: &Self::Element) -> Result<ElementProbe, BrowserError>;

    /// Full subtree snapshot with computed styles.
    async fn snapshot(&self, element: &Self::Element) -> Result<NodeSnapshot, BrowserError>;

    /// Same-origin stylesheet rules whose selector matches the element or a
    /// descendant, at most `limit` of them.
    async fn matched_rules(&self, element: &Self::Element, limit: usize) -> Result<Vec<String>, BrowserError>;

    /// Candidate containers for repeated-pattern detection.
    async fn scan_containers(&self) -> Result<Vec<ContainerScan>, BrowserError>;

    /// Ambient `<body>` styles.
    async fn page_context(&self) -> Result<PageContext, BrowserError>;

    /// PNG capture of the element's box.
    async fn screenshot(&self, element: &Self::Element) -> Result<Vec<u8>, BrowserError>;

    /// Release the page. Called exactly once on every exit path.
    async fn close(&self) -> Result<(), BrowserError>;
}

/// A source of fresh pages.
#[async_trait]
pub trait BrowserBackend: Send + Sync + 'static {
    type Page: PageSession + 'static;

    /// Open a new blank page.
    async fn open_page(&self) -> Result<Self::Page, BrowserError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_errors_convert() {
        let err = serde_json::from_str::<ElementProbe>("[").map(|_| ()).map_err(BrowserError::from);
        assert!(matches!(err, Err(BrowserError::Decode(_))));
    }

    #[test]
    fn selector_error_names_the_selector() {
        let err = BrowserError::InvalidSelector {
            selector: "div[".into(),
            message: "unexpected end".into(),
        };
        assert!(err.to_string().contains("\"div[\""));
    }
}
