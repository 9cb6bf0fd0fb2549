//! Chromium backend built on `chromiumoxide`.
//!
//! One browser process serves every session; each extraction gets its own
//! tab. The DevTools event handler is driven on a spawned task for the
//! lifetime of the backend.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::cdp::browser_protocol::network::{EnableParams, SetBlockedUrLsParams};
use chromiumoxide::cdp::browser_protocol::page::CaptureScreenshotFormat;
use chromiumoxide::handler::viewport::Viewport as EmulatedViewport;
use chromiumoxide::error::CdpError;
use chromiumoxide::{Browser, BrowserConfig, Element, Page};
use futures::StreamExt;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

use crate::browser::scripts::{self, PAGE_CONTEXT, PROBE_FN, SCAN_CONTAINERS, VIEWPORT};
use crate::browser::{BrowserBackend, BrowserError, PageSession};
use crate::dom::{ContainerScan, ElementProbe, NodeSnapshot, PageContext, Viewport};

/// Launch settings for the Chromium backend.
#[derive(Debug, Clone)]
pub struct ChromiumConfig {
    /// Run without a visible window.
    ///
    /// Default: `true`
    pub headless: bool,

    /// Window and viewport width in px.
    ///
    /// Default: `1440`
    pub window_width: u32,

    /// Window and viewport height in px.
    ///
    /// Default: `900`
    pub window_height: u32,

    /// Browser binary. `None` lets chromiumoxide locate one.
    ///
    /// Default: `None`
    pub executable: Option<PathBuf>,

    /// Extra command-line switches.
    pub args: Vec<String>,

    /// Pause after load so late layout and lazy images settle.
    ///
    /// Default: 500 ms
    pub settle_delay: Duration,

    /// URL patterns the page may not fetch (fonts and media by default).
    pub blocked_url_patterns: Vec<String>,
}

impl Default for ChromiumConfig {
    fn default() -> Self {
        Self {
            headless: true,
            window_width: 1440,
            window_height: 900,
            executable: None,
            args: ["--no-sandbox", "--disable-dev-shm-usage", "--disable-gpu", "--hide-scrollbars"]
                .into_iter()
                .map(String::from)
                .collect(),
            settle_delay: Duration::from_millis(500),
            blocked_url_patterns: [
                "*.woff", "*.woff2", "*.ttf", "*.otf", "*.eot", "*.mp4", "*.webm", "*.mp3", "*.ogg",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
        }
    }
}

/// A running Chromium process.
pub struct ChromiumBackend {
    browser: Mutex<Browser>,
    handler: JoinHandle<()>,
    config: ChromiumConfig,
}

impl std::fmt::Debug for ChromiumBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChromiumBackend").field("config", &self.config).finish_non_exhaustive()
    }
}

impl ChromiumBackend {
    /// Start a browser process.
    #[instrument(skip(config), fields(headless = config.headless))]
    pub async fn launch(config: ChromiumConfig) -> Result<Self, BrowserError> {
        let mut builder = BrowserConfig::builder()
            .window_size(config.window_width, config.window_height)
            .viewport(EmulatedViewport {
                width: config.window_width,
                height: config.window_height,
                device_scale_factor: None,
                emulating_mobile: false,
                is_landscape: true,
                has_touch: false,
            })
            .args(config.args.clone());
        if !config.headless {
            builder = builder.with_head();
        }
        if let Some(path) = &config.executable {
            builder = builder.chrome_executable(path);
        }
        let browser_config = builder.build().map_err(BrowserError::Launch)?;

        let (browser, mut handler) = Browser::launch(browser_config)
            .await
            .map_err(|e| BrowserError::Launch(e.to_string()))?;

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(err) = event {
                    debug!(error = %err, "browser handler stopped");
                    break;
                }
            }
        });

        info!("browser launched");
        Ok(Self {
            browser: Mutex::new(browser),
            handler,
            config,
        })
    }

    /// Launch settings in use.
    #[must_use]
    pub fn config(&self) -> &ChromiumConfig {
        &self.config
    }

    /// Close the browser and wait for the process to exit.
    pub async fn shutdown(&self) -> Result<(), BrowserError> {
        let mut browser = self.browser.lock().await;
        let closed = browser.close().await.map(|_| ()).map_err(|e| BrowserError::Launch(e.to_string()));
        if let Err(err) = browser.wait().await {
            warn!(error = %err, "browser process did not exit cleanly");
        }
        self.handler.abort();
        closed
    }
}

#[async_trait]
impl BrowserBackend for ChromiumBackend {
    type Page = ChromiumPage;

    async fn open_page(&self) -> Result<Self::Page, BrowserError> {
        let page = self
            .browser
            .lock()
            .await
            .new_page("about:blank")
            .await
            .map_err(|e| classify(e, BrowserError::Launch))?;

        if !self.config.blocked_url_patterns.is_empty() {
            let blocked = async {
                page.execute(EnableParams::default()).await?;
                page.execute(SetBlockedUrLsParams::new(self.config.blocked_url_patterns.clone()))
                    .await
            };
            if let Err(err) = blocked.await {
                warn!(error = %err, "could not install URL blocking");
            }
        }

        Ok(ChromiumPage {
            page,
            settle_delay: self.config.settle_delay,
        })
    }
}

/// One Chromium tab.
#[derive(Debug)]
pub struct ChromiumPage {
    page: Page,
    settle_delay: Duration,
}

impl ChromiumPage {
    async fn evaluate_json<T: DeserializeOwned>(&self, expression: &str) -> Result<T, BrowserError> {
        let json: String = self
            .page
            .evaluate(expression)
            .await
            .map_err(|e| classify(e, BrowserError::Script))?
            .into_value()
            .map_err(|e| BrowserError::Script(e.to_string()))?;
        Ok(serde_json::from_str(&json)?)
    }
}

async fn call_json<T: DeserializeOwned>(element: &Element, function: String) -> Result<T, BrowserError> {
    let returns = element
        .call_js_fn(function, false)
        .await
        .map_err(|e| classify(e, BrowserError::Script))?;
    if let Some(details) = returns.exception_details {
        return Err(BrowserError::Script(details.text));
    }
    match returns.result.value {
        Some(Value::String(json)) => Ok(serde_json::from_str(&json)?),
        Some(other) => Ok(serde_json::from_value(other)?),
        None => Err(BrowserError::Script("function returned no value".to_string())),
    }
}

/// Protocol messages Chromium sends once a tab or its session is gone.
const CLOSED_TARGET_MESSAGES: &[&str] = &[
    "target closed",
    "no target with given id",
    "session with given id not found",
    "no session with given id",
];

/// Whether `err` means the connection, the tab, or its session is gone.
fn is_session_lost(err: &CdpError) -> bool {
    match err {
        CdpError::Ws(_) | CdpError::Io(_) | CdpError::ChannelSendError(_) | CdpError::NoResponse => true,
        CdpError::Chrome(error) => is_closed_target(&error.message),
        CdpError::ChromeMessage(message) => is_closed_target(message),
        _ => false,
    }
}

fn is_closed_target(message: &str) -> bool {
    let message = message.to_ascii_lowercase();
    CLOSED_TARGET_MESSAGES.iter().any(|needle| message.contains(needle))
}

/// Lost sessions become [`BrowserError::Closed`]; everything else keeps the
/// caller's error kind.
fn classify(err: CdpError, other: impl FnOnce(String) -> BrowserError) -> BrowserError {
    if is_session_lost(&err) {
        BrowserError::Closed
    } else {
        other(err.to_string())
    }
}

#[async_trait]
impl PageSession for ChromiumPage {
    type Element = Element;

    #[instrument(skip(self))]
    async fn navigate(&self, url: &str) -> Result<(), BrowserError> {
        self.page
            .goto(url)
            .await
            .map_err(|e| BrowserError::Navigation(e.to_string()))?;
        self.page
            .wait_for_navigation()
            .await
            .map_err(|e| BrowserError::Navigation(e.to_string()))?;
        if !self.settle_delay.is_zero() {
            tokio::time::sleep(self.settle_delay).await;
        }
        debug!("page loaded");
        Ok(())
    }

    async fn viewport(&self) -> Result<Viewport, BrowserError> {
        self.evaluate_json(VIEWPORT).await
    }

    async fn query_all(&self, selector: &str) -> Result<Vec<Element>, BrowserError> {
        self.page
            .find_elements(selector)
            .await
            .map_err(|e| {
                classify(e, |message| BrowserError::InvalidSelector {
                    selector: selector.to_string(),
                    message,
                })
            })
    }

    async fn children(&self, element: &Element) -> Result<Vec<Element>, BrowserError> {
        element
            .find_elements(":scope > *")
            .await
            .map_err(|e| classify(e, BrowserError::Script))
    }

    async fn closest(&self, element: &Element, selector: &str) -> Result<bool, BrowserError> {
        let function = scripts::closest_fn(selector)?;
        call_json(element, function).await.map_err(|err| match err {
            BrowserError::Script(message) => BrowserError::InvalidSelector {
                selector: selector.to_string(),
                message,
            },
            other => other,
        })
    }

    async fn probe(&self, element: &Element) -> Result<ElementProbe, BrowserError> {
        call_json(element, PROBE_FN.to_string()).await
    }

    async fn snapshot(&self, element: &Element) -> Result<NodeSnapshot, BrowserError> {
        call_json(element, scripts::snapshot_fn()).await
    }

    async fn matched_rules(&self, element: &Element, limit: usize) -> Result<Vec<String>, BrowserError> {
        call_json(element, scripts::matched_rules_fn(limit)).await
    }

    async fn scan_containers(&self) -> Result<Vec<ContainerScan>, BrowserError> {
        self.evaluate_json(SCAN_CONTAINERS).await
    }

    async fn page_context(&self) -> Result<PageContext, BrowserError> {
        self.evaluate_json(PAGE_CONTEXT).await
    }

    async fn screenshot(&self, element: &Element) -> Result<Vec<u8>, BrowserError> {
        element
            .screenshot(CaptureScreenshotFormat::Png)
            .await
            .map_err(|e| classify(e, BrowserError::Screenshot))
    }

    async fn close(&self) -> Result<(), BrowserError> {
        self.page
            .clone()
            .close()
            .await
            .map_err(|e| classify(e, BrowserError::Script))
    }
}
