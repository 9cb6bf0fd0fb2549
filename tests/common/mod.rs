//! In-memory browser backend for integration tests.
//!
//! Pages are plain HTML. Layout comes from attributes instead of a rendering
//! engine:
//!
//! - `data-rect="x y width height"` is the document-relative box; elements
//!   without it are treated as not rendered;
//! - the inline `style` attribute stands in for computed style (`display`
//!   defaults to `block`, `position` to `static`);
//! - `data-natural="width height"` is an image's natural size.
//!
//! Selectors are evaluated with `dom_query`. Element handles are indices in
//! document order.

#![allow(dead_code, clippy::expect_used, clippy::unwrap_used)]

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use component_extractor::dom::{
    ChildSample, ContainerScan, ElementProbe, NodeSnapshot, PageContext, Rect, SnapshotNode, Viewport,
};
use component_extractor::{BrowserBackend, BrowserError, PageSession};
use dom_query::{Document, NodeId};
use parking_lot::Mutex;

const LAYOUT_ATTRIBUTES: &[&str] = &["data-rect", "data-natural"];
const LIST_HINTS: &[&str] = &["list", "grid", "card", "cards", "items", "products", "results", "tiles", "collection"];

/// Knobs for failure injection.
#[derive(Debug, Clone, Default)]
pub struct FakeSettings {
    /// Every screenshot fails.
    pub fail_screenshots: bool,
    /// Navigation takes this long.
    pub nav_delay: Option<Duration>,
    /// The tab exists right away but `open_page` returns after this long.
    pub open_delay: Option<Duration>,
    /// Snapshots report a closed session.
    pub close_on_snapshot: bool,
    /// Selectors rejected as invalid.
    pub broken_selectors: Vec<String>,
    /// Stylesheet rules returned for every element.
    pub rules: Vec<String>,
    /// `(selector, rule)` pairs returned only for elements matching the selector.
    pub scoped_rules: Vec<(String, String)>,
}

/// Open, close and navigation counts shared by every page of a backend.
#[derive(Debug, Default)]
pub struct Counters {
    pub opened: AtomicUsize,
    pub closed: AtomicUsize,
    pub navigations: AtomicUsize,
}

/// Backend serving fixed HTML per URL.
#[derive(Debug, Default)]
pub struct FakeBackend {
    pages: Arc<HashMap<String, String>>,
    settings: FakeSettings,
    counters: Arc<Counters>,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `html` at `url` (use the normalized form, e.g. with a trailing `/`).
    pub fn page(mut self, url: &str, html: &str) -> Self {
        Arc::make_mut(&mut self.pages).insert(url.to_string(), html.to_string());
        self
    }

    pub fn settings(mut self, settings: FakeSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn opened(&self) -> usize {
        self.counters.opened.load(Ordering::SeqCst)
    }

    pub fn closed(&self) -> usize {
        self.counters.closed.load(Ordering::SeqCst)
    }

    pub fn navigations(&self) -> usize {
        self.counters.navigations.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BrowserBackend for FakeBackend {
    type Page = FakePage;

    async fn open_page(&self) -> Result<FakePage, BrowserError> {
        self.counters.opened.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.settings.open_delay {
            tokio::time::sleep(delay).await;
        }
        Ok(FakePage {
            pages: Arc::clone(&self.pages),
            settings: self.settings.clone(),
            counters: Arc::clone(&self.counters),
            dom: Mutex::new(None),
        })
    }
}

/// One fake tab.
#[derive(Debug)]
pub struct FakePage {
    pages: Arc<HashMap<String, String>>,
    settings: FakeSettings,
    counters: Arc<Counters>,
    dom: Mutex<Option<Arc<FakeDom>>>,
}

impl FakePage {
    fn dom(&self) -> Result<Arc<FakeDom>, BrowserError> {
        self.dom
            .lock()
            .clone()
            .ok_or_else(|| BrowserError::Script("no page loaded".to_string()))
    }
}

#[async_trait]
impl PageSession for FakePage {
    type Element = usize;

    async fn navigate(&self, url: &str) -> Result<(), BrowserError> {
        self.counters.navigations.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.settings.nav_delay {
            tokio::time::sleep(delay).await;
        }
        let html = self
            .pages
            .get(url)
            .ok_or_else(|| BrowserError::Navigation(format!("net::ERR_NAME_NOT_RESOLVED at {url}")))?;
        *self.dom.lock() = Some(Arc::new(FakeDom::parse(html)));
        Ok(())
    }

    async fn viewport(&self) -> Result<Viewport, BrowserError> {
        Ok(Viewport::default())
    }

    async fn query_all(&self, selector: &str) -> Result<Vec<usize>, BrowserError> {
        if self.settings.broken_selectors.iter().any(|s| s == selector) {
            return Err(BrowserError::InvalidSelector {
                selector: selector.to_string(),
                message: "unsupported pseudo-class".to_string(),
            });
        }
        Ok(self.dom()?.select(selector))
    }

    async fn children(&self, element: &usize) -> Result<Vec<usize>, BrowserError> {
        Ok(self.dom()?.element_children(*element))
    }

    async fn closest(&self, element: &usize, selector: &str) -> Result<bool, BrowserError> {
        let dom = self.dom()?;
        let matches = dom.select(selector);
        let mut current = Some(*element);
        while let Some(index) = current {
            if matches.contains(&index) {
                return Ok(true);
            }
            current = dom.nodes[index].parent;
        }
        Ok(false)
    }

    async fn probe(&self, element: &usize) -> Result<ElementProbe, BrowserError> {
        Ok(self.dom()?.probe(*element))
    }

    async fn snapshot(&self, element: &usize) -> Result<NodeSnapshot, BrowserError> {
        if self.settings.close_on_snapshot {
            return Err(BrowserError::Closed);
        }
        Ok(self.dom()?.snapshot(*element))
    }

    async fn matched_rules(&self, element: &usize, limit: usize) -> Result<Vec<String>, BrowserError> {
        let dom = self.dom()?;
        let scoped = self
            .settings
            .scoped_rules
            .iter()
            .filter(|(selector, _)| dom.select(selector).contains(element))
            .map(|(_, rule)| rule);
        Ok(self.settings.rules.iter().chain(scoped).take(limit).cloned().collect())
    }

    async fn scan_containers(&self) -> Result<Vec<ContainerScan>, BrowserError> {
        Ok(self.dom()?.scan_containers())
    }

    async fn page_context(&self) -> Result<PageContext, BrowserError> {
        let dom = self.dom()?;
        let Some(body) = dom.nodes.iter().position(|n| n.tag == "body") else {
            return Ok(PageContext::default());
        };
        let styles = &dom.nodes[body].styles;
        let get = |name: &str| styles.get(name).cloned().unwrap_or_default();
        Ok(PageContext {
            background_color: get("background-color"),
            color: get("color"),
            font_family: get("font-family"),
        })
    }

    async fn screenshot(&self, _element: &usize) -> Result<Vec<u8>, BrowserError> {
        if self.settings.fail_screenshots {
            return Err(BrowserError::Screenshot("element is not visible".to_string()));
        }
        Ok(vec![0x89, b'P', b'N', b'G'])
    }

    async fn close(&self) -> Result<(), BrowserError> {
        self.counters.closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[derive(Debug, Clone)]
enum FakeChild {
    Element(usize),
    Text(String),
}

#[derive(Debug, Clone)]
struct FakeNode {
    tag: String,
    attributes: Vec<(String, String)>,
    styles: BTreeMap<String, String>,
    parent: Option<usize>,
    children: Vec<FakeChild>,
}

impl FakeNode {
    fn attr(&self, name: &str) -> Option<&str> {
        self.attributes.iter().find(|(k, _)| k == name).map(|(_, v)| v.as_str())
    }

    fn rect(&self) -> Option<Rect> {
        let values: Vec<f64> = self
            .attr("data-rect")?
            .split_whitespace()
            .filter_map(|v| v.parse().ok())
            .collect();
        match values.as_slice() {
            [x, y, w, h] => Some(Rect::new(*x, *y, *w, *h)),
            _ => None,
        }
    }

    fn style(&self, name: &str, default: &str) -> String {
        self.styles.get(name).cloned().unwrap_or_else(|| default.to_string())
    }
}

/// Parsed page. Kept as plain data so pages stay `Send + Sync`.
#[derive(Debug)]
struct FakeDom {
    html: String,
    nodes: Vec<FakeNode>,
}

impl FakeDom {
    fn parse(html: &str) -> Self {
        let doc = Document::from(html);
        let all = doc.select("*");
        let index = id_index(&doc);

        let nodes = all
            .nodes()
            .iter()
            .map(|node| {
                let tag = node.node_name().map(|t| t.to_ascii_lowercase()).unwrap_or_default();
                let attributes: Vec<(String, String)> = node
                    .attrs()
                    .iter()
                    .map(|a| (a.name.local.to_string(), a.value.to_string()))
                    .collect();
                let styles = attributes
                    .iter()
                    .find(|(k, _)| k == "style")
                    .map(|(_, v)| parse_inline_style(v))
                    .unwrap_or_default();
                let parent = node.parent().and_then(|p| index.get(&p.id).copied());
                let children = node
                    .children()
                    .iter()
                    .filter_map(|child| {
                        if child.is_element() {
                            index.get(&child.id).map(|i| FakeChild::Element(*i))
                        } else if child.is_text() {
                            Some(FakeChild::Text(child.text().to_string()))
                        } else {
                            None
                        }
                    })
                    .collect();
                FakeNode {
                    tag,
                    attributes,
                    styles,
                    parent,
                    children,
                }
            })
            .collect();

        Self {
            html: html.to_string(),
            nodes,
        }
    }

    fn select(&self, selector: &str) -> Vec<usize> {
        let doc = Document::from(self.html.as_str());
        let index = id_index(&doc);
        let Some(matched) = doc.try_select(selector) else {
            return Vec::new();
        };
        let mut found: Vec<usize> = matched
            .nodes()
            .iter()
            .filter_map(|node| index.get(&node.id).copied())
            .collect();
        found.sort_unstable();
        found.dedup();
        found
    }

    fn element_children(&self, index: usize) -> Vec<usize> {
        self.nodes[index]
            .children
            .iter()
            .filter_map(|child| match child {
                FakeChild::Element(i) => Some(*i),
                FakeChild::Text(_) => None,
            })
            .collect()
    }

    fn descendants(&self, index: usize) -> Vec<usize> {
        let mut out = Vec::new();
        let mut stack = vec![index];
        while let Some(i) = stack.pop() {
            out.push(i);
            stack.extend(self.element_children(i).into_iter().rev());
        }
        out
    }

    fn text(&self, index: usize) -> String {
        let node = &self.nodes[index];
        if matches!(node.tag.as_str(), "script" | "style" | "noscript" | "template") {
            return String::new();
        }
        let mut out = String::new();
        for child in &node.children {
            match child {
                FakeChild::Text(value) => out.push_str(value),
                FakeChild::Element(i) => out.push_str(&self.text(*i)),
            }
        }
        out
    }

    fn probe(&self, index: usize) -> ElementProbe {
        let node = &self.nodes[index];
        let text = self.text(index);
        let text = text.split_whitespace().collect::<Vec<_>>().join(" ");
        let subtree = self.descendants(index);
        ElementProbe {
            tag: node.tag.clone(),
            class_name: node.attr("class").unwrap_or_default().to_string(),
            rect: node.rect(),
            position: node.style("position", "static"),
            display: node.style("display", "block"),
            visibility: node.style("visibility", "visible"),
            text_length: text.chars().count(),
            text_sample: text.chars().take(80).collect(),
            has_image: subtree.iter().any(|i| self.nodes[*i].tag == "img"),
            has_heading: subtree
                .iter()
                .any(|i| matches!(self.nodes[*i].tag.as_str(), "h1" | "h2" | "h3")),
            background_image: node.style("background-image", "none"),
        }
    }

    fn snapshot(&self, index: usize) -> NodeSnapshot {
        let node = &self.nodes[index];
        let mut snapshot = NodeSnapshot::new(&node.tag);
        snapshot.attributes = node
            .attributes
            .iter()
            .filter(|(k, _)| !LAYOUT_ATTRIBUTES.contains(&k.as_str()))
            .cloned()
            .collect();
        snapshot.styles = node.styles.clone();
        snapshot.styles.entry("display".into()).or_insert_with(|| "block".into());
        snapshot.styles.entry("position".into()).or_insert_with(|| "static".into());
        snapshot.rect = node.rect();
        if node.tag == "img" {
            snapshot.natural_size = node.attr("data-natural").and_then(|v| {
                let mut parts = v.split_whitespace().filter_map(|p| p.parse::<f64>().ok());
                Some((parts.next()?, parts.next()?))
            });
        }
        snapshot.children = node
            .children
            .iter()
            .map(|child| match child {
                FakeChild::Element(i) => SnapshotNode::Element(self.snapshot(*i)),
                FakeChild::Text(value) => SnapshotNode::Text { value: value.clone() },
            })
            .collect();
        snapshot
    }

    fn scan_containers(&self) -> Vec<ContainerScan> {
        let Some(body) = self.nodes.iter().position(|n| n.tag == "body") else {
            return Vec::new();
        };
        let mut out = Vec::new();
        for index in self.descendants(body).into_iter().skip(1) {
            let children = self.element_children(index);
            if children.len() < 3 {
                continue;
            }
            let node = &self.nodes[index];
            let display = node.style("display", "block");
            let class_name = node.attr("class").unwrap_or_default().to_string();
            let is_list = matches!(node.tag.as_str(), "ul" | "ol" | "dl");
            let is_layout = matches!(display.as_str(), "grid" | "flex" | "inline-grid" | "inline-flex")
                || class_name
                    .split(|c: char| c.is_whitespace() || c == '-' || c == '_')
                    .any(|token| LIST_HINTS.contains(&token.to_ascii_lowercase().as_str()));
            if !is_list && !is_layout {
                continue;
            }
            let samples = children
                .iter()
                .take(24)
                .map(|child| {
                    let rect = self.nodes[*child].rect().unwrap_or_default();
                    ChildSample {
                        tag: self.nodes[*child].tag.clone(),
                        width: rect.width,
                        height: rect.height,
                        has_image: self.descendants(*child).iter().any(|i| self.nodes[*i].tag == "img"),
                    }
                })
                .collect();
            out.push(ContainerScan {
                selector: self.path(index),
                tag: node.tag.clone(),
                display,
                class_name,
                child_count: children.len(),
                children: samples,
            });
        }
        out
    }

    fn path(&self, index: usize) -> String {
        let mut parts = Vec::new();
        let mut current = Some(index);
        while let Some(i) = current {
            let node = &self.nodes[i];
            if let Some(id) = node.attr("id").filter(|id| self.is_unique_simple_id(id)) {
                parts.push(format!("#{id}"));
                break;
            }
            match node.parent {
                Some(parent) if node.tag != "body" => {
                    let position = self
                        .element_children(parent)
                        .iter()
                        .position(|c| *c == i)
                        .unwrap_or(0);
                    parts.push(format!("{}:nth-child({})", node.tag, position + 1));
                    current = Some(parent);
                }
                _ => {
                    parts.push(node.tag.clone());
                    break;
                }
            }
        }
        parts.reverse();
        parts.join(" > ")
    }

    fn is_unique_simple_id(&self, id: &str) -> bool {
        let simple = id.chars().next().is_some_and(|c| c.is_ascii_alphabetic())
            && id.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        simple && self.nodes.iter().filter(|n| n.attr("id") == Some(id)).count() == 1
    }
}

fn id_index(doc: &Document) -> HashMap<NodeId, usize> {
    doc.select("*")
        .nodes()
        .iter()
        .enumerate()
        .map(|(i, node)| (node.id, i))
        .collect()
}

fn parse_inline_style(style: &str) -> BTreeMap<String, String> {
    style
        .split(';')
        .filter_map(|declaration| {
            let (name, value) = declaration.split_once(':')?;
            let name = name.trim().to_ascii_lowercase();
            let value = value.trim();
            (!name.is_empty() && !value.is_empty()).then(|| (name, value.to_string()))
        })
        .collect()
}

/// Wrap body markup in a page whose body has a box.
pub fn page(body: &str) -> String {
    format!(
        r#"<!DOCTYPE html><html><head><title>Fixture</title></head><body data-rect="0 0 1440 3000" style="background-color: rgb(255, 255, 255); color: rgb(17, 17, 17); font-family: Inter">{body}</body></html>"#
    )
}
