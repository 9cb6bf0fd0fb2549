//! Scripts evaluated in the page.
//!
//! Element functions run with `this` bound to the element and return a JSON
//! string, which keeps the result a primitive the protocol hands back by
//! value. Page expressions are evaluated in the top-level frame.
//!
//! Rects are document-relative (viewport rect plus scroll offset).

use crate::style::CAPTURED_PROPERTIES;

/// Per-element probe, see [`ElementProbe`](crate::dom::ElementProbe).
pub const PROBE_FN: &str = r#"function() {
  const el = this;
  const cs = getComputedStyle(el);
  const r = el.getBoundingClientRect();
  const rendered = el.getClientRects().length > 0;
  const text = (el.innerText || el.textContent || '').trim();
  return JSON.stringify({
    tag: el.tagName.toLowerCase(),
    className: el.getAttribute('class') || '',
    rect: rendered ? { x: r.left + window.scrollX, y: r.top + window.scrollY, width: r.width, height: r.height } : null,
    position: cs.position,
    display: cs.display,
    visibility: cs.visibility,
    textLength: text.length,
    textSample: text.replace(/\s+/g, ' ').slice(0, 80),
    hasImage: el.tagName === 'IMG' || el.querySelector('img') !== null,
    hasHeading: /^H[1-3]$/.test(el.tagName) || el.querySelector('h1, h2, h3') !== null,
    backgroundImage: cs.backgroundImage || ''
  });
}"#;

const SNAPSHOT_TEMPLATE: &str = r#"function() {
  const PROPS = __PROPERTIES__;
  const sx = window.scrollX, sy = window.scrollY;
  function snap(el) {
    const node = { tag: el.tagName.toLowerCase(), attributes: [], styles: {}, rect: null, naturalSize: null, error: null, children: [] };
    try {
      for (const a of el.attributes) node.attributes.push([a.name, a.value]);
      const cs = getComputedStyle(el);
      for (const p of PROPS) {
        try {
          const v = cs.getPropertyValue(p);
          if (v) node.styles[p] = v;
        } catch (e) {}
      }
      const r = el.getBoundingClientRect();
      node.rect = { x: r.left + sx, y: r.top + sy, width: r.width, height: r.height };
      if (el.tagName === 'IMG') node.naturalSize = [el.naturalWidth, el.naturalHeight];
    } catch (e) {
      node.error = String(e);
      return node;
    }
    for (const child of el.childNodes) {
      try {
        if (child.nodeType === 1) {
          node.children.push(Object.assign({ kind: 'element' }, snap(child)));
        } else if (child.nodeType === 3) {
          node.children.push({ kind: 'text', value: child.nodeValue });
        }
      } catch (e) {}
    }
    return node;
  }
  return JSON.stringify(snap(this));
}"#;

const MATCHED_RULES_TEMPLATE: &str = r#"function() {
  const LIMIT = __LIMIT__;
  const nodes = [this, ...Array.from(this.querySelectorAll('*')).slice(0, 500)];
  const out = [];
  const seen = new Set();
  function matches(rule) {
    if (rule.selectorText) {
      try { return nodes.some((n) => n.matches(rule.selectorText)); } catch (e) { return false; }
    }
    if (rule.cssRules) {
      for (const inner of rule.cssRules) if (matches(inner)) return true;
    }
    return false;
  }
  for (const sheet of document.styleSheets) {
    let rules;
    try { rules = sheet.cssRules; } catch (e) { continue; }
    if (!rules) continue;
    for (const rule of rules) {
      if (out.length >= LIMIT) break;
      if (seen.has(rule.cssText)) continue;
      if (matches(rule)) {
        seen.add(rule.cssText);
        out.push(rule.cssText);
      }
    }
  }
  return JSON.stringify(out);
}"#;

const CLOSEST_TEMPLATE: &str = "function() { return this.closest(__SELECTOR__) !== null; }";

/// Scans the document for repeated-pattern candidates.
pub const SCAN_CONTAINERS: &str = r#"(() => {
  const MAX_CHILDREN = 24, MAX_CONTAINERS = 200;
  const LIST_HINT = /(^|[\s_-])(list|grid|cards?|items|products|results|tiles|collection)($|[\s_-])/i;
  const SIMPLE_ID = /^[A-Za-z][\w-]*$/;
  function uniqueId(el) {
    return el.id && SIMPLE_ID.test(el.id) && document.querySelectorAll('#' + el.id).length === 1;
  }
  function path(el) {
    const parts = [];
    let node = el;
    while (node && node.nodeType === 1) {
      if (uniqueId(node)) { parts.unshift('#' + node.id); break; }
      const tag = node.tagName.toLowerCase();
      const parent = node.parentElement;
      if (tag === 'body' || !parent) { parts.unshift(tag); break; }
      parts.unshift(tag + ':nth-child(' + (Array.prototype.indexOf.call(parent.children, node) + 1) + ')');
      node = parent;
    }
    return parts.join(' > ');
  }
  const out = [];
  if (!document.body) return JSON.stringify(out);
  for (const el of document.body.querySelectorAll('*')) {
    if (out.length >= MAX_CONTAINERS) break;
    if (el.children.length < 3) continue;
    const tag = el.tagName.toLowerCase();
    const cs = getComputedStyle(el);
    const cls = el.getAttribute('class') || '';
    const isList = tag === 'ul' || tag === 'ol' || tag === 'dl';
    const isLayout = /^(inline-)?(grid|flex)$/.test(cs.display) || LIST_HINT.test(cls);
    if (!isList && !isLayout) continue;
    const children = Array.from(el.children).slice(0, MAX_CHILDREN).map((c) => {
      const r = c.getBoundingClientRect();
      return {
        tag: c.tagName.toLowerCase(),
        width: r.width,
        height: r.height,
        hasImage: c.tagName === 'IMG' || c.querySelector('img') !== null
      };
    });
    out.push({ selector: path(el), tag, display: cs.display, className: cls, childCount: el.children.length, children });
  }
  return JSON.stringify(out);
})()"#;

/// Ambient `<body>` styles.
pub const PAGE_CONTEXT: &str = r#"(() => {
  if (!document.body) return JSON.stringify({});
  const cs = getComputedStyle(document.body);
  return JSON.stringify({ backgroundColor: cs.backgroundColor, color: cs.color, fontFamily: cs.fontFamily });
})()"#;

/// Layout viewport size.
pub const VIEWPORT: &str = "JSON.stringify({ width: window.innerWidth, height: window.innerHeight })";

/// Subtree snapshot function capturing [`CAPTURED_PROPERTIES`].
#[must_use]
pub fn snapshot_fn() -> String {
    let properties = serde_json::to_string(CAPTURED_PROPERTIES).unwrap_or_else(|_| "[]".to_string());
    SNAPSHOT_TEMPLATE.replace("__PROPERTIES__", &properties)
}

/// Stylesheet rule collection function returning at most `limit` rules.
#[must_use]
pub fn matched_rules_fn(limit: usize) -> String {
    MATCHED_RULES_TEMPLATE.replace("__LIMIT__", &limit.to_string())
}

/// `Element.closest` check against `selector`.
pub fn closest_fn(selector: &str) -> Result<String, serde_json::Error> {
    let literal = serde_json::to_string(selector)?;
    Ok(CLOSEST_TEMPLATE.replace("__SELECTOR__", &literal))
}
