//! Pattern detection for repeated sibling structures.
//!
//! Grids, flex rows and class-named lists whose direct children share a
//! dominant tag and a similar size become synthetic `card-item` /
//! `list-item` selectors. Plain `<ul>`, `<ol>` and `<dl>` lists qualify on
//! item count alone.

use crate::dom::{ChildSample, ContainerScan};
use crate::patterns::LIST_CONTAINER_CLASS;
use crate::result::ComponentType;
use crate::selector::CatalogEntry;

/// Minimum number of repeated children.
pub const MIN_REPEATED_CHILDREN: usize = 3;

/// Share of sampled children that must carry the dominant tag.
pub const DOMINANT_TAG_SHARE: f64 = 0.7;

/// Allowed relative deviation from the mean child width and height.
pub const SIZE_TOLERANCE: f64 = 0.3;

const LIST_TAGS: &[&str] = &["ul", "ol", "dl"];
const LAYOUT_DISPLAYS: &[&str] = &["grid", "inline-grid", "flex", "inline-flex"];

/// Derive synthetic catalog entries from scanned containers.
///
/// Each emitted entry is capped at `cap` instances. Output order follows the
/// scan order; duplicate selectors are dropped.
#[must_use]
pub fn detect_patterns(scans: &[ContainerScan], cap: usize) -> Vec<CatalogEntry> {
    let mut entries: Vec<CatalogEntry> = Vec::new();

    for scan in scans {
        let Some(entry) = detect_container(scan, cap) else {
            continue;
        };
        if entries.iter().any(|existing| existing.selector == entry.selector) {
            continue;
        }
        entries.push(entry);
    }

    entries
}

/// Evaluate one container.
#[must_use]
pub fn detect_container(scan: &ContainerScan, cap: usize) -> Option<CatalogEntry> {
    if scan.selector.trim().is_empty() || scan.child_count < MIN_REPEATED_CHILDREN {
        return None;
    }

    let (tag, count) = dominant_tag(&scan.children)?;
    let repeated: Vec<&ChildSample> = scan.children.iter().filter(|c| c.tag == tag).collect();

    let qualifies = if is_plain_list(scan) {
        count >= MIN_REPEATED_CHILDREN
    } else {
        is_layout_container(scan)
            && count >= MIN_REPEATED_CHILDREN
            && share(count, scan.children.len()) >= DOMINANT_TAG_SHARE
            && sizes_are_uniform(&repeated)
    };
    if !qualifies {
        return None;
    }

    let kind = if repeated.iter().any(|c| c.has_image) {
        ComponentType::CardItem
    } else {
        ComponentType::ListItem
    };

    Some(CatalogEntry::dynamic(kind, format!("{} > {tag}", scan.selector), cap))
}

fn is_plain_list(scan: &ContainerScan) -> bool {
    LIST_TAGS.contains(&scan.tag.as_str())
}

fn is_layout_container(scan: &ContainerScan) -> bool {
    LAYOUT_DISPLAYS.contains(&scan.display.as_str()) || LIST_CONTAINER_CLASS.is_match(&scan.class_name)
}

/// Most frequent child tag and its count. Ties go to the tag seen first.
fn dominant_tag(children: &[ChildSample]) -> Option<(&str, usize)> {
    let mut counts: Vec<(&str, usize)> = Vec::new();
    for child in children {
        if child.tag.is_empty() {
            continue;
        }
        match counts.iter_mut().find(|(tag, _)| *tag == child.tag) {
            Some((_, n)) => *n += 1,
            None => counts.push((child.tag.as_str(), 1)),
        }
    }

    let mut best: Option<(&str, usize)> = None;
    for (tag, n) in counts {
        if best.is_none_or(|(_, top)| n > top) {
            best = Some((tag, n));
        }
    }
    best
}

#[allow(clippy::cast_precision_loss)]
fn share(count: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        count as f64 / total as f64
    }
}

#[allow(clippy::cast_precision_loss)]
fn sizes_are_uniform(children: &[&ChildSample]) -> bool {
    if children.is_empty() {
        return false;
    }
    let n = children.len() as f64;
    let mean_width = children.iter().map(|c| c.width).sum::<f64>() / n;
    let mean_height = children.iter().map(|c| c.height).sum::<f64>() / n;
    if mean_width <= 0.0 || mean_height <= 0.0 {
        return false;
    }

    children.iter().all(|c| {
        (c.width - mean_width).abs() <= mean_width * SIZE_TOLERANCE
            && (c.height - mean_height).abs() <= mean_height * SIZE_TOLERANCE
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn child(tag: &str, width: f64, height: f64, has_image: bool) -> ChildSample {
        ChildSample {
            tag: tag.into(),
            width,
            height,
            has_image,
        }
    }

    fn scan(selector: &str, tag: &str, display: &str, children: Vec<ChildSample>) -> ContainerScan {
        ContainerScan {
            selector: selector.into(),
            tag: tag.into(),
            display: display.into(),
            class_name: String::new(),
            child_count: children.len(),
            children,
        }
    }

    #[test]
    fn grid_of_cards_with_images_becomes_card_items() {
        let children = (0..6).map(|_| child("div", 300.0, 400.0, true)).collect();
        let entry = detect_container(&scan("#products", "div", "grid", children), 10).expect("pattern");
        assert_eq!(entry.kind, ComponentType::CardItem);
        assert_eq!(entry.selector, "#products > div");
        assert_eq!(entry.max_instances, Some(10));
    }

    #[test]
    fn uneven_sizes_are_rejected() {
        let children = vec![
            child("div", 300.0, 400.0, false),
            child("div", 300.0, 400.0, false),
            child("div", 900.0, 400.0, false),
        ];
        assert!(detect_container(&scan("#row", "div", "flex", children), 10).is_none());
    }

    #[test]
    fn mixed_tags_below_dominance_are_rejected() {
        let children = vec![
            child("div", 100.0, 100.0, false),
            child("div", 100.0, 100.0, false),
            child("div", 100.0, 100.0, false),
            child("span", 100.0, 100.0, false),
            child("a", 100.0, 100.0, false),
        ];
        assert!(detect_container(&scan("#row", "div", "flex", children), 10).is_none());
    }

    #[test]
    fn block_container_without_list_class_is_ignored() {
        let children = (0..4).map(|_| child("div", 100.0, 100.0, false)).collect();
        assert!(detect_container(&scan("#stack", "div", "block", children), 10).is_none());
    }

    #[test]
    fn class_hint_qualifies_block_container() {
        let children = (0..4).map(|_| child("article", 100.0, 100.0, false)).collect();
        let mut container = scan("#feed", "div", "block", children);
        container.class_name = "post-list".into();
        let entry = detect_container(&container, 10).expect("pattern");
        assert_eq!(entry.kind, ComponentType::ListItem);
        assert_eq!(entry.selector, "#feed > article");
    }

    #[test]
    fn plain_lists_skip_the_layout_checks() {
        let children = vec![
            child("li", 100.0, 20.0, false),
            child("li", 400.0, 20.0, false),
            child("li", 50.0, 60.0, false),
        ];
        let entry = detect_container(&scan("main > ul:nth-child(2)", "ul", "block", children), 10)
            .expect("pattern");
        assert_eq!(entry.selector, "main > ul:nth-child(2) > li");
        assert_eq!(entry.kind, ComponentType::ListItem);
    }

    #[test]
    fn short_lists_are_ignored_and_duplicates_dropped() {
        let short = scan("#a", "ul", "block", vec![child("li", 1.0, 1.0, false); 2]);
        let long = scan("#b", "ul", "block", vec![child("li", 1.0, 1.0, false); 3]);
        let entries = detect_patterns(&[short, long.clone(), long], 10);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].selector, "#b > li");
    }
}
