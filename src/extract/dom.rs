//! Small DOM helpers shared by the extractors

use scraper::node::Node;
use scraper::{ElementRef, Html, Selector};

/// Elements whose content is never visible text
pub const INVISIBLE_TAGS: &[&str] = &["script", "style", "noscript", "template", "svg", "iframe"];

/// Page chrome removed when the whole body is used as content
pub const CHROME_TAGS: &[&str] = &["nav", "header", "footer", "aside"];

/// Trees deeper than this are truncated by the recursive walkers
pub const MAX_DEPTH: usize = 128;

/// Returns the first element matching a CSS selector
pub fn select_first<'a>(document: &'a Html, css: &str) -> Option<ElementRef<'a>> {
    let selector = Selector::parse(css).ok()?;
    document.select(&selector).next()
}

/// Returns true if the element has a descendant with one of the tag names
pub fn has_descendant(element: ElementRef<'_>, tags: &[&str]) -> bool {
    element
        .descendants()
        .skip(1)
        .filter_map(ElementRef::wrap)
        .any(|el| tags.contains(&el.value().name()))
}

/// Plain-text statistics of an element
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TextStats {
    /// Characters of text, each text run trimmed
    pub chars: usize,
    pub words: usize,
}

/// Collects the visible text runs below an element
///
/// Invisible elements are always skipped; chrome elements only when
/// `skip_chrome` is set.
pub fn visible_text(element: ElementRef<'_>, skip_chrome: bool) -> Vec<String> {
    let mut runs = Vec::new();
    collect_text(element, skip_chrome, 0, &mut runs);
    runs
}

fn collect_text(element: ElementRef<'_>, skip_chrome: bool, depth: usize, runs: &mut Vec<String>) {
    if depth > MAX_DEPTH {
        return;
    }

    for child in element.children() {
        match child.value() {
            Node::Text(text) => {
                let trimmed = text.trim();
                if !trimmed.is_empty() {
                    runs.push(trimmed.to_string());
                }
            }
            Node::Element(el) => {
                if is_skipped(el.name(), skip_chrome) {
                    continue;
                }
                if let Some(child_el) = ElementRef::wrap(child) {
                    collect_text(child_el, skip_chrome, depth + 1, runs);
                }
            }
            _ => {}
        }
    }
}

/// Counts characters and words of the visible text below an element
pub fn text_stats(element: ElementRef<'_>, skip_chrome: bool) -> TextStats {
    visible_text(element, skip_chrome)
        .iter()
        .fold(TextStats::default(), |acc, run| TextStats {
            chars: acc.chars + run.chars().count(),
            words: acc.words + run.split_whitespace().count(),
        })
}

pub fn is_skipped(tag: &str, skip_chrome: bool) -> bool {
    INVISIBLE_TAGS.contains(&tag) || (skip_chrome && CHROME_TAGS.contains(&tag))
}

/// Whitespace-collapsed text of an element, for headings and titles
pub fn plain_text(element: ElementRef<'_>) -> String {
    visible_text(element, false)
        .join(" ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}
