//! Single-page-application detection
//!
//! A page rendered entirely by client-side script looks the same on every
//! URL of the site: an empty mount point, a tiny document, no navigation,
//! almost no text and no structural tags. Each of these is one indicator;
//! the page is classified as an SPA shell when a quorum of them fire.

use super::dom::{has_descendant, select_first, text_stats};
use crate::config::SpaConfig;
use scraper::node::Node;
use scraper::{ElementRef, Html};
use serde::Serialize;

/// Element ids used as mount points by client-side frameworks
const MOUNT_IDS: &[&str] = &[
    "root",
    "app",
    "__next",
    "__nuxt",
    "___gatsby",
    "react-root",
    "svelte",
];

const STRUCTURE_TAGS: &[&str] = &["p", "h1", "h2", "h3", "h4", "h5", "h6", "article"];

/// Outcome of the SPA probe for one page
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct SpaReport {
    pub url: String,
    pub empty_mount: bool,
    pub tiny_html: bool,
    pub few_links: bool,
    pub little_text: bool,
    pub no_structure: bool,
    pub html_bytes: usize,
    pub link_count: usize,
    pub text_chars: usize,
    pub quorum: usize,
}

impl SpaReport {
    /// Number of indicators that fired
    pub fn fired(&self) -> usize {
        self.indicators().iter().filter(|(_, fired)| *fired).count()
    }

    pub fn fired_names(&self) -> Vec<&'static str> {
        self.indicators()
            .into_iter()
            .filter_map(|(name, fired)| fired.then_some(name))
            .collect()
    }

    pub fn is_spa(&self) -> bool {
        self.fired() >= self.quorum
    }

    fn indicators(&self) -> [(&'static str, bool); 5] {
        [
            ("empty mount point", self.empty_mount),
            ("tiny document", self.tiny_html),
            ("few links", self.few_links),
            ("little text", self.little_text),
            ("no structural tags", self.no_structure),
        ]
    }
}

/// Evaluates the five SPA indicators for a parsed page
pub fn evaluate(
    document: &Html,
    html_bytes: usize,
    link_count: usize,
    url: &str,
    config: &SpaConfig,
) -> SpaReport {
    let body = select_first(document, "body");

    let text_chars = body
        .map(|body| text_stats(body, false).chars)
        .unwrap_or(0);
    let no_structure = body
        .map(|body| !has_descendant(body, STRUCTURE_TAGS))
        .unwrap_or(true);

    SpaReport {
        url: url.to_string(),
        empty_mount: has_empty_mount(document),
        tiny_html: html_bytes < config.max_html_bytes,
        few_links: link_count < config.min_links,
        little_text: text_chars < config.min_text_chars,
        no_structure,
        html_bytes,
        link_count,
        text_chars,
        quorum: config.quorum,
    }
}

fn has_empty_mount(document: &Html) -> bool {
    MOUNT_IDS.iter().any(|id| {
        select_first(document, &format!("[id='{}']", id))
            .map(is_empty_container)
            .unwrap_or(false)
    })
}

/// A container is empty when it holds nothing but scripts and whitespace
fn is_empty_container(element: ElementRef<'_>) -> bool {
    element.children().all(|child| match child.value() {
        Node::Text(text) => text.trim().is_empty(),
        Node::Element(el) => matches!(el.name(), "script" | "noscript" | "template"),
        _ => true,
    })
}
