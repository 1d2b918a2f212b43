//! Main-content selection
//!
//! Strategies are tried in order and the first one returning a non-trivial
//! candidate wins. The last strategy always succeeds with the document body,
//! in which case page chrome (navigation, header, footer, sidebars) is
//! skipped during conversion.

use super::dom::{has_descendant, plain_text, select_first};
use scraper::{ElementRef, Html, Selector};

/// A content selection strategy
pub type Strategy = fn(&Html) -> Option<ElementRef<'_>>;

/// The fallback chain, most specific first
pub const STRATEGIES: &[(&str, Strategy)] = &[
    ("main", main_element),
    ("article", article_element),
    ("content-class", content_class),
];

/// Elements that make a candidate worth converting
const CONTENT_TAGS: &[&str] = &["p", "h2", "h3", "h4", "h5", "h6", "ul", "ol", "pre", "table"];

const CONTENT_SELECTORS: &[&str] = &[
    ".markdown-body",
    ".theme-doc-markdown",
    ".rst-content",
    ".md-content",
    ".docs-content",
    ".documentation",
    ".main-content",
    "#main-content",
    ".content",
    "#content",
];

/// The element chosen as the page's primary content
#[derive(Debug, Clone, Copy)]
pub struct MainContent<'a> {
    pub element: ElementRef<'a>,
    pub strategy: &'static str,
    /// Skip navigation, header, footer and aside elements when converting
    pub strip_chrome: bool,
}

/// Runs the strategy chain and falls back to the stripped body
pub fn select_main_content(document: &Html) -> MainContent<'_> {
    for (name, strategy) in STRATEGIES {
        if let Some(element) = strategy(document) {
            return MainContent {
                element,
                strategy: *name,
                strip_chrome: false,
            };
        }
    }

    MainContent {
        element: select_first(document, "body").unwrap_or_else(|| document.root_element()),
        strategy: "body",
        strip_chrome: true,
    }
}

fn main_element(document: &Html) -> Option<ElementRef<'_>> {
    first_nontrivial(document, "main, [role='main']")
}

fn article_element(document: &Html) -> Option<ElementRef<'_>> {
    first_nontrivial(document, "article")
}

fn content_class(document: &Html) -> Option<ElementRef<'_>> {
    CONTENT_SELECTORS
        .iter()
        .find_map(|css| first_nontrivial(document, css))
}

fn first_nontrivial<'a>(document: &'a Html, css: &str) -> Option<ElementRef<'a>> {
    let selector = Selector::parse(css).ok()?;
    document
        .select(&selector)
        .find(|candidate| is_nontrivial(*candidate))
}

fn is_nontrivial(element: ElementRef<'_>) -> bool {
    has_descendant(element, CONTENT_TAGS)
}

/// First `<h1>` text, else the `<title>` text
pub fn page_title(document: &Html) -> Option<String> {
    let from = |css: &str| {
        let selector = Selector::parse(css).ok()?;
        document
            .select(&selector)
            .map(plain_text)
            .find(|text| !text.is_empty())
    };

    from("h1").or_else(|| from("title"))
}
