//! Content extraction
//!
//! Turns one fetched HTML document into either an SPA verdict or a page
//! result. The document is parsed once; links are collected from the
//! unmodified tree before content selection, so links in navigation and
//! footers are followed even though that chrome is not converted.

mod anchor;
mod content;
mod dom;
mod filter;
mod language;
mod links;
mod markdown;
mod spa;

pub use anchor::{slugify, SlugRegistry};
pub use content::{page_title, select_main_content, MainContent, Strategy, STRATEGIES};
pub use filter::{is_junk_path, is_junk_title, is_too_small};
pub use language::{detect_language, language_from_class};
pub use links::extract_links;
pub use markdown::{to_markdown, Converted, Heading};
pub use spa::SpaReport;

use crate::config::{CrawlConfig, SpaConfig};
use scraper::Html;
use tracing::debug;
use url::Url;

/// Per-page extraction settings
#[derive(Debug, Clone)]
pub struct ExtractOptions {
    /// Run the SPA probe on this page
    pub probe_spa: bool,
    pub spa: SpaConfig,
    pub min_content_length: usize,
    /// Log the chosen strategy and counts for every page
    pub debug: bool,
}

impl ExtractOptions {
    /// Options for pages that are not SPA-probed
    pub fn from_config(config: &CrawlConfig) -> Self {
        Self {
            probe_spa: false,
            spa: config.spa.clone(),
            min_content_length: config.min_content_length,
            debug: config.debug,
        }
    }

    pub fn with_spa_probe(mut self, probe: bool) -> Self {
        self.probe_spa = probe;
        self
    }
}

/// A page that passed every filter
#[derive(Debug, Clone)]
pub struct PageResult {
    pub url: Url,
    pub title: Option<String>,
    pub markdown: String,
    pub headings: Vec<Heading>,
    pub links: Vec<Url>,
    pub char_count: usize,
    pub word_count: usize,
    pub code_block_count: usize,
    pub html_bytes: usize,
}

/// Disposition of a non-SPA page
#[derive(Debug, Clone)]
pub enum PageOutcome {
    Page(PageResult),
    TooSmall { chars: usize },
    Junk { title: String },
}

/// Links of a page plus its disposition
#[derive(Debug, Clone)]
pub struct Extraction {
    pub links: Vec<Url>,
    pub outcome: PageOutcome,
}

#[derive(Debug, Clone)]
pub enum Extracted {
    /// The page is a client-rendered shell; the crawl must stop
    Spa(SpaReport),
    Page(Extraction),
}

/// Extracts links and main content from a fetched document
///
/// `url` is the post-redirect URL the document was served from.
pub fn extract(html: &str, url: &Url, options: &ExtractOptions) -> Extracted {
    let document = Html::parse_document(html);
    let links = extract_links(&document, url);

    if options.probe_spa {
        let report = spa::evaluate(&document, html.len(), links.len(), url.as_str(), &options.spa);
        if report.is_spa() {
            return Extracted::Spa(report);
        }
        debug!(
            "SPA probe for {}: {} of 5 indicators ({})",
            url,
            report.fired(),
            report.fired_names().join(", ")
        );
    }

    let title = page_title(&document);
    if let Some(title) = title.as_deref().filter(|title| is_junk_title(title)) {
        return Extracted::Page(Extraction {
            links,
            outcome: PageOutcome::Junk {
                title: title.to_string(),
            },
        });
    }

    let content = select_main_content(&document);
    let stats = dom::text_stats(content.element, content.strip_chrome);

    if options.debug {
        debug!(
            "Extracted {} via {} strategy: {} chars, {} words, {} links",
            url,
            content.strategy,
            stats.chars,
            stats.words,
            links.len()
        );
    }

    if is_too_small(stats.chars, options.min_content_length) {
        return Extracted::Page(Extraction {
            links,
            outcome: PageOutcome::TooSmall { chars: stats.chars },
        });
    }

    let converted = to_markdown(&content, url, title.as_deref());

    Extracted::Page(Extraction {
        links: links.clone(),
        outcome: PageOutcome::Page(PageResult {
            url: url.clone(),
            title,
            markdown: converted.markdown,
            headings: converted.headings,
            links,
            char_count: stats.chars,
            word_count: stats.words,
            code_block_count: converted.code_blocks,
            html_bytes: html.len(),
        }),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options(probe_spa: bool, min_content_length: usize) -> ExtractOptions {
        ExtractOptions {
            probe_spa,
            spa: SpaConfig::default(),
            min_content_length,
            debug: true,
        }
    }

    fn page_url() -> Url {
        Url::parse("https://docs.example.com/guide/").unwrap()
    }

    #[test]
    fn test_extracts_page_with_navigation_links() {
        let html = r#"<html><head><title>Guide - Docs</title></head><body>
            <nav><a href="/guide/install">Install</a><a href="/guide/usage">Usage</a></nav>
            <main><h1>Guide</h1><p>Docsweep turns a documentation site into one file.</p>
            <h2>Next steps</h2><p>Read the <a href="usage">usage</a> page.</p></main>
            <footer><a href="/about">About</a></footer></body></html>"#;

        let Extracted::Page(extraction) = extract(html, &page_url(), &options(true, 20)) else {
            panic!("expected a page");
        };
        assert_eq!(extraction.links.len(), 3);

        let PageOutcome::Page(page) = extraction.outcome else {
            panic!("expected an included page");
        };
        assert_eq!(page.title.as_deref(), Some("Guide"));
        assert!(!page.markdown.contains("# Guide\n"));
        assert!(page
            .markdown
            .contains("[usage](https://docs.example.com/guide/usage)"));
        assert_eq!(page.headings.len(), 1);
        assert_eq!(page.headings[0].anchor, "next-steps");
        assert_eq!(page.html_bytes, html.len());
        assert!(page.word_count > 10);
    }

    #[test]
    fn test_spa_shell_detected_only_when_probed() {
        let html = r#"<html><head><title>App</title></head><body><div id="root"></div></body></html>"#;

        assert!(matches!(
            extract(html, &page_url(), &options(true, 100)),
            Extracted::Spa(_)
        ));
        assert!(matches!(
            extract(html, &page_url(), &options(false, 100)),
            Extracted::Page(Extraction {
                outcome: PageOutcome::TooSmall { .. },
                ..
            })
        ));
    }

    #[test]
    fn test_junk_title_keeps_links() {
        let html = r#"<html><body><h1>Privacy Policy</h1><p>We collect nothing.</p>
            <a href="/guide/">Back</a></body></html>"#;

        let Extracted::Page(extraction) = extract(html, &page_url(), &options(false, 0)) else {
            panic!("expected a page");
        };
        assert_eq!(extraction.links.len(), 1);
        assert!(matches!(extraction.outcome, PageOutcome::Junk { ref title } if title == "Privacy Policy"));
    }

    #[test]
    fn test_too_small_page() {
        let html = "<html><body><main><p>Short.</p></main></body></html>";
        let Extracted::Page(extraction) = extract(html, &page_url(), &options(false, 100)) else {
            panic!("expected a page");
        };
        assert!(matches!(extraction.outcome, PageOutcome::TooSmall { chars: 6 }));
    }

    #[test]
    fn test_extraction_is_deterministic() {
        let html = r#"<html><body><article><h2>A</h2><p>Same input, same output.</p>
            <pre><code>npm install docsweep</code></pre></article></body></html>"#;
        let first = extract(html, &page_url(), &options(false, 0));
        let second = extract(html, &page_url(), &options(false, 0));

        let (Extracted::Page(first), Extracted::Page(second)) = (first, second) else {
            panic!("expected pages");
        };
        let (PageOutcome::Page(first), PageOutcome::Page(second)) = (first.outcome, second.outcome)
        else {
            panic!("expected included pages");
        };
        assert_eq!(first.markdown, second.markdown);
        assert_eq!(first.headings, second.headings);
        assert_eq!(first.code_block_count, 1);
        assert!(first.markdown.contains("```bash\nnpm install docsweep\n```"));
    }
}
