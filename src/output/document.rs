//! Document assembly
//!
//! Pages arrive from workers in completion order. The assembler restores
//! discovery order, derives each page's title and builds the table of
//! contents with anchors that are unique across the whole document.

use super::stats::CrawlStats;
use crate::extract::{PageResult, SlugRegistry};
use chrono::{DateTime, Utc};
use tracing::debug;

/// Heading of the document preamble
pub fn document_heading(base_url: &str) -> String {
    format!("Documentation: {}", base_url)
}

pub const TOC_HEADING: &str = "Table of Contents";

/// One line of the table of contents
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TocEntry {
    /// 1 for page titles, the heading level otherwise
    pub level: u8,
    pub text: String,
    pub anchor: String,
}

/// One page of the document
#[derive(Debug, Clone)]
pub struct Section {
    pub url: String,
    /// None for pages without any usable title
    pub title: Option<String>,
    pub body: String,
}

/// The ordered document model handed to the writer
#[derive(Debug, Clone)]
pub struct Document {
    pub base_url: String,
    pub generated_at: DateTime<Utc>,
    pub toc: Vec<TocEntry>,
    pub sections: Vec<Section>,
}

impl Document {
    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }
}

/// Builds a [`Document`] from the pages collected during a run
#[derive(Debug)]
pub struct Assembler {
    base_url: String,
    toc_depth: u8,
    pages: Vec<(u64, PageResult)>,
}

impl Assembler {
    pub fn new(base_url: impl Into<String>, toc_depth: u8) -> Self {
        Self {
            base_url: base_url.into(),
            toc_depth,
            pages: Vec::new(),
        }
    }

    /// Accepts a page tagged with its discovery sequence
    pub fn push(&mut self, seq: u64, page: PageResult) {
        self.pages.push((seq, page));
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    /// Orders the pages and builds the table of contents
    ///
    /// Records the number of untitled pages in `stats.empty_toc_skipped`.
    pub fn assemble(mut self, stats: &mut CrawlStats) -> Document {
        self.pages.sort_by_key(|(seq, _)| *seq);

        let mut slugs = SlugRegistry::new();
        slugs.unique(&document_heading(&self.base_url));
        slugs.unique(TOC_HEADING);

        let mut toc = Vec::new();
        let mut sections = Vec::with_capacity(self.pages.len());
        let mut untitled = 0;

        for (_, page) in self.pages {
            let title = page
                .title
                .clone()
                .filter(|title| !title.trim().is_empty())
                .or_else(|| path_title(&page));

            match &title {
                Some(title) => {
                    toc.push(TocEntry {
                        level: 1,
                        text: title.clone(),
                        anchor: slugs.unique(title),
                    });
                }
                None => {
                    debug!("Skipping untitled page in table of contents: {}", page.url);
                    untitled += 1;
                }
            }

            for heading in &page.headings {
                let anchor = slugs.unique(&heading.text);
                if title.is_some() && (2..=self.toc_depth).contains(&heading.level) {
                    toc.push(TocEntry {
                        level: heading.level,
                        text: heading.text.clone(),
                        anchor,
                    });
                }
            }

            sections.push(Section {
                url: page.url.to_string(),
                title,
                body: page.markdown,
            });
        }

        stats.empty_toc_skipped = untitled;

        Document {
            base_url: self.base_url,
            generated_at: Utc::now(),
            toc,
            sections,
        }
    }
}

/// Title derived from the URL path, `/guide/install/` becomes `guide install`
fn path_title(page: &PageResult) -> Option<String> {
    let title = page
        .url
        .path()
        .split('/')
        .filter(|segment| !segment.is_empty())
        .collect::<Vec<_>>()
        .join(" ");

    (!title.is_empty()).then_some(title)
}
