//! Markdown rendering of the assembled document

use super::document::{document_heading, Document, TOC_HEADING};
use super::stats::CrawlStats;

/// Renders the document as one Markdown file
///
/// Layout: preamble with run summary, table of contents, then every page
/// under its title followed by a source attribution line.
pub fn render_markdown(document: &Document, stats: &CrawlStats) -> String {
    let mut md = String::new();

    md.push_str(&format!("# {}\n\n", document_heading(&document.base_url)));
    md.push_str(&format!(
        "*Generated by docsweep v{} on {}*\n\n",
        crate::VERSION,
        document.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));

    md.push_str(&format!("- **Pages**: {}\n", stats.pages_included));
    md.push_str(&format!("- **Failed pages**: {}\n", stats.failed));
    md.push_str(&format!("- **Cache hits**: {}\n", stats.cache_hits));
    md.push_str(&format!("- **Links found**: {}\n", stats.links_found));
    md.push_str(&format!("- **Code blocks**: {}\n\n", stats.code_blocks));

    md.push_str(&format!("## {}\n\n", TOC_HEADING));
    for entry in &document.toc {
        let indent = "    ".repeat(usize::from(entry.level.saturating_sub(1)));
        md.push_str(&format!(
            "{}- [{}](#{})\n",
            indent,
            escape_link_text(&entry.text),
            entry.anchor
        ));
    }
    md.push_str("\n---\n\n");

    for section in &document.sections {
        if let Some(title) = &section.title {
            md.push_str(&format!("# {}\n\n", title));
        }
        if !section.body.is_empty() {
            md.push_str(&section.body);
            md.push_str("\n\n");
        }
        md.push_str(&format!("*Source: [{0}]({0})*\n\n", section.url));
        md.push_str("---\n\n");
    }

    md
}

/// Backslash-escapes characters that would end or restyle link text
fn escape_link_text(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '\\' | '[' | ']' | '*' | '_' | '`') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::document::{Section, TocEntry};
    use chrono::Utc;

    fn document() -> Document {
        Document {
            base_url: "https://docs.example.com/".to_string(),
            generated_at: Utc::now(),
            toc: vec![
                TocEntry {
                    level: 1,
                    text: "Install".to_string(),
                    anchor: "install".to_string(),
                },
                TocEntry {
                    level: 2,
                    text: "Requirements".to_string(),
                    anchor: "requirements".to_string(),
                },
            ],
            sections: vec![
                Section {
                    url: "https://docs.example.com/install".to_string(),
                    title: Some("Install".to_string()),
                    body: "## Requirements\n\nA computer.".to_string(),
                },
                Section {
                    url: "https://docs.example.com/".to_string(),
                    title: None,
                    body: "Welcome.".to_string(),
                },
            ],
        }
    }

    #[test]
    fn test_render_layout() {
        let stats = CrawlStats {
            pages_included: 2,
            ..CrawlStats::default()
        };
        let md = render_markdown(&document(), &stats);

        assert!(md.starts_with("# Documentation: https://docs.example.com/\n\n"));
        assert!(md.contains("- **Pages**: 2\n"));
        assert!(md.contains("## Table of Contents\n\n- [Install](#install)\n    - [Requirements](#requirements)\n\n---\n\n"));
        assert!(md.contains(
            "# Install\n\n## Requirements\n\nA computer.\n\n*Source: [https://docs.example.com/install](https://docs.example.com/install)*\n\n---\n\n"
        ));
        assert!(md.contains("---\n\nWelcome.\n\n*Source:"));
    }

    #[test]
    fn test_toc_text_is_escaped() {
        assert_eq!(escape_link_text("Vec<[u8]>"), r"Vec<\[u8\]>");
        assert_eq!(escape_link_text("*args and __init__"), r"\*args and \_\_init\_\_");
        assert_eq!(escape_link_text("Plain title"), "Plain title");

        let mut doc = document();
        doc.toc[1].text = "Vec<[u8]>".to_string();
        doc.toc[1].anchor = "vecu8".to_string();
        let md = render_markdown(&doc, &CrawlStats::default());
        assert!(md.contains(r"    - [Vec<\[u8\]>](#vecu8)"));
    }
}
