//! HTML to Markdown conversion
//!
//! The converter walks the selected content element once. Block elements
//! (headings, paragraphs, lists, code, tables, quotes) become Markdown blocks
//! separated by blank lines; runs of inline content between blocks are
//! grouped into paragraphs.

use super::anchor::SlugRegistry;
use super::content::MainContent;
use super::dom::{is_skipped, plain_text, MAX_DEPTH};
use super::language::{detect_language, language_from_class};
use scraper::node::Node;
use scraper::{ElementRef, Selector};
use serde::{Deserialize, Serialize};
use url::Url;

/// A heading of a converted page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Heading {
    pub level: u8,
    pub text: String,
    /// Anchor unique within the page
    pub anchor: String,
}

/// Result of converting one page
#[derive(Debug, Clone, Default)]
pub struct Converted {
    pub markdown: String,
    pub headings: Vec<Heading>,
    pub code_blocks: usize,
}

const BLOCK_TAGS: &[&str] = &[
    "address",
    "article",
    "aside",
    "blockquote",
    "body",
    "details",
    "dd",
    "div",
    "dl",
    "dt",
    "fieldset",
    "figcaption",
    "figure",
    "footer",
    "form",
    "h1",
    "h2",
    "h3",
    "h4",
    "h5",
    "h6",
    "header",
    "hr",
    "html",
    "li",
    "main",
    "nav",
    "ol",
    "p",
    "pre",
    "section",
    "summary",
    "table",
    "tbody",
    "td",
    "tfoot",
    "th",
    "thead",
    "tr",
    "ul",
];

/// Converts the selected content element to Markdown
///
/// The first `<h1>` whose text equals `title` is left out, since the
/// document assembler emits the page title itself.
pub fn to_markdown(content: &MainContent<'_>, base_url: &Url, title: Option<&str>) -> Converted {
    let mut converter = Converter {
        base_url,
        strip_chrome: content.strip_chrome,
        skip_title: title.map(str::to_string),
        slugs: SlugRegistry::new(),
        headings: Vec::new(),
        code_blocks: 0,
    };

    let blocks = converter.blocks(content.element, 0);

    Converted {
        markdown: blocks.join("\n\n"),
        headings: converter.headings,
        code_blocks: converter.code_blocks,
    }
}

struct Converter<'u> {
    base_url: &'u Url,
    strip_chrome: bool,
    skip_title: Option<String>,
    slugs: SlugRegistry,
    headings: Vec<Heading>,
    code_blocks: usize,
}

impl Converter<'_> {
    fn blocks(&mut self, parent: ElementRef<'_>, depth: usize) -> Vec<String> {
        let mut out = Vec::new();
        if depth > MAX_DEPTH {
            return out;
        }

        let mut inline = String::new();
        for child in parent.children() {
            match child.value() {
                Node::Text(text) => inline.push_str(&collapse_whitespace(text)),
                Node::Element(el) => {
                    let tag = el.name();
                    if is_skipped(tag, self.strip_chrome) {
                        continue;
                    }
                    let Some(child_el) = ElementRef::wrap(child) else {
                        continue;
                    };
                    if BLOCK_TAGS.contains(&tag) {
                        flush_paragraph(&mut inline, &mut out);
                        self.block(child_el, tag, depth + 1, &mut out);
                    } else {
                        inline.push_str(&self.inline(child_el, depth + 1));
                    }
                }
                _ => {}
            }
        }
        flush_paragraph(&mut inline, &mut out);

        out
    }

    fn block(&mut self, element: ElementRef<'_>, tag: &str, depth: usize, out: &mut Vec<String>) {
        match tag {
            "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
                let level = tag[1..].parse::<u8>().unwrap_or(2);
                if let Some(heading) = self.heading(element, level) {
                    out.push(heading);
                }
            }
            "p" | "dt" | "summary" | "figcaption" => {
                let text = self.inline_children(element, depth);
                let text = text.trim();
                if !text.is_empty() {
                    if tag == "dt" || tag == "summary" {
                        out.push(format!("**{}**", text));
                    } else {
                        out.push(text.to_string());
                    }
                }
            }
            "pre" => {
                if let Some(code) = self.code_block(element) {
                    out.push(code);
                }
            }
            "ul" | "ol" => {
                let list = self.list(element, tag == "ol", depth);
                if !list.is_empty() {
                    out.push(list);
                }
            }
            "blockquote" => {
                let inner = self.blocks(element, depth).join("\n\n");
                if !inner.trim().is_empty() {
                    out.push(
                        inner
                            .lines()
                            .map(|line| {
                                if line.is_empty() {
                                    ">".to_string()
                                } else {
                                    format!("> {}", line)
                                }
                            })
                            .collect::<Vec<_>>()
                            .join("\n"),
                    );
                }
            }
            "table" => {
                if let Some(table) = self.table(element, depth) {
                    out.push(table);
                }
            }
            "hr" => out.push("---".to_string()),
            _ => out.extend(self.blocks(element, depth)),
        }
    }

    fn heading(&mut self, element: ElementRef<'_>, level: u8) -> Option<String> {
        let text = plain_text(element);
        if text.is_empty() {
            return None;
        }

        if level == 1 && self.skip_title.as_deref() == Some(text.as_str()) {
            self.skip_title = None;
            return None;
        }

        let anchor = self.slugs.unique(&text);
        let line = format!("{} {}", "#".repeat(level as usize), text);
        self.headings.push(Heading {
            level,
            text,
            anchor,
        });
        Some(line)
    }

    fn code_block(&mut self, pre: ElementRef<'_>) -> Option<String> {
        let code_el = pre
            .children()
            .filter_map(ElementRef::wrap)
            .find(|el| el.value().name() == "code");

        let raw: String = pre.text().collect();
        let code = raw.trim_start_matches(['\n', '\r']).trim_end();
        if code.trim().is_empty() {
            return None;
        }

        let parent = pre.parent().and_then(ElementRef::wrap);
        let language = [code_el, Some(pre), parent]
            .into_iter()
            .flatten()
            .find_map(|el| el.value().attr("class").and_then(language_from_class))
            .unwrap_or_else(|| detect_language(code).to_string());

        let mut fence = "```".to_string();
        while code.contains(fence.as_str()) {
            fence.push('`');
        }

        self.code_blocks += 1;
        Some(format!("{fence}{language}\n{code}\n{fence}"))
    }

    fn list(&mut self, list: ElementRef<'_>, ordered: bool, depth: usize) -> String {
        let mut index = list
            .value()
            .attr("start")
            .and_then(|start| start.trim().parse::<usize>().ok())
            .unwrap_or(1);

        let mut lines = Vec::new();
        for item in list
            .children()
            .filter_map(ElementRef::wrap)
            .filter(|el| el.value().name() == "li")
        {
            let body = self.blocks(item, depth + 1).join("\n");
            if body.trim().is_empty() {
                continue;
            }

            let marker = if ordered {
                let marker = format!("{}.", index);
                index += 1;
                marker
            } else {
                "-".to_string()
            };

            for (i, line) in body.lines().enumerate() {
                if i == 0 {
                    lines.push(format!("{} {}", marker, line));
                } else if line.is_empty() {
                    lines.push(String::new());
                } else {
                    lines.push(format!("    {}", line));
                }
            }
        }

        lines.join("\n")
    }

    fn table(&mut self, table: ElementRef<'_>, depth: usize) -> Option<String> {
        let row_selector = Selector::parse("tr").ok()?;
        let rows: Vec<Vec<String>> = table
            .select(&row_selector)
            .map(|row| {
                row.children()
                    .filter_map(ElementRef::wrap)
                    .filter(|cell| matches!(cell.value().name(), "th" | "td"))
                    .map(|cell| {
                        self.inline_children(cell, depth)
                            .trim()
                            .replace('|', "\\|")
                            .replace('\n', " ")
                    })
                    .collect::<Vec<_>>()
            })
            .filter(|cells| !cells.is_empty())
            .collect();

        let columns = rows.iter().map(Vec::len).max()?;
        let render = |cells: &[String]| {
            let mut padded = cells.to_vec();
            padded.resize(columns, String::new());
            format!("| {} |", padded.join(" | "))
        };

        let mut lines = Vec::with_capacity(rows.len() + 1);
        lines.push(render(&rows[0]));
        lines.push(format!("|{}", " --- |".repeat(columns)));
        lines.extend(rows[1..].iter().map(|row| render(row)));

        Some(lines.join("\n"))
    }

    /// Inline Markdown of an element's children
    fn inline_children(&self, element: ElementRef<'_>, depth: usize) -> String {
        let mut text = String::new();
        if depth > MAX_DEPTH {
            return text;
        }

        for child in element.children() {
            match child.value() {
                Node::Text(t) => text.push_str(&collapse_whitespace(t)),
                Node::Element(el) if !is_skipped(el.name(), self.strip_chrome) => {
                    if let Some(child_el) = ElementRef::wrap(child) {
                        text.push_str(&self.inline(child_el, depth + 1));
                    }
                }
                _ => {}
            }
        }
        text
    }

    fn inline(&self, element: ElementRef<'_>, depth: usize) -> String {
        match element.value().name() {
            "br" => "  \n".to_string(),
            "code" | "kbd" | "samp" | "tt" => {
                let code = collapse_whitespace(&element.text().collect::<String>());
                let code = code.trim();
                if code.is_empty() {
                    String::new()
                } else if code.contains('`') {
                    format!("`` {} ``", code)
                } else {
                    format!("`{}`", code)
                }
            }
            "strong" | "b" => emphasize("**", &self.inline_children(element, depth)),
            "em" | "i" => emphasize("*", &self.inline_children(element, depth)),
            "a" => {
                let text = self.inline_children(element, depth);
                match element
                    .value()
                    .attr("href")
                    .and_then(|href| self.absolute(href))
                {
                    Some(href) if !text.trim().is_empty() => {
                        surround(&text, |inner| format!("[{}]({})", inner, href))
                    }
                    _ => text,
                }
            }
            "img" => {
                let alt = element.value().attr("alt").unwrap_or("").trim();
                match element.value().attr("src").and_then(|src| self.absolute(src)) {
                    Some(src) => format!("![{}]({})", alt, src),
                    None => alt.to_string(),
                }
            }
            _ => self.inline_children(element, depth),
        }
    }

    fn absolute(&self, href: &str) -> Option<String> {
        let href = href.trim();
        if href.is_empty() || href.starts_with('#') || href.starts_with("javascript:") {
            return None;
        }
        self.base_url.join(href).ok().map(String::from)
    }
}

/// Collapses each whitespace run to a single space, keeping edge spaces
fn collapse_whitespace(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_space = false;
    for c in text.chars() {
        if c.is_whitespace() {
            if !in_space {
                out.push(' ');
            }
            in_space = true;
        } else {
            out.push(c);
            in_space = false;
        }
    }
    out
}

fn flush_paragraph(inline: &mut String, out: &mut Vec<String>) {
    let paragraph = inline.trim();
    if !paragraph.is_empty() {
        out.push(paragraph.to_string());
    }
    inline.clear();
}

fn emphasize(marker: &str, text: &str) -> String {
    surround(text, |inner| format!("{marker}{inner}{marker}"))
}

/// Applies `wrap` to the trimmed text and restores the edge spaces
fn surround(text: &str, wrap: impl FnOnce(&str) -> String) -> String {
    let inner = text.trim();
    if inner.is_empty() {
        return text.to_string();
    }
    let lead = if text.starts_with(char::is_whitespace) { " " } else { "" };
    let trail = if text.ends_with(char::is_whitespace) { " " } else { "" };
    format!("{}{}{}", lead, wrap(inner), trail)
}
