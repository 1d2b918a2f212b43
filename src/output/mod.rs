//! Output module for assembling and writing crawl results
//!
//! This module handles:
//! - Collecting crawl statistics
//! - Assembling pages into an ordered document with a table of contents
//! - Rendering the document as Markdown
//! - Validating output quality
//! - Writing the Markdown file and its metadata record

mod document;
mod markdown;
mod metadata;
pub mod stats;
mod validation;

pub use document::{Assembler, Document, Section, TocEntry};
pub use markdown::render_markdown;
pub use metadata::{ConfigSummary, RunMetadata};
pub use stats::{print_statistics, CrawlStats, StatEvent};
pub use validation::{expected_ratio, validate_output};

use crate::Result;
use std::path::{Path, PathBuf};
use tracing::info;

/// Path of the metadata record belonging to a Markdown output file
///
/// `out/docs.md` maps to `out/docs.metadata.json`.
pub fn metadata_path(markdown_path: &Path) -> PathBuf {
    let stem = markdown_path
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "docs".to_string());
    markdown_path.with_file_name(format!("{}.metadata.json", stem))
}

/// Writes the Markdown document and its metadata record
///
/// Parent directories are created as needed. Returns the metadata path.
pub async fn write_outputs(
    markdown: &str,
    metadata: &RunMetadata,
    markdown_path: &Path,
) -> Result<PathBuf> {
    if let Some(parent) = markdown_path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await?;
        }
    }

    tokio::fs::write(markdown_path, markdown).await?;
    info!("Documentation written to {}", markdown_path.display());

    let meta_path = metadata_path(markdown_path);
    let json = serde_json::to_string_pretty(metadata)?;
    tokio::fs::write(&meta_path, json).await?;
    info!("Metadata written to {}", meta_path.display());

    Ok(meta_path)
}
