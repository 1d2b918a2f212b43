//! URL handling module for Docsweep
//!
//! This module provides URL normalization, domain extraction and the crawl
//! scope that decides which discovered links belong to the documentation site.

mod domain;
mod normalize;

// Re-export main functions
pub use domain::{extract_domain, has_ignored_extension, DomainScope};
pub use normalize::{normalize_parsed, normalize_url};
