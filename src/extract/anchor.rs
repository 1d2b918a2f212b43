//! Heading anchors
//!
//! Anchors follow the GitHub Markdown convention so that links in the
//! generated table of contents resolve when the document is rendered:
//! lowercase, punctuation dropped, spaces turned into hyphens, and
//! repeated slugs suffixed with `-1`, `-2`, ...

use std::collections::{HashMap, HashSet};

/// Converts heading text to its anchor slug
pub fn slugify(text: &str) -> String {
    text.trim()
        .to_lowercase()
        .chars()
        .filter_map(|c| match c {
            ' ' => Some('-'),
            '-' | '_' => Some(c),
            c if c.is_alphanumeric() => Some(c),
            _ => None,
        })
        .collect()
}

/// Hands out document-unique anchors
#[derive(Debug, Default)]
pub struct SlugRegistry {
    used: HashSet<String>,
    next_suffix: HashMap<String, usize>,
}

impl SlugRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a unique anchor for the heading text and reserves it
    pub fn unique(&mut self, text: &str) -> String {
        let mut base = slugify(text);
        if base.is_empty() {
            base = "section".to_string();
        }

        if self.used.insert(base.clone()) {
            return base;
        }

        let suffix = self.next_suffix.entry(base.clone()).or_insert(1);
        loop {
            let candidate = format!("{}-{}", base, suffix);
            *suffix += 1;
            if self.used.insert(candidate.clone()) {
                return candidate;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Getting Started"), "getting-started");
        assert_eq!(slugify("What's new in v2.0?"), "whats-new-in-v20");
        assert_eq!(slugify("  snake_case and-dashes "), "snake_case-and-dashes");
        assert_eq!(slugify("API: `Client::new`"), "api-clientnew");
    }

    #[test]
    fn test_unique_suffixes() {
        let mut registry = SlugRegistry::new();
        assert_eq!(registry.unique("Install"), "install");
        assert_eq!(registry.unique("Install"), "install-1");
        assert_eq!(registry.unique("install"), "install-2");
        assert_eq!(registry.unique("Install 1"), "install-1-1");
    }

    #[test]
    fn test_empty_heading_gets_placeholder() {
        let mut registry = SlugRegistry::new();
        assert_eq!(registry.unique("!!!"), "section");
        assert_eq!(registry.unique(""), "section-1");
    }
}
