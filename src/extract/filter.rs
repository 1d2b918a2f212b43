//! Junk and size filters

use url::Url;

/// Path segments and titles that identify boilerplate pages
const JUNK_PATTERNS: &[&str] = &[
    "privacy-policy",
    "terms-of-service",
    "cookie-policy",
    "legal",
    "license",
];

/// Returns true if any path segment is a known junk page name
pub fn is_junk_path(url: &Url) -> bool {
    url.path_segments()
        .map(|mut segments| {
            segments.any(|segment| {
                let segment = segment.to_ascii_lowercase();
                JUNK_PATTERNS.contains(&segment.as_str())
            })
        })
        .unwrap_or(false)
}

/// Returns true if the page title names a known junk page
///
/// `Privacy Policy` and `privacy-policy` both match.
pub fn is_junk_title(title: &str) -> bool {
    let slug = title
        .trim()
        .to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("-");

    JUNK_PATTERNS.contains(&slug.as_str())
}

/// Returns true if the extracted text is shorter than the configured minimum
pub fn is_too_small(text_chars: usize, min_content_length: usize) -> bool {
    text_chars < min_content_length
}
