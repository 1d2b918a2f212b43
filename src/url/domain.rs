use crate::url::normalize::normalize_parsed;
use crate::{UrlError, UrlResult};
use url::Url;

/// File extensions that never lead to a documentation page
const IGNORED_EXTENSIONS: &[&str] = &[
    "pdf", "zip", "tar", "gz", "exe", "dmg", "jpg", "png", "gif", "svg",
];

/// Extracts the domain from a URL
///
/// This function retrieves the host portion of a URL and converts it to lowercase.
/// If the URL has no host (which shouldn't happen for valid HTTP(S) URLs), it returns None.
///
/// # Examples
///
/// ```
/// use url::Url;
/// use docsweep::url::extract_domain;
///
/// let url = Url::parse("https://EXAMPLE.COM/path").unwrap();
/// assert_eq!(extract_domain(&url), Some("example.com".to_string()));
/// ```
pub fn extract_domain(url: &Url) -> Option<String> {
    url.host_str().map(|h| h.to_lowercase())
}

/// Returns true if the URL path ends in a binary/archive/image extension
pub fn has_ignored_extension(url: &Url) -> bool {
    let last = url
        .path_segments()
        .and_then(|mut segments| segments.next_back())
        .unwrap_or("");

    match last.rsplit_once('.') {
        Some((_, ext)) => {
            let ext = ext.to_ascii_lowercase();
            IGNORED_EXTENSIONS.contains(&ext.as_str())
        }
        None => false,
    }
}

/// The crawl boundary: every URL on the base URL's host
///
/// A URL is in scope when its host and explicit port match the base URL.
/// In-scope URLs are rewritten to the base URL's scheme so that `http://`
/// and `https://` spellings of one page share a dedup key.
#[derive(Debug, Clone)]
pub struct DomainScope {
    base: Url,
    host: String,
    port: Option<u16>,
}

impl DomainScope {
    /// Creates a scope rooted at the (normalized) base URL
    pub fn new(base: &Url) -> UrlResult<Self> {
        let base = normalize_parsed(base.clone())?;
        let host = extract_domain(&base).ok_or(UrlError::MissingDomain)?;
        let port = base.port();
        Ok(Self { base, host, port })
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    /// Returns true if the URL shares the base host and port
    pub fn contains(&self, url: &Url) -> bool {
        extract_domain(url).as_deref() == Some(self.host.as_str()) && url.port() == self.port
    }

    /// Normalizes an in-scope URL and coerces it to the base scheme
    ///
    /// # Returns
    ///
    /// * `Some(Url)` - The dedup key for the URL
    /// * `None` - The URL is outside the crawl domain or not HTTP(S)
    pub fn admit(&self, url: &Url) -> Option<Url> {
        if !self.contains(url) {
            return None;
        }

        let mut candidate = url.clone();
        if candidate.scheme() != self.base.scheme()
            && candidate.set_scheme(self.base.scheme()).is_err()
        {
            return None;
        }

        normalize_parsed(candidate).ok()
    }
}
