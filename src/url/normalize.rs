use crate::UrlError;
use url::Url;

/// Query parameters that only carry click or campaign tracking
const TRACKING_PARAMS: &[&str] = &["fbclid", "gclid", "msclkid", "mc_cid", "mc_eid", "_ga"];

/// Normalizes a URL into the form used for dedup and cache keys
///
/// # Normalization Steps
///
/// 1. Parse; only `http` and `https` are accepted
/// 2. Lowercase the host, drop the scheme's default port
/// 3. Resolve `.` and `..`, collapse `//`; directory-style paths (an
///    existing trailing slash, or a last segment without a `.`) end in `/`,
///    file-style paths such as `/api/index.html` are kept as they are
/// 4. Drop the fragment
/// 5. Drop tracking parameters (`utm_*` and friends), sort the rest by
///    key, drop an empty query
///
/// Normalizing an already normalized URL returns it unchanged.
///
/// # Examples
///
/// ```
/// use docsweep::url::normalize_url;
///
/// let url = normalize_url("https://DOCS.EXAMPLE.COM:443/guide#intro").unwrap();
/// assert_eq!(url.as_str(), "https://docs.example.com/guide/");
/// ```
pub fn normalize_url(url_str: &str) -> Result<Url, UrlError> {
    let url = Url::parse(url_str).map_err(|e| UrlError::Parse(e.to_string()))?;
    normalize_parsed(url)
}

/// Normalizes an already parsed URL
///
/// Same rules as [`normalize_url`], without the string round trip.
pub fn normalize_parsed(mut url: Url) -> Result<Url, UrlError> {
    if !matches!(url.scheme(), "http" | "https") {
        return Err(UrlError::InvalidScheme(format!(
            "expected http or https, got: {}",
            url.scheme()
        )));
    }

    lowercase_host(&mut url)?;
    strip_default_port(&mut url)?;

    let path = clean_path(url.path());
    url.set_path(&path);
    url.set_fragment(None);
    clean_query(&mut url);

    Ok(url)
}

fn lowercase_host(url: &mut Url) -> Result<(), UrlError> {
    let host = url.host_str().ok_or(UrlError::MissingDomain)?;
    if host.bytes().any(|b| b.is_ascii_uppercase()) {
        let lowered = host.to_ascii_lowercase();
        url.set_host(Some(&lowered))
            .map_err(|e| UrlError::Malformed(format!("cannot set host {}: {}", lowered, e)))?;
    }
    Ok(())
}

fn strip_default_port(url: &mut Url) -> Result<(), UrlError> {
    let default = match url.scheme() {
        "http" => 80,
        _ => 443,
    };
    if url.port() == Some(default) {
        url.set_port(None)
            .map_err(|_| UrlError::Malformed(format!("cannot clear port of {}", url)))?;
    }
    Ok(())
}

/// Resolves dot segments and empty segments and applies the slash policy
fn clean_path(path: &str) -> String {
    let segments = path.split('/').fold(Vec::new(), |mut kept, segment| {
        match segment {
            "" | "." => {}
            ".." => {
                kept.pop();
            }
            other => kept.push(other),
        }
        kept
    });

    let Some(last) = segments.last() else {
        return "/".to_string();
    };

    let directory = path.ends_with('/') || !last.contains('.');
    if directory {
        format!("/{}/", segments.join("/"))
    } else {
        format!("/{}", segments.join("/"))
    }
}

fn clean_query(url: &mut Url) {
    if url.query().is_none() {
        return;
    }

    let mut params: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| !is_tracking_param(key))
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect();

    if params.is_empty() {
        url.set_query(None);
        return;
    }

    // Stable: repeated keys keep their relative order
    params.sort_by(|a, b| a.0.cmp(&b.0));
    url.query_pairs_mut().clear().extend_pairs(params);
}

fn is_tracking_param(key: &str) -> bool {
    key.starts_with("utm_") || TRACKING_PARAMS.contains(&key)
}
