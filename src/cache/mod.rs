//! Content-addressed page cache
//!
//! Raw fetched HTML is stored on disk under a file name derived from the
//! SHA-256 of the page's normalized URL. The cache survives across runs and
//! is only emptied on request (`clear-cache-first`).
//!
//! Layout of the cache directory:
//!
//! ```text
//! <cache-dir>/
//!   <sha256-hex>.html        raw HTML, exactly as fetched
//!   <sha256-hex>.meta.json   CacheEntry (url, final url after redirects, fetch time)
//! ```

use crate::CacheError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use url::Url;

const HTML_SUFFIX: &str = ".html";
const META_SUFFIX: &str = ".meta.json";
const TMP_SUFFIX: &str = ".tmp";

/// Record describing one cached page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct CacheEntry {
    /// Hex SHA-256 of the normalized URL
    pub key: String,

    /// Normalized URL the entry was stored under
    pub url: String,

    /// URL the response was served from after redirects
    pub final_url: String,

    /// Path of the stored HTML file
    pub stored_path: PathBuf,

    pub fetched_at: DateTime<Utc>,
}

/// A cache hit
#[derive(Debug, Clone)]
pub struct CachedPage {
    pub html: String,
    pub entry: CacheEntry,
}

/// On-disk content-addressed cache
#[derive(Debug, Clone)]
pub struct PageCache {
    dir: PathBuf,
}

/// Computes the cache key for a normalized URL
pub fn cache_key(url: &Url) -> String {
    let mut hasher = Sha256::new();
    hasher.update(url.as_str().as_bytes());
    hex::encode(hasher.finalize())
}

impl PageCache {
    /// Opens (creating if needed) the cache directory
    pub async fn open(dir: impl Into<PathBuf>) -> Result<Self, CacheError> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| io_error(&dir, e))?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn html_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}{}", key, HTML_SUFFIX))
    }

    fn meta_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}{}", key, META_SUFFIX))
    }

    /// Looks up a page by its normalized URL
    ///
    /// Any read failure is reported as a miss so that the page is fetched
    /// again. A missing or unreadable metadata sidecar is tolerated: the
    /// entry then assumes no redirect took place.
    pub async fn get(&self, url: &Url) -> Option<CachedPage> {
        let key = cache_key(url);
        let html_path = self.html_path(&key);

        let html = match tokio::fs::read_to_string(&html_path).await {
            Ok(html) => html,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                warn!("Unreadable cache file {}: {}", html_path.display(), e);
                return None;
            }
        };

        let entry = match self.read_entry(&key).await {
            Ok(entry) => entry,
            Err(e) => {
                debug!("No usable cache metadata for {}: {}", url, e);
                CacheEntry {
                    key: key.clone(),
                    url: url.to_string(),
                    final_url: url.to_string(),
                    stored_path: html_path,
                    fetched_at: Utc::now(),
                }
            }
        };

        Some(CachedPage { html, entry })
    }

    async fn read_entry(&self, key: &str) -> Result<CacheEntry, CacheError> {
        let meta_path = self.meta_path(key);
        let raw = tokio::fs::read(&meta_path)
            .await
            .map_err(|e| io_error(&meta_path, e))?;
        serde_json::from_slice(&raw).map_err(|source| CacheError::Metadata {
            path: meta_path.display().to_string(),
            source,
        })
    }

    /// Stores the raw HTML of a freshly fetched page
    ///
    /// Both files are written to a temporary name first and renamed into
    /// place, so a reader never observes a partially written page.
    pub async fn put(&self, url: &Url, final_url: &Url, html: &str) -> Result<CacheEntry, CacheError> {
        let key = cache_key(url);
        let html_path = self.html_path(&key);
        let entry = CacheEntry {
            key: key.clone(),
            url: url.to_string(),
            final_url: final_url.to_string(),
            stored_path: html_path.clone(),
            fetched_at: Utc::now(),
        };

        let meta = serde_json::to_vec_pretty(&entry).map_err(|source| CacheError::Metadata {
            path: self.meta_path(&key).display().to_string(),
            source,
        })?;

        write_atomic(&html_path, html.as_bytes()).await?;
        write_atomic(&self.meta_path(&key), &meta).await?;

        debug!("Cached {} as {}", url, key);
        Ok(entry)
    }

    /// Removes every cache file from the directory
    ///
    /// Only files following the cache naming scheme are touched.
    ///
    /// # Returns
    ///
    /// The number of cached pages removed
    pub async fn clear(&self) -> Result<usize, CacheError> {
        let mut removed = 0;
        let mut entries = tokio::fs::read_dir(&self.dir)
            .await
            .map_err(|e| io_error(&self.dir, e))?;

        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| io_error(&self.dir, e))?
        {
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            if !is_cache_file(name) {
                continue;
            }

            let path = entry.path();
            tokio::fs::remove_file(&path)
                .await
                .map_err(|e| io_error(&path, e))?;
            if name.ends_with(HTML_SUFFIX) {
                removed += 1;
            }
        }

        Ok(removed)
    }
}

fn is_cache_file(name: &str) -> bool {
    let stem = name
        .strip_suffix(TMP_SUFFIX)
        .unwrap_or(name);
    let stem = stem
        .strip_suffix(META_SUFFIX)
        .or_else(|| stem.strip_suffix(HTML_SUFFIX));

    matches!(stem, Some(key) if key.len() == 64 && key.bytes().all(|b| b.is_ascii_hexdigit()))
}

async fn write_atomic(path: &Path, contents: &[u8]) -> Result<(), CacheError> {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(TMP_SUFFIX);
    let tmp = PathBuf::from(tmp);

    tokio::fs::write(&tmp, contents)
        .await
        .map_err(|e| io_error(&tmp, e))?;
    tokio::fs::rename(&tmp, path)
        .await
        .map_err(|e| io_error(path, e))
}

fn io_error(path: &Path, source: std::io::Error) -> CacheError {
    CacheError::Io {
        path: path.display().to_string(),
        source,
    }
}
