//! End-of-run quality checks
//!
//! Checks only produce warnings. Expected HTML to Markdown ratios adapt to
//! the site: pages dense with highlighted code carry much more markup per
//! character of content, and small samples vary more.

use super::stats::CrawlStats;

/// Minimum acceptable output bytes per included page
pub const MIN_BYTES_PER_PAGE: u64 = 500;

/// Fewer included pages than this hints at broken link discovery
pub const MIN_PAGES: u64 = 5;

pub const MAX_FAILURE_RATE: f64 = 0.2;

/// Expected minimum ratio of output bytes to fetched HTML bytes
pub fn expected_ratio(stats: &CrawlStats) -> f64 {
    let pages = stats.pages_included.max(1);
    let code_density = stats.code_blocks as f64 / pages as f64;

    if code_density > 2.0 {
        0.01
    } else if pages < 20 {
        0.03
    } else {
        0.015
    }
}

/// Checks the rendered output against the run statistics
pub fn validate_output(output_bytes: u64, stats: &CrawlStats) -> Vec<String> {
    let mut warnings = Vec::new();
    let pages = stats.pages_included;

    let expected_size = pages * MIN_BYTES_PER_PAGE;
    if output_bytes < expected_size {
        warnings.push(format!(
            "Output smaller than expected: {} bytes (expected ~{} bytes for {} pages)",
            output_bytes, expected_size, pages
        ));
    }

    if stats.total_html_bytes > 0 {
        let ratio = output_bytes as f64 / stats.total_html_bytes as f64;
        let expected = expected_ratio(stats);
        if ratio < expected {
            let mut warning = format!(
                "HTML to Markdown conversion ratio below expectation: {:.1}% (expected > {:.1}%)",
                ratio * 100.0,
                expected * 100.0
            );
            let code_density = stats.code_blocks as f64 / pages.max(1) as f64;
            if code_density > 2.0 {
                warning.push_str(&format!(
                    " [code-heavy site: {:.1} code blocks per page]",
                    code_density
                ));
            }
            warnings.push(warning);
        }
    }

    if pages < MIN_PAGES {
        warnings.push(format!(
            "Few pages included: {} (link discovery may be broken or the site is blocking the crawler)",
            pages
        ));
    }

    let attempted = stats.retrieved() + stats.failed;
    if stats.failure_rate() > MAX_FAILURE_RATE {
        warnings.push(format!(
            "High failure rate: {:.1}% ({}/{} pages)",
            stats.failure_rate() * 100.0,
            stats.failed,
            attempted
        ));
    }

    warnings
}
