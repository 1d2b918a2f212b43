//! Configuration module for Docsweep
//!
//! This module holds the crawl configuration, loads it from TOML files and
//! validates it before a run starts.
//!
//! # Example
//!
//! ```no_run
//! use docsweep::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("docsweep.toml")).unwrap();
//! println!("Crawler will use {} workers", config.workers);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{BasicAuth, CrawlConfig, SpaConfig};

// Re-export parser and validation functions
pub use parser::{load_config, parse_config};
pub use validation::{validate, validate_base_url};
