//! Configuration module for Shop-Harvest
//!
//! This module handles loading, parsing, and validating the site configuration
//! that describes the catalog layout.
//!
//! # Example
//!
//! ```no_run
//! use shop_harvest::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("site.toml")).unwrap();
//! println!("Listing starts at: {}", config.main_url);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    CrawlerConfig, OutputConfig, PaginationConfig, ProductFeedConfig, ProductSelectorConfig,
    ProductsListConfig, SiteConfig, UserAgentConfig, DEFAULT_MAX_PAGES, DEFAULT_PLACEHOLDER,
    MAX_PAGES_LIMIT,
};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};
pub use validation::{validate, validate_table_name};
