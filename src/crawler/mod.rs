//! Crawler module for catalog extraction
//!
//! This module contains the extraction pipeline, including:
//! - HTTP fetching with pacing and retry logic
//! - Listing page parsing and pagination
//! - Product feed extraction
//! - Overall run coordination

mod coordinator;
mod fetcher;
mod listing;
mod product;
mod scheduler;

pub use coordinator::{DetailStats, HarvestOutput, ListingStats, Pipeline, StopReason};
pub use fetcher::{build_http_client, FetchResponse, Fetcher};
pub use listing::{next_page_url, parse_listing, ListingExtractor, ListingPage, PageOutcome};
pub use product::{
    canonical_product_url, feed_url, parse_product_feed, Price, ProductExtractor,
    ProductOutcome, VariantRecord,
};
pub use scheduler::{ExponentialBackoff, RequestPacer};

use crate::config::SiteConfig;
use crate::HarvestError;

/// Runs both extraction phases for a site
///
/// This is the main entry point for a harvest. It will:
/// 1. Build the HTTP client
/// 2. Walk the listing pages and collect product URLs
/// 3. Extract the variant records of every product
///
/// # Example
///
/// ```no_run
/// use shop_harvest::config::load_config;
/// use shop_harvest::crawler::harvest;
/// use std::path::Path;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = load_config(Path::new("site.toml"))?;
/// let output = harvest(&config).await?;
/// println!("{} variants", output.variants.len());
/// # Ok(())
/// # }
/// ```
pub async fn harvest(config: &SiteConfig) -> Result<HarvestOutput, HarvestError> {
    Pipeline::from_config(config)?.run().await
}
