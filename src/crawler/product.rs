//! Product detail extraction
//!
//! Each product exposes a machine-readable feed next to its HTML page
//! (`/products/<handle>` → `/products/<handle>.js`). The feed is flattened
//! into one [`VariantRecord`] per variant.

use crate::config::ProductFeedConfig;
use crate::crawler::fetcher::Fetcher;
use crate::HarvestError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// A price as the feed reports it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Price {
    /// Integer minor units (cents)
    Minor(i64),
    /// Decimal text such as `"29.99"`
    Text(String),
    /// Bare JSON number with a fractional part, such as `29.99`
    Decimal(f64),
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Minor(value) => write!(f, "{}", value),
            Self::Text(value) => write!(f, "{}", value),
            Self::Decimal(value) => write!(f, "{}", value),
        }
    }
}

/// One purchasable variant, denormalized with its product's name and description
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariantRecord {
    pub product_url: String,
    pub product_id: u64,
    pub product_sku: Option<String>,
    pub product_name: String,
    pub product_color: Option<String>,
    pub product_size: Option<String>,
    pub product_image: Option<String>,
    pub product_description: String,
    pub product_net_price: Option<Price>,
    pub product_gross_price: Option<Price>,
    pub product_stock_status: bool,
    pub product_barcode: Option<String>,
}

/// Product feed document; only the keys the pipeline reads
#[derive(Debug, Deserialize)]
struct ProductFeed {
    title: String,
    description: String,
    variants: Vec<FeedVariant>,
}

#[derive(Debug, Deserialize)]
struct FeedVariant {
    id: u64,
    #[serde(default)]
    sku: Option<String>,
    #[serde(default)]
    option1: Option<String>,
    #[serde(default)]
    option2: Option<String>,
    #[serde(default)]
    featured_image: Option<FeaturedImage>,
    #[serde(default)]
    price: Option<Price>,
    #[serde(default)]
    compare_at_price: Option<Price>,
    #[serde(default)]
    available: Option<bool>,
    #[serde(default)]
    barcode: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FeaturedImage {
    src: Option<String>,
}

/// How a product extraction ended
#[derive(Debug, Clone, PartialEq)]
pub enum ProductOutcome {
    Extracted(Vec<VariantRecord>),
    /// The feed endpoint could not be fetched
    FetchFailed,
    /// The feed body was not the expected shape
    Malformed,
    /// The feed listed no variants
    NoVariants,
}

impl ProductOutcome {
    pub fn into_records(self) -> Vec<VariantRecord> {
        match self {
            Self::Extracted(records) => records,
            _ => Vec::new(),
        }
    }
}

/// Fetches and flattens product feeds
pub struct ProductExtractor {
    fetcher: Arc<Fetcher>,
    feed: ProductFeedConfig,
}

impl ProductExtractor {
    pub fn new(fetcher: Arc<Fetcher>, feed: ProductFeedConfig) -> Self {
        Self { fetcher, feed }
    }

    /// Returns one record per variant of the product at `product_url`
    ///
    /// Fetch and shape failures yield an empty vector; only an empty URL is an error.
    pub async fn extract_product(&self, product_url: &str) -> Result<Vec<VariantRecord>, HarvestError> {
        Ok(self.scan_product(product_url).await?.into_records())
    }

    /// Like [`extract_product`](Self::extract_product) but reports why no records came back
    pub async fn scan_product(&self, product_url: &str) -> Result<ProductOutcome, HarvestError> {
        if product_url.trim().is_empty() {
            return Err(HarvestError::InvalidUrl(
                "product URL must not be empty".to_string(),
            ));
        }

        tracing::info!(url = product_url, "Extracting product");
        let base = canonical_product_url(product_url, &self.feed.variant_param);
        let endpoint = feed_url(base, &self.feed.suffix);

        let response = match self.fetcher.fetch(&endpoint).await {
            Ok(response) => response,
            Err(e) if e.is_precondition() => return Err(HarvestError::InvalidUrl(e.detail)),
            Err(_) => return Ok(ProductOutcome::FetchFailed),
        };

        let outcome = parse_product_feed(&response.body, base);
        match &outcome {
            ProductOutcome::Extracted(records) => {
                tracing::info!(url = product_url, "Got ({}) variants", records.len())
            }
            ProductOutcome::NoVariants => {
                tracing::warn!(url = product_url, "Product feed lists no variants")
            }
            ProductOutcome::Malformed => {
                tracing::error!(url = %endpoint, "Product feed is missing expected keys")
            }
            ProductOutcome::FetchFailed => {}
        }

        Ok(outcome)
    }
}

/// Strips the variant-selection query from a product URL
///
/// Everything from `?<variant_param>=` onward is dropped; other URLs are
/// returned unchanged.
pub fn canonical_product_url<'a>(product_url: &'a str, variant_param: &str) -> &'a str {
    let marker = format!("?{}=", variant_param);
    match product_url.find(&marker) {
        Some(index) => &product_url[..index],
        None => product_url,
    }
}

/// Derives the feed endpoint from a canonical product URL
pub fn feed_url(canonical_url: &str, suffix: &str) -> String {
    format!("{}{}", canonical_url, suffix)
}

/// Parses a feed body into variant records tagged with `product_url`
pub fn parse_product_feed(body: &str, product_url: &str) -> ProductOutcome {
    let feed: ProductFeed = match serde_json::from_str(body) {
        Ok(feed) => feed,
        Err(e) => {
            tracing::debug!(url = product_url, "Feed parse error: {}", e);
            return ProductOutcome::Malformed;
        }
    };

    if feed.variants.is_empty() {
        return ProductOutcome::NoVariants;
    }

    let ProductFeed {
        title,
        description,
        variants,
    } = feed;

    let records = variants
        .into_iter()
        .map(|variant| VariantRecord {
            product_url: product_url.to_string(),
            product_id: variant.id,
            product_sku: variant.sku,
            product_name: title.clone(),
            product_color: variant.option1,
            product_size: variant.option2,
            product_image: variant.featured_image.and_then(|image| image.src),
            product_description: description.clone(),
            product_net_price: variant.price,
            product_gross_price: variant.compare_at_price,
            product_stock_status: variant.available.unwrap_or(false),
            product_barcode: variant.barcode,
        })
        .collect();

    ProductOutcome::Extracted(records)
}
