//! Listing page extraction
//!
//! Turns a paginated catalog page into candidate product URLs, using the
//! selector, attribute and prefix from the site configuration.

use crate::config::{PaginationConfig, ProductSelectorConfig};
use crate::crawler::fetcher::Fetcher;
use crate::{ConfigError, HarvestError};
use scraper::{Html, Selector};
use std::sync::Arc;

/// How a listing page scan ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageOutcome {
    /// At least one element matched the selector
    Found,
    /// The page loaded but nothing matched
    NoMatches,
    /// The page could not be fetched
    FetchFailed,
}

/// Result of scanning one listing page
#[derive(Debug, Clone)]
pub struct ListingPage {
    /// One entry per matched element; empty strings mark elements without the attribute
    pub urls: Vec<String>,
    pub outcome: PageOutcome,
}

impl ListingPage {
    fn empty(outcome: PageOutcome) -> Self {
        Self {
            urls: Vec::new(),
            outcome,
        }
    }

    /// Number of elements that lacked the configured attribute
    pub fn placeholder_count(&self) -> usize {
        self.urls.iter().filter(|url| url.is_empty()).count()
    }
}

/// Extracts product links from listing pages
pub struct ListingExtractor {
    fetcher: Arc<Fetcher>,
    selector: Selector,
    products: ProductSelectorConfig,
    pagination: PaginationConfig,
}

impl ListingExtractor {
    /// Creates an extractor; fails if the configured selector does not parse
    pub fn new(
        fetcher: Arc<Fetcher>,
        products: ProductSelectorConfig,
        pagination: PaginationConfig,
    ) -> Result<Self, ConfigError> {
        let selector =
            Selector::parse(&products.selector).map_err(|e| ConfigError::InvalidSelector {
                selector: products.selector.clone(),
                message: format!("{:?}", e),
            })?;

        Ok(Self {
            fetcher,
            selector,
            products,
            pagination,
        })
    }

    /// Returns the candidate product URLs found on `page_url`
    ///
    /// An unreachable or empty page yields an empty vector; only an empty
    /// `page_url` is an error.
    pub async fn extract_listing_page(&self, page_url: &str) -> Result<Vec<String>, HarvestError> {
        Ok(self.scan_listing_page(page_url).await?.urls)
    }

    /// Like [`extract_listing_page`](Self::extract_listing_page) but also reports why a page came back empty
    pub async fn scan_listing_page(&self, page_url: &str) -> Result<ListingPage, HarvestError> {
        tracing::info!(url = page_url, "Scanning listing page");

        let response = match self.fetcher.fetch(page_url).await {
            Ok(response) => response,
            Err(e) if e.is_precondition() => return Err(HarvestError::InvalidUrl(e.detail)),
            Err(_) => return Ok(ListingPage::empty(PageOutcome::FetchFailed)),
        };

        let urls = parse_listing(
            &response.body,
            &self.selector,
            &self.products.attribute,
            &self.products.url_prefix,
        );

        if urls.is_empty() {
            tracing::warn!(
                url = page_url,
                "No elements \"{}\" found in the page",
                self.products.selector
            );
            return Ok(ListingPage::empty(PageOutcome::NoMatches));
        }

        let page = ListingPage {
            urls,
            outcome: PageOutcome::Found,
        };

        if page.placeholder_count() > 0 {
            tracing::warn!(
                url = page_url,
                "{} of {} elements had no '{}' attribute",
                page.placeholder_count(),
                page.urls.len(),
                self.products.attribute
            );
        }

        Ok(page)
    }

    /// Builds the URL of listing page `page_number` (1-based)
    pub fn next_page_url(&self, base_url: &str, page_number: u32) -> Result<String, HarvestError> {
        next_page_url(&self.pagination, base_url, page_number)
    }
}

/// Substitutes the first placeholder in the pagination template and appends it to `base_url`
///
/// # Example
///
/// ```
/// use shop_harvest::config::PaginationConfig;
/// use shop_harvest::crawler::next_page_url;
///
/// let pagination = PaginationConfig {
///     value: "?page=<PNum>".to_string(),
///     placeholder: "<PNum>".to_string(),
///     max_pages: 10,
/// };
/// let url = next_page_url(&pagination, "https://shop.example.com/collections/all", 3).unwrap();
/// assert_eq!(url, "https://shop.example.com/collections/all?page=3");
/// ```
pub fn next_page_url(
    pagination: &PaginationConfig,
    base_url: &str,
    page_number: u32,
) -> Result<String, HarvestError> {
    if page_number == 0 {
        return Err(HarvestError::InvalidPageNumber(page_number));
    }

    let suffix = pagination
        .value
        .replacen(&pagination.placeholder, &page_number.to_string(), 1);

    Ok(format!("{}{}", base_url, suffix))
}

/// Selects product elements and reads their link attribute
///
/// Elements without the attribute keep their slot as an empty string so the
/// output lines up with the matched elements.
pub fn parse_listing(html: &str, selector: &Selector, attribute: &str, url_prefix: &str) -> Vec<String> {
    let document = Html::parse_document(html);

    document
        .select(selector)
        .map(|element| match element.value().attr(attribute) {
            Some(value) => format!("{}{}", url_prefix, value.trim()),
            None => String::new(),
        })
        .collect()
}
