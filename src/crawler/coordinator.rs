//! Pipeline coordinator - extraction orchestration logic
//!
//! This module drives the two extraction phases:
//! - The listing phase walks pages 1, 2, ... until a page yields nothing,
//!   the safety cap is reached, or the run is cancelled
//! - The detail phase extracts every collected product URL with bounded
//!   concurrency, keeping each product's variants contiguous and in input order

use crate::config::{validate, SiteConfig};
use crate::crawler::fetcher::Fetcher;
use crate::crawler::listing::{ListingExtractor, PageOutcome};
use crate::crawler::product::{ProductExtractor, ProductOutcome, VariantRecord};
use crate::{ConfigError, HarvestError};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

/// Why the listing phase stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// A page yielded no URLs; the outcome tells whether it failed or was just empty
    EmptyPage(PageOutcome),
    /// The configured maximum page was visited
    SafetyCap,
    Cancelled,
}

/// Listing phase counters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingStats {
    pub pages_visited: u32,
    pub urls_found: usize,
    /// Matched elements that lacked the link attribute
    pub placeholders: usize,
    pub stop_reason: StopReason,
}

/// Detail phase counters
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DetailStats {
    pub products_total: usize,
    pub dispatched: usize,
    pub extracted: usize,
    pub fetch_failed: usize,
    pub malformed: usize,
    pub no_variants: usize,
    /// Extractions that returned an error or whose task died
    pub errors: usize,
    pub skipped_placeholders: usize,
    /// URLs never dispatched because the run was cancelled
    pub not_dispatched: usize,
    pub variants: usize,
}

/// Everything one run produced
#[derive(Debug, Clone)]
pub struct HarvestOutput {
    pub product_urls: Vec<String>,
    pub variants: Vec<VariantRecord>,
    pub listing: ListingStats,
    pub details: DetailStats,
}

/// Main pipeline coordinator
pub struct Pipeline {
    main_url: String,
    max_pages: u32,
    max_concurrency: usize,
    listing: ListingExtractor,
    products: Arc<ProductExtractor>,
    cancel: CancellationToken,
}

impl Pipeline {
    /// Creates a pipeline sharing `fetcher` between both extractors
    ///
    /// The configuration is validated first; nothing is fetched for an
    /// incomplete one.
    pub fn new(config: &SiteConfig, fetcher: Arc<Fetcher>) -> Result<Self, ConfigError> {
        validate(config)?;

        let listing = ListingExtractor::new(
            Arc::clone(&fetcher),
            config.products_list.products.clone(),
            config.products_list.pagination.clone(),
        )?;
        let products = ProductExtractor::new(fetcher, config.product_feed.clone());

        Ok(Self {
            main_url: config.main_url.clone(),
            max_pages: config.products_list.pagination.max_pages,
            max_concurrency: config.crawler.max_concurrent_requests.max(1) as usize,
            listing,
            products: Arc::new(products),
            cancel: CancellationToken::new(),
        })
    }

    /// Creates a pipeline with its own HTTP client
    pub fn from_config(config: &SiteConfig) -> Result<Self, HarvestError> {
        let fetcher = Fetcher::new(&config.crawler, &config.user_agent)?;
        Ok(Self::new(config, Arc::new(fetcher))?)
    }

    /// Replaces the run's cancellation token
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// A handle that cancels this run when triggered
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn listing(&self) -> &ListingExtractor {
        &self.listing
    }

    pub fn products(&self) -> &ProductExtractor {
        &self.products
    }

    /// Runs the listing phase then the detail phase
    pub async fn run(&self) -> Result<HarvestOutput, HarvestError> {
        let (product_urls, listing) = self.collect_product_urls().await?;
        let (variants, details) = self.collect_variants(&product_urls).await;

        Ok(HarvestOutput {
            product_urls,
            variants,
            listing,
            details,
        })
    }

    /// Walks the listing pages and gathers every candidate product URL
    ///
    /// URLs are returned in page order, then element order within a page.
    pub async fn collect_product_urls(&self) -> Result<(Vec<String>, ListingStats), HarvestError> {
        let mut all_products = Vec::new();
        let mut pages_visited = 0;
        let mut placeholders = 0;
        let mut page = 1;

        let stop_reason = loop {
            if page > self.max_pages {
                tracing::warn!(page, "Aborting pagination at safety cap of {} pages", self.max_pages);
                break StopReason::SafetyCap;
            }

            if self.cancel.is_cancelled() {
                tracing::warn!(page, "Cancellation requested, stop exploring website");
                break StopReason::Cancelled;
            }

            let url = if page == 1 {
                self.main_url.clone()
            } else {
                self.listing.next_page_url(&self.main_url, page)?
            };

            let scanned = self.listing.scan_listing_page(&url).await?;
            pages_visited += 1;

            if scanned.urls.is_empty() {
                tracing::info!(page, "No products found ({:?}), stop exploring website", scanned.outcome);
                break StopReason::EmptyPage(scanned.outcome);
            }

            tracing::info!(page, "Got ({}) products", scanned.urls.len());
            placeholders += scanned.placeholder_count();
            all_products.extend(scanned.urls);
            page += 1;
        };

        tracing::info!(
            "Got ({}) total products from {} pages",
            all_products.len(),
            pages_visited
        );

        let stats = ListingStats {
            pages_visited,
            urls_found: all_products.len(),
            placeholders,
            stop_reason,
        };

        Ok((all_products, stats))
    }

    /// Extracts the variants of every product URL
    ///
    /// Never fails: per-product problems are logged and counted. Records keep
    /// the order of `urls`. After cancellation no new extraction starts, while
    /// those already running finish and contribute their records.
    pub async fn collect_variants(&self, urls: &[String]) -> (Vec<VariantRecord>, DetailStats) {
        let mut stats = DetailStats {
            products_total: urls.len(),
            ..DetailStats::default()
        };

        let semaphore = Arc::new(Semaphore::new(self.max_concurrency));
        let mut tasks = JoinSet::new();
        let mut slots: Vec<Option<ProductOutcome>> = vec![None; urls.len()];

        for (index, url) in urls.iter().enumerate() {
            if url.trim().is_empty() {
                tracing::warn!(index, "Skipping listing element without a product link");
                stats.skipped_placeholders += 1;
                continue;
            }

            let permit = tokio::select! {
                biased;
                () = self.cancel.cancelled() => None,
                permit = Arc::clone(&semaphore).acquire_owned() => permit.ok(),
            };

            let Some(permit) = permit else {
                stats.not_dispatched = urls[index..]
                    .iter()
                    .filter(|url| !url.trim().is_empty())
                    .count();
                tracing::warn!(
                    "Cancellation requested, {} products left unextracted",
                    stats.not_dispatched
                );
                break;
            };

            let extractor = Arc::clone(&self.products);
            let url = url.clone();
            stats.dispatched += 1;

            tasks.spawn(async move {
                let _permit = permit;
                let outcome = extractor.scan_product(&url).await;
                (index, url, outcome)
            });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, _, Ok(outcome))) => slots[index] = Some(outcome),
                Ok((_, url, Err(e))) => {
                    tracing::error!(url = %url, "Product extraction failed: {}", e);
                    stats.errors += 1;
                }
                Err(e) => {
                    tracing::error!("Product extraction task failed: {}", e);
                    stats.errors += 1;
                }
            }
        }

        let mut variants = Vec::new();
        for outcome in slots.into_iter().flatten() {
            match outcome {
                ProductOutcome::Extracted(records) => {
                    stats.extracted += 1;
                    variants.extend(records);
                }
                ProductOutcome::FetchFailed => stats.fetch_failed += 1,
                ProductOutcome::Malformed => stats.malformed += 1,
                ProductOutcome::NoVariants => stats.no_variants += 1,
            }
        }
        stats.variants = variants.len();

        tracing::info!(
            "Extracted {} variants from {} of {} products",
            stats.variants,
            stats.extracted,
            stats.products_total
        );

        (variants, stats)
    }
}
