//! Run summary reporting
//!
//! Turns the phase counters into a report that separates "the site had no
//! data" from "fetching failed", which the batches alone cannot show.

use crate::crawler::{DetailStats, ListingStats, PageOutcome, StopReason};
use chrono::{DateTime, Utc};

/// Summary of one harvest run
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub config_hash: String,
    pub listing: Option<ListingStats>,
    pub details: Option<DetailStats>,
}

impl RunSummary {
    /// Creates a summary finishing now
    pub fn new(
        config_hash: &str,
        started_at: DateTime<Utc>,
        listing: Option<ListingStats>,
        details: Option<DetailStats>,
    ) -> Self {
        Self {
            started_at,
            finished_at: Utc::now(),
            config_hash: config_hash.to_string(),
            listing,
            details,
        }
    }

    /// Percentage of dispatched products that yielded records
    pub fn success_rate(&self) -> f64 {
        match &self.details {
            Some(details) if details.dispatched > 0 => {
                (details.extracted as f64 / details.dispatched as f64) * 100.0
            }
            _ => 0.0,
        }
    }

    /// Products that failed to fetch, parse, or extract
    pub fn failed_products(&self) -> usize {
        self.details
            .as_ref()
            .map(|d| d.fetch_failed + d.malformed + d.errors)
            .unwrap_or(0)
    }
}

fn describe_stop(reason: StopReason) -> &'static str {
    match reason {
        StopReason::EmptyPage(PageOutcome::NoMatches) => "page had no products",
        StopReason::EmptyPage(PageOutcome::FetchFailed) => "page could not be fetched",
        StopReason::EmptyPage(PageOutcome::Found) => "page yielded nothing",
        StopReason::SafetyCap => "safety cap reached",
        StopReason::Cancelled => "cancelled",
    }
}

/// Prints the summary to stdout in a formatted manner
pub fn print_summary(summary: &RunSummary) {
    println!("=== Harvest Summary ===\n");

    println!("Run:");
    println!("  Started: {}", summary.started_at.to_rfc3339());
    println!(
        "  Duration: {}s",
        (summary.finished_at - summary.started_at).num_seconds()
    );
    println!("  Config hash: {}", summary.config_hash);
    println!();

    if let Some(listing) = &summary.listing {
        println!("Listing Phase:");
        println!("  Pages visited: {}", listing.pages_visited);
        println!("  Product URLs: {}", listing.urls_found);
        println!("  Elements without link: {}", listing.placeholders);
        println!("  Stopped: {}", describe_stop(listing.stop_reason));
        println!();
    }

    if let Some(details) = &summary.details {
        println!("Detail Phase:");
        println!("  Products: {}", details.products_total);
        println!("  Extracted: {}", details.extracted);
        println!("  Fetch failures: {}", details.fetch_failed);
        println!("  Malformed feeds: {}", details.malformed);
        println!("  Without variants: {}", details.no_variants);
        println!("  Errors: {}", details.errors);
        println!("  Skipped placeholders: {}", details.skipped_placeholders);
        if details.not_dispatched > 0 {
            println!("  Not started (cancelled): {}", details.not_dispatched);
        }
        println!("  Variant records: {}", details.variants);
        println!();

        println!(
            "Success Rate: {:.1}% ({} / {} products extracted)",
            summary.success_rate(),
            details.extracted,
            details.dispatched
        );
    }
}
