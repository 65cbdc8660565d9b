//! Shop-Harvest main entry point
//!
//! This is the command-line interface for the catalog extraction pipeline.

use anyhow::Context;
use chrono::{Local, Utc};
use clap::{Parser, Subcommand};
use shop_harvest::config::{load_config_with_hash, SiteConfig};
use shop_harvest::crawler::Pipeline;
use shop_harvest::output::{
    dated_table_name, print_summary, read_product_urls, read_variants, BatchSink,
    JsonBatchStore, RunSummary, SqliteLoader,
};
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

/// Shop-Harvest: a catalog extraction pipeline
///
/// Crawls a paginated product listing, extracts every product's variants
/// from its feed endpoint and loads them into a SQLite table.
#[derive(Parser, Debug)]
#[command(name = "shop-harvest")]
#[command(version)]
#[command(about = "A catalog extraction pipeline", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose", global = true)]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Validate the configuration and show what would be crawled
    Check {
        /// Path to the site configuration file (TOML or JSON)
        #[arg(value_name = "CONFIG")]
        config: PathBuf,
    },

    /// Collect product URLs from the listing pages
    List {
        #[arg(value_name = "CONFIG")]
        config: PathBuf,
    },

    /// Extract variant records for a product URL batch
    Details {
        #[arg(value_name = "CONFIG")]
        config: PathBuf,

        /// Product URL batch (defaults to today's batch in the output directory)
        #[arg(long, value_name = "FILE")]
        urls: Option<PathBuf>,
    },

    /// Load the URL and variant batches into the database
    Load {
        #[arg(value_name = "CONFIG")]
        config: PathBuf,

        /// Product URL batch (defaults to today's batch in the output directory)
        #[arg(long, value_name = "FILE")]
        urls: Option<PathBuf>,

        /// Variant batch (defaults to today's batch in the output directory)
        #[arg(long, value_name = "FILE")]
        data: Option<PathBuf>,
    },

    /// Run all three stages
    Run {
        #[arg(value_name = "CONFIG")]
        config: PathBuf,

        /// Stop after writing the JSON batches
        #[arg(long)]
        skip_load: bool,
    },
}

impl Command {
    fn config_path(&self) -> &Path {
        match self {
            Self::Check { config }
            | Self::List { config }
            | Self::Details { config, .. }
            | Self::Load { config, .. }
            | Self::Run { config, .. } => config,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    // Load and validate configuration
    let config_path = cli.command.config_path();
    tracing::info!("Loading configuration from: {}", config_path.display());
    let (config, config_hash) = load_config_with_hash(config_path)
        .with_context(|| format!("Failed to load configuration {}", config_path.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    match cli.command {
        Command::Check { .. } => handle_check(&config),
        Command::List { .. } => handle_list(&config).await,
        Command::Details { urls, .. } => handle_details(&config, urls).await,
        Command::Load { urls, data, .. } => handle_load(&config, urls, data),
        Command::Run { skip_load, .. } => handle_run(&config, &config_hash, skip_load).await,
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("shop_harvest=info,warn"),
            1 => EnvFilter::new("shop_harvest=debug,info"),
            2 => EnvFilter::new("shop_harvest=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Builds a pipeline whose run is cancelled by Ctrl-C
fn build_pipeline(config: &SiteConfig) -> anyhow::Result<Pipeline> {
    let cancel = CancellationToken::new();
    let pipeline = Pipeline::from_config(config)?.with_cancellation(cancel.clone());

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, finishing in-flight requests");
            cancel.cancel();
        }
    });

    Ok(pipeline)
}

/// Handles `check`: validates config and shows what would be crawled
fn handle_check(config: &SiteConfig) -> anyhow::Result<()> {
    let pagination = &config.products_list.pagination;
    let products = &config.products_list.products;

    println!("=== Shop-Harvest Check ===\n");

    println!("Listing:");
    println!("  Main URL: {}", config.main_url);
    println!("  Selector: {}", products.selector);
    println!("  Attribute: {}", products.attribute);
    println!("  URL prefix: {}", products.url_prefix);
    println!("  Pagination: {}", pagination.value);
    println!("  Safety cap: {} pages", pagination.max_pages);

    println!("\nProduct feed:");
    println!("  Suffix: {}", config.product_feed.suffix);
    println!("  Stripped query: ?{}=", config.product_feed.variant_param);

    println!("\nCrawler:");
    println!(
        "  Max concurrent requests: {}",
        config.crawler.max_concurrent_requests
    );
    println!(
        "  Minimum request interval: {}ms",
        config.crawler.min_request_interval_ms
    );
    println!("  Max retries: {}", config.crawler.max_retries);
    println!("  User agent: {}", config.user_agent.header_value());

    println!("\nOutput:");
    println!("  JSON directory: {}", config.output.directory);
    println!("  Database: {}", config.output.database_path);
    println!(
        "  Table: {}",
        dated_table_name(&config.output.table_name, Local::now().date_naive())
    );

    println!("\n✓ Configuration is valid");
    if pagination.max_pages > 1 {
        println!(
            "✓ Page 2 would be: {}",
            shop_harvest::crawler::next_page_url(pagination, &config.main_url, 2)?
        );
    }

    Ok(())
}

/// Handles `list`: runs the listing phase and writes the URL batch
async fn handle_list(config: &SiteConfig) -> anyhow::Result<()> {
    let pipeline = build_pipeline(config)?;
    let (urls, stats) = pipeline.collect_product_urls().await?;

    let mut store = JsonBatchStore::new(&config.output.directory);
    store.write_product_urls(&urls)?;

    println!(
        "✓ {} product URLs from {} pages written to {}",
        stats.urls_found,
        stats.pages_visited,
        store.product_urls_path().display()
    );
    Ok(())
}

/// Handles `details`: extracts variants for a URL batch
async fn handle_details(config: &SiteConfig, urls: Option<PathBuf>) -> anyhow::Result<()> {
    let mut store = JsonBatchStore::new(&config.output.directory);
    let urls_path = urls.unwrap_or_else(|| store.product_urls_path());
    let urls = read_product_urls(&urls_path)
        .with_context(|| format!("Failed to read product URLs from {}", urls_path.display()))?;

    let pipeline = build_pipeline(config)?;
    let (variants, stats) = pipeline.collect_variants(&urls).await;
    store.write_variants(&variants)?;

    println!(
        "✓ {} variants from {} of {} products written to {}",
        stats.variants,
        stats.extracted,
        stats.products_total,
        store.variants_path().display()
    );
    Ok(())
}

/// Handles `load`: replaces today's tables with a URL and a variant batch
fn handle_load(
    config: &SiteConfig,
    urls: Option<PathBuf>,
    data: Option<PathBuf>,
) -> anyhow::Result<()> {
    let store = JsonBatchStore::new(&config.output.directory);

    let urls_path = urls.unwrap_or_else(|| store.product_urls_path());
    let product_urls = read_product_urls(&urls_path)
        .with_context(|| format!("Failed to read product URLs from {}", urls_path.display()))?;

    let data_path = data.unwrap_or_else(|| store.variants_path());
    let variants = read_variants(&data_path)
        .with_context(|| format!("Failed to read variants from {}", data_path.display()))?;

    let table = load_into_database(config, &product_urls, &variants)?;
    println!(
        "✓ {} URLs and {} variants loaded into {} ({})",
        product_urls.len(),
        variants.len(),
        config.output.database_path,
        table
    );
    Ok(())
}

/// Loads both batches into today's tables and returns the variant table name
fn load_into_database(
    config: &SiteConfig,
    product_urls: &[String],
    variants: &[shop_harvest::VariantRecord],
) -> anyhow::Result<String> {
    let table = dated_table_name(&config.output.table_name, Local::now().date_naive());
    let mut loader = SqliteLoader::open(Path::new(&config.output.database_path), &table)?;
    loader.write_product_urls(product_urls)?;
    loader.write_variants(variants)?;
    Ok(table)
}

/// Handles `run`: all stages, writing each batch as soon as its phase ends
async fn handle_run(config: &SiteConfig, config_hash: &str, skip_load: bool) -> anyhow::Result<()> {
    let started_at = Utc::now();
    tracing::info!("======================= PROGRAM STARTED =======================");

    let pipeline = build_pipeline(config)?;
    let mut store = JsonBatchStore::new(&config.output.directory);

    let (product_urls, listing) = pipeline.collect_product_urls().await?;
    store.write_product_urls(&product_urls)?;

    let (variants, details) = pipeline.collect_variants(&product_urls).await;
    store.write_variants(&variants)?;

    if skip_load {
        tracing::info!("Skipping database load");
    } else {
        load_into_database(config, &product_urls, &variants)?;
    }

    print_summary(&RunSummary::new(
        config_hash,
        started_at,
        Some(listing),
        Some(details),
    ));

    tracing::info!("======================= PROGRAM FINISHED =======================");
    Ok(())
}
