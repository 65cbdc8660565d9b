use serde::Deserialize;

/// Default pagination placeholder token
pub const DEFAULT_PLACEHOLDER: &str = "<PNum>";

/// Default pagination safety cap
pub const DEFAULT_MAX_PAGES: u32 = 50;

/// Largest accepted pagination safety cap
pub const MAX_PAGES_LIMIT: u32 = 10_000;

/// Site configuration for a single catalog
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct SiteConfig {
    /// Entry point for listing pages
    pub main_url: String,

    pub products_list: ProductsListConfig,

    #[serde(default)]
    pub product_feed: ProductFeedConfig,

    #[serde(default)]
    pub crawler: CrawlerConfig,

    #[serde(default)]
    pub user_agent: UserAgentConfig,

    #[serde(default)]
    pub output: OutputConfig,
}

/// Listing page layout
#[derive(Debug, Clone, Deserialize)]
pub struct ProductsListConfig {
    pub products: ProductSelectorConfig,
    pub pagination: PaginationConfig,
}

/// How product links are found on a listing page
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ProductSelectorConfig {
    /// CSS selector matching product anchor elements
    pub selector: String,

    /// Attribute holding the relative product path
    pub attribute: String,

    /// Prepended to the attribute value to form an absolute URL
    pub url_prefix: String,
}

/// How the URL of page N is built
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct PaginationConfig {
    /// Suffix template appended to the main URL, e.g. `?page=<PNum>`
    pub value: String,

    #[serde(default = "default_placeholder")]
    pub placeholder: String,

    /// Last page the listing phase may visit
    #[serde(default = "default_max_pages")]
    pub max_pages: u32,
}

/// Product feed endpoint derivation
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct ProductFeedConfig {
    /// Appended to the canonical product path
    pub suffix: String,

    /// Query parameter stripped from product URLs
    pub variant_param: String,
}

impl Default for ProductFeedConfig {
    fn default() -> Self {
        Self {
            suffix: ".js".to_string(),
            variant_param: "variant".to_string(),
        }
    }
}

/// Request behavior
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct CrawlerConfig {
    /// Maximum number of product feeds fetched at once
    pub max_concurrent_requests: u32,

    /// Minimum time between two request starts (milliseconds)
    pub min_request_interval_ms: u64,

    pub request_timeout_secs: u64,

    /// Retries after the first attempt for transient failures
    pub max_retries: u32,

    pub retry_base_delay_ms: u64,

    pub retry_max_delay_ms: u64,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            max_concurrent_requests: 4,
            min_request_interval_ms: 250,
            request_timeout_secs: 30,
            max_retries: 3,
            retry_base_delay_ms: 500,
            retry_max_delay_ms: 10_000,
        }
    }
}

/// User agent identification
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct UserAgentConfig {
    pub crawler_name: String,
    pub crawler_version: String,
    pub contact_url: Option<String>,
}

impl Default for UserAgentConfig {
    fn default() -> Self {
        Self {
            crawler_name: env!("CARGO_PKG_NAME").to_string(),
            crawler_version: env!("CARGO_PKG_VERSION").to_string(),
            contact_url: None,
        }
    }
}

impl UserAgentConfig {
    /// Formats the header value: `Name/Version (+ContactURL)`
    pub fn header_value(&self) -> String {
        match self.contact_url.as_deref().filter(|c| !c.is_empty()) {
            Some(contact) => format!(
                "{}/{} (+{})",
                self.crawler_name, self.crawler_version, contact
            ),
            None => format!("{}/{}", self.crawler_name, self.crawler_version),
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct OutputConfig {
    /// Directory receiving the JSON batches
    pub directory: String,

    /// Path to the SQLite database file
    pub database_path: String,

    /// Base table name; the load date is appended
    pub table_name: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: "json".to_string(),
            database_path: "catalog.db".to_string(),
            table_name: "products".to_string(),
        }
    }
}

fn default_placeholder() -> String {
    DEFAULT_PLACEHOLDER.to_string()
}

fn default_max_pages() -> u32 {
    DEFAULT_MAX_PAGES
}
