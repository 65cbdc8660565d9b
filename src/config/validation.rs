use crate::config::types::{
    CrawlerConfig, OutputConfig, PaginationConfig, ProductSelectorConfig, SiteConfig,
    MAX_PAGES_LIMIT,
};
use crate::ConfigError;
use scraper::Selector;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &SiteConfig) -> Result<(), ConfigError> {
    validate_main_url(&config.main_url)?;
    validate_products(&config.products_list.products)?;
    validate_pagination(&config.products_list.pagination)?;
    validate_crawler_config(&config.crawler)?;
    validate_output_config(&config.output)?;

    if config.product_feed.suffix.is_empty() {
        return Err(ConfigError::MissingField("product-feed.suffix"));
    }

    Ok(())
}

fn require(value: &str, field: &'static str) -> Result<(), ConfigError> {
    if value.trim().is_empty() {
        return Err(ConfigError::MissingField(field));
    }
    Ok(())
}

fn validate_main_url(main_url: &str) -> Result<(), ConfigError> {
    require(main_url, "main-url")?;

    let url = Url::parse(main_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid main-url '{}': {}", main_url, e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "main-url '{}' must use http or https",
            main_url
        )));
    }

    Ok(())
}

fn validate_products(products: &ProductSelectorConfig) -> Result<(), ConfigError> {
    require(&products.selector, "products-list.products.selector")?;
    require(&products.attribute, "products-list.products.attribute")?;
    require(&products.url_prefix, "products-list.products.url-prefix")?;

    Selector::parse(&products.selector).map_err(|e| ConfigError::InvalidSelector {
        selector: products.selector.clone(),
        message: format!("{:?}", e),
    })?;

    Ok(())
}

fn validate_pagination(pagination: &PaginationConfig) -> Result<(), ConfigError> {
    require(&pagination.value, "products-list.pagination.value")?;
    require(&pagination.placeholder, "products-list.pagination.placeholder")?;

    if !pagination.value.contains(&pagination.placeholder) {
        return Err(ConfigError::Validation(format!(
            "pagination value '{}' does not contain the placeholder '{}'",
            pagination.value, pagination.placeholder
        )));
    }

    if pagination.max_pages < 1 || pagination.max_pages > MAX_PAGES_LIMIT {
        return Err(ConfigError::Validation(format!(
            "max-pages must be between 1 and {}, got {}",
            MAX_PAGES_LIMIT, pagination.max_pages
        )));
    }

    Ok(())
}

fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.max_concurrent_requests < 1 || config.max_concurrent_requests > 32 {
        return Err(ConfigError::Validation(format!(
            "max-concurrent-requests must be between 1 and 32, got {}",
            config.max_concurrent_requests
        )));
    }

    if config.request_timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "request-timeout-secs must be >= 1".to_string(),
        ));
    }

    if config.retry_max_delay_ms < config.retry_base_delay_ms {
        return Err(ConfigError::Validation(format!(
            "retry-max-delay-ms ({}) must be >= retry-base-delay-ms ({})",
            config.retry_max_delay_ms, config.retry_base_delay_ms
        )));
    }

    Ok(())
}

fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    require(&config.directory, "output.directory")?;
    require(&config.database_path, "output.database-path")?;
    validate_table_name(&config.table_name)
}

/// Checks that a table name can be spliced into SQL unquoted
pub fn validate_table_name(name: &str) -> Result<(), ConfigError> {
    let valid = name
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');

    if !valid {
        return Err(ConfigError::Validation(format!(
            "table name '{}' must contain only ASCII letters, digits and '_' and not start with a digit",
            name
        )));
    }

    Ok(())
}
