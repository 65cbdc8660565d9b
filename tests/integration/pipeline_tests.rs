//! Integration tests for the extraction pipeline
//!
//! These tests use wiremock to serve listing pages and product feeds and
//! drive the extractors and the pipeline end-to-end.

use shop_harvest::config::{parse_config, validate, SiteConfig};
use shop_harvest::crawler::{harvest, PageOutcome, Pipeline, ProductOutcome, StopReason};
use shop_harvest::output::{read_variants, BatchSink, JsonBatchStore, SqliteLoader};
use shop_harvest::{ConfigError, HarvestError};
use std::time::{Duration, Instant};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a test configuration pointing at the mock server
fn create_test_config(base_url: &str, max_pages: u32, concurrency: u32) -> SiteConfig {
    let config = parse_config(&format!(
        r#"
main-url = "{base}/collections/all"

[products-list.products]
selector = "a.product-card"
attribute = "href"
url-prefix = "{base}"

[products-list.pagination]
value = "/page/<PNum>"
max-pages = {max_pages}

[crawler]
max-concurrent-requests = {concurrency}
min-request-interval-ms = 0
request-timeout-secs = 5
max-retries = 2
retry-base-delay-ms = 10
retry-max-delay-ms = 50
"#,
        base = base_url,
        max_pages = max_pages,
        concurrency = concurrency
    ))
    .expect("Failed to parse test config");
    validate(&config).expect("Test config should be valid");
    config
}

/// Renders a listing page with one product card per handle
fn listing_html(handles: &[&str]) -> String {
    let cards: String = handles
        .iter()
        .map(|handle| format!(r#"<a class="product-card" href="/products/{}">{}</a>"#, handle, handle))
        .collect();
    format!(
        r#"<html><body><nav><a href="/pages/about">About</a></nav><div class="grid">{}</div></body></html>"#,
        cards
    )
}

/// Renders a product feed with the given variant ids
fn feed_json(title: &str, variant_ids: &[u64]) -> String {
    let variants: Vec<serde_json::Value> = variant_ids
        .iter()
        .map(|id| {
            serde_json::json!({
                "id": id,
                "sku": format!("SKU-{}", id),
                "option1": "Black",
                "option2": "M",
                "featured_image": {"src": format!("//cdn.shop.test/{}.jpg", id)},
                "price": 1000 + id,
                "compare_at_price": null,
                "available": true,
                "barcode": format!("370{}", id)
            })
        })
        .collect();

    serde_json::json!({
        "id": 1,
        "title": title,
        "description": format!("<p>{}</p>", title),
        "variants": variants
    })
    .to_string()
}

async fn mount_page(server: &MockServer, page_path: &str, body: String) {
    Mock::given(method("GET"))
        .and(path(page_path))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_listing_page_keeps_placeholder_for_missing_attribute() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    let html = r#"<html><body>
        <a class="product-card" href="/products/a">A</a>
        <a class="product-card" href="/products/b">B</a>
        <a class="product-card" data-handle="c">C</a>
        <a class="product-card" href="/products/d">D</a>
        <a class="product-card" href="/products/e">E</a>
    </body></html>"#;
    mount_page(&mock_server, "/collections/all", html.to_string()).await;

    let config = create_test_config(&base_url, 5, 1);
    let pipeline = Pipeline::from_config(&config).unwrap();
    let urls = pipeline
        .listing()
        .extract_listing_page(&config.main_url)
        .await
        .unwrap();

    assert_eq!(urls.len(), 5);
    assert_eq!(urls.iter().filter(|u| u.is_empty()).count(), 1);
    assert_eq!(urls[2], "");
    for (url, handle) in [(0, "a"), (1, "b"), (3, "d"), (4, "e")] {
        assert_eq!(urls[url], format!("{}/products/{}", base_url, handle));
    }
}

#[tokio::test]
async fn test_listing_page_unreachable_host_is_empty() {
    let config = create_test_config("http://127.0.0.1:1", 5, 1);
    let pipeline = Pipeline::from_config(&config).unwrap();

    let urls = pipeline
        .listing()
        .extract_listing_page(&config.main_url)
        .await
        .expect("Unreachable host must not raise");
    assert!(urls.is_empty());
}

#[tokio::test]
async fn test_listing_page_http_error_is_empty() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/collections/all"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&mock_server)
        .await;

    let config = create_test_config(&mock_server.uri(), 5, 1);
    let pipeline = Pipeline::from_config(&config).unwrap();

    let page = pipeline
        .listing()
        .scan_listing_page(&config.main_url)
        .await
        .unwrap();
    assert!(page.urls.is_empty());
    assert_eq!(page.outcome, PageOutcome::FetchFailed);
}

#[tokio::test]
async fn test_listing_page_empty_url_is_an_error() {
    let config = create_test_config("http://127.0.0.1:1", 5, 1);
    let pipeline = Pipeline::from_config(&config).unwrap();

    assert!(pipeline.listing().extract_listing_page("").await.is_err());
}

#[tokio::test]
async fn test_product_feed_yields_one_record_per_variant() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    Mock::given(method("GET"))
        .and(path("/products/belt.js"))
        .respond_with(ResponseTemplate::new(200).set_body_string(feed_json("Belt", &[11, 12, 13])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let config = create_test_config(&base_url, 5, 1);
    let pipeline = Pipeline::from_config(&config).unwrap();

    let records = pipeline
        .products()
        .extract_product(&format!("{}/products/belt?variant=55971618685303", base_url))
        .await
        .unwrap();

    assert_eq!(records.len(), 3);
    assert!(records.iter().all(|r| r.product_name == "Belt"));
    assert!(records.iter().all(|r| r.product_description == "<p>Belt</p>"));
    assert!(records
        .iter()
        .all(|r| r.product_url == format!("{}/products/belt", base_url)));

    let skus: Vec<_> = records.iter().filter_map(|r| r.product_sku.clone()).collect();
    assert_eq!(skus, vec!["SKU-11", "SKU-12", "SKU-13"]);
}

#[tokio::test]
async fn test_product_feed_failures_are_empty() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    mount_page(&mock_server, "/products/broken.js", "<html>oops</html>".to_string()).await;
    mount_page(
        &mock_server,
        "/products/bare.js",
        r#"{"title": "Bare", "description": "", "variants": []}"#.to_string(),
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/products/gone.js"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock_server)
        .await;

    let config = create_test_config(&base_url, 5, 1);
    let pipeline = Pipeline::from_config(&config).unwrap();
    let products = pipeline.products();

    let malformed = products
        .scan_product(&format!("{}/products/broken", base_url))
        .await
        .unwrap();
    assert_eq!(malformed, ProductOutcome::Malformed);

    let bare = products
        .scan_product(&format!("{}/products/bare", base_url))
        .await
        .unwrap();
    assert_eq!(bare, ProductOutcome::NoVariants);

    let gone = products
        .extract_product(&format!("{}/products/gone", base_url))
        .await
        .unwrap();
    assert!(gone.is_empty());

    let unreachable = products
        .extract_product("http://127.0.0.1:1/products/anything")
        .await
        .unwrap();
    assert!(unreachable.is_empty());
}

#[tokio::test]
async fn test_listing_phase_stops_at_first_empty_page() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    mount_page(
        &mock_server,
        "/collections/all",
        listing_html(&["a", "b", "c", "d", "e"]),
    )
    .await;
    mount_page(&mock_server, "/collections/all/page/2", listing_html(&[])).await;

    Mock::given(method("GET"))
        .and(path("/collections/all/page/3"))
        .respond_with(ResponseTemplate::new(200).set_body_string(listing_html(&["never"])))
        .expect(0)
        .mount(&mock_server)
        .await;

    let config = create_test_config(&base_url, 10, 1);
    let pipeline = Pipeline::from_config(&config).unwrap();
    let (urls, stats) = pipeline.collect_product_urls().await.unwrap();

    assert_eq!(urls.len(), 5);
    assert_eq!(urls[0], format!("{}/products/a", base_url));
    assert_eq!(urls[4], format!("{}/products/e", base_url));
    assert_eq!(stats.pages_visited, 2);
    assert_eq!(stats.stop_reason, StopReason::EmptyPage(PageOutcome::NoMatches));
}

#[tokio::test]
async fn test_listing_phase_stops_at_safety_cap() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    mount_page(&mock_server, "/collections/all", listing_html(&["p1a", "p1b"])).await;
    mount_page(&mock_server, "/collections/all/page/2", listing_html(&["p2a", "p2b"])).await;
    mount_page(&mock_server, "/collections/all/page/3", listing_html(&["p3a", "p3b"])).await;

    Mock::given(method("GET"))
        .and(path("/collections/all/page/4"))
        .respond_with(ResponseTemplate::new(200).set_body_string(listing_html(&["p4a"])))
        .expect(0)
        .mount(&mock_server)
        .await;

    let config = create_test_config(&base_url, 3, 1);
    let pipeline = Pipeline::from_config(&config).unwrap();
    let (urls, stats) = pipeline.collect_product_urls().await.unwrap();

    let handles: Vec<_> = urls
        .iter()
        .map(|u| u.trim_start_matches(&format!("{}/products/", base_url)).to_string())
        .collect();
    assert_eq!(handles, vec!["p1a", "p1b", "p2a", "p2b", "p3a", "p3b"]);
    assert_eq!(stats.pages_visited, 3);
    assert_eq!(stats.stop_reason, StopReason::SafetyCap);
}

#[tokio::test]
async fn test_transient_failures_are_retried() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    Mock::given(method("GET"))
        .and(path("/products/flaky.js"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/products/flaky.js"))
        .respond_with(ResponseTemplate::new(200).set_body_string(feed_json("Flaky", &[1])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let config = create_test_config(&base_url, 5, 1);
    let pipeline = Pipeline::from_config(&config).unwrap();

    let records = pipeline
        .products()
        .extract_product(&format!("{}/products/flaky", base_url))
        .await
        .unwrap();
    assert_eq!(records.len(), 1);
}

#[tokio::test]
async fn test_client_errors_are_not_retried() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/products/missing.js"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&mock_server)
        .await;

    let config = create_test_config(&mock_server.uri(), 5, 1);
    let pipeline = Pipeline::from_config(&config).unwrap();

    let outcome = pipeline
        .products()
        .scan_product(&format!("{}/products/missing", mock_server.uri()))
        .await
        .unwrap();
    assert_eq!(outcome, ProductOutcome::FetchFailed);
}

#[tokio::test]
async fn test_full_run_keeps_products_contiguous_and_ordered() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    mount_page(
        &mock_server,
        "/collections/all",
        format!(
            r#"<html><body>{}<a class="product-card">no link</a></body></html>"#,
            listing_html(&["alpha", "beta"])
        ),
    )
    .await;
    mount_page(&mock_server, "/collections/all/page/2", listing_html(&["gamma", "broken"])).await;
    mount_page(&mock_server, "/collections/all/page/3", listing_html(&[])).await;

    Mock::given(method("GET"))
        .and(path("/products/alpha.js"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(feed_json("Alpha", &[1, 2]))
                .set_delay(Duration::from_millis(150)),
        )
        .mount(&mock_server)
        .await;
    mount_page(&mock_server, "/products/beta.js", feed_json("Beta", &[3])).await;
    mount_page(&mock_server, "/products/gamma.js", feed_json("Gamma", &[4, 5, 6])).await;
    mount_page(&mock_server, "/products/broken.js", "not json".to_string()).await;

    let config = create_test_config(&base_url, 10, 3);
    let pipeline = Pipeline::from_config(&config).unwrap();
    let output = pipeline.run().await.unwrap();

    assert_eq!(output.product_urls.len(), 5);
    assert_eq!(output.listing.placeholders, 1);
    assert_eq!(output.listing.pages_visited, 3);

    let ids: Vec<u64> = output.variants.iter().map(|r| r.product_id).collect();
    assert_eq!(ids, vec![1, 2, 3, 4, 5, 6]);

    let names: Vec<&str> = output.variants.iter().map(|r| r.product_name.as_str()).collect();
    assert_eq!(names, vec!["Alpha", "Alpha", "Beta", "Gamma", "Gamma", "Gamma"]);

    assert_eq!(output.details.products_total, 5);
    assert_eq!(output.details.dispatched, 4);
    assert_eq!(output.details.extracted, 3);
    assert_eq!(output.details.malformed, 1);
    assert_eq!(output.details.skipped_placeholders, 1);
    assert_eq!(output.details.variants, 6);
}

#[tokio::test]
async fn test_batches_reach_json_and_sqlite_sinks() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    mount_page(&mock_server, "/collections/all", listing_html(&["belt"])).await;
    mount_page(&mock_server, "/collections/all/page/2", listing_html(&[])).await;
    mount_page(&mock_server, "/products/belt.js", feed_json("Belt", &[7, 8])).await;

    let config = create_test_config(&base_url, 10, 2);
    let output = harvest(&config).await.unwrap();

    let dir = tempfile::TempDir::new().unwrap();
    let mut store = JsonBatchStore::new(dir.path());
    store.write_product_urls(&output.product_urls).unwrap();
    store.write_variants(&output.variants).unwrap();

    let reloaded = read_variants(&store.variants_path()).unwrap();
    assert_eq!(reloaded, output.variants);

    let mut loader = SqliteLoader::open(&dir.path().join("catalog.db"), "products_test").unwrap();
    loader.write_product_urls(&output.product_urls).unwrap();
    loader.write_variants(&reloaded).unwrap();
    assert_eq!(loader.count_variants().unwrap(), 2);

    let stored_url: String = loader
        .connection()
        .query_row(
            "SELECT product_url FROM products_test_urls WHERE position = 0",
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(stored_url, format!("{}/products/belt", base_url));

    // A second load replaces the table rather than appending
    loader.write_variants(&reloaded[..1]).unwrap();
    assert_eq!(loader.count_variants().unwrap(), 1);
}

#[tokio::test]
async fn test_incomplete_config_sends_no_request() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string(listing_html(&["a"])))
        .expect(0)
        .mount(&mock_server)
        .await;

    let mut config = create_test_config(&mock_server.uri(), 4, 1);
    config.products_list.products.attribute = String::new();
    config.products_list.pagination.value = String::new();

    let result = harvest(&config).await;
    assert!(matches!(
        result,
        Err(HarvestError::Config(ConfigError::MissingField(_)))
    ));
}

#[tokio::test]
async fn test_cancel_mid_run_keeps_in_flight_records() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    for (handle, id) in [("first", 1), ("second", 2)] {
        Mock::given(method("GET"))
            .and(path(format!("/products/{}.js", handle)))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(feed_json(handle, &[id]))
                    .set_delay(Duration::from_millis(300)),
            )
            .expect(1)
            .mount(&mock_server)
            .await;
    }
    for handle in ["third", "fourth"] {
        Mock::given(method("GET"))
            .and(path(format!("/products/{}.js", handle)))
            .respond_with(ResponseTemplate::new(200).set_body_string(feed_json(handle, &[9])))
            .expect(0)
            .mount(&mock_server)
            .await;
    }

    let config = create_test_config(&base_url, 5, 2);
    let pipeline = Pipeline::from_config(&config).unwrap();
    let urls: Vec<String> = ["first", "second", "third", "fourth"]
        .iter()
        .map(|handle| format!("{}/products/{}", base_url, handle))
        .collect();

    let token = pipeline.cancellation_token();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        token.cancel();
    });

    let (variants, stats) = pipeline.collect_variants(&urls).await;

    let names: Vec<&str> = variants.iter().map(|r| r.product_name.as_str()).collect();
    assert_eq!(names, vec!["first", "second"]);
    assert_eq!(stats.dispatched, 2);
    assert_eq!(stats.extracted, 2);
    assert_eq!(stats.not_dispatched, 2);
}

#[tokio::test]
async fn test_detail_phase_respects_concurrency_limit() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();
    let handles = ["p1", "p2", "p3", "p4"];

    for (id, handle) in handles.iter().enumerate() {
        Mock::given(method("GET"))
            .and(path(format!("/products/{}.js", handle)))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(feed_json(handle, &[id as u64]))
                    .set_delay(Duration::from_millis(200)),
            )
            .expect(1)
            .mount(&mock_server)
            .await;
    }

    let config = create_test_config(&base_url, 5, 2);
    let pipeline = Pipeline::from_config(&config).unwrap();
    let urls: Vec<String> = handles
        .iter()
        .map(|handle| format!("{}/products/{}", base_url, handle))
        .collect();

    let start = Instant::now();
    let (variants, stats) = pipeline.collect_variants(&urls).await;
    let elapsed = start.elapsed();

    assert_eq!(variants.len(), 4);
    assert_eq!(stats.extracted, 4);
    // Two at a time: two rounds of 200ms, well short of four sequential ones
    assert!(elapsed >= Duration::from_millis(400), "elapsed {:?}", elapsed);
    assert!(elapsed < Duration::from_millis(800), "elapsed {:?}", elapsed);
}

#[test]
fn test_example_config_is_valid() {
    let path = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("site.example.toml");
    let config = shop_harvest::config::load_config(&path).expect("Example config should load");

    assert_eq!(config.products_list.pagination.max_pages, 50);
    assert_eq!(
        config.user_agent.header_value(),
        format!(
            "shop-harvest/{} (+https://example.com/bot)",
            env!("CARGO_PKG_VERSION")
        )
    );
}
