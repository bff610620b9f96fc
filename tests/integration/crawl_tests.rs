//! Integration tests for the crawler
//!
//! These tests use wiremock to serve listing and detail pages and run the
//! full crawl-and-enrich cycle through the HTTP driver.

use jobtrawl::browser::{launcher_for, BrowserLauncher, HttpLauncher};
use jobtrawl::config::{parse_config, BrowserConfig, CrawlerConfig};
use jobtrawl::crawler::{scrape_all, CrawlSession, Termination};
use jobtrawl::extract::Locator;
use jobtrawl::source::{DetailSelectors, ListingSelectors, Pagination, SourceAdapter};
use jobtrawl::state::DESCRIPTION_NOT_FOUND;
use jobtrawl::storage::{JobFilter, JobStore, SqliteJobStore};
use jobtrawl::{scrape, SearchRequest};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates an adapter for the mock job board served at `base_url`
fn mock_adapter(base_url: &str) -> SourceAdapter {
    SourceAdapter {
        name: "MockBoard".to_string(),
        base_url: base_url.to_string(),
        search_url: "/search?q={title}&l={location}".to_string(),
        search_splitter: "+".to_string(),
        remote_filter: String::new(),
        strip_query: false,
        listing: ListingSelectors {
            results_ready: "ul.results".to_string(),
            result_item: vec!["ul.results > li".to_string()],
            link: vec![Locator::attr("a.job", "href")],
            title: vec![Locator::text("a.job")],
            company: vec![Locator::text(".company")],
            location: vec![Locator::text(".location")],
            date_posted: vec![Locator::attr("time", "datetime")],
        },
        pagination: Pagination::NextButton {
            selector: "a.next".to_string(),
        },
        detail: DetailSelectors {
            ready: None,
            description: vec![Locator::block("div.description")],
            fallback: None,
        },
        login: None,
    }
}

fn fast_config() -> CrawlerConfig {
    CrawlerConfig {
        workers: 3,
        navigation_timeout_ms: 2000,
        results_timeout_ms: 2000,
        detail_timeout_ms: 500,
        scroll_settle_ms: 1,
        ..CrawlerConfig::default()
    }
}

fn request(titles: &[&str], limit: Option<usize>) -> SearchRequest {
    SearchRequest {
        titles: titles.iter().map(|t| t.to_string()).collect(),
        locations: vec!["remote".to_string()],
        remote_only: false,
        limit,
    }
}

fn launcher() -> Arc<dyn BrowserLauncher> {
    Arc::new(HttpLauncher::new(BrowserConfig::default()))
}

fn listing_html(ids: &[usize], next: Option<&str>) -> String {
    let items: String = ids
        .iter()
        .map(|id| {
            format!(
                r#"<li>
                    <a class="job" href="/jobs/{id}?utm_source=search#apply">Rust Engineer {id}</a>
                    <span class="company">Company {id}</span>
                    <span class="location">Remote</span>
                    <time datetime="2026-10-0{day}">recently</time>
                </li>"#,
                id = id,
                day = id % 9 + 1
            )
        })
        .collect();
    let next = next
        .map(|href| format!(r#"<a class="next" href="{}">Next</a>"#, href))
        .unwrap_or_default();
    format!(
        "<html><body><ul class=\"results\">{}</ul>{}</body></html>",
        items, next
    )
}

async fn mount_listing(server: &MockServer, route: &str, html: String) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(html)
                .insert_header("content-type", "text/html"),
        )
        .mount(server)
        .await;
}

async fn mount_detail(server: &MockServer, id: usize, delay: Option<Duration>) {
    let mut response = ResponseTemplate::new(200)
        .set_body_string(format!(
            r#"<html><body><div class="description"><p>Job {id} builds crawlers.</p>
               <p>Tokio and scraper.</p></div></body></html>"#
        ))
        .insert_header("content-type", "text/html");
    if let Some(delay) = delay {
        response = response.set_delay(delay);
    }

    Mock::given(method("GET"))
        .and(path(format!("/jobs/{}", id)))
        .respond_with(response)
        .expect(1)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_paginated_crawl_enriches_every_job() {
    let server = MockServer::start().await;

    mount_listing(&server, "/search", listing_html(&[1, 2, 3], Some("/search/2"))).await;
    mount_listing(&server, "/search/2", listing_html(&[4, 5], Some("/search/3"))).await;
    mount_listing(&server, "/search/3", listing_html(&[6], None)).await;
    for id in 1..=6 {
        mount_detail(&server, id, None).await;
    }

    let session = CrawlSession::new(
        Arc::new(mock_adapter(&server.uri())),
        launcher(),
        fast_config(),
    );
    let output = session.run(&request(&["rust"], None)).await.unwrap();

    assert_eq!(output.records.len(), 6);
    let urls: HashSet<_> = output.records.iter().map(|r| r.url.clone()).collect();
    assert_eq!(urls.len(), 6);
    for id in 1..=6 {
        assert!(urls.contains(&format!("{}/jobs/{}", server.uri(), id)));
    }

    for record in &output.records {
        assert!(record.description.contains("builds crawlers"));
        assert!(record.description.contains("Tokio and scraper."));
        assert!(record.title.starts_with("Rust Engineer"));
        assert_eq!(record.location, "Remote");
        assert!(record.date_posted.is_some());
    }

    assert_eq!(output.report.queries.len(), 1);
    assert_eq!(output.report.queries[0].passes, 3);
    assert_eq!(output.report.queries[0].termination, Termination::NoNextPage);
    assert_eq!(output.report.enrichment.enriched, 6);
    assert_eq!(output.report.enrichment.placeholder, 0);
}

#[tokio::test]
async fn test_slow_detail_page_gets_placeholder() {
    let server = MockServer::start().await;

    mount_listing(&server, "/search", listing_html(&[1, 2, 3], None)).await;
    mount_detail(&server, 1, None).await;
    mount_detail(&server, 2, Some(Duration::from_secs(2))).await;
    mount_detail(&server, 3, None).await;

    let records = scrape(
        mock_adapter(&server.uri()),
        launcher(),
        &fast_config(),
        &request(&["rust"], None),
    )
    .await
    .unwrap();

    assert_eq!(records.len(), 3);
    let slow = records
        .iter()
        .find(|r| r.url.ends_with("/jobs/2"))
        .unwrap();
    assert_eq!(slow.description, DESCRIPTION_NOT_FOUND);
    assert!(records
        .iter()
        .filter(|r| !r.url.ends_with("/jobs/2"))
        .all(|r| r.description.contains("builds crawlers")));
}

#[tokio::test]
async fn test_missing_detail_page_gets_placeholder() {
    let server = MockServer::start().await;

    mount_listing(&server, "/search", listing_html(&[1, 2], None)).await;
    mount_detail(&server, 1, None).await;

    let records = scrape(
        mock_adapter(&server.uri()),
        launcher(),
        &fast_config(),
        &request(&["rust"], None),
    )
    .await
    .unwrap();

    assert_eq!(records.len(), 2);
    let missing = records.iter().find(|r| r.url.ends_with("/jobs/2")).unwrap();
    assert!(missing.has_placeholder_description());
}

#[tokio::test]
async fn test_overlapping_queries_fetch_each_detail_once() {
    let server = MockServer::start().await;

    // Every query lands on the same listing; wiremock ignores the query string
    mount_listing(&server, "/search", listing_html(&[1, 2, 3, 4], None)).await;
    for id in 1..=4 {
        mount_detail(&server, id, None).await;
    }

    let records = scrape(
        mock_adapter(&server.uri()),
        launcher(),
        &fast_config(),
        &request(&["rust", "backend", "systems"], None),
    )
    .await
    .unwrap();

    assert_eq!(records.len(), 4);
    let urls: HashSet<_> = records.iter().map(|r| r.url.as_str()).collect();
    assert_eq!(urls.len(), 4);
}

#[tokio::test]
async fn test_unreachable_search_page_yields_empty_result() {
    let server = MockServer::start().await;

    let records = scrape(
        mock_adapter(&server.uri()),
        launcher(),
        &fast_config(),
        &request(&["rust"], None),
    )
    .await
    .unwrap();

    assert!(records.is_empty());
}

#[tokio::test]
async fn test_config_driven_run_into_store() {
    let server = MockServer::start().await;

    // The limit stops harvesting after the first two cards
    mount_listing(&server, "/search", listing_html(&[1, 2, 3], None)).await;
    for id in 1..=2 {
        mount_detail(&server, id, None).await;
    }

    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("jobs.db");
    let toml = format!(
        r#"
sources = ["mockboard"]

[search]
titles = ["rust engineer"]
locations = ["remote"]
limit = 2

[crawler]
workers = 2
detail-timeout-ms = 2000

[output]
database-path = "{db}"

[[custom-source]]
name = "mockboard"
base-url = "{base}"
search-url = "/search?q={{title}}&l={{location}}"

[custom-source.pagination]
mode = "infinite-scroll"

[custom-source.listing]
results-ready = "ul.results"
result-item = ["ul.results > li"]
link = [{{ selector = "a.job", read = {{ attr = "href" }} }}]
title = [{{ selector = "a.job", read = "text" }}]
company = [{{ selector = ".company", read = "text" }}]
location = [{{ selector = ".location", read = "text" }}]

[custom-source.detail]
description = [{{ selector = "div.description", read = "block" }}]
"#,
        db = db_path.display(),
        base = server.uri()
    );

    let config = parse_config(&toml).unwrap();
    let adapters = config.adapters().unwrap();
    assert_eq!(adapters.len(), 1);

    let launcher = launcher_for(&config.browser).unwrap();
    let request = SearchRequest::from(&config.search);
    let outcomes = scrape_all(adapters, launcher, &config.crawler, &request).await;

    assert_eq!(outcomes.len(), 1);
    let output = outcomes.into_iter().next().unwrap().result.unwrap();
    assert_eq!(output.records.len(), 2);

    let mut store = SqliteJobStore::new(&db_path).unwrap();
    assert_eq!(store.save_jobs(&output.records).unwrap(), 2);
    // A second save of the same records updates in place
    store.save_jobs(&output.records).unwrap();
    assert_eq!(store.count_jobs().unwrap(), 2);

    let stored = store.get_jobs(&JobFilter::default()).unwrap();
    assert!(stored
        .iter()
        .all(|job| job.description.contains("builds crawlers")));
}
