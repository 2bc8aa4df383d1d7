//! End-to-end catalog refresh and backfill behaviour
//!
//! Runs `CatalogRefreshService` and `BackfillOrchestrator` against an
//! in-process fake site and the in-memory cache store.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use catalog_refresh_lib::application::{
    BackfillOrchestrator, CatalogError, CatalogRefreshService, CatalogRequest, ManualClock,
};
use catalog_refresh_lib::domain::catalog::{UNKNOWN_DIRECTOR, UNKNOWN_TITLE};
use catalog_refresh_lib::domain::{CatalogCacheStore, CatalogEntry, UserCacheRecord};
use catalog_refresh_lib::infrastructure::config::CatalogConfig;
use catalog_refresh_lib::infrastructure::fetch_error::{FetchError, FetchResult};
use catalog_refresh_lib::infrastructure::{InMemoryCatalogCacheStore, PageFetcher};

const BASE: &str = "https://letterboxd.com";
const NOW: i64 = 1_700_000_000;
const TTL: i64 = 21_600;

/// Pages served by URL; unknown URLs answer 404
#[derive(Default)]
struct FakeSite {
    pages: Mutex<HashMap<String, String>>,
    requests: Mutex<Vec<String>>,
}

impl FakeSite {
    fn serve(&self, url: String, body: String) {
        self.pages.lock().unwrap().insert(url, body);
    }

    fn take_down(&self, url: &str) {
        self.pages.lock().unwrap().remove(url);
    }

    /// Catalog split into pages; every page but the last links to the next
    fn set_catalog(&self, user: &str, pages: &[&[&str]]) {
        for (index, slugs) in pages.iter().enumerate() {
            let number = index + 1;
            let next = (number < pages.len()).then_some(number + 1);
            self.serve(catalog_page_url(user, number), catalog_page(user, slugs, next));
        }
    }

    fn add_film(&self, slug: &str) {
        self.serve(film_url(slug), film_page(slug));
    }

    fn add_films(&self, slugs: &[&str]) {
        for slug in slugs {
            self.add_film(slug);
        }
    }

    fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    fn requests_for(&self, url: &str) -> usize {
        self.requests.lock().unwrap().iter().filter(|r| r.as_str() == url).count()
    }

    fn film_requests(&self) -> usize {
        let prefix = format!("{BASE}/film/");
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.starts_with(&prefix))
            .count()
    }

    fn reset_requests(&self) {
        self.requests.lock().unwrap().clear();
    }
}

#[async_trait]
impl PageFetcher for FakeSite {
    async fn fetch_page(&self, url: &str) -> FetchResult<String> {
        self.requests.lock().unwrap().push(url.to_string());
        self.pages
            .lock()
            .unwrap()
            .get(url)
            .cloned()
            .ok_or_else(|| FetchError::from_status(404, url))
    }
}

fn catalog_page_url(user: &str, number: usize) -> String {
    if number == 1 {
        format!("{BASE}/{user}/films/by/date/")
    } else {
        format!("{BASE}/{user}/films/by/date/page/{number}/")
    }
}

fn film_url(slug: &str) -> String {
    format!("{BASE}/film/{slug}/")
}

fn catalog_page(user: &str, slugs: &[&str], next: Option<usize>) -> String {
    let tiles: String = slugs
        .iter()
        .map(|slug| {
            format!(
                r#"<li class="poster-container"><div class="film-poster" data-film-slug="{slug}" data-target-link="/film/{slug}/"></div><p class="poster-viewingdata"><span class="rating rated-8">★★★★</span></p></li>"#
            )
        })
        .collect();
    let pagination = next
        .map(|n| {
            format!(r#"<div class="pagination"><a class="next" href="/{user}/films/by/date/page/{n}/">Older</a></div>"#)
        })
        .unwrap_or_default();
    format!(r#"<html><body><ul class="poster-list">{tiles}</ul>{pagination}</body></html>"#)
}

fn film_page(slug: &str) -> String {
    let json_ld = format!(
        r#"{{"@type":"Movie","image":"https://a.ltrbxd.com/{slug}.jpg","datePublished":"1995-12-15"}}"#
    );
    format!(
        r#"<html><head><meta property="og:title" content="Film {slug}" />
        <script type="application/ld+json">/* <![CDATA[ */ {json_ld} /* ]]> */</script></head>
        <body><span class="directorlist"><a class="contributor">Director {slug}</a></span></body></html>"#
    )
}

fn cached_entry(slug: &str) -> CatalogEntry {
    CatalogEntry {
        title: format!("Cached {slug}"),
        directors: vec!["Someone".to_string()],
        ..CatalogEntry::placeholder(film_url(slug))
    }
}

fn cached_record(user: &str, slugs: &[&str], last_updated: i64) -> UserCacheRecord {
    UserCacheRecord::new(user, slugs.iter().map(|s| cached_entry(s)).collect(), last_updated, true)
}

fn urls(entries: &[CatalogEntry]) -> Vec<String> {
    entries.iter().map(|e| e.source_url.clone()).collect()
}

fn film_urls(slugs: &[&str]) -> Vec<String> {
    slugs.iter().map(|s| film_url(s)).collect()
}

struct Harness {
    site: Arc<FakeSite>,
    store: Arc<InMemoryCatalogCacheStore>,
    clock: Arc<ManualClock>,
    service: Arc<CatalogRefreshService>,
}

impl Harness {
    fn new(config: CatalogConfig, records: Vec<UserCacheRecord>) -> Self {
        let site = Arc::new(FakeSite::default());
        let store = Arc::new(InMemoryCatalogCacheStore::with_records(records));
        let clock = Arc::new(ManualClock::new(NOW));
        let service = CatalogRefreshService::new(site.clone(), store.clone(), clock.clone(), config)
            .expect("default selectors compile");
        Self {
            site,
            store,
            clock,
            service: Arc::new(service),
        }
    }

    fn with_records(records: Vec<UserCacheRecord>) -> Self {
        Self::new(test_config(), records)
    }

    async fn record(&self, user: &str) -> Option<UserCacheRecord> {
        self.store.get(user).await.unwrap()
    }

    fn backfill(&self) -> BackfillOrchestrator {
        BackfillOrchestrator::new(self.service.clone())
    }
}

fn test_config() -> CatalogConfig {
    CatalogConfig {
        batch_delay_ms: 0,
        fetch_reviews: false,
        ..CatalogConfig::default()
    }
}

#[tokio::test]
async fn fast_mode_without_cache_is_empty_and_offline() {
    let h = Harness::with_records(Vec::new());
    h.site.set_catalog("alice", &[&["heat"]]);
    h.site.add_film("heat");

    let entries = h.service.get_catalog(&CatalogRequest::new("alice").fast()).await.unwrap();

    assert!(entries.is_empty());
    assert_eq!(h.site.request_count(), 0);
    assert!(h.record("alice").await.is_none());
}

#[tokio::test]
async fn fast_mode_serves_stale_cache_as_is() {
    let h = Harness::with_records(vec![cached_record("alice", &["a", "b"], 0)]);

    let entries = h.service.get_catalog(&CatalogRequest::new("alice").fast()).await.unwrap();

    assert_eq!(urls(&entries), film_urls(&["a", "b"]));
    assert_eq!(h.site.request_count(), 0);
}

#[tokio::test]
async fn usernames_differing_in_case_share_one_cache_row() {
    let h = Harness::with_records(vec![cached_record("alice", &["a", "b"], NOW)]);

    let entries = h.service.get_catalog(&CatalogRequest::new(" Alice ")).await.unwrap();
    let shown = h.service.cached_record("ALICE").await.unwrap();

    assert_eq!(urls(&entries), film_urls(&["a", "b"]));
    assert_eq!(shown.map(|r| r.username), Some("alice".to_string()));
    assert_eq!(h.site.request_count(), 0);
    assert!(h.record("Alice").await.is_none());
}

#[tokio::test]
async fn first_request_builds_and_persists_the_catalog() {
    let h = Harness::with_records(Vec::new());
    h.site.set_catalog("alice", &[&["heat", "alien"], &["stalker"]]);
    h.site.add_films(&["heat", "alien", "stalker"]);

    let entries = h.service.get_catalog(&CatalogRequest::new("alice")).await.unwrap();

    assert_eq!(urls(&entries), film_urls(&["heat", "alien", "stalker"]));
    let heat = &entries[0];
    assert_eq!(heat.title, "Film heat");
    assert_eq!(heat.directors, vec!["Director heat".to_string()]);
    assert_eq!(heat.poster_url.as_deref(), Some("https://a.ltrbxd.com/heat.jpg"));
    assert_eq!(heat.release_year.as_deref(), Some("1995"));
    assert_eq!(heat.rating.as_deref(), Some("★★★★"));
    assert_eq!(heat.review_url.as_deref(), Some("https://letterboxd.com/alice/film/heat/"));

    let record = h.record("alice").await.unwrap();
    assert_eq!(record.entries, entries);
    assert_eq!(record.last_updated, NOW);
    assert!(record.is_complete);
}

#[tokio::test]
async fn cache_inside_ttl_is_served_without_fetching() {
    let h = Harness::with_records(vec![cached_record("alice", &["a"], NOW - TTL + 1)]);
    h.site.set_catalog("alice", &[&["new", "a"]]);

    let entries = h.service.get_catalog(&CatalogRequest::new("alice")).await.unwrap();

    assert_eq!(urls(&entries), film_urls(&["a"]));
    assert_eq!(h.site.request_count(), 0);
}

#[tokio::test]
async fn cache_past_ttl_takes_the_staleness_path() {
    let h = Harness::with_records(vec![cached_record("alice", &["a"], NOW - TTL - 1)]);
    h.site.set_catalog("alice", &[&["a"]]);

    h.service.get_catalog(&CatalogRequest::new("alice")).await.unwrap();

    assert!(h.site.request_count() > 0);
    assert_eq!(h.record("alice").await.unwrap().last_updated, NOW);
}

#[tokio::test]
async fn unchanged_head_only_rewrites_the_timestamp() {
    let before = cached_record("alice", &["a", "b", "c"], NOW - TTL - 1);
    let h = Harness::with_records(vec![before.clone()]);
    h.site.set_catalog("alice", &[&["a", "b", "c"]]);

    let entries = h.service.get_catalog(&CatalogRequest::new("alice")).await.unwrap();

    let after = h.record("alice").await.unwrap();
    assert_eq!(
        serde_json::to_string(&after.entries).unwrap(),
        serde_json::to_string(&before.entries).unwrap()
    );
    assert_eq!(after.last_updated, NOW);
    assert_eq!(after.is_complete, before.is_complete);
    assert_eq!(entries, before.entries);
    assert_eq!(h.site.request_count(), 1);
    assert_eq!(h.site.film_requests(), 0);
}

#[tokio::test]
async fn moved_head_scrapes_only_new_films_and_appends_them() {
    let h = Harness::with_records(vec![cached_record("alice", &["a", "b"], NOW - TTL - 1)]);
    h.site.set_catalog("alice", &[&["c", "a"], &["b"]]);
    h.site.add_films(&["a", "b", "c"]);

    let entries = h.service.get_catalog(&CatalogRequest::new("alice")).await.unwrap();

    assert_eq!(urls(&entries), film_urls(&["a", "b", "c"]));
    assert_eq!(entries[0].title, "Cached a");
    assert_eq!(entries[2].title, "Film c");
    assert_eq!(h.site.requests_for(&film_url("c")), 1);
    assert_eq!(h.site.film_requests(), 1);
}

#[tokio::test]
async fn rebuilding_twice_without_upstream_changes_is_idempotent() {
    let config = CatalogConfig {
        head_probe_enabled: false,
        ..test_config()
    };
    let h = Harness::new(config, Vec::new());
    h.site.set_catalog("alice", &[&["a", "b"], &["c"]]);
    h.site.add_films(&["a", "b", "c"]);

    let first = h.service.get_catalog(&CatalogRequest::new("alice")).await.unwrap();
    h.clock.advance(TTL + 1);
    h.site.reset_requests();
    let second = h.service.get_catalog(&CatalogRequest::new("alice")).await.unwrap();

    assert_eq!(first, second);
    assert_eq!(h.site.film_requests(), 0);
    let record = h.record("alice").await.unwrap();
    assert_eq!(record.len(), 3);
    assert_eq!(record.last_updated, NOW + TTL + 1);
}

#[tokio::test]
async fn incremental_cap_leaves_the_cache_incomplete_until_a_later_pass() {
    let config = CatalogConfig {
        incremental_cap: 2,
        ..test_config()
    };
    let h = Harness::new(config, Vec::new());
    h.site.set_catalog("alice", &[&["a", "b", "c"]]);
    h.site.add_films(&["a", "b", "c"]);

    let first = h.service.get_catalog(&CatalogRequest::new("alice")).await.unwrap();
    assert_eq!(urls(&first), film_urls(&["a", "b"]));
    assert!(!h.record("alice").await.unwrap().is_complete);

    h.clock.advance(TTL);
    let second = h.service.get_catalog(&CatalogRequest::new("alice")).await.unwrap();
    assert_eq!(urls(&second), film_urls(&["a", "b", "c"]));
    assert!(h.record("alice").await.unwrap().is_complete);
}

#[tokio::test]
async fn unparseable_film_page_stores_sentinels() {
    let h = Harness::with_records(Vec::new());
    h.site.set_catalog("alice", &[&["mystery"]]);
    h.site.serve(film_url("mystery"), "<html><body><p>nothing here</p></body></html>".to_string());

    let entries = h.service.get_catalog(&CatalogRequest::new("alice")).await.unwrap();

    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].title, UNKNOWN_TITLE);
    assert_eq!(entries[0].directors, vec![UNKNOWN_DIRECTOR.to_string()]);
    assert_eq!(entries[0].poster_url, None);
    assert!(entries[0].has_unknown_title());
}

#[tokio::test]
async fn unreachable_film_is_skipped_and_retried_next_pass() {
    let config = CatalogConfig {
        head_probe_enabled: false,
        ..test_config()
    };
    let h = Harness::new(config, Vec::new());
    h.site.set_catalog("alice", &[&["a", "b"]]);
    h.site.add_film("a");

    let first = h.service.get_catalog(&CatalogRequest::new("alice")).await.unwrap();
    assert_eq!(urls(&first), film_urls(&["a"]));

    h.site.add_film("b");
    h.clock.advance(TTL);
    let second = h.service.get_catalog(&CatalogRequest::new("alice")).await.unwrap();
    assert_eq!(urls(&second), film_urls(&["a", "b"]));
}

#[tokio::test]
async fn skipped_film_is_retried_even_when_the_head_is_unchanged() {
    let h = Harness::with_records(Vec::new());
    h.site.set_catalog("alice", &[&["a", "b", "c"]]);
    h.site.add_films(&["a", "c"]);

    let first = h.service.get_catalog(&CatalogRequest::new("alice")).await.unwrap();
    assert_eq!(urls(&first), film_urls(&["a", "c"]));
    assert!(!h.record("alice").await.unwrap().is_complete);

    h.site.add_film("b");
    h.clock.advance(TTL);
    h.site.reset_requests();
    let second = h.service.get_catalog(&CatalogRequest::new("alice")).await.unwrap();

    assert_eq!(urls(&second), film_urls(&["a", "c", "b"]));
    assert_eq!(h.site.requests_for(&film_url("b")), 1);
    assert_eq!(h.site.film_requests(), 1);
    assert!(h.record("alice").await.unwrap().is_complete);
}

#[tokio::test]
async fn walk_ends_at_the_first_empty_page() {
    let h = Harness::with_records(Vec::new());
    h.site.set_catalog("alice", &[&["a", "b"], &["c"], &[], &["d"]]);
    h.site.add_films(&["a", "b", "c", "d"]);

    let entries = h.service.get_catalog(&CatalogRequest::new("alice")).await.unwrap();

    assert_eq!(urls(&entries), film_urls(&["a", "b", "c"]));
    assert_eq!(h.site.requests_for(&catalog_page_url("alice", 4)), 0);
    assert!(h.record("alice").await.unwrap().is_complete);
}

#[tokio::test]
async fn unreachable_catalog_leaves_the_cache_untouched() {
    let before = cached_record("alice", &["a"], NOW - TTL - 1);
    let h = Harness::with_records(vec![before.clone()]);

    let entries = h.service.get_catalog(&CatalogRequest::new("alice")).await.unwrap();

    assert_eq!(entries, before.entries);
    assert_eq!(h.record("alice").await, Some(before));
}

#[tokio::test]
async fn limit_truncates_the_response_only() {
    let h = Harness::with_records(Vec::new());
    h.site.set_catalog("alice", &[&["a", "b", "c"]]);
    h.site.add_films(&["a", "b", "c"]);

    let entries = h
        .service
        .get_catalog(&CatalogRequest::new("alice").with_limit(2))
        .await
        .unwrap();

    assert_eq!(entries.len(), 2);
    assert_eq!(h.record("alice").await.unwrap().len(), 3);
}

#[tokio::test]
async fn invalid_username_is_rejected_before_any_io() {
    let h = Harness::with_records(Vec::new());

    let err = h.service.get_catalog(&CatalogRequest::new("../admin")).await.unwrap_err();

    assert!(matches!(err, CatalogError::InvalidUsername { .. }));
    assert_eq!(h.site.request_count(), 0);
}

#[tokio::test]
async fn concurrent_requests_for_one_user_rebuild_once() {
    let h = Harness::with_records(Vec::new());
    h.site.set_catalog("alice", &[&["a", "b"]]);
    h.site.add_films(&["a", "b"]);

    let request = CatalogRequest::new("alice");
    let (first, second) = tokio::join!(h.service.get_catalog(&request), h.service.get_catalog(&request));

    assert_eq!(first.unwrap(), second.unwrap());
    assert_eq!(h.site.requests_for(&film_url("a")), 1);
    assert_eq!(h.site.requests_for(&film_url("b")), 1);
}

#[tokio::test]
async fn reviews_are_fetched_when_enabled() {
    let config = CatalogConfig {
        fetch_reviews: true,
        ..test_config()
    };
    let h = Harness::new(config, Vec::new());
    h.site.set_catalog("alice", &[&["heat", "alien"]]);
    h.site.add_films(&["heat", "alien"]);
    h.site.serve(
        format!("{BASE}/alice/film/heat/"),
        r#"<p class="date-links"><a href="/alice/films/diary/for/2024/03/09/">9 Mar</a></p>
           <div class="review body-text"><p>Still the best.</p></div>"#
            .to_string(),
    );

    let entries = h.service.get_catalog(&CatalogRequest::new("alice")).await.unwrap();

    assert_eq!(entries[0].review.as_deref(), Some("Still the best."));
    assert_eq!(entries[0].review_date.as_deref(), Some("2024-03-09"));
    assert_eq!(entries[1].review, None);
    assert_eq!(entries[1].review_url.as_deref(), Some("https://letterboxd.com/alice/film/alien/"));
}

#[tokio::test]
async fn backfill_without_force_keeps_existing_cache() {
    let slugs = ["a", "b", "c", "d", "e", "f", "g", "h", "i", "j"];
    let h = Harness::with_records(vec![cached_record("alice", &slugs, NOW - 10 * TTL)]);
    h.site.set_catalog("alice", &[&["z"]]);

    let status = h.backfill().backfill("alice", false).await;

    assert!(!status.success);
    assert_eq!(status.count, 10);
    assert!(status.message.contains("force=true"));
    assert_eq!(h.site.request_count(), 0);
    assert_eq!(h.record("alice").await.unwrap().len(), 10);
}

#[tokio::test]
async fn forced_backfill_discards_and_rebuilds() {
    let slugs = ["a", "b", "c", "d", "e", "f", "g", "h", "i", "j"];
    let h = Harness::with_records(vec![cached_record("alice", &slugs, NOW)]);
    h.site.set_catalog("alice", &[&["x", "a"], &["y"]]);
    h.site.add_films(&["x", "a", "y"]);

    let status = h.backfill().backfill("alice", true).await;

    assert!(status.success, "{}", status.message);
    assert_eq!(status.count, 3);
    let record = h.record("alice").await.unwrap();
    assert_eq!(urls(&record.entries), film_urls(&["x", "a", "y"]));
    assert_eq!(record.entries[1].title, "Film a");
    assert!(record.is_complete);
}

#[tokio::test]
async fn backfill_ignores_the_incremental_cap() {
    let config = CatalogConfig {
        incremental_cap: 1,
        ..test_config()
    };
    let h = Harness::new(config, Vec::new());
    h.site.set_catalog("alice", &[&["a", "b"], &["c"]]);
    h.site.add_films(&["a", "b", "c"]);

    let status = h.backfill().backfill("alice", false).await;

    assert!(status.success);
    assert_eq!(status.count, 3);
}

#[tokio::test]
async fn backfill_reports_failures_instead_of_raising() {
    let h = Harness::with_records(Vec::new());
    h.site.set_catalog("alice", &[&["a"]]);
    h.site.take_down(&catalog_page_url("alice", 1));

    let status = h.backfill().backfill("alice", false).await;
    assert!(!status.success);
    assert_eq!(status.count, 0);

    let invalid = h.backfill().backfill("", true).await;
    assert!(!invalid.success);
    assert_eq!(invalid.count, 0);
}
