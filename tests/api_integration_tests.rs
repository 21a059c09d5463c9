//! Integration Tests for API Endpoints
//!
//! Tests full request/response cycle for each endpoint against a cache
//! backed by local fetchers.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use matchday::{
    api::create_router,
    cache::{RefreshCache, RefreshOptions, StalenessPolicy},
    fetch::{Day, FetchError, Fetcher},
    resource::{details_id, fixtures_id, Cadence, ResourceDescriptor, ResourceId, STANDINGS},
    store::{EnvelopeStore, FileStore, MemoryStore},
    AppState,
};
use serde_json::{json, Value};
use tower::ServiceExt;

// == Test Fetcher ==

#[derive(Default)]
struct LocalFetcher {
    calls: AtomicU64,
    failing: AtomicBool,
    delay_ms: u64,
}

impl LocalFetcher {
    fn calls(&self) -> u64 {
        self.calls.load(Ordering::SeqCst)
    }

    fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

#[async_trait]
impl Fetcher for LocalFetcher {
    async fn fetch(&self, id: &ResourceId) -> Result<Value, FetchError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if self.delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(self.delay_ms)).await;
        }
        if self.failing.load(Ordering::SeqCst) {
            return Err(FetchError::Status(503));
        }
        Ok(json!({ "resource": id.as_str(), "call": call }))
    }
}

// == Helper Functions ==

struct TestApp {
    app: Router,
    today: Arc<LocalFetcher>,
    standings: Arc<LocalFetcher>,
}

fn options() -> RefreshOptions {
    RefreshOptions {
        fetch_timeout: Duration::from_secs(2),
        fetch_attempts: 1,
        retry_delay: Duration::from_millis(1),
        save_timeout: Duration::from_secs(1),
    }
}

fn descriptors(
    today: Arc<LocalFetcher>,
    standings: Arc<LocalFetcher>,
) -> Vec<ResourceDescriptor> {
    let hour = StalenessPolicy::max_age_secs(3600);
    vec![
        ResourceDescriptor::new(
            fixtures_id(Day::Today),
            StalenessPolicy::AlwaysStale,
            Cadence::Frequent,
            today,
        ),
        ResourceDescriptor::new(
            fixtures_id(Day::Yesterday),
            hour,
            Cadence::Frequent,
            Arc::new(LocalFetcher::default()),
        ),
        ResourceDescriptor::new(
            details_id(Day::Today),
            StalenessPolicy::AlwaysStale,
            Cadence::Frequent,
            Arc::new(LocalFetcher {
                delay_ms: 500,
                ..LocalFetcher::default()
            }),
        )
        .with_timeout(Duration::from_millis(50)),
        ResourceDescriptor::new(STANDINGS, hour, Cadence::Infrequent, standings),
    ]
}

fn create_test_app_with_store(store: Arc<dyn EnvelopeStore>) -> (TestApp, Arc<RefreshCache>) {
    let today = Arc::new(LocalFetcher::default());
    let standings = Arc::new(LocalFetcher::default());
    let cache = Arc::new(RefreshCache::new(
        descriptors(today.clone(), standings.clone()),
        store,
        options(),
    ));
    let app = create_router(AppState::from_shared(cache.clone()));
    (
        TestApp {
            app,
            today,
            standings,
        },
        cache,
    )
}

fn create_test_app() -> TestApp {
    create_test_app_with_store(Arc::new(MemoryStore::new())).0
}

async fn body_to_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn get(app: &Router, uri: &str) -> (StatusCode, Value) {
    let response = app
        .clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    (status, body_to_json(response.into_body()).await)
}

async fn post(app: &Router, uri: &str) -> (StatusCode, Value) {
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let status = response.status();
    (status, body_to_json(response.into_body()).await)
}

// == Results Endpoint Tests ==

#[tokio::test]
async fn test_results_returns_envelope() {
    let test = create_test_app();

    let (status, json) = get(&test.app, "/results").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["resource"], "fixtures:today");
    assert_eq!(json["source"], "refreshed");
    assert_eq!(json["stale"], false);
    assert!(json["fetched_at"].as_str().is_some());
    assert!(json.get("error").is_none());
    assert_eq!(json["data"]["resource"], "fixtures:today");
}

#[tokio::test]
async fn test_results_today_is_always_refetched() {
    let test = create_test_app();

    get(&test.app, "/results").await;
    let (_, json) = get(&test.app, "/results/today").await;

    assert_eq!(json["data"]["call"], 2);
    assert_eq!(test.today.calls(), 2);
}

#[tokio::test]
async fn test_results_day_alias() {
    let test = create_test_app();

    let (status, json) = get(&test.app, "/results/ayer").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["resource"], "fixtures:yesterday");

    // Second lookup is answered from memory
    let (_, json) = get(&test.app, "/results/yesterday").await;
    assert_eq!(json["source"], "cached");
}

#[tokio::test]
async fn test_results_unknown_day() {
    let test = create_test_app();

    let (status, json) = get(&test.app, "/results/someday").await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(json["error"].as_str().unwrap().contains("someday"));
}

// == Failure Tests ==

#[tokio::test]
async fn test_stale_served_when_refresh_fails() {
    let test = create_test_app();

    let (_, first) = get(&test.app, "/results").await;
    test.today.set_failing(true);
    let (status, json) = get(&test.app, "/results").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["source"], "stale_on_error");
    assert_eq!(json["stale"], true);
    assert!(json["error"].as_str().unwrap().contains("503"));
    assert_eq!(json["data"], first["data"]);
    assert_eq!(json["fetched_at"], first["fetched_at"]);
}

#[tokio::test]
async fn test_fetch_failure_without_data_is_bad_gateway() {
    let test = create_test_app();
    test.standings.set_failing(true);

    let (status, json) = get(&test.app, "/standings").await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert!(json["error"].as_str().unwrap().contains("standings"));
}

#[tokio::test]
async fn test_timeout_is_gateway_timeout() {
    let test = create_test_app();

    let (status, json) = get(&test.app, "/games").await;

    assert_eq!(status, StatusCode::GATEWAY_TIMEOUT);
    assert!(json["error"].as_str().unwrap().contains("timed out"));
}

#[tokio::test]
async fn test_unregistered_listing_is_not_found() {
    let test = create_test_app();

    let (status, _) = get(&test.app, "/eventos").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

// == Resource Endpoint Tests ==

#[tokio::test]
async fn test_resources_listing() {
    let test = create_test_app();
    get(&test.app, "/standings").await;

    let (status, json) = get(&test.app, "/resources").await;

    assert_eq!(status, StatusCode::OK);
    let resources = json["resources"].as_array().unwrap();
    assert_eq!(resources.len(), 4);

    let standings = resources
        .iter()
        .find(|r| r["resource"] == "standings")
        .unwrap();
    assert_eq!(standings["cadence"], "infrequent");
    assert_eq!(standings["policy"]["kind"], "max_age");
    assert_eq!(standings["policy"]["max_age_secs"], 3600);
    assert_eq!(standings["stale"], false);
    assert_eq!(standings["in_flight"], false);
}

#[tokio::test]
async fn test_resource_by_id() {
    let test = create_test_app();

    let (status, json) = get(&test.app, "/resources/fixtures:yesterday").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["resource"], "fixtures:yesterday");

    let (status, _) = get(&test.app, "/resources/unknown").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_refresh_trigger_in_background() {
    let test = create_test_app();
    get(&test.app, "/standings").await;

    let (status, json) = post(&test.app, "/resources/standings/refresh").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["resource"], "standings");
    assert_eq!(json["started"], true);

    // The background refresh is joined or already done
    let (_, json) = get(&test.app, "/standings").await;
    assert_eq!(json["data"]["call"], 2);
    assert_eq!(test.standings.calls(), 2);
}

#[tokio::test]
async fn test_refresh_trigger_waiting() {
    let test = create_test_app();
    get(&test.app, "/standings").await;

    let (status, json) = post(&test.app, "/resources/standings/refresh?wait=true").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["source"], "refreshed");
    assert_eq!(json["data"]["call"], 2);
}

#[tokio::test]
async fn test_refresh_trigger_waiting_skips_earlier_refresh() {
    let (test, cache) = create_test_app_with_store(Arc::new(MemoryStore::new()));
    assert!(cache.refresh_async("standings").unwrap());

    let (status, json) = post(&test.app, "/resources/standings/refresh?wait=true").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["call"], 2);
    assert_eq!(test.standings.calls(), 2);
}

#[tokio::test]
async fn test_refresh_trigger_unknown_resource() {
    let test = create_test_app();

    let (status, _) = post(&test.app, "/resources/nope/refresh").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

// == Stats / Health Tests ==

#[tokio::test]
async fn test_stats_track_lookups() {
    let test = create_test_app();
    get(&test.app, "/standings").await;
    get(&test.app, "/standings").await;

    let (status, json) = get(&test.app, "/stats").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["hits"], 1);
    assert_eq!(json["misses"], 1);
    assert_eq!(json["refreshes"], 1);
    assert_eq!(json["resources"], 4);
    assert_eq!(json["hit_rate"], 0.5);
}

#[tokio::test]
async fn test_health_endpoint() {
    let test = create_test_app();

    let (status, json) = get(&test.app, "/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["resources"], 4);
    assert!(json.get("timestamp").is_some());
}

// == Persistence Tests ==

#[tokio::test]
async fn test_envelopes_survive_restart() {
    let temp_dir = tempfile::TempDir::new().unwrap();

    let store = Arc::new(FileStore::open(temp_dir.path()).await.unwrap());
    let (first, _) = create_test_app_with_store(store);
    let (_, fetched) = get(&first.app, "/standings").await;
    assert_eq!(first.standings.calls(), 1);

    let store = Arc::new(FileStore::open(temp_dir.path()).await.unwrap());
    let (second, cache) = create_test_app_with_store(store);
    assert_eq!(cache.restore().await, 1);

    let (status, json) = get(&second.app, "/standings").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["source"], "cached");
    assert_eq!(json["data"], fetched["data"]);
    assert_eq!(second.standings.calls(), 0);
}
