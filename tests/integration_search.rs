#![expect(
    clippy::tests_outside_test_module,
    reason = "integration tests are only compiled in test mode"
)]

// End-to-end search: JSON content files on disk, hashing embeddings, the
// ingestion pipeline and the HTTP gateway

use std::path::Path;
use std::sync::Arc;

use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode};
use serde_json::{Value, json};
use tempfile::TempDir;
use tower::ServiceExt;

use portfolio_search::content::{JsonFileSource, PayloadKind, SourceRegistry};
use portfolio_search::embeddings::{EmbeddingProvider, HashingEmbedder};
use portfolio_search::ingest::{IngestSettings, IngestionPipeline};
use portfolio_search::search::{ReadinessState, SearchService, SearchSettings};
use portfolio_search::server::{AppState, create_router};

fn write_site_data(dir: &Path) {
    let blog = json!({
        "posts": [
            {
                "title": "Distributed Caches",
                "excerpt": "Notes on eviction policies, LRU and cache invalidation",
                "slug": "distributed-caches",
                "date": "2024-03-01"
            },
            {
                "title": "Rust Async Patterns",
                "excerpt": "Futures, executors and structured concurrency",
                "slug": "rust-async"
            }
        ]
    });
    let portfolio = json!({
        "categories": ["Web", "Systems"],
        "items": [
            {
                "title": "Weather App",
                "description": "A simple UI project",
                "category": "Web",
                "link": "https://example.com/weather"
            },
            {
                "title": "Alpha Project",
                "description": "Semantic search experiment",
                "category": "Systems"
            }
        ]
    });

    std::fs::write(dir.join("blog.json"), blog.to_string()).expect("should write blog.json");
    std::fs::write(dir.join("portfolio.json"), portfolio.to_string())
        .expect("should write portfolio.json");
    std::fs::write(dir.join("resume.json"), "{ not json").expect("should write resume.json");
}

fn site_registry(dir: &Path) -> SourceRegistry {
    let mut registry = SourceRegistry::from_data_dir(dir);
    registry.register(JsonFileSource::new(
        "resume",
        dir.join("resume.json"),
        PayloadKind::Items,
    ));
    registry
}

async fn get(state: AppState, uri: &str) -> (StatusCode, Value) {
    let response = create_router(state)
        .oneshot(
            Request::builder()
                .uri(uri)
                .body(Body::empty())
                .expect("request should build"),
        )
        .await
        .expect("router should respond");
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body should be readable");
    (
        status,
        serde_json::from_slice(&bytes).expect("body should be JSON"),
    )
}

fn titles(body: &Value) -> Vec<String> {
    body.as_array()
        .expect("results should be an array")
        .iter()
        .map(|r| r["title"].as_str().unwrap_or_default().to_string())
        .collect()
}

async fn ready_service(dir: &TempDir) -> Arc<SearchService> {
    write_site_data(dir.path());
    let embedder: Arc<dyn EmbeddingProvider> = Arc::new(HashingEmbedder::new(384));
    let service = Arc::new(SearchService::new(
        Arc::clone(&embedder),
        SearchSettings::default(),
    ));

    let stats = IngestionPipeline::new(site_registry(dir.path()), embedder, IngestSettings::default())
        .run(&service)
        .await
        .expect("ingestion should succeed");
    assert_eq!(stats.sources_processed, 2);
    assert_eq!(stats.sources_failed, 1);
    assert_eq!(stats.records_indexed, 4);

    service
}

#[tokio::test]
async fn caching_query_prefers_the_caching_post() {
    let dir = TempDir::new().expect("should create temp dir");
    let state = AppState::new(ready_service(&dir).await, 50);

    let (status, body) = get(state, "/api/search?q=caching%20eviction%20strategies").await;
    assert_eq!(status, StatusCode::OK);

    let titles = titles(&body);
    assert_eq!(titles.first().map(String::as_str), Some("Distributed Caches"));
    let caches = titles.iter().position(|t| t == "Distributed Caches");
    let weather = titles.iter().position(|t| t == "Weather App");
    assert!(caches < weather);

    let first = &body[0];
    assert_eq!(first["type"], json!("blog"));
    assert_eq!(first["slug"], json!("distributed-caches"));
}

#[tokio::test]
async fn exact_title_ranks_first_with_metadata() {
    let dir = TempDir::new().expect("should create temp dir");
    let state = AppState::new(ready_service(&dir).await, 50);

    let (_, body) = get(state, "/api/search?q=Alpha%20Project").await;
    let first = &body[0];
    assert_eq!(first["title"], json!("Alpha Project"));
    assert_eq!(first["id"], json!("portfolio-alpha-project"));
    assert_eq!(first["category"], json!("Systems"));
}

#[tokio::test]
async fn results_are_bounded_and_idempotent() {
    let dir = TempDir::new().expect("should create temp dir");
    let service = ready_service(&dir).await;

    let (_, all) = get(
        AppState::new(Arc::clone(&service), 50),
        "/api/search?q=project&limit=50",
    )
    .await;
    assert_eq!(all.as_array().map(Vec::len), Some(4));

    let (_, again) = get(
        AppState::new(Arc::clone(&service), 50),
        "/api/search?q=project&limit=50",
    )
    .await;
    assert_eq!(all, again);

    let (_, two) = get(
        AppState::new(service, 50),
        "/api/search?q=project&limit=2",
    )
    .await;
    assert_eq!(titles(&two), titles(&all)[..2].to_vec());
}

#[tokio::test]
async fn gateway_reports_not_ready_until_ingestion_publishes() {
    let dir = TempDir::new().expect("should create temp dir");
    write_site_data(dir.path());

    let embedder: Arc<dyn EmbeddingProvider> = Arc::new(HashingEmbedder::new(128));
    let service = Arc::new(SearchService::new(
        Arc::clone(&embedder),
        SearchSettings::default(),
    ));
    let state = AppState::new(Arc::clone(&service), 50);

    let (status, body) = get(state.clone(), "/api/search?q=caches").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body, json!({ "error": "Search is not ready yet." }));

    IngestionPipeline::new(site_registry(dir.path()), embedder, IngestSettings::default())
        .spawn(Arc::clone(&service))
        .await
        .expect("ingestion task should not panic")
        .expect("ingestion should succeed");
    assert_eq!(service.readiness(), ReadinessState::Ready);

    let (status, _) = get(state.clone(), "/api/search?q=caches").await;
    assert_eq!(status, StatusCode::OK);

    let (_, status_body) = get(state, "/api/status").await;
    assert_eq!(status_body["state"], json!("ready"));
    assert_eq!(status_body["sources"], json!({ "blog": 2, "portfolio": 2 }));
}
