use std::sync::Arc;
use std::time::Duration;

use agrigrant::cache::{CacheError, CacheKey, MemoryQueryCache, QueryCache};
use agrigrant::config::Config;
use agrigrant::db::Store;
use agrigrant::models::farmer::NewFarmer;
use agrigrant::models::grant::NewGrantApplication;
use agrigrant::state::SharedState;
use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode},
};
use http_body_util::BodyExt;
use sea_orm::ConnectionTrait;
use serde_json::Value;
use tower::ServiceExt;

fn test_config() -> Config {
    let db_path = std::env::temp_dir().join(format!("agrigrant-api-{}.db", uuid::Uuid::new_v4()));

    let mut config = Config::default();
    config.general.database_path = format!("sqlite:{}?mode=rwc", db_path.display());
    config.search_index.path = None;
    config.sync.enabled = false;
    config
}

async fn spawn_app() -> (Router, Arc<SharedState>) {
    let shared = Arc::new(
        SharedState::new(test_config())
            .await
            .expect("Failed to create shared state"),
    );

    shared
        .store
        .add_farmer(&NewFarmer {
            name: "Tan".to_string(),
            email: "tan@example.com".to_string(),
            phone: Some("+65 6123 4567".to_string()),
            farm_location: "Lim Chu Kang".to_string(),
            farm_size: Some("small".to_string()),
            crop_types: Some(vec!["leafy greens".to_string()]),
        })
        .await
        .expect("Failed to seed farmer");

    let state = agrigrant::api::create_app_state(Arc::clone(&shared), None);
    (agrigrant::api::router(state), shared)
}

/// Builds the router around a caller-supplied cache, without seeding.
async fn app_with_cache(cache: Arc<dyn QueryCache>) -> (Router, Store) {
    let config = test_config();
    let store = Store::new(&config.general.database_path)
        .await
        .expect("Failed to open store");

    let shared = Arc::new(SharedState::from_parts(config, store.clone(), cache, None));
    let state = agrigrant::api::create_app_state(shared, None);
    (agrigrant::api::router(state), store)
}

struct UnreachableCache;

#[async_trait::async_trait]
impl QueryCache for UnreachableCache {
    async fn get(&self, _key: &CacheKey) -> Result<Option<String>, CacheError> {
        Err(CacheError::Unreachable("connection refused".to_string()))
    }

    async fn set(&self, _key: &CacheKey, _value: String, _ttl: Duration) -> Result<(), CacheError> {
        Err(CacheError::Unreachable("connection refused".to_string()))
    }

    async fn ping(&self) -> Result<(), CacheError> {
        Err(CacheError::Unreachable("connection refused".to_string()))
    }

    fn backend_name(&self) -> &'static str {
        "unreachable"
    }
}

async fn send(app: &Router, method: Method, uri: &str) -> (StatusCode, Value) {
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method(method)
                .uri(uri)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json = serde_json::from_slice(&body).unwrap_or(Value::Null);
    (status, json)
}

async fn get(app: &Router, uri: &str) -> (StatusCode, Value) {
    send(app, Method::GET, uri).await
}

#[tokio::test]
async fn test_farmer_search_by_location() {
    let (app, _) = spawn_app().await;

    let (status, body) =
        get(&app, "/api/search/farmers?location=Lim+Chu+Kang&page=1&limit=20").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["farmers"].as_array().unwrap().len(), 1);
    assert_eq!(body["farmers"][0]["name"], "Tan");
    assert_eq!(body["farmers"][0]["crop_types"][0], "leafy greens");
    assert_eq!(
        body["pagination"],
        serde_json::json!({"page": 1, "limit": 20, "total": 1, "pages": 1})
    );
}

#[tokio::test]
async fn test_farmer_search_without_matches() {
    let (app, _) = spawn_app().await;

    let (status, body) = get(&app, "/api/search/farmers?location=Kranji").await;

    assert_eq!(status, StatusCode::OK);
    assert!(body["farmers"].as_array().unwrap().is_empty());
    assert_eq!(body["pagination"]["total"], 0);
    assert_eq!(body["pagination"]["pages"], 0);
}

#[tokio::test]
async fn test_unknown_params_are_ignored() {
    let (app, _) = spawn_app().await;

    let (_, plain) = get(&app, "/api/search/farmers?location=Lim+Chu+Kang").await;
    let (status, noisy) = get(
        &app,
        "/api/search/farmers?location=Lim+Chu+Kang&utm_source=mail&_=1",
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(plain, noisy);
}

#[tokio::test]
async fn test_autocomplete_after_resync() {
    let (app, _) = spawn_app().await;

    let (status, body) = send(&app, Method::POST, "/api/search/resync").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["report"]["total"], 1);
    assert_eq!(body["report"]["indexed"], 1);

    let (status, body) = get(&app, "/api/search/autocomplete?q=li&type=all").await;
    assert_eq!(status, StatusCode::OK);

    let suggestions = body["suggestions"].as_array().unwrap();
    let lim_chu_kang = suggestions
        .iter()
        .find(|s| s["text"] == "Lim Chu Kang")
        .expect("Lim Chu Kang should be suggested");
    assert!(lim_chu_kang["score"].as_f64().unwrap() > 0.0);
}

#[tokio::test]
async fn test_autocomplete_short_prefix_is_empty() {
    let (app, _) = spawn_app().await;

    let (status, body) = get(&app, "/api/search/autocomplete?q=l").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, serde_json::json!({"success": true, "suggestions": []}));
}

#[tokio::test]
async fn test_validation_errors() {
    let (app, _) = spawn_app().await;

    for uri in [
        "/api/search/farmers?page=0",
        "/api/search/farmers?limit=abc",
        "/api/search/grants?status=lost",
        "/api/search/autocomplete?q=li&type=email",
        "/api/search/suggestions?type=size&q=ka",
        "/api/search/farmers?page=1000000000000000000&limit=100",
        "/api/search/grants?page=18446744073709551615",
        "/api/search/farmers?q=a&q=b",
    ] {
        let (status, body) = get(&app, uri).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
        assert_eq!(body["success"], false, "{uri}");
        assert!(body["message"].as_str().is_some(), "{uri}");
    }
}

#[tokio::test]
async fn test_suggestions_by_kind() {
    let (app, _) = spawn_app().await;

    let (status, body) = get(&app, "/api/search/suggestions?type=crop&q=leafy").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["suggestions"], serde_json::json!(["leafy greens"]));

    let (status, body) = get(&app, "/api/search/suggestions?type=location&q=chu").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["suggestions"], serde_json::json!(["Lim Chu Kang"]));

    let (status, body) = get(&app, "/api/search/suggestions?q=leafy").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["suggestions"], serde_json::json!([]));
}

#[tokio::test]
async fn test_grant_search_joins_farmer() {
    let (app, shared) = spawn_app().await;
    let farmer_id = shared.store.list_all_farmers().await.unwrap()[0].id;

    shared
        .store
        .add_grant_application(&NewGrantApplication {
            farmer_id,
            grant_type: "equipment".to_string(),
            amount_requested: 12_500.0,
            purpose: "Hydroponic racks".to_string(),
            documents: vec!["quote.pdf".to_string()],
        })
        .await
        .unwrap();

    let (status, body) = get(&app, "/api/search/grants?q=hydroponic&status=pending").await;

    assert_eq!(status, StatusCode::OK);
    let grants = body["grants"].as_array().unwrap();
    assert_eq!(grants.len(), 1);
    assert_eq!(grants[0]["farmer_name"], "Tan");
    assert_eq!(grants[0]["farmer_email"], "tan@example.com");
    assert_eq!(grants[0]["documents"][0], "quote.pdf");
    assert_eq!(body["pagination"]["total"], 1);

    let (_, body) = get(&app, "/api/search/grants?status=approved").await;
    assert!(body["grants"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_health() {
    let (app, _) = spawn_app().await;

    let (status, body) = get(&app, "/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["service"], agrigrant::api::SERVICE_NAME);
    assert_eq!(body["checks"]["database"]["status"], "healthy");
    assert_eq!(body["checks"]["cache"]["status"], "healthy");
    assert_eq!(body["checks"]["search_index"]["status"], "healthy");
}

#[tokio::test]
async fn test_store_failure_is_a_generic_error() {
    let cache = Arc::new(MemoryQueryCache::new());
    let (app, store) = app_with_cache(cache.clone()).await;

    store
        .conn
        .execute_unprepared("DROP TABLE grant_applications")
        .await
        .unwrap();
    store
        .conn
        .execute_unprepared("DROP TABLE farmers")
        .await
        .unwrap();

    let (status, body) = get(&app, "/api/search/farmers?location=Kranji").await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        body,
        serde_json::json!({"success": false, "message": "Search failed"})
    );
    assert!(cache.is_empty());
}

#[tokio::test]
async fn test_health_reports_unreachable_cache() {
    let (app, _) = app_with_cache(Arc::new(UnreachableCache)).await;

    let (status, body) = get(&app, "/health").await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["status"], "unhealthy");
    assert_eq!(body["checks"]["database"]["status"], "healthy");
    assert_eq!(body["checks"]["cache"]["status"], "unhealthy");
    assert_eq!(body["checks"]["search_index"]["status"], "disabled");
}

#[tokio::test]
async fn test_unreachable_cache_still_answers_searches() {
    let (app, _) = app_with_cache(Arc::new(UnreachableCache)).await;

    let (status, body) = get(&app, "/api/search/farmers").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["pagination"]["total"], 0);
}
