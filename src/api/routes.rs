//! API Routes
//!
//! Configures the Axum router with all matchday endpoints.

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{
    channels_handler, events_handler, games_handler, games_today_handler, health_handler,
    refresh_handler, resource_handler, resources_handler, results_handler,
    results_today_handler, standings_handler, stats_handler, AppState,
};

/// Creates the main router with all endpoints configured.
///
/// # Endpoints
/// - `GET /results`, `GET /results/:day` - Fixtures and scores of a day
/// - `GET /games`, `GET /games/:day` - Match details of a day
/// - `GET /standings` - League standings and rounds
/// - `GET /channels` (`/canales`) - Streaming channel links
/// - `GET /events` (`/eventos`) - Streamed events
/// - `GET /resources` - State of every resource
/// - `GET /resources/:id` - Any resource by id
/// - `POST /resources/:id/refresh` - Invalidate and refresh a resource
/// - `GET /stats` - Cache statistics
/// - `GET /health` - Health check endpoint
///
/// # Middleware
/// - CORS: Allows any origin (the frontend is served elsewhere)
/// - Tracing: Logs all requests for debugging
pub fn create_router(state: AppState) -> Router {
    // Configure CORS middleware
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Build router with all endpoints
    Router::new()
        .route("/results", get(results_today_handler))
        .route("/results/:day", get(results_handler))
        .route("/games", get(games_today_handler))
        .route("/games/:day", get(games_handler))
        .route("/standings", get(standings_handler))
        .route("/channels", get(channels_handler))
        .route("/canales", get(channels_handler))
        .route("/events", get(events_handler))
        .route("/eventos", get(events_handler))
        .route("/resources", get(resources_handler))
        .route("/resources/:id", get(resource_handler))
        .route("/resources/:id/refresh", post(refresh_handler))
        .route("/stats", get(stats_handler))
        .route("/health", get(health_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{RefreshCache, RefreshOptions, StalenessPolicy};
    use crate::fetch::{FetchError, Fetcher};
    use crate::resource::{Cadence, ResourceDescriptor, ResourceId, CHANNELS};
    use crate::store::MemoryStore;
    use async_trait::async_trait;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use serde_json::{json, Value};
    use std::sync::Arc;
    use tower::util::ServiceExt;

    struct StaticFetcher;

    #[async_trait]
    impl Fetcher for StaticFetcher {
        async fn fetch(&self, _id: &ResourceId) -> Result<Value, FetchError> {
            Ok(json!({ "canal-1": "https://example.com/1" }))
        }
    }

    fn create_test_app() -> Router {
        let descriptor = ResourceDescriptor::new(
            CHANNELS,
            StalenessPolicy::max_age_secs(300),
            Cadence::Infrequent,
            Arc::new(StaticFetcher),
        );
        let cache = RefreshCache::new(
            vec![descriptor],
            Arc::new(MemoryStore::new()),
            RefreshOptions::default(),
        );
        create_router(AppState::new(cache))
    }

    async fn status_of(uri: &str) -> StatusCode {
        create_test_app()
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap()
            .status()
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        assert_eq!(status_of("/health").await, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_stats_endpoint() {
        assert_eq!(status_of("/stats").await, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_channel_aliases() {
        assert_eq!(status_of("/channels").await, StatusCode::OK);
        assert_eq!(status_of("/canales").await, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_unregistered_resource_not_found() {
        assert_eq!(status_of("/standings").await, StatusCode::NOT_FOUND);
        assert_eq!(status_of("/resources/nope").await, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_refresh_requires_post() {
        assert_eq!(
            status_of("/resources/channels/refresh").await,
            StatusCode::METHOD_NOT_ALLOWED
        );
    }
}
