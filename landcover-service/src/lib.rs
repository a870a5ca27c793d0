//! Landcover Service Library
//!
//! HTTP handlers, router and OpenAPI document for the terrain service.
//! This library is used by both the landcover-service binary and integration tests.

pub mod handlers;

use std::sync::Arc;

use axum::{routing::get, Router};
use landcover::TerrainResolver;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use utoipa::OpenApi;

/// Application state shared across handlers.
pub struct AppState {
    /// Resolver for terrain queries.
    pub resolver: TerrainResolver,
}

/// OpenAPI documentation for the landcover service.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Landcover Terrain Service",
        version = "0.1.0",
        description = "REST API returning CORINE land-cover classes for coordinates and Open Location Codes.",
        license(name = "MIT", url = "https://opensource.org/licenses/MIT")
    ),
    paths(
        handlers::get_terrain,
        handlers::post_terrain,
        handlers::health_check,
        handlers::get_stats,
    ),
    components(
        schemas(
            handlers::TerrainResponse,
            handlers::BatchItemResponse,
            handlers::ErrorResponse,
            handlers::HealthResponse,
            handlers::StatsResponse,
        )
    ),
    tags(
        (name = "terrain", description = "Terrain query endpoints"),
        (name = "system", description = "System and health endpoints")
    )
)]
pub struct ApiDoc;

/// Build the service router with tracing and permissive CORS.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route(
            "/terrain",
            get(handlers::get_terrain).post(handlers::post_terrain),
        )
        .route("/health", get(handlers::health_check))
        .route("/stats", get(handlers::get_stats))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

// Re-export commonly used types for convenience
pub use handlers::{
    BatchItemResponse, BatchResponse, ErrorResponse, HealthResponse, StatsResponse, TerrainQuery,
    TerrainResponse,
};

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::Request, http::StatusCode};
    use landcover::TerrainResolverBuilder;
    use tower::ServiceExt;

    fn test_state() -> Arc<AppState> {
        let resolver = TerrainResolverBuilder::new()
            .service_url("http://127.0.0.1:9/MapServer")
            .max_retries(0)
            .build()
            .unwrap();
        Arc::new(AppState { resolver })
    }

    #[tokio::test]
    async fn test_router_health() {
        let response = router(test_state())
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_router_unknown_route() {
        let response = router(test_state())
            .oneshot(Request::get("/elevation").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_openapi_paths() {
        let doc = ApiDoc::openapi();
        assert!(doc.paths.paths.contains_key("/terrain"));
        assert!(doc.paths.paths.contains_key("/health"));
        assert!(doc.paths.paths.contains_key("/stats"));
    }
}
