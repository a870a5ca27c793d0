//! Landcover Service - HTTP microservice for land-cover terrain queries.
//!
//! Returns the CORINE land-cover classes found at a coordinate or inside an
//! Open Location Code cell.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `LANDCOVER_SERVICE_URL` | ArcGIS MapServer base URL | CORINE CLC2012 |
//! | `LANDCOVER_LAYER_ID` | Layer providing the legend | 0 |
//! | `LANDCOVER_TIMEOUT_SECS` | Per-request timeout | 30 |
//! | `LANDCOVER_MAX_RETRIES` | Extra attempts per request | 2 |
//! | `LANDCOVER_MAX_CONCURRENCY` | Batch codes in flight | 8 |
//! | `LANDCOVER_CODE_LENGTH` | Length of codes encoded from points | 10 |
//! | `LANDCOVER_PORT` | HTTP server port | 8080 |
//! | `RUST_LOG` | Log level (e.g., "info", "debug") | "info" |
//!
//! ## Endpoints
//!
//! - `GET /terrain?lat=X&long=Y` - Terrain types at coordinates
//! - `GET /terrain?ocl=CODE` - Terrain types in a location cell
//! - `POST /terrain` - Batch query with comma-separated codes
//! - `GET /health` - Health check
//! - `GET /stats` - Resolver statistics
//! - `GET /docs` - OpenAPI documentation (Swagger UI)

use std::net::SocketAddr;
use std::sync::Arc;

use landcover::TerrainResolverBuilder;
use landcover_service::{router, ApiDoc, AppState};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "landcover_service=info,landcover=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let port: u16 = std::env::var("LANDCOVER_PORT")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(8080);

    // The library reads the remaining LANDCOVER_* variables
    let builder = TerrainResolverBuilder::from_env();
    let config = builder.arcgis_config().clone();
    let resolver = builder.build()?;

    tracing::info!(
        service_url = %config.service_url,
        layer_id = config.layer_id,
        timeout_secs = config.timeout_secs,
        code_length = resolver.code_length(),
        port = port,
        "Starting landcover service"
    );

    let state = Arc::new(AppState { resolver });

    let app = router(state)
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()));

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;

    tracing::info!("Listening on http://{}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
