//! HTTP request handlers for the terrain service.

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{
    extract::{rejection::QueryRejection, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use landcover::olc::normalize_query_code;
use landcover::{LocationQuery, TerrainError, TerrainResult};
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use utoipa::{IntoParams, ToSchema};

use crate::AppState;

/// Query parameters for the terrain endpoint.
///
/// Either `ocl` or both `lat` and `long` must be given; `ocl` wins when present.
#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct TerrainQuery {
    /// Latitude in decimal degrees (-90 to 90).
    pub lat: Option<f64>,
    /// Longitude in decimal degrees (-180 to 180).
    pub long: Option<f64>,
    /// Open Location Code. A space may stand in for the `+` separator.
    pub ocl: Option<String>,
}

impl TerrainQuery {
    fn to_location(&self) -> Option<LocationQuery> {
        if let Some(ocl) = self.ocl.as_deref().filter(|s| !s.trim().is_empty()) {
            return Some(LocationQuery::Code(normalize_query_code(ocl)));
        }
        match (self.lat, self.long) {
            (Some(lat), Some(lon)) => Some(LocationQuery::Point { lat, lon }),
            _ => None,
        }
    }
}

/// Successful terrain response.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TerrainResponse {
    /// Location code of the queried cell.
    #[schema(example = "8FQF2222+22")]
    pub location_code: String,
    /// Land-cover descriptions found in the cell.
    pub terrain_types: Vec<String>,
}

impl From<TerrainResult> for TerrainResponse {
    fn from(result: TerrainResult) -> Self {
        Self {
            location_code: result.location_code,
            terrain_types: result.terrain_types,
        }
    }
}

/// Outcome of one code in a batch; exactly one field is set.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BatchItemResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub terrain_types: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Batch outcomes keyed by code, serialized in request order.
#[derive(Debug, Default)]
pub struct BatchResponse(pub Vec<(String, BatchItemResponse)>);

impl Serialize for BatchResponse {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (code, item) in &self.0 {
            map.serialize_entry(code, item)?;
        }
        map.end()
    }
}

/// Error response.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    /// Error message.
    pub error: String,
}

/// Health check response.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// Service status.
    pub status: String,
    /// Service version.
    pub version: String,
}

/// Resolver statistics response.
#[derive(Debug, Serialize, ToSchema)]
pub struct StatsResponse {
    /// Successful resolutions.
    pub resolved: u64,
    /// Failed resolutions.
    pub failed: u64,
    /// Whether the legend has been fetched and cached.
    pub legend_cached: bool,
}

/// Get the terrain types of a location.
///
/// # Returns
///
/// - `200 OK` with the location code and terrain types
/// - `400 Bad Request` if the coordinates or code are invalid or missing
/// - `500 Internal Server Error` if the land-cover service fails
#[utoipa::path(
    get,
    path = "/terrain",
    tag = "terrain",
    params(TerrainQuery),
    responses(
        (status = 200, description = "Terrain types in the location cell", body = TerrainResponse),
        (status = 400, description = "Invalid or missing location", body = ErrorResponse),
        (status = 500, description = "Land-cover service failure", body = ErrorResponse)
    )
)]
#[axum::debug_handler]
pub async fn get_terrain(
    State(state): State<Arc<AppState>>,
    query: Result<Query<TerrainQuery>, QueryRejection>,
) -> impl IntoResponse {
    let query = match query {
        Ok(Query(query)) => query,
        Err(rejection) => {
            tracing::warn!(error = %rejection.body_text(), "Malformed terrain query");
            return bad_request(rejection.body_text());
        }
    };

    tracing::debug!(
        lat = ?query.lat,
        long = ?query.long,
        ocl = ?query.ocl,
        "Terrain query"
    );

    let Some(location) = query.to_location() else {
        return bad_request("Either 'ocl' or both 'lat' and 'long' are required");
    };

    match state.resolver.resolve(&location).await {
        Ok(result) => (StatusCode::OK, Json(TerrainResponse::from(result))).into_response(),
        Err(e) => error_response(e),
    }
}

/// Get the terrain types of several location codes.
///
/// The body is a comma-separated list of codes. Each code is resolved
/// independently; the response maps every code to its terrain types or error,
/// in the order the codes were given. Repeated codes are resolved once.
///
/// # Returns
///
/// - `200 OK` with one entry per distinct code
/// - `400 Bad Request` if the body contains no codes
#[utoipa::path(
    post,
    path = "/terrain",
    tag = "terrain",
    request_body(
        content = String,
        content_type = "text/plain",
        description = "Comma-separated location codes"
    ),
    responses(
        (status = 200, description = "Terrain types or error per code", body = BTreeMap<String, BatchItemResponse>),
        (status = 400, description = "No codes given", body = ErrorResponse)
    )
)]
pub async fn post_terrain(State(state): State<Arc<AppState>>, body: String) -> impl IntoResponse {
    let mut codes: Vec<String> = Vec::new();
    for code in body.split(',').map(normalize_query_code) {
        if !code.is_empty() && !codes.contains(&code) {
            codes.push(code);
        }
    }

    if codes.is_empty() {
        return bad_request("Request body must contain comma-separated location codes");
    }

    tracing::debug!(count = codes.len(), "Batch terrain query");

    let entries = state.resolver.resolve_batch(codes).await;
    let response = BatchResponse(
        entries
            .into_iter()
            .map(|entry| {
                let item = match entry.outcome {
                    Ok(result) => BatchItemResponse {
                        terrain_types: Some(result.terrain_types),
                        error: None,
                    },
                    Err(e) => BatchItemResponse {
                        terrain_types: None,
                        error: Some(e.to_string()),
                    },
                };
                (entry.code, item)
            })
            .collect(),
    );

    (StatusCode::OK, Json(response)).into_response()
}

fn bad_request(message: impl Into<String>) -> axum::response::Response {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
        .into_response()
}

/// Create an error response for terrain queries.
fn error_response(e: TerrainError) -> axum::response::Response {
    let status = if e.is_client_error() {
        StatusCode::BAD_REQUEST
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    };

    (
        status,
        Json(ErrorResponse {
            error: e.to_string(),
        }),
    )
        .into_response()
}

/// Health check endpoint.
///
/// Returns service status and version.
#[utoipa::path(
    get,
    path = "/health",
    tag = "system",
    responses((status = 200, description = "Service is healthy", body = HealthResponse))
)]
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Get resolver statistics.
#[utoipa::path(
    get,
    path = "/stats",
    tag = "system",
    responses((status = 200, description = "Resolver counters", body = StatsResponse))
)]
pub async fn get_stats(State(state): State<Arc<AppState>>) -> Json<StatsResponse> {
    let stats = state.resolver.stats();

    Json(StatsResponse {
        resolved: stats.resolved,
        failed: stats.failed,
        legend_cached: stats.legend_cached,
    })
}
