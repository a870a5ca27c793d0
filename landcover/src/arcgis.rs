//! ArcGIS MapServer client for land-cover lookups.
//!
//! This module talks to two REST operations of an ArcGIS MapServer that
//! publishes a classified land-cover raster (by default the CORINE Land Cover
//! 2012 Web Mercator service of the European Environment Agency):
//!
//! - **identify**: returns the classification values under a polygon
//! - **layer info**: returns the layer renderer, whose unique value infos form
//!   the legend (value → `"<code>: <description>"` label)
//!
//! It is only available when the `remote` feature is enabled.
//!
//! # Example
//!
//! ```ignore
//! use landcover::arcgis::{ArcGisClient, ArcGisConfig, LandCoverSource};
//!
//! let client = ArcGisClient::new(ArcGisConfig::default().with_timeout(10))?;
//! let legend = client.legend().await?;
//! ```

use std::fmt;
use std::future::Future;
use std::time::Duration;

use reqwest::{Client, Url};
use serde::Deserialize;
use serde_json::Value;

use crate::error::{Result, TerrainError};
use crate::geometry::Polygon;
use crate::projection::PlanarExtent;

/// CORINE Land Cover 2012 MapServer (Web Mercator).
pub const DEFAULT_SERVICE_URL: &str =
    "http://copernicus.discomap.eea.europa.eu/arcgis/rest/services/Corine/CLC2012_WM/MapServer";

/// Default timeout for HTTP requests in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Base delay between retries; attempt `n` waits `n` times this.
const RETRY_DELAY_MS: u64 = 500;

/// A classification value returned by the service.
///
/// ArcGIS reports raster values as numbers or as strings depending on the
/// layer; numeric strings are normalized to [`ClassValue::Code`] so both
/// forms compare equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize)]
#[serde(from = "RawClassValue")]
pub enum ClassValue {
    Code(i64),
    Text(String),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawClassValue {
    Int(i64),
    Float(f64),
    Text(String),
}

impl From<RawClassValue> for ClassValue {
    fn from(raw: RawClassValue) -> Self {
        match raw {
            RawClassValue::Int(v) => ClassValue::Code(v),
            RawClassValue::Float(v) if v.fract() == 0.0 => ClassValue::Code(v as i64),
            RawClassValue::Float(v) => ClassValue::Text(v.to_string()),
            RawClassValue::Text(s) => match s.trim().parse::<i64>() {
                Ok(v) => ClassValue::Code(v),
                Err(_) => ClassValue::Text(s),
            },
        }
    }
}

impl fmt::Display for ClassValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClassValue::Code(v) => write!(f, "{}", v),
            ClassValue::Text(s) => write!(f, "{}", s),
        }
    }
}

/// One legend entry of the layer renderer.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LegendEntry {
    pub value: ClassValue,
    /// Label in the form `"<code>: <description>"`.
    pub label: String,
}

/// The value → label mapping describing a layer's classification schema.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Legend {
    pub entries: Vec<LegendEntry>,
}

impl Legend {
    pub fn new(entries: Vec<LegendEntry>) -> Self {
        Self { entries }
    }

    /// Find the label of the first entry with exactly this value.
    pub fn label_for(&self, value: &ClassValue) -> Option<&str> {
        self.entries
            .iter()
            .find(|entry| &entry.value == value)
            .map(|entry| entry.label.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// A remote source of land-cover classification.
///
/// [`ArcGisClient`] is the production implementation; tests substitute stubs.
pub trait LandCoverSource: Send + Sync {
    /// Classification values intersecting the polygon within the map extent.
    fn identify(
        &self,
        polygon: &Polygon,
        extent: &PlanarExtent,
    ) -> impl Future<Output = Result<Vec<ClassValue>>> + Send;

    /// The layer legend.
    fn legend(&self) -> impl Future<Output = Result<Legend>> + Send;

    /// Key identifying the legend, used for process-wide caching.
    fn legend_key(&self) -> String;
}

/// Configuration of the ArcGIS MapServer queries.
#[derive(Debug, Clone)]
pub struct ArcGisConfig {
    /// MapServer base URL, without a trailing operation.
    pub service_url: String,
    /// Layer whose renderer provides the legend.
    pub layer_id: u32,
    /// Identify tolerance in screen pixels.
    pub tolerance: u32,
    /// Identify `imageDisplay` as `width,height,dpi`.
    pub image_display: String,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
    /// Number of extra attempts after a transport error or 5xx response.
    pub max_retries: u32,
}

impl Default for ArcGisConfig {
    fn default() -> Self {
        Self {
            service_url: DEFAULT_SERVICE_URL.to_string(),
            layer_id: 0,
            tolerance: 2,
            image_display: "10,10,96".to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            max_retries: 2,
        }
    }
}

impl ArcGisConfig {
    /// Create a configuration for another MapServer.
    pub fn with_service_url(service_url: impl Into<String>) -> Self {
        Self {
            service_url: service_url.into(),
            ..Default::default()
        }
    }

    /// Set the legend layer id.
    pub fn with_layer_id(mut self, layer_id: u32) -> Self {
        self.layer_id = layer_id;
        self
    }

    /// Set the request timeout.
    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    /// Set the maximum number of retry attempts.
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    fn base_url(&self) -> &str {
        self.service_url.trim_end_matches('/')
    }
}

/// Outcome of a single HTTP attempt.
enum AttemptError {
    Retryable(TerrainError),
    Fatal(TerrainError),
}

/// Async ArcGIS MapServer client.
pub struct ArcGisClient {
    client: Client,
    config: ArcGisConfig,
}

impl ArcGisClient {
    /// Create a new client with the given configuration.
    pub fn new(config: ArcGisConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| TerrainError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    pub fn config(&self) -> &ArcGisConfig {
        &self.config
    }

    /// Build the identify request URL.
    ///
    /// Query values are percent-encoded, so the extent appears as
    /// `mapExtent=xmin%2Cymin%2Cxmax%2Cymax`.
    pub fn identify_url(&self, polygon: &Polygon, extent: &PlanarExtent) -> Result<Url> {
        let geometry = polygon.to_json()?;
        let mut url = self.parse_url(&format!("{}/identify", self.config.base_url()))?;
        url.query_pairs_mut()
            .append_pair("geometry", &geometry)
            .append_pair("geometryType", "esriGeometryPolygon")
            .append_pair("tolerance", &self.config.tolerance.to_string())
            .append_pair("mapExtent", &extent.to_string())
            .append_pair("imageDisplay", &self.config.image_display)
            .append_pair("returnGeometry", "false")
            .append_pair("f", "pjson");
        Ok(url)
    }

    /// Build the layer info URL.
    pub fn layer_url(&self) -> Result<Url> {
        let mut url = self.parse_url(&format!(
            "{}/{}",
            self.config.base_url(),
            self.config.layer_id
        ))?;
        url.query_pairs_mut().append_pair("f", "json");
        Ok(url)
    }

    fn parse_url(&self, raw: &str) -> Result<Url> {
        Url::parse(raw)
            .map_err(|e| TerrainError::Config(format!("Invalid service URL '{}': {}", raw, e)))
    }

    /// GET a JSON document, retrying transport errors and 5xx responses.
    async fn get_json(&self, url: Url, context: &str) -> Result<Value> {
        let mut last_error = None;
        for attempt in 0..=self.config.max_retries {
            if attempt > 0 {
                // Brief delay before retry
                tokio::time::sleep(Duration::from_millis(RETRY_DELAY_MS * attempt as u64)).await;
            }

            match self.fetch_once(url.clone(), context).await {
                Ok(value) => return Ok(value),
                Err(AttemptError::Fatal(e)) => return Err(e),
                Err(AttemptError::Retryable(e)) => {
                    tracing::debug!(context, attempt, error = %e, "Upstream request failed");
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| TerrainError::upstream(context, "Unknown error")))
    }

    async fn fetch_once(&self, url: Url, context: &str) -> std::result::Result<Value, AttemptError> {
        let response = self.client.get(url).send().await.map_err(|e| {
            let reason = if e.is_timeout() {
                format!("timed out after {}s", self.config.timeout_secs)
            } else {
                format!("request failed: {}", e)
            };
            AttemptError::Retryable(TerrainError::upstream(context, reason))
        })?;

        let status = response.status();
        if status.is_server_error() {
            return Err(AttemptError::Retryable(TerrainError::upstream(
                context,
                format!("HTTP {}", status),
            )));
        }
        if !status.is_success() {
            return Err(AttemptError::Fatal(TerrainError::upstream(
                context,
                format!("HTTP {}", status),
            )));
        }

        response.json::<Value>().await.map_err(|e| {
            AttemptError::Fatal(TerrainError::upstream(
                context,
                format!("malformed JSON: {}", e),
            ))
        })
    }
}

impl LandCoverSource for ArcGisClient {
    async fn identify(&self, polygon: &Polygon, extent: &PlanarExtent) -> Result<Vec<ClassValue>> {
        let url = self.identify_url(polygon, extent)?;
        let body = self.get_json(url, "identify").await?;
        parse_identify(body)
    }

    async fn legend(&self) -> Result<Legend> {
        let url = self.layer_url()?;
        let body = self.get_json(url, "layer info").await?;
        parse_legend(body)
    }

    fn legend_key(&self) -> String {
        format!("{}/{}", self.config.base_url(), self.config.layer_id)
    }
}

#[derive(Deserialize)]
struct IdentifyResponse {
    results: Vec<IdentifyResult>,
}

#[derive(Deserialize)]
struct IdentifyResult {
    value: ClassValue,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LayerInfo {
    drawing_info: DrawingInfo,
}

#[derive(Deserialize)]
struct DrawingInfo {
    renderer: Renderer,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Renderer {
    unique_value_infos: Vec<LegendEntry>,
}

/// Extract classification values from an identify response.
///
/// # Errors
///
/// Returns [`TerrainError::Upstream`] for an ArcGIS error document or when
/// `results[].value` is missing.
pub fn parse_identify(body: Value) -> Result<Vec<ClassValue>> {
    check_service_error(&body, "identify")?;
    let response: IdentifyResponse = serde_json::from_value(body).map_err(|e| {
        TerrainError::upstream("identify", format!("unexpected response shape: {}", e))
    })?;
    Ok(response.results.into_iter().map(|r| r.value).collect())
}

/// Extract the legend from a layer info response.
///
/// # Errors
///
/// Returns [`TerrainError::Upstream`] for an ArcGIS error document or when
/// `drawingInfo.renderer.uniqueValueInfos` is missing.
pub fn parse_legend(body: Value) -> Result<Legend> {
    check_service_error(&body, "layer info")?;
    let info: LayerInfo = serde_json::from_value(body).map_err(|e| {
        TerrainError::upstream("layer info", format!("unexpected response shape: {}", e))
    })?;
    Ok(Legend::new(info.drawing_info.renderer.unique_value_infos))
}

/// ArcGIS reports failures as `{"error": {"code": .., "message": ..}}` with HTTP 200.
fn check_service_error(body: &Value, context: &str) -> Result<()> {
    match body.get("error") {
        Some(error) => {
            let code = error.get("code").and_then(Value::as_i64).unwrap_or_default();
            let message = error
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("unknown service error");
            Err(TerrainError::upstream(
                context,
                format!("service error {}: {}", code, message),
            ))
        }
        None => Ok(()),
    }
}
