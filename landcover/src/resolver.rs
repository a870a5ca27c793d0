//! Terrain resolution with a shared legend cache.
//!
//! This module provides [`TerrainResolver`], which turns a coordinate or a
//! location code into the land-cover labels found in its cell:
//!
//! 1. encode the point (or take the code as given)
//! 2. decode the cell, project it and build the identify polygon
//! 3. query identify and the (cached) legend concurrently
//! 4. map each classification value to the description part of its label
//!
//! The legend describes a fixed classification schema, so it is fetched once
//! per process and shared by every resolution. Concurrent callers wait on the
//! same in-flight fetch; a failed fetch is not cached.
//!
//! It is only available when the `remote` feature is enabled.
//!
//! ```ignore
//! use landcover::{LocationQuery, TerrainResolverBuilder};
//!
//! let resolver = TerrainResolverBuilder::from_env().build()?;
//! let result = resolver
//!     .resolve(&LocationQuery::Point { lat: 45.0, lon: 9.0 })
//!     .await?;
//! println!("{}: {:?}", result.location_code, result.terrain_types);
//! ```

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use moka::future::Cache;
use serde::Serialize;
use tokio::sync::Semaphore;

use crate::arcgis::{ArcGisClient, ArcGisConfig, ClassValue, LandCoverSource, Legend};
use crate::error::{Result, TerrainError};
use crate::geometry::build_polygon;
use crate::olc::{self, DEFAULT_CODE_LENGTH};
use crate::projection::PlanarExtent;

/// Default number of batch codes resolved concurrently.
pub const DEFAULT_MAX_CONCURRENCY: usize = 8;

/// What to resolve: a raw coordinate or an existing location code.
#[derive(Debug, Clone, PartialEq)]
pub enum LocationQuery {
    Point { lat: f64, lon: f64 },
    Code(String),
}

/// Terrain labels found in a location cell.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TerrainResult {
    pub location_code: String,
    pub terrain_types: Vec<String>,
}

/// Outcome of one code in a batch.
#[derive(Debug, Clone)]
pub struct BatchEntry {
    pub code: String,
    pub outcome: Result<TerrainResult>,
}

/// Counters describing resolver activity.
#[derive(Debug, Clone, Default)]
pub struct ResolverStats {
    /// Resolutions that produced a result.
    pub resolved: u64,
    /// Resolutions that failed, for any reason.
    pub failed: u64,
    /// Whether the legend has been fetched and cached.
    pub legend_cached: bool,
}

/// Resolves land-cover terrain types for locations.
pub struct TerrainResolver<S = ArcGisClient> {
    source: S,
    /// Legends keyed by [`LandCoverSource::legend_key`]; entries never expire.
    legend_cache: Cache<String, Arc<Legend>>,
    /// Length of codes produced for point queries.
    code_length: usize,
    /// Bounds the number of batch codes in flight.
    batch_limit: Semaphore,
    resolved_count: AtomicU64,
    failed_count: AtomicU64,
}

impl<S: LandCoverSource> TerrainResolver<S> {
    /// Create a resolver with default code length and batch concurrency.
    pub fn new(source: S) -> Self {
        Self::with_options(source, DEFAULT_CODE_LENGTH, DEFAULT_MAX_CONCURRENCY)
    }

    /// Create a resolver with explicit options.
    ///
    /// `max_concurrency` is raised to 1 if zero. The code length is not
    /// checked here; invalid lengths fail every point query with
    /// [`TerrainError::InvalidInput`]. Use [`TerrainResolverBuilder`] for
    /// up-front validation.
    pub fn with_options(source: S, code_length: usize, max_concurrency: usize) -> Self {
        Self {
            source,
            legend_cache: Cache::builder().max_capacity(16).build(),
            code_length,
            batch_limit: Semaphore::new(max_concurrency.max(1)),
            resolved_count: AtomicU64::new(0),
            failed_count: AtomicU64::new(0),
        }
    }

    /// The underlying land-cover source.
    pub fn source(&self) -> &S {
        &self.source
    }

    /// Code length used when encoding point queries.
    pub fn code_length(&self) -> usize {
        self.code_length
    }

    /// Resolve the terrain types of a single location.
    ///
    /// # Errors
    ///
    /// - [`TerrainError::InvalidInput`] for out-of-range coordinates or a cell
    ///   touching a pole
    /// - [`TerrainError::InvalidCode`] for a malformed code
    /// - [`TerrainError::Upstream`] if either remote call fails
    pub async fn resolve(&self, query: &LocationQuery) -> Result<TerrainResult> {
        let outcome = match query {
            LocationQuery::Point { lat, lon } => {
                match olc::encode_with_length(*lat, *lon, self.code_length) {
                    Ok(code) => self.resolve_code(&code).await,
                    Err(e) => Err(e),
                }
            }
            LocationQuery::Code(code) => self.resolve_code(code).await,
        };

        match &outcome {
            Ok(result) => {
                self.resolved_count.fetch_add(1, Ordering::Relaxed);
                tracing::info!(
                    code = %result.location_code,
                    terrain_types = result.terrain_types.len(),
                    "Terrain resolved"
                );
            }
            Err(e) => {
                self.failed_count.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(query = ?query, error = %e, "Terrain resolution failed");
            }
        }
        outcome
    }

    async fn resolve_code(&self, code: &str) -> Result<TerrainResult> {
        let cell = olc::decode(code)?;
        let extent = PlanarExtent::from_cell(&cell)?;
        let polygon = build_polygon(&extent);

        tracing::debug!(code, extent = %extent, "Querying land cover");

        let (values, legend) =
            tokio::try_join!(self.source.identify(&polygon, &extent), self.legend())?;

        Ok(TerrainResult {
            location_code: code.to_string(),
            terrain_types: terrain_types(&values, &legend),
        })
    }

    /// Resolve a batch of codes.
    ///
    /// Entries come back in input order. Each code is resolved independently:
    /// a failing code is reported in its own entry and does not affect the
    /// others. At most `max_concurrency` codes are in flight at once.
    pub async fn resolve_batch<I, T>(&self, codes: I) -> Vec<BatchEntry>
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        let tasks = codes.into_iter().map(|code| {
            let code: String = code.into();
            async move {
                let outcome = match self.batch_limit.acquire().await {
                    Ok(_permit) => self.resolve(&LocationQuery::Code(code.clone())).await,
                    Err(e) => Err(TerrainError::upstream("batch", e)),
                };
                BatchEntry { code, outcome }
            }
        });

        futures::future::join_all(tasks).await
    }

    /// The legend, fetched on first use and cached for the life of the resolver.
    pub async fn legend(&self) -> Result<Arc<Legend>> {
        let key = self.source.legend_key();
        self.legend_cache
            .try_get_with(key, async {
                tracing::info!("Fetching land cover legend");
                let legend = self.source.legend().await?;
                tracing::info!(entries = legend.len(), "Legend cached");
                Ok::<_, TerrainError>(Arc::new(legend))
            })
            .await
            .map_err(|e| (*e).clone())
    }

    /// Get resolver statistics.
    pub fn stats(&self) -> ResolverStats {
        ResolverStats {
            resolved: self.resolved_count.load(Ordering::Relaxed),
            failed: self.failed_count.load(Ordering::Relaxed),
            legend_cached: self.legend_cache.contains_key(&self.source.legend_key()),
        }
    }
}

/// Map classification values to label descriptions.
///
/// Values are visited in response order and repeated values are skipped.
/// Values without a legend entry are dropped.
///
/// # Example
///
/// ```ignore
/// // legend: 111 => "111: Continuous urban fabric"
/// assert_eq!(terrain_types(&[ClassValue::Code(111)], &legend), ["Continuous urban fabric"]);
/// ```
pub fn terrain_types(values: &[ClassValue], legend: &Legend) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut labels = Vec::new();

    for value in values {
        if !seen.insert(value) {
            continue;
        }
        match legend.label_for(value) {
            Some(label) => labels.push(label_description(label).to_string()),
            None => tracing::debug!(value = %value, "No legend entry for value"),
        }
    }
    labels
}

/// The description part of a `"<code>: <description>"` label.
fn label_description(label: &str) -> &str {
    label
        .split_once(':')
        .map(|(_, description)| description)
        .unwrap_or(label)
        .trim()
}

/// Builder for [`TerrainResolver`] backed by an [`ArcGisClient`].
///
/// # Example
///
/// ```ignore
/// use landcover::TerrainResolverBuilder;
///
/// let resolver = TerrainResolverBuilder::new()
///     .service_url("https://example.com/arcgis/rest/services/LandCover/MapServer")
///     .timeout(10)
///     .max_concurrency(4)
///     .build()?;
/// ```
#[derive(Debug, Clone)]
pub struct TerrainResolverBuilder {
    config: ArcGisConfig,
    code_length: usize,
    max_concurrency: usize,
}

impl Default for TerrainResolverBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TerrainResolverBuilder {
    /// Create a builder for the default CORINE service.
    pub fn new() -> Self {
        Self {
            config: ArcGisConfig::default(),
            code_length: DEFAULT_CODE_LENGTH,
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
        }
    }

    /// Create a builder configured from environment variables.
    ///
    /// # Environment Variables
    ///
    /// | Variable | Description | Default |
    /// |----------|-------------|---------|
    /// | `LANDCOVER_SERVICE_URL` | ArcGIS MapServer base URL | CORINE CLC2012 |
    /// | `LANDCOVER_LAYER_ID` | Layer providing the legend | 0 |
    /// | `LANDCOVER_TIMEOUT_SECS` | Per-request timeout | 30 |
    /// | `LANDCOVER_MAX_RETRIES` | Extra attempts per request | 2 |
    /// | `LANDCOVER_MAX_CONCURRENCY` | Batch codes in flight | 8 |
    /// | `LANDCOVER_CODE_LENGTH` | Length of codes encoded from points | 10 |
    ///
    /// Unset or unparsable numeric values keep their defaults.
    pub fn from_env() -> Self {
        let mut builder = Self::new();

        if let Ok(url) = std::env::var("LANDCOVER_SERVICE_URL") {
            builder.config.service_url = url;
        }
        if let Some(layer_id) = env_parse("LANDCOVER_LAYER_ID") {
            builder.config.layer_id = layer_id;
        }
        if let Some(timeout) = env_parse("LANDCOVER_TIMEOUT_SECS") {
            builder.config.timeout_secs = timeout;
        }
        if let Some(retries) = env_parse("LANDCOVER_MAX_RETRIES") {
            builder.config.max_retries = retries;
        }
        if let Some(concurrency) = env_parse("LANDCOVER_MAX_CONCURRENCY") {
            builder.max_concurrency = concurrency;
        }
        if let Some(length) = env_parse("LANDCOVER_CODE_LENGTH") {
            builder.code_length = length;
        }

        builder
    }

    /// Set the MapServer base URL.
    pub fn service_url(mut self, url: impl Into<String>) -> Self {
        self.config.service_url = url.into();
        self
    }

    /// Set the layer whose renderer provides the legend.
    pub fn layer_id(mut self, layer_id: u32) -> Self {
        self.config.layer_id = layer_id;
        self
    }

    /// Set the per-request timeout in seconds.
    pub fn timeout(mut self, timeout_secs: u64) -> Self {
        self.config.timeout_secs = timeout_secs;
        self
    }

    /// Set the number of retries after transport errors and 5xx responses.
    pub fn max_retries(mut self, max_retries: u32) -> Self {
        self.config.max_retries = max_retries;
        self
    }

    /// Set the number of batch codes resolved concurrently.
    pub fn max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = max_concurrency;
        self
    }

    /// Set the length of codes produced for point queries.
    pub fn code_length(mut self, code_length: usize) -> Self {
        self.code_length = code_length;
        self
    }

    /// The ArcGIS configuration that will be used.
    pub fn arcgis_config(&self) -> &ArcGisConfig {
        &self.config
    }

    /// Build the [`TerrainResolver`].
    ///
    /// # Errors
    ///
    /// Returns [`TerrainError::Config`] if the code length or concurrency is
    /// unusable, or the HTTP client cannot be created.
    pub fn build(self) -> Result<TerrainResolver<ArcGisClient>> {
        if !olc::is_valid_length(self.code_length) {
            return Err(TerrainError::Config(format!(
                "code length {} is not a valid Open Location Code length",
                self.code_length
            )));
        }
        if self.max_concurrency == 0 {
            return Err(TerrainError::Config(
                "max concurrency must be at least 1".to_string(),
            ));
        }

        let client = ArcGisClient::new(self.config)?;
        Ok(TerrainResolver::with_options(
            client,
            self.code_length,
            self.max_concurrency,
        ))
    }
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|s| s.trim().parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arcgis::LegendEntry;
    use crate::geometry::Polygon;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    fn entry(value: i64, label: &str) -> LegendEntry {
        LegendEntry {
            value: ClassValue::Code(value),
            label: label.to_string(),
        }
    }

    fn corine_legend() -> Legend {
        Legend::new(vec![
            entry(111, "111: Urban fabric"),
            entry(211, "211: Non-irrigated arable land"),
            entry(311, "311: Broad-leaved forest"),
            entry(512, "512: Water bodies"),
        ])
    }

    /// Stub source: identify fails for cells in the western hemisphere.
    struct StubSource {
        values: Vec<ClassValue>,
        legend: Result<Legend>,
        legend_delay: Duration,
        identify_calls: AtomicUsize,
        legend_calls: AtomicUsize,
    }

    impl StubSource {
        fn new(values: Vec<ClassValue>) -> Self {
            Self {
                values,
                legend: Ok(corine_legend()),
                legend_delay: Duration::ZERO,
                identify_calls: AtomicUsize::new(0),
                legend_calls: AtomicUsize::new(0),
            }
        }
    }

    impl LandCoverSource for StubSource {
        async fn identify(
            &self,
            _polygon: &Polygon,
            extent: &PlanarExtent,
        ) -> Result<Vec<ClassValue>> {
            self.identify_calls.fetch_add(1, Ordering::SeqCst);
            if extent.xmin < 0.0 {
                return Err(TerrainError::upstream("identify", "HTTP 503"));
            }
            Ok(self.values.clone())
        }

        async fn legend(&self) -> Result<Legend> {
            self.legend_calls.fetch_add(1, Ordering::SeqCst);
            if !self.legend_delay.is_zero() {
                tokio::time::sleep(self.legend_delay).await;
            }
            self.legend.clone()
        }

        fn legend_key(&self) -> String {
            "stub/0".to_string()
        }
    }

    #[test]
    fn test_label_description() {
        assert_eq!(label_description("111: Urban fabric"), "Urban fabric");
        assert_eq!(label_description("111:Urban fabric "), "Urban fabric");
        assert_eq!(label_description("111: Ratio: 1:2"), "Ratio: 1:2");
        assert_eq!(label_description("Unlabelled"), "Unlabelled");
    }

    #[test]
    fn test_terrain_types_order_and_duplicates() {
        let values = vec![
            ClassValue::Code(311),
            ClassValue::Code(111),
            ClassValue::Code(311),
            ClassValue::Code(999),
        ];
        assert_eq!(
            terrain_types(&values, &corine_legend()),
            vec!["Broad-leaved forest", "Urban fabric"]
        );
    }

    #[test]
    fn test_terrain_types_empty() {
        assert!(terrain_types(&[], &corine_legend()).is_empty());
        assert!(terrain_types(&[ClassValue::Code(111)], &Legend::default()).is_empty());
    }

    #[tokio::test]
    async fn test_resolve_point() {
        let resolver = TerrainResolver::new(StubSource::new(vec![ClassValue::Code(111)]));

        let result = resolver
            .resolve(&LocationQuery::Point { lat: 45.0, lon: 9.0 })
            .await
            .unwrap();

        assert_eq!(result.location_code, "8FQF2222+22");
        assert_eq!(result.terrain_types, vec!["Urban fabric"]);
    }

    #[tokio::test]
    async fn test_resolve_code() {
        let resolver = TerrainResolver::new(StubSource::new(vec![
            ClassValue::Code(211),
            ClassValue::Code(512),
        ]));

        let result = resolver
            .resolve(&LocationQuery::Code("8FQF2222+22".to_string()))
            .await
            .unwrap();

        assert_eq!(result.location_code, "8FQF2222+22");
        assert_eq!(
            result.terrain_types,
            vec!["Non-irrigated arable land", "Water bodies"]
        );
    }

    #[tokio::test]
    async fn test_resolve_with_custom_code_length() {
        let resolver =
            TerrainResolver::with_options(StubSource::new(vec![ClassValue::Code(111)]), 8, 2);

        let result = resolver
            .resolve(&LocationQuery::Point { lat: 1.2, lon: 3.4 })
            .await
            .unwrap();
        assert_eq!(result.location_code, "6FH56C22+");
    }

    #[tokio::test]
    async fn test_invalid_input_skips_network() {
        let resolver = TerrainResolver::new(StubSource::new(vec![]));

        let err = resolver
            .resolve(&LocationQuery::Point { lat: 95.0, lon: 9.0 })
            .await
            .unwrap_err();
        assert!(matches!(err, TerrainError::InvalidInput { .. }));

        let err = resolver
            .resolve(&LocationQuery::Code("8FQF2222".to_string()))
            .await
            .unwrap_err();
        assert!(matches!(err, TerrainError::InvalidCode { .. }));

        assert_eq!(resolver.source().identify_calls.load(Ordering::SeqCst), 0);
        assert_eq!(resolver.source().legend_calls.load(Ordering::SeqCst), 0);
        assert_eq!(resolver.stats().failed, 2);
    }

    #[tokio::test]
    async fn test_upstream_failure() {
        let resolver = TerrainResolver::new(StubSource::new(vec![ClassValue::Code(111)]));

        // Western hemisphere cell, the stub fails identify
        let code = olc::encode(45.0, -9.0).unwrap();
        let err = resolver
            .resolve(&LocationQuery::Code(code))
            .await
            .unwrap_err();
        assert!(matches!(err, TerrainError::Upstream { .. }));
    }

    #[tokio::test]
    async fn test_legend_failure_not_cached() {
        let mut source = StubSource::new(vec![ClassValue::Code(111)]);
        source.legend = Err(TerrainError::upstream("layer info", "HTTP 502"));
        let resolver = TerrainResolver::new(source);

        for _ in 0..2 {
            let err = resolver
                .resolve(&LocationQuery::Code("8FQF2222+22".to_string()))
                .await
                .unwrap_err();
            assert!(err.to_string().contains("502"));
        }
        assert_eq!(resolver.source().legend_calls.load(Ordering::SeqCst), 2);
        assert!(!resolver.stats().legend_cached);
    }

    #[tokio::test]
    async fn test_legend_fetched_once() {
        let mut source = StubSource::new(vec![ClassValue::Code(111)]);
        source.legend_delay = Duration::from_millis(50);
        let resolver = TerrainResolver::new(source);

        let queries: Vec<_> = (0..8)
            .map(|_| resolver.resolve(&LocationQuery::Point { lat: 45.0, lon: 9.0 }))
            .collect();
        let results = futures::future::join_all(queries).await;

        assert!(results.iter().all(|r| r.is_ok()));
        assert_eq!(resolver.source().legend_calls.load(Ordering::SeqCst), 1);
        assert_eq!(resolver.source().identify_calls.load(Ordering::SeqCst), 8);

        // Later resolutions reuse the cached legend
        resolver
            .resolve(&LocationQuery::Code("8FQF2222+22".to_string()))
            .await
            .unwrap();
        assert_eq!(resolver.source().legend_calls.load(Ordering::SeqCst), 1);
        assert!(resolver.stats().legend_cached);
    }

    #[tokio::test]
    async fn test_resolve_batch_isolates_failures() {
        let resolver = TerrainResolver::new(StubSource::new(vec![ClassValue::Code(111)]));
        let west = olc::encode(45.0, -9.0).unwrap();

        let entries = resolver
            .resolve_batch(vec![
                "8FQF2222+22".to_string(),
                west.clone(),
                "not-a-code".to_string(),
            ])
            .await;

        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].code, "8FQF2222+22");
        assert_eq!(
            entries[0].outcome.as_ref().unwrap().terrain_types,
            vec!["Urban fabric"]
        );
        assert_eq!(entries[1].code, west);
        assert!(matches!(
            entries[1].outcome,
            Err(TerrainError::Upstream { .. })
        ));
        assert!(matches!(
            entries[2].outcome,
            Err(TerrainError::InvalidCode { .. })
        ));

        let stats = resolver.stats();
        assert_eq!(stats.resolved, 1);
        assert_eq!(stats.failed, 2);
    }

    #[tokio::test]
    async fn test_resolve_batch_empty() {
        let resolver = TerrainResolver::new(StubSource::new(vec![]));
        let entries = resolver.resolve_batch(Vec::<String>::new()).await;
        assert!(entries.is_empty());
    }

    #[test]
    fn test_builder_validation() {
        assert!(matches!(
            TerrainResolverBuilder::new().code_length(7).build(),
            Err(TerrainError::Config(_))
        ));
        assert!(matches!(
            TerrainResolverBuilder::new().max_concurrency(0).build(),
            Err(TerrainError::Config(_))
        ));

        let resolver = TerrainResolverBuilder::new()
            .service_url("http://localhost:9/MapServer")
            .layer_id(2)
            .timeout(3)
            .max_retries(0)
            .code_length(11)
            .build()
            .unwrap();
        assert_eq!(resolver.code_length(), 11);
        assert_eq!(resolver.source().config().layer_id, 2);
        assert_eq!(resolver.source().config().timeout_secs, 3);
    }

    #[test]
    fn test_builder_from_env() {
        std::env::set_var("LANDCOVER_SERVICE_URL", "http://localhost:9/MapServer");
        std::env::set_var("LANDCOVER_LAYER_ID", "4");
        std::env::set_var("LANDCOVER_TIMEOUT_SECS", "7");
        std::env::set_var("LANDCOVER_MAX_RETRIES", "not a number");
        std::env::set_var("LANDCOVER_CODE_LENGTH", "12");

        let builder = TerrainResolverBuilder::from_env();

        std::env::remove_var("LANDCOVER_SERVICE_URL");
        std::env::remove_var("LANDCOVER_LAYER_ID");
        std::env::remove_var("LANDCOVER_TIMEOUT_SECS");
        std::env::remove_var("LANDCOVER_MAX_RETRIES");
        std::env::remove_var("LANDCOVER_CODE_LENGTH");

        let config = builder.arcgis_config();
        assert_eq!(config.service_url, "http://localhost:9/MapServer");
        assert_eq!(config.layer_id, 4);
        assert_eq!(config.timeout_secs, 7);
        assert_eq!(config.max_retries, 2);

        let resolver = builder.build().unwrap();
        assert_eq!(resolver.code_length(), 12);
    }
}
