//! # Landcover - Terrain Classification Library
//!
//! Resolve the land-cover classes found at a geographic point or inside an
//! Open Location Code ("plus code") cell, using an ArcGIS MapServer that
//! publishes a classified raster such as CORINE Land Cover.
//!
//! ## Features
//!
//! - **Plus codes**: Encode, decode and validate Open Location Codes
//! - **Projection**: Web Mercator extents for location cells
//! - **Remote lookup** (`remote`): Async ArcGIS client with a shared legend cache
//! - **GeoJSON** (`geojson`): Export cells as GeoJSON features
//!
//! ## Quick Start
//!
//! ```ignore
//! use landcover::{olc, LocationQuery, TerrainResolverBuilder};
//!
//! let code = olc::encode(45.0, 9.0)?;
//! assert_eq!(code, "8FQF2222+22");
//!
//! let resolver = TerrainResolverBuilder::from_env().build()?;
//! let result = resolver.resolve(&LocationQuery::Code(code)).await?;
//! println!("Terrain: {:?}", result.terrain_types);
//! ```
//!
//! ## Pipeline
//!
//! 1. Encode the point to a code (default length 10, about 14m × 14m)
//! 2. Decode the code to its cell bounds in degrees
//! 3. Project the cell to a Web Mercator extent and build a polygon
//! 4. Ask the MapServer which classification values intersect the polygon
//! 5. Translate values to descriptions using the layer legend

pub mod error;
pub mod geometry;
pub mod olc;
pub mod projection;

#[cfg(feature = "remote")]
pub mod arcgis;
#[cfg(feature = "remote")]
pub mod resolver;

#[cfg(feature = "geojson")]
pub mod geojson;

// Re-export main types at crate root for convenience
pub use error::{Result, TerrainError};
pub use geometry::{build_polygon, Polygon};
pub use olc::CodeArea;
pub use projection::PlanarExtent;

#[cfg(feature = "remote")]
pub use arcgis::{ArcGisClient, ArcGisConfig, ClassValue, LandCoverSource, Legend};
#[cfg(feature = "remote")]
pub use resolver::{
    BatchEntry, LocationQuery, ResolverStats, TerrainResolver, TerrainResolverBuilder,
    TerrainResult,
};
