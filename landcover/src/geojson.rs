//! GeoJSON export of location cells and planar polygons.
//!
//! Enable the `geojson` feature to use this module.
//!
//! # Example
//!
//! ```ignore
//! use landcover::olc::decode;
//! use landcover::geojson::cell_feature;
//!
//! let area = decode("8FQF2222+22")?;
//! let feature = cell_feature("8FQF2222+22", &area);
//! println!("{}", feature);
//! // {"type":"Feature","geometry":{"type":"Polygon","coordinates":[[[9.0,45.0],...]]},...}
//! ```

use geojson::{Feature, Geometry, JsonObject, JsonValue, Value as GeoJsonValue};

use crate::geometry::Polygon;
use crate::olc::CodeArea;

/// Outline of a cell as a GeoJSON polygon in `[lon, lat]` degrees.
///
/// The ring follows the same corner order as
/// [`build_polygon`](crate::geometry::build_polygon).
pub fn cell_to_geometry(area: &CodeArea) -> Geometry {
    let ring = vec![
        vec![area.lon_lo, area.lat_lo],
        vec![area.lon_hi, area.lat_lo],
        vec![area.lon_hi, area.lat_hi],
        vec![area.lon_lo, area.lat_hi],
        vec![area.lon_lo, area.lat_lo],
    ];
    Geometry::new(GeoJsonValue::Polygon(vec![ring]))
}

/// Convert an ArcGIS polygon to a GeoJSON polygon.
///
/// Coordinates are copied as-is, so the result is in the polygon's spatial
/// reference (Web Mercator meters for polygons built by this crate).
pub fn polygon_to_geometry(polygon: &Polygon) -> Geometry {
    let rings = polygon
        .rings
        .iter()
        .map(|ring| ring.iter().map(|[x, y]| vec![*x, *y]).collect())
        .collect();
    Geometry::new(GeoJsonValue::Polygon(rings))
}

/// A GeoJSON feature for a cell, carrying the code and cell center as properties.
pub fn cell_feature(code: &str, area: &CodeArea) -> Feature {
    let mut properties = JsonObject::new();
    properties.insert(
        "locationCode".to_string(),
        JsonValue::String(code.to_string()),
    );
    properties.insert("codeLength".to_string(), JsonValue::from(area.code_length));
    properties.insert("latCenter".to_string(), JsonValue::from(area.lat_center));
    properties.insert("lonCenter".to_string(), JsonValue::from(area.lon_center));

    Feature {
        bbox: Some(vec![area.lon_lo, area.lat_lo, area.lon_hi, area.lat_hi]),
        geometry: Some(cell_to_geometry(area)),
        id: None,
        properties: Some(properties),
        foreign_members: None,
    }
}
