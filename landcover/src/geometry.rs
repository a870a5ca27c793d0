//! ArcGIS polygon geometry for identify queries.
//!
//! ArcGIS REST operations take polygons as JSON objects with a list of rings
//! and a spatial reference:
//!
//! ```json
//! {"rings": [[[x0, y0], [x1, y1], [x2, y2], [x3, y3], [x0, y0]]],
//!  "spatialReference": {"wkid": 102100}}
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{Result, TerrainError};
use crate::projection::PlanarExtent;

/// ArcGIS well-known id for Web Mercator (equivalent to EPSG:3857).
pub const WEB_MERCATOR_WKID: u32 = 102100;

/// Spatial reference attached to a geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpatialReference {
    pub wkid: u32,
}

/// A polygon in ArcGIS JSON form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Polygon {
    /// Closed rings of `[x, y]` vertices.
    pub rings: Vec<Vec<[f64; 2]>>,
    pub spatial_reference: SpatialReference,
}

impl Polygon {
    /// The outer ring.
    pub fn exterior(&self) -> &[[f64; 2]] {
        self.rings.first().map(Vec::as_slice).unwrap_or(&[])
    }

    /// Serialize to the compact JSON expected by the `geometry` query parameter.
    ///
    /// Fails if any vertex is NaN or infinite, which JSON cannot represent.
    pub fn to_json(&self) -> Result<String> {
        if let Some(vertex) = self
            .rings
            .iter()
            .flatten()
            .find(|[x, y]| !x.is_finite() || !y.is_finite())
        {
            return Err(TerrainError::Geometry(format!(
                "non-finite vertex [{}, {}]",
                vertex[0], vertex[1]
            )));
        }
        serde_json::to_string(self).map_err(|e| TerrainError::Geometry(e.to_string()))
    }
}

/// Build the closed rectangular ring covering an extent.
///
/// Vertices run counter-clockwise from the lower-left corner:
/// `(xmin,ymin) → (xmax,ymin) → (xmax,ymax) → (xmin,ymax) → (xmin,ymin)`.
pub fn build_polygon(extent: &PlanarExtent) -> Polygon {
    let ring = vec![
        [extent.xmin, extent.ymin],
        [extent.xmax, extent.ymin],
        [extent.xmax, extent.ymax],
        [extent.xmin, extent.ymax],
        [extent.xmin, extent.ymin],
    ];

    Polygon {
        rings: vec![ring],
        spatial_reference: SpatialReference {
            wkid: WEB_MERCATOR_WKID,
        },
    }
}
