//! Degree to Web Mercator meter projection and planar extents.
//!
//! The projection is the spherical Mercator used by ArcGIS Web Mercator
//! services (wkid 102100 / EPSG:3857):
//!
//! ```text
//! x = lon · R / 180
//! y = ln(tan((90 + lat) · π / 360)) / (π / 180) · R / 180
//! ```
//!
//! with `R` = 20037508.34 m, half the equatorial circumference of the sphere.
//! The projection diverges at the poles, so cells touching ±90° latitude
//! cannot be turned into a [`PlanarExtent`].

use std::f64::consts::PI;
use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::error::{Result, TerrainError};
use crate::olc::CodeArea;

/// Half the equatorial circumference of the reference sphere, in meters.
pub const EARTH_HALF_CIRCUMFERENCE: f64 = 20037508.34;

/// Project a coordinate in decimal degrees to Web Mercator meters.
///
/// Returns `(x, y)`. The result is not finite at latitude ±90.
///
/// # Examples
///
/// ```
/// use landcover::projection::{project, EARTH_HALF_CIRCUMFERENCE};
///
/// let (x, y) = project(180.0, 0.0);
/// assert_eq!(x, EARTH_HALF_CIRCUMFERENCE);
/// assert!(y.abs() < 1e-6);
/// ```
pub fn project(lon: f64, lat: f64) -> (f64, f64) {
    let x = lon * EARTH_HALF_CIRCUMFERENCE / 180.0;
    let y = ((90.0 + lat) * PI / 360.0).tan().ln() / (PI / 180.0);
    let y = y * EARTH_HALF_CIRCUMFERENCE / 180.0;
    (x, y)
}

/// A rectangle in Web Mercator meters.
///
/// The `Display` implementation renders the `xmin,ymin,xmax,ymax` form used
/// for the ArcGIS `mapExtent` parameter, with shortest round-trip float
/// formatting.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PlanarExtent {
    pub xmin: f64,
    pub ymin: f64,
    pub xmax: f64,
    pub ymax: f64,
}

impl PlanarExtent {
    pub fn new(xmin: f64, ymin: f64, xmax: f64, ymax: f64) -> Self {
        Self {
            xmin,
            ymin,
            xmax,
            ymax,
        }
    }

    /// Project the south-west and north-east corners of a cell.
    ///
    /// # Errors
    ///
    /// Returns [`TerrainError::InvalidInput`] if the cell touches a pole, where
    /// the projection is undefined.
    pub fn from_cell(cell: &CodeArea) -> Result<Self> {
        for lat in [cell.lat_lo, cell.lat_hi] {
            if lat <= -90.0 || lat >= 90.0 {
                return Err(TerrainError::invalid_input(
                    lat,
                    cell.lon_center,
                    "cell touches a pole and cannot be projected",
                ));
            }
        }

        let (xmin, ymin) = project(cell.lon_lo, cell.lat_lo);
        let (xmax, ymax) = project(cell.lon_hi, cell.lat_hi);
        let extent = Self::new(xmin, ymin, xmax, ymax);

        if !extent.is_finite() {
            return Err(TerrainError::invalid_input(
                cell.lat_center,
                cell.lon_center,
                "projected extent is not finite",
            ));
        }
        Ok(extent)
    }

    pub fn width(&self) -> f64 {
        self.xmax - self.xmin
    }

    pub fn height(&self) -> f64 {
        self.ymax - self.ymin
    }

    fn is_finite(&self) -> bool {
        [self.xmin, self.ymin, self.xmax, self.ymax]
            .iter()
            .all(|v| v.is_finite())
    }
}

impl fmt::Display for PlanarExtent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{},{},{}", self.xmin, self.ymin, self.xmax, self.ymax)
    }
}

impl FromStr for PlanarExtent {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let parts: Vec<f64> = s
            .split(',')
            .map(|p| p.trim().parse::<f64>().map_err(|e| format!("{}: {}", p, e)))
            .collect::<std::result::Result<_, _>>()?;
        match parts.as_slice() {
            [xmin, ymin, xmax, ymax] => Ok(Self::new(*xmin, *ymin, *xmax, *ymax)),
            _ => Err(format!("expected 4 values, got {}", parts.len())),
        }
    }
}
