//! Geographic helpers for grid searches.
//!
//! - **GeoBoundingBox**: extent of a curvilinear grid, used to reject points
//!   far outside the model domain before any search
//! - **LocalProjection**: tangent plane centred on a query point, used as the
//!   distance metric when looking for the nearest grid node
//!
//! # Example
//!
//! ```
//! use norkyst_rs::io::LocalProjection;
//!
//! let proj = LocalProjection::new(59.03, 5.68);
//! let (x, y) = proj.geo_to_xy(59.04, 5.70);
//! assert!(x > 1000.0 && y > 1000.0);
//! ```

use std::f64::consts::PI;

use faer::Mat;

/// Geographic bounding box in WGS84 coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoBoundingBox {
    /// Minimum longitude (western edge) in degrees
    pub min_lon: f64,
    /// Minimum latitude (southern edge) in degrees
    pub min_lat: f64,
    /// Maximum longitude (eastern edge) in degrees
    pub max_lon: f64,
    /// Maximum latitude (northern edge) in degrees
    pub max_lat: f64,
}

impl GeoBoundingBox {
    /// Create a new bounding box.
    pub fn new(min_lon: f64, min_lat: f64, max_lon: f64, max_lat: f64) -> Self {
        Self {
            min_lon,
            min_lat,
            max_lon,
            max_lat,
        }
    }

    /// Extent of the finite values of a pair of lat/lon arrays.
    ///
    /// Returns `None` if no finite coordinate pair exists.
    pub fn from_grid(lat: &Mat<f64>, lon: &Mat<f64>) -> Option<Self> {
        let mut bbox: Option<Self> = None;
        for j in 0..lat.nrows() {
            for i in 0..lat.ncols() {
                let (la, lo) = (lat[(j, i)], lon[(j, i)]);
                if !la.is_finite() || !lo.is_finite() {
                    continue;
                }
                bbox = Some(match bbox {
                    None => Self::new(lo, la, lo, la),
                    Some(b) => Self::new(
                        b.min_lon.min(lo),
                        b.min_lat.min(la),
                        b.max_lon.max(lo),
                        b.max_lat.max(la),
                    ),
                });
            }
        }
        bbox
    }

    /// Check if a point is within this bounding box.
    pub fn contains(&self, lat: f64, lon: f64) -> bool {
        lon >= self.min_lon && lon <= self.max_lon && lat >= self.min_lat && lat <= self.max_lat
    }

    /// Grow the box by fixed margins in degrees.
    pub fn pad(&self, lat_margin: f64, lon_margin: f64) -> Self {
        Self {
            min_lon: self.min_lon - lon_margin,
            min_lat: self.min_lat - lat_margin,
            max_lon: self.max_lon + lon_margin,
            max_lat: self.max_lat + lat_margin,
        }
    }
}

/// Local tangent plane projection.
///
/// A simple and fast projection for small distances (< 100 km).
/// Uses a flat Earth approximation centered on a reference point.
#[derive(Debug, Clone, Copy)]
pub struct LocalProjection {
    /// Reference latitude in degrees
    ref_lat: f64,
    /// Reference longitude in degrees
    ref_lon: f64,
    /// Meters per degree latitude (~111,320 m)
    meters_per_deg_lat: f64,
    /// Meters per degree longitude at reference latitude
    meters_per_deg_lon: f64,
}

impl LocalProjection {
    /// WGS84 equatorial radius in meters
    const A: f64 = 6_378_137.0;
    /// WGS84 flattening
    const F: f64 = 1.0 / 298.257_223_563;

    /// Create a local projection centered at the given reference point.
    pub fn new(ref_lat: f64, ref_lon: f64) -> Self {
        let lat_rad = ref_lat * PI / 180.0;

        let e2 = 2.0 * Self::F - Self::F * Self::F;
        let sin2 = lat_rad.sin().powi(2);

        // Radii of curvature in the meridian and the prime vertical
        let rho = Self::A * (1.0 - e2) / (1.0 - e2 * sin2).powf(1.5);
        let nu = Self::A / (1.0 - e2 * sin2).sqrt();

        Self {
            ref_lat,
            ref_lon,
            meters_per_deg_lat: rho * PI / 180.0,
            meters_per_deg_lon: nu * lat_rad.cos() * PI / 180.0,
        }
    }

    /// Convert geographic coordinates (lat, lon) to projected (x, y) in meters.
    pub fn geo_to_xy(&self, lat: f64, lon: f64) -> (f64, f64) {
        let x = (lon - self.ref_lon) * self.meters_per_deg_lon;
        let y = (lat - self.ref_lat) * self.meters_per_deg_lat;
        (x, y)
    }

    /// Squared distance in m² from the reference point.
    #[inline]
    pub fn distance_sq(&self, lat: f64, lon: f64) -> f64 {
        let (x, y) = self.geo_to_xy(lat, lon);
        x * x + y * y
    }
}
