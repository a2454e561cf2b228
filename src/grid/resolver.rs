//! Inversion of a curvilinear grid's coordinate mapping.
//!
//! A ROMS grid stores latitude and longitude for every rho point. The
//! forward map `(x, y) -> (lat, lon)` is the bilinear interpolation of these
//! arrays, with `x` along xi (columns) and `y` along eta (rows). Finding the
//! fractional indices of a geographic point means inverting that map:
//!
//! 1. Reject points outside the grid extent (padded by one cell)
//! 2. Start from the nearest grid node in a local metric
//! 3. Newton iteration on the bilinear map of the cell holding the estimate

use std::cell::RefCell;
use std::num::NonZeroUsize;

use faer::Mat;
use lru::LruCache;
use thiserror::Error;
use tracing::debug;

use crate::io::{GeoBoundingBox, GridShape, LocalProjection};

/// Tolerated overshoot past the grid edge, in cells.
const EDGE_SLACK: f64 = 1.0e-6;

/// Error type for grid coordinate resolution.
#[derive(Debug, Error)]
pub enum GridError {
    /// Latitude and longitude arrays differ in shape
    #[error("Latitude grid is {lat} but longitude grid is {lon}")]
    ShapeMismatch { lat: GridShape, lon: GridShape },

    /// Grid too small to interpolate on
    #[error("Grid {shape} needs at least 2x2 finite nodes")]
    DegenerateGrid { shape: GridShape },

    /// Query point not covered by the grid
    #[error("Point ({lat}, {lon}) is outside the grid")]
    OutsideGrid { lat: f64, lon: f64 },

    /// Newton iteration failed
    #[error("Grid position of ({lat}, {lon}) did not converge after {iterations} iterations")]
    NonConvergent { lat: f64, lon: f64, iterations: usize },
}

/// Fractional grid indices: `x` along xi (columns), `y` along eta (rows).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridPosition {
    pub x: f64,
    pub y: f64,
}

impl GridPosition {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Integer grid node: row `j` (eta), column `i` (xi).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GridCell {
    pub j: usize,
    pub i: usize,
}

/// Configuration for grid inversion.
#[derive(Debug, Clone, Copy)]
pub struct InversionConfig {
    /// Convergence threshold on the residual, in degrees of latitude
    pub tolerance_deg: f64,
    /// Maximum Newton iterations
    pub max_iterations: usize,
    /// Number of solved points kept, 0 disables caching
    pub cache_capacity: usize,
}

impl Default for InversionConfig {
    fn default() -> Self {
        Self {
            tolerance_deg: 1.0e-9,
            max_iterations: 50,
            cache_capacity: 256,
        }
    }
}

impl InversionConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tolerance(mut self, tolerance_deg: f64) -> Self {
        self.tolerance_deg = tolerance_deg;
        self
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn with_cache_capacity(mut self, cache_capacity: usize) -> Self {
        self.cache_capacity = cache_capacity;
        self
    }
}

/// Bilinear cell holding a fractional position.
#[derive(Debug, Clone, Copy)]
struct CellFrame {
    j: usize,
    i: usize,
    fx: f64,
    fy: f64,
}

/// Locates geographic points on a curvilinear grid.
pub struct GridCoordinateResolver {
    lat: Mat<f64>,
    lon: Mat<f64>,
    config: InversionConfig,
    search_box: GeoBoundingBox,
    cache: Option<RefCell<LruCache<(u64, u64), GridPosition>>>,
}

impl GridCoordinateResolver {
    /// Create a resolver from 2-D rho-point latitude and longitude.
    pub fn new(lat: Mat<f64>, lon: Mat<f64>, config: InversionConfig) -> Result<Self, GridError> {
        let shape = GridShape::new(lat.nrows(), lat.ncols());
        let lon_shape = GridShape::new(lon.nrows(), lon.ncols());
        if shape != lon_shape {
            return Err(GridError::ShapeMismatch { lat: shape, lon: lon_shape });
        }
        if shape.n_y < 2 || shape.n_x < 2 {
            return Err(GridError::DegenerateGrid { shape });
        }
        let bbox = GeoBoundingBox::from_grid(&lat, &lon).ok_or(GridError::DegenerateGrid { shape })?;
        let (cell_lat, cell_lon) = typical_cell(&lat, &lon);
        let search_box = bbox.pad(cell_lat, cell_lon);

        let cache = NonZeroUsize::new(config.cache_capacity).map(|cap| RefCell::new(LruCache::new(cap)));
        debug!(%shape, "created grid resolver");
        Ok(Self {
            lat,
            lon,
            config,
            search_box,
            cache,
        })
    }

    pub fn shape(&self) -> GridShape {
        GridShape::new(self.lat.nrows(), self.lat.ncols())
    }

    pub fn config(&self) -> &InversionConfig {
        &self.config
    }

    /// Check whether this resolver was built from exactly these coordinates.
    pub fn has_grid(&self, lat: &Mat<f64>, lon: &Mat<f64>) -> bool {
        same_values(&self.lat, lat) && same_values(&self.lon, lon)
    }

    /// Fractional grid position of `(lat, lon)`.
    pub fn resolve(&self, lat: f64, lon: f64) -> Result<GridPosition, GridError> {
        let outside = GridError::OutsideGrid { lat, lon };
        if !lat.is_finite() || !lon.is_finite() || !self.search_box.contains(lat, lon) {
            return Err(outside);
        }

        let key = (lat.to_bits(), lon.to_bits());
        if let Some(cache) = &self.cache {
            if let Some(hit) = cache.borrow_mut().get(&key) {
                return Ok(*hit);
            }
        }

        let start = self.nearest_node(lat, lon).ok_or(outside)?;
        let position = self.newton(lat, lon, start)?;
        debug!(lat, lon, x = position.x, y = position.y, "resolved grid position");

        if let Some(cache) = &self.cache {
            cache.borrow_mut().put(key, position);
        }
        Ok(position)
    }

    /// Bilinear forward map `(x, y) -> (lat, lon)`.
    ///
    /// Positions off the grid are extrapolated from the edge cell.
    pub fn forward(&self, x: f64, y: f64) -> (f64, f64) {
        let cell = self.cell_frame(x, y);
        (bilinear(&self.lat, cell), bilinear(&self.lon, cell))
    }

    /// Grid node closest to a fractional position, clamped to the grid.
    pub fn nearest_cell(&self, position: GridPosition) -> GridCell {
        let clamp = |v: f64, n: usize| {
            if v.is_finite() {
                v.round().clamp(0.0, (n - 1) as f64) as usize
            } else {
                0
            }
        };
        GridCell {
            j: clamp(position.y, self.lat.nrows()),
            i: clamp(position.x, self.lat.ncols()),
        }
    }

    fn cell_frame(&self, x: f64, y: f64) -> CellFrame {
        let i = (x.floor().max(0.0) as usize).min(self.lat.ncols() - 2);
        let j = (y.floor().max(0.0) as usize).min(self.lat.nrows() - 2);
        CellFrame {
            j,
            i,
            fx: x - i as f64,
            fy: y - j as f64,
        }
    }

    fn newton(&self, lat: f64, lon: f64, start: GridCell) -> Result<GridPosition, GridError> {
        let cos_lat = lat.to_radians().cos();
        let max_x = (self.lat.ncols() - 1) as f64;
        let max_y = (self.lat.nrows() - 1) as f64;
        let (mut x, mut y) = (start.i as f64, start.j as f64);

        for iteration in 0..self.config.max_iterations {
            let cell = self.cell_frame(x, y);
            let r_lat = lat - bilinear(&self.lat, cell);
            let r_lon = lon - bilinear(&self.lon, cell);

            // A non-finite corner in the current cell
            if !(r_lat.is_finite() && r_lon.is_finite()) {
                return Err(GridError::NonConvergent {
                    lat,
                    lon,
                    iterations: iteration + 1,
                });
            }
            if r_lat.abs().max(r_lon.abs() * cos_lat) < self.config.tolerance_deg {
                let on_grid = (-EDGE_SLACK..=max_x + EDGE_SLACK).contains(&x)
                    && (-EDGE_SLACK..=max_y + EDGE_SLACK).contains(&y);
                return if on_grid {
                    Ok(GridPosition::new(x.clamp(0.0, max_x), y.clamp(0.0, max_y)))
                } else {
                    Err(GridError::OutsideGrid { lat, lon })
                };
            }

            let (lat_x, lat_y) = gradient(&self.lat, cell);
            let (lon_x, lon_y) = gradient(&self.lon, cell);
            let det = lat_x * lon_y - lat_y * lon_x;
            if det == 0.0 || !det.is_finite() {
                return Err(GridError::NonConvergent {
                    lat,
                    lon,
                    iterations: iteration + 1,
                });
            }

            // Cramer's rule, step limited to one cell
            let dx = (r_lat * lon_y - lat_y * r_lon) / det;
            let dy = (lat_x * r_lon - r_lat * lon_x) / det;
            x += dx.clamp(-1.0, 1.0);
            y += dy.clamp(-1.0, 1.0);

            if x < -1.0 || x > max_x + 1.0 || y < -1.0 || y > max_y + 1.0 {
                return Err(GridError::OutsideGrid { lat, lon });
            }
        }

        Err(GridError::NonConvergent {
            lat,
            lon,
            iterations: self.config.max_iterations,
        })
    }

    #[cfg(not(feature = "parallel"))]
    fn nearest_node(&self, lat: f64, lon: f64) -> Option<GridCell> {
        let proj = LocalProjection::new(lat, lon);
        (0..self.lat.nrows())
            .filter_map(|j| nearest_in_row(&self.lat, &self.lon, &proj, j))
            .min_by(closer)
            .map(|(_, cell)| cell)
    }

    #[cfg(feature = "parallel")]
    fn nearest_node(&self, lat: f64, lon: f64) -> Option<GridCell> {
        use rayon::prelude::*;

        let proj = LocalProjection::new(lat, lon);
        let (lat_grid, lon_grid) = (&self.lat, &self.lon);
        (0..lat_grid.nrows())
            .into_par_iter()
            .filter_map(|j| nearest_in_row(lat_grid, lon_grid, &proj, j))
            .min_by(closer)
            .map(|(_, cell)| cell)
    }
}

impl std::fmt::Debug for GridCoordinateResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GridCoordinateResolver")
            .field("shape", &self.shape())
            .field("config", &self.config)
            .field("search_box", &self.search_box)
            .finish()
    }
}

fn same_values(a: &Mat<f64>, b: &Mat<f64>) -> bool {
    a.nrows() == b.nrows()
        && a.ncols() == b.ncols()
        && (0..a.nrows()).all(|j| (0..a.ncols()).all(|i| a[(j, i)].to_bits() == b[(j, i)].to_bits()))
}

fn closer(a: &(f64, GridCell), b: &(f64, GridCell)) -> std::cmp::Ordering {
    a.0.total_cmp(&b.0)
        .then_with(|| (a.1.j, a.1.i).cmp(&(b.1.j, b.1.i)))
}

fn nearest_in_row(
    lat: &Mat<f64>,
    lon: &Mat<f64>,
    proj: &LocalProjection,
    j: usize,
) -> Option<(f64, GridCell)> {
    (0..lat.ncols())
        .filter_map(|i| {
            let d = proj.distance_sq(lat[(j, i)], lon[(j, i)]);
            d.is_finite().then_some((d, GridCell { j, i }))
        })
        .min_by(closer)
}

#[inline]
fn bilinear(m: &Mat<f64>, c: CellFrame) -> f64 {
    let (j, i) = (c.j, c.i);
    (1.0 - c.fy) * ((1.0 - c.fx) * m[(j, i)] + c.fx * m[(j, i + 1)])
        + c.fy * ((1.0 - c.fx) * m[(j + 1, i)] + c.fx * m[(j + 1, i + 1)])
}

/// Partial derivatives of the bilinear map along x and y.
#[inline]
fn gradient(m: &Mat<f64>, c: CellFrame) -> (f64, f64) {
    let (j, i) = (c.j, c.i);
    let d_x = (1.0 - c.fy) * (m[(j, i + 1)] - m[(j, i)]) + c.fy * (m[(j + 1, i + 1)] - m[(j + 1, i)]);
    let d_y = (1.0 - c.fx) * (m[(j + 1, i)] - m[(j, i)]) + c.fx * (m[(j + 1, i + 1)] - m[(j, i + 1)]);
    (d_x, d_y)
}

/// Latitude and longitude span of the cell in the middle of the grid.
fn typical_cell(lat: &Mat<f64>, lon: &Mat<f64>) -> (f64, f64) {
    let j = (lat.nrows() - 1) / 2;
    let i = (lat.ncols() - 1) / 2;
    let span = |m: &Mat<f64>| {
        let corners = [m[(j, i)], m[(j, i + 1)], m[(j + 1, i)], m[(j + 1, i + 1)]];
        let lo = corners.iter().copied().fold(f64::INFINITY, f64::min);
        let hi = corners.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        if hi >= lo { hi - lo } else { 0.0 }
    };
    (span(lat), span(lon))
}
