//! Gridded data source contract.
//!
//! A [`GridSource`] is one open ocean model dataset (typically a NorKyst/ROMS
//! history file). The extraction pipeline never reads whole 4-D fields: it
//! asks for the horizontal grid, the time coordinate and single-point
//! columns of the variables it needs.
//!
//! Values returned by a source are always decoded: packing (`scale_factor`,
//! `add_offset`) is applied and fill values are replaced by `NaN`.

use chrono::NaiveDateTime;
use faer::Mat;
use thiserror::Error;

/// Error type for data source operations.
#[derive(Debug, Error)]
pub enum SourceError {
    /// File I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// NetCDF library error
    #[cfg(feature = "netcdf")]
    #[error("NetCDF error: {0}")]
    NetCDF(#[from] netcdf::Error),

    /// Invalid data
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// Missing variable
    #[error("Missing variable: {0}")]
    MissingVariable(String),

    /// Point outside the horizontal extent of a variable
    #[error("Index (j={j}, i={i}) out of bounds for variable {name}")]
    IndexOutOfBounds { name: String, j: usize, i: usize },

    /// Feature not enabled
    #[error("NetCDF feature not enabled")]
    FeatureDisabled,
}

/// Check if a value is valid: finite and below the CF fill value range.
#[inline]
pub fn is_valid_f64(v: f64) -> bool {
    v.is_finite() && v.abs() < 1.0e+30
}

/// Horizontal shape of a grid: `n_y` rows (eta) by `n_x` columns (xi).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GridShape {
    pub n_y: usize,
    pub n_x: usize,
}

impl GridShape {
    pub fn new(n_y: usize, n_x: usize) -> Self {
        Self { n_y, n_x }
    }

    /// Check whether `(j, i)` lies on the grid.
    #[inline]
    pub fn contains(&self, j: usize, i: usize) -> bool {
        j < self.n_y && i < self.n_x
    }
}

impl std::fmt::Display for GridShape {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.n_y, self.n_x)
    }
}

/// Dimension layout of a gridded variable.
///
/// Gridded variables always end in two horizontal dimensions. They may be
/// preceded by a time dimension, a vertical level dimension, or both
/// (in that order).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VariableLayout {
    /// Number of time steps, `None` for stationary fields
    pub n_time: Option<usize>,
    /// Number of vertical levels, `None` for 2-D fields
    pub n_level: Option<usize>,
    /// Rows
    pub n_y: usize,
    /// Columns
    pub n_x: usize,
}

impl VariableLayout {
    /// A stationary 2-D field (y, x).
    pub fn surface(n_y: usize, n_x: usize) -> Self {
        Self { n_time: None, n_level: None, n_y, n_x }
    }

    /// A time-varying 2-D field (time, y, x).
    pub fn surface_series(n_time: usize, n_y: usize, n_x: usize) -> Self {
        Self { n_time: Some(n_time), n_level: None, n_y, n_x }
    }

    /// A stationary 3-D field (level, y, x).
    pub fn volume(n_level: usize, n_y: usize, n_x: usize) -> Self {
        Self { n_time: None, n_level: Some(n_level), n_y, n_x }
    }

    /// A time-varying 3-D field (time, level, y, x).
    pub fn volume_series(n_time: usize, n_level: usize, n_y: usize, n_x: usize) -> Self {
        Self { n_time: Some(n_time), n_level: Some(n_level), n_y, n_x }
    }

    pub fn horizontal(&self) -> GridShape {
        GridShape::new(self.n_y, self.n_x)
    }

    /// Number of values in one horizontal point column.
    pub fn column_len(&self) -> usize {
        self.n_time.unwrap_or(1) * self.n_level.unwrap_or(1)
    }

    /// Total number of values.
    pub fn len(&self) -> usize {
        self.column_len() * self.n_y * self.n_x
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Decoded values of one variable at a single horizontal point.
///
/// Stored row-major as `[time][level]`. Stationary or single-level
/// columns broadcast along the missing axis in [`Column::get`].
#[derive(Debug, Clone)]
pub struct Column {
    n_time: Option<usize>,
    n_level: Option<usize>,
    values: Vec<f64>,
}

impl Column {
    /// Build a column from values laid out per `layout`.
    pub fn new(layout: VariableLayout, values: Vec<f64>) -> Result<Self, SourceError> {
        if values.len() != layout.column_len() {
            return Err(SourceError::InvalidData(format!(
                "column has {} values, layout expects {}",
                values.len(),
                layout.column_len()
            )));
        }
        Ok(Self {
            n_time: layout.n_time,
            n_level: layout.n_level,
            values,
        })
    }

    /// A single stationary value.
    pub fn scalar(value: f64) -> Self {
        Self { n_time: None, n_level: None, values: vec![value] }
    }

    pub fn is_time_varying(&self) -> bool {
        self.n_time.is_some()
    }

    pub fn has_levels(&self) -> bool {
        self.n_level.is_some()
    }

    pub fn n_times(&self) -> usize {
        self.n_time.unwrap_or(1)
    }

    pub fn n_levels(&self) -> usize {
        self.n_level.unwrap_or(1)
    }

    /// Value at time index `t` and level `k`, broadcasting absent axes.
    #[inline]
    pub fn get(&self, t: usize, k: usize) -> f64 {
        let t = if self.n_time.is_some() { t } else { 0 };
        let k = if self.n_level.is_some() { k } else { 0 };
        self.values[t * self.n_levels() + k]
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }
}

/// An open gridded ocean model dataset.
pub trait GridSource {
    /// Shape of the rho-point grid.
    fn grid_shape(&self) -> Result<GridShape, SourceError>;

    /// Read the 2-D rho-point latitude and longitude arrays.
    fn read_lat_lon(&self) -> Result<(Mat<f64>, Mat<f64>), SourceError>;

    /// Read the time coordinate.
    fn read_times(&self) -> Result<Vec<NaiveDateTime>, SourceError>;

    /// Check if a variable exists (gridded or not).
    fn has_variable(&self, name: &str) -> bool;

    /// Layout of a gridded variable, `None` if missing or not gridded.
    fn layout(&self, name: &str) -> Option<VariableLayout>;

    /// Read one horizontal point `(j, i)` of a gridded variable.
    fn read_column(&self, name: &str, j: usize, i: usize) -> Result<Column, SourceError>;

    /// Read all values of a (small) variable such as `s_rho` or `hc`.
    fn read_values(&self, name: &str) -> Result<Vec<f64>, SourceError>;

    /// Description used in log messages.
    fn describe(&self) -> String {
        "grid source".to_string()
    }

    /// Read a single scalar value, e.g. `hc` or `Vtransform`.
    fn read_scalar(&self, name: &str) -> Result<f64, SourceError> {
        self.read_values(name)?
            .first()
            .copied()
            .ok_or_else(|| SourceError::InvalidData(format!("variable {name} is empty")))
    }
}
