//! NetCDF grid source for NorKyst/ROMS output.
//!
//! Opens one history or average file and serves point columns on demand.
//! Nothing beyond metadata is read at open time; the file is closed when the
//! [`NetcdfSource`] is dropped.
//!
//! # Supported layouts
//!
//! - Curvilinear grids with 2-D `lat_rho`/`lon_rho` (also `lat`/`lon`,
//!   `latitude`/`longitude`, `nav_lat`/`nav_lon`)
//! - Packed data (`i16` with `scale_factor`/`add_offset`, as written by the
//!   NorKyst repacking tool)
//! - Time coordinate `ocean_time` or `time` with CF `units`
//!
//! # Example
//!
//! ```rust,ignore
//! use norkyst_rs::io::{GridSource, NetcdfSource};
//!
//! let src = NetcdfSource::open("norfjords_160m_his.nc4_2015090701-2015090704")?;
//! let shape = src.grid_shape()?;
//! let temp = src.read_column("temp", 10, 20)?;
//! ```

use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use faer::Mat;
use tracing::debug;

use super::source::{Column, GridShape, GridSource, SourceError, VariableLayout, is_valid_f64};
use super::time_units::CfTimeUnits;

const LAT_NAMES: [&str; 4] = ["lat_rho", "lat", "latitude", "nav_lat"];
const LON_NAMES: [&str; 4] = ["lon_rho", "lon", "longitude", "nav_lon"];
const TIME_NAMES: [&str; 3] = ["ocean_time", "time", "Time"];

/// Reader for a single ocean model NetCDF file.
pub struct NetcdfSource {
    file: netcdf::File,
    path: PathBuf,
}

impl NetcdfSource {
    /// Open a NetCDF file for reading.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, SourceError> {
        let path = path.as_ref().to_path_buf();
        let file = netcdf::open(&path)?;
        debug!(path = %path.display(), "opened NetCDF file");
        Ok(Self { file, path })
    }

    fn variable(&self, name: &str) -> Result<netcdf::Variable<'_>, SourceError> {
        self.file
            .variable(name)
            .ok_or_else(|| SourceError::MissingVariable(name.to_string()))
    }

    /// Detect lat/lon variable names.
    fn detect_grid_vars(&self) -> Result<(&'static str, &'static str), SourceError> {
        for (&lat_name, &lon_name) in LAT_NAMES.iter().zip(LON_NAMES.iter()) {
            if let (Some(lat), Some(_)) = (self.file.variable(lat_name), self.file.variable(lon_name)) {
                if lat.dimensions().len() == 2 {
                    return Ok((lat_name, lon_name));
                }
            }
        }
        Err(SourceError::MissingVariable("2-D lat/lon coordinates".to_string()))
    }

    /// Read a 2-D variable into a matrix.
    fn read_matrix(&self, name: &str) -> Result<Mat<f64>, SourceError> {
        let var = self.variable(name)?;
        let dims = var.dimensions();
        if dims.len() != 2 {
            return Err(SourceError::InvalidData(format!(
                "{name} has {} dimensions, expected 2",
                dims.len()
            )));
        }
        let (n_y, n_x) = (dims[0].len(), dims[1].len());
        let flat = decode(&var, var.get_values::<f64, _>(..)?);
        Ok(Mat::from_fn(n_y, n_x, |j, i| flat[j * n_x + i]))
    }
}

impl GridSource for NetcdfSource {
    fn grid_shape(&self) -> Result<GridShape, SourceError> {
        let (lat_name, _) = self.detect_grid_vars()?;
        let var = self.variable(lat_name)?;
        let dims = var.dimensions();
        Ok(GridShape::new(dims[0].len(), dims[1].len()))
    }

    fn read_lat_lon(&self) -> Result<(Mat<f64>, Mat<f64>), SourceError> {
        let (lat_name, lon_name) = self.detect_grid_vars()?;
        Ok((self.read_matrix(lat_name)?, self.read_matrix(lon_name)?))
    }

    fn read_times(&self) -> Result<Vec<NaiveDateTime>, SourceError> {
        let name = TIME_NAMES
            .iter()
            .copied()
            .find(|name| self.file.variable(name).is_some())
            .ok_or_else(|| SourceError::MissingVariable("ocean_time".to_string()))?;
        let var = self.variable(name)?;
        let units = get_attr_string(&var, "units")
            .ok_or_else(|| SourceError::InvalidData(format!("{name} has no units attribute")))?;
        let units = CfTimeUnits::parse(&units)?;

        let values: Vec<f64> = var.get_values(..)?;
        values.into_iter().map(|v| units.to_datetime(v)).collect()
    }

    fn has_variable(&self, name: &str) -> bool {
        self.file.variable(name).is_some()
    }

    fn layout(&self, name: &str) -> Option<VariableLayout> {
        let var = self.file.variable(name)?;
        layout_of(var.dimensions())
    }

    fn read_column(&self, name: &str, j: usize, i: usize) -> Result<Column, SourceError> {
        let var = self.variable(name)?;
        let layout = layout_of(var.dimensions())
            .ok_or_else(|| SourceError::InvalidData(format!("variable {name} is not gridded")))?;
        if !layout.horizontal().contains(j, i) {
            return Err(SourceError::IndexOutOfBounds { name: name.to_string(), j, i });
        }

        let raw: Vec<f64> = match var.dimensions().len() {
            2 => var.get_values((j, i))?,
            3 => var.get_values((.., j, i))?,
            _ => var.get_values((.., .., j, i))?,
        };
        Column::new(layout, decode(&var, raw))
    }

    fn read_values(&self, name: &str) -> Result<Vec<f64>, SourceError> {
        let var = self.variable(name)?;
        Ok(decode(&var, var.get_values::<f64, _>(..)?))
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

impl Drop for NetcdfSource {
    fn drop(&mut self) {
        debug!(path = %self.path.display(), "closing NetCDF file");
    }
}

/// Classify dimensions into a gridded layout.
///
/// A leading dimension whose name contains "time" is the time axis; any
/// other non-horizontal dimension is the vertical axis.
fn layout_of(dims: &[netcdf::Dimension]) -> Option<VariableLayout> {
    let is_time = |d: &netcdf::Dimension| d.name().to_ascii_lowercase().contains("time");
    match dims {
        [y, x] => Some(VariableLayout::surface(y.len(), x.len())),
        [a, y, x] if is_time(a) => Some(VariableLayout::surface_series(a.len(), y.len(), x.len())),
        [a, y, x] => Some(VariableLayout::volume(a.len(), y.len(), x.len())),
        [t, k, y, x] => Some(VariableLayout::volume_series(t.len(), k.len(), y.len(), x.len())),
        _ => None,
    }
}

/// Apply fill value masking and linear unpacking.
fn decode(var: &netcdf::Variable, raw: Vec<f64>) -> Vec<f64> {
    let scale = get_attr_f64(var, "scale_factor").unwrap_or(1.0);
    let offset = get_attr_f64(var, "add_offset").unwrap_or(0.0);
    let fill = get_attr_f64(var, "_FillValue").or_else(|| get_attr_f64(var, "missing_value"));

    raw.into_iter()
        .map(|v| {
            if Some(v) == fill || !is_valid_f64(v) {
                f64::NAN
            } else {
                v * scale + offset
            }
        })
        .collect()
}

/// Check if a variable has an attribute with the given name.
fn has_attr(var: &netcdf::Variable, name: &str) -> bool {
    var.attributes().any(|attr| attr.name() == name)
}

/// Get f64 attribute value.
fn get_attr_f64(var: &netcdf::Variable, name: &str) -> Option<f64> {
    if !has_attr(var, name) {
        return None;
    }
    let value = var.attribute_value(name)?.ok()?;
    f64::try_from(value).ok()
}

/// Get string attribute value.
fn get_attr_string(var: &netcdf::Variable, name: &str) -> Option<String> {
    if !has_attr(var, name) {
        return None;
    }
    match var.attribute_value(name)?.ok()? {
        netcdf::AttributeValue::Str(s) => Some(s),
        _ => None,
    }
}
