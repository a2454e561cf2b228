//! In-memory grid source.
//!
//! Holds a complete dataset in memory. Used for datasets that are already
//! open (handed to a [`DatasetHandle`](crate::archive::DatasetHandle) by the
//! caller) and for synthetic archives in tests and benchmarks.

use std::collections::HashMap;

use chrono::NaiveDateTime;
use faer::Mat;

use super::source::{Column, GridShape, GridSource, SourceError, VariableLayout, is_valid_f64};

#[derive(Debug, Clone)]
struct MemoryVariable {
    /// `None` for non-gridded variables (scalars, 1-D coordinates)
    layout: Option<VariableLayout>,
    /// Row-major values
    values: Vec<f64>,
}

/// A dataset held entirely in memory.
#[derive(Debug, Clone)]
pub struct MemorySource {
    name: String,
    lat: Mat<f64>,
    lon: Mat<f64>,
    times: Vec<NaiveDateTime>,
    variables: HashMap<String, MemoryVariable>,
}

impl MemorySource {
    /// Create a source from rho-point latitude and longitude arrays.
    pub fn new(lat: Mat<f64>, lon: Mat<f64>) -> Result<Self, SourceError> {
        if lat.nrows() != lon.nrows() || lat.ncols() != lon.ncols() {
            return Err(SourceError::InvalidData(format!(
                "lat is {}x{} but lon is {}x{}",
                lat.nrows(),
                lat.ncols(),
                lon.nrows(),
                lon.ncols()
            )));
        }
        Ok(Self {
            name: "memory".to_string(),
            lat,
            lon,
            times: Vec::new(),
            variables: HashMap::new(),
        })
    }

    /// Set a name used in log messages.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Set the time coordinate.
    pub fn with_times(mut self, times: Vec<NaiveDateTime>) -> Self {
        self.times = times;
        self
    }

    /// Add a scalar variable such as `hc` or `Vtransform`.
    pub fn with_scalar(mut self, name: impl Into<String>, value: f64) -> Self {
        self.variables.insert(
            name.into(),
            MemoryVariable { layout: None, values: vec![value] },
        );
        self
    }

    /// Add a non-gridded 1-D variable such as `s_rho` or `Cs_r`.
    pub fn with_vector(mut self, name: impl Into<String>, values: Vec<f64>) -> Self {
        self.variables
            .insert(name.into(), MemoryVariable { layout: None, values });
        self
    }

    /// Add a gridded variable. `values` are row-major per `layout`;
    /// non-finite values and values beyond `1e30` read back as `NaN`.
    pub fn with_field(
        mut self,
        name: impl Into<String>,
        layout: VariableLayout,
        values: Vec<f64>,
    ) -> Result<Self, SourceError> {
        let name = name.into();
        if values.len() != layout.len() {
            return Err(SourceError::InvalidData(format!(
                "variable {name} has {} values, layout expects {}",
                values.len(),
                layout.len()
            )));
        }
        self.variables
            .insert(name, MemoryVariable { layout: Some(layout), values });
        Ok(self)
    }

    /// Add a gridded variable computed from `(t, k, j, i)`.
    pub fn with_field_fn(
        self,
        name: impl Into<String>,
        layout: VariableLayout,
        f: impl Fn(usize, usize, usize, usize) -> f64,
    ) -> Result<Self, SourceError> {
        let mut values = Vec::with_capacity(layout.len());
        for t in 0..layout.n_time.unwrap_or(1) {
            for k in 0..layout.n_level.unwrap_or(1) {
                for j in 0..layout.n_y {
                    for i in 0..layout.n_x {
                        values.push(f(t, k, j, i));
                    }
                }
            }
        }
        self.with_field(name, layout, values)
    }

    fn variable(&self, name: &str) -> Result<&MemoryVariable, SourceError> {
        self.variables
            .get(name)
            .ok_or_else(|| SourceError::MissingVariable(name.to_string()))
    }
}

impl GridSource for MemorySource {
    fn grid_shape(&self) -> Result<GridShape, SourceError> {
        Ok(GridShape::new(self.lat.nrows(), self.lat.ncols()))
    }

    fn read_lat_lon(&self) -> Result<(Mat<f64>, Mat<f64>), SourceError> {
        Ok((self.lat.clone(), self.lon.clone()))
    }

    fn read_times(&self) -> Result<Vec<NaiveDateTime>, SourceError> {
        Ok(self.times.clone())
    }

    fn has_variable(&self, name: &str) -> bool {
        self.variables.contains_key(name)
    }

    fn layout(&self, name: &str) -> Option<VariableLayout> {
        self.variables.get(name).and_then(|v| v.layout)
    }

    fn read_column(&self, name: &str, j: usize, i: usize) -> Result<Column, SourceError> {
        let var = self.variable(name)?;
        let layout = var
            .layout
            .ok_or_else(|| SourceError::InvalidData(format!("variable {name} is not gridded")))?;
        if !layout.horizontal().contains(j, i) {
            return Err(SourceError::IndexOutOfBounds { name: name.to_string(), j, i });
        }

        let plane = layout.n_y * layout.n_x;
        let offset = j * layout.n_x + i;
        let values = (0..layout.column_len())
            .map(|n| var.values[n * plane + offset])
            .map(|v| if is_valid_f64(v) { v } else { f64::NAN })
            .collect();
        Column::new(layout, values)
    }

    fn read_values(&self, name: &str) -> Result<Vec<f64>, SourceError> {
        Ok(self.variable(name)?.values.clone())
    }

    fn describe(&self) -> String {
        self.name.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_source() -> MemorySource {
        let lat = Mat::from_fn(3, 4, |j, _| 60.0 + j as f64);
        let lon = Mat::from_fn(3, 4, |_, i| 5.0 + i as f64);
        MemorySource::new(lat, lon).unwrap()
    }

    #[test]
    fn test_rejects_mismatched_lat_lon() {
        let lat = Mat::<f64>::zeros(3, 4);
        let lon = Mat::<f64>::zeros(4, 3);
        assert!(MemorySource::new(lat, lon).is_err());
    }

    #[test]
    fn test_read_column_4d() {
        let layout = VariableLayout::volume_series(2, 3, 3, 4);
        let src = small_source()
            .with_field_fn("temp", layout, |t, k, j, i| {
                (1000 * t + 100 * k + 10 * j + i) as f64
            })
            .unwrap();

        let col = src.read_column("temp", 2, 1).unwrap();
        assert_eq!(col.n_times(), 2);
        assert_eq!(col.n_levels(), 3);
        assert_eq!(col.get(0, 0), 21.0);
        assert_eq!(col.get(1, 2), 1221.0);
    }

    #[test]
    fn test_fill_values_read_as_nan() {
        let layout = VariableLayout::surface(3, 4);
        let src = small_source()
            .with_field_fn("h", layout, |_, _, j, _| if j == 0 { 1.0e37 } else { 50.0 })
            .unwrap();
        assert!(src.read_column("h", 0, 0).unwrap().get(0, 0).is_nan());
        assert_eq!(src.read_column("h", 1, 0).unwrap().get(0, 0), 50.0);
    }

    #[test]
    fn test_out_of_bounds_and_missing() {
        let src = small_source()
            .with_field("h", VariableLayout::surface(3, 4), vec![1.0; 12])
            .unwrap();
        assert!(matches!(
            src.read_column("h", 3, 0),
            Err(SourceError::IndexOutOfBounds { .. })
        ));
        assert!(matches!(
            src.read_column("zeta", 0, 0),
            Err(SourceError::MissingVariable(_))
        ));
    }

    #[test]
    fn test_scalar_and_vector_variables() {
        let src = small_source()
            .with_scalar("hc", 20.0)
            .with_vector("s_rho", vec![-0.75, -0.25]);
        assert!(src.has_variable("hc"));
        assert!(!src.has_variable("temp"));
        assert_eq!(src.layout("s_rho"), None);
        assert_eq!(src.read_scalar("hc").unwrap(), 20.0);
        assert_eq!(src.read_values("s_rho").unwrap(), [-0.75, -0.25]);
    }
}
