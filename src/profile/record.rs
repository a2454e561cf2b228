use chrono::NaiveDateTime;

use crate::grid::{GridCell, GridPosition};

/// One time step of a vertical profile.
///
/// All level vectors have the same length. Scalars keep `NaN` where the
/// model has no data; velocities are `0.0` on land.
#[derive(Debug, Clone, PartialEq)]
pub struct ProfileRecord {
    pub time: NaiveDateTime,
    /// Metres below the surface
    pub depth: Vec<f64>,
    /// Temperature (°C)
    pub temp: Vec<f64>,
    /// Salinity (PSU)
    pub salt: Vec<f64>,
    /// Density (kg/m³)
    pub dens: Vec<f64>,
    /// Velocity along the azimuth (m/s)
    pub u: Vec<f64>,
    /// Velocity across the azimuth, positive to the left (m/s)
    pub v: Vec<f64>,
}

impl ProfileRecord {
    pub fn n_levels(&self) -> usize {
        self.depth.len()
    }
}

/// Vertical profile time series at a fixed location.
#[derive(Debug, Clone, PartialEq)]
pub struct Profile {
    pub lat: f64,
    pub lon: f64,
    /// Degrees clockwise from north
    pub azimuth: f64,
    /// Fractional grid position of the query point
    pub position: GridPosition,
    /// Grid node the profile was read from
    pub cell: GridCell,
    /// Strictly increasing in time
    pub records: Vec<ProfileRecord>,
}

impl Profile {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn times(&self) -> impl Iterator<Item = NaiveDateTime> + '_ {
        self.records.iter().map(|r| r.time)
    }

    pub fn first_time(&self) -> Option<NaiveDateTime> {
        self.records.first().map(|r| r.time)
    }

    pub fn last_time(&self) -> Option<NaiveDateTime> {
        self.records.last().map(|r| r.time)
    }

    /// Values of one level across all records, e.g. `profile.level(0, |r| &r.temp)`.
    pub fn level<F>(&self, k: usize, field: F) -> Vec<f64>
    where
        F: Fn(&ProfileRecord) -> &Vec<f64>,
    {
        self.records
            .iter()
            .map(|r| field(r).get(k).copied().unwrap_or(f64::NAN))
            .collect()
    }
}
