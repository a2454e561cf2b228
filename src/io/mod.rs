//! Data access for ocean model archives.
//!
//! This module provides:
//! - **GridSource**: the contract an open model dataset fulfils (grid, time
//!   coordinate, single-point columns)
//! - **MemorySource**: an in-memory dataset for pre-opened data and tests
//! - **NetcdfSource**: NorKyst/ROMS NetCDF files (requires `netcdf` feature)
//! - **CF time units**: decoding of `ocean_time`-style coordinates
//! - **Projections**: bounding boxes and local metric for grid searches
//!
//! # Example
//!
//! ```ignore
//! use norkyst_rs::io::{open_source, GridSource};
//!
//! let src = open_source("norkyst_800m_his.nc4_2021020301-2021020400")?;
//! let times = src.read_times()?;
//! let salt = src.read_column("salt", 120, 340)?;
//! ```

mod memory;
#[cfg(feature = "netcdf")]
mod netcdf_io;
mod projection;
mod source;
mod time_units;

pub use memory::MemorySource;
#[cfg(feature = "netcdf")]
pub use netcdf_io::NetcdfSource;
pub use projection::{GeoBoundingBox, LocalProjection};
pub use source::{Column, GridShape, GridSource, SourceError, VariableLayout, is_valid_f64};
pub use time_units::CfTimeUnits;

/// Function used to open an archive locator.
pub type SourceOpener = fn(&str) -> Result<Box<dyn GridSource>, SourceError>;

/// Open a locator as a NetCDF file.
///
/// Fails with [`SourceError::FeatureDisabled`] when built without the
/// `netcdf` feature.
pub fn open_source(locator: &str) -> Result<Box<dyn GridSource>, SourceError> {
    #[cfg(feature = "netcdf")]
    {
        Ok(Box::new(NetcdfSource::open(locator)?))
    }
    #[cfg(not(feature = "netcdf"))]
    {
        let _ = locator;
        Err(SourceError::FeatureDisabled)
    }
}
