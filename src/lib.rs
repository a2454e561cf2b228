//! # norkyst-rs
//!
//! Time-indexed access to NorKyst/ROMS ocean model archives and extraction
//! of vertical profile time series at arbitrary points.
//!
//! This crate provides:
//! - Archive files seen as one time series (file-name time conventions,
//!   binary-search lookup, subset views)
//! - Inversion of curvilinear grid coordinates
//! - Profile extraction with boundary de-duplication, s-coordinate depths,
//!   EOS-80 density and velocity rotation to a compass direction
//! - A NetCDF backend (`netcdf` feature) and an in-memory backend

pub mod archive;
pub mod equations;
pub mod grid;
pub mod io;
pub mod profile;
pub mod progress;
pub mod vertical;

pub use archive::{
    ArchiveError, DatasetHandle, FileSelection, OpenDataset, TimeIndexedSeries, TimeInterval,
};
pub use grid::{GridCell, GridCoordinateResolver, GridError, GridPosition, InversionConfig};
pub use io::{GridShape, GridSource, MemorySource, SourceError, SourceOpener};
#[cfg(feature = "netcdf")]
pub use io::NetcdfSource;
pub use profile::{
    ExtractConfig, Profile, ProfileError, ProfileExtractor, ProfileRecord, VariableNames,
};
