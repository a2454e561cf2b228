//! Vertical profile time series at a point.
//!
//! - **ProfileExtractor**: locates a point once and reads every file of an
//!   archive subset into one continuous [`Profile`]
//! - **rotation**: grid velocities to along/cross components of an azimuth
//!
//! # Example
//!
//! ```ignore
//! use norkyst_rs::archive::FileSelection;
//! use norkyst_rs::profile::{ExtractConfig, ProfileExtractor};
//!
//! let mut extractor = ProfileExtractor::new(ExtractConfig::default());
//! let files = FileSelection::Pattern("/data/norkyst/norkyst_800m_his.nc4_*".into());
//! let profile = extractor.extract(&files, start, stop, 59.03, 5.68, 45.0)?;
//! for record in &profile.records {
//!     println!("{} {:?}", record.time, record.u);
//! }
//! ```

mod extractor;
mod record;
mod rotation;

pub use extractor::{ExtractConfig, ProfileError, ProfileExtractor, VariableNames};
pub use record::{Profile, ProfileRecord};
pub use rotation::{AzimuthRotation, rotate_to_azimuth};
