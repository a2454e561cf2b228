//! Archive files and their time coverage.
//!
//! - **locator**: time interval encoded in a file name
//! - **DatasetHandle**: one file, opened on demand through a scoped guard
//! - **TimeIndexedSeries**: many files as one time series, with
//!   binary-search lookup and subset views

mod dataset;
mod error;
mod locator;
mod series;

pub use dataset::{DatasetHandle, OpenDataset};
pub use error::ArchiveError;
pub use locator::{LocatorConvention, TimeInterval, parse_locator};
pub use series::{FileSelection, TimeIndexedSeries};
