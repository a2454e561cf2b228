use chrono::NaiveDateTime;
use thiserror::Error;

use crate::grid::GridError;
use crate::io::SourceError;

/// Error type for archive operations.
#[derive(Debug, Error)]
pub enum ArchiveError {
    /// File name matches neither naming convention
    #[error("Unknown date format in file name: {locator}")]
    LocatorFormat { locator: String },

    /// Requested time outside the archive's covered interval
    #[error("Time value outside range: {time} (archive covers {first} to {last})")]
    OutOfRange {
        time: NaiveDateTime,
        first: NaiveDateTime,
        last: NaiveDateTime,
    },

    /// Series without datasets
    #[error("Data series contains no datasets")]
    EmptySeries,

    /// Interval with start after stop
    #[error("Invalid time interval: {start} is after {stop}")]
    InvalidInterval {
        start: NaiveDateTime,
        stop: NaiveDateTime,
    },

    /// Malformed glob pattern
    #[error("Invalid file pattern: {0}")]
    Pattern(#[from] glob::PatternError),

    /// Unreadable path while expanding a pattern
    #[error("Cannot read path matched by pattern: {0}")]
    Glob(#[from] glob::GlobError),

    /// Failure opening or reading a dataset
    #[error("Cannot read {locator}: {source}")]
    Source {
        locator: String,
        #[source]
        source: SourceError,
    },

    /// Grid lookup on the series' first dataset failed
    #[error(transparent)]
    Grid(#[from] GridError),
}

impl ArchiveError {
    pub(crate) fn source_at(locator: &str, source: SourceError) -> Self {
        Self::Source {
            locator: locator.to_string(),
            source,
        }
    }
}
