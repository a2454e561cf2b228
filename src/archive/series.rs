//! Time-ordered view over many archive files.
//!
//! A [`TimeIndexedSeries`] maps instants to the files that cover them. The
//! lookup uses two parallel arrays of interval starts and stops that are
//! built the first time a query needs them and binary searched from then on.
//!
//! # Boundary rule
//!
//! For a time `t`, let `a` be the last file with `start <= t` and `b` the
//! first file with `stop >= t`. [`resolve`](TimeIndexedSeries::resolve)
//! returns `(min(a, b), max(a, b))`:
//!
//! ```text
//! A: 01:00 ─────────── 00:00
//!                        B: 01:00 ─────────── 00:00
//!            ^ (A, A)     ^ (A, B)      ^ (B, B)
//! ```
//!
//! When two files share a boundary instant, the earlier file comes first.

use std::cell::OnceCell;
use std::ops::Range;
use std::rc::Rc;

use chrono::NaiveDateTime;
use tracing::debug;

use super::dataset::DatasetHandle;
use super::error::ArchiveError;
use crate::grid::{GridCoordinateResolver, GridPosition, InversionConfig};
use crate::io::{SourceOpener, open_source};

/// How the files of an archive are selected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileSelection {
    /// Glob pattern, matches sorted lexically
    Pattern(String),
    /// Explicit file list, in chronological order
    Files(Vec<String>),
}

impl From<&str> for FileSelection {
    fn from(pattern: &str) -> Self {
        Self::Pattern(pattern.to_string())
    }
}

impl From<Vec<String>> for FileSelection {
    fn from(files: Vec<String>) -> Self {
        Self::Files(files)
    }
}

/// Interval starts and stops, shared between a series and its subsets.
#[derive(Debug, Clone)]
struct IntervalIndex {
    starts: Rc<[NaiveDateTime]>,
    stops: Rc<[NaiveDateTime]>,
    range: Range<usize>,
}

impl IntervalIndex {
    fn build(handles: &[DatasetHandle]) -> Result<Self, ArchiveError> {
        let mut starts = Vec::with_capacity(handles.len());
        let mut stops = Vec::with_capacity(handles.len());
        for handle in handles {
            let interval = handle.interval()?;
            starts.push(interval.start);
            stops.push(interval.stop);
        }
        debug!(files = handles.len(), "built interval index");
        Ok(Self {
            starts: starts.into(),
            stops: stops.into(),
            range: 0..handles.len(),
        })
    }

    fn starts(&self) -> &[NaiveDateTime] {
        &self.starts[self.range.clone()]
    }

    fn stops(&self) -> &[NaiveDateTime] {
        &self.stops[self.range.clone()]
    }

    /// Index restricted to `lower..=upper` of this view.
    fn narrow(&self, lower: usize, upper: usize) -> Self {
        let offset = self.range.start;
        Self {
            starts: Rc::clone(&self.starts),
            stops: Rc::clone(&self.stops),
            range: offset + lower..offset + upper + 1,
        }
    }
}

/// Chronologically ordered archive files seen as one time series.
///
/// Handles must be ordered by start time. The series is never empty.
#[derive(Debug, Clone)]
pub struct TimeIndexedSeries {
    handles: Rc<[DatasetHandle]>,
    range: Range<usize>,
    index: OnceCell<IntervalIndex>,
}

impl TimeIndexedSeries {
    /// Create a series from handles ordered by start time.
    pub fn new(handles: Vec<DatasetHandle>) -> Result<Self, ArchiveError> {
        if handles.is_empty() {
            return Err(ArchiveError::EmptySeries);
        }
        let range = 0..handles.len();
        Ok(Self {
            handles: handles.into(),
            range,
            index: OnceCell::new(),
        })
    }

    /// Create a series from file paths, opened with the default backend.
    pub fn from_locators<S: AsRef<str>>(locators: &[S]) -> Result<Self, ArchiveError> {
        Self::from_locators_with_opener(locators, open_source)
    }

    pub fn from_locators_with_opener<S: AsRef<str>>(
        locators: &[S],
        opener: SourceOpener,
    ) -> Result<Self, ArchiveError> {
        Self::new(
            locators
                .iter()
                .map(|l| DatasetHandle::new(l.as_ref()).with_opener(opener))
                .collect(),
        )
    }

    /// Create a series from all files matching a glob pattern.
    pub fn from_pattern(pattern: &str) -> Result<Self, ArchiveError> {
        Self::from_pattern_with_opener(pattern, open_source)
    }

    pub fn from_pattern_with_opener(pattern: &str, opener: SourceOpener) -> Result<Self, ArchiveError> {
        let mut locators = glob::glob(pattern)?
            .map(|entry| entry.map(|path| path.to_string_lossy().into_owned()))
            .collect::<Result<Vec<_>, _>>()?;
        locators.sort();
        debug!(pattern, files = locators.len(), "expanded file pattern");
        Self::from_locators_with_opener(&locators, opener)
    }

    pub fn from_selection(selection: &FileSelection, opener: SourceOpener) -> Result<Self, ArchiveError> {
        match selection {
            FileSelection::Pattern(pattern) => Self::from_pattern_with_opener(pattern, opener),
            FileSelection::Files(files) => Self::from_locators_with_opener(files, opener),
        }
    }

    /// Handles of this view.
    pub fn handles(&self) -> &[DatasetHandle] {
        &self.handles[self.range.clone()]
    }

    pub fn len(&self) -> usize {
        self.range.len()
    }

    pub fn is_empty(&self) -> bool {
        self.range.is_empty()
    }

    pub fn locators(&self) -> impl Iterator<Item = &str> {
        self.handles().iter().map(DatasetHandle::locator)
    }

    pub fn first_start(&self) -> Result<NaiveDateTime, ArchiveError> {
        self.index()?.starts().first().copied().ok_or(ArchiveError::EmptySeries)
    }

    pub fn last_stop(&self) -> Result<NaiveDateTime, ArchiveError> {
        self.index()?.stops().last().copied().ok_or(ArchiveError::EmptySeries)
    }

    fn index(&self) -> Result<&IntervalIndex, ArchiveError> {
        if let Some(index) = self.index.get() {
            return Ok(index);
        }
        let index = IntervalIndex::build(self.handles())?;
        Ok(self.index.get_or_init(|| index))
    }

    /// Indices of the files bracketing `time`.
    pub fn resolve_indices(&self, time: NaiveDateTime) -> Result<(usize, usize), ArchiveError> {
        let index = self.index()?;
        let (starts, stops) = (index.starts(), index.stops());
        let (Some(&first), Some(&last)) = (starts.first(), stops.last()) else {
            return Err(ArchiveError::EmptySeries);
        };
        if time < first || time > last {
            return Err(ArchiveError::OutOfRange { time, first, last });
        }

        let a = starts.partition_point(|&s| s <= time).saturating_sub(1);
        let b = stops.partition_point(|&s| s < time).min(stops.len() - 1);
        Ok((a.min(b), a.max(b)))
    }

    /// Files bracketing `time`: the same file twice when one file covers it.
    pub fn resolve(&self, time: NaiveDateTime) -> Result<(&DatasetHandle, &DatasetHandle), ArchiveError> {
        let (lower, upper) = self.resolve_indices(time)?;
        let handles = self.handles();
        Ok((&handles[lower], &handles[upper]))
    }

    /// View over the files needed to cover `[start, stop]`.
    pub fn subset(&self, start: NaiveDateTime, stop: NaiveDateTime) -> Result<Self, ArchiveError> {
        if start > stop {
            return Err(ArchiveError::InvalidInterval { start, stop });
        }
        let (lower, _) = self.resolve_indices(start)?;
        let (_, upper) = self.resolve_indices(stop)?;

        let index = self
            .index
            .get()
            .map(|parent| OnceCell::from(parent.narrow(lower, upper)))
            .unwrap_or_default();
        let offset = self.range.start;
        debug!(start = %start, stop = %stop, files = upper - lower + 1, "selected subset");
        Ok(Self {
            handles: Rc::clone(&self.handles),
            range: offset + lower..offset + upper + 1,
            index,
        })
    }

    /// Fractional grid position of a point on the grid of the first file.
    pub fn xy(&self, lat: f64, lon: f64) -> Result<GridPosition, ArchiveError> {
        let first = self.handles().first().ok_or(ArchiveError::EmptySeries)?;
        let dataset = first.open()?;
        let (lat_grid, lon_grid) = dataset
            .read_lat_lon()
            .map_err(|e| ArchiveError::source_at(first.locator(), e))?;
        let resolver = GridCoordinateResolver::new(lat_grid, lon_grid, InversionConfig::default())?;
        Ok(resolver.resolve(lat, lon)?)
    }

    /// Check whether this view shares its handles with `other`.
    pub fn shares_handles_with(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.handles, &other.handles)
    }

    /// Check whether the interval index has been built.
    pub fn is_indexed(&self) -> bool {
        self.index.get().is_some()
    }
}
