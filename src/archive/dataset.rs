//! A single archive file.

use std::cell::OnceCell;
use std::fmt;
use std::ops::Deref;
use std::rc::Rc;

use chrono::NaiveDateTime;
use tracing::debug;

use super::error::ArchiveError;
use super::locator::{TimeInterval, parse_locator};
use crate::io::{GridSource, SourceOpener, open_source};

/// One file of a model archive.
///
/// The covered time interval is derived from the file name the first time
/// it is needed. The data itself is only touched inside [`open`](Self::open).
#[derive(Clone)]
pub struct DatasetHandle {
    locator: String,
    interval: OnceCell<TimeInterval>,
    source: Option<Rc<dyn GridSource>>,
    opener: SourceOpener,
}

impl DatasetHandle {
    /// Handle for a file, opened with the default backend.
    pub fn new(locator: impl Into<String>) -> Self {
        Self {
            locator: locator.into(),
            interval: OnceCell::new(),
            source: None,
            opener: open_source,
        }
    }

    /// Handle for a dataset that is already open.
    ///
    /// Opening such a handle never closes the shared source.
    pub fn with_source(locator: impl Into<String>, source: Rc<dyn GridSource>) -> Self {
        Self {
            source: Some(source),
            ..Self::new(locator)
        }
    }

    /// Use a custom function to open the locator.
    pub fn with_opener(mut self, opener: SourceOpener) -> Self {
        self.opener = opener;
        self
    }

    pub fn locator(&self) -> &str {
        &self.locator
    }

    /// Closed interval covered by this file.
    pub fn interval(&self) -> Result<TimeInterval, ArchiveError> {
        if let Some(interval) = self.interval.get() {
            return Ok(*interval);
        }
        let (_, interval) = parse_locator(&self.locator)?;
        Ok(*self.interval.get_or_init(|| interval))
    }

    pub fn start_time(&self) -> Result<NaiveDateTime, ArchiveError> {
        Ok(self.interval()?.start)
    }

    pub fn stop_time(&self) -> Result<NaiveDateTime, ArchiveError> {
        Ok(self.interval()?.stop)
    }

    /// Open the dataset for the lifetime of the returned guard.
    pub fn open(&self) -> Result<OpenDataset<'_>, ArchiveError> {
        let source = match &self.source {
            Some(shared) => OpenSource::Shared(shared.as_ref()),
            None => {
                let owned =
                    (self.opener)(&self.locator).map_err(|e| ArchiveError::source_at(&self.locator, e))?;
                debug!(locator = %self.locator, "opened dataset");
                OpenSource::Owned(owned)
            }
        };
        Ok(OpenDataset {
            locator: &self.locator,
            source,
        })
    }
}

impl fmt::Debug for DatasetHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatasetHandle")
            .field("locator", &self.locator)
            .field("interval", &self.interval.get())
            .field("pre_opened", &self.source.is_some())
            .finish()
    }
}

enum OpenSource<'a> {
    Shared(&'a (dyn GridSource + 'static)),
    Owned(Box<dyn GridSource>),
}

/// An open dataset.
///
/// Dereferences to the underlying [`GridSource`]. Datasets opened by the
/// handle are released when the guard is dropped.
pub struct OpenDataset<'a> {
    locator: &'a str,
    source: OpenSource<'a>,
}

impl OpenDataset<'_> {
    pub fn locator(&self) -> &str {
        self.locator
    }
}

impl Deref for OpenDataset<'_> {
    type Target = dyn GridSource;

    fn deref(&self) -> &Self::Target {
        match &self.source {
            OpenSource::Shared(source) => *source,
            OpenSource::Owned(source) => source.as_ref(),
        }
    }
}

impl Drop for OpenDataset<'_> {
    fn drop(&mut self) {
        if matches!(self.source, OpenSource::Owned(_)) {
            debug!(locator = %self.locator, "released dataset");
        }
    }
}
