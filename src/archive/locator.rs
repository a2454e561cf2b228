//! Time coverage encoded in archive file names.
//!
//! NorKyst archives use two naming conventions:
//!
//! ```text
//! norfjords_160m_his.nc4_2015090701-2015090704   interval: YYYYMMDDHH-YYYYMMDDHH
//! norkyst_800m_avg.nc4_2021020312                instant:  _YYYYMMDD12
//! ```
//!
//! The interval convention is tried first. Instant files always refer to
//! 12:00 on the given date.

use chrono::{NaiveDate, NaiveDateTime};

use super::error::ArchiveError;

const INTERVAL_SUFFIX_LEN: usize = 21;
const INSTANT_SUFFIX_LEN: usize = 11;
const INSTANT_HOUR: u32 = 12;

/// Closed time interval `[start, stop]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimeInterval {
    pub start: NaiveDateTime,
    pub stop: NaiveDateTime,
}

impl TimeInterval {
    /// Create an interval, `None` if `start > stop`.
    pub fn new(start: NaiveDateTime, stop: NaiveDateTime) -> Option<Self> {
        (start <= stop).then_some(Self { start, stop })
    }

    /// Degenerate interval covering a single instant.
    pub fn instant(time: NaiveDateTime) -> Self {
        Self { start: time, stop: time }
    }

    #[inline]
    pub fn contains(&self, time: NaiveDateTime) -> bool {
        self.start <= time && time <= self.stop
    }
}

/// File naming convention.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocatorConvention {
    /// History files covering `<start>-<stop>`
    Interval,
    /// Average files at a single reference instant
    Instant,
}

/// Derive the covered interval from a file name.
pub fn parse_locator(locator: &str) -> Result<(LocatorConvention, TimeInterval), ArchiveError> {
    let bytes = locator.as_bytes();
    let format_error = || ArchiveError::LocatorFormat {
        locator: locator.to_string(),
    };

    if let Some(tail) = suffix(bytes, INTERVAL_SUFFIX_LEN) {
        let (start, rest) = tail.split_at(10);
        if all_digits(start) && rest[0] == b'-' && all_digits(&rest[1..]) {
            let start = hour_stamp(start).ok_or_else(format_error)?;
            let stop = hour_stamp(&rest[1..]).ok_or_else(format_error)?;
            let interval = TimeInterval::new(start, stop).ok_or_else(format_error)?;
            return Ok((LocatorConvention::Interval, interval));
        }
    }

    if let Some(tail) = suffix(bytes, INSTANT_SUFFIX_LEN) {
        if tail[0] == b'_' && all_digits(&tail[1..9]) && &tail[9..] == b"12" {
            let time = date_stamp(&tail[1..9], INSTANT_HOUR).ok_or_else(format_error)?;
            return Ok((LocatorConvention::Instant, TimeInterval::instant(time)));
        }
    }

    Err(format_error())
}

fn suffix(bytes: &[u8], len: usize) -> Option<&[u8]> {
    bytes.len().checked_sub(len).map(|n| &bytes[n..])
}

fn all_digits(bytes: &[u8]) -> bool {
    bytes.iter().all(u8::is_ascii_digit)
}

fn number(digits: &[u8]) -> u32 {
    digits
        .iter()
        .fold(0, |acc, &d| acc * 10 + u32::from(d - b'0'))
}

/// `YYYYMMDD` at a fixed hour.
fn date_stamp(digits: &[u8], hour: u32) -> Option<NaiveDateTime> {
    let year = number(&digits[0..4]) as i32;
    let month = number(&digits[4..6]);
    let day = number(&digits[6..8]);
    NaiveDate::from_ymd_opt(year, month, day)?.and_hms_opt(hour, 0, 0)
}

/// `YYYYMMDDHH`.
fn hour_stamp(digits: &[u8]) -> Option<NaiveDateTime> {
    date_stamp(&digits[0..8], number(&digits[8..10]))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn datetime(y: i32, m: u32, d: u32, h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d).unwrap().and_hms_opt(h, 0, 0).unwrap()
    }

    #[test]
    fn test_interval_file_name() {
        let (conv, interval) = parse_locator("my_norkyst.nc4_2021020304-2025060708").unwrap();
        assert_eq!(conv, LocatorConvention::Interval);
        assert_eq!(interval.start, datetime(2021, 2, 3, 4));
        assert_eq!(interval.stop, datetime(2025, 6, 7, 8));
    }

    #[test]
    fn test_instant_file_name() {
        let (conv, interval) = parse_locator("my_norkyst.nc4_2021020312").unwrap();
        assert_eq!(conv, LocatorConvention::Instant);
        assert_eq!(interval.start, datetime(2021, 2, 3, 12));
        assert_eq!(interval.stop, interval.start);
    }

    #[test]
    fn test_full_path_is_accepted() {
        let (_, interval) =
            parse_locator("/data/norkyst/norfjords_160m_his.nc4_2015090701-2015090704").unwrap();
        assert_eq!(interval.start, datetime(2015, 9, 7, 1));
        assert_eq!(interval.stop, datetime(2015, 9, 7, 4));
    }

    #[test]
    fn test_unknown_formats_are_rejected() {
        for name in [
            "norkyst.nc",
            "norkyst.nc4_2021020313",
            "norkyst.nc4_20210203",
            "norkyst.nc4-2021020312",
            "norkyst.nc4_2021020304_2021020308",
            "norkyst.nc4_2021020304-2021020308.nc",
            "",
        ] {
            assert!(
                matches!(parse_locator(name), Err(ArchiveError::LocatorFormat { .. })),
                "{name} should be rejected"
            );
        }
    }

    #[test]
    fn test_invalid_calendar_values_are_rejected() {
        assert!(parse_locator("x_2021023012").is_err());
        assert!(parse_locator("x_2021020325-2021020400").is_err());
    }

    #[test]
    fn test_reversed_interval_is_rejected() {
        assert!(parse_locator("x_2021020400-2021020300").is_err());
    }

    #[test]
    fn test_interval_contains() {
        let interval = TimeInterval::new(datetime(2021, 2, 3, 1), datetime(2021, 2, 4, 0)).unwrap();
        assert!(interval.contains(datetime(2021, 2, 3, 1)));
        assert!(interval.contains(datetime(2021, 2, 4, 0)));
        assert!(!interval.contains(datetime(2021, 2, 4, 1)));
        assert!(TimeInterval::new(datetime(2021, 2, 4, 0), datetime(2021, 2, 3, 0)).is_none());
    }
}
