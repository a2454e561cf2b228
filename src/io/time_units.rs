//! CF-conventions time coordinate decoding.
//!
//! ROMS writes `ocean_time` as an offset from a reference date, described by
//! a `units` attribute such as `"seconds since 1970-01-01 00:00:00"`.

use chrono::{NaiveDate, NaiveDateTime, TimeDelta};

use super::source::SourceError;

/// Parsed `"<unit> since <reference>"` attribute.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CfTimeUnits {
    /// Length of one unit in seconds
    pub seconds_per_unit: f64,
    /// Reference instant
    pub epoch: NaiveDateTime,
}

impl CfTimeUnits {
    /// Parse a CF `units` string.
    pub fn parse(units: &str) -> Result<Self, SourceError> {
        let invalid = || SourceError::InvalidData(format!("unsupported time units: {units:?}"));

        let (unit, reference) = units.split_once(" since ").ok_or_else(invalid)?;
        let seconds_per_unit = match unit.trim().to_ascii_lowercase().as_str() {
            "second" | "seconds" | "sec" | "secs" | "s" => 1.0,
            "minute" | "minutes" | "min" | "mins" => 60.0,
            "hour" | "hours" | "hr" | "hrs" | "h" => 3600.0,
            "day" | "days" | "d" => 86400.0,
            _ => return Err(invalid()),
        };
        let epoch = parse_reference(reference).ok_or_else(invalid)?;

        Ok(Self { seconds_per_unit, epoch })
    }

    /// Convert a coordinate value to an instant, rounded to the millisecond.
    pub fn to_datetime(&self, value: f64) -> Result<NaiveDateTime, SourceError> {
        if !value.is_finite() {
            return Err(SourceError::InvalidData(format!("non-finite time value {value}")));
        }
        let millis = (value * self.seconds_per_unit * 1000.0).round() as i64;
        TimeDelta::try_milliseconds(millis)
            .and_then(|delta| self.epoch.checked_add_signed(delta))
            .ok_or_else(|| SourceError::InvalidData(format!("time value {value} out of range")))
    }
}

fn parse_reference(reference: &str) -> Option<NaiveDateTime> {
    let trimmed = reference
        .trim()
        .trim_end_matches("UTC")
        .trim_end_matches('Z')
        .trim_end_matches("+00:00")
        .trim();

    const FORMATS: [&str; 5] = [
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H",
    ];
    FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(trimmed, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn datetime(y: i32, m: u32, d: u32, h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d).unwrap().and_hms_opt(h, 0, 0).unwrap()
    }

    #[test]
    fn test_roms_seconds_since_1970() {
        let units = CfTimeUnits::parse("seconds since 1970-01-01 00:00:00").unwrap();
        assert_eq!(units.seconds_per_unit, 1.0);
        let t = units.to_datetime(1_441_587_600.0).unwrap();
        assert_eq!(t, datetime(2015, 9, 7, 1));
    }

    #[test]
    fn test_hours_and_days() {
        let hours = CfTimeUnits::parse("hours since 2021-02-03T00:00:00Z").unwrap();
        assert_eq!(hours.to_datetime(25.0).unwrap(), datetime(2021, 2, 4, 1));

        let days = CfTimeUnits::parse("days since 2021-02-03").unwrap();
        assert_eq!(days.to_datetime(0.5).unwrap(), datetime(2021, 2, 3, 12));
    }

    #[test]
    fn test_rejects_unknown_units() {
        assert!(CfTimeUnits::parse("fortnights since 2000-01-01").is_err());
        assert!(CfTimeUnits::parse("seconds").is_err());
        assert!(CfTimeUnits::parse("seconds since yesterday").is_err());
    }
}
