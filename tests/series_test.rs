//! Integration tests for archive series: file discovery, time lookup and
//! subset views.

use std::fs::File;
use std::rc::Rc;

use chrono::{NaiveDate, NaiveDateTime};
use faer::Mat;
use norkyst_rs::archive::{ArchiveError, DatasetHandle, FileSelection, TimeIndexedSeries};
use norkyst_rs::io::{GridSource, MemorySource, SourceError};

fn at(day: u32, hour: u32, minute: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2021, 2, day)
        .unwrap()
        .and_hms_opt(hour, minute, 0)
        .unwrap()
}

const FIRST: &str = "norkyst_800m_his.nc4_2021020301-2021020400";
const SECOND: &str = "norkyst_800m_his.nc4_2021020401-2021020500";

fn small_grid() -> MemorySource {
    let lat = Mat::from_fn(5, 6, |j, i| 60.0 + 0.01 * j as f64 + 0.001 * i as f64);
    let lon = Mat::from_fn(5, 6, |j, i| 5.0 + 0.02 * i as f64 - 0.002 * j as f64);
    MemorySource::new(lat, lon).unwrap()
}

fn open_small_grid(locator: &str) -> Result<Box<dyn GridSource>, SourceError> {
    Ok(Box::new(small_grid().with_name(locator)))
}

#[test]
fn test_boundary_example() {
    let series = TimeIndexedSeries::from_locators(&[FIRST, SECOND]).unwrap();

    let (lower, upper) = series.resolve(at(4, 0, 0)).unwrap();
    assert_eq!((lower.locator(), upper.locator()), (FIRST, FIRST));

    let (lower, upper) = series.resolve(at(4, 0, 30)).unwrap();
    assert_eq!((lower.locator(), upper.locator()), (FIRST, SECOND));

    let (lower, upper) = series.resolve(at(4, 1, 0)).unwrap();
    assert_eq!((lower.locator(), upper.locator()), (SECOND, SECOND));
}

#[test]
fn test_repeated_queries_are_stable() {
    let series = TimeIndexedSeries::from_locators(&[FIRST, SECOND]).unwrap();
    assert!(!series.is_indexed());
    let first = series.resolve_indices(at(3, 18, 0)).unwrap();
    assert!(series.is_indexed());
    for _ in 0..5 {
        assert_eq!(series.resolve_indices(at(3, 18, 0)).unwrap(), first);
    }
}

#[test]
fn test_many_files_lookup() {
    let locators: Vec<String> = (0..1000)
        .map(|n| {
            let day = NaiveDate::from_ymd_opt(2018, 1, 1).unwrap() + chrono::Days::new(n);
            format!("norkyst_800m_avg.nc4_{}12", day.format("%Y%m%d"))
        })
        .collect();
    let series = TimeIndexedSeries::from_locators(&locators).unwrap();

    let query = NaiveDate::from_ymd_opt(2019, 6, 15).unwrap().and_hms_opt(18, 0, 0).unwrap();
    let (lower, upper) = series.resolve(query).unwrap();
    assert_eq!(lower.locator(), "norkyst_800m_avg.nc4_2019061512");
    assert_eq!(upper.locator(), "norkyst_800m_avg.nc4_2019061612");
}

#[test]
fn test_pattern_sorted_lexically() {
    let dir = tempfile::tempdir().unwrap();
    for name in [
        "norkyst_800m_his.nc4_2021020501-2021020600",
        "norkyst_800m_his.nc4_2021020301-2021020400",
        "norkyst_800m_his.nc4_2021020401-2021020500",
        "unrelated.txt",
    ] {
        File::create(dir.path().join(name)).unwrap();
    }
    let pattern = format!("{}/norkyst_800m_his.nc4_*", dir.path().display());

    let series = TimeIndexedSeries::from_pattern(&pattern).unwrap();
    assert_eq!(series.len(), 3);
    let names: Vec<String> = series
        .locators()
        .map(|l| l.rsplit('/').next().unwrap_or(l).to_string())
        .collect();
    assert_eq!(
        names,
        [
            "norkyst_800m_his.nc4_2021020301-2021020400",
            "norkyst_800m_his.nc4_2021020401-2021020500",
            "norkyst_800m_his.nc4_2021020501-2021020600",
        ]
    );
    assert_eq!(series.first_start().unwrap(), at(3, 1, 0));
    assert_eq!(series.last_stop().unwrap(), at(6, 0, 0));
}

#[test]
fn test_pattern_errors() {
    let dir = tempfile::tempdir().unwrap();
    let nothing = format!("{}/*.nc4_*", dir.path().display());
    assert!(matches!(
        TimeIndexedSeries::from_pattern(&nothing),
        Err(ArchiveError::EmptySeries)
    ));
    assert!(matches!(
        TimeIndexedSeries::from_pattern("norkyst[.nc"),
        Err(ArchiveError::Pattern(_))
    ));
}

#[test]
fn test_selection_variants() {
    let dir = tempfile::tempdir().unwrap();
    File::create(dir.path().join(FIRST)).unwrap();
    let pattern = FileSelection::Pattern(format!("{}/norkyst*", dir.path().display()));
    let files = FileSelection::from(vec![FIRST.to_string(), SECOND.to_string()]);

    let from_pattern = TimeIndexedSeries::from_selection(&pattern, open_small_grid).unwrap();
    let from_files = TimeIndexedSeries::from_selection(&files, open_small_grid).unwrap();
    assert_eq!(from_pattern.len(), 1);
    assert_eq!(from_files.len(), 2);
}

#[test]
fn test_subset_shares_parent_handles() {
    let series = TimeIndexedSeries::from_locators(&[
        FIRST,
        SECOND,
        "norkyst_800m_his.nc4_2021020501-2021020600",
    ])
    .unwrap();
    let sub = series.subset(at(4, 0, 30), at(4, 12, 0)).unwrap();

    assert_eq!(sub.locators().collect::<Vec<_>>(), [FIRST, SECOND]);
    assert!(sub.shares_handles_with(&series));
    assert!(std::ptr::eq(&sub.handles()[0], &series.handles()[0]));
    assert_eq!(series.len(), 3);

    // The parent keeps answering over its full range
    assert_eq!(series.resolve_indices(at(5, 12, 0)).unwrap(), (2, 2));
    assert!(matches!(
        sub.resolve(at(5, 12, 0)),
        Err(ArchiveError::OutOfRange { .. })
    ));
}

#[test]
fn test_subset_outside_archive() {
    let series = TimeIndexedSeries::from_locators(&[FIRST, SECOND]).unwrap();
    assert!(matches!(
        series.subset(at(3, 0, 0), at(4, 0, 0)),
        Err(ArchiveError::OutOfRange { .. })
    ));
}

#[test]
fn test_xy_on_first_file() {
    let series = TimeIndexedSeries::from_locators_with_opener(&[FIRST, SECOND], open_small_grid).unwrap();
    let pos = series.xy(60.02 + 0.003, 5.06 - 0.004).unwrap();
    assert!((pos.x - 3.0).abs() < 1e-6, "{pos:?}");
    assert!((pos.y - 2.0).abs() < 1e-6, "{pos:?}");
}

#[test]
fn test_xy_with_preopened_dataset() {
    let shared: Rc<dyn GridSource> = Rc::new(small_grid());
    let handles = vec![
        DatasetHandle::with_source(FIRST, Rc::clone(&shared)),
        DatasetHandle::with_source(SECOND, Rc::clone(&shared)),
    ];
    let series = TimeIndexedSeries::new(handles).unwrap();
    assert!(matches!(series.xy(75.0, 5.0), Err(ArchiveError::Grid(_))));
    assert!(series.xy(60.0, 5.0).is_ok());
}

#[test]
fn test_xy_without_backend() {
    let series = TimeIndexedSeries::from_locators(&[FIRST]).unwrap();
    assert!(matches!(series.xy(60.0, 5.0), Err(ArchiveError::Source { .. })));
}
