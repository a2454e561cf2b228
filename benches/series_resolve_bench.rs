//! Benchmarks for time lookup over archive series.
//!
//! Run with: `cargo bench --bench series_resolve_bench`

use chrono::{Days, NaiveDate};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use norkyst_rs::archive::TimeIndexedSeries;

/// One daily file per day from 2017-01-01, in the interval convention.
fn setup_series(n_files: u64) -> TimeIndexedSeries {
    let origin = NaiveDate::from_ymd_opt(2017, 1, 1).unwrap();
    let locators: Vec<String> = (0..n_files)
        .map(|n| {
            let day = origin + Days::new(n);
            let next = day + Days::new(1);
            format!(
                "norkyst_800m_his.nc4_{}01-{}00",
                day.format("%Y%m%d"),
                next.format("%Y%m%d")
            )
        })
        .collect();
    TimeIndexedSeries::from_locators(&locators).unwrap()
}

fn bench_resolve(c: &mut Criterion) {
    let mut group = c.benchmark_group("series_resolve");

    for n_files in [30, 365, 2000] {
        let series = setup_series(n_files);
        let query = NaiveDate::from_ymd_opt(2017, 1, 1).unwrap().and_hms_opt(0, 30, 0).unwrap()
            + Days::new(n_files / 2);
        // Build the index outside the measurement
        let _ = series.resolve_indices(query);

        group.bench_with_input(BenchmarkId::new("files", n_files), &n_files, |b, _| {
            b.iter(|| series.resolve_indices(black_box(query)));
        });
    }

    group.finish();
}

fn bench_subset(c: &mut Criterion) {
    let mut group = c.benchmark_group("series_subset");

    let series = setup_series(2000);
    let start = NaiveDate::from_ymd_opt(2018, 3, 1).unwrap().and_hms_opt(6, 0, 0).unwrap();
    let stop = NaiveDate::from_ymd_opt(2018, 9, 1).unwrap().and_hms_opt(18, 0, 0).unwrap();
    let _ = series.first_start();

    group.bench_function("half_year", |b| {
        b.iter(|| series.subset(black_box(start), black_box(stop)));
    });

    group.finish();
}

criterion_group!(benches, bench_resolve, bench_subset);
criterion_main!(benches);
