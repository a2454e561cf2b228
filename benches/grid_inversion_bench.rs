//! Benchmarks for curvilinear grid inversion.
//!
//! Run with: `cargo bench --bench grid_inversion_bench`
//!
//! Compares cold solves (cache disabled) with repeated lookups of the same
//! point, on grids of increasing size.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use faer::Mat;
use norkyst_rs::grid::{GridCoordinateResolver, InversionConfig};

/// Rotated grid with mild curvature, roughly 800 m spacing at 60N.
fn setup_grid(n_y: usize, n_x: usize, config: InversionConfig) -> GridCoordinateResolver {
    let (s, c) = 30f64.to_radians().sin_cos();
    let lat = Mat::from_fn(n_y, n_x, |j, i| {
        let (x, y) = (i as f64, j as f64);
        60.0 + 0.0072 * (x * s + y * c) + 1.0e-7 * x * y
    });
    let lon = Mat::from_fn(n_y, n_x, |j, i| {
        let (x, y) = (i as f64, j as f64);
        5.0 + 0.0144 * (x * c - y * s)
    });
    GridCoordinateResolver::new(lat, lon, config).unwrap()
}

fn bench_cold_resolve(c: &mut Criterion) {
    let mut group = c.benchmark_group("resolve_cold");

    for (n_y, n_x) in [(50, 50), (200, 300), (580, 900)] {
        let resolver = setup_grid(n_y, n_x, InversionConfig::default().with_cache_capacity(0));
        let (lat, lon) = resolver.forward(n_x as f64 * 0.37, n_y as f64 * 0.61);

        group.bench_with_input(
            BenchmarkId::new("nodes", format!("{}x{}", n_y, n_x)),
            &(n_y * n_x),
            |b, _| {
                b.iter(|| resolver.resolve(black_box(lat), black_box(lon)));
            },
        );
    }

    group.finish();
}

fn bench_cached_resolve(c: &mut Criterion) {
    let mut group = c.benchmark_group("resolve_cached");

    let resolver = setup_grid(580, 900, InversionConfig::default());
    let (lat, lon) = resolver.forward(333.3, 353.8);
    let _ = resolver.resolve(lat, lon);

    group.bench_function("580x900", |b| {
        b.iter(|| resolver.resolve(black_box(lat), black_box(lon)));
    });

    group.finish();
}

criterion_group!(benches, bench_cold_resolve, bench_cached_resolve);
criterion_main!(benches);
