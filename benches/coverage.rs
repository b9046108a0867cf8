use criterion::{criterion_group, criterion_main, Criterion};
use mapcore::config::ScanConfig;
use mapcore::coverage::{scan, NeverInterrupt, ScanGrid, Viewpoint};
use mapcore::geo::LatLon;
use mapcore::physics::los::{ElevationSource, LosGenerator, LosQuery};
use std::hint::black_box;
use std::sync::Arc;

/// Gentle sinusoidal hills so the LOS loop does real work without DTED files.
struct Hills;

impl ElevationSource for Hills {
    fn elevation(&self, point: LatLon, _level: u8) -> Option<i32> {
        let h = 150.0 * (point.latitude * 40.0).sin() * (point.longitude * 40.0).cos() + 150.0;
        Some(h as i32)
    }
}

fn coverage_benchmark(c: &mut Criterion) {
    let config = ScanConfig::default();
    let los = LosGenerator::with_source(Arc::new(Hills), config.los);

    let grid = ScanGrid {
        north_west: LatLon { latitude: 45.2, longitude: 4.8 },
        south_east: LatLon { latitude: 44.8, longitude: 5.2 },
        width: 32,
        height: 32,
    };
    let viewpoints = vec![
        Viewpoint {
            name: "Bench Mast".to_string(),
            location: LatLon { latitude: 45.0, longitude: 5.0 },
            height_m: 30,
        },
        Viewpoint {
            name: "Bench Ridge".to_string(),
            location: LatLon { latitude: 45.1, longitude: 4.9 },
            height_m: 10,
        },
    ];

    c.bench_function("los_single_query", |b| {
        let query = LosQuery::new(viewpoints[0].location, 30, LatLon::new(45.15, 5.15), 2);
        b.iter(|| los.is_los(black_box(&query)))
    });

    c.bench_function("scan_32x32_two_viewpoints", |b| {
        b.iter(|| {
            scan(
                black_box(&los),
                black_box(&grid),
                black_box(&viewpoints),
                black_box(&config),
                &NeverInterrupt,
                None,
            )
        })
    });
}

criterion_group!(benches, coverage_benchmark);
criterion_main!(benches);
