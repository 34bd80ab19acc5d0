//! Performance benchmarks for track-log-lib
//!
//! Run with: cargo bench --package track-log-lib

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use time::macros::datetime;
use track_log_lib::{
    EncodeOptions, ExtensionElement, Gpx, Track, TrackSegment, Waypoint, WireVersion, geometry,
};

const TPX: &str = "http://www.garmin.com/xmlschemas/TrackPointExtension/v1";

/// Generate a realistic GPX track with the specified number of points.
fn generate_gpx_track(num_points: usize, base_lat: f64, base_lon: f64) -> Gpx {
    let start = datetime!(2024-06-01 07:00:00);
    let mut segment = TrackSegment::default();

    for i in 0..num_points {
        let t = i as f64 / num_points as f64;
        let mut point = Waypoint::new(
            base_lat + t * 0.1 + (t * 50.0).sin() * 0.001,
            base_lon + t * 0.1 + (t * 30.0).cos() * 0.001,
        );
        point.elevation = Some(300.0 + (t * 20.0).sin() * 50.0);
        point.time = Some(start + time::Duration::seconds(i as i64));

        let mut hr = ExtensionElement::new(Some(TPX), "hr");
        hr.text = Some((120 + i % 40).to_string());
        let mut extension = ExtensionElement::new(Some(TPX), "TrackPointExtension");
        extension.children.push(hr);
        point.extensions.push(extension);

        segment.points.push(point);
    }

    let mut gpx = Gpx::default();
    gpx.namespaces.insert("gpxtpx", TPX);
    gpx.tracks.push(Track {
        name: Some("Benchmark".to_string()),
        segments: vec![segment],
        ..Default::default()
    });
    gpx
}

// ============================================================================
// Core Benchmarks - Key performance indicators
// ============================================================================

fn bench_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("decode");
    group.sample_size(20);

    for num_points in [1_000, 10_000] {
        let xml = generate_gpx_track(num_points, 51.5, -0.1)
            .to_xml(WireVersion::V1_1, &EncodeOptions::default())
            .unwrap();

        group.throughput(Throughput::Bytes(xml.len() as u64));
        group.bench_with_input(BenchmarkId::new("v1_1", num_points), &xml, |b, xml| {
            b.iter(|| Gpx::parse(xml).unwrap());
        });
    }

    group.finish();
}

fn bench_encode(c: &mut Criterion) {
    let mut group = c.benchmark_group("encode");
    group.sample_size(20);

    let gpx = generate_gpx_track(10_000, 51.5, -0.1);
    group.throughput(Throughput::Elements(10_000));

    for version in WireVersion::ALL {
        group.bench_function(BenchmarkId::new("10k", version), |b| {
            b.iter(|| gpx.to_xml(version, &EncodeOptions::compact()).unwrap());
        });
    }

    group.finish();
}

fn bench_geometry(c: &mut Criterion) {
    let mut group = c.benchmark_group("geometry");

    let gpx = generate_gpx_track(50_000, 51.5, -0.1);
    let points = &gpx.tracks[0].segments[0].points;

    group.bench_function("length_2d_50k", |b| {
        b.iter(|| gpx.length_2d());
    });

    group.bench_function("simplify_50k", |b| {
        b.iter(|| geometry::simplify_indices(points, 100.0));
    });

    group.finish();
}

// ============================================================================
// Criterion Configuration
// ============================================================================

criterion_group!(benches, bench_decode, bench_encode, bench_geometry);

criterion_main!(benches);
