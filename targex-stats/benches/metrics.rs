use criterion::{black_box, criterion_group, criterion_main, Criterion};
use nalgebra::Point2;
use targex_stats::area::enclosed_area;
use targex_stats::kinematics::peak_velocity;
use targex_stats::metrics::rmse;

/// A noisy outward spiral, shaped like a real cursor trajectory.
fn spiral(samples: usize) -> (Vec<f64>, Vec<Point2<f64>>) {
    let mut timestamps = Vec::with_capacity(samples);
    let mut points = Vec::with_capacity(samples);
    for i in 0..samples {
        let t = i as f64 / 60.0;
        let angle = t * 7.0;
        let radius = 0.4 * (i as f64 / samples as f64);
        timestamps.push(t);
        points.push(Point2::new(radius * angle.sin(), radius * angle.cos()));
    }
    (timestamps, points)
}

fn bench_metrics(c: &mut Criterion) {
    let (timestamps, points) = spiral(512);
    let target = Point2::new(0.0, 0.4);

    c.bench_function("rmse_512", |b| {
        b.iter(|| rmse(black_box(&points), black_box(target)))
    });
    c.bench_function("peak_velocity_512", |b| {
        b.iter(|| peak_velocity(black_box(&timestamps), black_box(&points)))
    });
    c.bench_function("enclosed_area_512", |b| {
        b.iter(|| enclosed_area(black_box(&points)))
    });
}

criterion_group!(benches, bench_metrics);
criterion_main!(benches);
