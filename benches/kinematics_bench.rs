// Benchmark for the inverse kinematics solver and interpolated moves
// Run with: cargo bench

use criterion::{Criterion, criterion_group, criterion_main};
use scara_rs::motion::{Kinematics, MotionController};
use scara_rs::{Config, Point2, SimulatedPwm};
use std::hint::black_box;
use std::time::Duration;

fn bench_inverse(c: &mut Criterion) {
    let robot = Config::default().robot.kinematics();
    let targets: Vec<Point2> = (0..1000)
        .map(|i| Point2::new(-60.0 + (i % 100) as f64 * 1.2, 20.0 + (i / 100) as f64 * 8.0))
        .collect();
    c.bench_function("inverse 1k targets", |b| {
        b.iter(|| {
            let solved = targets
                .iter()
                .filter(|t| robot.inverse(black_box(**t)).is_ok())
                .count();
            black_box(solved);
        });
    });
}

fn bench_interpolated_move(c: &mut Criterion) {
    let mut config = Config::default();
    config.robot.home = [-40.0, 20.0];
    let rt = tokio::runtime::Runtime::new().unwrap();
    c.bench_function("interpolate 100 waypoints", |b| {
        b.iter(|| {
            rt.block_on(async {
                let mut controller = MotionController::new(&config, SimulatedPwm::new()).unwrap();
                let report = controller
                    .interpolated_move(Point2::new(-40.0, 80.0), 100, Duration::ZERO)
                    .await
                    .unwrap();
                assert_eq!(report.waypoints, 100);
            });
        });
    });
}

criterion_group!(benches, bench_inverse, bench_interpolated_move);
criterion_main!(benches);
