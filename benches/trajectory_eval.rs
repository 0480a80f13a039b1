//! Benchmark for trajectory playback: random-access position/velocity
//! queries against a multi-segment trajectory.

use criterion::Criterion;
use skyplay::geom::Vector3WithYaw;
use skyplay::trajectory::{TrajectoryBuilder, TrajectoryPlayer};

fn build_trajectory() -> skyplay::trajectory::Trajectory<'static> {
    let start = Vector3WithYaw::ZERO;
    let mut builder = TrajectoryBuilder::new(start, true, 4);
    let mut pose = start;
    for i in 0..64u32 {
        let target = Vector3WithYaw::new(
            pose.x + 500.0,
            pose.y - 250.0,
            pose.z + 1000.0,
            pose.yaw + 15.0,
        );
        builder.line_to(target, 1_000 + (i % 5) * 100);
        pose = target;
    }
    builder.build()
}

fn bench_sequential_position(c: &mut Criterion) {
    let trajectory = build_trajectory();
    let mut group = c.benchmark_group("trajectory_position_at");
    group.bench_function("sequential_forward", |b| {
        b.iter(|| {
            let mut player = TrajectoryPlayer::new(trajectory.clone());
            for ms in (0..70_000).step_by(37) {
                let _ = player.position_at(std::hint::black_box(ms as f32 / 1000.0));
            }
        });
    });
    group.finish();
}

fn bench_random_access(c: &mut Criterion) {
    let trajectory = build_trajectory();
    let mut player = TrajectoryPlayer::new(trajectory);
    let probes = [68.0_f32, 3.2, 45.1, 0.5, 61.9, 12.0, 30.3];
    let mut group = c.benchmark_group("trajectory_position_at");
    group.bench_function("random_access", |b| {
        b.iter(|| {
            for &t in &probes {
                let _ = player.position_at(std::hint::black_box(t));
            }
        });
    });
    group.finish();
}

fn main() {
    let mut criterion = Criterion::default();
    bench_sequential_position(&mut criterion);
    bench_random_access(&mut criterion);
}
