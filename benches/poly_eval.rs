//! Benchmark for polynomial evaluation and root finding.

use criterion::Criterion;
use skyplay::poly::Polynomial;

fn bench_evaluate(c: &mut Criterion) {
    let p = Polynomial::from_slice(&[1.0, -2.0, 0.5, 3.0]);
    let mut group = c.benchmark_group("polynomial_evaluate");
    group.bench_function("cubic_horner", |b| {
        b.iter(|| p.evaluate(std::hint::black_box(0.37)));
    });
    group.finish();
}

fn bench_solve(c: &mut Criterion) {
    let p = Polynomial::from_slice(&[-1.0, 0.0, 0.0, 1.0]);
    let mut group = c.benchmark_group("polynomial_solve");
    group.bench_function("cubic_cardano", |b| {
        b.iter(|| p.solve(std::hint::black_box(0.25)));
    });
    group.finish();
}

fn bench_from_bezier(c: &mut Criterion) {
    let mut group = c.benchmark_group("polynomial_from_bezier");
    group.bench_function("cubic_bezier", |b| {
        b.iter(|| {
            Polynomial::from_bezier(
                std::hint::black_box(&[0.0, 100.0, 200.0, 300.0]),
                std::hint::black_box(1.5),
            )
        });
    });
    group.finish();
}

fn main() {
    let mut criterion = Criterion::default();
    bench_evaluate(&mut criterion);
    bench_solve(&mut criterion);
    bench_from_bezier(&mut criterion);
}
