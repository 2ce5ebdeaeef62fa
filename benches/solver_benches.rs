use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use pargauss::matrix::Matrix;
use pargauss::solver::parallel::solve_parallel;
use pargauss::solver::sequential::solve_sequential;

fn bench_engines(c: &mut Criterion) {
    let mut group = c.benchmark_group("gaussian_elimination");
    for order in [16usize, 64, 128] {
        let m = Matrix::random_diagonally_dominant(order);
        group.bench_with_input(BenchmarkId::new("sequential", order), &m, |b, m| {
            b.iter(|| solve_sequential(m).unwrap())
        });
        group.bench_with_input(BenchmarkId::new("parallel_auto", order), &m, |b, m| {
            b.iter(|| solve_parallel(m, 0).unwrap())
        });
        group.bench_with_input(BenchmarkId::new("parallel_2", order), &m, |b, m| {
            b.iter(|| solve_parallel(m, 2).unwrap())
        });
    }
    group.finish();
}

criterion_group!(benches, bench_engines);
criterion_main!(benches);
