//! Benchmarks for the multigrid solvers on the Poisson problem
//!
//! Run with: cargo bench --bench multigrid

use criterion::{criterion_group, criterion_main, Criterion};

use sgcore::multigrid::full_grid::FullGrid;
use sgcore::multigrid::operator::LaplaceOperator;
use sgcore::multigrid::solver::{Multigrid, MultigridOptions};

fn solver(levels: &[u32], has_boundary: &[bool]) -> (Multigrid, usize) {
    let grid = FullGrid::new(levels, has_boundary).unwrap();
    let n = grid.nr_elements();
    let op = LaplaceOperator::with_source(grid, |x: &[f64]| x.iter().sum::<f64>());
    (Multigrid::new(Box::new(op), MultigridOptions::default()).unwrap(), n)
}

/// V-cycles against conjugate gradients on a 2D grid
fn bench_poisson_2d(c: &mut Criterion) {
    let mut group = c.benchmark_group("Poisson 2D level 6");
    group.sample_size(10);
    group.bench_function("v_cycle", |b| {
        b.iter(|| {
            let (mut mg, n) = solver(&[6, 6], &[true, true]);
            let mut u = vec![0.0; n];
            mg.solve_cs(&mut u, 1e-8, false).unwrap()
        })
    });
    group.bench_function("full_multigrid", |b| {
        b.iter(|| {
            let (mut mg, n) = solver(&[6, 6], &[true, true]);
            let mut u = vec![0.0; n];
            mg.full_multigrid(&mut u, 1e-8).unwrap()
        })
    });
    group.bench_function("cg", |b| {
        b.iter(|| {
            let (mut mg, n) = solver(&[6, 6], &[false, false]);
            let mut u = vec![0.0; n];
            mg.solve_cg(&mut u, 1e-8).unwrap()
        })
    });
    group.finish();
}

criterion_group!(benches, bench_poisson_2d);
criterion_main!(benches);
