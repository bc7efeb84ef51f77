//! Benchmarks for sparse grid function evaluation with different bases
//!
//! Run with: cargo bench --bench evaluation --features rayon

use criterion::{criterion_group, criterion_main, Criterion};

use sgcore::algorithms::evaluation::BasisEvaluation;
use sgcore::basis::{
    base::Basis, bspline_modified::BsplineModifiedBasis, lagrange_nak_spline::LagrangeNakSplineBasis, linear::LinearBasis, nak_bspline::NakBsplineBasis,
    wavelet::WaveletBasis,
};
use sgcore::generators;
use sgcore::storage::SparseGridData;

fn build_grid(dim: usize, level: usize) -> (SparseGridData, Vec<f64>) {
    let mut storage = SparseGridData::new(dim, 1);
    generators::regular(&mut storage, level, None).unwrap();
    let alpha = (0..storage.len()).map(|i| (i as f64 * 0.1).sin()).collect();
    (storage, alpha)
}

fn points(dim: usize, n: usize) -> Vec<Vec<f64>> {
    (0..n).map(|i| (0..dim).map(|d| ((i * (d + 3)) % 97) as f64 / 97.0).collect()).collect()
}

/// Single point evaluation in 4D
fn bench_single_point(c: &mut Criterion) {
    let (storage, alpha) = build_grid(4, 5);
    let x = [0.3, 0.5, 0.2, 0.7];
    let linear = LinearBasis;
    let nak = NakBsplineBasis::new(3).unwrap();
    let lagrange = LagrangeNakSplineBasis::new(3).unwrap();
    let modified = BsplineModifiedBasis::new(3).unwrap();
    let wavelet = WaveletBasis;
    let bases: [(&str, &dyn Basis); 5] = [
        ("linear", &linear),
        ("nak_bspline_3", &nak),
        ("lagrange_nak_3", &lagrange),
        ("bspline_modified_3", &modified),
        ("wavelet", &wavelet),
    ];

    let mut group = c.benchmark_group("4D Single Evaluation");
    for (name, basis) in bases {
        let eval = BasisEvaluation::isotropic(&storage, basis);
        group.bench_function(name, |b| b.iter(|| eval.eval(&x, &alpha).unwrap()));
    }
    group.finish();

    println!("4D grid size: {}", storage.len());
}

/// Batch evaluation (parallel with the rayon feature)
fn bench_batch(c: &mut Criterion) {
    let (storage, alpha) = build_grid(3, 5);
    let basis = NakBsplineBasis::new(3).unwrap();
    let eval = BasisEvaluation::isotropic(&storage, &basis);
    let x = points(3, 1000);

    let mut group = c.benchmark_group("3D Batch Evaluation");
    group.bench_function("eval_batch_1000", |b| b.iter(|| eval.eval_batch(&x, &alpha).unwrap()));
    group.bench_function("eval_gradient", |b| b.iter(|| eval.eval_gradient(&x[1], &alpha).unwrap()));
    group.finish();
}

criterion_group!(benches, bench_single_point, bench_batch);
criterion_main!(benches);
