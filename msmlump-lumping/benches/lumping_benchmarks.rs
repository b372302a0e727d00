use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use msmlump_lumping::{Bace, BaceOptions, Mvca, MvcaOptions, Pcca, PccaOptions, PccaPlus, PccaPlusOptions};
use msmlump_msm::{MarkovStateModel, MsmConfig};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Random walk on `n` states grouped into wells of four, with rare hops
/// between neighbouring wells.
fn well_chain(n: usize, n_steps: usize) -> MarkovStateModel<u32> {
    let mut rng = StdRng::seed_from_u64(7);
    let mut state = 0usize;
    let mut traj = Vec::with_capacity(n_steps);
    for _ in 0..n_steps {
        traj.push(state as u32);
        let well = state / 4;
        state = if rng.gen::<f64>() < 0.02 {
            let target = if rng.gen::<bool>() { well + 1 } else { well.wrapping_sub(1) };
            if target < n / 4 {
                target * 4 + rng.gen_range(0..4)
            } else {
                state
            }
        } else {
            well * 4 + rng.gen_range(0..4)
        };
    }
    MarkovStateModel::fit(&MsmConfig::default().quiet(), &[traj]).unwrap()
}

fn bench_pcca(c: &mut Criterion) {
    let mut group = c.benchmark_group("pcca");
    for &n in &[16, 32, 64] {
        let msm = well_chain(n, 50_000);
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, &n| {
            b.iter(|| Pcca::from_msm(msm.clone(), n / 4, PccaOptions::default()).unwrap());
        });
    }
    group.finish();
}

fn bench_pcca_plus(c: &mut Criterion) {
    let mut group = c.benchmark_group("pcca_plus");
    group.sample_size(10);
    for &n in &[16, 32] {
        let msm = well_chain(n, 50_000);
        let opts = PccaPlusOptions {
            random_state: Some(0),
            n_hops: 10,
            ..Default::default()
        };
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, &n| {
            b.iter(|| PccaPlus::from_msm(msm.clone(), n / 4, opts.clone()).unwrap());
        });
    }
    group.finish();
}

fn bench_bace(c: &mut Criterion) {
    let mut group = c.benchmark_group("bace");
    for &n in &[16, 32, 64] {
        let msm = well_chain(n, 50_000);
        let opts = BaceOptions {
            save_all_maps: false,
            ..Default::default()
        };
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, &n| {
            b.iter(|| Bace::from_msm(msm.clone(), n / 4, opts.clone()).unwrap());
        });
    }
    group.finish();
}

fn bench_mvca(c: &mut Criterion) {
    let mut group = c.benchmark_group("mvca");
    for &n in &[16, 32, 64] {
        let msm = well_chain(n, 50_000);
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, &n| {
            b.iter(|| Mvca::from_msm(msm.clone(), n / 4, MvcaOptions::default()).unwrap());
        });
    }
    group.finish();
}

criterion_group!(benches, bench_pcca, bench_pcca_plus, bench_bace, bench_mvca);
criterion_main!(benches);
