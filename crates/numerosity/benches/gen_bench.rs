//! Criterion microbenches for the dot sampler and the family builder.
//!
//! - sampler: dot placement at the reference and extreme test counts.
//! - family: one full three-level family, default and compact geometry.
//!
//! Results live under `target/criterion`.

use criterion::{criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion};
use rand::rngs::StdRng;
use rand::SeedableRng;

use numerosity::pattern::{build_family, FamilyReplay, PatternCfg};
use numerosity::sampler::{sample_dots, FieldCfg};

fn bench_sampler(c: &mut Criterion) {
    let mut group = c.benchmark_group("sampler");
    let cfg = FieldCfg::default();
    for &n in &[9usize, 12, 15] {
        group.bench_function(BenchmarkId::new("sample_dots", n), |b| {
            b.iter_batched(
                || StdRng::seed_from_u64(42),
                |mut rng| {
                    let _ = sample_dots(n, &cfg, &mut rng);
                },
                BatchSize::SmallInput,
            )
        });
    }
    group.finish();
}

fn bench_family(c: &mut Criterion) {
    let mut group = c.benchmark_group("family");
    group.sample_size(30);
    let default_cfg = PatternCfg::default();
    let compact_cfg = PatternCfg {
        field: FieldCfg {
            width: 240.0,
            height: 320.0,
            min_dot_distance: 38.0,
            boundary_margin: 10.0,
            ..FieldCfg::default()
        },
        ..PatternCfg::default()
    };
    for (label, cfg) in [("default", default_cfg), ("compact", compact_cfg)] {
        group.bench_function(BenchmarkId::new("build_family_13", label), |b| {
            let mut index = 0u64;
            b.iter(|| {
                index = index.wrapping_add(1);
                let _ = build_family(&cfg, 13, &[0, 1, 2], 0, FamilyReplay { seed: 42, index });
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_sampler, bench_family);
criterion_main!(benches);
