use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use pecluster::benchmarks::config;
use pecluster::prelude::*;
use pecluster_datasets::generate;
use pecluster_umap::UmapParams;
use rand::SeedableRng;
use rand_xoshiro::Xoshiro256Plus;

fn umap_bench(c: &mut Criterion) {
    let mut rng = Xoshiro256Plus::seed_from_u64(40);
    let n_rows = vec![100, 500, 1_000];

    let mut benchmark = c.benchmark_group("umap");
    config::set_default_benchmark_configs(&mut benchmark);

    for n in n_rows {
        let (explanations, _) = generate::explanations(TargetType::Binary, n, 5, &mut rng);
        let strengths = StrengthMatrix::params(TargetType::Binary)
            .transform(&explanations)
            .unwrap();
        let params = UmapParams::new(2).min_dist(0.0).n_epochs(200).check().unwrap();

        benchmark.bench_with_input(
            BenchmarkId::new("umap", n),
            &strengths.records(),
            |bencher, records| {
                bencher.iter(|| black_box(params.transform(records).unwrap()));
            },
        );
    }
    benchmark.finish()
}

criterion_group!(benches, umap_bench);
criterion_main!(benches);
