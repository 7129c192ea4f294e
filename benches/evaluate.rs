//! Diagnostic benchmark comparing compiled-evaluator throughput against the
//! interpretive reference (§1, §9.4). Not part of the tested contract.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use dtree_jit::JitConfig;
use dtree_jit_testkit::{interpret, random_inputs, random_tree};

fn bench_compiled_vs_interpreted(c: &mut Criterion) {
    let mut group = c.benchmark_group("evaluate");

    for depth in [4u32, 8, 12] {
        let tree = random_tree(depth, 8, 2024);
        let inputs = random_inputs(256, 8, 99);
        let dir = tempfile::tempdir().unwrap();
        let config = JitConfig::with_cache_dir(8, depth.min(4), 2, dir.path().to_path_buf());
        let compiled = dtree_jit::JitHost::compile(&tree, &config).unwrap();

        group.bench_with_input(BenchmarkId::new("interpreted", depth), &depth, |b, _| {
            b.iter(|| {
                for input in &inputs {
                    std::hint::black_box(interpret(&tree, input));
                }
            });
        });

        group.bench_with_input(BenchmarkId::new("compiled", depth), &depth, |b, _| {
            b.iter(|| {
                for input in &inputs {
                    std::hint::black_box(compiled.run(input));
                }
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_compiled_vs_interpreted);
criterion_main!(benches);
