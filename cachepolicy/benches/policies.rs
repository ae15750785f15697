use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use cachepolicy::config::{CacheConfig, ReplacementPolicyConfig, SimulationConfig};
use cachepolicy::simulator::Simulator;
use cachepolicy::util::mixed_trace;

const POLICIES: [ReplacementPolicyConfig; 3] = [
    ReplacementPolicyConfig::LeastRecentlyUsed,
    ReplacementPolicyConfig::LeastFrequentlyUsed,
    ReplacementPolicyConfig::AdaptiveReplacement,
];

/// Compares the policies on the same synthetic trace, across a few associativities
pub fn criterion_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("Policies");
    // A working set around twice the cache, so every policy evicts constantly
    let trace = mixed_trace(200_000, 8192, 64, 0x5eed);

    for associativity in [2u64, 8, 16] {
        for policy in POLICIES {
            let config = SimulationConfig {
                caches: vec![CacheConfig {
                    name: format!("{policy:?}"),
                    block_size: 64,
                    cache_size: 256 * 1024,
                    associativity,
                    replacement_policy: policy,
                }],
            };
            group.bench_with_input(
                BenchmarkId::new(format!("{policy:?}"), associativity),
                &config,
                |bench, conf| {
                    bench.iter(|| {
                        Simulator::new(conf).unwrap().simulate_requests(trace.iter().copied()).caches[0].hits
                    });
                },
            );
        }
    }
    group.finish();
}

criterion_group!(
    name = benches;
    config = Criterion::default().significance_level(0.1).sample_size(10);
    targets = criterion_benchmark
);
criterion_main!(benches);
