use std::hint::black_box;
use std::time::{Duration, Instant};

use bench::{InputGenerator, apply_runtime_config_for_size};
use comm::{Communicator, LocalUniverse, block_local_size};
use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use samplesort::{TunedParams, sample_sort_with};

const SIZES: [usize; 3] = [16_384, 131_072, 1_048_576];
const RANKS: [usize; 4] = [1, 2, 4, 8];
const SEED: u64 = 0x5A4F;

#[derive(Clone, Copy)]
struct ValueSpec {
    modulus: u64,
    label: &'static str,
}

const VALUE_SPECS: [ValueSpec; 2] = [
    ValueSpec {
        modulus: 1_000_000,
        label: "mod_1e6",
    },
    ValueSpec {
        modulus: 16,
        label: "mod_16",
    },
];

const OVERSAMPLING: [usize; 2] = [1, 2];

fn bench_samplesort(c: &mut Criterion) {
    for &spec in &VALUE_SPECS {
        for &p in &RANKS {
            let universe = LocalUniverse::new(p);
            let mut group = c.benchmark_group(format!("samplesort/{}/p{p}", spec.label));
            for &size in &SIZES {
                apply_runtime_config_for_size(&mut group, size);
                for &oversampling in &OVERSAMPLING {
                    let params = TunedParams { oversampling };
                    let name = format!("oversampling_{oversampling}");
                    group.bench_function(BenchmarkId::new(name, size), |bencher| {
                        bencher.iter_custom(|iters| {
                            let mut total = Duration::ZERO;
                            for _ in 0..iters {
                                let times = universe.run(|comm| {
                                    let len = block_local_size(size, p, comm.rank());
                                    let mut local =
                                        InputGenerator::for_rank(SEED, comm.rank(), spec.modulus)
                                            .generate(len);
                                    comm.barrier();
                                    let start = Instant::now();
                                    sample_sort_with(&mut local, u64::cmp, &params, comm);
                                    comm.barrier();
                                    let elapsed = start.elapsed();
                                    black_box(&local);
                                    elapsed
                                });
                                total += times[0];
                            }
                            total
                        });
                    });
                }
            }
            group.finish();
        }
    }

    let mut group = c.benchmark_group("samplesort/std_stable");
    for &size in &SIZES {
        apply_runtime_config_for_size(&mut group, size);
        let base = InputGenerator::new(SEED, 1_000_000).generate(size);
        group.bench_function(BenchmarkId::new("sort", size), |bencher| {
            bencher.iter_custom(|iters| {
                let mut total = Duration::ZERO;
                for _ in 0..iters {
                    let mut data = base.clone();
                    let start = Instant::now();
                    data.sort();
                    total += start.elapsed();
                    black_box(&data);
                }
                total
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_samplesort);
criterion_main!(benches);
