use bench::apply_runtime_config_for_size;
use bench::default_rng;
use criterion::BenchmarkGroup;
use criterion::BenchmarkId;
use criterion::Criterion;
use criterion::criterion_group;
use criterion::criterion_main;
use criterion::measurement::Measurement;
use rand::Rng;
use rmq::SparseTableRmq;
use rmq::StaticRmq;
use rmq::Tie;
use std::hint::black_box;

const SIZES: [usize; 4] = [1_024, 4_096, 16_384, 65_536];
const VALUE_RANGE: std::ops::RangeInclusive<i64> = -1_000_000_000..=1_000_000_000;

#[derive(Clone, Copy, Debug)]
enum Workload {
    NDiv4,
    N,
    NTimes4,
}

impl Workload {
    fn label(self) -> &'static str {
        match self {
            Self::NDiv4 => "n_div_4",
            Self::N => "n",
            Self::NTimes4 => "4n",
        }
    }

    fn query_count(self, n: usize) -> usize {
        match self {
            Self::NDiv4 => (n / 4).max(1),
            Self::N => n.max(1),
            Self::NTimes4 => (4 * n).max(1),
        }
    }
}

fn generate_values<R: Rng + ?Sized>(rng: &mut R, n: usize) -> Vec<i64> {
    (0..n).map(|_| rng.random_range(VALUE_RANGE)).collect()
}

fn generate_queries<R: Rng + ?Sized>(rng: &mut R, n: usize, q: usize) -> Vec<(usize, usize)> {
    let mut queries = Vec::with_capacity(q);
    for _ in 0..q {
        let l = rng.random_range(0..n);
        let r = rng.random_range((l + 1)..=n);
        queries.push((l, r));
    }
    queries
}

fn bench_tie<M: Measurement>(
    group: &mut BenchmarkGroup<'_, M>,
    tie: Tie,
    name: &str,
    values: &[i64],
    queries: &[(usize, usize)],
) {
    group.bench_function(BenchmarkId::new(name, values.len()), |bencher| {
        bencher.iter(|| {
            let rmq = SparseTableRmq::with_tie(black_box(values), tie);
            let mut acc = 0_usize;
            for &(l, r) in queries {
                if let Some(idx) = rmq.argmin(black_box(l)..black_box(r)) {
                    acc ^= idx;
                }
            }
            black_box(acc);
        })
    });
}

fn bench_rmq(c: &mut Criterion) {
    let workloads = [Workload::NDiv4, Workload::N, Workload::NTimes4];
    let mut rng = default_rng();

    for workload in workloads {
        let mut group = c.benchmark_group(format!("rmq/workload/{}", workload.label()));

        for &size in &SIZES {
            apply_runtime_config_for_size(&mut group, size);
            let values = generate_values(&mut rng, size);
            let queries = generate_queries(&mut rng, size, workload.query_count(size));

            bench_tie(&mut group, Tie::Leftmost, "sparse_leftmost", &values, &queries);
            bench_tie(&mut group, Tie::Rightmost, "sparse_rightmost", &values, &queries);
        }

        group.finish();
    }
}

criterion_group!(benches, bench_rmq);
criterion_main!(benches);
