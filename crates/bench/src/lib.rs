use std::time::Duration;

use criterion::BenchmarkGroup;
use criterion::measurement::Measurement;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const SMALL_RUNTIME_SAMPLE_SIZE: usize = 15;
const SMALL_RUNTIME_WARM_UP_MS: u64 = 100;
const SMALL_RUNTIME_MEASURE_MS: u64 = 200;
const MEDIUM_RUNTIME_SAMPLE_SIZE: usize = 15;
const MEDIUM_RUNTIME_WARM_UP_MS: u64 = 500;
const MEDIUM_RUNTIME_MEASURE_MS: u64 = 1000;
const LARGE_RUNTIME_SAMPLE_SIZE: usize = 10;
const LARGE_RUNTIME_WARM_UP_MS: u64 = 800;
const LARGE_RUNTIME_MEASURE_MS: u64 = 1500;
const RNG_SEED: u64 = 0x5EED_2026;

/// Value range of [`InputGenerator::default`].
pub const DEFAULT_MODULUS: u64 = 1_000_000;

pub fn apply_small_runtime_config<M: Measurement>(group: &mut BenchmarkGroup<'_, M>) {
    group.sample_size(SMALL_RUNTIME_SAMPLE_SIZE);
    group.warm_up_time(Duration::from_millis(SMALL_RUNTIME_WARM_UP_MS));
    group.measurement_time(Duration::from_millis(SMALL_RUNTIME_MEASURE_MS));
}

pub fn apply_medium_runtime_config<M: Measurement>(group: &mut BenchmarkGroup<'_, M>) {
    group.sample_size(MEDIUM_RUNTIME_SAMPLE_SIZE);
    group.warm_up_time(Duration::from_millis(MEDIUM_RUNTIME_WARM_UP_MS));
    group.measurement_time(Duration::from_millis(MEDIUM_RUNTIME_MEASURE_MS));
}

pub fn apply_large_runtime_config<M: Measurement>(group: &mut BenchmarkGroup<'_, M>) {
    group.sample_size(LARGE_RUNTIME_SAMPLE_SIZE);
    group.warm_up_time(Duration::from_millis(LARGE_RUNTIME_WARM_UP_MS));
    group.measurement_time(Duration::from_millis(LARGE_RUNTIME_MEASURE_MS));
}

/// Picks the runtime config by input size.
pub fn apply_runtime_config_for_size<M: Measurement>(
    group: &mut BenchmarkGroup<'_, M>,
    size: usize,
) {
    if size <= 4_096 {
        apply_small_runtime_config(group);
    } else if size <= 65_536 {
        apply_medium_runtime_config(group);
    } else {
        apply_large_runtime_config(group);
    }
}

pub fn default_rng() -> StdRng {
    StdRng::seed_from_u64(RNG_SEED)
}

/// Uniform values in `0..modulus` from an explicitly seeded generator.
///
/// Distributed runs seed one generator per rank, so every rank's slice is
/// reproducible on its own.
#[derive(Clone, Debug)]
pub struct InputGenerator {
    rng: StdRng,
    modulus: u64,
}

impl InputGenerator {
    pub fn new(seed: u64, modulus: u64) -> Self {
        assert!(modulus > 0, "modulus must be positive");
        Self {
            rng: StdRng::seed_from_u64(seed),
            modulus,
        }
    }

    /// Generator for `rank` derived from a run-wide `seed`.
    pub fn for_rank(seed: u64, rank: usize, modulus: u64) -> Self {
        Self::new(seed.wrapping_add(rank as u64), modulus)
    }

    pub fn modulus(&self) -> u64 {
        self.modulus
    }

    pub fn next_value(&mut self) -> u64 {
        self.rng.random_range(0..self.modulus)
    }

    pub fn generate(&mut self, len: usize) -> Vec<u64> {
        (0..len).map(|_| self.next_value()).collect()
    }
}

impl Default for InputGenerator {
    fn default() -> Self {
        Self::new(RNG_SEED, DEFAULT_MODULUS)
    }
}
