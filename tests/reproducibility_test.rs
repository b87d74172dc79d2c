//! End-to-end reproducibility check
//!
//! Seeds everything twice and verifies each generator stream repeats its
//! sequence exactly, then checks the seed is recorded in the environment.
//! Kept as a single test: the environment variable is process-global.

use estimar::{set_all_seeds, set_deterministic, CpuBackend, Tensor, GLOBAL_SEED_ENV};
use rand::Rng;

#[test]
fn seeding_twice_reproduces_every_stream() {
    let seed = 20240817;

    let mut backend_a = CpuBackend::new();
    let mut suite_a = set_all_seeds(seed, &mut backend_a);

    assert_eq!(std::env::var(GLOBAL_SEED_ENV).unwrap(), seed.to_string());

    let general_a: Vec<f32> = (0..32).map(|_| suite_a.general.random()).collect();
    let array_a = Tensor::rand_uniform(32, false, &mut suite_a.array);
    let cpu_a = backend_a.sample_uniform(32);

    // Second run with the same seed
    let mut backend_b = CpuBackend::new();
    let mut suite_b = set_all_seeds(seed, &mut backend_b);

    let general_b: Vec<f32> = (0..32).map(|_| suite_b.general.random()).collect();
    let array_b = Tensor::rand_uniform(32, false, &mut suite_b.array);
    let cpu_b = backend_b.sample_uniform(32);

    assert_eq!(general_a, general_b);
    assert_eq!(array_a.data(), array_b.data());
    assert_eq!(cpu_a, cpu_b);

    // Deterministic kernels are requested by seeding itself
    assert!(backend_b.deterministic_kernels());

    // Without an accelerator this must be a silent no-op and leave the
    // flags exactly as seeding set them
    set_deterministic(&mut backend_b);
    assert!(backend_b.deterministic_kernels());

    // A different seed produces a different general stream
    let mut backend_c = CpuBackend::new();
    let mut suite_c = set_all_seeds(seed + 1, &mut backend_c);
    let general_c: Vec<f32> = (0..32).map(|_| suite_c.general.random()).collect();
    assert_ne!(general_a, general_c);
}
