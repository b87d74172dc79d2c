//! Seeding and determinism configuration
//!
//! Every random source used in a run is seeded from one integer: the two
//! generator streams owned by the caller (`RngSuite`), plus the tensor
//! backend's CPU and accelerator streams behind the `TensorBackend` seam.
//! The seed is also recorded in an environment variable so child processes
//! and logs can see it.

use crate::error::Result;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Environment variable recording the active seed (decimal string)
pub const GLOBAL_SEED_ENV: &str = "ESTIMAR_GLOBAL_SEED";

/// Seam to the tensor library's RNG and kernel configuration
///
/// Implementations own the backend's CPU stream, any per-device accelerator
/// streams, and the two kernel flags. None of these methods error;
/// accelerator methods are no-ops on hosts without one.
pub trait TensorBackend {
    /// Seed the backend's CPU generator
    fn seed_cpu(&mut self, seed: u64);

    /// Seed the generator of every accelerator device
    fn seed_all_accelerators(&mut self, seed: u64);

    /// Whether accelerated-compute hardware is present
    fn accelerator_available(&self) -> bool;

    /// Toggle benchmark-driven kernel selection (non-deterministic when on)
    fn set_kernel_benchmark(&mut self, enabled: bool);

    /// Toggle deterministic kernel implementations
    fn set_deterministic_kernels(&mut self, enabled: bool);
}

/// CPU-only backend
///
/// Holds one `StdRng` stream and the kernel flags. Accelerator seeding is a
/// no-op and `accelerator_available` is always `false`. Flags default to the
/// performance-oriented configuration (benchmark on, deterministic off).
pub struct CpuBackend {
    cpu: StdRng,
    kernel_benchmark: bool,
    deterministic_kernels: bool,
}

impl CpuBackend {
    /// Create a backend with an OS-seeded CPU stream
    pub fn new() -> Self {
        Self {
            cpu: StdRng::from_os_rng(),
            kernel_benchmark: true,
            deterministic_kernels: false,
        }
    }

    /// Draw `n` uniform samples from [0, 1) off the CPU stream
    pub fn sample_uniform(&mut self, n: usize) -> Vec<f32> {
        (0..n).map(|_| self.cpu.random()).collect()
    }

    /// Current benchmark-kernel flag
    pub fn kernel_benchmark(&self) -> bool {
        self.kernel_benchmark
    }

    /// Current deterministic-kernel flag
    pub fn deterministic_kernels(&self) -> bool {
        self.deterministic_kernels
    }
}

impl Default for CpuBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl TensorBackend for CpuBackend {
    fn seed_cpu(&mut self, seed: u64) {
        self.cpu = StdRng::seed_from_u64(seed);
    }

    fn seed_all_accelerators(&mut self, _seed: u64) {
        // No devices to seed
    }

    fn accelerator_available(&self) -> bool {
        false
    }

    fn set_kernel_benchmark(&mut self, enabled: bool) {
        self.kernel_benchmark = enabled;
    }

    fn set_deterministic_kernels(&mut self, enabled: bool) {
        self.deterministic_kernels = enabled;
    }
}

/// Check if CUDA hardware appears to be present
///
/// Probes `CUDA_VISIBLE_DEVICES` and falls back to `nvidia-smi`. Backend
/// implementations with real accelerator support can use this for their
/// `accelerator_available` answer.
#[must_use]
pub fn cuda_available() -> bool {
    if std::env::var("CUDA_VISIBLE_DEVICES").is_ok() {
        return true;
    }

    std::process::Command::new("nvidia-smi")
        .arg("--query-gpu=name")
        .arg("--format=csv,noheader")
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

/// The caller-owned generator streams
///
/// `general` drives sampling decisions (shuffles, dropout masks); `array`
/// drives array/tensor initialization. Both are seeded with the same integer
/// as the backend streams, so one seed reproduces an entire run.
pub struct RngSuite {
    /// General-purpose stream
    pub general: StdRng,
    /// Array-initialization stream
    pub array: StdRng,
}

impl RngSuite {
    /// Build both streams from one seed
    pub fn from_seed(seed: u64) -> Self {
        Self {
            general: StdRng::seed_from_u64(seed),
            array: StdRng::seed_from_u64(seed),
        }
    }
}

/// Seed every random source from one integer
///
/// Records the seed in [`GLOBAL_SEED_ENV`], seeds the backend's CPU stream
/// and every accelerator stream, enables deterministic kernels, and returns
/// the caller-owned [`RngSuite`] seeded with the same integer.
///
/// Mutates process-wide environment state; not safe to race from multiple
/// threads.
pub fn set_all_seeds(seed: u64, backend: &mut dyn TensorBackend) -> RngSuite {
    std::env::set_var(GLOBAL_SEED_ENV, seed.to_string());

    backend.seed_cpu(seed);
    backend.seed_all_accelerators(seed);
    backend.set_deterministic_kernels(true);

    RngSuite::from_seed(seed)
}

/// Force deterministic kernel selection when an accelerator is present
///
/// Disables benchmark-driven kernel selection and enables deterministic
/// kernels. A no-op on hosts without accelerated-compute hardware; never
/// errors.
pub fn set_deterministic(backend: &mut dyn TensorBackend) {
    if backend.accelerator_available() {
        backend.set_kernel_benchmark(false);
        backend.set_deterministic_kernels(true);
    }
}

/// Reproducibility configuration
///
/// The explicit record of a run's determinism settings. `apply` performs the
/// same sequence as [`set_all_seeds`] but honors the configured flags, so a
/// loaded config reproduces the exact backend state of the run it was saved
/// from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReproducibilityConfig {
    /// Random seed for all generator streams
    pub seed: u64,
    /// Request globally deterministic algorithms (may be slower)
    ///
    /// Recorded but not toggled by `apply`: the global algorithm toggle
    /// differs across tensor-backend versions, so honoring it is left to
    /// `TensorBackend` implementations.
    pub deterministic_algorithms: bool,
    /// Benchmark-driven kernel selection
    pub kernel_benchmark: bool,
    /// Deterministic kernel implementations
    pub deterministic_kernels: bool,
}

impl Default for ReproducibilityConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            deterministic_algorithms: true,
            kernel_benchmark: false,
            deterministic_kernels: true,
        }
    }
}

impl ReproducibilityConfig {
    /// Create config with a specific seed
    #[must_use]
    pub const fn with_seed(seed: u64) -> Self {
        Self {
            seed,
            deterministic_algorithms: true,
            kernel_benchmark: false,
            deterministic_kernels: true,
        }
    }

    /// Disable deterministic mode (faster but not reproducible)
    #[must_use]
    pub const fn non_deterministic(mut self) -> Self {
        self.deterministic_algorithms = false;
        self.kernel_benchmark = true;
        self.deterministic_kernels = false;
        self
    }

    /// Apply seeds and kernel flags to the backend
    ///
    /// Records the seed in [`GLOBAL_SEED_ENV`], seeds all backend streams,
    /// sets both kernel flags from the config, and returns the seeded
    /// [`RngSuite`].
    pub fn apply(&self, backend: &mut dyn TensorBackend) -> RngSuite {
        std::env::set_var(GLOBAL_SEED_ENV, self.seed.to_string());

        backend.seed_cpu(self.seed);
        backend.seed_all_accelerators(self.seed);
        backend.set_kernel_benchmark(self.kernel_benchmark);
        backend.set_deterministic_kernels(self.deterministic_kernels);

        RngSuite::from_seed(self.seed)
    }

    /// Save config as YAML
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the write fails.
    pub fn save(&self, path: &Path) -> Result<()> {
        let yaml = serde_yaml::to_string(self)?;
        std::fs::write(path, yaml)?;
        Ok(())
    }

    /// Load config from a YAML file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_yaml::from_str(&content)?)
    }
}
