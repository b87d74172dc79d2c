//! Loss estimation and reproducibility utilities for language-model training
//!
//! Two independent pieces, invoked by an external training driver:
//!
//! - **Evaluation**: [`estimate_ce_losses`] draws a fixed number of batches
//!   per data partition (`train` / `eval`), runs the model forward, and
//!   returns the mean cross-entropy per partition. No gradient state is
//!   touched and no parameter is mutated.
//! - **Reproducibility**: [`set_all_seeds`] seeds every generator stream
//!   (caller-owned plus backend) from one integer, records it in an
//!   environment variable, and enables deterministic kernels;
//!   [`set_deterministic`] trades kernel performance for bit-exact runs when
//!   an accelerator is present.
//!
//! The tensor backend is an injected dependency: implement [`TensorBackend`]
//! for the numeric library in use, or use [`CpuBackend`] on plain hosts.
//! Models plug in through the [`Model`] trait.
//!
//! # Example
//!
//! ```
//! use estimar::{
//!     estimate_ce_losses, set_all_seeds, Batch, CpuBackend, Model, Split, Tensor,
//! };
//!
//! struct UniformModel;
//!
//! impl Model for UniformModel {
//!     fn forward(&self, inputs: &Tensor) -> Tensor {
//!         Tensor::from_vec(vec![0.0; inputs.len() * 2], false)
//!     }
//!     fn parameters(&self) -> Vec<Tensor> {
//!         Vec::new()
//!     }
//! }
//!
//! let mut backend = CpuBackend::new();
//! let mut rng = set_all_seeds(42, &mut backend);
//!
//! let get_batch = move |_split: Split| -> Result<Batch, std::convert::Infallible> {
//!     let inputs = Tensor::rand_uniform(4, false, &mut rng.array);
//!     let targets = Tensor::from_vec(vec![0.0, 1.0, 0.0, 1.0], false);
//!     Ok(Batch::new(inputs, targets))
//! };
//!
//! let losses = estimate_ce_losses(&UniformModel, get_batch, 2, 10).unwrap();
//! assert!((losses[&Split::Train] - 2.0_f32.ln()).abs() < 1e-5);
//! assert!((losses[&Split::Eval] - 2.0_f32.ln()).abs() < 1e-5);
//! ```

mod batch;
mod error;
mod eval;
mod loss;
mod model;
mod reproducibility;
mod tensor;

pub use batch::Batch;
pub use error::{ReproError, Result};
pub use eval::{estimate_ce_losses, Split};
pub use loss::{CrossEntropyLoss, LossFn};
pub use model::Model;
pub use reproducibility::{
    cuda_available, set_all_seeds, set_deterministic, CpuBackend, ReproducibilityConfig, RngSuite,
    TensorBackend, GLOBAL_SEED_ENV,
};
pub use tensor::{BackwardOp, Tensor};
