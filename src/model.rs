//! Model seam for evaluation

use crate::Tensor;

/// A callable model producing per-token class scores
///
/// `forward` takes `&self`, so evaluation cannot mutate parameters. Returned
/// logits are flattened `n_tokens * n_class`, row-major per token.
pub trait Model {
    /// Run the forward pass on a batch of inputs
    fn forward(&self, inputs: &Tensor) -> Tensor;

    /// Handles to the trainable parameters
    ///
    /// Handles share gradient cells with the model's own copies, so callers
    /// can inspect gradient-accumulation state.
    fn parameters(&self) -> Vec<Tensor>;
}
