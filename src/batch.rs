//! Batch data structure

use crate::Tensor;

/// A batch of paired inputs and targets
///
/// For language-model evaluation, `inputs` holds flattened token features and
/// `targets` holds the class index for each token, stored as `f32`.
#[derive(Clone)]
pub struct Batch {
    /// Input features
    pub inputs: Tensor,
    /// Target class indices
    pub targets: Tensor,
}

impl Batch {
    /// Create a new batch
    pub fn new(inputs: Tensor, targets: Tensor) -> Self {
        Self { inputs, targets }
    }

    /// Number of target tokens in the batch
    pub fn size(&self) -> usize {
        self.targets.len()
    }
}
