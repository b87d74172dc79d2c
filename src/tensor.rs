//! Flat tensor with a shared gradient cell

use ndarray::Array1;
use rand::Rng;
use std::cell::RefCell;
use std::rc::Rc;

/// Operation that propagates gradients backward through the graph
pub trait BackwardOp {
    /// Accumulate gradients into the input tensors of this operation
    fn backward(&self);
}

/// A 1-D `f32` tensor with optional gradient tracking
///
/// Multi-dimensional values (per-token logits, token ID sequences) are stored
/// flattened; consumers that need structure carry the row width separately.
///
/// Clones share the gradient cell, so a parameter handle held by a model and
/// one held by a caller observe the same accumulated gradient.
///
/// # Example
///
/// ```
/// use estimar::Tensor;
///
/// let t = Tensor::from_vec(vec![1.0, 2.0, 3.0], true);
/// assert_eq!(t.len(), 3);
/// assert!(t.requires_grad());
/// assert!(t.grad().is_none());
/// ```
#[derive(Clone)]
pub struct Tensor {
    data: Array1<f32>,
    grad: Rc<RefCell<Option<Array1<f32>>>>,
    backward_op: Option<Rc<dyn BackwardOp>>,
    requires_grad: bool,
}

impl Tensor {
    /// Create a tensor from a vector
    pub fn from_vec(data: Vec<f32>, requires_grad: bool) -> Self {
        Self {
            data: Array1::from(data),
            grad: Rc::new(RefCell::new(None)),
            backward_op: None,
            requires_grad,
        }
    }

    /// Create a zero-filled tensor
    pub fn zeros(len: usize, requires_grad: bool) -> Self {
        Self::from_vec(vec![0.0; len], requires_grad)
    }

    /// Create a tensor filled with uniform samples from [-1, 1)
    ///
    /// The caller supplies the generator, so reproducibility is controlled by
    /// whoever seeded it.
    pub fn rand_uniform(len: usize, requires_grad: bool, rng: &mut impl Rng) -> Self {
        let data = (0..len).map(|_| rng.random_range(-1.0..1.0)).collect();
        Self::from_vec(data, requires_grad)
    }

    /// Get the underlying data
    pub fn data(&self) -> &Array1<f32> {
        &self.data
    }

    /// Get mutable access to the underlying data
    pub fn data_mut(&mut self) -> &mut Array1<f32> {
        &mut self.data
    }

    /// Number of elements
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Check if the tensor is empty
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Whether gradients are tracked for this tensor
    pub fn requires_grad(&self) -> bool {
        self.requires_grad
    }

    /// Current accumulated gradient, if any
    pub fn grad(&self) -> Option<Array1<f32>> {
        self.grad.borrow().clone()
    }

    /// Shared handle to the gradient cell
    ///
    /// Backward ops hold this handle and accumulate into it.
    pub fn grad_cell(&self) -> Rc<RefCell<Option<Array1<f32>>>> {
        Rc::clone(&self.grad)
    }

    /// Overwrite the gradient
    pub fn set_grad(&mut self, grad: Array1<f32>) {
        *self.grad.borrow_mut() = Some(grad);
    }

    /// Clear the accumulated gradient
    pub fn zero_grad(&mut self) {
        *self.grad.borrow_mut() = None;
    }

    /// Backward op producing this tensor, if any
    pub fn backward_op(&self) -> Option<Rc<dyn BackwardOp>> {
        self.backward_op.clone()
    }

    /// Attach the backward op producing this tensor
    pub fn set_backward_op(&mut self, op: Rc<dyn BackwardOp>) {
        self.backward_op = Some(op);
    }
}

impl std::fmt::Debug for Tensor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tensor")
            .field("data", &self.data)
            .field("requires_grad", &self.requires_grad)
            .field("has_grad", &self.grad.borrow().is_some())
            .finish()
    }
}
