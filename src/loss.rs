//! Cross-entropy loss over flattened per-token logits

use crate::tensor::{BackwardOp, Tensor};
use ndarray::Array1;
use std::cell::RefCell;
use std::rc::Rc;

/// Trait for loss functions
pub trait LossFn {
    /// Compute loss given predictions and targets
    ///
    /// Returns a scalar loss tensor with gradients wired for backpropagation.
    fn forward(&self, predictions: &Tensor, targets: &Tensor) -> Tensor;

    /// Name of the loss function
    fn name(&self) -> &str;
}

/// Cross-entropy loss for next-token classification
///
/// Predictions are flattened `n_tokens * n_class` logits; targets are
/// `n_tokens` class indices stored as `f32`. The loss is the mean over
/// tokens of `-ln(softmax(logits)[target])`.
///
/// # Example
///
/// ```
/// use estimar::{CrossEntropyLoss, Tensor};
///
/// let loss_fn = CrossEntropyLoss::new(4);
/// let logits = Tensor::from_vec(vec![0.0; 2 * 4], true); // 2 tokens, 4 classes
/// let targets = Tensor::from_vec(vec![1.0, 3.0], false);
///
/// // Uniform logits over 4 classes give ln(4)
/// let loss = loss_fn.value(&logits, &targets);
/// assert!((loss - 4.0_f32.ln()).abs() < 1e-6);
/// ```
pub struct CrossEntropyLoss {
    /// Number of output classes
    n_class: usize,
}

impl CrossEntropyLoss {
    /// Create a cross-entropy loss over `n_class` output classes
    pub fn new(n_class: usize) -> Self {
        assert!(n_class > 0, "n_class must be positive");
        Self { n_class }
    }

    /// Number of output classes
    pub fn n_class(&self) -> usize {
        self.n_class
    }

    /// Compute softmax for a single token's logits
    fn softmax(logits: &[f32]) -> Vec<f32> {
        let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
        let exp_vals: Vec<f32> = logits.iter().map(|&x| (x - max).exp()).collect();
        let sum: f32 = exp_vals.iter().sum();
        exp_vals.iter().map(|&x| x / sum).collect()
    }

    /// Compute the scalar loss without touching any gradient state
    ///
    /// This is the evaluation path: no backward op is created and no grad
    /// cell is read or written, so gradient-accumulation state is untouched.
    ///
    /// # Panics
    ///
    /// Panics if `predictions.len() != targets.len() * n_class` or if
    /// `targets` is empty.
    pub fn value(&self, predictions: &Tensor, targets: &Tensor) -> f32 {
        self.compute(predictions, targets, None)
    }

    /// Shared loss computation, optionally filling per-logit gradients
    ///
    /// When `grads` is supplied it must be zero-filled with
    /// `predictions.len()` slots; it receives `(softmax - one_hot) / n_tokens`
    /// per token. Target indices outside `[0, n_class)` contribute neither
    /// loss nor gradient.
    fn compute(&self, predictions: &Tensor, targets: &Tensor, mut grads: Option<&mut [f32]>) -> f32 {
        let n_tokens = targets.len();
        let n_class = self.n_class;

        assert!(n_tokens > 0, "targets must be non-empty");
        assert_eq!(
            predictions.len(),
            n_tokens * n_class,
            "Predictions must be n_tokens * n_class"
        );

        let pred_data = predictions
            .data()
            .as_slice()
            .expect("prediction data must be contiguous");
        let target_data = targets.data();

        let mut total_loss = 0.0;
        for pos in 0..n_tokens {
            let start = pos * n_class;
            let logits = &pred_data[start..start + n_class];

            let probs = Self::softmax(logits);

            let target_idx = target_data[pos] as usize;
            if target_idx < n_class {
                let prob = probs[target_idx].max(1e-10);
                total_loss -= prob.ln();

                if let Some(g) = grads.as_deref_mut() {
                    for (i, &p) in probs.iter().enumerate() {
                        g[start + i] = if i == target_idx { p - 1.0 } else { p };
                    }
                }
            }
        }

        let scale = 1.0 / n_tokens as f32;
        if let Some(g) = grads {
            for v in g.iter_mut() {
                *v *= scale;
            }
        }

        total_loss * scale
    }
}

impl LossFn for CrossEntropyLoss {
    fn forward(&self, predictions: &Tensor, targets: &Tensor) -> Tensor {
        let mut grads = vec![0.0; predictions.len()];
        let avg_loss = self.compute(predictions, targets, Some(&mut grads));

        let mut loss = Tensor::from_vec(vec![avg_loss], true);

        struct CEBackward {
            pred_grad_cell: Rc<RefCell<Option<Array1<f32>>>>,
            pred_backward_op: Option<Rc<dyn BackwardOp>>,
            grad: Array1<f32>,
        }

        impl BackwardOp for CEBackward {
            fn backward(&self) {
                let mut pred_grad = self.pred_grad_cell.borrow_mut();
                if let Some(existing) = pred_grad.as_mut() {
                    *existing = &*existing + &self.grad;
                } else {
                    *pred_grad = Some(self.grad.clone());
                }
                drop(pred_grad); // Release borrow before recursive call

                if let Some(ref op) = self.pred_backward_op {
                    op.backward();
                }
            }
        }

        if predictions.requires_grad() {
            loss.set_backward_op(Rc::new(CEBackward {
                pred_grad_cell: predictions.grad_cell(),
                pred_backward_op: predictions.backward_op(),
                grad: Array1::from(grads),
            }));
        }

        loss
    }

    fn name(&self) -> &'static str {
        "CrossEntropy"
    }
}
