//! Mean cross-entropy estimation over sampled batches

use crate::batch::Batch;
use crate::loss::CrossEntropyLoss;
use crate::model::Model;
use std::collections::HashMap;
use std::fmt;

/// A named data partition batches are drawn from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Split {
    /// Training partition
    Train,
    /// Held-out evaluation partition
    Eval,
}

impl Split {
    /// Both partitions, in estimation order
    pub const ALL: [Split; 2] = [Split::Train, Split::Eval];

    /// Partition name as used in batch sources and reports
    pub const fn as_str(self) -> &'static str {
        match self {
            Split::Train => "train",
            Split::Eval => "eval",
        }
    }
}

impl fmt::Display for Split {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Estimate mean cross-entropy loss per split
///
/// For each split, draws `eval_iters` batches from `get_batch`, runs the
/// model forward, and records the per-batch cross-entropy between the
/// flattened logits and targets. Returns the arithmetic mean per split.
///
/// Losses are computed through the value-only path, so no backward ops are
/// created and no gradient cell is touched; parameters are never mutated
/// (`forward` takes `&self`).
///
/// Batch-source errors propagate unmodified. Shape mismatches between the
/// model's logits and `n_class * targets.len()` panic, as do mismatched
/// batches inside the loss.
///
/// # Panics
///
/// Panics if `eval_iters` is zero.
///
/// # Errors
///
/// Returns the first error produced by `get_batch`.
///
/// # Example
///
/// ```
/// use estimar::{estimate_ce_losses, Batch, Model, Split, Tensor};
///
/// struct Uniform;
///
/// impl Model for Uniform {
///     fn forward(&self, inputs: &Tensor) -> Tensor {
///         // One token per input element, uniform over 4 classes
///         Tensor::from_vec(vec![0.0; inputs.len() * 4], false)
///     }
///     fn parameters(&self) -> Vec<Tensor> {
///         Vec::new()
///     }
/// }
///
/// let get_batch = |_split: Split| -> Result<Batch, std::convert::Infallible> {
///     Ok(Batch::new(
///         Tensor::from_vec(vec![1.0, 2.0], false),
///         Tensor::from_vec(vec![0.0, 3.0], false),
///     ))
/// };
///
/// let losses = estimate_ce_losses(&Uniform, get_batch, 4, 5).unwrap();
/// assert_eq!(losses.len(), 2);
/// assert!((losses[&Split::Train] - 4.0_f32.ln()).abs() < 1e-5);
/// ```
pub fn estimate_ce_losses<M, F, E>(
    model: &M,
    mut get_batch: F,
    n_class: usize,
    eval_iters: usize,
) -> Result<HashMap<Split, f32>, E>
where
    M: Model + ?Sized,
    F: FnMut(Split) -> Result<Batch, E>,
{
    assert!(eval_iters > 0, "eval_iters must be positive");

    let loss_fn = CrossEntropyLoss::new(n_class);
    let mut out = HashMap::with_capacity(Split::ALL.len());

    for split in Split::ALL {
        let mut losses = vec![0.0f32; eval_iters];
        for slot in losses.iter_mut() {
            let batch = get_batch(split)?;

            let logits = model.forward(&batch.inputs);
            *slot = loss_fn.value(&logits, &batch.targets);
        }
        let mean = losses.iter().sum::<f32>() / eval_iters as f32;
        out.insert(split, mean);
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Tensor;
    use approx::assert_relative_eq;
    use std::cell::Cell;
    use std::convert::Infallible;

    /// Emits its inputs unchanged as logits; one weight parameter for
    /// mutation checks.
    struct Passthrough {
        weight: Tensor,
    }

    impl Passthrough {
        fn new() -> Self {
            Self {
                weight: Tensor::from_vec(vec![1.0, -1.0], true),
            }
        }
    }

    impl Model for Passthrough {
        fn forward(&self, inputs: &Tensor) -> Tensor {
            Tensor::from_vec(inputs.data().to_vec(), false)
        }

        fn parameters(&self) -> Vec<Tensor> {
            vec![self.weight.clone()]
        }
    }

    fn uniform_batch(n_tokens: usize, n_class: usize) -> Batch {
        Batch::new(
            Tensor::from_vec(vec![0.0; n_tokens * n_class], false),
            Tensor::from_vec(vec![0.0; n_tokens], false),
        )
    }

    #[test]
    fn test_returns_exactly_train_and_eval() {
        let model = Passthrough::new();
        let losses = estimate_ce_losses(
            &model,
            |_| Ok::<_, Infallible>(uniform_batch(2, 3)),
            3,
            4,
        )
        .unwrap();

        assert_eq!(losses.len(), 2);
        assert!(losses.contains_key(&Split::Train));
        assert!(losses.contains_key(&Split::Eval));
    }

    #[test]
    fn test_uniform_logits_mean_is_ln_n_class() {
        let model = Passthrough::new();
        let losses = estimate_ce_losses(
            &model,
            |_| Ok::<_, Infallible>(uniform_batch(3, 5)),
            5,
            8,
        )
        .unwrap();

        assert_relative_eq!(losses[&Split::Train], 5.0_f32.ln(), epsilon = 1e-5);
        assert_relative_eq!(losses[&Split::Eval], 5.0_f32.ln(), epsilon = 1e-5);
    }

    #[test]
    fn test_mean_of_controlled_per_batch_losses() {
        // Batches alternate between a perfectly confident and a uniform
        // prediction over 2 classes; the mean must match by hand.
        let model = Passthrough::new();
        let k = Cell::new(0usize);

        let get_batch = |_split: Split| -> Result<Batch, Infallible> {
            let i = k.get();
            k.set(i + 1);
            let logits = if i % 2 == 0 {
                vec![30.0, -30.0] // loss ~ 0
            } else {
                vec![0.0, 0.0] // loss = ln 2
            };
            Ok(Batch::new(
                Tensor::from_vec(logits, false),
                Tensor::from_vec(vec![0.0], false),
            ))
        };

        let losses = estimate_ce_losses(&model, get_batch, 2, 4).unwrap();

        let expected = (2.0 * 2.0_f32.ln()) / 4.0;
        assert_relative_eq!(losses[&Split::Train], expected, epsilon = 1e-5);
        assert_relative_eq!(losses[&Split::Eval], expected, epsilon = 1e-5);
    }

    #[test]
    fn test_draws_eval_iters_batches_per_split() {
        let model = Passthrough::new();
        let calls = Cell::new(0usize);
        let train_calls = Cell::new(0usize);

        let _ = estimate_ce_losses(
            &model,
            |split| {
                calls.set(calls.get() + 1);
                if split == Split::Train {
                    train_calls.set(train_calls.get() + 1);
                }
                Ok::<_, Infallible>(uniform_batch(1, 2))
            },
            2,
            7,
        )
        .unwrap();

        assert_eq!(calls.get(), 14);
        assert_eq!(train_calls.get(), 7);
    }

    #[test]
    fn test_batch_source_error_propagates() {
        let model = Passthrough::new();
        let k = Cell::new(0usize);

        let result = estimate_ce_losses(
            &model,
            |_| {
                let i = k.get();
                k.set(i + 1);
                if i == 2 {
                    Err("batch source exhausted")
                } else {
                    Ok(uniform_batch(1, 2))
                }
            },
            2,
            5,
        );

        assert_eq!(result.unwrap_err(), "batch source exhausted");
    }

    #[test]
    fn test_parameters_and_grads_untouched() {
        let model = Passthrough::new();
        let before: Vec<f32> = model.parameters()[0].data().to_vec();

        let _ = estimate_ce_losses(
            &model,
            |_| Ok::<_, Infallible>(uniform_batch(2, 2)),
            2,
            3,
        )
        .unwrap();

        let params = model.parameters();
        assert_eq!(params[0].data().to_vec(), before);
        assert!(params[0].grad().is_none());
    }

    #[test]
    #[should_panic(expected = "eval_iters must be positive")]
    fn test_zero_eval_iters_panics() {
        let model = Passthrough::new();
        let _ = estimate_ce_losses(
            &model,
            |_| Ok::<_, Infallible>(uniform_batch(1, 2)),
            2,
            0,
        );
    }

    #[test]
    #[should_panic(expected = "Predictions must be n_tokens * n_class")]
    fn test_shape_mismatch_propagates() {
        let model = Passthrough::new();
        // Logits have 4 elements but n_class * n_tokens = 3
        let _ = estimate_ce_losses(
            &model,
            |_| {
                Ok::<_, Infallible>(Batch::new(
                    Tensor::from_vec(vec![0.0; 4], false),
                    Tensor::from_vec(vec![0.0], false),
                ))
            },
            3,
            1,
        );
    }

    #[test]
    fn test_split_names() {
        assert_eq!(Split::Train.as_str(), "train");
        assert_eq!(Split::Eval.as_str(), "eval");
        assert_eq!(Split::Eval.to_string(), "eval");
        assert_eq!(Split::ALL.len(), 2);
    }
}
