//! Shared model architecture: a feedforward binary classifier.
//!
//! The model is a stack of ReLU hidden layers with a single sigmoid
//! output. Its trainable state travels between clients and the
//! aggregator as [`ModelParameters`], an ordered list of 2D tensors laid
//! out `[w1, b1, w2, b2, ...]` where weight matrices are `(out, in)` and
//! biases are `1 x out` rows. The list length and per-tensor shapes are
//! fixed by the layer sizes and must match across all clients and rounds.

use ndarray::{Array2, Axis};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Ordered list of trainable tensors, the unit of exchange between
/// clients and the aggregator.
pub type ModelParameters = Vec<Array2<f32>>;

const BCE_EPS: f32 = 1e-7;

/// Initialize fresh parameters for the given layer sizes.
///
/// Weights use Xavier-uniform init drawn from a seeded RNG; biases start
/// at zero. The same `(layer_sizes, seed)` pair always produces the same
/// parameters.
pub fn init_parameters(layer_sizes: &[usize], seed: u64) -> ModelParameters {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut params = Vec::with_capacity((layer_sizes.len() - 1) * 2);

    for pair in layer_sizes.windows(2) {
        let (fan_in, fan_out) = (pair[0], pair[1]);
        let limit = (6.0 / (fan_in + fan_out) as f32).sqrt();
        let weights =
            Array2::from_shape_fn((fan_out, fan_in), |_| rng.gen_range(-limit..limit));
        params.push(weights);
        params.push(Array2::zeros((1, fan_out)));
    }

    params
}

/// Run the forward pass for a batch.
///
/// `x` is `(batch, features)`; the result is `(batch, 1)` of sigmoid
/// probabilities. Read-only: `params` is never mutated.
pub fn forward(params: &ModelParameters, x: &Array2<f32>) -> Array2<f32> {
    let n_layers = params.len() / 2;
    let mut activation = x.clone();

    for layer in 0..n_layers {
        let weights = &params[2 * layer];
        let bias = &params[2 * layer + 1];
        let z = activation.dot(&weights.t()) + bias;
        activation = if layer + 1 < n_layers {
            z.mapv(|v| v.max(0.0))
        } else {
            z.mapv(sigmoid)
        };
    }

    activation
}

/// One SGD step on a mini-batch: forward, binary cross-entropy backward,
/// in-place parameter update. Returns the batch mean loss measured
/// before the update.
///
/// `x` is `(batch, features)`, `y` is `(batch, 1)` of 0.0/1.0 labels.
pub fn train_batch(
    params: &mut ModelParameters,
    x: &Array2<f32>,
    y: &Array2<f32>,
    learning_rate: f32,
) -> f32 {
    let n_layers = params.len() / 2;
    let batch = x.nrows() as f32;

    // Forward pass, caching the input of each layer and the hidden
    // pre-activations needed for the ReLU derivative.
    let mut inputs: Vec<Array2<f32>> = Vec::with_capacity(n_layers);
    let mut pre_activations: Vec<Array2<f32>> = Vec::with_capacity(n_layers - 1);
    let mut activation = x.clone();

    for layer in 0..n_layers {
        inputs.push(activation.clone());
        let z = activation.dot(&params[2 * layer].t()) + &params[2 * layer + 1];
        activation = if layer + 1 < n_layers {
            pre_activations.push(z.clone());
            z.mapv(|v| v.max(0.0))
        } else {
            z.mapv(sigmoid)
        };
    }

    let loss = bce_loss(&activation, y);

    // Sigmoid + BCE collapse to (p - y) at the output pre-activation.
    let mut delta = (&activation - y) / batch;

    for layer in (0..n_layers).rev() {
        let grad_w = delta.t().dot(&inputs[layer]);
        let grad_b = delta.sum_axis(Axis(0)).insert_axis(Axis(0));

        if layer > 0 {
            let upstream = delta.dot(&params[2 * layer]);
            let mask = pre_activations[layer - 1].mapv(|v| if v > 0.0 { 1.0 } else { 0.0 });
            delta = upstream * mask;
        }

        params[2 * layer] = &params[2 * layer] - &(grad_w * learning_rate);
        params[2 * layer + 1] = &params[2 * layer + 1] - &(grad_b * learning_rate);
    }

    loss
}

/// Mean binary cross-entropy between predicted probabilities and 0/1
/// labels, both `(batch, 1)`.
pub fn bce_loss(predictions: &Array2<f32>, y: &Array2<f32>) -> f32 {
    let total: f32 = predictions
        .iter()
        .zip(y.iter())
        .map(|(&p, &t)| {
            let p = p.clamp(BCE_EPS, 1.0 - BCE_EPS);
            -(t * p.ln() + (1.0 - t) * (1.0 - p).ln())
        })
        .sum();
    total / predictions.nrows() as f32
}

fn sigmoid(z: f32) -> f32 {
    1.0 / (1.0 + (-z).exp())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn toy_sizes() -> Vec<usize> {
        vec![2, 4, 1]
    }

    #[test]
    fn test_init_shapes_and_determinism() {
        let a = init_parameters(&toy_sizes(), 7);
        let b = init_parameters(&toy_sizes(), 7);
        assert_eq!(a.len(), 4);
        assert_eq!(a[0].dim(), (4, 2));
        assert_eq!(a[1].dim(), (1, 4));
        assert_eq!(a[2].dim(), (1, 4));
        assert_eq!(a[3].dim(), (1, 1));
        assert_eq!(a, b, "Same seed must give identical parameters");

        let c = init_parameters(&toy_sizes(), 8);
        assert_ne!(a, c, "Different seeds should give different parameters");
    }

    #[test]
    fn test_forward_outputs_probabilities() {
        let params = init_parameters(&toy_sizes(), 1);
        let x = array![[0.5, -1.0], [2.0, 0.3], [-0.7, 0.9]];
        let out = forward(&params, &x);
        assert_eq!(out.dim(), (3, 1));
        for &p in out.iter() {
            assert!(p > 0.0 && p < 1.0, "Prediction {} not in (0, 1)", p);
        }
    }

    #[test]
    fn test_forward_does_not_mutate_params() {
        let params = init_parameters(&toy_sizes(), 1);
        let snapshot = params.clone();
        let x = array![[0.5, -1.0]];
        let _ = forward(&params, &x);
        assert_eq!(params, snapshot);
    }

    #[test]
    fn test_train_batch_reduces_loss_on_separable_data() {
        let mut params = init_parameters(&toy_sizes(), 3);
        // Linearly separable toy batch: label = 1 iff first feature > 0
        let x = array![[1.0, 0.2], [2.0, -0.5], [-1.0, 0.4], [-2.0, -0.1]];
        let y = array![[1.0], [1.0], [0.0], [0.0]];

        let first_loss = train_batch(&mut params, &x, &y, 0.5);
        let mut last_loss = first_loss;
        for _ in 0..200 {
            last_loss = train_batch(&mut params, &x, &y, 0.5);
        }
        assert!(
            last_loss < first_loss * 0.5,
            "Loss should drop substantially: {} -> {}",
            first_loss,
            last_loss
        );
    }

    #[test]
    fn test_bce_loss_perfect_predictions() {
        let preds = array![[1.0 - 1e-7], [1e-7]];
        let y = array![[1.0], [0.0]];
        assert!(bce_loss(&preds, &y) < 1e-5);
    }

    #[test]
    fn test_bce_loss_clamps_extremes() {
        // Exact 0/1 predictions must not produce inf/NaN
        let preds = array![[1.0], [0.0]];
        let y = array![[0.0], [1.0]];
        let loss = bce_loss(&preds, &y);
        assert!(loss.is_finite(), "Clamped BCE must stay finite, got {}", loss);
    }
}
