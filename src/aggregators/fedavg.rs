//! Federated averaging over layered parameter lists.
//!
//! Standard FedAvg as described by McMahan et al. (2017), generalized to
//! the multi-tensor parameter lists exchanged here: each tensor position
//! is averaged independently across clients, weighted by example count.

use ndarray::Array2;
use rayon::prelude::*;

use crate::error::FlError;
use crate::model::ModelParameters;

/// Example-count-weighted average of client parameter lists.
///
/// For each tensor position `i`, computes
/// `sum(updates[c][i] * weights[c]) / sum(weights)` element-wise.
/// Every update must carry the same number of tensors with identical
/// shapes at each position; a mismatch is a fatal configuration error.
///
/// # Arguments
///
/// * `updates` - One parameter list per client
/// * `weights` - Per-client weights (training example counts)
pub fn fedavg_parameters(
    updates: &[&ModelParameters],
    weights: &[f32],
) -> Result<ModelParameters, FlError> {
    if updates.is_empty() {
        return Err(FlError::EmptyUpdates);
    }
    if weights.len() != updates.len() {
        return Err(FlError::InvalidConfig(format!(
            "{} weights for {} updates",
            weights.len(),
            updates.len()
        )));
    }

    let n_tensors = updates[0].len();
    for update in &updates[1..] {
        if update.len() != n_tensors {
            return Err(FlError::ShapeMismatch { index: 0 });
        }
    }
    for (index, tensor) in updates[0].iter().enumerate() {
        for update in &updates[1..] {
            if update[index].dim() != tensor.dim() {
                return Err(FlError::ShapeMismatch { index });
            }
        }
    }

    let weight_sum: f32 = weights.iter().sum();
    if weight_sum <= 0.0 {
        return Err(FlError::ZeroWeightSum);
    }

    let aggregated: Vec<Array2<f32>> = (0..n_tensors)
        .into_par_iter()
        .map(|index| {
            let dim = updates[0][index].dim();
            let weighted_sum = updates.iter().zip(weights.iter()).fold(
                Array2::<f32>::zeros(dim),
                |acc, (update, &weight)| acc + &(&update[index] * weight),
            );
            weighted_sum / weight_sum
        })
        .collect();

    Ok(aggregated)
}
