//! Client-side local training and evaluation.
//!
//! A client is an isolated data holder: it exposes only the train /
//! evaluate contract over its private [`ClientDataset`] and never the
//! raw data itself. Both operations take the current global parameters,
//! work on a fresh copy, and leave the caller's copy untouched.

use std::collections::HashMap;

use ndarray::Array2;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::dataset::ClientDataset;
use crate::error::FlError;
use crate::model::{self, ModelParameters};

/// Result of one client's local training pass, consumed by the
/// aggregation strategy. Lives only within one round.
#[derive(Clone, Debug)]
pub struct ClientUpdate {
    /// Locally trained parameters
    pub parameters: ModelParameters,
    /// Training-set size, used as the aggregation weight
    pub num_examples: usize,
    /// Training metrics (`train_loss`)
    pub metrics: HashMap<String, f32>,
}

/// Result of one client's local evaluation pass.
#[derive(Clone, Debug)]
pub struct EvaluationResult {
    /// Mean loss over the client's test examples
    pub loss: f32,
    /// Test-set size, used as the aggregation weight
    pub num_examples: usize,
    /// Evaluation metrics (`accuracy`)
    pub metrics: HashMap<String, f32>,
}

/// The contract a party must satisfy to participate in a round.
///
/// Implementations must be deterministic given the same parameters and
/// their own fixed data/seed, and must not retain or mutate the
/// parameters passed in.
pub trait LocalParty: Send + Sync {
    /// Train a fresh copy of the shared model on local data.
    fn train(
        &self,
        parameters: &ModelParameters,
        local_epochs: usize,
        batch_size: usize,
        learning_rate: f32,
    ) -> Result<ClientUpdate, FlError>;

    /// Evaluate the given parameters on local held-out data, without
    /// gradient computation.
    fn evaluate(
        &self,
        parameters: &ModelParameters,
        batch_size: usize,
    ) -> Result<EvaluationResult, FlError>;
}

/// A simulated data-holding party.
pub struct FederatedClient {
    id: usize,
    dataset: ClientDataset,
    shuffle_seed: u64,
}

impl FederatedClient {
    /// Create a client over its private dataset.
    ///
    /// `shuffle_seed` drives batch shuffling; the RNG is re-seeded on
    /// every `train` call so identical inputs give identical outputs.
    pub fn new(id: usize, dataset: ClientDataset, shuffle_seed: u64) -> Self {
        Self {
            id,
            dataset,
            shuffle_seed,
        }
    }

    /// Client identifier within the simulation.
    pub fn id(&self) -> usize {
        self.id
    }
}

impl LocalParty for FederatedClient {
    fn train(
        &self,
        parameters: &ModelParameters,
        local_epochs: usize,
        batch_size: usize,
        learning_rate: f32,
    ) -> Result<ClientUpdate, FlError> {
        let mut params = parameters.clone();
        let mut rng = StdRng::seed_from_u64(self.shuffle_seed);
        let n_train = self.dataset.num_train();

        let mut epoch_losses = Vec::with_capacity(local_epochs);
        for _ in 0..local_epochs {
            let mut order: Vec<usize> = (0..n_train).collect();
            order.shuffle(&mut rng);

            let mut batch_losses = Vec::new();
            for chunk in order.chunks(batch_size) {
                let (bx, by) = gather(&self.dataset.train_x, &self.dataset.train_y, chunk);
                let loss = model::train_batch(&mut params, &bx, &by, learning_rate);
                if !loss.is_finite() {
                    return Err(FlError::Training(format!(
                        "client {}: non-finite batch loss",
                        self.id
                    )));
                }
                batch_losses.push(loss);
            }
            epoch_losses.push(mean(&batch_losses));
        }

        let mut metrics = HashMap::new();
        metrics.insert("train_loss".to_string(), mean(&epoch_losses));

        Ok(ClientUpdate {
            parameters: params,
            num_examples: n_train,
            metrics,
        })
    }

    fn evaluate(
        &self,
        parameters: &ModelParameters,
        batch_size: usize,
    ) -> Result<EvaluationResult, FlError> {
        let n_test = self.dataset.num_test();
        let indices: Vec<usize> = (0..n_test).collect();

        let mut total_loss = 0.0f32;
        let mut correct = 0usize;
        for chunk in indices.chunks(batch_size) {
            let (bx, by) = gather(&self.dataset.test_x, &self.dataset.test_y, chunk);
            let predictions = model::forward(parameters, &bx);
            total_loss += model::bce_loss(&predictions, &by) * chunk.len() as f32;
            correct += predictions
                .iter()
                .zip(by.iter())
                .filter(|(&p, &t)| (p >= 0.5) == (t == 1.0))
                .count();
        }

        let loss = total_loss / n_test as f32;
        if !loss.is_finite() {
            return Err(FlError::Training(format!(
                "client {}: non-finite evaluation loss",
                self.id
            )));
        }

        let mut metrics = HashMap::new();
        metrics.insert("accuracy".to_string(), correct as f32 / n_test as f32);

        Ok(EvaluationResult {
            loss,
            num_examples: n_test,
            metrics,
        })
    }
}

/// Copy the given rows into contiguous batch arrays.
fn gather(x: &Array2<f32>, y: &Array2<f32>, rows: &[usize]) -> (Array2<f32>, Array2<f32>) {
    let mut bx = Array2::<f32>::zeros((rows.len(), x.ncols()));
    let mut by = Array2::<f32>::zeros((rows.len(), 1));
    for (dst, &src) in rows.iter().enumerate() {
        bx.row_mut(dst).assign(&x.row(src));
        by[[dst, 0]] = y[[src, 0]];
    }
    (bx, by)
}

fn mean(values: &[f32]) -> f32 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f32>() / values.len() as f32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset;
    use crate::model::init_parameters;

    fn test_client(id: usize) -> FederatedClient {
        let data = dataset::generate(id, 100, 0.2, 42);
        FederatedClient::new(id, data, 42 + id as u64)
    }

    fn test_params() -> ModelParameters {
        init_parameters(&[dataset::NUM_FEATURES, 8, 1], 7)
    }

    #[test]
    fn test_train_returns_update_with_weight() {
        let client = test_client(0);
        let params = test_params();
        let update = client.train(&params, 2, 32, 0.01).unwrap();

        assert_eq!(update.num_examples, 80);
        assert_eq!(update.parameters.len(), params.len());
        assert!(update.metrics["train_loss"].is_finite());
        assert_ne!(
            update.parameters, params,
            "Training should move the parameters"
        );
    }

    #[test]
    fn test_train_does_not_mutate_input() {
        let client = test_client(0);
        let params = test_params();
        let snapshot = params.clone();
        let _ = client.train(&params, 1, 32, 0.01).unwrap();
        assert_eq!(params, snapshot, "Caller's parameters must be untouched");
    }

    #[test]
    fn test_train_is_deterministic() {
        let client = test_client(1);
        let params = test_params();
        let a = client.train(&params, 2, 16, 0.01).unwrap();
        let b = client.train(&params, 2, 16, 0.01).unwrap();
        assert_eq!(a.parameters, b.parameters);
        assert_eq!(a.metrics["train_loss"], b.metrics["train_loss"]);
    }

    #[test]
    fn test_evaluate_bounds_and_weight() {
        let client = test_client(2);
        let params = test_params();
        let result = client.evaluate(&params, 32).unwrap();

        assert_eq!(result.num_examples, 20);
        assert!(result.loss.is_finite() && result.loss > 0.0);
        let acc = result.metrics["accuracy"];
        assert!((0.0..=1.0).contains(&acc), "Accuracy {} out of range", acc);
    }

    #[test]
    fn test_evaluate_is_read_only_and_idempotent() {
        let client = test_client(0);
        let params = test_params();
        let snapshot = params.clone();

        let a = client.evaluate(&params, 16).unwrap();
        let b = client.evaluate(&params, 16).unwrap();
        assert_eq!(params, snapshot);
        assert_eq!(a.loss, b.loss);
        assert_eq!(a.metrics["accuracy"], b.metrics["accuracy"]);
    }

    #[test]
    fn test_local_training_improves_own_fit() {
        // More local epochs should not leave training loss far above the
        // single-epoch loss on the same data.
        let client = test_client(0);
        let params = test_params();
        let short = client.train(&params, 1, 32, 0.05).unwrap();
        let long = client.train(&params, 10, 32, 0.05).unwrap();
        assert!(
            long.metrics["train_loss"] <= short.metrics["train_loss"] + 0.05,
            "10-epoch mean loss {} should not exceed 1-epoch loss {}",
            long.metrics["train_loss"],
            short.metrics["train_loss"]
        );
    }
}
