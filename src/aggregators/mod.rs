//! Server-side aggregation strategy for federated rounds.
//!
//! Both aggregation paths are example-count weighted:
//!
//! | Operation | Input | Output |
//! |-----------|-------|--------|
//! | [`fedavg::fedavg_parameters`] | client parameter lists | new global parameters |
//! | [`metrics::weighted_metrics`] | `(num_examples, metrics)` pairs | round-level metrics |
//!
//! [`FedAvgStrategy`] wraps both with the participation policy: all
//! registered clients take part in every round, and a round may not
//! proceed with fewer clients than the configured minimum.

pub mod fedavg;
pub mod metrics;

pub use fedavg::fedavg_parameters;
pub use metrics::{weighted_mean, weighted_metrics};

use std::collections::HashMap;

use crate::client::{ClientUpdate, EvaluationResult};
use crate::error::FlError;
use crate::model::ModelParameters;

/// Federated-averaging strategy with a minimum-participation gate.
///
/// Fewer available clients than `min_clients` is a fatal configuration
/// error, not a retryable condition.
#[derive(Clone, Debug)]
pub struct FedAvgStrategy {
    min_clients: usize,
}

impl FedAvgStrategy {
    /// Create a strategy requiring at least `min_clients` participants.
    pub fn new(min_clients: usize) -> Self {
        Self { min_clients }
    }

    /// Combine client training updates into new global parameters.
    pub fn aggregate_parameters(
        &self,
        updates: &[ClientUpdate],
    ) -> Result<ModelParameters, FlError> {
        self.check_quorum(updates.len())?;

        let params: Vec<&ModelParameters> = updates.iter().map(|u| &u.parameters).collect();
        let weights: Vec<f32> = updates.iter().map(|u| u.num_examples as f32).collect();
        fedavg_parameters(&params, &weights)
    }

    /// Combine client training metrics into round-level metrics.
    pub fn aggregate_fit_metrics(
        &self,
        updates: &[ClientUpdate],
    ) -> Result<HashMap<String, f32>, FlError> {
        self.check_quorum(updates.len())?;

        let entries: Vec<(usize, &HashMap<String, f32>)> = updates
            .iter()
            .map(|u| (u.num_examples, &u.metrics))
            .collect();
        weighted_metrics(&entries)
    }

    /// Combine client evaluation results into a round-level weighted
    /// loss and metric map.
    pub fn aggregate_evaluations(
        &self,
        results: &[EvaluationResult],
    ) -> Result<(f32, HashMap<String, f32>), FlError> {
        self.check_quorum(results.len())?;

        let losses: Vec<(usize, f32)> = results
            .iter()
            .map(|r| (r.num_examples, r.loss))
            .collect();
        let loss = weighted_mean(&losses)?;

        let entries: Vec<(usize, &HashMap<String, f32>)> = results
            .iter()
            .map(|r| (r.num_examples, &r.metrics))
            .collect();
        let metrics = weighted_metrics(&entries)?;

        Ok((loss, metrics))
    }

    fn check_quorum(&self, actual: usize) -> Result<(), FlError> {
        if actual < self.min_clients {
            return Err(FlError::InsufficientClients {
                needed: self.min_clients,
                actual,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn update(value: f32, num_examples: usize) -> ClientUpdate {
        let mut metrics = HashMap::new();
        metrics.insert("train_loss".to_string(), value);
        ClientUpdate {
            parameters: vec![array![[value]]],
            num_examples,
            metrics,
        }
    }

    fn evaluation(loss: f32, accuracy: f32, num_examples: usize) -> EvaluationResult {
        let mut metrics = HashMap::new();
        metrics.insert("accuracy".to_string(), accuracy);
        EvaluationResult {
            loss,
            num_examples,
            metrics,
        }
    }

    #[test]
    fn test_parameter_aggregation_weighted() {
        let strategy = FedAvgStrategy::new(2);
        let updates = vec![update(1.0, 3), update(5.0, 1)];
        let result = strategy.aggregate_parameters(&updates).unwrap();
        // (3*1 + 1*5) / 4 = 2.0
        assert!((result[0][[0, 0]] - 2.0).abs() < 1e-6);
    }

    #[test]
    fn test_below_minimum_is_fatal() {
        let strategy = FedAvgStrategy::new(3);
        let updates = vec![update(1.0, 10), update(2.0, 10)];
        let result = strategy.aggregate_parameters(&updates);
        assert!(matches!(
            result.unwrap_err(),
            FlError::InsufficientClients {
                needed: 3,
                actual: 2
            }
        ));
    }

    #[test]
    fn test_evaluation_aggregation() {
        let strategy = FedAvgStrategy::new(2);
        let results = vec![evaluation(0.4, 0.8, 100), evaluation(1.0, 0.6, 50)];
        let (loss, metrics) = strategy.aggregate_evaluations(&results).unwrap();
        assert!((loss - 0.6).abs() < 1e-6);
        assert!((metrics["accuracy"] - 0.73333335).abs() < 1e-6);
    }

    #[test]
    fn test_fit_metric_aggregation() {
        let strategy = FedAvgStrategy::new(1);
        let updates = vec![update(0.5, 10), update(1.5, 30)];
        let metrics = strategy.aggregate_fit_metrics(&updates).unwrap();
        // (0.5*10 + 1.5*30) / 40 = 1.25
        assert!((metrics["train_loss"] - 1.25).abs() < 1e-6);
    }
}
