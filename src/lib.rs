//! # Cardio-FL: Federated Heart-Disease Risk Training
//!
//! Cardio-FL simulates federated training of a heart-disease risk
//! classifier across several in-process clients, each holding a private
//! synthetic dataset. No raw examples ever cross a client boundary; only
//! parameter updates and metrics do.
//!
//! ## Components
//!
//! - [`run_simulation()`] - Drive a full multi-round FedAvg simulation
//! - [`FedAvgStrategy`] - Example-count-weighted parameter and metric aggregation
//! - [`FederatedClient`] - Local trainer and evaluator over a private dataset
//! - [`explain_prediction()`] - Occlusion-based per-feature attribution
//!
//! ## High-Level API
//!
//! Use [`TrainingManager`] to run simulations on a background thread and
//! poll status, metrics, and final parameters from any number of handles.

#![deny(missing_docs)]

pub mod aggregators;
pub mod client;
pub mod config;
pub mod dataset;
pub mod error;
pub mod explain;
pub mod manager;
pub mod model;
pub mod simulation;

// Re-exports
pub use aggregators::fedavg_parameters;
pub use aggregators::weighted_metrics;
pub use aggregators::FedAvgStrategy;
pub use client::{ClientUpdate, EvaluationResult, FederatedClient, LocalParty};
pub use config::SimulationConfig;
pub use error::FlError;
pub use explain::{explain_prediction, Explanation};
pub use manager::{TrainingManager, TrainingPhase};
pub use model::ModelParameters;
pub use simulation::{run_simulation, RoundRecord, SimulationOutcome};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
