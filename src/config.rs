//! Simulation configuration.
//!
//! All knobs are fixed at construction time; nothing here is mutable at
//! runtime. Unknown keys are rejected at deserialization rather than at
//! point of use.

use serde::Deserialize;

use crate::error::FlError;

/// Feature names of the cardiovascular dataset, in column order.
pub const FEATURE_NAMES: [&str; 13] = [
    "age",
    "sex",
    "chest_pain_type",
    "resting_bp",
    "cholesterol",
    "fasting_bs",
    "resting_ecg",
    "max_heart_rate",
    "exercise_angina",
    "oldpeak",
    "st_slope",
    "ca",
    "thal",
];

/// Display names of the simulated data-holding parties.
pub const CLIENT_NAMES: [&str; 3] = [
    "St. Mary's Hospital",
    "Central Medical Center",
    "University Health System",
];

/// Configuration for a federated simulation run.
///
/// Every field has a documented default; deserialization fills missing
/// fields from those defaults and rejects unknown keys. Call
/// [`SimulationConfig::validate`] before handing the config to the
/// orchestrator.
#[derive(Clone, Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SimulationConfig {
    /// Number of simulated clients (default 3)
    pub num_clients: usize,
    /// Number of federated rounds (default 5)
    pub num_rounds: usize,
    /// Local optimization epochs per client per round (default 2)
    pub local_epochs: usize,
    /// Mini-batch size for local training and evaluation (default 32)
    pub batch_size: usize,
    /// SGD learning rate (default 1e-3)
    pub learning_rate: f32,
    /// Minimum clients required before a round may proceed (default 3)
    pub min_clients: usize,
    /// Synthetic samples generated per client (default 200)
    pub samples_per_client: usize,
    /// Fraction of each client's samples held out for evaluation (default 0.2)
    pub test_fraction: f32,
    /// Hidden layer widths of the shared model (default `[64, 32, 16]`)
    pub hidden_layers: Vec<usize>,
    /// Number of input features (default 13)
    pub num_features: usize,
    /// Base seed for weight init and dataset synthesis (default 42)
    pub seed: u64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            num_clients: 3,
            num_rounds: 5,
            local_epochs: 2,
            batch_size: 32,
            learning_rate: 1e-3,
            min_clients: 3,
            samples_per_client: 200,
            test_fraction: 0.2,
            hidden_layers: vec![64, 32, 16],
            num_features: 13,
            seed: 42,
        }
    }
}

impl SimulationConfig {
    /// Check every field against its allowed range.
    ///
    /// Returns [`FlError::InvalidConfig`] naming the first offending
    /// field. A config that passes here cannot fail validation again
    /// later in the round loop.
    pub fn validate(&self) -> Result<(), FlError> {
        if self.num_clients == 0 {
            return Err(FlError::InvalidConfig("num_clients must be >= 1".into()));
        }
        if self.num_rounds == 0 {
            return Err(FlError::InvalidConfig("num_rounds must be >= 1".into()));
        }
        if self.local_epochs == 0 {
            return Err(FlError::InvalidConfig("local_epochs must be >= 1".into()));
        }
        if self.batch_size == 0 {
            return Err(FlError::InvalidConfig("batch_size must be >= 1".into()));
        }
        if !(self.learning_rate > 0.0) || !self.learning_rate.is_finite() {
            return Err(FlError::InvalidConfig(
                "learning_rate must be finite and > 0".into(),
            ));
        }
        if self.min_clients == 0 {
            return Err(FlError::InvalidConfig("min_clients must be >= 1".into()));
        }
        if self.min_clients > self.num_clients {
            return Err(FlError::InvalidConfig(format!(
                "min_clients ({}) exceeds num_clients ({})",
                self.min_clients, self.num_clients
            )));
        }
        if self.samples_per_client < 2 {
            return Err(FlError::InvalidConfig(
                "samples_per_client must be >= 2".into(),
            ));
        }
        if !(self.test_fraction > 0.0 && self.test_fraction < 1.0) {
            return Err(FlError::InvalidConfig(
                "test_fraction must be in (0, 1)".into(),
            ));
        }
        if self.hidden_layers.is_empty() || self.hidden_layers.contains(&0) {
            return Err(FlError::InvalidConfig(
                "hidden_layers must be non-empty with positive widths".into(),
            ));
        }
        if self.num_features == 0 {
            return Err(FlError::InvalidConfig("num_features must be >= 1".into()));
        }
        Ok(())
    }

    /// Full layer-size sequence of the shared model: input, hidden, output.
    pub fn layer_sizes(&self) -> Vec<usize> {
        let mut sizes = Vec::with_capacity(self.hidden_layers.len() + 2);
        sizes.push(self.num_features);
        sizes.extend_from_slice(&self.hidden_layers);
        sizes.push(1);
        sizes
    }
}
