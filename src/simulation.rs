//! Multi-round federated simulation driver.
//!
//! Drives N sequential rounds over a fixed set of in-process clients:
//! broadcast the global parameters, train locally on every client,
//! aggregate the updates, evaluate the new global model on every client,
//! aggregate the evaluation metrics, and append one history record.
//! Rounds are strictly sequential; within a round, per-client work runs
//! in parallel on the rayon pool and is collected at a barrier before
//! aggregation. Any client or aggregation failure aborts the whole run
//! and discards the partial round.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::aggregators::FedAvgStrategy;
use crate::client::{FederatedClient, LocalParty};
use crate::config::SimulationConfig;
use crate::dataset;
use crate::error::FlError;
use crate::model::{self, ModelParameters};

/// Metrics of one completed round. Immutable once appended.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RoundRecord {
    /// Round number, starting at 1
    pub round: usize,
    /// Example-weighted accuracy across all clients' test sets
    pub accuracy: f32,
    /// Example-weighted evaluation loss, when computed
    pub loss: Option<f32>,
}

/// Output of a completed simulation run.
#[derive(Clone, Debug)]
pub struct SimulationOutcome {
    /// One record per round, in round order
    pub history: Vec<RoundRecord>,
    /// The final global parameters
    pub parameters: ModelParameters,
}

/// Run a full federated simulation.
///
/// Builds one client (with a freshly generated private dataset) per
/// `config.num_clients`, initializes global parameters from the config
/// seed, and drives `config.num_rounds` rounds. Fully deterministic for
/// a given config.
pub fn run_simulation(config: &SimulationConfig) -> Result<SimulationOutcome, FlError> {
    run_simulation_observed(config, |_, _| {})
}

/// [`run_simulation`] with a progress hook.
///
/// `observer(completed_round, total_rounds)` fires after each round's
/// record is appended, from the calling thread.
pub fn run_simulation_observed(
    config: &SimulationConfig,
    observer: impl Fn(usize, usize),
) -> Result<SimulationOutcome, FlError> {
    config.validate()?;

    // Datasets are generated once, before round 1, and reused.
    let clients: Vec<FederatedClient> = (0..config.num_clients)
        .map(|id| {
            let data = dataset::generate(
                id,
                config.samples_per_client,
                config.test_fraction,
                config.seed,
            );
            FederatedClient::new(id, data, config.seed + id as u64)
        })
        .collect();

    info!(
        num_clients = config.num_clients,
        num_rounds = config.num_rounds,
        "starting federated simulation"
    );

    let parameters = model::init_parameters(&config.layer_sizes(), config.seed);
    let strategy = FedAvgStrategy::new(config.min_clients);
    run_rounds(&clients, &strategy, parameters, config, &observer)
}

/// Round loop over any set of parties. Separated from client/dataset
/// construction so the loop can be driven with arbitrary parties.
fn run_rounds<P: LocalParty>(
    clients: &[P],
    strategy: &FedAvgStrategy,
    mut parameters: ModelParameters,
    config: &SimulationConfig,
    observer: &impl Fn(usize, usize),
) -> Result<SimulationOutcome, FlError> {
    let mut history = Vec::with_capacity(config.num_rounds);

    for round in 1..=config.num_rounds {
        // Broadcast + local training on every client, collected at a
        // barrier before aggregation. Parallel execution order between
        // clients is unobservable: each client is deterministic on its
        // own seed and the collected order matches client order.
        let updates = clients
            .par_iter()
            .map(|client| {
                client.train(
                    &parameters,
                    config.local_epochs,
                    config.batch_size,
                    config.learning_rate,
                )
            })
            .collect::<Result<Vec<_>, _>>()?;

        let train_metrics = strategy.aggregate_fit_metrics(&updates)?;
        parameters = strategy.aggregate_parameters(&updates)?;

        // Broadcast the aggregated parameters and evaluate everywhere.
        let evaluations = clients
            .par_iter()
            .map(|client| client.evaluate(&parameters, config.batch_size))
            .collect::<Result<Vec<_>, _>>()?;

        let (loss, eval_metrics) = strategy.aggregate_evaluations(&evaluations)?;
        let accuracy = eval_metrics
            .get("accuracy")
            .copied()
            .ok_or_else(|| FlError::Training("evaluation metrics missing accuracy".into()))?;

        debug!(round, ?train_metrics, "local training aggregated");
        info!(round, accuracy, loss, "round complete");

        history.push(RoundRecord {
            round,
            accuracy,
            loss: Some(loss),
        });
        observer(round, config.num_rounds);
    }

    Ok(SimulationOutcome {
        history,
        parameters,
    })
}
