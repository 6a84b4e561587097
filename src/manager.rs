//! Background training manager.
//!
//! Owns the only mutable state shared between the background run and
//! foreground readers: a status state machine
//! (`idle -> training -> completed | error`, with an explicit reset back
//! to `idle`), round counters, timestamps, and the append-only round
//! history. A single mutex guards the whole field set, so status
//! transitions are atomic and `start`/`reset` can never interleave with
//! the background completion write. The history is installed in one
//! write on completion; readers observe either the pre-run empty history
//! or the complete post-run one, never a partial run.
//!
//! There is no cancellation or timeout: a started run always proceeds to
//! completion or failure. A hung party stalls the run indefinitely.

use std::sync::Arc;
use std::thread::{self, JoinHandle};

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use tracing::{info, warn};

use crate::config::SimulationConfig;
use crate::error::FlError;
use crate::model::ModelParameters;
use crate::simulation::{self, RoundRecord, SimulationOutcome};

/// Lifecycle phase of the training manager.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TrainingPhase {
    /// No run has started since construction or the last reset
    Idle,
    /// A background run is in progress
    Training,
    /// The last run finished successfully
    Completed,
    /// The last run failed; see `error_message`
    Error,
}

/// Immutable status snapshot for polling callers.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct StatusSnapshot {
    /// Current lifecycle phase
    pub status: TrainingPhase,
    /// Rounds completed so far in the current or last run
    pub current_round: usize,
    /// Total rounds of the current or last run (0 before the first round)
    pub total_rounds: usize,
    /// `current_round / total_rounds`, or 0 when no rounds are known
    pub progress: f32,
    /// When the current or last run started
    pub start_time: Option<DateTime<Utc>>,
    /// When the last run finished (success or failure)
    pub end_time: Option<DateTime<Utc>>,
    /// Failure description when `status` is `error`
    pub error_message: Option<String>,
}

/// Snapshot of the round history for metrics readers.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MetricsReport {
    /// One record per completed round, in round order
    pub history: Vec<RoundRecord>,
    /// Current lifecycle phase
    pub status: TrainingPhase,
    /// Total rounds of the last completed run
    pub total_rounds: usize,
}

/// Derived summary of a completed run's history.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MetricsSummary {
    /// Number of recorded rounds
    pub total_rounds: usize,
    /// Mean accuracy across all rounds
    pub average_accuracy: f32,
    /// Accuracy of the most recent round
    pub latest_accuracy: f32,
    /// Latest accuracy minus first-round accuracy
    pub improvement: f32,
    /// The full per-round history
    pub rounds: Vec<RoundRecord>,
}

#[derive(Debug)]
struct ManagerState {
    phase: TrainingPhase,
    current_round: usize,
    total_rounds: usize,
    history: Vec<RoundRecord>,
    error_message: Option<String>,
    start_time: Option<DateTime<Utc>>,
    end_time: Option<DateTime<Utc>>,
    parameters: Option<ModelParameters>,
}

impl ManagerState {
    fn initial() -> Self {
        Self {
            phase: TrainingPhase::Idle,
            current_round: 0,
            total_rounds: 0,
            history: Vec::new(),
            error_message: None,
            start_time: None,
            end_time: None,
            parameters: None,
        }
    }
}

struct Inner {
    config: SimulationConfig,
    state: Mutex<ManagerState>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

/// Process-wide coordinator for background federated training.
///
/// Explicitly constructed and injectable; clones share the same state.
/// All operations return immediately except [`TrainingManager::wait`].
#[derive(Clone)]
pub struct TrainingManager {
    inner: Arc<Inner>,
}

type Job = Box<dyn FnOnce(&dyn Fn(usize, usize)) -> Result<SimulationOutcome, FlError> + Send>;

impl TrainingManager {
    /// Create a manager that runs simulations with the given config.
    pub fn new(config: SimulationConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                config,
                state: Mutex::new(ManagerState::initial()),
                worker: Mutex::new(None),
            }),
        }
    }

    /// The configuration every run uses.
    pub fn config(&self) -> &SimulationConfig {
        &self.inner.config
    }

    /// Start a background training run.
    ///
    /// Atomically checks that no run is in progress, clears the
    /// counters, history and error of any previous run, records the
    /// start time and launches the simulation on a background thread.
    /// Returns immediately. Fails with [`FlError::AlreadyRunning`] while
    /// a run is in progress; starting over a completed or failed run is
    /// an implicit reset.
    pub fn start(&self) -> Result<(), FlError> {
        let config = self.inner.config.clone();
        self.start_job(Box::new(move |observer| {
            simulation::run_simulation_observed(&config, observer)
        }))
    }

    fn start_job(&self, job: Job) -> Result<(), FlError> {
        {
            let mut state = self.inner.state.lock();
            if state.phase == TrainingPhase::Training {
                return Err(FlError::AlreadyRunning);
            }
            *state = ManagerState::initial();
            state.phase = TrainingPhase::Training;
            state.start_time = Some(Utc::now());
        }
        info!("training run started");

        // Reap the previous worker, if any; it has already published its
        // terminal state.
        if let Some(handle) = self.inner.worker.lock().take() {
            let _ = handle.join();
        }

        let inner = Arc::clone(&self.inner);
        let handle = thread::spawn(move || {
            let observer = |round: usize, total: usize| {
                let mut state = inner.state.lock();
                state.current_round = round;
                state.total_rounds = total;
            };
            let result = job(&observer);

            let mut state = inner.state.lock();
            match result {
                Ok(SimulationOutcome {
                    history,
                    parameters,
                }) => {
                    state.total_rounds = history.len();
                    state.current_round = state.total_rounds;
                    state.history = history;
                    state.parameters = Some(parameters);
                    state.phase = TrainingPhase::Completed;
                    state.end_time = Some(Utc::now());
                    info!(rounds = state.total_rounds, "training run completed");
                }
                Err(e) => {
                    state.phase = TrainingPhase::Error;
                    state.error_message = Some(e.to_string());
                    state.history.clear();
                    state.end_time = Some(Utc::now());
                    warn!(error = %e, "training run failed");
                }
            }
        });
        *self.inner.worker.lock() = Some(handle);

        Ok(())
    }

    /// Return all fields to their initial defaults.
    ///
    /// Fails with [`FlError::ResetWhileTraining`] while a run is in
    /// progress, leaving the state untouched.
    pub fn reset(&self) -> Result<(), FlError> {
        let mut state = self.inner.state.lock();
        if state.phase == TrainingPhase::Training {
            return Err(FlError::ResetWhileTraining);
        }
        *state = ManagerState::initial();
        info!("training manager reset");
        Ok(())
    }

    /// Immutable status snapshot. Never blocks on the running job.
    pub fn status(&self) -> StatusSnapshot {
        let state = self.inner.state.lock();
        let progress = if state.total_rounds == 0 {
            0.0
        } else {
            state.current_round as f32 / state.total_rounds as f32
        };
        StatusSnapshot {
            status: state.phase,
            current_round: state.current_round,
            total_rounds: state.total_rounds,
            progress,
            start_time: state.start_time,
            end_time: state.end_time,
            error_message: state.error_message.clone(),
        }
    }

    /// Snapshot of the round history. Safe to call concurrently with an
    /// in-progress run: the history is replaced atomically on
    /// completion, never mutated incrementally.
    pub fn metrics(&self) -> MetricsReport {
        let state = self.inner.state.lock();
        MetricsReport {
            history: state.history.clone(),
            status: state.phase,
            total_rounds: state.total_rounds,
        }
    }

    /// Derived summary of the recorded history.
    pub fn summary(&self) -> MetricsSummary {
        let state = self.inner.state.lock();
        let rounds = state.history.clone();
        let n = rounds.len();
        let average_accuracy = if n == 0 {
            0.0
        } else {
            rounds.iter().map(|r| r.accuracy).sum::<f32>() / n as f32
        };
        let latest_accuracy = rounds.last().map(|r| r.accuracy).unwrap_or(0.0);
        let first_accuracy = rounds.first().map(|r| r.accuracy).unwrap_or(0.0);
        MetricsSummary {
            total_rounds: n,
            average_accuracy,
            latest_accuracy,
            improvement: latest_accuracy - first_accuracy,
            rounds,
        }
    }

    /// The final global parameters of the last completed run, if any.
    pub fn final_parameters(&self) -> Option<ModelParameters> {
        self.inner.state.lock().parameters.clone()
    }

    /// Block until the current background run (if any) finishes.
    ///
    /// Convenience for embedders and tests; the original polling flow
    /// never needs it.
    pub fn wait(&self) {
        if let Some(handle) = self.inner.worker.lock().take() {
            let _ = handle.join();
        }
    }
}
