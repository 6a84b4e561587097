//! Error types for cardio-fl

use thiserror::Error;

/// All possible errors in cardio-fl
#[derive(Error, Debug)]
pub enum FlError {
    /// No client updates were provided for aggregation
    #[error("Empty updates provided")]
    EmptyUpdates,

    /// Client updates have inconsistent tensor shapes
    #[error("Shape mismatch in client updates at tensor {index}")]
    ShapeMismatch {
        /// Position of the offending tensor in the parameter list
        index: usize,
    },

    /// Fewer clients available than the configured minimum
    #[error("Insufficient clients: need {needed}, got {actual}")]
    InsufficientClients {
        /// Minimum required participants
        needed: usize,
        /// Actual participants received
        actual: usize,
    },

    /// Aggregation weights sum to zero
    #[error("Aggregation weight sum is zero")]
    ZeroWeightSum,

    /// A configuration field is missing, unknown, or out of range
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// `start` was called while a run is already in progress
    #[error("Training is already in progress")]
    AlreadyRunning,

    /// `reset` was called while a run is in progress
    #[error("Cannot reset while training is in progress")]
    ResetWhileTraining,

    /// A local training or evaluation step failed
    #[error("Training failed: {0}")]
    Training(String),

    /// Array shape mismatch from tensor construction
    #[error("Array shape error: {0}")]
    ShapeError(String),
}

impl From<ndarray::ShapeError> for FlError {
    fn from(e: ndarray::ShapeError) -> Self {
        FlError::ShapeError(e.to_string())
    }
}
