//! Per-prediction feature attribution.
//!
//! Attribution uses a deterministic occlusion baseline: each feature's
//! contribution is the change in the model's output when that feature is
//! zeroed (the post-standardization mean). This is coarser than gradient
//! or Shapley methods but has no background-sample dependence and is
//! exactly reproducible.

use ndarray::Array2;
use serde::Serialize;
use tracing::debug;

use crate::config::FEATURE_NAMES;
use crate::dataset::NUM_FEATURES;
use crate::error::FlError;
use crate::model::{self, ModelParameters};

/// Risk bucket for a predicted probability, split at 0.5.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum RiskLevel {
    /// Predicted probability above 0.5
    High,
    /// Predicted probability at or below 0.5
    Low,
}

/// One feature's contribution to a prediction.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FeatureAttribution {
    /// Feature name
    pub feature: &'static str,
    /// The input value supplied for this feature
    pub value: f32,
    /// Prediction minus the prediction with this feature zeroed
    pub attribution: f32,
}

/// Outcome of an explanation request.
///
/// The untrained-model case is reported explicitly rather than papered
/// over with a heuristic prediction.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Explanation {
    /// A trained model produced a prediction and attributions.
    Explained {
        /// Predicted probability of the positive class
        prediction: f32,
        /// Risk bucket derived from the prediction
        risk_level: RiskLevel,
        /// Distance from the decision boundary, scaled to `[0, 1]`
        confidence: f32,
        /// Per-feature attributions, descending by absolute value
        feature_importance: Vec<FeatureAttribution>,
    },
    /// No trained model is available.
    Unavailable {
        /// Why no explanation could be produced
        reason: String,
    },
}

/// Explain a single prediction against trained global parameters.
///
/// `features` must hold exactly one standardized value per model
/// feature, in [`FEATURE_NAMES`] order. Passing `None` for the
/// parameters yields [`Explanation::Unavailable`].
pub fn explain_prediction(
    parameters: Option<&ModelParameters>,
    features: &[f32],
) -> Result<Explanation, FlError> {
    if features.len() != NUM_FEATURES {
        return Err(FlError::InvalidConfig(format!(
            "expected {} features, got {}",
            NUM_FEATURES,
            features.len()
        )));
    }

    let Some(parameters) = parameters else {
        return Ok(Explanation::Unavailable {
            reason: "no trained model available; complete a training run first".to_string(),
        });
    };

    let input = Array2::from_shape_vec((1, NUM_FEATURES), features.to_vec())?;
    let prediction = model::forward(parameters, &input)[[0, 0]];

    let mut feature_importance: Vec<FeatureAttribution> = (0..NUM_FEATURES)
        .map(|i| {
            let mut occluded = input.clone();
            occluded[[0, i]] = 0.0;
            let baseline = model::forward(parameters, &occluded)[[0, 0]];
            FeatureAttribution {
                feature: FEATURE_NAMES[i],
                value: features[i],
                attribution: prediction - baseline,
            }
        })
        .collect();
    feature_importance.sort_by(|a, b| {
        b.attribution
            .abs()
            .partial_cmp(&a.attribution.abs())
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    debug!(prediction, "explained prediction");

    Ok(Explanation::Explained {
        prediction,
        risk_level: if prediction > 0.5 {
            RiskLevel::High
        } else {
            RiskLevel::Low
        },
        confidence: (prediction - 0.5).abs() * 2.0,
        feature_importance,
    })
}
