//! Example-count-weighted metric aggregation.

use std::collections::HashMap;

use crate::error::FlError;

/// Aggregate per-client metrics into round-level metrics.
///
/// Each entry is `(num_examples, metrics)`. For every metric key, the
/// result is the mean of the reported values weighted by the example
/// counts of the clients that reported it. A zero weighted total is
/// rejected rather than silently producing NaN.
pub fn weighted_metrics(
    entries: &[(usize, &HashMap<String, f32>)],
) -> Result<HashMap<String, f32>, FlError> {
    if entries.is_empty() {
        return Err(FlError::EmptyUpdates);
    }

    let total: usize = entries.iter().map(|(n, _)| n).sum();
    if total == 0 {
        return Err(FlError::ZeroWeightSum);
    }

    let mut keys: Vec<&String> = entries
        .iter()
        .flat_map(|(_, metrics)| metrics.keys())
        .collect();
    keys.sort();
    keys.dedup();

    let mut aggregated = HashMap::with_capacity(keys.len());
    for key in keys {
        let mut weighted_sum = 0.0f64;
        let mut weight = 0.0f64;
        for (n, metrics) in entries {
            if let Some(&value) = metrics.get(key) {
                weighted_sum += *n as f64 * value as f64;
                weight += *n as f64;
            }
        }
        if weight == 0.0 {
            return Err(FlError::ZeroWeightSum);
        }
        aggregated.insert(key.clone(), (weighted_sum / weight) as f32);
    }

    Ok(aggregated)
}

/// Weighted mean of per-client scalar values (e.g. evaluation losses).
pub fn weighted_mean(entries: &[(usize, f32)]) -> Result<f32, FlError> {
    if entries.is_empty() {
        return Err(FlError::EmptyUpdates);
    }
    let total: usize = entries.iter().map(|(n, _)| n).sum();
    if total == 0 {
        return Err(FlError::ZeroWeightSum);
    }
    let weighted_sum: f64 = entries
        .iter()
        .map(|(n, v)| *n as f64 * *v as f64)
        .sum();
    Ok((weighted_sum / total as f64) as f32)
}
