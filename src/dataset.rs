//! Synthetic cardiovascular dataset generation.
//!
//! Each simulated client owns one [`ClientDataset`]: a standardized
//! feature matrix with binary risk labels, already split into training
//! and held-out test partitions. Datasets are generated once per client
//! before round 1 and never leave the client's execution context.
//!
//! Labels come from a rule-based risk score over the raw features plus a
//! small per-client bias, so the clients are similar but not identically
//! distributed. Everything is driven by a seeded RNG: the same
//! `(client_id, seed)` pair always yields the same dataset.

use ndarray::{Array1, Array2};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};

/// A client's private data: training examples plus a held-out test set.
/// Immutable after creation.
#[derive(Clone, Debug)]
pub struct ClientDataset {
    /// Training features, `(n_train, n_features)`
    pub train_x: Array2<f32>,
    /// Training labels, `(n_train, 1)` of 0.0/1.0
    pub train_y: Array2<f32>,
    /// Test features, `(n_test, n_features)`
    pub test_x: Array2<f32>,
    /// Test labels, `(n_test, 1)` of 0.0/1.0
    pub test_y: Array2<f32>,
}

impl ClientDataset {
    /// Number of training examples (the client's aggregation weight).
    pub fn num_train(&self) -> usize {
        self.train_x.nrows()
    }

    /// Number of held-out test examples.
    pub fn num_test(&self) -> usize {
        self.test_x.nrows()
    }
}

/// Number of synthesized features per example.
pub const NUM_FEATURES: usize = 13;

/// Generate a client's dataset.
///
/// `seed` is the base simulation seed; the effective seed is
/// `seed + client_id` so clients draw distinct but reproducible data.
/// `test_fraction` of the samples (at least one) are held out for
/// evaluation.
pub fn generate(
    client_id: usize,
    num_samples: usize,
    test_fraction: f32,
    seed: u64,
) -> ClientDataset {
    let mut rng = StdRng::seed_from_u64(seed + client_id as u64);
    let noise = Normal::new(0.0f32, 0.1).expect("valid normal distribution");

    let mut x = Array2::<f32>::zeros((num_samples, NUM_FEATURES));
    for mut row in x.rows_mut() {
        row[0] = rng.gen_range(30..80) as f32; // age
        row[1] = rng.gen_range(0..2) as f32; // sex
        row[2] = rng.gen_range(0..4) as f32; // chest pain type
        row[3] = rng.gen_range(90..200) as f32; // resting blood pressure
        row[4] = rng.gen_range(120..400) as f32; // cholesterol
        row[5] = rng.gen_range(0..2) as f32; // fasting blood sugar
        row[6] = rng.gen_range(0..3) as f32; // resting ECG
        row[7] = rng.gen_range(70..200) as f32; // max heart rate
        row[8] = rng.gen_range(0..2) as f32; // exercise angina
        row[9] = rng.gen_range(0.0..6.0); // oldpeak
        row[10] = rng.gen_range(0..3) as f32; // ST slope
        row[11] = rng.gen_range(0..4) as f32; // major vessels
        row[12] = rng.gen_range(0..3) as f32; // thalassemia
    }

    // Rule-based risk score with a small per-client distribution shift.
    let client_bias = client_id as f32 * 0.05 - 0.05;
    let labels: Array1<f32> = x
        .rows()
        .into_iter()
        .map(|row| {
            let mut score = 0.0f32;
            score += if row[0] > 55.0 { 0.3 } else { 0.0 }; // age > 55
            score += if row[1] == 1.0 { 0.2 } else { 0.0 }; // male
            score += if row[2] >= 2.0 { 0.3 } else { 0.0 }; // chest pain
            score += if row[3] > 140.0 { 0.2 } else { 0.0 }; // high BP
            score += if row[4] > 240.0 { 0.3 } else { 0.0 }; // high cholesterol
            score += if row[7] < 120.0 { 0.2 } else { 0.0 }; // low max heart rate
            score += if row[8] == 1.0 { 0.3 } else { 0.0 }; // exercise angina
            score += client_bias + noise.sample(&mut rng);
            if score > 0.5 {
                1.0
            } else {
                0.0
            }
        })
        .collect();

    standardize(&mut x);

    // Seeded shuffle, then split off the held-out tail.
    let mut order: Vec<usize> = (0..num_samples).collect();
    order.shuffle(&mut rng);

    let n_test = ((num_samples as f32 * test_fraction).round() as usize)
        .clamp(1, num_samples - 1);
    let n_train = num_samples - n_test;

    let select = |indices: &[usize]| -> (Array2<f32>, Array2<f32>) {
        let mut fx = Array2::<f32>::zeros((indices.len(), NUM_FEATURES));
        let mut fy = Array2::<f32>::zeros((indices.len(), 1));
        for (dst, &src) in indices.iter().enumerate() {
            fx.row_mut(dst).assign(&x.row(src));
            fy[[dst, 0]] = labels[src];
        }
        (fx, fy)
    };

    let (train_x, train_y) = select(&order[..n_train]);
    let (test_x, test_y) = select(&order[n_train..]);

    ClientDataset {
        train_x,
        train_y,
        test_x,
        test_y,
    }
}

/// Standardize each feature column to zero mean and unit variance.
fn standardize(x: &mut Array2<f32>) {
    let n = x.nrows() as f32;
    for mut col in x.columns_mut() {
        let mean = col.sum() / n;
        let var = col.iter().map(|v| (v - mean).powi(2)).sum::<f32>() / n;
        let std = var.sqrt() + 1e-7;
        col.mapv_inplace(|v| (v - mean) / std);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_is_deterministic() {
        let a = generate(1, 100, 0.2, 42);
        let b = generate(1, 100, 0.2, 42);
        assert_eq!(a.train_x, b.train_x);
        assert_eq!(a.train_y, b.train_y);
        assert_eq!(a.test_x, b.test_x);
        assert_eq!(a.test_y, b.test_y);
    }

    #[test]
    fn test_clients_get_distinct_data() {
        let a = generate(0, 100, 0.2, 42);
        let b = generate(1, 100, 0.2, 42);
        assert_ne!(a.train_x, b.train_x, "Clients must not share data");
    }

    #[test]
    fn test_split_sizes() {
        let d = generate(0, 200, 0.2, 42);
        assert_eq!(d.num_train(), 160);
        assert_eq!(d.num_test(), 40);
        assert_eq!(d.train_x.ncols(), NUM_FEATURES);
        assert_eq!(d.train_y.dim(), (160, 1));
    }

    #[test]
    fn test_split_keeps_at_least_one_test_sample() {
        let d = generate(0, 10, 0.01, 42);
        assert!(d.num_test() >= 1);
        assert!(d.num_train() >= 1);
    }

    #[test]
    fn test_labels_are_binary() {
        let d = generate(2, 150, 0.2, 42);
        for &y in d.train_y.iter().chain(d.test_y.iter()) {
            assert!(y == 0.0 || y == 1.0, "Label {} is not binary", y);
        }
    }

    #[test]
    fn test_features_are_standardized() {
        let d = generate(0, 200, 0.2, 42);
        // Recombine and check per-column mean is near zero. The split
        // perturbs per-partition means, so allow a loose tolerance.
        for col in d.train_x.columns() {
            let mean = col.sum() / col.len() as f32;
            assert!(mean.abs() < 0.3, "Column mean {} too far from 0", mean);
        }
    }

    #[test]
    fn test_both_classes_present() {
        let d = generate(0, 200, 0.2, 42);
        let positives: f32 = d.train_y.sum();
        assert!(
            positives > 0.0 && positives < d.num_train() as f32,
            "Synthetic data should contain both classes, got {} positives",
            positives
        );
    }
}
