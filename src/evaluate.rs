//! Cross-validated model evaluation
//!
//! Shuffled random subsampling validation: every fold draws a fresh seeded
//! shuffle of the training partition, so folds may overlap across repeats.
//! This favors simplicity and speed over the exhaustive coverage of k-fold
//! partitioning. The held-out test partition is never touched here.

use crate::config::ModelParams;
use crate::error::{AdmitError, Result};
use crate::metrics::Metric;
use crate::model::EstimatorFamily;
use ndarray::{Array1, Array2, Axis};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::debug;

/// Repeated shuffled train/validation evaluation of one estimator family.
#[derive(Debug, Clone)]
pub struct ShuffleSplitEvaluator {
    fold_count: usize,
    validation_fraction: f64,
    seed: u64,
}

impl ShuffleSplitEvaluator {
    pub fn new(fold_count: usize, validation_fraction: f64, seed: u64) -> Self {
        Self {
            fold_count,
            validation_fraction,
            seed,
        }
    }

    /// Score `family` across the configured folds.
    ///
    /// Each fold seeds its own shuffle with `seed + fold`, fits a fresh
    /// instance of the family on the fold's training rows, and scores it on
    /// the fold's held-out rows. The returned distribution has exactly
    /// `fold_count` entries.
    pub fn evaluate(
        &self,
        family: EstimatorFamily,
        params: &ModelParams,
        x: &Array2<f64>,
        y: &Array1<f64>,
        metric: Metric,
    ) -> Result<Vec<f64>> {
        let n = x.nrows();
        if n == 0 {
            return Err(AdmitError::EmptyTrainingSet);
        }

        let val_size = (n as f64 * self.validation_fraction).ceil() as usize;
        if val_size == 0 || val_size >= n {
            return Err(AdmitError::InsufficientData {
                needed: val_size + 1,
                got: n,
            });
        }

        let mut scores = Vec::with_capacity(self.fold_count);

        for fold in 0..self.fold_count {
            let mut indices: Vec<usize> = (0..n).collect();
            let mut rng = ChaCha8Rng::seed_from_u64(self.seed.wrapping_add(fold as u64));
            indices.shuffle(&mut rng);
            let (val_idx, train_idx) = indices.split_at(val_size);

            let x_fold = x.select(Axis(0), train_idx);
            let y_fold = Array1::from_vec(train_idx.iter().map(|&i| y[i]).collect());
            let x_val = x.select(Axis(0), val_idx);
            let y_val = Array1::from_vec(val_idx.iter().map(|&i| y[i]).collect());

            let model = family.fit(params, &x_fold, &y_fold)?;
            let y_pred = model.predict(&x_val)?;
            let score = metric.score(&y_val, &y_pred);

            debug!(
                family = family.name(),
                metric = metric.name(),
                fold,
                score,
                "scored validation fold"
            );
            scores.push(score);
        }

        Ok(scores)
    }
}

/// Mean of a scoring distribution.
pub fn mean_score(scores: &[f64]) -> f64 {
    if scores.is_empty() {
        return 0.0;
    }
    scores.iter().sum::<f64>() / scores.len() as f64
}
