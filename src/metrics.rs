//! Regression metrics

use ndarray::Array1;
use serde::{Deserialize, Serialize};

/// Scoring metric for cross-validated evaluation.
///
/// Both metrics follow the "larger is better" convention: mean squared error
/// is negated so the evaluator never has to special-case direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Metric {
    /// Coefficient of determination
    R2,
    /// Negated mean squared error
    NegMeanSquaredError,
}

impl Metric {
    /// Short name used in logs
    pub fn name(&self) -> &'static str {
        match self {
            Metric::R2 => "r2",
            Metric::NegMeanSquaredError => "neg_mean_squared_error",
        }
    }

    /// Score predictions against the true targets
    pub fn score(&self, y_true: &Array1<f64>, y_pred: &Array1<f64>) -> f64 {
        match self {
            Metric::R2 => r2_score(y_true, y_pred),
            Metric::NegMeanSquaredError => -mean_squared_error(y_true, y_pred),
        }
    }
}

/// Coefficient of determination.
///
/// A constant target with zero residuals scores 1.0; a constant target with
/// nonzero residuals scores 0.0.
pub fn r2_score(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> f64 {
    let y_mean = y_true.mean().unwrap_or(0.0);
    let ss_res: f64 = y_true
        .iter()
        .zip(y_pred.iter())
        .map(|(t, p)| (t - p).powi(2))
        .sum();
    let ss_tot: f64 = y_true.iter().map(|t| (t - y_mean).powi(2)).sum();

    if ss_tot == 0.0 {
        if ss_res == 0.0 {
            1.0
        } else {
            0.0
        }
    } else {
        1.0 - ss_res / ss_tot
    }
}

/// Mean squared error
pub fn mean_squared_error(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> f64 {
    if y_true.is_empty() {
        return 0.0;
    }
    y_true
        .iter()
        .zip(y_pred.iter())
        .map(|(t, p)| (t - p).powi(2))
        .sum::<f64>()
        / y_true.len() as f64
}
