//! Model selection across the candidate estimator families
//!
//! Produces the Performance Table an operator uses to pick the production
//! family. No winner is chosen automatically.

use crate::config::PipelineConfig;
use crate::error::{AdmitError, Result};
use crate::evaluate::{mean_score, ShuffleSplitEvaluator};
use crate::metrics::Metric;
use crate::model::EstimatorFamily;
use ndarray::{Array1, Array2};
use polars::prelude::*;
use std::path::Path;
use tracing::{info, warn};

/// Mean cross-validated performance of one family.
#[derive(Debug, Clone, PartialEq)]
pub struct PerformanceRow {
    pub model: String,
    pub r2: f64,
    pub rmse: f64,
}

/// One row per successfully evaluated family.
#[derive(Debug, Clone, Default)]
pub struct PerformanceTable {
    pub rows: Vec<PerformanceRow>,
}

impl PerformanceTable {
    /// Look up one family's row by name.
    pub fn row(&self, model: &str) -> Option<&PerformanceRow> {
        self.rows.iter().find(|r| r.model == model)
    }

    /// Write the table as CSV with columns `model`, `r2`, `rmse`.
    pub fn to_csv(&self, path: &Path) -> Result<()> {
        let models: Vec<&str> = self.rows.iter().map(|r| r.model.as_str()).collect();
        let r2: Vec<f64> = self.rows.iter().map(|r| r.r2).collect();
        let rmse: Vec<f64> = self.rows.iter().map(|r| r.rmse).collect();

        let mut df = df!(
            "model" => models,
            "r2" => r2,
            "rmse" => rmse,
        )
        .map_err(|e| AdmitError::InvalidTrainingData(e.to_string()))?;

        let mut file = std::fs::File::create(path)?;
        CsvWriter::new(&mut file)
            .finish(&mut df)
            .map_err(|e| AdmitError::DataLoad(e.to_string()))?;

        info!(path = %path.display(), rows = self.rows.len(), "wrote performance table");
        Ok(())
    }

    /// Read a table previously written by [`PerformanceTable::to_csv`].
    pub fn from_csv(path: &Path) -> Result<Self> {
        let df = crate::prep::load_dataset(path)?;

        let models = df
            .column("model")
            .map_err(|_| AdmitError::FeatureNotFound("model".to_string()))?
            .as_materialized_series()
            .str()
            .map_err(|e| AdmitError::DataLoad(e.to_string()))?
            .into_iter()
            .map(|v| v.unwrap_or_default().to_string())
            .collect::<Vec<_>>();
        let r2 = crate::prep::column_to_array1(&df, "r2")?;
        let rmse = crate::prep::column_to_array1(&df, "rmse")?;

        let rows = models
            .into_iter()
            .zip(r2.iter().zip(rmse.iter()))
            .map(|(model, (&r2, &rmse))| PerformanceRow { model, r2, rmse })
            .collect();

        Ok(Self { rows })
    }
}

/// Evaluate every family under both metrics and assemble the table.
///
/// A family whose evaluation fails is logged and left out of the table; the
/// comparison over the remaining families still completes.
pub fn select(
    x_train: &Array2<f64>,
    y_train: &Array1<f64>,
    families: &[EstimatorFamily],
    config: &PipelineConfig,
) -> PerformanceTable {
    let evaluator =
        ShuffleSplitEvaluator::new(config.fold_count, config.validation_fraction, config.seed);

    let mut table = PerformanceTable::default();

    for &family in families {
        let r2_scores = evaluator.evaluate(family, &config.model, x_train, y_train, Metric::R2);
        let mse_scores = evaluator.evaluate(
            family,
            &config.model,
            x_train,
            y_train,
            Metric::NegMeanSquaredError,
        );

        match (r2_scores, mse_scores) {
            (Ok(r2_scores), Ok(mse_scores)) => {
                let r2 = mean_score(&r2_scores);
                // sqrt of the mean of the negated fold MSEs, not the mean of
                // per-fold RMSEs; the two orderings are not numerically
                // equivalent and downstream files assume this one
                let negated: Vec<f64> = mse_scores.iter().map(|s| -s).collect();
                let rmse = mean_score(&negated).sqrt();

                info!(family = family.name(), r2, rmse, "evaluated family");
                table.rows.push(PerformanceRow {
                    model: family.name().to_string(),
                    r2,
                    rmse,
                });
            }
            (Err(e), _) | (_, Err(e)) => {
                warn!(family = family.name(), error = %e, "family evaluation failed, skipping row");
            }
        }
    }

    table
}
