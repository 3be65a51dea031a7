//! Final training, held-out evaluation and coefficient export
//!
//! This is the only module allowed to touch the held-out test partition, and
//! it touches it exactly once per run. The exported Coefficient Table is the
//! sole artifact the serving layer reads; it is a plain CSV so loading it
//! needs none of the training code.

use crate::config::ModelParams;
use crate::error::{AdmitError, Result};
use crate::metrics::{mean_squared_error, r2_score};
use crate::model::{EstimatorFamily, FittedModel, RandomForestRegressor};
use ndarray::{Array1, Array2};
use polars::prelude::*;
use std::path::Path;
use tracing::info;

/// Fit the chosen family on the full training partition.
///
/// A failure here is fatal to the pipeline run; unlike selection there is no
/// other family to fall back on.
pub fn train(
    family: EstimatorFamily,
    params: &ModelParams,
    x_train: &Array2<f64>,
    y_train: &Array1<f64>,
) -> Result<FittedModel> {
    let model = family.fit(params, x_train, y_train)?;
    info!(
        family = family.name(),
        rows = x_train.nrows(),
        features = x_train.ncols(),
        "trained production model"
    );
    Ok(model)
}

/// Single-shot (r2, rmse) evaluation on the reserved test partition.
pub fn evaluate_held_out(
    model: &FittedModel,
    x_test: &Array2<f64>,
    y_test: &Array1<f64>,
) -> Result<(f64, f64)> {
    let y_pred = model.predict(x_test)?;
    let r2 = r2_score(y_test, &y_pred);
    let rmse = mean_squared_error(y_test, &y_pred).sqrt();
    info!(r2, rmse, rows = x_test.nrows(), "held-out evaluation");
    Ok((r2, rmse))
}

/// Rank features by random-forest importance, ascending.
///
/// Always fits a random forest regardless of the production family; the
/// ranking is diagnostic and never feeds the exported Coefficient Table.
pub fn feature_importance(
    x_train: &Array2<f64>,
    y_train: &Array1<f64>,
    feature_names: &[String],
    params: &ModelParams,
) -> Result<Vec<(String, f64)>> {
    let mut forest =
        RandomForestRegressor::new(params.forest_trees).with_random_state(params.seed);
    forest.fit(x_train, y_train)?;

    let importances = forest
        .feature_importances()
        .ok_or(AdmitError::ModelNotFitted)?;

    let mut ranked: Vec<(String, f64)> = feature_names
        .iter()
        .cloned()
        .zip(importances.iter().copied())
        .collect();
    ranked.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));

    Ok(ranked)
}

/// Portable export of a fitted linear model.
///
/// Ordered (parameter, coefficient) pairs; the first entry is always the
/// intercept and the rest follow the training feature order 1:1.
#[derive(Debug, Clone, PartialEq)]
pub struct CoefficientTable {
    pub entries: Vec<(String, f64)>,
}

impl CoefficientTable {
    pub fn intercept(&self) -> f64 {
        self.entries.first().map(|(_, v)| *v).unwrap_or(0.0)
    }

    /// Serving-side prediction: intercept + dot product, clamped to [0, 1].
    ///
    /// `features` must follow the same order as the exported feature rows.
    pub fn predict(&self, features: &[f64]) -> Result<f64> {
        if features.len() + 1 != self.entries.len() {
            return Err(AdmitError::Shape {
                expected: format!("{} features", self.entries.len().saturating_sub(1)),
                actual: format!("{} features", features.len()),
            });
        }

        let raw = self.intercept()
            + self
                .entries
                .iter()
                .skip(1)
                .zip(features.iter())
                .map(|((_, coef), feat)| coef * feat)
                .sum::<f64>();
        Ok(raw.clamp(0.0, 1.0))
    }

    /// Write as CSV with columns `params`, `coefs`.
    pub fn to_csv(&self, path: &Path) -> Result<()> {
        let params: Vec<&str> = self.entries.iter().map(|(n, _)| n.as_str()).collect();
        let coefs: Vec<f64> = self.entries.iter().map(|(_, v)| *v).collect();

        let mut df = df!(
            "params" => params,
            "coefs" => coefs,
        )
        .map_err(|e| AdmitError::InvalidTrainingData(e.to_string()))?;

        let mut file = std::fs::File::create(path)?;
        CsvWriter::new(&mut file)
            .finish(&mut df)
            .map_err(|e| AdmitError::DataLoad(e.to_string()))?;

        info!(path = %path.display(), entries = self.entries.len(), "wrote coefficient table");
        Ok(())
    }

    /// Load a table previously written by [`CoefficientTable::to_csv`].
    pub fn from_csv(path: &Path) -> Result<Self> {
        let df = crate::prep::load_dataset(path)?;

        let names = df
            .column("params")
            .map_err(|_| AdmitError::FeatureNotFound("params".to_string()))?
            .as_materialized_series()
            .str()
            .map_err(|e| AdmitError::DataLoad(e.to_string()))?
            .into_iter()
            .map(|v| v.unwrap_or_default().to_string())
            .collect::<Vec<_>>();
        let coefs = crate::prep::column_to_array1(&df, "coefs")?;

        if names.first().map(String::as_str) != Some("intercept") {
            return Err(AdmitError::DataLoad(
                "coefficient table must start with an intercept row".to_string(),
            ));
        }

        Ok(Self {
            entries: names.into_iter().zip(coefs.iter().copied()).collect(),
        })
    }
}

/// Export a fitted model's intercept and coefficients.
///
/// Only linear families have a coefficient vector to export; the serving
/// layer relies on the linear decision function to predict with a dot
/// product instead of re-invoking the estimator.
pub fn export(model: &FittedModel, feature_columns: &[String]) -> Result<CoefficientTable> {
    let (intercept, coefficients) = model.linear_parts().ok_or_else(|| {
        AdmitError::UnsupportedExport(format!(
            "family '{}' has no linear coefficient vector",
            model.family().name()
        ))
    })?;

    if coefficients.len() != feature_columns.len() {
        return Err(AdmitError::Shape {
            expected: format!("{} coefficients", feature_columns.len()),
            actual: format!("{} coefficients", coefficients.len()),
        });
    }

    let mut entries = Vec::with_capacity(feature_columns.len() + 1);
    entries.push(("intercept".to_string(), intercept));
    for (name, &coef) in feature_columns.iter().zip(coefficients.iter()) {
        entries.push((name.clone(), coef));
    }

    Ok(CoefficientTable { entries })
}

/// Write the held-out metrics as a one-row CSV with columns `r2`, `rmse`.
pub fn write_held_out_metrics(r2: f64, rmse: f64, path: &Path) -> Result<()> {
    let mut df = df!(
        "r2" => [r2],
        "rmse" => [rmse],
    )
    .map_err(|e| AdmitError::InvalidTrainingData(e.to_string()))?;

    let mut file = std::fs::File::create(path)?;
    CsvWriter::new(&mut file)
        .finish(&mut df)
        .map_err(|e| AdmitError::DataLoad(e.to_string()))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn plane() -> (Array2<f64>, Array1<f64>) {
        // y = 0.5*x1 + 0.25*x2
        let x = array![
            [1.0, 1.0],
            [2.0, 1.0],
            [1.0, 2.0],
            [2.0, 2.0],
            [3.0, 2.0],
            [3.0, 3.0],
        ];
        let y = array![0.75, 1.25, 1.0, 1.5, 2.0, 2.25];
        (x, y)
    }

    fn small_params() -> ModelParams {
        ModelParams {
            forest_trees: 10,
            ..ModelParams::default()
        }
    }

    fn feature_names(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("f{}", i)).collect()
    }

    #[test]
    fn test_export_linear_shape_and_order() {
        let (x, y) = plane();
        let model = train(EstimatorFamily::Linear, &small_params(), &x, &y).unwrap();
        let names = feature_names(2);

        let table = export(&model, &names).unwrap();
        assert_eq!(table.entries.len(), 3); // feature count + 1
        assert_eq!(table.entries[0].0, "intercept");
        assert_eq!(table.entries[1].0, "f0");
        assert_eq!(table.entries[2].0, "f1");
        assert!((table.entries[1].1 - 0.5).abs() < 1e-8);
        assert!((table.entries[2].1 - 0.25).abs() < 1e-8);
    }

    #[test]
    fn test_export_forest_unsupported() {
        let (x, y) = plane();
        let model = train(EstimatorFamily::RandomForest, &small_params(), &x, &y).unwrap();
        let err = export(&model, &feature_names(2)).unwrap_err();
        assert!(matches!(err, AdmitError::UnsupportedExport(_)));
    }

    #[test]
    fn test_export_feature_count_mismatch() {
        let (x, y) = plane();
        let model = train(EstimatorFamily::Linear, &small_params(), &x, &y).unwrap();
        let err = export(&model, &feature_names(5)).unwrap_err();
        assert!(matches!(err, AdmitError::Shape { .. }));
    }

    #[test]
    fn test_train_empty_target_is_invalid() {
        let x = Array2::<f64>::zeros((0, 2));
        let y = Array1::<f64>::zeros(0);
        let err = train(EstimatorFamily::Linear, &small_params(), &x, &y).unwrap_err();
        assert!(matches!(err, AdmitError::InvalidTrainingData(_)));
    }

    #[test]
    fn test_held_out_perfect_fit() {
        let (x, y) = plane();
        let model = train(EstimatorFamily::Linear, &small_params(), &x, &y).unwrap();
        let (r2, rmse) = evaluate_held_out(&model, &x, &y).unwrap();
        assert!((r2 - 1.0).abs() < 1e-9);
        assert!(rmse < 1e-9);
    }

    #[test]
    fn test_feature_importance_sorted_ascending() {
        let x = array![
            [1.0, 0.5],
            [2.0, 0.5],
            [3.0, 0.5],
            [4.0, 0.5],
            [5.0, 0.5],
            [6.0, 0.5],
        ];
        let y = array![1.0, 2.0, 3.0, 4.0, 5.0, 6.0];

        let ranked = feature_importance(&x, &y, &feature_names(2), &small_params()).unwrap();
        assert_eq!(ranked.len(), 2);
        assert!(ranked[0].1 <= ranked[1].1);
        assert_eq!(ranked[1].0, "f0"); // the informative feature ranks last
    }

    #[test]
    fn test_coefficient_table_predict_clamps() {
        let table = CoefficientTable {
            entries: vec![
                ("intercept".to_string(), 0.5),
                ("f0".to_string(), 1.0),
            ],
        };
        assert_eq!(table.predict(&[0.2]).unwrap(), 0.7);
        assert_eq!(table.predict(&[10.0]).unwrap(), 1.0);
        assert_eq!(table.predict(&[-10.0]).unwrap(), 0.0);
        assert!(matches!(
            table.predict(&[1.0, 2.0]).unwrap_err(),
            AdmitError::Shape { .. }
        ));
    }

    #[test]
    fn test_coefficient_table_empty_rejects_any_input() {
        let table = CoefficientTable { entries: vec![] };
        assert!(matches!(
            table.predict(&[]).unwrap_err(),
            AdmitError::Shape { .. }
        ));
        assert!(matches!(
            table.predict(&[1.0]).unwrap_err(),
            AdmitError::Shape { .. }
        ));
    }

    #[test]
    fn test_coefficient_table_csv_round_trip() {
        let (x, y) = plane();
        let model = train(EstimatorFamily::Linear, &small_params(), &x, &y).unwrap();
        let table = export(&model, &feature_names(2)).unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("final_model.csv");
        table.to_csv(&path).unwrap();

        let loaded = CoefficientTable::from_csv(&path).unwrap();
        assert_eq!(loaded.entries.len(), table.entries.len());
        for ((n1, v1), (n2, v2)) in loaded.entries.iter().zip(table.entries.iter()) {
            assert_eq!(n1, n2);
            assert!((v1 - v2).abs() < 1e-9);
        }
    }

    #[test]
    fn test_training_is_idempotent() {
        let (x, y) = plane();
        let names = feature_names(2);
        let params = small_params();

        let first = export(&train(EstimatorFamily::Linear, &params, &x, &y).unwrap(), &names).unwrap();
        let second = export(&train(EstimatorFamily::Linear, &params, &x, &y).unwrap(), &names).unwrap();

        for ((_, v1), (_, v2)) in first.entries.iter().zip(second.entries.iter()) {
            assert!((v1 - v2).abs() < 1e-6);
        }
    }
}
