//! Estimator families for admission-chance regression
//!
//! The pipeline compares a closed set of three families: ordinary
//! least-squares linear regression, L1-regularized (lasso) linear regression
//! and a random forest regressor. [`EstimatorFamily::fit`] always builds a
//! fresh instance, so no fit state can leak between cross-validation folds.

mod forest;
mod linear;
mod tree;

pub use forest::RandomForestRegressor;
pub use linear::{LassoRegression, LinearRegression};
pub use tree::RegressionTree;

use crate::config::ModelParams;
use crate::error::Result;
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

/// One of the three candidate estimator families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EstimatorFamily {
    /// Ordinary least-squares linear regression
    Linear,
    /// L1-regularized linear regression
    Lasso,
    /// Random forest regression
    RandomForest,
}

impl EstimatorFamily {
    /// All families, in the order they appear in the Performance Table.
    pub fn all() -> [EstimatorFamily; 3] {
        [
            EstimatorFamily::Linear,
            EstimatorFamily::Lasso,
            EstimatorFamily::RandomForest,
        ]
    }

    /// Name used in the Performance Table and in logs.
    pub fn name(&self) -> &'static str {
        match self {
            EstimatorFamily::Linear => "linear",
            EstimatorFamily::Lasso => "lasso",
            EstimatorFamily::RandomForest => "rf",
        }
    }

    /// Build and fit a fresh model instance.
    pub fn fit(
        &self,
        params: &ModelParams,
        x: &Array2<f64>,
        y: &Array1<f64>,
    ) -> Result<FittedModel> {
        match self {
            EstimatorFamily::Linear => {
                let mut model = LinearRegression::new();
                model.fit(x, y)?;
                Ok(FittedModel::Linear(model))
            }
            EstimatorFamily::Lasso => {
                let mut model = LassoRegression::new(params.lasso_alpha);
                model.fit(x, y)?;
                Ok(FittedModel::Lasso(model))
            }
            EstimatorFamily::RandomForest => {
                let mut model =
                    RandomForestRegressor::new(params.forest_trees).with_random_state(params.seed);
                if let Some(depth) = params.forest_max_depth {
                    model = model.with_max_depth(depth);
                }
                model.fit(x, y)?;
                Ok(FittedModel::RandomForest(model))
            }
        }
    }
}

/// A fitted instance of one estimator family.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum FittedModel {
    Linear(LinearRegression),
    Lasso(LassoRegression),
    RandomForest(RandomForestRegressor),
}

impl FittedModel {
    /// Family this model was fitted from.
    pub fn family(&self) -> EstimatorFamily {
        match self {
            FittedModel::Linear(_) => EstimatorFamily::Linear,
            FittedModel::Lasso(_) => EstimatorFamily::Lasso,
            FittedModel::RandomForest(_) => EstimatorFamily::RandomForest,
        }
    }

    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        match self {
            FittedModel::Linear(m) => m.predict(x),
            FittedModel::Lasso(m) => m.predict(x),
            FittedModel::RandomForest(m) => m.predict(x),
        }
    }

    /// Intercept and per-feature coefficient vector, for families whose
    /// decision function is linear.
    pub fn linear_parts(&self) -> Option<(f64, &Array1<f64>)> {
        match self {
            FittedModel::Linear(m) => {
                Some((m.intercept?, m.coefficients.as_ref()?))
            }
            FittedModel::Lasso(m) => {
                Some((m.intercept?, m.coefficients.as_ref()?))
            }
            FittedModel::RandomForest(_) => None,
        }
    }

    /// Impurity-based importances, for families that expose them.
    pub fn feature_importances(&self) -> Option<&Array1<f64>> {
        match self {
            FittedModel::RandomForest(m) => m.feature_importances(),
            _ => None,
        }
    }
}
