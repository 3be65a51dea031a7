//! Pipeline configuration
//!
//! All paths, column names and hyperparameters travel through an explicit
//! [`PipelineConfig`] value handed to each component, so tests can run with
//! synthetic configurations instead of process-wide constants.

use serde::{Deserialize, Serialize};

/// Configuration for the offline pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Feature columns, in the order they appear in the Coefficient Table
    pub feature_columns: Vec<String>,
    /// Target column name
    pub target_column: String,
    /// Column rescaled from a 0-10 grade to a 0-4 grade-point scale
    pub rescale_column: String,
    /// Fraction of rows reserved for the held-out test partition
    pub test_fraction: f64,
    /// Number of shuffled validation folds during model selection
    pub fold_count: usize,
    /// Fraction of the training partition held out per validation fold
    pub validation_fraction: f64,
    /// Seed for every random partition in the pipeline
    pub seed: u64,
    /// Estimator hyperparameters
    pub model: ModelParams,
}

/// Fixed hyperparameters for the three estimator families.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelParams {
    /// L1 regularization strength for the lasso family
    pub lasso_alpha: f64,
    /// Number of trees in the random forest family
    pub forest_trees: usize,
    /// Maximum tree depth, unlimited when `None`
    pub forest_max_depth: Option<usize>,
    /// Seed for forest bootstrap sampling
    pub seed: u64,
}

impl Default for ModelParams {
    fn default() -> Self {
        Self {
            lasso_alpha: 1.0,
            forest_trees: 100,
            forest_max_depth: None,
            seed: 1995,
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            feature_columns: [
                "GRE Score",
                "TOEFL Score",
                "University Rating",
                "SOP",
                "LOR",
                "CGPA",
                "Research",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            target_column: "Chance of Admit".to_string(),
            rescale_column: "CGPA".to_string(),
            test_fraction: 0.25,
            fold_count: 3,
            validation_fraction: 0.3,
            seed: 1995,
            model: ModelParams::default(),
        }
    }
}

impl PipelineConfig {
    /// Set the test fraction
    pub fn with_test_fraction(mut self, fraction: f64) -> Self {
        self.test_fraction = fraction;
        self
    }

    /// Set the random seed (also used for forest bootstrapping)
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self.model.seed = seed;
        self
    }

    /// Set the fold count for model selection
    pub fn with_fold_count(mut self, folds: usize) -> Self {
        self.fold_count = folds;
        self
    }

    /// Set the per-fold validation fraction
    pub fn with_validation_fraction(mut self, fraction: f64) -> Self {
        self.validation_fraction = fraction;
        self
    }

    /// Replace the feature/target schema
    pub fn with_schema(mut self, features: Vec<String>, target: &str) -> Self {
        self.feature_columns = features;
        self.target_column = target.to_string();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_schema() {
        let config = PipelineConfig::default();
        assert_eq!(config.feature_columns.len(), 7);
        assert_eq!(config.feature_columns[0], "GRE Score");
        assert_eq!(config.target_column, "Chance of Admit");
        assert_eq!(config.seed, 1995);
    }

    #[test]
    fn test_builder_overrides() {
        let config = PipelineConfig::default()
            .with_seed(7)
            .with_test_fraction(0.5)
            .with_schema(vec!["a".into(), "b".into()], "y");
        assert_eq!(config.seed, 7);
        assert_eq!(config.model.seed, 7);
        assert_eq!(config.test_fraction, 0.5);
        assert_eq!(config.target_column, "y");
    }
}
