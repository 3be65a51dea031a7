//! Error types for the admission pipeline

use thiserror::Error;

/// Crate-wide result type
pub type Result<T> = std::result::Result<T, AdmitError>;

/// Errors raised by the pipeline components.
///
/// Callers discriminate failure kinds on the variant, never on the message
/// text. Feature preparation and the evaluator surface these to their caller;
/// the selector treats a single family's failure as a missing row instead of
/// aborting the comparison.
#[derive(Error, Debug)]
pub enum AdmitError {
    /// Input file is missing or cannot be parsed into a tabular structure
    #[error("failed to load dataset: {0}")]
    DataLoad(String),

    /// Too few rows to form the requested partition
    #[error("not enough rows: need at least {needed}, got {got}")]
    InsufficientData { needed: usize, got: usize },

    /// Cross-validation was asked to evaluate on zero training rows
    #[error("training set is empty")]
    EmptyTrainingSet,

    /// Non-numeric or otherwise unusable training input
    #[error("invalid training data: {0}")]
    InvalidTrainingData(String),

    /// Linear-style coefficient export requested for a non-linear family
    #[error("cannot export coefficients: {0}")]
    UnsupportedExport(String),

    /// Named column is absent from the dataset
    #[error("column not found: {0}")]
    FeatureNotFound(String),

    /// Dimension mismatch between related inputs
    #[error("shape mismatch: expected {expected}, got {actual}")]
    Shape { expected: String, actual: String },

    /// Prediction or scoring requested before fitting
    #[error("model has not been fitted")]
    ModelNotFitted,

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
