//! admitml - graduate admission chance prediction pipeline
//!
//! Offline pipeline that cleans applicant data, compares three regression
//! families by cross-validated error, and exports the chosen linear model's
//! coefficients as a portable CSV the serving layer reads at request time.
//!
//! # Modules
//!
//! - [`prep`] - dataset loading, grade rescaling, train/test split
//! - [`evaluate`] - shuffled-subsampling cross-validation of one family
//! - [`select`] - per-family performance table for operator model selection
//! - [`train`] - final fit, held-out check, coefficient export
//! - [`model`] - the closed set of estimator families (OLS, lasso, forest)
//! - [`metrics`] - regression scoring
//! - [`config`] - explicit pipeline configuration
//! - [`error`] - typed failure taxonomy
//! - [`cli`] - subcommands that sequence the offline stages

pub mod cli;
pub mod config;
pub mod error;
pub mod evaluate;
pub mod metrics;
pub mod model;
pub mod prep;
pub mod select;
pub mod train;

pub use config::PipelineConfig;
pub use error::{AdmitError, Result};
