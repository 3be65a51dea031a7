//! Command-line interface sequencing the offline pipeline stages

use clap::{Parser, Subcommand};
use polars::prelude::{CsvWriter, SerWriter};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::config::PipelineConfig;
use crate::model::EstimatorFamily;
use crate::{prep, select, train};

#[derive(Parser)]
#[command(name = "admitml")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Graduate admission chance prediction pipeline")]
pub struct Cli {
    /// Optional JSON pipeline configuration; defaults to the admission schema
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Rescale the grade column and write the cleaned dataset
    Clean {
        /// Raw dataset CSV
        #[arg(short, long)]
        input: PathBuf,
        /// Where to write the cleaned CSV
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Compare the candidate families and write the performance table
    Select {
        /// Cleaned dataset CSV
        #[arg(short, long)]
        data: PathBuf,
        /// Where to write the performance table CSV
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Train the production family, evaluate held-out, export coefficients
    Train {
        /// Cleaned dataset CSV
        #[arg(short, long)]
        data: PathBuf,
        /// Production family (linear, lasso, rf)
        #[arg(short, long, default_value = "linear")]
        family: String,
        /// Where to write the coefficient table CSV
        #[arg(long)]
        coefficients: PathBuf,
        /// Optional held-out metrics CSV
        #[arg(long)]
        metrics: Option<PathBuf>,
    },
}

/// Load the pipeline configuration, falling back to the admission defaults.
pub fn load_config(path: Option<&Path>) -> anyhow::Result<PipelineConfig> {
    match path {
        Some(path) => {
            let text = std::fs::read_to_string(path)?;
            Ok(serde_json::from_str(&text)?)
        }
        None => Ok(PipelineConfig::default()),
    }
}

pub fn cmd_clean(config: &PipelineConfig, input: &Path, output: &Path) -> anyhow::Result<()> {
    let df = prep::load_dataset(input)?;
    let cleaned = prep::rescale_feature(&df, &config.rescale_column)?;

    let mut file = std::fs::File::create(output)?;
    CsvWriter::new(&mut file).finish(&mut cleaned.clone())?;

    info!(path = %output.display(), rows = cleaned.height(), "wrote cleaned dataset");
    Ok(())
}

pub fn cmd_select(config: &PipelineConfig, data: &Path, output: &Path) -> anyhow::Result<()> {
    let df = prep::load_dataset(data)?;
    let parts = prep::split(
        &df,
        &config.feature_columns,
        &config.target_column,
        config.test_fraction,
        config.seed,
    )?;

    // selection only ever sees the training partition
    let table = select::select(
        &parts.x_train,
        &parts.y_train,
        &EstimatorFamily::all(),
        config,
    );
    table.to_csv(output)?;

    for row in &table.rows {
        println!("{:<8} r2={:.4}  rmse={:.4}", row.model, row.r2, row.rmse);
    }
    Ok(())
}

pub fn cmd_train(
    config: &PipelineConfig,
    data: &Path,
    family: &str,
    coefficients: &Path,
    metrics: Option<&Path>,
) -> anyhow::Result<()> {
    let family = parse_family(family)?;

    let df = prep::load_dataset(data)?;
    let parts = prep::split(
        &df,
        &config.feature_columns,
        &config.target_column,
        config.test_fraction,
        config.seed,
    )?;

    let model = train::train(family, &config.model, &parts.x_train, &parts.y_train)?;

    let (r2, rmse) = train::evaluate_held_out(&model, &parts.x_test, &parts.y_test)?;
    println!("held-out  r2={:.4}  rmse={:.4}", r2, rmse);
    if let Some(path) = metrics {
        train::write_held_out_metrics(r2, rmse, path)?;
    }

    let ranked = train::feature_importance(
        &parts.x_train,
        &parts.y_train,
        &config.feature_columns,
        &config.model,
    )?;
    for (name, importance) in &ranked {
        println!("{:<20} {:.4}", name, importance);
    }

    let table = train::export(&model, &config.feature_columns)?;
    table.to_csv(coefficients)?;
    Ok(())
}

fn parse_family(name: &str) -> anyhow::Result<EstimatorFamily> {
    EstimatorFamily::all()
        .into_iter()
        .find(|f| f.name() == name)
        .ok_or_else(|| anyhow::anyhow!("unknown family '{}' (expected linear, lasso or rf)", name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_family() {
        assert_eq!(parse_family("linear").unwrap(), EstimatorFamily::Linear);
        assert_eq!(parse_family("lasso").unwrap(), EstimatorFamily::Lasso);
        assert_eq!(parse_family("rf").unwrap(), EstimatorFamily::RandomForest);
        assert!(parse_family("svm").is_err());
    }

    #[test]
    fn test_load_config_default() {
        let config = load_config(None).unwrap();
        assert_eq!(config.feature_columns.len(), 7);
    }
}
