//! Feature preparation: dataset loading, rescaling and the train/test split
//!
//! Every transformation returns a new value; the input dataset is never
//! mutated in place.

use crate::error::{AdmitError, Result};
use ndarray::{Array1, Array2, Axis};
use polars::prelude::*;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::path::Path;
use tracing::{debug, info};

/// Result of the deterministic train/test partition.
///
/// Train and test rows are disjoint; membership is fully determined by
/// (seed, test fraction, input row order).
#[derive(Debug, Clone)]
pub struct TrainTestSplit {
    pub x_train: Array2<f64>,
    pub x_test: Array2<f64>,
    pub y_train: Array1<f64>,
    pub y_test: Array1<f64>,
}

/// Load a tabular dataset from a CSV file.
pub fn load_dataset(path: &Path) -> Result<DataFrame> {
    let file = std::fs::File::open(path)
        .map_err(|e| AdmitError::DataLoad(format!("{}: {}", path.display(), e)))?;

    let df = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(100))
        .into_reader_with_file_handle(file)
        .finish()
        .map_err(|e| AdmitError::DataLoad(e.to_string()))?;

    info!(rows = df.height(), cols = df.width(), path = %path.display(), "loaded dataset");
    Ok(df)
}

/// Min-max rescale one column onto the [0, 4] range.
///
/// The target range is [0, 4] rather than [0, 1]: the column holds a grade on
/// a 0-10 scale and the serving schema expects a 0-4 grade-point value. A
/// constant column maps to all zeros instead of dividing by a zero range.
pub fn rescale_feature(df: &DataFrame, column: &str) -> Result<DataFrame> {
    let values = column_to_array1(df, column)?;

    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let range = max - min;

    let scaled: Vec<f64> = if values.is_empty() || range == 0.0 {
        vec![0.0; values.len()]
    } else {
        values.iter().map(|v| (v - min) / range * 4.0).collect()
    };

    let mut out = df.clone();
    out.with_column(Series::new(column.into(), scaled))
        .map_err(|e| AdmitError::InvalidTrainingData(e.to_string()))?;

    debug!(column, min, max, "rescaled feature onto [0, 4]");
    Ok(out)
}

/// Deterministic random train/test partition.
///
/// The test side takes `ceil(n * test_fraction)` rows of a seeded shuffle;
/// both sides must end up non-empty.
pub fn split(
    df: &DataFrame,
    feature_columns: &[String],
    target_column: &str,
    test_fraction: f64,
    seed: u64,
) -> Result<TrainTestSplit> {
    let n = df.height();
    if n < 2 {
        return Err(AdmitError::InsufficientData { needed: 2, got: n });
    }

    let test_size = (n as f64 * test_fraction).ceil() as usize;
    if test_size == 0 || test_size >= n {
        return Err(AdmitError::InsufficientData { needed: test_size + 1, got: n });
    }

    let mut indices: Vec<usize> = (0..n).collect();
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    indices.shuffle(&mut rng);
    let (test_idx, train_idx) = indices.split_at(test_size);

    let x = columns_to_array2(df, feature_columns)?;
    let y = column_to_array1(df, target_column)?;

    let take = |idx: &[usize]| -> (Array2<f64>, Array1<f64>) {
        let xs = x.select(Axis(0), idx);
        let ys = Array1::from_vec(idx.iter().map(|&i| y[i]).collect());
        (xs, ys)
    };
    let (x_train, y_train) = take(train_idx);
    let (x_test, y_test) = take(test_idx);

    info!(
        train_rows = train_idx.len(),
        test_rows = test_idx.len(),
        test_fraction,
        seed,
        "train/test split"
    );

    Ok(TrainTestSplit {
        x_train,
        x_test,
        y_train,
        y_test,
    })
}

/// Extract one named column as a contiguous f64 array.
pub fn column_to_array1(df: &DataFrame, name: &str) -> Result<Array1<f64>> {
    let column = df
        .column(name)
        .map_err(|_| AdmitError::FeatureNotFound(name.to_string()))?;

    let as_f64 = column
        .as_materialized_series()
        .cast(&DataType::Float64)
        .map_err(|e| AdmitError::InvalidTrainingData(format!("{}: {}", name, e)))?;

    // a non-strict cast turns unparsable values into nulls; surface those as
    // bad input rather than fabricating zeros
    if as_f64.null_count() > 0 {
        return Err(AdmitError::InvalidTrainingData(format!(
            "column '{}' has {} non-numeric or missing values",
            name,
            as_f64.null_count()
        )));
    }

    let values: Vec<f64> = as_f64
        .f64()
        .map_err(|e| AdmitError::InvalidTrainingData(e.to_string()))?
        .into_iter()
        .flatten()
        .collect();

    Ok(Array1::from_vec(values))
}

/// Extract named columns into a row-major feature matrix.
pub fn columns_to_array2(df: &DataFrame, names: &[String]) -> Result<Array2<f64>> {
    let n_rows = df.height();
    let n_cols = names.len();

    let col_data: Vec<Array1<f64>> = names
        .iter()
        .map(|name| column_to_array1(df, name))
        .collect::<Result<Vec<_>>>()?;

    Ok(Array2::from_shape_fn((n_rows, n_cols), |(r, c)| {
        col_data[c][r]
    }))
}
