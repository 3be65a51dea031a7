//! Integration test: offline pipeline end-to-end

use admitml::config::PipelineConfig;
use admitml::error::AdmitError;
use admitml::model::EstimatorFamily;
use admitml::train::CoefficientTable;
use admitml::{prep, select, train};
use polars::prelude::*;

/// Synthetic admission-shaped dataset with a known linear relationship.
fn admission_df() -> DataFrame {
    let n = 24usize;
    let gre: Vec<f64> = (0..n).map(|i| 300.0 + (i * i % 13) as f64 * 2.5).collect();
    let toefl: Vec<f64> = (0..n).map(|i| 100.0 + (i * 7 % 11) as f64).collect();
    let rating: Vec<f64> = (0..n).map(|i| 1.0 + (i * 3 % 5) as f64).collect();
    let sop: Vec<f64> = (0..n).map(|i| 2.0 + (i % 3) as f64 * 0.5).collect();
    let lor: Vec<f64> = (0..n).map(|i| 2.5 + (i * 5 % 9) as f64 * 0.25).collect();
    let cgpa: Vec<f64> = (0..n).map(|i| 6.0 + (i * i % 17) as f64 * 0.2).collect();
    let research: Vec<f64> = (0..n).map(|i| (i % 2) as f64).collect();
    let chance: Vec<f64> = (0..n)
        .map(|i| 0.002 * gre[i] + 0.02 * cgpa[i] + 0.05 * research[i])
        .collect();

    df!(
        "GRE Score" => gre,
        "TOEFL Score" => toefl,
        "University Rating" => rating,
        "SOP" => sop,
        "LOR" => lor,
        "CGPA" => cgpa,
        "Research" => research,
        "Chance of Admit" => chance,
    )
    .unwrap()
}

fn small_config() -> PipelineConfig {
    let mut config = PipelineConfig::default();
    config.model.forest_trees = 10;
    config
}

#[test]
fn test_four_row_synthetic_split() {
    let df = df!(
        "a" => &[1.0, 2.0, 3.0, 4.0],
        "b" => &[2.0, 2.0, 2.0, 2.0],
        "c" => &[3.0, 3.0, 3.0, 3.0],
        "d" => &[4.0, 4.0, 4.0, 4.0]
    )
    .unwrap();
    let cols: Vec<String> = ["a", "b", "c"].iter().map(|s| s.to_string()).collect();

    let parts = prep::split(&df, &cols, "d", 0.25, 1995).unwrap();
    assert_eq!(parts.y_test.to_vec(), vec![4.0]);
}

#[test]
fn test_clean_select_train_export() {
    let config = small_config();
    let df = admission_df();

    // clean: rescale CGPA onto [0, 4]
    let cleaned = prep::rescale_feature(&df, &config.rescale_column).unwrap();
    let cgpa = prep::column_to_array1(&cleaned, "CGPA").unwrap();
    assert!(cgpa.iter().all(|v| (0.0..=4.0).contains(v)));

    // split once, reuse for selection and training
    let parts = prep::split(
        &cleaned,
        &config.feature_columns,
        &config.target_column,
        config.test_fraction,
        config.seed,
    )
    .unwrap();

    // selection sees only the training partition
    let table = select::select(
        &parts.x_train,
        &parts.y_train,
        &EstimatorFamily::all(),
        &config,
    );
    assert_eq!(table.rows.len(), 3);
    let linear_row = table.row("linear").unwrap();
    assert!(
        linear_row.r2 > 0.9,
        "linear family should fit a linear target: r2 = {}",
        linear_row.r2
    );

    // train the linear family and check held-out fit
    let model = train::train(
        EstimatorFamily::Linear,
        &config.model,
        &parts.x_train,
        &parts.y_train,
    )
    .unwrap();
    let (r2, rmse) = train::evaluate_held_out(&model, &parts.x_test, &parts.y_test).unwrap();
    assert!(r2 > 0.99, "held-out r2 = {}", r2);
    assert!(rmse < 0.01, "held-out rmse = {}", rmse);

    // export, persist and reload the coefficient table
    let coefs = train::export(&model, &config.feature_columns).unwrap();
    assert_eq!(coefs.entries.len(), 8);
    assert_eq!(coefs.entries[0].0, "intercept");
    assert_eq!(coefs.entries[1].0, "GRE Score");

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("final_model.csv");
    coefs.to_csv(&path).unwrap();
    let loaded = CoefficientTable::from_csv(&path).unwrap();

    // the reloaded artifact predicts within tolerance of the fitted model
    let row: Vec<f64> = parts.x_test.row(0).to_vec();
    let served = loaded.predict(&row).unwrap();
    let direct = model.predict(&parts.x_test).unwrap()[0].clamp(0.0, 1.0);
    assert!(
        (served - direct).abs() < 1e-6,
        "served {} vs direct {}",
        served,
        direct
    );
}

#[test]
fn test_pipeline_idempotent() {
    let config = small_config();
    let df = admission_df();

    let run = || {
        let cleaned = prep::rescale_feature(&df, &config.rescale_column).unwrap();
        let parts = prep::split(
            &cleaned,
            &config.feature_columns,
            &config.target_column,
            config.test_fraction,
            config.seed,
        )
        .unwrap();
        let model = train::train(
            EstimatorFamily::Linear,
            &config.model,
            &parts.x_train,
            &parts.y_train,
        )
        .unwrap();
        train::export(&model, &config.feature_columns).unwrap()
    };

    let first = run();
    let second = run();
    for ((n1, v1), (n2, v2)) in first.entries.iter().zip(second.entries.iter()) {
        assert_eq!(n1, n2);
        assert!((v1 - v2).abs() < 1e-6);
    }
}

#[test]
fn test_feature_importance_is_diagnostic_only() {
    let config = small_config();
    let df = admission_df();
    let parts = prep::split(
        &df,
        &config.feature_columns,
        &config.target_column,
        config.test_fraction,
        config.seed,
    )
    .unwrap();

    let ranked = train::feature_importance(
        &parts.x_train,
        &parts.y_train,
        &config.feature_columns,
        &config.model,
    )
    .unwrap();
    assert_eq!(ranked.len(), 7);
    for pair in ranked.windows(2) {
        assert!(pair[0].1 <= pair[1].1, "importances not ascending");
    }

    // the exported table is unaffected by the forest diagnostic
    let model = train::train(
        EstimatorFamily::Linear,
        &config.model,
        &parts.x_train,
        &parts.y_train,
    )
    .unwrap();
    let table = train::export(&model, &config.feature_columns).unwrap();
    assert_eq!(table.entries.len(), 8);
}

#[test]
fn test_selector_survives_degenerate_family_input() {
    // an empty training partition fails every family inside the evaluator;
    // selection must come back with missing rows rather than an error
    let x = ndarray::Array2::<f64>::zeros((0, 7));
    let y = ndarray::Array1::<f64>::zeros(0);
    let table = select::select(&x, &y, &EstimatorFamily::all(), &small_config());
    assert!(table.rows.is_empty());
}

#[test]
fn test_export_unsupported_for_forest_end_to_end() {
    let config = small_config();
    let df = admission_df();
    let parts = prep::split(
        &df,
        &config.feature_columns,
        &config.target_column,
        config.test_fraction,
        config.seed,
    )
    .unwrap();

    let model = train::train(
        EstimatorFamily::RandomForest,
        &config.model,
        &parts.x_train,
        &parts.y_train,
    )
    .unwrap();
    assert!(matches!(
        train::export(&model, &config.feature_columns).unwrap_err(),
        AdmitError::UnsupportedExport(_)
    ));
}
