//! Integration test: CSV → split → forest → .mlmodel

use sleep_quality_trainer::data::{FEATURE_COLUMNS, TARGET_COLUMN};
use sleep_quality_trainer::export::load_model;
use sleep_quality_trainer::pipeline::{run_pipeline, PipelineConfig};
use sleep_quality_trainer::SleepQualityError;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

/// One synthetic night: every feature gets a distinct value per row.
fn sleep_row(i: usize) -> Vec<String> {
    let f = i as f64;
    vec![
        format!("{}", 25_200.0 + f * 600.0),      // totalSleepTime
        format!("{}", 28_800.0),                  // idealSleepTime
        format!("{}", 27_000.0 + f * 700.0),      // timeInBed
        format!("{:.4}", 0.80 + f * 0.01),        // sleepEfficiency
        format!("{}", 900.0 - f * 30.0),          // sleepLatency
        format!("{}", 1_800.0 - f * 60.0),        // waso
        format!("{}", 1_200.0 + f * 45.0),        // sleepTimeVariability
        format!("{}", 900.0 + f * 40.0),         // wakeTimeVariance
        format!("{}", 60.0 + f * 2.5),            // sleepRegularityIndex
        format!("{}", 1 + i % 5),                 // subjectiveSleepQuality
        format!("{}", 1 + (i + 1) % 5),           // subjectiveSleepRegularity
        format!("{}", 1 + (i + 2) % 5),           // subjectiveSleepLatency
        format!("{}", 1 + (i + 3) % 5),           // subjectiveWaso
        format!("{}", 1 + i % 10),                // subjectiveSleepiness
        format!("{}", i % 2 == 0),                // hasWearableData
    ]
}

fn sleep_score(i: usize) -> f64 {
    55.0 + (i as f64) * 3.5 - ((i % 3) as f64)
}

fn write_sleep_csv(path: &Path, rows: usize, columns: &[&str]) {
    let mut text = String::new();
    let mut header: Vec<&str> = columns.to_vec();
    header.push(TARGET_COLUMN);
    writeln!(text, "{}", header.join(",")).unwrap();

    for i in 0..rows {
        let full = sleep_row(i);
        let mut cells: Vec<String> = FEATURE_COLUMNS
            .iter()
            .zip(full)
            .filter(|(name, _)| columns.contains(name))
            .map(|(_, v)| v)
            .collect();
        cells.push(format!("{}", sleep_score(i)));
        writeln!(text, "{}", cells.join(",")).unwrap();
    }

    std::fs::write(path, text).unwrap();
}

fn config_for(dir: &Path, rows: usize) -> (PipelineConfig, PathBuf) {
    let data = dir.join("sleep_quality_data.csv");
    let output = dir.join("SleepQualityPredictor.mlmodel");
    write_sleep_csv(&data, rows, &FEATURE_COLUMNS);
    let config = PipelineConfig::new()
        .with_data_path(&data)
        .with_output_path(&output);
    (config, output)
}

#[test]
fn test_ten_row_dataset_produces_model() {
    let dir = tempfile::tempdir().unwrap();
    let (config, output) = config_for(dir.path(), 10);

    let report = run_pipeline(config).unwrap();

    assert_eq!(report.n_rows, 10);
    assert_eq!(report.n_train, 8);
    assert_eq!(report.n_test, 2);
    assert_eq!(report.n_trees, 100);
    assert!(report.test_metrics.is_none(), "held-out rows are not scored by default");

    let size = std::fs::metadata(&output).unwrap().len();
    assert!(size > 0);
    assert_eq!(size as usize, report.artifact.size_bytes);
}

#[test]
fn test_model_declares_features_in_order() {
    let dir = tempfile::tempdir().unwrap();
    let (config, output) = config_for(dir.path(), 12);
    run_pipeline(config).unwrap();

    let model = load_model(&output).unwrap();
    assert_eq!(model.input_names(), FEATURE_COLUMNS.to_vec());
    assert_eq!(model.output_names(), vec![TARGET_COLUMN]);
    assert_eq!(model.specification_version, 1);
}

#[test]
fn test_rerun_is_byte_identical() {
    let dir = tempfile::tempdir().unwrap();
    let (config, output) = config_for(dir.path(), 25);

    let first = run_pipeline(config.clone()).unwrap();
    let first_bytes = std::fs::read(&output).unwrap();
    let second = run_pipeline(config).unwrap();
    let second_bytes = std::fs::read(&output).unwrap();

    assert_eq!(first.artifact.sha256, second.artifact.sha256);
    assert_eq!(first_bytes, second_bytes);
}

#[test]
fn test_parallel_build_matches_sequential() {
    let dir = tempfile::tempdir().unwrap();
    let (config, _) = config_for(dir.path(), 25);

    let sequential = run_pipeline(config.clone()).unwrap();
    let parallel = run_pipeline(config.with_parallel(true)).unwrap();
    assert_eq!(sequential.artifact.sha256, parallel.artifact.sha256);
}

#[test]
fn test_different_seed_changes_model() {
    let dir = tempfile::tempdir().unwrap();
    let (config, _) = config_for(dir.path(), 25);

    let a = run_pipeline(config.clone()).unwrap();
    let b = run_pipeline(config.with_random_state(7)).unwrap();
    assert_ne!(a.artifact.sha256, b.artifact.sha256);
}

#[test]
fn test_split_sizes_follow_ceiling_rule() {
    for rows in [6, 11, 23] {
        let dir = tempfile::tempdir().unwrap();
        let (config, _) = config_for(dir.path(), rows);
        let report = run_pipeline(config.with_n_estimators(3)).unwrap();

        let expected_test = (rows as f64 * 0.2).ceil() as usize;
        assert_eq!(report.n_test, expected_test);
        assert_eq!(report.n_train + report.n_test, rows);
    }
}

#[test]
fn test_missing_feature_column_fails_before_training() {
    let dir = tempfile::tempdir().unwrap();
    let data = dir.path().join("sleep_quality_data.csv");
    let output = dir.path().join("SleepQualityPredictor.mlmodel");

    let without_waso: Vec<&str> = FEATURE_COLUMNS.iter().copied().filter(|c| *c != "waso").collect();
    write_sleep_csv(&data, 10, &without_waso);

    let err = run_pipeline(PipelineConfig::new().with_data_path(&data).with_output_path(&output)).unwrap_err();
    match err {
        SleepQualityError::MissingColumns(missing) => assert_eq!(missing, vec!["waso".to_string()]),
        other => panic!("unexpected error: {other}"),
    }
    assert!(!output.exists());
}

#[test]
fn test_zero_rows_fails_instead_of_exporting() {
    let dir = tempfile::tempdir().unwrap();
    let (config, output) = config_for(dir.path(), 0);

    let err = run_pipeline(config).unwrap_err();
    assert!(matches!(err, SleepQualityError::EmptyDataset(_)), "got {err}");
    assert!(!output.exists());
}

#[test]
fn test_missing_input_file() {
    let dir = tempfile::tempdir().unwrap();
    let config = PipelineConfig::new()
        .with_data_path(dir.path().join("nope.csv"))
        .with_output_path(dir.path().join("out.mlmodel"));

    let err = run_pipeline(config).unwrap_err();
    assert!(matches!(err, SleepQualityError::DataNotFound(_)));
}

#[test]
fn test_unwritable_output_fails() {
    let dir = tempfile::tempdir().unwrap();
    let (config, _) = config_for(dir.path(), 10);
    let config = config
        .with_n_estimators(2)
        .with_output_path(dir.path().join("no_such_dir").join("model.mlmodel"));

    let err = run_pipeline(config).unwrap_err();
    assert!(matches!(err, SleepQualityError::IoError(_)));
}

#[test]
fn test_evaluation_is_opt_in() {
    let dir = tempfile::tempdir().unwrap();
    let (config, output) = config_for(dir.path(), 40);

    let plain = run_pipeline(config.clone()).unwrap();
    let plain_bytes = std::fs::read(&output).unwrap();
    let scored = run_pipeline(config.with_evaluate(true)).unwrap();

    let metrics = scored.test_metrics.expect("metrics when evaluation is enabled");
    assert_eq!(metrics.n_samples, 8);
    assert!(metrics.rmse >= 0.0);
    // Scoring never changes what gets exported
    assert_eq!(plain.artifact.sha256, scored.artifact.sha256);
    assert_eq!(plain_bytes, std::fs::read(&output).unwrap());
}
