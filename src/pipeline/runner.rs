//! Load → split → fit → convert → write

use super::PipelineConfig;
use crate::data::load_dataset;
use crate::error::Result;
use crate::export::{save_model, ArtifactInfo, CoreMlConverter};
use crate::training::{train_test_split, RandomForest, RegressionMetrics, TrainTestSplit};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, info};

/// What a completed run produced
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineReport {
    /// Rows read from the input file
    pub n_rows: usize,
    pub n_train: usize,
    pub n_test: usize,
    pub n_trees: usize,
    /// Feature names with their importances, most important first
    pub feature_importances: Vec<(String, f64)>,
    /// Held-out scores; only present when evaluation is enabled
    pub test_metrics: Option<RegressionMetrics>,
    pub artifact: ArtifactInfo,
    pub elapsed_secs: f64,
}

/// Single-pass training pipeline
#[derive(Debug, Clone)]
pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    /// Create a pipeline for `config`
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run every stage once. Any failure aborts the run; nothing written
    /// before the failing stage is cleaned up.
    pub fn run(&self) -> Result<PipelineReport> {
        let start = Instant::now();
        let config = &self.config;
        config.validate()?;

        let dataset = load_dataset(&config.data_path, &config.feature_columns, &config.target_column)?;
        let n_rows = dataset.n_samples();

        let split = train_test_split(&dataset.features, &dataset.target, config.test_size, config.random_state)?;
        info!(train = split.n_train(), test = split.n_test(), seed = config.random_state, "split data");

        let forest = self.train(&split)?;

        let test_metrics = if config.evaluate {
            let metrics = evaluate(&forest, &split)?;
            info!(mse = metrics.mse, mae = metrics.mae, r2 = metrics.r2, "evaluated held-out rows");
            Some(metrics)
        } else {
            None
        };

        let model = CoreMlConverter::new()
            .with_info(config.model_info.clone())
            .convert(&forest, &dataset.feature_names, std::slice::from_ref(&dataset.target_name))?;

        let artifact = save_model(&model, &config.output_path)?;

        Ok(PipelineReport {
            n_rows,
            n_train: split.n_train(),
            n_test: split.n_test(),
            n_trees: forest.n_trees(),
            feature_importances: ranked_importances(&forest, &dataset.feature_names),
            test_metrics,
            artifact,
            elapsed_secs: start.elapsed().as_secs_f64(),
        })
    }

    /// Fit the forest on the training partition
    pub fn train(&self, split: &TrainTestSplit) -> Result<RandomForest> {
        let start = Instant::now();
        let mut forest = RandomForest::new(self.config.n_estimators)
            .with_random_state(self.config.random_state)
            .with_parallel(self.config.parallel);
        forest.fit(&split.x_train, &split.y_train)?;

        info!(
            trees = forest.n_trees(),
            rows = split.n_train(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "fitted forest"
        );
        Ok(forest)
    }
}

/// Score the forest on the held-out partition
pub fn evaluate(forest: &RandomForest, split: &TrainTestSplit) -> Result<RegressionMetrics> {
    let predictions = forest.predict(&split.x_test)?;
    RegressionMetrics::compute(&split.y_test, &predictions)
}

/// Run the pipeline described by `config`
pub fn run_pipeline(config: PipelineConfig) -> Result<PipelineReport> {
    Pipeline::new(config).run()
}

fn ranked_importances(forest: &RandomForest, names: &[String]) -> Vec<(String, f64)> {
    let Some(importances) = forest.feature_importances() else {
        return Vec::new();
    };

    let mut ranked: Vec<(String, f64)> = names.iter().cloned().zip(importances.iter().copied()).collect();
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
    debug!(top = ?ranked.first(), "feature importances");
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SleepQualityError;
    use std::io::Write;

    fn write_csv(dir: &std::path::Path, rows: usize) -> std::path::PathBuf {
        let path = dir.join("data.csv");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "a,b,score").unwrap();
        for i in 0..rows {
            writeln!(file, "{},{},{}", i, (i * 3) % 7, i as f64 * 1.5).unwrap();
        }
        path
    }

    fn config(dir: &std::path::Path, rows: usize) -> PipelineConfig {
        PipelineConfig::new()
            .with_data_path(write_csv(dir, rows))
            .with_output_path(dir.join("model.mlmodel"))
            .with_feature_columns(vec!["a".to_string(), "b".to_string()])
            .with_target_column("score")
            .with_n_estimators(5)
    }

    #[test]
    fn test_run_without_evaluation() {
        let dir = tempfile::tempdir().unwrap();
        let report = run_pipeline(config(dir.path(), 20)).unwrap();

        assert_eq!(report.n_rows, 20);
        assert_eq!(report.n_train, 16);
        assert_eq!(report.n_test, 4);
        assert_eq!(report.n_trees, 5);
        assert!(report.test_metrics.is_none());
        assert_eq!(report.feature_importances.len(), 2);
        assert!(report.artifact.size_bytes > 0);
    }

    #[test]
    fn test_run_with_evaluation() {
        let dir = tempfile::tempdir().unwrap();
        let report = run_pipeline(config(dir.path(), 30).with_evaluate(true)).unwrap();

        let metrics = report.test_metrics.unwrap();
        assert_eq!(metrics.n_samples, 6);
        assert!(metrics.mse.is_finite());
    }

    #[test]
    fn test_invalid_config_fails_before_loading() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = config(dir.path(), 10).with_test_size(0.0);
        let err = run_pipeline(cfg).unwrap_err();
        assert!(matches!(err, SleepQualityError::ConfigError(_)));
        assert!(!dir.path().join("model.mlmodel").exists());
    }
}
