//! Pipeline configuration

use crate::data::{default_feature_columns, DEFAULT_DATA_PATH, DEFAULT_MODEL_PATH, TARGET_COLUMN};
use crate::error::{Result, SleepQualityError};
use crate::export::ModelInfo;
use crate::training::{DEFAULT_N_ESTIMATORS, DEFAULT_RANDOM_STATE, DEFAULT_TEST_SIZE};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Settings for one training run. Defaults reproduce the fixed
/// sleep-quality setup: 15 features, `totalScore`, 20% held out,
/// 100 trees, seed 42.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Input CSV
    pub data_path: PathBuf,
    /// Output `.mlmodel`
    pub output_path: PathBuf,
    /// Feature columns in model input order
    pub feature_columns: Vec<String>,
    /// Target column
    pub target_column: String,
    /// Fraction of rows held out
    pub test_size: f64,
    /// Seed for the split and the forest
    pub random_state: u64,
    /// Number of trees
    pub n_estimators: usize,
    /// Build trees on the rayon pool
    pub parallel: bool,
    /// Score the held-out rows after fitting
    pub evaluate: bool,
    /// Metadata written into the model
    pub model_info: ModelInfo,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            data_path: PathBuf::from(DEFAULT_DATA_PATH),
            output_path: PathBuf::from(DEFAULT_MODEL_PATH),
            feature_columns: default_feature_columns(),
            target_column: TARGET_COLUMN.to_string(),
            test_size: DEFAULT_TEST_SIZE,
            random_state: DEFAULT_RANDOM_STATE,
            n_estimators: DEFAULT_N_ESTIMATORS,
            parallel: false,
            evaluate: false,
            model_info: ModelInfo::default(),
        }
    }
}

impl PipelineConfig {
    /// Create a config with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a JSON config file; absent keys keep their defaults
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            SleepQualityError::ConfigError(format!("cannot read {}: {}", path.display(), e))
        })?;
        let config: Self = serde_json::from_str(&text)
            .map_err(|e| SleepQualityError::ConfigError(format!("{}: {}", path.display(), e)))?;
        Ok(config)
    }

    pub fn with_data_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.data_path = path.into();
        self
    }

    pub fn with_output_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_path = path.into();
        self
    }

    pub fn with_feature_columns(mut self, columns: Vec<String>) -> Self {
        self.feature_columns = columns;
        self
    }

    pub fn with_target_column(mut self, column: impl Into<String>) -> Self {
        self.target_column = column.into();
        self
    }

    pub fn with_test_size(mut self, test_size: f64) -> Self {
        self.test_size = test_size;
        self
    }

    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = seed;
        self
    }

    pub fn with_n_estimators(mut self, n: usize) -> Self {
        self.n_estimators = n;
        self
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn with_evaluate(mut self, evaluate: bool) -> Self {
        self.evaluate = evaluate;
        self
    }

    pub fn with_model_info(mut self, info: ModelInfo) -> Self {
        self.model_info = info;
        self
    }

    /// Check settings that would otherwise fail halfway through a run
    pub fn validate(&self) -> Result<()> {
        if self.feature_columns.is_empty() {
            return Err(SleepQualityError::ConfigError(
                "at least one feature column is required".to_string(),
            ));
        }
        let mut seen = std::collections::HashSet::new();
        for name in &self.feature_columns {
            if !seen.insert(name.as_str()) {
                return Err(SleepQualityError::ConfigError(format!(
                    "feature column '{}' is listed twice",
                    name
                )));
            }
        }
        if seen.contains(self.target_column.as_str()) {
            return Err(SleepQualityError::ConfigError(format!(
                "target column '{}' is also listed as a feature",
                self.target_column
            )));
        }
        if !(self.test_size > 0.0 && self.test_size < 1.0) {
            return Err(SleepQualityError::ConfigError(format!(
                "test_size must be strictly between 0 and 1, got {}",
                self.test_size
            )));
        }
        if self.n_estimators == 0 {
            return Err(SleepQualityError::ConfigError(
                "n_estimators must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = PipelineConfig::default();
        assert_eq!(config.data_path, PathBuf::from("sleep_quality_data.csv"));
        assert_eq!(config.output_path, PathBuf::from("SleepQualityPredictor.mlmodel"));
        assert_eq!(config.feature_columns.len(), 15);
        assert_eq!(config.target_column, "totalScore");
        assert_eq!(config.test_size, 0.2);
        assert_eq!(config.random_state, 42);
        assert_eq!(config.n_estimators, 100);
        assert!(!config.evaluate);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let mut tmp = tempfile::NamedTempFile::with_suffix(".json").unwrap();
        write!(tmp, r#"{{"n_estimators": 10, "output_path": "out.mlmodel"}}"#).unwrap();

        let config = PipelineConfig::from_json_file(tmp.path()).unwrap();
        assert_eq!(config.n_estimators, 10);
        assert_eq!(config.output_path, PathBuf::from("out.mlmodel"));
        assert_eq!(config.random_state, 42);
        assert_eq!(config.feature_columns.len(), 15);
    }

    #[test]
    fn test_bad_json_is_config_error() {
        let mut tmp = tempfile::NamedTempFile::with_suffix(".json").unwrap();
        write!(tmp, "{{ not json").unwrap();
        let err = PipelineConfig::from_json_file(tmp.path()).unwrap_err();
        assert!(matches!(err, SleepQualityError::ConfigError(_)));
    }

    #[test]
    fn test_validate_rejects_bad_settings() {
        assert!(PipelineConfig::new().with_test_size(1.5).validate().is_err());
        assert!(PipelineConfig::new().with_n_estimators(0).validate().is_err());
        assert!(PipelineConfig::new().with_feature_columns(vec![]).validate().is_err());
        assert!(PipelineConfig::new()
            .with_feature_columns(vec!["a".into(), "a".into()])
            .validate()
            .is_err());
        assert!(PipelineConfig::new()
            .with_feature_columns(vec!["totalScore".into()])
            .validate()
            .is_err());
    }
}
