//! Sleep quality trainer
//!
//! Trains a bagged regression forest that predicts the composite sleep
//! quality score (`totalScore`) from 15 sleep metrics, and exports it as a
//! Core ML `.mlmodel` for on-device inference.
//!
//! # Modules
//!
//! - [`data`] - CSV loading and feature/target extraction
//! - [`training`] - Train/test split, regression trees, Random Forest, metrics
//! - [`export`] - Core ML conversion and model file I/O
//! - [`pipeline`] - Configuration and the load → split → fit → convert → write run
//! - [`cli`] - Command-line interface

// Core error handling
pub mod error;

// Pipeline stages
pub mod data;
pub mod training;
pub mod export;
pub mod pipeline;

// Services
pub mod cli;

pub use error::{SleepQualityError, Result};

/// Re-export commonly used types
pub mod prelude {
    // Error handling
    pub use crate::error::{SleepQualityError, Result};

    // Data
    pub use crate::data::{Dataset, load_csv, load_dataset, FEATURE_COLUMNS, TARGET_COLUMN};

    // Training
    pub use crate::training::{train_test_split, RandomForest, DecisionTree, RegressionMetrics, TrainTestSplit};

    // Export
    pub use crate::export::{CoreMlConverter, ModelInfo, save_model, load_model};

    // Pipeline
    pub use crate::pipeline::{Pipeline, PipelineConfig, PipelineReport, run_pipeline};
}
