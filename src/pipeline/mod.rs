//! Training pipeline
//!
//! Runs the five stages once, top to bottom: load the sleep table, split
//! it, fit the forest, convert it to Core ML and write the model file.

mod config;
mod runner;

pub use config::PipelineConfig;
pub use runner::{Pipeline, PipelineReport, evaluate, run_pipeline};
