//! Sleep quality trainer CLI module
//!
//! Command-line interface for training, inspecting and running models.

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use colored::*;
use polars::prelude::*;
use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::data::{extract_features, load_csv, missing_columns, default_feature_columns, TARGET_COLUMN};
use crate::export::{coreml, load_model};
use crate::pipeline::{Pipeline, PipelineConfig, PipelineReport};

// ─── Styling helpers ───────────────────────────────────────────────────────────

fn dim(s: &str) -> ColoredString   { s.truecolor(100, 100, 100) }
fn accent(s: &str) -> ColoredString { s.truecolor(120, 170, 255) }
fn muted(s: &str) -> ColoredString  { s.truecolor(140, 140, 140) }
fn ok(s: &str) -> ColoredString     { s.truecolor(100, 210, 120) }

fn kv(key: &str, val: &str) {
    println!("  {:<22} {}", muted(key), val.white());
}

fn step_run(msg: &str) {
    print!("  {} {}... ", accent("›"), msg);
}

fn step_done(detail: &str) {
    println!("{} {}", ok("done"), dim(detail));
}

fn section(title: &str) {
    println!();
    println!("  {}", title.white().bold());
    println!("  {}", dim(&"─".repeat(56)));
}

// ─── CLI definition ────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "sleep-quality-trainer")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Train a sleep quality forest and export it as a Core ML model")]
#[command(long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Train a model and write the .mlmodel file
    Train(TrainArgs),

    /// Print the interface of a .mlmodel file
    Inspect {
        /// Model file
        #[arg(short, long)]
        model: PathBuf,
    },

    /// Run a .mlmodel file over a CSV
    Predict {
        /// Model file
        #[arg(short, long)]
        model: PathBuf,

        /// Input data file
        #[arg(short, long)]
        data: PathBuf,

        /// Output predictions file (CSV); printed when omitted
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show data information
    Info {
        /// Input data file
        #[arg(short, long)]
        data: PathBuf,
    },
}

/// Overrides for a training run; unset flags keep the config value
#[derive(Args, Debug, Clone, Default)]
pub struct TrainArgs {
    /// JSON config file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Input data file (CSV)
    #[arg(short, long)]
    pub data: Option<PathBuf>,

    /// Output model file
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Seed for the split and the forest
    #[arg(long)]
    pub seed: Option<u64>,

    /// Number of trees
    #[arg(long)]
    pub n_estimators: Option<usize>,

    /// Fraction of rows held out
    #[arg(long)]
    pub test_size: Option<f64>,

    /// Build trees in parallel
    #[arg(long)]
    pub parallel: bool,

    /// Score the held-out rows after fitting
    #[arg(long)]
    pub evaluate: bool,

    /// Write the run report as JSON
    #[arg(long)]
    pub report: Option<PathBuf>,
}

impl TrainArgs {
    /// Resolve the effective pipeline config
    pub fn into_config(self) -> anyhow::Result<PipelineConfig> {
        let mut config = match &self.config {
            Some(path) => PipelineConfig::from_json_file(path)?,
            None => PipelineConfig::default(),
        };

        if let Some(data) = self.data {
            config.data_path = data;
        }
        if let Some(output) = self.output {
            config.output_path = output;
        }
        if let Some(seed) = self.seed {
            config.random_state = seed;
        }
        if let Some(n) = self.n_estimators {
            config.n_estimators = n;
        }
        if let Some(test_size) = self.test_size {
            config.test_size = test_size;
        }
        config.parallel |= self.parallel;
        config.evaluate |= self.evaluate;

        Ok(config)
    }
}

// ─── Commands ──────────────────────────────────────────────────────────────────

pub fn cmd_train(args: TrainArgs) -> anyhow::Result<PipelineReport> {
    let report_path = args.report.clone();
    let config = args.into_config()?;
    section("Train");

    step_run(&format!("Training on {}", config.data_path.display()));
    let start = Instant::now();
    let report = Pipeline::new(config).run()?;
    step_done(&format!("{:?}", start.elapsed()));

    println!();
    kv("Rows", &format!("{} ({} train / {} test)", report.n_rows, report.n_train, report.n_test));
    kv("Trees", &report.n_trees.to_string());
    if let Some((name, importance)) = report.feature_importances.first() {
        kv("Top feature", &format!("{} ({:.3})", name, importance));
    }
    if let Some(metrics) = &report.test_metrics {
        kv("Test R²", &format!("{:.4}", metrics.r2));
        kv("Test RMSE", &format!("{:.4}", metrics.rmse));
        kv("Test MAE", &format!("{:.4}", metrics.mae));
    }
    kv("SHA-256", &report.artifact.sha256);
    if let Some(path) = &report_path {
        let json = serde_json::to_string_pretty(&report)?;
        std::fs::write(path, json).with_context(|| format!("writing {}", path.display()))?;
        kv("Report", &path.display().to_string());
    }
    println!();
    println!("Saved {}", report.artifact.path.display());

    Ok(report)
}

pub fn cmd_inspect(model_path: &Path) -> anyhow::Result<()> {
    section("Inspect");

    let model = load_model(model_path)
        .with_context(|| format!("reading {}", model_path.display()))?;

    kv("Specification version", &model.specification_version.to_string());
    kv("Inputs", &model.input_names().join(", "));
    kv("Outputs", &model.output_names().join(", "));

    match model.tree_ensemble_regressor().and_then(|r| r.tree_ensemble.as_ref()) {
        Some(params) => {
            kv("Model type", "tree ensemble regressor");
            kv("Trees", &params.n_trees().to_string());
            kv("Nodes", &params.nodes.len().to_string());
        }
        None => kv("Model type", &"unsupported".yellow().to_string()),
    }

    if let Some(meta) = model.description.as_ref().and_then(|d| d.metadata.as_ref()) {
        if !meta.short_description.is_empty() {
            kv("Description", &meta.short_description);
        }
        for (key, value) in &meta.user_defined {
            kv(key, value);
        }
    }

    println!();
    Ok(())
}

pub fn cmd_predict(model_path: &Path, data_path: &Path, output: Option<&Path>) -> anyhow::Result<()> {
    section("Predict");

    step_run("Loading model");
    let model = load_model(model_path)
        .with_context(|| format!("reading {}", model_path.display()))?;
    let inputs: Vec<String> = model.input_names().iter().map(|s| s.to_string()).collect();
    let output_name = model.output_names().first().map(|s| s.to_string()).unwrap_or_else(|| "prediction".to_string());
    step_done(&format!("{} inputs", inputs.len()));

    step_run("Loading data");
    let df = load_csv(data_path)?;
    let x = extract_features(&df, &inputs)?;
    step_done(&format!("{} rows", x.nrows()));

    let predictions = predict_rows(&model, &x)?;

    match output {
        Some(path) => {
            let mut out = DataFrame::new(vec![Series::new(output_name.as_str().into(), predictions)])?;
            let mut file = std::fs::File::create(path)?;
            CsvWriter::new(&mut file).finish(&mut out)?;
            println!("  {} {}", ok("✓"), format!("wrote {}", path.display()));
        }
        None => {
            println!();
            println!("  {}", muted(&output_name));
            for p in &predictions {
                println!("  {:.4}", p);
            }
        }
    }

    println!();
    Ok(())
}

pub fn cmd_info(data_path: &Path) -> anyhow::Result<()> {
    section("Info");

    let df = load_csv(data_path)?;
    kv("Rows", &df.height().to_string());
    kv("Columns", &df.width().to_string());

    let features = default_feature_columns();
    let missing = missing_columns(&df, &features);
    kv("Feature columns", &format!("{}/{} present", features.len() - missing.len(), features.len()));
    for name in &missing {
        println!("  {} {}", "missing".red(), name);
    }

    let target = if df.get_column_index(TARGET_COLUMN).is_some() { ok("present") } else { "missing".red() };
    println!("  {:<22} {}", muted("Target totalScore"), target);

    println!();
    Ok(())
}

fn predict_rows(model: &coreml::Model, x: &ndarray::Array2<f64>) -> anyhow::Result<Vec<f64>> {
    x.rows()
        .into_iter()
        .map(|row| {
            let values: Vec<f64> = row.iter().copied().collect();
            Ok(model.predict_row(&values)?)
        })
        .collect()
}
