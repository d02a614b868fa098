//! Regression metrics for the held-out partition

use crate::error::{Result, SleepQualityError};
use ndarray::Array1;
use serde::{Deserialize, Serialize};

/// Metrics for regression evaluation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionMetrics {
    /// Mean Squared Error
    pub mse: f64,
    /// Root Mean Squared Error
    pub rmse: f64,
    /// Mean Absolute Error
    pub mae: f64,
    /// R-squared; 0 when the targets are constant
    pub r2: f64,
    /// Number of evaluated samples
    pub n_samples: usize,
}

impl RegressionMetrics {
    /// Compute regression metrics
    pub fn compute(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> Result<Self> {
        if y_true.len() != y_pred.len() {
            return Err(SleepQualityError::ShapeError {
                expected: format!("{} predictions", y_true.len()),
                actual: format!("{} predictions", y_pred.len()),
            });
        }
        if y_true.is_empty() {
            return Err(SleepQualityError::EmptyDataset(
                "no samples to evaluate".to_string(),
            ));
        }

        let n = y_true.len() as f64;
        let errors = y_true - y_pred;

        let ss_res: f64 = errors.iter().map(|e| e * e).sum();
        let mse = ss_res / n;
        let mae = errors.iter().map(|e| e.abs()).sum::<f64>() / n;

        let y_mean = y_true.sum() / n;
        let ss_tot: f64 = y_true.iter().map(|y| (y - y_mean).powi(2)).sum();
        let r2 = if ss_tot > 0.0 { 1.0 - ss_res / ss_tot } else { 0.0 };

        Ok(Self {
            mse,
            rmse: mse.sqrt(),
            mae,
            r2,
            n_samples: y_true.len(),
        })
    }
}
