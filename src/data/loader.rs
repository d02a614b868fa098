//! CSV loading and feature/target extraction

use crate::error::{Result, SleepQualityError};
use super::schema::missing_columns;
use ndarray::{Array1, Array2};
use polars::prelude::*;
use std::path::Path;
use tracing::{debug, info};

/// Numeric training table: ordered feature matrix plus target vector
#[derive(Debug, Clone)]
pub struct Dataset {
    /// Row-major feature matrix (samples × features)
    pub features: Array2<f64>,
    /// Target values, one per row
    pub target: Array1<f64>,
    /// Feature column names, in matrix column order
    pub feature_names: Vec<String>,
    /// Target column name
    pub target_name: String,
}

impl Dataset {
    /// Extract the named feature columns and the target from a frame.
    ///
    /// Every required column is checked up front so the error names all of
    /// the missing ones, not just the first.
    pub fn from_frame(df: &DataFrame, feature_columns: &[String], target_column: &str) -> Result<Self> {
        let mut required = feature_columns.to_vec();
        required.push(target_column.to_string());
        let missing = missing_columns(df, &required);
        if !missing.is_empty() {
            return Err(SleepQualityError::MissingColumns(missing));
        }

        let features = extract_features(df, feature_columns)?;
        let target = Array1::from_vec(column_to_f64(df, target_column)?);

        debug!(
            rows = features.nrows(),
            features = features.ncols(),
            target = target_column,
            "extracted dataset"
        );

        Ok(Self {
            features,
            target,
            feature_names: feature_columns.to_vec(),
            target_name: target_column.to_string(),
        })
    }

    /// Number of samples
    pub fn n_samples(&self) -> usize {
        self.features.nrows()
    }

    /// Number of features
    pub fn n_features(&self) -> usize {
        self.features.ncols()
    }
}

/// Read a CSV file with a header row into a data frame
pub fn load_csv(path: &Path) -> Result<DataFrame> {
    if !path.is_file() {
        return Err(SleepQualityError::DataNotFound(path.display().to_string()));
    }

    let df = CsvReadOptions::default()
        .with_infer_schema_length(None)
        .with_has_header(true)
        .try_into_reader_with_file_path(Some(path.to_path_buf()))?
        .finish()?;

    info!(path = %path.display(), rows = df.height(), columns = df.width(), "loaded data");
    Ok(df)
}

/// Load a CSV file and extract the dataset in one step
pub fn load_dataset(path: &Path, feature_columns: &[String], target_column: &str) -> Result<Dataset> {
    let df = load_csv(path)?;
    Dataset::from_frame(&df, feature_columns, target_column)
}

/// Extract named columns into a row-major `Array2<f64>`
pub fn extract_features(df: &DataFrame, col_names: &[String]) -> Result<Array2<f64>> {
    let missing = missing_columns(df, col_names);
    if !missing.is_empty() {
        return Err(SleepQualityError::MissingColumns(missing));
    }

    let n_rows = df.height();
    let n_cols = col_names.len();

    let col_data: Vec<Vec<f64>> = col_names
        .iter()
        .map(|name| column_to_f64(df, name))
        .collect::<Result<Vec<Vec<f64>>>>()?;

    Ok(Array2::from_shape_fn((n_rows, n_cols), |(r, c)| col_data[c][r]))
}

/// Strictly cast one column to `f64`. Integer and boolean columns widen;
/// text that does not parse and null cells are errors.
fn column_to_f64(df: &DataFrame, name: &str) -> Result<Vec<f64>> {
    let series = df
        .column(name)
        .map_err(|_| SleepQualityError::MissingColumns(vec![name.to_string()]))?;

    let series_f64 = series
        .strict_cast(&DataType::Float64)
        .map_err(|e| SleepQualityError::InvalidValue {
            column: name.to_string(),
            reason: e.to_string(),
        })?;

    let values = series_f64.f64()?;
    values
        .into_iter()
        .enumerate()
        .map(|(row, v)| {
            v.ok_or_else(|| SleepQualityError::MissingValue {
                column: name.to_string(),
                row,
            })
        })
        .collect()
}
