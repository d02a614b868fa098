//! Error types for the sleep quality trainer

use thiserror::Error;

/// Result type alias for trainer operations
pub type Result<T> = std::result::Result<T, SleepQualityError>;

/// Main error type for the crate
#[derive(Error, Debug)]
pub enum SleepQualityError {
    #[error("Data file not found: {0}")]
    DataNotFound(String),

    #[error("Data error: {0}")]
    DataError(String),

    #[error("Missing required columns: {}", .0.join(", "))]
    MissingColumns(Vec<String>),

    #[error("Column '{column}' is not numeric: {reason}")]
    InvalidValue { column: String, reason: String },

    #[error("Column '{column}' has a missing value at row {row}")]
    MissingValue { column: String, row: usize },

    #[error("Dataset is empty: {0}")]
    EmptyDataset(String),

    #[error("Invalid shape: expected {expected}, got {actual}")]
    ShapeError { expected: String, actual: String },

    #[error("Invalid parameter: {name} = {value}, {reason}")]
    InvalidParameter {
        name: String,
        value: String,
        reason: String,
    },

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Training error: {0}")]
    TrainingError(String),

    #[error("Model not fitted")]
    ModelNotFitted,

    #[error("Unsupported model structure: {0}")]
    UnsupportedModel(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl SleepQualityError {
    pub(crate) fn invalid_parameter(
        name: &str,
        value: impl ToString,
        reason: impl Into<String>,
    ) -> Self {
        SleepQualityError::InvalidParameter {
            name: name.to_string(),
            value: value.to_string(),
            reason: reason.into(),
        }
    }
}

impl From<polars::error::PolarsError> for SleepQualityError {
    fn from(err: polars::error::PolarsError) -> Self {
        SleepQualityError::DataError(err.to_string())
    }
}

impl From<serde_json::Error> for SleepQualityError {
    fn from(err: serde_json::Error) -> Self {
        SleepQualityError::SerializationError(err.to_string())
    }
}

impl From<ndarray::ShapeError> for SleepQualityError {
    fn from(err: ndarray::ShapeError) -> Self {
        SleepQualityError::ShapeError {
            expected: "valid shape".to_string(),
            actual: err.to_string(),
        }
    }
}

impl From<prost::DecodeError> for SleepQualityError {
    fn from(err: prost::DecodeError) -> Self {
        SleepQualityError::SerializationError(format!("malformed model file: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = SleepQualityError::DataError("test error".to_string());
        assert_eq!(err.to_string(), "Data error: test error");
    }

    #[test]
    fn test_missing_columns_lists_every_name() {
        let err = SleepQualityError::MissingColumns(vec!["waso".to_string(), "totalScore".to_string()]);
        assert_eq!(err.to_string(), "Missing required columns: waso, totalScore");
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: SleepQualityError = io_err.into();
        assert!(matches!(err, SleepQualityError::IoError(_)));
    }
}
