//! Column layout of the sleep quality dataset

use polars::prelude::DataFrame;

/// Default location of the training table
pub const DEFAULT_DATA_PATH: &str = "sleep_quality_data.csv";

/// Default location of the exported Core ML model
pub const DEFAULT_MODEL_PATH: &str = "SleepQualityPredictor.mlmodel";

/// Column holding the composite sleep quality score
pub const TARGET_COLUMN: &str = "totalScore";

/// Feature columns, in the order the exported model declares its inputs.
///
/// Durations and variabilities are in seconds, efficiency is a 0..1 ratio,
/// the regularity index is 0..100, subjective scores are small integer
/// scales and `hasWearableData` is a boolean flag.
pub const FEATURE_COLUMNS: [&str; 15] = [
    "totalSleepTime",
    "idealSleepTime",
    "timeInBed",
    "sleepEfficiency",
    "sleepLatency",
    "waso",
    "sleepTimeVariability",
    "wakeTimeVariance",
    "sleepRegularityIndex",
    "subjectiveSleepQuality",
    "subjectiveSleepRegularity",
    "subjectiveSleepLatency",
    "subjectiveWaso",
    "subjectiveSleepiness",
    "hasWearableData",
];

/// Owned copy of [`FEATURE_COLUMNS`]
pub fn default_feature_columns() -> Vec<String> {
    FEATURE_COLUMNS.iter().map(|s| s.to_string()).collect()
}

/// Names from `required` that the frame does not contain, in input order
pub fn missing_columns(df: &DataFrame, required: &[String]) -> Vec<String> {
    required
        .iter()
        .filter(|name| df.get_column_index(name).is_none())
        .cloned()
        .collect()
}
