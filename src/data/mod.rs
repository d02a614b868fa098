//! Data loading module
//!
//! Reads the sleep metrics table and turns it into numeric arrays:
//! - CSV reading into a polars `DataFrame`
//! - Required-column checks against the sleep quality schema
//! - Strict numeric extraction into `ndarray` feature/target arrays

mod loader;
pub mod schema;

pub use loader::{Dataset, load_csv, load_dataset, extract_features};
pub use schema::{
    FEATURE_COLUMNS, TARGET_COLUMN, DEFAULT_DATA_PATH, DEFAULT_MODEL_PATH,
    default_feature_columns, missing_columns,
};
