//! Model training module
//!
//! Provides the training side of the pipeline:
//! - Seeded train/test splitting
//! - Regression decision trees
//! - Random Forest (bagged regression trees)
//! - Regression metrics for optional held-out evaluation

pub mod split;
pub mod decision_tree;
pub mod random_forest;
pub mod metrics;

pub use split::{
    train_test_split, split_indices, test_count, SplitIndices, TrainTestSplit,
    DEFAULT_RANDOM_STATE, DEFAULT_TEST_SIZE,
};
pub use decision_tree::{DecisionTree, TreeNode};
pub use random_forest::{RandomForest, MaxFeatures, DEFAULT_N_ESTIMATORS};
pub use metrics::RegressionMetrics;
