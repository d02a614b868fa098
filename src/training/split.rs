//! Seeded train/test splitting

use crate::error::{Result, SleepQualityError};
use ndarray::{Array1, Array2, Axis};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

/// Fraction of rows held out for evaluation
pub const DEFAULT_TEST_SIZE: f64 = 0.2;

/// Seed shared by the split and the forest
pub const DEFAULT_RANDOM_STATE: u64 = 42;

/// Row indices of a single train/test partition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitIndices {
    pub train_indices: Vec<usize>,
    pub test_indices: Vec<usize>,
}

/// The four partitions produced by [`train_test_split`]
#[derive(Debug, Clone)]
pub struct TrainTestSplit {
    pub x_train: Array2<f64>,
    pub x_test: Array2<f64>,
    pub y_train: Array1<f64>,
    pub y_test: Array1<f64>,
}

impl TrainTestSplit {
    pub fn n_train(&self) -> usize {
        self.x_train.nrows()
    }

    pub fn n_test(&self) -> usize {
        self.x_test.nrows()
    }
}

/// Number of test rows for `n_samples`: the held-out fraction rounded up.
pub fn test_count(n_samples: usize, test_size: f64) -> usize {
    (test_size * n_samples as f64).ceil() as usize
}

/// Shuffle `0..n_samples` with a seeded RNG and cut off the test rows.
pub fn split_indices(n_samples: usize, test_size: f64, seed: u64) -> Result<SplitIndices> {
    if n_samples == 0 {
        return Err(SleepQualityError::EmptyDataset(
            "cannot split a dataset with zero rows".to_string(),
        ));
    }

    if !(test_size > 0.0 && test_size < 1.0) {
        return Err(SleepQualityError::invalid_parameter(
            "test_size",
            test_size,
            "must be strictly between 0 and 1",
        ));
    }

    let n_test = test_count(n_samples, test_size);
    if n_test >= n_samples {
        return Err(SleepQualityError::ValidationError(format!(
            "with {} rows and test_size = {}, the training set would be empty",
            n_samples, test_size
        )));
    }

    let mut indices: Vec<usize> = (0..n_samples).collect();
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    indices.shuffle(&mut rng);

    let train_indices = indices.split_off(n_test);
    Ok(SplitIndices {
        train_indices,
        test_indices: indices,
    })
}

/// Partition features and targets into train and test subsets.
pub fn train_test_split(
    x: &Array2<f64>,
    y: &Array1<f64>,
    test_size: f64,
    seed: u64,
) -> Result<TrainTestSplit> {
    if x.nrows() != y.len() {
        return Err(SleepQualityError::ShapeError {
            expected: format!("y length = {}", x.nrows()),
            actual: format!("y length = {}", y.len()),
        });
    }

    let split = split_indices(x.nrows(), test_size, seed)?;

    Ok(TrainTestSplit {
        x_train: x.select(Axis(0), &split.train_indices),
        x_test: x.select(Axis(0), &split.test_indices),
        y_train: y.select(Axis(0), &split.train_indices),
        y_test: y.select(Axis(0), &split.test_indices),
    })
}
