//! Random Forest regressor (bootstrap-aggregated regression trees)

use crate::error::{Result, SleepQualityError};
use super::decision_tree::{check_feature_count, validate_training_data, DecisionTree};
use ndarray::{Array1, Array2, Axis};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Number of trees in the default forest
pub const DEFAULT_N_ESTIMATORS: usize = 100;

/// Random Forest model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RandomForest {
    /// Individual trees
    trees: Vec<DecisionTree>,
    /// Number of trees
    pub n_estimators: usize,
    /// Maximum depth per tree
    pub max_depth: Option<usize>,
    /// Minimum samples to split
    pub min_samples_split: usize,
    /// Minimum samples in leaf
    pub min_samples_leaf: usize,
    /// Features considered at each split
    pub max_features: MaxFeatures,
    /// Bootstrap sampling
    pub bootstrap: bool,
    /// Random state
    pub random_state: Option<u64>,
    /// Build trees on the rayon pool instead of sequentially
    pub parallel: bool,
    /// Feature importances
    feature_importances: Option<Array1<f64>>,
    /// Number of features
    n_features: usize,
}

/// Strategy for max features
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum MaxFeatures {
    /// Square root of n_features
    Sqrt,
    /// Log2 of n_features
    Log2,
    /// Fraction of n_features
    Fraction(f64),
    /// Fixed number
    Fixed(usize),
    /// All features
    All,
}

impl Default for RandomForest {
    fn default() -> Self {
        Self::new(DEFAULT_N_ESTIMATORS)
    }
}

impl RandomForest {
    /// Create a new regressor forest
    pub fn new(n_estimators: usize) -> Self {
        Self {
            trees: Vec::new(),
            n_estimators,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: MaxFeatures::All,
            bootstrap: true,
            random_state: None,
            parallel: false,
            feature_importances: None,
            n_features: 0,
        }
    }

    /// Set maximum depth
    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }

    /// Set minimum samples to split
    pub fn with_min_samples_split(mut self, min_samples: usize) -> Self {
        self.min_samples_split = min_samples;
        self
    }

    /// Set minimum samples in leaf
    pub fn with_min_samples_leaf(mut self, min_samples: usize) -> Self {
        self.min_samples_leaf = min_samples;
        self
    }

    /// Set max features strategy
    pub fn with_max_features(mut self, max_features: MaxFeatures) -> Self {
        self.max_features = max_features;
        self
    }

    /// Enable or disable bootstrap sampling
    pub fn with_bootstrap(mut self, bootstrap: bool) -> Self {
        self.bootstrap = bootstrap;
        self
    }

    /// Set random state
    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = Some(seed);
        self
    }

    /// Build trees in parallel
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    fn compute_max_features(&self, n_features: usize) -> usize {
        match self.max_features {
            MaxFeatures::Sqrt => (n_features as f64).sqrt().ceil() as usize,
            MaxFeatures::Log2 => (n_features as f64).log2().ceil() as usize,
            MaxFeatures::Fraction(f) => (n_features as f64 * f).ceil() as usize,
            MaxFeatures::Fixed(n) => n.min(n_features),
            MaxFeatures::All => n_features,
        }
        .clamp(1, n_features.max(1))
    }

    /// Fit the forest to training data
    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<&mut Self> {
        if self.n_estimators == 0 {
            return Err(SleepQualityError::invalid_parameter(
                "n_estimators",
                self.n_estimators,
                "must be at least 1",
            ));
        }
        if let MaxFeatures::Fraction(f) = self.max_features {
            if !(f > 0.0 && f <= 1.0) {
                return Err(SleepQualityError::invalid_parameter(
                    "max_features",
                    f,
                    "fraction must be in (0, 1]",
                ));
            }
        }
        validate_training_data(x, y)?;

        let n_features = x.ncols();
        let max_features = self.compute_max_features(n_features);
        let base_seed = self.random_state.unwrap_or(42);

        debug!(
            n_estimators = self.n_estimators,
            rows = x.nrows(),
            features = n_features,
            max_features,
            parallel = self.parallel,
            "fitting forest"
        );

        let build = |tree_idx: usize| self.build_tree(x, y, max_features, base_seed.wrapping_add(tree_idx as u64));

        // Per-tree seeds make the result independent of build order.
        let trees: Vec<DecisionTree> = if self.parallel {
            (0..self.n_estimators)
                .into_par_iter()
                .map(build)
                .collect::<Result<Vec<_>>>()?
        } else {
            (0..self.n_estimators).map(build).collect::<Result<Vec<_>>>()?
        };

        self.trees = trees;
        self.n_features = n_features;
        self.compute_feature_importances();

        Ok(self)
    }

    fn build_tree(
        &self,
        x: &Array2<f64>,
        y: &Array1<f64>,
        max_features: usize,
        seed: u64,
    ) -> Result<DecisionTree> {
        let n_samples = x.nrows();
        let mut rng = ChaCha8Rng::seed_from_u64(seed);

        let mut tree = DecisionTree::new()
            .with_min_samples_split(self.min_samples_split)
            .with_min_samples_leaf(self.min_samples_leaf)
            .with_max_features(max_features)
            .with_random_state(seed);

        if let Some(d) = self.max_depth {
            tree = tree.with_max_depth(d);
        }

        let fitted = if self.bootstrap {
            let sample_indices: Vec<usize> = (0..n_samples).map(|_| rng.gen_range(0..n_samples)).collect();
            let x_boot = x.select(Axis(0), &sample_indices);
            let y_boot = y.select(Axis(0), &sample_indices);
            tree.fit_with_rng(&x_boot, &y_boot, &mut rng).map(|_| ())
        } else {
            tree.fit_with_rng(x, y, &mut rng).map(|_| ())
        };
        fitted.map_err(|e| SleepQualityError::TrainingError(format!("tree with seed {}: {}", seed, e)))?;

        Ok(tree)
    }

    fn compute_feature_importances(&mut self) {
        if self.trees.is_empty() {
            return;
        }

        let mut total_importances = Array1::<f64>::zeros(self.n_features);
        for tree in &self.trees {
            if let Some(imp) = tree.feature_importances() {
                total_importances += imp;
            }
        }

        let total = total_importances.sum();
        if total > 0.0 {
            total_importances /= total;
        }

        self.feature_importances = Some(total_importances);
    }

    /// Make predictions: the mean of the per-tree predictions
    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        if self.trees.is_empty() {
            return Err(SleepQualityError::ModelNotFitted);
        }
        check_feature_count(self.n_features, x.ncols())?;

        let mut sum = Array1::<f64>::zeros(x.nrows());
        for tree in &self.trees {
            sum += &tree.predict(x)?;
        }

        Ok(sum / self.trees.len() as f64)
    }

    /// Fitted trees, in seed order
    pub fn trees(&self) -> &[DecisionTree] {
        &self.trees
    }

    /// Get feature importances
    pub fn feature_importances(&self) -> Option<&Array1<f64>> {
        self.feature_importances.as_ref()
    }

    /// Get number of trees
    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    /// Number of features seen during fit
    pub fn n_features(&self) -> usize {
        self.n_features
    }

    /// Whether `fit` has completed
    pub fn is_fitted(&self) -> bool {
        !self.trees.is_empty()
    }
}
