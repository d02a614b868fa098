//! Regression decision tree

use crate::error::{Result, SleepQualityError};
use ndarray::{Array1, Array2, ArrayView1};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

/// Smallest impurity decrease that still counts as a useful split
const MIN_GAIN: f64 = 1e-12;

/// Decision tree node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TreeNode {
    /// Leaf node holding the mean target of its samples
    Leaf {
        value: f64,
        n_samples: usize,
    },
    /// Internal node; samples with `x[feature_idx] <= threshold` go left
    Split {
        feature_idx: usize,
        threshold: f64,
        left: Box<TreeNode>,
        right: Box<TreeNode>,
        n_samples: usize,
        impurity: f64,
    },
}

impl TreeNode {
    /// Number of nodes in this subtree, including itself
    pub fn n_nodes(&self) -> usize {
        match self {
            TreeNode::Leaf { .. } => 1,
            TreeNode::Split { left, right, .. } => 1 + left.n_nodes() + right.n_nodes(),
        }
    }
}

/// Best split found for a node
#[derive(Debug, Clone, Copy)]
struct SplitCandidate {
    feature_idx: usize,
    threshold: f64,
    gain: f64,
}

/// Regression tree using the squared-error criterion
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionTree {
    /// Tree root
    root: Option<TreeNode>,
    /// Maximum depth
    pub max_depth: Option<usize>,
    /// Minimum samples to split
    pub min_samples_split: usize,
    /// Minimum samples in leaf
    pub min_samples_leaf: usize,
    /// Features drawn at each split (all when `None`)
    pub max_features: Option<usize>,
    /// Seed used by [`DecisionTree::fit`]
    pub random_state: Option<u64>,
    /// Number of features
    n_features: usize,
    /// Feature importances
    feature_importances: Option<Array1<f64>>,
}

impl Default for DecisionTree {
    fn default() -> Self {
        Self::new()
    }
}

impl DecisionTree {
    /// Create a new regression tree
    pub fn new() -> Self {
        Self {
            root: None,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: None,
            random_state: None,
            n_features: 0,
            feature_importances: None,
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

    /// Set the number of features considered at each split
    pub fn with_max_features(mut self, max_features: usize) -> Self {
        self.max_features = Some(max_features);
        self
    }

    /// Set random state
    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = Some(seed);
        self
    }

    /// Fit the tree to training data
    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<&mut Self> {
        validate_training_data(x, y)?;
        let mut rng = ChaCha8Rng::seed_from_u64(self.random_state.unwrap_or(0));
        self.fit_with_rng(x, y, &mut rng)
    }

    /// Fit using a caller-owned RNG for feature subsampling.
    /// Inputs must already have passed [`validate_training_data`].
    pub(crate) fn fit_with_rng(
        &mut self,
        x: &Array2<f64>,
        y: &Array1<f64>,
        rng: &mut ChaCha8Rng,
    ) -> Result<&mut Self> {
        if self.min_samples_split < 2 {
            return Err(SleepQualityError::invalid_parameter(
                "min_samples_split",
                self.min_samples_split,
                "must be at least 2",
            ));
        }
        if self.min_samples_leaf < 1 {
            return Err(SleepQualityError::invalid_parameter(
                "min_samples_leaf",
                self.min_samples_leaf,
                "must be at least 1",
            ));
        }

        let n_features = x.ncols();
        self.n_features = n_features;

        let mut importances = vec![0.0; n_features];
        let indices: Vec<usize> = (0..x.nrows()).collect();
        self.root = Some(self.build_tree(x, y, indices, 0, &mut importances, rng));

        let total: f64 = importances.iter().sum();
        if total > 0.0 {
            for imp in &mut importances {
                *imp /= total;
            }
        }
        self.feature_importances = Some(Array1::from_vec(importances));

        Ok(self)
    }

    fn build_tree(
        &self,
        x: &Array2<f64>,
        y: &Array1<f64>,
        indices: Vec<usize>,
        depth: usize,
        importances: &mut [f64],
        rng: &mut ChaCha8Rng,
    ) -> TreeNode {
        let n_samples = indices.len();
        let (sum, sq_sum) = indices.iter().fold((0.0, 0.0), |(s, sq), &i| (s + y[i], sq + y[i] * y[i]));
        let value = sum / n_samples as f64;
        let impurity = variance(n_samples, sum, sq_sum);

        let should_stop = n_samples < self.min_samples_split
            || n_samples < 2 * self.min_samples_leaf
            || self.max_depth.map_or(false, |d| depth >= d)
            || impurity <= MIN_GAIN;

        if should_stop {
            return TreeNode::Leaf { value, n_samples };
        }

        let Some(best) = self.find_best_split(x, y, &indices, impurity, rng) else {
            return TreeNode::Leaf { value, n_samples };
        };

        let (left_indices, right_indices): (Vec<usize>, Vec<usize>) = indices
            .into_iter()
            .partition(|&i| x[[i, best.feature_idx]] <= best.threshold);

        importances[best.feature_idx] += n_samples as f64 * best.gain;

        let left = Box::new(self.build_tree(x, y, left_indices, depth + 1, importances, rng));
        let right = Box::new(self.build_tree(x, y, right_indices, depth + 1, importances, rng));

        TreeNode::Split {
            feature_idx: best.feature_idx,
            threshold: best.threshold,
            left,
            right,
            n_samples,
            impurity,
        }
    }

    /// Sort-and-sweep search over the candidate features.
    fn find_best_split(
        &self,
        x: &Array2<f64>,
        y: &Array1<f64>,
        indices: &[usize],
        parent_impurity: f64,
        rng: &mut ChaCha8Rng,
    ) -> Option<SplitCandidate> {
        let n_features = x.ncols();
        let k = self.max_features.unwrap_or(n_features).clamp(1, n_features);
        let candidates: Vec<usize> = if k >= n_features {
            (0..n_features).collect()
        } else {
            rand::seq::index::sample(rng, n_features, k).into_vec()
        };

        let n = indices.len();
        let mut best: Option<SplitCandidate> = None;
        let mut pairs: Vec<(f64, f64)> = Vec::with_capacity(n);

        for feature_idx in candidates {
            pairs.clear();
            pairs.extend(indices.iter().map(|&i| (x[[i, feature_idx]], y[i])));
            pairs.sort_by(|a, b| a.0.total_cmp(&b.0));

            let total_sum: f64 = pairs.iter().map(|p| p.1).sum();
            let total_sq: f64 = pairs.iter().map(|p| p.1 * p.1).sum();

            let mut left_sum = 0.0;
            let mut left_sq = 0.0;

            for i in 0..n - 1 {
                left_sum += pairs[i].1;
                left_sq += pairs[i].1 * pairs[i].1;

                let (lo, hi) = (pairs[i].0, pairs[i + 1].0);
                if lo == hi {
                    continue;
                }

                let left_count = i + 1;
                let right_count = n - left_count;
                if left_count < self.min_samples_leaf || right_count < self.min_samples_leaf {
                    continue;
                }

                let left_impurity = variance(left_count, left_sum, left_sq);
                let right_impurity = variance(right_count, total_sum - left_sum, total_sq - left_sq);
                let weighted =
                    (left_count as f64 * left_impurity + right_count as f64 * right_impurity) / n as f64;
                let gain = parent_impurity - weighted;

                if gain > MIN_GAIN && best.map_or(true, |b| gain > b.gain) {
                    let mut threshold = lo + (hi - lo) / 2.0;
                    // Rounding can push the midpoint onto the upper value.
                    if threshold >= hi {
                        threshold = lo;
                    }
                    best = Some(SplitCandidate { feature_idx, threshold, gain });
                }
            }
        }

        best
    }

    /// Make predictions
    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let root = self.root.as_ref().ok_or(SleepQualityError::ModelNotFitted)?;
        check_feature_count(self.n_features, x.ncols())?;

        Ok(x.rows().into_iter().map(|row| predict_sample(root, row)).collect())
    }

    /// Fitted root node
    pub fn root(&self) -> Option<&TreeNode> {
        self.root.as_ref()
    }

    /// Number of features seen during fit
    pub fn n_features(&self) -> usize {
        self.n_features
    }

    /// Get feature importances
    pub fn feature_importances(&self) -> Option<&Array1<f64>> {
        self.feature_importances.as_ref()
    }

    /// Get tree depth
    pub fn get_depth(&self) -> usize {
        self.root.as_ref().map_or(0, node_depth)
    }

    /// Get number of leaves
    pub fn get_n_leaves(&self) -> usize {
        self.root.as_ref().map_or(0, count_leaves)
    }

    /// Get number of nodes
    pub fn get_n_nodes(&self) -> usize {
        self.root.as_ref().map_or(0, TreeNode::n_nodes)
    }
}

/// Reject empty, mismatched, or non-finite training data.
pub(crate) fn validate_training_data(x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
    if x.nrows() != y.len() {
        return Err(SleepQualityError::ShapeError {
            expected: format!("y length = {}", x.nrows()),
            actual: format!("y length = {}", y.len()),
        });
    }
    if x.nrows() == 0 {
        return Err(SleepQualityError::EmptyDataset(
            "cannot fit on zero training rows".to_string(),
        ));
    }
    if x.ncols() == 0 {
        return Err(SleepQualityError::EmptyDataset(
            "cannot fit without feature columns".to_string(),
        ));
    }
    if x.iter().chain(y.iter()).any(|v| !v.is_finite()) {
        return Err(SleepQualityError::ValidationError(
            "training data contains NaN or infinite values".to_string(),
        ));
    }
    Ok(())
}

pub(crate) fn check_feature_count(expected: usize, actual: usize) -> Result<()> {
    if expected != actual {
        return Err(SleepQualityError::ShapeError {
            expected: format!("{} features", expected),
            actual: format!("{} features", actual),
        });
    }
    Ok(())
}

/// Population variance from running sums
fn variance(count: usize, sum: f64, sq_sum: f64) -> f64 {
    if count == 0 {
        return 0.0;
    }
    let n = count as f64;
    (sq_sum / n - (sum / n).powi(2)).max(0.0)
}

fn predict_sample(node: &TreeNode, sample: ArrayView1<f64>) -> f64 {
    match node {
        TreeNode::Leaf { value, .. } => *value,
        TreeNode::Split { feature_idx, threshold, left, right, .. } => {
            if sample[*feature_idx] <= *threshold {
                predict_sample(left, sample)
            } else {
                predict_sample(right, sample)
            }
        }
    }
}

fn node_depth(node: &TreeNode) -> usize {
    match node {
        TreeNode::Leaf { .. } => 1,
        TreeNode::Split { left, right, .. } => 1 + node_depth(left).max(node_depth(right)),
    }
}

fn count_leaves(node: &TreeNode) -> usize {
    match node {
        TreeNode::Leaf { .. } => 1,
        TreeNode::Split { left, right, .. } => count_leaves(left) + count_leaves(right),
    }
}
