//! Random Forest → Core ML tree ensemble conversion

use crate::error::{Result, SleepQualityError};
use crate::training::{RandomForest, TreeNode};
use super::coreml::{
    self, EvaluationInfo, FeatureDescription, Metadata, ModelDescription, TreeEnsembleParameters,
    TreeEnsemblePostEvaluationTransform, TreeEnsembleRegressor, TreeNodeBehavior,
    SPECIFICATION_VERSION,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

/// Descriptive fields stamped into the exported model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelInfo {
    pub short_description: String,
    pub author: String,
    pub version: String,
    pub license: String,
}

impl Default for ModelInfo {
    fn default() -> Self {
        Self {
            short_description: "Predicts the composite sleep quality score from sleep metrics".to_string(),
            author: String::new(),
            version: "1.0".to_string(),
            license: String::new(),
        }
    }
}

/// Converts fitted forests into Core ML `TreeEnsembleRegressor` models
#[derive(Debug, Clone, Default)]
pub struct CoreMlConverter {
    info: ModelInfo,
}

impl CoreMlConverter {
    /// Create new converter
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the descriptive metadata
    pub fn with_info(mut self, info: ModelInfo) -> Self {
        self.info = info;
        self
    }

    /// Convert a fitted forest.
    ///
    /// Core ML sums tree outputs, so each leaf value is divided by the tree
    /// count to reproduce the forest's average. Nodes are numbered in
    /// pre-order with the left (`<=`) child as the true branch.
    pub fn convert(
        &self,
        forest: &RandomForest,
        feature_names: &[String],
        target_names: &[String],
    ) -> Result<coreml::Model> {
        if !forest.is_fitted() {
            return Err(SleepQualityError::UnsupportedModel(
                "forest has not been fitted".to_string(),
            ));
        }
        if feature_names.len() != forest.n_features() {
            return Err(SleepQualityError::invalid_parameter(
                "feature_names",
                feature_names.len(),
                format!("model was fitted on {} features", forest.n_features()),
            ));
        }
        let [target_name] = target_names else {
            return Err(SleepQualityError::invalid_parameter(
                "target_names",
                target_names.len(),
                "a regressor has exactly one output",
            ));
        };

        let scale = 1.0 / forest.n_trees() as f64;
        let mut nodes = Vec::new();
        for (tree_id, tree) in forest.trees().iter().enumerate() {
            let root = tree.root().ok_or_else(|| {
                SleepQualityError::UnsupportedModel(format!("tree {} has no root", tree_id))
            })?;
            let mut next_id = 0;
            emit_node(root, tree_id as u64, &mut next_id, scale, &mut nodes)?;
        }

        debug!(trees = forest.n_trees(), nodes = nodes.len(), "converted forest");

        let ensemble = TreeEnsembleParameters {
            nodes,
            num_prediction_dimensions: 1,
            base_prediction_value: vec![0.0],
        };

        let description = ModelDescription {
            input: feature_names.iter().map(FeatureDescription::double).collect(),
            output: vec![FeatureDescription::double(target_name.as_str())],
            metadata: Some(self.metadata(forest)),
            ..Default::default()
        };

        Ok(coreml::Model {
            specification_version: SPECIFICATION_VERSION,
            description: Some(description),
            is_updatable: false,
            r#type: Some(coreml::model::Type::TreeEnsembleRegressor(TreeEnsembleRegressor {
                tree_ensemble: Some(ensemble),
                post_evaluation_transform: TreeEnsemblePostEvaluationTransform::NoTransform as i32,
            })),
        })
    }

    fn metadata(&self, forest: &RandomForest) -> Metadata {
        let mut user_defined = BTreeMap::new();
        user_defined.insert("producer".to_string(), env!("CARGO_PKG_NAME").to_string());
        user_defined.insert("producer_version".to_string(), env!("CARGO_PKG_VERSION").to_string());
        user_defined.insert("algorithm".to_string(), "random_forest_regressor".to_string());
        user_defined.insert("n_estimators".to_string(), forest.n_trees().to_string());
        if let Some(seed) = forest.random_state {
            user_defined.insert("random_state".to_string(), seed.to_string());
        }

        Metadata {
            short_description: self.info.short_description.clone(),
            version_string: self.info.version.clone(),
            author: self.info.author.clone(),
            license: self.info.license.clone(),
            user_defined,
        }
    }
}

/// Append `node` and its subtree in pre-order; returns the node's id.
fn emit_node(
    node: &TreeNode,
    tree_id: u64,
    next_id: &mut u64,
    scale: f64,
    out: &mut Vec<coreml::TreeNode>,
) -> Result<u64> {
    let node_id = *next_id;
    *next_id += 1;

    match node {
        TreeNode::Leaf { value, .. } => {
            if !value.is_finite() {
                return Err(SleepQualityError::UnsupportedModel(format!(
                    "tree {} node {} has a non-finite leaf value",
                    tree_id, node_id
                )));
            }
            out.push(coreml::TreeNode {
                tree_id,
                node_id,
                node_behavior: TreeNodeBehavior::LeafNode as i32,
                evaluation_info: vec![EvaluationInfo {
                    evaluation_index: 0,
                    evaluation_value: value * scale,
                }],
                ..Default::default()
            });
        }
        TreeNode::Split { feature_idx, threshold, left, right, .. } => {
            if !threshold.is_finite() {
                return Err(SleepQualityError::UnsupportedModel(format!(
                    "tree {} node {} has a non-finite threshold",
                    tree_id, node_id
                )));
            }
            // Reserve this node's slot; child ids are known after recursing.
            let slot = out.len();
            out.push(coreml::TreeNode::default());

            let true_child = emit_node(left, tree_id, next_id, scale, out)?;
            let false_child = emit_node(right, tree_id, next_id, scale, out)?;

            out[slot] = coreml::TreeNode {
                tree_id,
                node_id,
                node_behavior: TreeNodeBehavior::BranchOnValueLessThanEqual as i32,
                branch_feature_index: *feature_idx as u64,
                branch_feature_value: *threshold,
                true_child_node_id: true_child,
                false_child_node_id: false_child,
                missing_value_tracks_true_child: false,
                ..Default::default()
            };
        }
    }

    Ok(node_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{array, Array1, Array2};

    fn names(prefix: &str, n: usize) -> Vec<String> {
        (0..n).map(|i| format!("{}{}", prefix, i)).collect()
    }

    fn fitted_forest() -> (RandomForest, Array2<f64>) {
        let x = Array2::from_shape_fn((24, 3), |(r, c)| ((r * 7 + c * 3) % 11) as f64 + c as f64 * 0.25);
        let y = Array1::from_shape_fn(24, |r| (r % 5) as f64 * 10.0 + x[[r, 1]]);
        let mut rf = RandomForest::new(8).with_random_state(42);
        rf.fit(&x, &y).unwrap();
        (rf, x)
    }

    #[test]
    fn test_converted_model_matches_forest() {
        let (rf, x) = fitted_forest();
        let model = CoreMlConverter::new()
            .convert(&rf, &names("f", 3), &["score".to_string()])
            .unwrap();

        let expected = rf.predict(&x).unwrap();
        for (row, want) in x.rows().into_iter().zip(expected.iter()) {
            let got = model.predict_row(row.as_slice().unwrap()).unwrap();
            assert!((got - want).abs() < 1e-9, "{} vs {}", got, want);
        }
    }

    #[test]
    fn test_interface_and_node_layout() {
        let (rf, _) = fitted_forest();
        let model = CoreMlConverter::new()
            .convert(&rf, &names("f", 3), &["score".to_string()])
            .unwrap();

        assert_eq!(model.specification_version, 1);
        assert_eq!(model.input_names(), vec!["f0", "f1", "f2"]);
        assert_eq!(model.output_names(), vec!["score"]);

        let params = model.tree_ensemble_regressor().unwrap().tree_ensemble.as_ref().unwrap();
        assert_eq!(params.n_trees(), 8);
        let total_nodes: usize = rf.trees().iter().map(|t| t.get_n_nodes()).sum();
        assert_eq!(params.nodes.len(), total_nodes);

        // Pre-order: the first node of each tree is its root with id 0
        let first = &params.nodes[0];
        assert_eq!((first.tree_id, first.node_id), (0, 0));
        for node in &params.nodes {
            if node.node_behavior() != TreeNodeBehavior::LeafNode {
                assert!(node.true_child_node_id == node.node_id + 1);
                assert!(node.false_child_node_id > node.true_child_node_id);
            }
        }
    }

    #[test]
    fn test_metadata_is_deterministic() {
        let (rf, _) = fitted_forest();
        let converter = CoreMlConverter::new();
        let a = converter.convert(&rf, &names("f", 3), &["y".to_string()]).unwrap();
        let b = converter.convert(&rf, &names("f", 3), &["y".to_string()]).unwrap();
        assert_eq!(a, b);

        let meta = a.description.unwrap().metadata.unwrap();
        assert_eq!(meta.user_defined["n_estimators"], "8");
        assert_eq!(meta.user_defined["random_state"], "42");
    }

    #[test]
    fn test_unfitted_forest_is_rejected() {
        let err = CoreMlConverter::new()
            .convert(&RandomForest::default(), &names("f", 3), &["y".to_string()])
            .unwrap_err();
        assert!(matches!(err, SleepQualityError::UnsupportedModel(_)));
    }

    #[test]
    fn test_name_counts_are_checked() {
        let x = array![[1.0, 2.0], [2.0, 1.0], [3.0, 0.0]];
        let y = array![1.0, 2.0, 3.0];
        let mut rf = RandomForest::new(2);
        rf.fit(&x, &y).unwrap();

        let converter = CoreMlConverter::new();
        assert!(converter.convert(&rf, &names("f", 3), &["y".to_string()]).is_err());
        assert!(converter.convert(&rf, &names("f", 2), &[]).is_err());
        assert!(converter
            .convert(&rf, &names("f", 2), &["a".to_string(), "b".to_string()])
            .is_err());
    }
}
