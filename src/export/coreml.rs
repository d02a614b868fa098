//! Core ML model messages
//!
//! Hand-declared subset of the Core ML protobuf schema (`Model.proto`,
//! `FeatureTypes.proto`, `TreeEnsemble.proto`) covering tree-ensemble
//! regressors with scalar inputs. Field tags match the published schema, so
//! files written here load on device and published models decode here (the
//! fields this module does not declare are skipped).

use crate::error::{Result, SleepQualityError};
use std::collections::{BTreeMap, HashMap};

/// Specification version written into exported models
pub const SPECIFICATION_VERSION: i32 = 1;

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Model {
    #[prost(int32, tag = "1")]
    pub specification_version: i32,
    #[prost(message, optional, tag = "2")]
    pub description: Option<ModelDescription>,
    #[prost(bool, tag = "10")]
    pub is_updatable: bool,
    #[prost(oneof = "model::Type", tags = "301")]
    pub r#type: Option<model::Type>,
}

pub mod model {
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum Type {
        #[prost(message, tag = "301")]
        TreeEnsembleRegressor(super::TreeEnsembleRegressor),
    }
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ModelDescription {
    #[prost(message, repeated, tag = "1")]
    pub input: Vec<FeatureDescription>,
    #[prost(message, repeated, tag = "10")]
    pub output: Vec<FeatureDescription>,
    #[prost(string, tag = "11")]
    pub predicted_feature_name: String,
    #[prost(string, tag = "12")]
    pub predicted_probabilities_name: String,
    #[prost(message, repeated, tag = "50")]
    pub training_input: Vec<FeatureDescription>,
    #[prost(message, optional, tag = "100")]
    pub metadata: Option<Metadata>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Metadata {
    #[prost(string, tag = "1")]
    pub short_description: String,
    #[prost(string, tag = "2")]
    pub version_string: String,
    #[prost(string, tag = "3")]
    pub author: String,
    #[prost(string, tag = "4")]
    pub license: String,
    /// Ordered map so encoding is byte-stable
    #[prost(btree_map = "string, string", tag = "100")]
    pub user_defined: BTreeMap<String, String>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct FeatureDescription {
    #[prost(string, tag = "1")]
    pub name: String,
    #[prost(string, tag = "2")]
    pub short_description: String,
    #[prost(message, optional, tag = "3")]
    pub r#type: Option<FeatureType>,
}

impl FeatureDescription {
    /// Non-optional scalar `double` feature
    pub fn double(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            short_description: String::new(),
            r#type: Some(FeatureType {
                r#type: Some(feature_type::Type::DoubleType(DoubleFeatureType {})),
                is_optional: false,
            }),
        }
    }

    /// Whether the feature is a scalar number
    pub fn is_numeric(&self) -> bool {
        matches!(
            self.r#type.as_ref().and_then(|t| t.r#type.as_ref()),
            Some(feature_type::Type::DoubleType(_)) | Some(feature_type::Type::Int64Type(_))
        )
    }
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct FeatureType {
    #[prost(oneof = "feature_type::Type", tags = "1, 2")]
    pub r#type: Option<feature_type::Type>,
    #[prost(bool, tag = "1000")]
    pub is_optional: bool,
}

pub mod feature_type {
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum Type {
        #[prost(message, tag = "1")]
        Int64Type(super::Int64FeatureType),
        #[prost(message, tag = "2")]
        DoubleType(super::DoubleFeatureType),
    }
}

#[derive(Clone, Copy, PartialEq, ::prost::Message)]
pub struct Int64FeatureType {}

#[derive(Clone, Copy, PartialEq, ::prost::Message)]
pub struct DoubleFeatureType {}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct TreeEnsembleRegressor {
    #[prost(message, optional, tag = "1")]
    pub tree_ensemble: Option<TreeEnsembleParameters>,
    #[prost(enumeration = "TreeEnsemblePostEvaluationTransform", tag = "2")]
    pub post_evaluation_transform: i32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum TreeEnsemblePostEvaluationTransform {
    NoTransform = 0,
    ClassificationSoftMax = 1,
    RegressionLogistic = 2,
    ClassificationSoftMaxWithZeroClassReference = 3,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct TreeEnsembleParameters {
    #[prost(message, repeated, tag = "1")]
    pub nodes: Vec<TreeNode>,
    #[prost(uint64, tag = "2")]
    pub num_prediction_dimensions: u64,
    #[prost(double, repeated, tag = "3")]
    pub base_prediction_value: Vec<f64>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct TreeNode {
    #[prost(uint64, tag = "1")]
    pub tree_id: u64,
    #[prost(uint64, tag = "2")]
    pub node_id: u64,
    #[prost(enumeration = "TreeNodeBehavior", tag = "3")]
    pub node_behavior: i32,
    #[prost(uint64, tag = "10")]
    pub branch_feature_index: u64,
    #[prost(double, tag = "11")]
    pub branch_feature_value: f64,
    #[prost(uint64, tag = "12")]
    pub true_child_node_id: u64,
    #[prost(uint64, tag = "13")]
    pub false_child_node_id: u64,
    #[prost(bool, tag = "14")]
    pub missing_value_tracks_true_child: bool,
    #[prost(message, repeated, tag = "20")]
    pub evaluation_info: Vec<EvaluationInfo>,
    #[prost(double, tag = "30")]
    pub relative_hit_rate: f64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum TreeNodeBehavior {
    BranchOnValueLessThanEqual = 0,
    BranchOnValueLessThan = 1,
    BranchOnValueGreaterThanEqual = 2,
    BranchOnValueGreaterThan = 3,
    BranchOnValueEqual = 4,
    BranchOnValueNotEqual = 5,
    LeafNode = 6,
}

#[derive(Clone, Copy, PartialEq, ::prost::Message)]
pub struct EvaluationInfo {
    #[prost(uint64, tag = "1")]
    pub evaluation_index: u64,
    #[prost(double, tag = "2")]
    pub evaluation_value: f64,
}

impl Model {
    /// Tree-ensemble regressor payload, if that is the model type
    pub fn tree_ensemble_regressor(&self) -> Option<&TreeEnsembleRegressor> {
        match &self.r#type {
            Some(model::Type::TreeEnsembleRegressor(reg)) => Some(reg),
            None => None,
        }
    }

    /// Declared input feature names, in order
    pub fn input_names(&self) -> Vec<&str> {
        self.description
            .as_ref()
            .map(|d| d.input.iter().map(|f| f.name.as_str()).collect())
            .unwrap_or_default()
    }

    /// Declared output feature names, in order
    pub fn output_names(&self) -> Vec<&str> {
        self.description
            .as_ref()
            .map(|d| d.output.iter().map(|f| f.name.as_str()).collect())
            .unwrap_or_default()
    }

    /// Evaluate the regressor on one row of inputs ordered like
    /// [`Model::input_names`]; returns the first prediction dimension.
    pub fn predict_row(&self, features: &[f64]) -> Result<f64> {
        let regressor = self.tree_ensemble_regressor().ok_or_else(|| {
            SleepQualityError::UnsupportedModel("model is not a tree ensemble regressor".to_string())
        })?;
        let params = regressor.tree_ensemble.as_ref().ok_or_else(|| {
            SleepQualityError::UnsupportedModel("tree ensemble has no parameters".to_string())
        })?;

        let mut outputs = params.evaluate(features)?;
        match regressor.post_evaluation_transform() {
            TreeEnsemblePostEvaluationTransform::NoTransform => {}
            TreeEnsemblePostEvaluationTransform::RegressionLogistic => {
                for v in &mut outputs {
                    *v = 1.0 / (1.0 + (-*v).exp());
                }
            }
            other => {
                return Err(SleepQualityError::UnsupportedModel(format!(
                    "post-evaluation transform {:?} is not a regression transform",
                    other
                )))
            }
        }

        outputs.first().copied().ok_or_else(|| {
            SleepQualityError::UnsupportedModel("tree ensemble has no prediction dimensions".to_string())
        })
    }
}

impl TreeEnsembleParameters {
    /// Sum the leaf contributions of every tree on top of the base values.
    pub fn evaluate(&self, features: &[f64]) -> Result<Vec<f64>> {
        let dims = self.num_prediction_dimensions as usize;
        let mut outputs = vec![0.0; dims];
        for (out, base) in outputs.iter_mut().zip(&self.base_prediction_value) {
            *out = *base;
        }

        let mut by_id: HashMap<(u64, u64), &TreeNode> = HashMap::with_capacity(self.nodes.len());
        let mut roots: Vec<u64> = Vec::new();
        for node in &self.nodes {
            if !roots.contains(&node.tree_id) {
                roots.push(node.tree_id);
            }
            by_id.insert((node.tree_id, node.node_id), node);
        }

        for tree_id in roots {
            let leaf = walk_tree(&by_id, tree_id, features)?;
            for info in &leaf.evaluation_info {
                let idx = info.evaluation_index as usize;
                let slot = outputs.get_mut(idx).ok_or_else(|| {
                    SleepQualityError::UnsupportedModel(format!(
                        "evaluation index {} exceeds {} prediction dimensions",
                        idx, dims
                    ))
                })?;
                *slot += info.evaluation_value;
            }
        }

        Ok(outputs)
    }

    /// Number of distinct trees
    pub fn n_trees(&self) -> usize {
        let mut ids: Vec<u64> = self.nodes.iter().map(|n| n.tree_id).collect();
        ids.sort_unstable();
        ids.dedup();
        ids.len()
    }
}

/// Follow one tree from node 0 to a leaf.
fn walk_tree<'a>(
    by_id: &HashMap<(u64, u64), &'a TreeNode>,
    tree_id: u64,
    features: &[f64],
) -> Result<&'a TreeNode> {
    let lookup = |node_id: u64| {
        by_id.get(&(tree_id, node_id)).copied().ok_or_else(|| {
            SleepQualityError::UnsupportedModel(format!("tree {} has no node {}", tree_id, node_id))
        })
    };

    let mut node = lookup(0)?;
    // A well-formed tree reaches a leaf in fewer steps than it has nodes.
    for _ in 0..=by_id.len() {
        let behavior = match node.node_behavior() {
            TreeNodeBehavior::LeafNode => return Ok(node),
            branch => branch,
        };

        let threshold = node.branch_feature_value;
        let value = *features.get(node.branch_feature_index as usize).ok_or_else(|| {
            SleepQualityError::ShapeError {
                expected: format!("more than {} features", node.branch_feature_index),
                actual: format!("{} features", features.len()),
            }
        })?;

        let take_true = match behavior {
            TreeNodeBehavior::BranchOnValueLessThanEqual => value <= threshold,
            TreeNodeBehavior::BranchOnValueLessThan => value < threshold,
            TreeNodeBehavior::BranchOnValueGreaterThanEqual => value >= threshold,
            TreeNodeBehavior::BranchOnValueGreaterThan => value > threshold,
            TreeNodeBehavior::BranchOnValueEqual => value == threshold,
            TreeNodeBehavior::BranchOnValueNotEqual => value != threshold,
            TreeNodeBehavior::LeafNode => return Ok(node),
        };

        node = lookup(if take_true { node.true_child_node_id } else { node.false_child_node_id })?;
    }

    Err(SleepQualityError::UnsupportedModel(format!("tree {} contains a cycle", tree_id)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use prost::Message;

    fn leaf(tree_id: u64, node_id: u64, value: f64) -> TreeNode {
        TreeNode {
            tree_id,
            node_id,
            node_behavior: TreeNodeBehavior::LeafNode as i32,
            evaluation_info: vec![EvaluationInfo { evaluation_index: 0, evaluation_value: value }],
            ..Default::default()
        }
    }

    fn branch(tree_id: u64, node_id: u64, feature: u64, threshold: f64, t: u64, f: u64) -> TreeNode {
        TreeNode {
            tree_id,
            node_id,
            node_behavior: TreeNodeBehavior::BranchOnValueLessThanEqual as i32,
            branch_feature_index: feature,
            branch_feature_value: threshold,
            true_child_node_id: t,
            false_child_node_id: f,
            ..Default::default()
        }
    }

    fn two_stump_model() -> Model {
        let params = TreeEnsembleParameters {
            nodes: vec![
                branch(0, 0, 0, 5.0, 1, 2),
                leaf(0, 1, 1.0),
                leaf(0, 2, 2.0),
                branch(1, 0, 1, 0.5, 1, 2),
                leaf(1, 1, 10.0),
                leaf(1, 2, 20.0),
            ],
            num_prediction_dimensions: 1,
            base_prediction_value: vec![0.5],
        };
        Model {
            specification_version: SPECIFICATION_VERSION,
            description: Some(ModelDescription {
                input: vec![FeatureDescription::double("a"), FeatureDescription::double("b")],
                output: vec![FeatureDescription::double("y")],
                ..Default::default()
            }),
            is_updatable: false,
            r#type: Some(model::Type::TreeEnsembleRegressor(TreeEnsembleRegressor {
                tree_ensemble: Some(params),
                post_evaluation_transform: TreeEnsemblePostEvaluationTransform::NoTransform as i32,
            })),
        }
    }

    #[test]
    fn test_evaluate_sums_trees_and_base() {
        let model = two_stump_model();
        assert_eq!(model.predict_row(&[5.0, 0.0]).unwrap(), 0.5 + 1.0 + 10.0);
        assert_eq!(model.predict_row(&[6.0, 1.0]).unwrap(), 0.5 + 2.0 + 20.0);
    }

    #[test]
    fn test_encode_decode_preserves_interface() {
        let model = two_stump_model();
        let bytes = model.encode_to_vec();
        let decoded = Model::decode(bytes.as_slice()).unwrap();

        assert_eq!(decoded, model);
        assert_eq!(decoded.input_names(), vec!["a", "b"]);
        assert_eq!(decoded.output_names(), vec!["y"]);
        assert!(decoded.description.unwrap().input.iter().all(FeatureDescription::is_numeric));
    }

    #[test]
    fn test_specification_version_is_field_one() {
        let model = Model { specification_version: 1, ..Default::default() };
        // Field 1, varint wire type, value 1
        assert_eq!(model.encode_to_vec(), vec![0x08, 0x01]);
    }

    #[test]
    fn test_missing_node_is_an_error() {
        let mut model = two_stump_model();
        if let Some(model::Type::TreeEnsembleRegressor(reg)) = &mut model.r#type {
            reg.tree_ensemble.as_mut().unwrap().nodes.retain(|n| !(n.tree_id == 1 && n.node_id == 2));
        }
        let err = model.predict_row(&[0.0, 1.0]).unwrap_err();
        assert!(matches!(err, SleepQualityError::UnsupportedModel(_)));
    }

    #[test]
    fn test_short_feature_row() {
        let err = two_stump_model().predict_row(&[1.0]).unwrap_err();
        assert!(matches!(err, SleepQualityError::ShapeError { .. }));
    }
}
