//! Tree Ensemble - native predictor for random forests and boosted trees
//!
//! Trees are stored struct-of-arrays, one entry per node:
//!
//! - `split_indices[i]` / `thresholds[i]`: split of internal node `i`
//! - `children_left[i]` / `children_right[i]`: child node ids, `-1` marks a leaf
//! - `values[i]`: leaf output (one value for regression, one per class otherwise)
//!
//! `mean` aggregation averages trees (random forest), `sum` adds them on top of
//! `base_score` (gradient boosting). Classification returns the argmax class index.

use ndarray::{ArrayView1, ArrayView2};
use serde::{Deserialize, Serialize};

use super::inference::{check_shape, Predictor, TaskKind};
use crate::error::{ArtifactError, InferenceError};

/// Leaf sentinel in child arrays
pub const LEAF: i64 = -1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Aggregation {
    /// Average of tree outputs
    #[default]
    Mean,
    /// Sum of tree outputs plus base score
    Sum,
}

/// Comparison used at internal nodes; `true` goes left
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SplitRule {
    /// `x <= threshold` (scikit-learn)
    #[default]
    LessOrEqual,
    /// `x < threshold` (XGBoost / LightGBM)
    Less,
}

/// One tree, SoA layout
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TreeSchema {
    pub split_indices: Vec<i64>,
    pub thresholds: Vec<f64>,
    pub children_left: Vec<i64>,
    pub children_right: Vec<i64>,
    pub values: Vec<Vec<f64>>,
}

impl TreeSchema {
    pub fn n_nodes(&self) -> usize {
        self.children_left.len()
    }

    fn is_leaf(&self, node: usize) -> bool {
        self.children_left[node] == LEAF
    }

    /// Leaf reached by `row`. Comparisons with NaN are false, so NaN goes right.
    fn leaf(&self, row: &ArrayView1<'_, f64>, rule: SplitRule) -> usize {
        let mut node = 0usize;
        while !self.is_leaf(node) {
            let x = row[self.split_indices[node] as usize];
            let threshold = self.thresholds[node];
            let go_left = match rule {
                SplitRule::LessOrEqual => x <= threshold,
                SplitRule::Less => x < threshold,
            };
            node = if go_left { self.children_left[node] } else { self.children_right[node] } as usize;
        }
        node
    }

    fn validate(&self, tree: usize, n_features: usize, leaf_width: usize) -> Result<(), ArtifactError> {
        let n = self.n_nodes();
        let invalid = |msg: String| ArtifactError::InvalidModel(format!("tree {}: {}", tree, msg));

        if n == 0 {
            return Err(invalid("no nodes".to_string()));
        }
        if self.children_right.len() != n
            || self.split_indices.len() != n
            || self.thresholds.len() != n
            || self.values.len() != n
        {
            return Err(invalid(format!("node arrays differ in length (expected {})", n)));
        }

        for node in 0..n {
            let (left, right) = (self.children_left[node], self.children_right[node]);

            if left == LEAF || right == LEAF {
                if left != right {
                    return Err(invalid(format!("node {} has exactly one child", node)));
                }
                let width = self.values[node].len();
                if width != leaf_width {
                    return Err(invalid(format!("leaf {} has {} values, expected {}", node, width, leaf_width)));
                }
                if self.values[node].iter().any(|v| !v.is_finite()) {
                    return Err(invalid(format!("leaf {} has a non-finite value", node)));
                }
                continue;
            }

            let feature = self.split_indices[node];
            if feature < 0 || feature as usize >= n_features {
                return Err(invalid(format!(
                    "node {} splits on feature {} (model has {})",
                    node, feature, n_features
                )));
            }
            if !self.thresholds[node].is_finite() {
                return Err(invalid(format!("node {} has a non-finite threshold", node)));
            }
            for child in [left, right] {
                // children strictly after the parent guarantees termination
                if child <= node as i64 || child as usize >= n {
                    return Err(invalid(format!("node {} has invalid child {}", node, child)));
                }
            }
        }

        Ok(())
    }
}

/// Ensemble as persisted by training
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TreeEnsemble {
    pub task: TaskKind,
    pub n_features: usize,
    /// Required for classification
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub n_classes: Option<usize>,
    #[serde(default)]
    pub aggregation: Aggregation,
    #[serde(default)]
    pub base_score: f64,
    #[serde(default)]
    pub split_rule: SplitRule,
    pub trees: Vec<TreeSchema>,
}

impl TreeEnsemble {
    /// Parse and validate
    pub fn from_json(name: &str, bytes: &[u8]) -> Result<Self, ArtifactError> {
        let ensemble: TreeEnsemble = serde_json::from_slice(bytes).map_err(|source| ArtifactError::Parse {
            name: name.to_string(),
            source,
        })?;
        ensemble.validate()?;
        Ok(ensemble)
    }

    fn leaf_width(&self) -> Result<usize, ArtifactError> {
        match (self.task, self.n_classes) {
            (TaskKind::Regression, _) => Ok(1),
            (TaskKind::Classification, Some(k)) if k >= 2 => Ok(k),
            (TaskKind::Classification, other) => Err(ArtifactError::InvalidModel(format!(
                "classification model needs n_classes >= 2, got {:?}",
                other
            ))),
        }
    }

    /// Structural checks; a valid ensemble never panics during traversal
    pub fn validate(&self) -> Result<(), ArtifactError> {
        if self.n_features == 0 {
            return Err(ArtifactError::InvalidModel("model has no features".to_string()));
        }
        if self.trees.is_empty() {
            return Err(ArtifactError::InvalidModel("ensemble has no trees".to_string()));
        }
        if !self.base_score.is_finite() {
            return Err(ArtifactError::InvalidModel("non-finite base score".to_string()));
        }

        let leaf_width = self.leaf_width()?;
        for (i, tree) in self.trees.iter().enumerate() {
            tree.validate(i, self.n_features, leaf_width)?;
        }
        Ok(())
    }

    /// Aggregated raw output for one row (per class, or a single value)
    pub fn raw_row(&self, row: &ArrayView1<'_, f64>) -> Vec<f64> {
        let width = match self.task {
            TaskKind::Regression => 1,
            TaskKind::Classification => self.n_classes.unwrap_or(1),
        };
        let mut acc = vec![0.0; width];

        for tree in &self.trees {
            let leaf = &tree.values[tree.leaf(row, self.split_rule)];

            // forest leaves may hold class counts; normalize to fractions
            let total: f64 = leaf.iter().sum();
            let normalize = self.task == TaskKind::Classification && self.aggregation == Aggregation::Mean && total > 0.0;

            for (a, v) in acc.iter_mut().zip(leaf) {
                *a += if normalize { v / total } else { *v };
            }
        }

        if self.aggregation == Aggregation::Mean {
            let n = self.trees.len() as f64;
            acc.iter_mut().for_each(|a| *a /= n);
        }
        acc.iter_mut().for_each(|a| *a += self.base_score);
        acc
    }

    pub fn predict_row(&self, row: &ArrayView1<'_, f64>) -> f64 {
        let raw = self.raw_row(row);
        match self.task {
            TaskKind::Regression => raw[0],
            TaskKind::Classification => argmax(&raw) as f64,
        }
    }
}

/// Index of the largest value; first one wins on ties
fn argmax(values: &[f64]) -> usize {
    values
        .iter()
        .enumerate()
        .fold((0, f64::NEG_INFINITY), |(bi, bv), (i, &v)| if v > bv { (i, v) } else { (bi, bv) })
        .0
}

impl Predictor for TreeEnsemble {
    fn n_features(&self) -> usize {
        self.n_features
    }

    fn task(&self) -> TaskKind {
        self.task
    }

    fn n_classes(&self) -> Option<usize> {
        self.n_classes
    }

    fn method(&self) -> &'static str {
        match self.aggregation {
            Aggregation::Mean => "random_forest",
            Aggregation::Sum => "gradient_boosting",
        }
    }

    fn predict(&self, features: ArrayView2<'_, f64>) -> Result<Vec<f64>, InferenceError> {
        check_shape(self.n_features, features.ncols())?;
        Ok(features.rows().into_iter().map(|row| self.predict_row(&row)).collect())
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    /// Stump on `feature`: left leaf / right leaf
    fn stump(feature: i64, threshold: f64, left: Vec<f64>, right: Vec<f64>) -> TreeSchema {
        TreeSchema {
            split_indices: vec![feature, -2, -2],
            thresholds: vec![threshold, -2.0, -2.0],
            children_left: vec![1, LEAF, LEAF],
            children_right: vec![2, LEAF, LEAF],
            values: vec![vec![0.0; left.len()], left, right],
        }
    }

    fn forest() -> TreeEnsemble {
        TreeEnsemble {
            task: TaskKind::Classification,
            n_features: 2,
            n_classes: Some(3),
            aggregation: Aggregation::Mean,
            base_score: 0.0,
            split_rule: SplitRule::LessOrEqual,
            trees: vec![
                stump(0, 0.5, vec![6.0, 1.0, 3.0], vec![0.0, 9.0, 1.0]),
                stump(1, 0.0, vec![2.0, 0.0, 8.0], vec![1.0, 8.0, 1.0]),
            ],
        }
    }

    fn booster() -> TreeEnsemble {
        TreeEnsemble {
            task: TaskKind::Regression,
            n_features: 1,
            n_classes: None,
            aggregation: Aggregation::Sum,
            base_score: 10.0,
            split_rule: SplitRule::Less,
            trees: vec![
                stump(0, 5.0, vec![-1.0], vec![2.0]),
                stump(0, 8.0, vec![0.5], vec![1.5]),
            ],
        }
    }

    #[test]
    fn test_forest_vote() {
        let model = forest();
        model.validate().unwrap();
        let out = model.predict(array![[1.0, 1.0], [0.0, -1.0], [0.0, 1.0]].view()).unwrap();
        // both trees right → class 1
        // both left → [0.6+0.2, 0.1+0, 0.3+0.8] → class 2
        // tree0 left, tree1 right → [0.6+0.1, 0.1+0.8, 0.3+0.1] → class 1
        assert_eq!(out, vec![1.0, 2.0, 1.0]);
    }

    #[test]
    fn test_boosted_sum_with_base_score() {
        let model = booster();
        model.validate().unwrap();
        let out = model.predict(array![[1.0], [6.0], [9.0]].view()).unwrap();
        assert_eq!(out, vec![9.5, 12.5, 13.5]);
    }

    #[test]
    fn test_split_rule_at_threshold() {
        let mut model = booster();
        // x == threshold: `<` goes right
        assert_eq!(model.predict(array![[5.0]].view()).unwrap(), vec![12.5]);
        model.split_rule = SplitRule::LessOrEqual;
        assert_eq!(model.predict(array![[5.0]].view()).unwrap(), vec![9.5]);
    }

    #[test]
    fn test_predict_is_idempotent() {
        let model = forest();
        let x = array![[0.3, 2.0], [0.9, -4.0]];
        let a = model.predict(x.view()).unwrap();
        let b = model.predict(x.view()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_shape_mismatch() {
        let err = forest().predict(array![[1.0, 2.0, 3.0]].view()).unwrap_err();
        assert!(matches!(err, InferenceError::ShapeMismatch { expected: 2, actual: 3 }));
    }

    #[test]
    fn test_argmax_first_wins() {
        assert_eq!(argmax(&[0.2, 0.4, 0.4]), 1);
        assert_eq!(argmax(&[1.0]), 0);
    }

    #[test]
    fn test_split_feature_out_of_range() {
        let mut model = forest();
        model.trees[0].split_indices[0] = 2;
        assert!(matches!(model.validate(), Err(ArtifactError::InvalidModel(_))));
    }

    #[test]
    fn test_child_before_parent_rejected() {
        let mut model = booster();
        model.trees[1].children_left[0] = 0;
        assert!(model.validate().is_err());
    }

    #[test]
    fn test_leaf_width_checked() {
        let mut model = forest();
        model.trees[1].values[2] = vec![1.0, 1.0];
        assert!(model.validate().is_err());

        let mut model = forest();
        model.n_classes = None;
        assert!(model.validate().is_err());
    }

    #[test]
    fn test_from_json() {
        let json = r#"{
            "task": "regression",
            "n_features": 1,
            "aggregation": "sum",
            "base_score": 1.0,
            "split_rule": "less",
            "trees": [{
                "split_indices": [0, -2, -2],
                "thresholds": [3.0, 0.0, 0.0],
                "children_left": [1, -1, -1],
                "children_right": [2, -1, -1],
                "values": [[0.0], [1.0], [2.0]]
            }]
        }"#;
        let model = TreeEnsemble::from_json("model.json", json.as_bytes()).unwrap();
        assert_eq!(model.predict(array![[4.0]].view()).unwrap(), vec![3.0]);

        let broken = json.replace("\"n_features\": 1", "\"n_features\": 0");
        assert!(TreeEnsemble::from_json("model.json", broken.as_bytes()).is_err());
        assert!(matches!(
            TreeEnsemble::from_json("model.json", b"{"),
            Err(ArtifactError::Parse { .. })
        ));
    }
}
