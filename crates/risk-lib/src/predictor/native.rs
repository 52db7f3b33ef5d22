//! Native classifiers decoded from JSON parameter files
//!
//! These cover the three families without an ONNX runtime and are what the
//! in-memory test fixtures are written in.

use super::Classifier;
use crate::error::PredictionError;
use serde::Deserialize;

/// Default probability cut-off for the logistic family
const DEFAULT_THRESHOLD: f64 = 0.5;

fn check_shape(expected: usize, features: &[f64]) -> Result<(), PredictionError> {
    if features.len() != expected {
        return Err(PredictionError::ShapeMismatch {
            expected,
            actual: features.len(),
        });
    }
    Ok(())
}

fn dot(coefficients: &[f64], features: &[f64]) -> f64 {
    coefficients.iter().zip(features).map(|(w, x)| w * x).sum()
}

fn parse<T: for<'de> Deserialize<'de>>(bytes: &[u8]) -> Result<T, String> {
    serde_json::from_slice(bytes).map_err(|e| e.to_string())
}

/// Logistic regression: sigmoid(w·x + b) >= threshold
#[derive(Debug, Clone, Deserialize)]
pub struct LogisticModel {
    pub coefficients: Vec<f64>,
    pub intercept: f64,
    #[serde(default = "default_threshold")]
    pub threshold: f64,
}

fn default_threshold() -> f64 {
    DEFAULT_THRESHOLD
}

impl LogisticModel {
    pub fn from_json(bytes: &[u8]) -> Result<Self, String> {
        let model: Self = parse(bytes)?;
        if model.coefficients.is_empty() {
            return Err("logistic model has no coefficients".to_string());
        }
        if !(0.0..=1.0).contains(&model.threshold) {
            return Err(format!("threshold {} outside [0, 1]", model.threshold));
        }
        Ok(model)
    }

    pub fn probability(&self, features: &[f64]) -> Result<f64, PredictionError> {
        check_shape(self.coefficients.len(), features)?;
        let z = dot(&self.coefficients, features) + self.intercept;
        Ok(1.0 / (1.0 + (-z).exp()))
    }
}

impl Classifier for LogisticModel {
    fn predict(&self, features: &[f64]) -> Result<f64, PredictionError> {
        let p = self.probability(features)?;
        if p.is_nan() {
            return Err(PredictionError::NonFinite(p));
        }
        Ok(if p >= self.threshold { 1.0 } else { 0.0 })
    }

    fn backend(&self) -> &'static str {
        "logistic"
    }
}

/// Linear-kernel support vector classifier: sign of w·x + b
#[derive(Debug, Clone, Deserialize)]
pub struct LinearSvmModel {
    pub coefficients: Vec<f64>,
    pub intercept: f64,
}

impl LinearSvmModel {
    pub fn from_json(bytes: &[u8]) -> Result<Self, String> {
        let model: Self = parse(bytes)?;
        if model.coefficients.is_empty() {
            return Err("svm model has no coefficients".to_string());
        }
        Ok(model)
    }

    pub fn decision(&self, features: &[f64]) -> Result<f64, PredictionError> {
        check_shape(self.coefficients.len(), features)?;
        Ok(dot(&self.coefficients, features) + self.intercept)
    }
}

impl Classifier for LinearSvmModel {
    fn predict(&self, features: &[f64]) -> Result<f64, PredictionError> {
        let margin = self.decision(features)?;
        if !margin.is_finite() {
            return Err(PredictionError::NonFinite(margin));
        }
        Ok(if margin >= 0.0 { 1.0 } else { 0.0 })
    }

    fn backend(&self) -> &'static str {
        "linear-svm"
    }
}

/// A node of a decision tree, addressed by index into `TreeModel::nodes`
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum TreeNode {
    Leaf {
        leaf: f64,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

#[derive(Debug, Clone, Deserialize)]
pub struct TreeModel {
    pub nodes: Vec<TreeNode>,
}

impl TreeModel {
    fn validate(&self) -> Result<(), String> {
        if self.nodes.is_empty() {
            return Err("tree has no nodes".to_string());
        }
        for (idx, node) in self.nodes.iter().enumerate() {
            if let TreeNode::Split { left, right, .. } = node {
                // children must point forward so every walk terminates
                if *left <= idx || *right <= idx || *left >= self.nodes.len() || *right >= self.nodes.len() {
                    return Err(format!("node {idx} has invalid children ({left}, {right})"));
                }
            }
        }
        Ok(())
    }

    fn max_feature(&self) -> Option<usize> {
        self.nodes
            .iter()
            .filter_map(|node| match node {
                TreeNode::Split { feature, .. } => Some(*feature),
                TreeNode::Leaf { .. } => None,
            })
            .max()
    }

    fn walk(&self, features: &[f64]) -> Result<f64, PredictionError> {
        let mut idx = 0;
        loop {
            match &self.nodes[idx] {
                TreeNode::Leaf { leaf } => return Ok(*leaf),
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    let value = features.get(*feature).ok_or(PredictionError::ShapeMismatch {
                        expected: feature + 1,
                        actual: features.len(),
                    })?;
                    idx = if *value <= *threshold { *left } else { *right };
                }
            }
        }
    }
}

/// Random forest: majority vote over trees, ties resolve to the positive class
#[derive(Debug, Clone, Deserialize)]
pub struct ForestModel {
    /// Width of the feature vector the forest was trained on
    pub n_features: usize,
    pub trees: Vec<TreeModel>,
}

impl ForestModel {
    pub fn from_json(bytes: &[u8]) -> Result<Self, String> {
        let model: Self = parse(bytes)?;
        if model.trees.is_empty() {
            return Err("forest has no trees".to_string());
        }
        if model.n_features == 0 {
            return Err("forest declares zero features".to_string());
        }
        for (i, tree) in model.trees.iter().enumerate() {
            tree.validate().map_err(|e| format!("tree {i}: {e}"))?;
            if let Some(feature) = tree.max_feature().filter(|f| *f >= model.n_features) {
                return Err(format!(
                    "tree {i} splits on feature {feature}, forest has {}",
                    model.n_features
                ));
            }
        }
        Ok(model)
    }
}

impl Classifier for ForestModel {
    fn predict(&self, features: &[f64]) -> Result<f64, PredictionError> {
        check_shape(self.n_features, features)?;

        let mut positive = 0usize;
        for tree in &self.trees {
            let vote = tree.walk(features)?;
            if !vote.is_finite() {
                return Err(PredictionError::NonFinite(vote));
            }
            if vote >= 0.5 {
                positive += 1;
            }
        }

        Ok(if positive * 2 >= self.trees.len() { 1.0 } else { 0.0 })
    }

    fn backend(&self) -> &'static str {
        "forest"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_logistic_threshold() {
        let model = LogisticModel::from_json(br#"{"coefficients": [0.05, 0.0], "intercept": -5.0}"#)
            .unwrap();
        // z = 0.05 * 120 - 5 = 1.0 → p ≈ 0.73
        assert_eq!(model.predict(&[120.0, 80.0]).unwrap(), 1.0);
        // z = 0.05 * 80 - 5 = -1.0 → p ≈ 0.27
        assert_eq!(model.predict(&[80.0, 80.0]).unwrap(), 0.0);
    }

    #[test]
    fn test_logistic_custom_threshold() {
        let model = LogisticModel::from_json(
            br#"{"coefficients": [0.05, 0.0], "intercept": -5.0, "threshold": 0.8}"#,
        )
        .unwrap();
        assert_eq!(model.predict(&[120.0, 80.0]).unwrap(), 0.0);
    }

    #[test]
    fn test_logistic_shape_mismatch() {
        let model = LogisticModel::from_json(br#"{"coefficients": [1.0, 1.0], "intercept": 0.0}"#)
            .unwrap();
        assert_eq!(
            model.predict(&[1.0]),
            Err(PredictionError::ShapeMismatch {
                expected: 2,
                actual: 1
            })
        );
    }

    #[test]
    fn test_logistic_rejects_bad_parameters() {
        assert!(LogisticModel::from_json(br#"{"coefficients": [], "intercept": 0.0}"#).is_err());
        assert!(LogisticModel::from_json(
            br#"{"coefficients": [1.0], "intercept": 0.0, "threshold": 2.0}"#
        )
        .is_err());
        assert!(LogisticModel::from_json(b"{").is_err());
    }

    #[test]
    fn test_svm_margin_sign() {
        let model =
            LinearSvmModel::from_json(br#"{"coefficients": [1.0, -1.0], "intercept": 0.0}"#).unwrap();
        assert_eq!(model.predict(&[140.0, 90.0]).unwrap(), 1.0);
        assert_eq!(model.predict(&[80.0, 90.0]).unwrap(), 0.0);
    }

    #[test]
    fn test_svm_non_finite_margin() {
        let model = LinearSvmModel::from_json(br#"{"coefficients": [1.0], "intercept": 0.0}"#).unwrap();
        assert!(matches!(
            model.predict(&[f64::NAN]),
            Err(PredictionError::NonFinite(_))
        ));
    }

    fn stump(threshold: f64) -> String {
        format!(
            r#"{{"nodes": [
                {{"feature": 0, "threshold": {threshold}, "left": 1, "right": 2}},
                {{"leaf": 0}},
                {{"leaf": 1}}
            ]}}"#
        )
    }

    #[test]
    fn test_forest_majority_vote() {
        let json = format!(
            r#"{{"n_features": 1, "trees": [{}, {}, {}]}}"#,
            stump(100.0),
            stump(110.0),
            stump(130.0)
        );
        let forest = ForestModel::from_json(json.as_bytes()).unwrap();
        // two of three stumps vote positive
        assert_eq!(forest.predict(&[120.0]).unwrap(), 1.0);
        // one of three
        assert_eq!(forest.predict(&[105.0]).unwrap(), 0.0);
    }

    #[test]
    fn test_forest_tie_is_positive() {
        let json = format!(r#"{{"n_features": 1, "trees": [{}, {}]}}"#, stump(100.0), stump(130.0));
        let forest = ForestModel::from_json(json.as_bytes()).unwrap();
        assert_eq!(forest.predict(&[120.0]).unwrap(), 1.0);
    }

    #[test]
    fn test_forest_rejects_backward_children() {
        let json = r#"{"n_features": 1, "trees": [{"nodes": [
            {"feature": 0, "threshold": 1.0, "left": 0, "right": 1},
            {"leaf": 1}
        ]}]}"#;
        assert!(ForestModel::from_json(json.as_bytes()).is_err());
    }

    #[test]
    fn test_forest_rejects_split_beyond_declared_width() {
        let json = r#"{"n_features": 2, "trees": [{"nodes": [
            {"feature": 3, "threshold": 1.0, "left": 1, "right": 2},
            {"leaf": 0},
            {"leaf": 1}
        ]}]}"#;
        assert!(ForestModel::from_json(json.as_bytes()).is_err());
    }

    #[test]
    fn test_forest_requires_declared_width() {
        let json = format!(r#"{{"trees": [{}]}}"#, stump(1.0));
        assert!(ForestModel::from_json(json.as_bytes()).is_err());
    }

    #[test]
    fn test_forest_wider_vector_is_shape_mismatch() {
        // trees only split on feature 0, the declared width still applies
        let json = format!(r#"{{"n_features": 2, "trees": [{}]}}"#, stump(1.0));
        let forest = ForestModel::from_json(json.as_bytes()).unwrap();
        assert_eq!(
            forest.predict(&[0.0, 0.0, 0.0]),
            Err(PredictionError::ShapeMismatch {
                expected: 2,
                actual: 3
            })
        );
    }

    #[test]
    fn test_forest_declared_width() {
        let json = format!(r#"{{"n_features": 2, "trees": [{}]}}"#, stump(1.0));
        let forest = ForestModel::from_json(json.as_bytes()).unwrap();
        assert!(forest.predict(&[0.0]).is_err());
        assert!(forest.predict(&[0.0, 0.0]).is_ok());
    }
}
