//! Estimators re-exported from the training environment in a portable form.
//!
//! Trees use the same convention as the exporter: a flat node array rooted at
//! index 0, where a split sends the sample left when `x[feature] <= threshold`.
//!
//! This matches scikit-learn trees. XGBoost sends a sample left when
//! `x < split_condition`, so its exporter must write each threshold as the
//! largest `f64` below `split_condition` (`f64::next_down`, or the midpoint to
//! the next lower observed value). Copying `split_condition` unchanged sends
//! values sitting exactly on the cut, such as a yes/no column split at 1.0,
//! down the wrong branch.

use serde::{Deserialize, Serialize};

use crate::ports::{check_shape, ScoringError};

/// Logistic function, computed without overflow for large |z|.
#[must_use]
pub fn sigmoid(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let e = z.exp();
        e / (1.0 + e)
    }
}

/// One node of a decision tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TreeNode {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf {
        value: Vec<f64>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionTree {
    pub nodes: Vec<TreeNode>,
}

impl DecisionTree {
    /// Structural checks run once at load time so evaluation can index freely.
    ///
    /// Children must come after their parent, which also rules out cycles.
    fn validate(&self, n_features: usize, leaf_len: usize) -> Result<(), String> {
        if self.nodes.is_empty() {
            return Err("tree has no nodes".into());
        }
        for (idx, node) in self.nodes.iter().enumerate() {
            match node {
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    if *feature >= n_features {
                        return Err(format!(
                            "node {idx} splits on feature {feature}, only {n_features} exist"
                        ));
                    }
                    if !threshold.is_finite() {
                        return Err(format!("node {idx} has a non-finite threshold"));
                    }
                    for child in [*left, *right] {
                        if child <= idx || child >= self.nodes.len() {
                            return Err(format!("node {idx} has invalid child index {child}"));
                        }
                    }
                }
                TreeNode::Leaf { value } => {
                    if value.len() != leaf_len {
                        return Err(format!(
                            "leaf {idx} holds {} values, expected {leaf_len}",
                            value.len()
                        ));
                    }
                    if value.iter().any(|v| !v.is_finite()) {
                        return Err(format!("leaf {idx} holds a non-finite value"));
                    }
                }
            }
        }
        Ok(())
    }

    /// Walk from the root to a leaf.
    fn leaf(&self, features: &[f64]) -> &[f64] {
        let mut idx = 0;
        loop {
            match &self.nodes[idx] {
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    idx = if features[*feature] <= *threshold {
                        *left
                    } else {
                        *right
                    };
                }
                TreeNode::Leaf { value } => return value,
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogisticRegression {
    pub coefficients: Vec<f64>,
    pub intercept: f64,
}

impl LogisticRegression {
    fn predict_proba(&self, features: &[f64]) -> [f64; 2] {
        let z = self.intercept
            + self
                .coefficients
                .iter()
                .zip(features)
                .map(|(w, x)| w * x)
                .sum::<f64>();
        let p = sigmoid(z);
        [1.0 - p, p]
    }
}

/// Bagged classification trees; leaves hold per-class sample weights.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomForest {
    pub trees: Vec<DecisionTree>,
}

impl RandomForest {
    fn predict_proba(&self, features: &[f64]) -> [f64; 2] {
        let mut acc = [0.0, 0.0];
        for tree in &self.trees {
            let leaf = tree.leaf(features);
            let total = leaf[0] + leaf[1];
            acc[0] += leaf[0] / total;
            acc[1] += leaf[1] / total;
        }
        let n = self.trees.len() as f64;
        [acc[0] / n, acc[1] / n]
    }
}

/// Boosted regression trees on the log-odds scale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradientBoosting {
    pub trees: Vec<DecisionTree>,
    pub learning_rate: f64,
    #[serde(default)]
    pub init_score: f64,
}

impl GradientBoosting {
    fn predict_proba(&self, features: &[f64]) -> [f64; 2] {
        let raw = self.init_score
            + self.learning_rate
                * self
                    .trees
                    .iter()
                    .map(|tree| tree.leaf(features)[0])
                    .sum::<f64>();
        let p = sigmoid(raw);
        [1.0 - p, p]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Estimator {
    LogisticRegression(LogisticRegression),
    RandomForest(RandomForest),
    GradientBoosting(GradientBoosting),
}

impl Estimator {
    /// Check parameters against the number of input features.
    ///
    /// # Errors
    /// Returns a description of the first inconsistency found.
    pub fn validate(&self, n_features: usize) -> Result<(), String> {
        match self {
            Self::LogisticRegression(lr) => {
                if lr.coefficients.len() != n_features {
                    return Err(format!(
                        "{} coefficients for {n_features} features",
                        lr.coefficients.len()
                    ));
                }
                if !lr.intercept.is_finite() || lr.coefficients.iter().any(|w| !w.is_finite()) {
                    return Err("non-finite coefficient".into());
                }
            }
            Self::RandomForest(rf) => {
                if rf.trees.is_empty() {
                    return Err("random forest has no trees".into());
                }
                for (i, tree) in rf.trees.iter().enumerate() {
                    tree.validate(n_features, 2)
                        .map_err(|e| format!("tree {i}: {e}"))?;
                    let bad_leaf = tree.nodes.iter().any(|node| match node {
                        TreeNode::Leaf { value } => {
                            value.iter().any(|v| *v < 0.0) || value.iter().sum::<f64>() <= 0.0
                        }
                        TreeNode::Split { .. } => false,
                    });
                    if bad_leaf {
                        return Err(format!(
                            "tree {i}: leaf class weights must be non-negative with a positive total"
                        ));
                    }
                }
            }
            Self::GradientBoosting(gb) => {
                if gb.trees.is_empty() {
                    return Err("gradient boosting model has no trees".into());
                }
                if !gb.learning_rate.is_finite() || !gb.init_score.is_finite() {
                    return Err("non-finite learning_rate or init_score".into());
                }
                for (i, tree) in gb.trees.iter().enumerate() {
                    tree.validate(n_features, 1)
                        .map_err(|e| format!("tree {i}: {e}"))?;
                }
            }
        }
        Ok(())
    }

    /// Class probabilities for a validated estimator.
    ///
    /// # Errors
    /// Returns `ScoringError::ShapeMismatch` if `features` has the wrong length.
    pub fn predict_proba(
        &self,
        n_features: usize,
        features: &[f64],
    ) -> Result<[f64; 2], ScoringError> {
        check_shape(n_features, features)?;
        Ok(match self {
            Self::LogisticRegression(lr) => lr.predict_proba(features),
            Self::RandomForest(rf) => rf.predict_proba(features),
            Self::GradientBoosting(gb) => gb.predict_proba(features),
        })
    }

    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::LogisticRegression(_) => "logistic_regression",
            Self::RandomForest(_) => "random_forest",
            Self::GradientBoosting(_) => "gradient_boosting",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stump(feature: usize, threshold: f64, left: Vec<f64>, right: Vec<f64>) -> DecisionTree {
        DecisionTree {
            nodes: vec![
                TreeNode::Split {
                    feature,
                    threshold,
                    left: 1,
                    right: 2,
                },
                TreeNode::Leaf { value: left },
                TreeNode::Leaf { value: right },
            ],
        }
    }

    #[test]
    fn test_sigmoid_is_stable() {
        assert!((sigmoid(0.0) - 0.5).abs() < 1e-12);
        assert!(sigmoid(1000.0) <= 1.0);
        assert!(sigmoid(-1000.0) >= 0.0);
        assert!((sigmoid(2.0) + sigmoid(-2.0) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_logistic_regression() {
        let est = Estimator::LogisticRegression(LogisticRegression {
            coefficients: vec![1.0, -1.0],
            intercept: 0.0,
        });
        est.validate(2).expect("valid");
        let p = est.predict_proba(2, &[3.0, 3.0]).unwrap();
        assert!((p[1] - 0.5).abs() < 1e-12);
        assert!((p[0] + p[1] - 1.0).abs() < 1e-12);
        assert!(est.validate(3).is_err());
    }

    #[test]
    fn test_random_forest_averages_normalised_leaves() {
        let est = Estimator::RandomForest(RandomForest {
            trees: vec![
                stump(0, 50.0, vec![9.0, 1.0], vec![2.0, 8.0]),
                stump(1, 0.5, vec![1.0, 1.0], vec![0.0, 4.0]),
            ],
        });
        est.validate(2).expect("valid");

        // Tree 1 goes right (0.8), tree 2 goes left (0.5).
        let p = est.predict_proba(2, &[60.0, 0.0]).unwrap();
        assert!((p[1] - 0.65).abs() < 1e-12);

        // Threshold is inclusive on the left branch.
        let p = est.predict_proba(2, &[50.0, 1.0]).unwrap();
        assert!((p[1] - (0.1 + 1.0) / 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_gradient_boosting_sums_on_log_odds() {
        let est = Estimator::GradientBoosting(GradientBoosting {
            trees: vec![
                stump(0, 0.5, vec![-1.0], vec![1.0]),
                stump(0, 0.5, vec![-1.0], vec![1.0]),
            ],
            learning_rate: 0.5,
            init_score: 0.0,
        });
        est.validate(1).expect("valid");
        let p = est.predict_proba(1, &[1.0]).unwrap();
        assert!((p[1] - sigmoid(1.0)).abs() < 1e-12);
    }

    #[test]
    fn test_value_on_threshold_goes_left() {
        // An XGBoost cut of `x < 1.0` on a yes/no column, written unshifted.
        let unshifted = Estimator::GradientBoosting(GradientBoosting {
            trees: vec![stump(0, 1.0, vec![-2.0], vec![2.0])],
            learning_rate: 1.0,
            init_score: 0.0,
        });
        let p = unshifted.predict_proba(1, &[1.0]).unwrap();
        assert!((p[1] - sigmoid(-2.0)).abs() < 1e-12);

        // Shifted down one ulp, "Yes" goes right as it does in XGBoost.
        let shifted = Estimator::GradientBoosting(GradientBoosting {
            trees: vec![stump(0, 1.0 - f64::EPSILON / 2.0, vec![-2.0], vec![2.0])],
            learning_rate: 1.0,
            init_score: 0.0,
        });
        let p = shifted.predict_proba(1, &[1.0]).unwrap();
        assert!((p[1] - sigmoid(2.0)).abs() < 1e-12);
        let p = shifted.predict_proba(1, &[0.0]).unwrap();
        assert!((p[1] - sigmoid(-2.0)).abs() < 1e-12);
    }

    #[test]
    fn test_shape_mismatch() {
        let est = Estimator::LogisticRegression(LogisticRegression {
            coefficients: vec![1.0],
            intercept: 0.0,
        });
        assert_eq!(
            est.predict_proba(1, &[1.0, 2.0]).unwrap_err(),
            ScoringError::ShapeMismatch {
                expected: 1,
                actual: 2
            }
        );
    }

    #[test]
    fn test_tree_validation_rejects_bad_structure() {
        let backwards = DecisionTree {
            nodes: vec![
                TreeNode::Leaf { value: vec![1.0, 0.0] },
                TreeNode::Split {
                    feature: 0,
                    threshold: 0.0,
                    left: 0,
                    right: 0,
                },
            ],
        };
        assert!(backwards.validate(1, 2).is_err());

        let out_of_range = stump(5, 0.0, vec![1.0, 0.0], vec![0.0, 1.0]);
        assert!(out_of_range.validate(2, 2).is_err());

        let wrong_leaf = stump(0, 0.0, vec![1.0], vec![0.0, 1.0]);
        assert!(wrong_leaf.validate(1, 2).is_err());

        let empty_weights = Estimator::RandomForest(RandomForest {
            trees: vec![stump(0, 0.0, vec![0.0, 0.0], vec![0.0, 1.0])],
        });
        assert!(empty_weights.validate(1).is_err());
    }

    #[test]
    fn test_estimator_json_shape() {
        let json = r#"{
            "kind": "gradient_boosting",
            "learning_rate": 0.1,
            "trees": [{"nodes": [
                {"split": {"feature": 0, "threshold": 1.5, "left": 1, "right": 2}},
                {"leaf": {"value": [-0.4]}},
                {"leaf": {"value": [0.7]}}
            ]}]
        }"#;
        let est: Estimator = serde_json::from_str(json).expect("parse");
        assert_eq!(est.kind(), "gradient_boosting");
        est.validate(1).expect("valid");
    }
}
