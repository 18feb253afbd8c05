use cardio_core::{Classifier, ModelError, ProbabilityEstimator};
use serde::{Deserialize, Serialize};

use crate::ArtifactError;

const LEAF: i64 = -1;

/// One fitted tree in scikit-learn's array form (`tree_.children_left`,
/// `children_right`, `feature`, `threshold`, `value`). scikit-learn's
/// `tree_.value` is shaped `(n_nodes, n_outputs, n_classes)`; the exporter
/// takes output 0 so that `value` holds one row of class weights per node.
/// Rows may be counts or fractions; each leaf is normalized.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionTree {
    pub children_left: Vec<i64>,
    pub children_right: Vec<i64>,
    pub feature: Vec<i64>,
    pub threshold: Vec<f64>,
    pub value: Vec<Vec<f64>>,
}

impl DecisionTree {
    fn validate(&self, n_features: usize, n_classes: usize) -> Result<(), String> {
        let nodes = self.children_left.len();
        if nodes == 0 {
            return Err("tree has no nodes".to_string());
        }
        if [
            self.children_right.len(),
            self.feature.len(),
            self.threshold.len(),
            self.value.len(),
        ]
        .iter()
        .any(|len| *len != nodes)
        {
            return Err("tree arrays differ in length".to_string());
        }

        for node in 0..nodes {
            let (left, right) = (self.children_left[node], self.children_right[node]);
            if left == LEAF || right == LEAF {
                if left != right {
                    return Err(format!("node {node} has a single child"));
                }
                let weights = &self.value[node];
                if weights.len() != n_classes {
                    return Err(format!(
                        "leaf {node} has {} class weights, expected {n_classes}",
                        weights.len()
                    ));
                }
                if weights.iter().any(|w| !w.is_finite() || *w < 0.0)
                    || weights.iter().sum::<f64>() <= 0.0
                {
                    return Err(format!("leaf {node} has invalid class weights"));
                }
                continue;
            }

            // Children always follow their parent, so traversal cannot loop.
            for child in [left, right] {
                if child <= node as i64 || child >= nodes as i64 {
                    return Err(format!("node {node} points to invalid child {child}"));
                }
            }
            let feature = self.feature[node];
            if feature < 0 || feature as usize >= n_features {
                return Err(format!("node {node} splits on unknown feature {feature}"));
            }
            if self.threshold[node].is_nan() {
                return Err(format!("node {node} has a NaN threshold"));
            }
        }
        Ok(())
    }

    fn leaf_distribution(&self, features: &[f64]) -> Vec<f64> {
        let mut node = 0_usize;
        while self.children_left[node] != LEAF {
            let feature = self.feature[node] as usize;
            node = if features[feature] <= self.threshold[node] {
                self.children_left[node] as usize
            } else {
                self.children_right[node] as usize
            };
        }

        let weights = &self.value[node];
        let total: f64 = weights.iter().sum();
        weights.iter().map(|w| w / total).collect()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RandomForest {
    pub classes: Vec<i64>,
    pub n_features: usize,
    pub trees: Vec<DecisionTree>,
}

impl RandomForest {
    pub fn validate(&self) -> Result<(), ArtifactError> {
        if self.classes.len() < 2 {
            return Err(ArtifactError::invalid(
                "random_forest",
                format!("needs at least 2 classes, found {:?}", self.classes),
            ));
        }
        if self.n_features == 0 || self.trees.is_empty() {
            return Err(ArtifactError::invalid(
                "random_forest",
                "forest has no features or no trees",
            ));
        }
        for (index, tree) in self.trees.iter().enumerate() {
            tree.validate(self.n_features, self.classes.len())
                .map_err(|message| {
                    ArtifactError::invalid("random_forest", format!("tree {index}: {message}"))
                })?;
        }
        Ok(())
    }
}

impl Classifier for RandomForest {
    fn n_features_in(&self) -> usize {
        self.n_features
    }

    fn classes(&self) -> &[i64] {
        &self.classes
    }

    fn predict(&self, features: &[f64]) -> Result<i64, ModelError> {
        let proba = self.predict_proba(features)?;
        let best = proba
            .iter()
            .enumerate()
            .fold((0, f64::MIN), |best, (index, p)| {
                if *p > best.1 {
                    (index, *p)
                } else {
                    best
                }
            })
            .0;
        Ok(self.classes[best])
    }
}

impl ProbabilityEstimator for RandomForest {
    fn predict_proba(&self, features: &[f64]) -> Result<Vec<f64>, ModelError> {
        if features.len() != self.n_features {
            return Err(ModelError::DimensionMismatch {
                stage: "model",
                expected: self.n_features,
                actual: features.len(),
            });
        }

        let mut acc = vec![0.0_f64; self.classes.len()];
        for tree in &self.trees {
            for (slot, p) in acc.iter_mut().zip(tree.leaf_distribution(features)) {
                *slot += p;
            }
        }
        let trees = self.trees.len() as f64;
        Ok(acc.into_iter().map(|p| p / trees).collect())
    }
}
