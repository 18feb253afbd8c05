//! Linear binary models: logistic regression (probabilistic) and linear SVC
//! (class label only). Both score `coef · x + intercept`.

use cardio_core::{Classifier, ModelError, ProbabilityEstimator};
use serde::{Deserialize, Serialize};

use crate::ArtifactError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinearWeights {
    pub classes: Vec<i64>,
    pub coef: Vec<f64>,
    pub intercept: f64,
}

impl LinearWeights {
    fn validate(&self, kind: &'static str) -> Result<(), ArtifactError> {
        if self.classes.len() != 2 {
            return Err(ArtifactError::invalid(
                kind,
                format!("expected 2 classes, found {:?}", self.classes),
            ));
        }
        if self.coef.is_empty() {
            return Err(ArtifactError::invalid(kind, "empty coefficient vector"));
        }
        if !self.intercept.is_finite() || self.coef.iter().any(|value| !value.is_finite()) {
            return Err(ArtifactError::invalid(kind, "non-finite weights"));
        }
        Ok(())
    }

    fn decision(&self, features: &[f64]) -> Result<f64, ModelError> {
        if features.len() != self.coef.len() {
            return Err(ModelError::DimensionMismatch {
                stage: "model",
                expected: self.coef.len(),
                actual: features.len(),
            });
        }
        let dot: f64 = self
            .coef
            .iter()
            .zip(features.iter())
            .map(|(w, x)| w * x)
            .sum();
        Ok(dot + self.intercept)
    }

    fn label(&self, positive: bool) -> i64 {
        self.classes[usize::from(positive)]
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogisticRegression {
    #[serde(flatten)]
    pub weights: LinearWeights,
}

impl LogisticRegression {
    pub fn validate(&self) -> Result<(), ArtifactError> {
        self.weights.validate("logistic_regression")
    }
}

impl Classifier for LogisticRegression {
    fn n_features_in(&self) -> usize {
        self.weights.coef.len()
    }

    fn classes(&self) -> &[i64] {
        &self.weights.classes
    }

    fn predict(&self, features: &[f64]) -> Result<i64, ModelError> {
        Ok(self.weights.label(self.weights.decision(features)? > 0.0))
    }
}

impl ProbabilityEstimator for LogisticRegression {
    fn predict_proba(&self, features: &[f64]) -> Result<Vec<f64>, ModelError> {
        let positive = sigmoid(self.weights.decision(features)?);
        Ok(vec![1.0 - positive, positive])
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinearSvc {
    #[serde(flatten)]
    pub weights: LinearWeights,
}

impl LinearSvc {
    pub fn validate(&self) -> Result<(), ArtifactError> {
        self.weights.validate("linear_svc")
    }
}

impl Classifier for LinearSvc {
    fn n_features_in(&self) -> usize {
        self.weights.coef.len()
    }

    fn classes(&self) -> &[i64] {
        &self.weights.classes
    }

    fn predict(&self, features: &[f64]) -> Result<i64, ModelError> {
        Ok(self.weights.label(self.weights.decision(features)? > 0.0))
    }
}

fn sigmoid(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let e = z.exp();
        e / (1.0 + e)
    }
}
