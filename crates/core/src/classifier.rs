use std::sync::Arc;

use serde_json::Value;

use crate::error::{ConfigError, ModelError, PredictError, ValidationError};
use crate::features::{body_mass_index, round2, FeatureSet};
use crate::models::{Evaluation, PredictionRequest, PredictionResult, ScoreKind};
use crate::policy::RiskPolicy;

const POSITIVE_CLASS: i64 = 1;

/// A fitted feature normalization.
pub trait FeatureScaler: Send + Sync {
    fn n_features_in(&self) -> usize;

    /// Column names seen at fit time, when the artifact recorded them.
    fn feature_names(&self) -> Option<&[String]> {
        None
    }

    fn transform(&self, features: &[f64]) -> Result<Vec<f64>, ModelError>;
}

/// A fitted classifier that can only return a class label.
pub trait Classifier: Send + Sync {
    fn n_features_in(&self) -> usize;
    fn classes(&self) -> &[i64];
    fn predict(&self, features: &[f64]) -> Result<i64, ModelError>;
}

/// A fitted classifier with per-class probability estimates, ordered like
/// [`Classifier::classes`].
pub trait ProbabilityEstimator: Classifier {
    fn predict_proba(&self, features: &[f64]) -> Result<Vec<f64>, ModelError>;
}

/// Model capability, fixed when the artifact is loaded.
#[derive(Clone)]
pub enum RiskModel {
    Probabilistic(Arc<dyn ProbabilityEstimator>),
    ClassOnly(Arc<dyn Classifier>),
}

impl RiskModel {
    pub fn n_features_in(&self) -> usize {
        match self {
            Self::Probabilistic(model) => model.n_features_in(),
            Self::ClassOnly(model) => model.n_features_in(),
        }
    }

    pub fn classes(&self) -> &[i64] {
        match self {
            Self::Probabilistic(model) => model.classes(),
            Self::ClassOnly(model) => model.classes(),
        }
    }

    pub fn is_probabilistic(&self) -> bool {
        matches!(self, Self::Probabilistic(_))
    }
}

impl std::fmt::Debug for RiskModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RiskModel")
            .field("probabilistic", &self.is_probabilistic())
            .field("n_features_in", &self.n_features_in())
            .field("classes", &self.classes())
            .finish()
    }
}

impl std::fmt::Debug for RiskClassifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RiskClassifier")
            .field("n_features_in", &self.scaler.n_features_in())
            .field("model", &self.model)
            .field("feature_set", &self.feature_set)
            .field("policy", &self.policy)
            .finish()
    }
}

/// Scaler, model and decision table bound together after every startup
/// consistency check has passed. Immutable and shareable across requests.
#[derive(Clone)]
pub struct RiskClassifier {
    scaler: Arc<dyn FeatureScaler>,
    model: RiskModel,
    feature_set: FeatureSet,
    policy: RiskPolicy,
    positive_index: usize,
}

impl RiskClassifier {
    pub fn new(
        scaler: Arc<dyn FeatureScaler>,
        model: RiskModel,
        feature_set: FeatureSet,
        policy: RiskPolicy,
    ) -> Result<Self, ConfigError> {
        policy.thresholds.validate()?;

        if scaler.n_features_in() != feature_set.width() {
            return Err(ConfigError::ScalerWidth {
                feature_set: feature_set.as_str(),
                layout: feature_set.width(),
                scaler: scaler.n_features_in(),
            });
        }

        if let Some(names) = scaler.feature_names() {
            for (index, (expected, found)) in
                feature_set.columns().iter().zip(names.iter()).enumerate()
            {
                if *expected != found.as_str() {
                    return Err(ConfigError::ColumnName {
                        index,
                        expected: *expected,
                        found: found.clone(),
                    });
                }
            }
        }

        if model.n_features_in() != scaler.n_features_in() {
            return Err(ConfigError::ModelWidth {
                model: model.n_features_in(),
                scaler: scaler.n_features_in(),
            });
        }

        let positive_index = model
            .classes()
            .iter()
            .position(|class| *class == POSITIVE_CLASS)
            .ok_or_else(|| ConfigError::MissingPositiveClass(model.classes().to_vec()))?;

        // A class-only label becomes the score directly.
        if let RiskModel::ClassOnly(classifier) = &model {
            if classifier.classes().iter().any(|class| !matches!(class, 0 | 1)) {
                return Err(ConfigError::NonBinaryClasses(classifier.classes().to_vec()));
            }
        }

        Ok(Self {
            scaler,
            model,
            feature_set,
            policy,
            positive_index,
        })
    }

    pub fn feature_set(&self) -> FeatureSet {
        self.feature_set
    }

    pub fn policy(&self) -> &RiskPolicy {
        &self.policy
    }

    pub fn model(&self) -> &RiskModel {
        &self.model
    }

    /// BMI is derived when the model consumes it or the override rules need it.
    pub fn computes_bmi(&self) -> bool {
        self.feature_set.includes_bmi() || self.policy.bmi_overrides
    }

    pub fn assess(&self, request: &PredictionRequest) -> Result<PredictionResult, PredictError> {
        self.evaluate(request).map(|evaluation| evaluation.result)
    }

    pub fn assess_json(&self, payload: &Value) -> Result<PredictionResult, PredictError> {
        let request = PredictionRequest::from_json(payload)?;
        self.assess(&request)
    }

    pub fn evaluate(&self, request: &PredictionRequest) -> Result<Evaluation, PredictError> {
        let bmi = if self.computes_bmi() {
            let bmi = body_mass_index(request.height, request.weight);
            if !bmi.is_finite() {
                return Err(ValidationError::OutOfRange {
                    field: "height",
                    reason: format!(
                        "height {} cm and weight {} kg give a non-finite BMI",
                        request.height, request.weight
                    ),
                }
                .into());
            }
            Some(bmi)
        } else {
            None
        };

        let features = self.feature_set.assemble(request, bmi);
        let scaled = self.scaler.transform(&features)?;

        let (raw_score, class_probabilities, score_kind) = match &self.model {
            RiskModel::Probabilistic(model) => {
                let probabilities = model.predict_proba(&scaled)?;
                let positive = probabilities
                    .get(self.positive_index)
                    .copied()
                    .ok_or_else(|| {
                        ModelError::InvalidOutput(format!(
                            "{} class probabilities, positive class at index {}",
                            probabilities.len(),
                            self.positive_index
                        ))
                    })?;
                if !positive.is_finite() {
                    return Err(ModelError::InvalidOutput(format!(
                        "positive class probability is {positive}"
                    ))
                    .into());
                }
                (positive, Some(probabilities), ScoreKind::Probability)
            }
            RiskModel::ClassOnly(model) => {
                let score = match model.predict(&scaled)? {
                    0 => 0.0,
                    1 => 1.0,
                    other => {
                        return Err(ModelError::InvalidOutput(format!(
                            "predicted class {other} is not binary"
                        ))
                        .into())
                    }
                };
                (score, None, ScoreKind::PredictedClass)
            }
        };

        let score = raw_score.clamp(0.0, 1.0);
        let risk = self.policy.decide(score, bmi, request.ap_hi);

        Ok(Evaluation {
            features,
            scaled,
            class_probabilities,
            raw_score,
            result: PredictionResult {
                risk,
                risk_score: round2(score),
                score_kind,
                bmi,
            },
        })
    }
}
