//! Fitted scaler and model artifacts.
//!
//! Training happens offline in scikit-learn; the fitted parameters are
//! exported to JSON and loaded here once at startup. Every artifact is
//! structurally validated on load so that a broken export fails the process
//! instead of a request.

mod forest;
mod linear;
mod scaler;

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use cardio_core::{Classifier, FeatureScaler, FeatureSet, RiskClassifier, RiskModel, RiskPolicy};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use forest::{DecisionTree, RandomForest};
pub use linear::{LinearSvc, LinearWeights, LogisticRegression};
pub use scaler::{MinMaxScaler, ScalerArtifact, StandardScaler};

pub const DEFAULT_MODEL_PATH: &str = "artifacts/with_bmi/model.json";
pub const DEFAULT_SCALER_PATH: &str = "artifacts/with_bmi/scaler.json";

#[derive(Debug, Clone, PartialEq, Error)]
#[error("invalid {artifact} artifact: {message}")]
pub struct ArtifactError {
    pub artifact: &'static str,
    pub message: String,
}

impl ArtifactError {
    pub fn invalid(artifact: &'static str, message: impl Into<String>) -> Self {
        Self {
            artifact,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ModelArtifact {
    LogisticRegression(LogisticRegression),
    RandomForest(RandomForest),
    LinearSvc(LinearSvc),
}

impl ModelArtifact {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::LogisticRegression(_) => "logistic_regression",
            Self::RandomForest(_) => "random_forest",
            Self::LinearSvc(_) => "linear_svc",
        }
    }

    pub fn validate(&self) -> Result<(), ArtifactError> {
        match self {
            Self::LogisticRegression(model) => model.validate(),
            Self::RandomForest(model) => model.validate(),
            Self::LinearSvc(model) => model.validate(),
        }
    }

    /// Fixes the probability capability once, from the artifact kind.
    pub fn into_risk_model(self) -> RiskModel {
        match self {
            Self::LogisticRegression(model) => RiskModel::Probabilistic(Arc::new(model)),
            Self::RandomForest(model) => RiskModel::Probabilistic(Arc::new(model)),
            Self::LinearSvc(model) => RiskModel::ClassOnly(Arc::new(model)),
        }
    }

    fn classifier(&self) -> &dyn Classifier {
        match self {
            Self::LogisticRegression(model) => model,
            Self::RandomForest(model) => model,
            Self::LinearSvc(model) => model,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ArtifactPaths {
    pub model: PathBuf,
    pub scaler: PathBuf,
}

impl ArtifactPaths {
    pub fn new(model: impl Into<PathBuf>, scaler: impl Into<PathBuf>) -> Self {
        Self {
            model: model.into(),
            scaler: scaler.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ArtifactSummary {
    pub scaler_kind: &'static str,
    pub model_kind: &'static str,
    pub probabilistic: bool,
    pub n_features: usize,
    pub classes: Vec<i64>,
    pub feature_names: Option<Vec<String>>,
}

/// The loaded scaler and model pair.
#[derive(Debug, Clone)]
pub struct CardioMlStack {
    pub scaler: ScalerArtifact,
    pub model: ModelArtifact,
}

impl CardioMlStack {
    pub fn load(paths: &ArtifactPaths) -> Result<Self> {
        let scaler: ScalerArtifact = read_artifact(&paths.scaler, "scaler")?;
        let model: ModelArtifact = read_artifact(&paths.model, "model")?;
        Self::from_artifacts(scaler, model)
            .with_context(|| format!("artifacts under {} are inconsistent", paths.model.display()))
    }

    pub fn from_artifacts(scaler: ScalerArtifact, model: ModelArtifact) -> Result<Self> {
        scaler.validate()?;
        model.validate()?;
        Ok(Self { scaler, model })
    }

    pub fn summary(&self) -> ArtifactSummary {
        let classifier = self.model.classifier();
        ArtifactSummary {
            scaler_kind: self.scaler.kind(),
            model_kind: self.model.kind(),
            probabilistic: !matches!(self.model, ModelArtifact::LinearSvc(_)),
            n_features: self.scaler.n_features_in(),
            classes: classifier.classes().to_vec(),
            feature_names: self.scaler.feature_names().map(<[String]>::to_vec),
        }
    }

    /// Binds the artifacts to a feature layout and decision table. Any
    /// disagreement between them is returned as an error for the caller to
    /// abort on.
    pub fn into_classifier(
        self,
        feature_set: FeatureSet,
        policy: RiskPolicy,
    ) -> Result<RiskClassifier> {
        let scaler: Arc<dyn FeatureScaler> = Arc::new(self.scaler);
        let classifier = RiskClassifier::new(scaler, self.model.into_risk_model(), feature_set, policy)
            .with_context(|| {
                format!(
                    "artifacts do not match feature set '{}'",
                    feature_set.as_str()
                )
            })?;
        Ok(classifier)
    }
}

fn read_artifact<T: DeserializeOwned>(path: &Path, what: &str) -> Result<T> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed reading {what} artifact at {}", path.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("invalid {what} artifact at {}", path.display()))
}
