use cardio_core::{FeatureScaler, ModelError};
use serde::{Deserialize, Serialize};

use crate::ArtifactError;

/// Fitted scaler exported from scikit-learn (`mean_`/`scale_` or
/// `min_`/`scale_`, plus `feature_names_in_` when the scaler was fitted on
/// a data frame).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ScalerArtifact {
    StandardScaler(StandardScaler),
    MinMaxScaler(MinMaxScaler),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StandardScaler {
    #[serde(default)]
    pub feature_names: Option<Vec<String>>,
    pub mean: Vec<f64>,
    pub scale: Vec<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MinMaxScaler {
    #[serde(default)]
    pub feature_names: Option<Vec<String>>,
    pub min: Vec<f64>,
    pub scale: Vec<f64>,
}

impl ScalerArtifact {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::StandardScaler(_) => "standard_scaler",
            Self::MinMaxScaler(_) => "min_max_scaler",
        }
    }

    pub fn validate(&self) -> Result<(), ArtifactError> {
        let (offsets, scale, names) = match self {
            Self::StandardScaler(s) => (&s.mean, &s.scale, s.feature_names.as_ref()),
            Self::MinMaxScaler(s) => (&s.min, &s.scale, s.feature_names.as_ref()),
        };

        if scale.is_empty() {
            return Err(ArtifactError::invalid(self.kind(), "fitted on zero features"));
        }
        if offsets.len() != scale.len() {
            return Err(ArtifactError::invalid(
                self.kind(),
                format!("{} offsets but {} scale values", offsets.len(), scale.len()),
            ));
        }
        if offsets.iter().chain(scale.iter()).any(|value| !value.is_finite()) {
            return Err(ArtifactError::invalid(self.kind(), "non-finite parameters"));
        }
        if let Some(names) = names {
            if names.len() != scale.len() {
                return Err(ArtifactError::invalid(
                    self.kind(),
                    format!("{} feature names for {} features", names.len(), scale.len()),
                ));
            }
        }
        Ok(())
    }
}

impl FeatureScaler for ScalerArtifact {
    fn n_features_in(&self) -> usize {
        match self {
            Self::StandardScaler(s) => s.scale.len(),
            Self::MinMaxScaler(s) => s.scale.len(),
        }
    }

    fn feature_names(&self) -> Option<&[String]> {
        match self {
            Self::StandardScaler(s) => s.feature_names.as_deref(),
            Self::MinMaxScaler(s) => s.feature_names.as_deref(),
        }
    }

    fn transform(&self, features: &[f64]) -> Result<Vec<f64>, ModelError> {
        if features.len() != self.n_features_in() {
            return Err(ModelError::DimensionMismatch {
                stage: "scaler",
                expected: self.n_features_in(),
                actual: features.len(),
            });
        }

        let scaled = match self {
            // scikit-learn stores 1.0 for zero-variance columns; mirror that
            // for hand-exported artifacts.
            Self::StandardScaler(s) => features
                .iter()
                .zip(s.mean.iter().zip(s.scale.iter()))
                .map(|(x, (mean, scale))| {
                    let scale = if *scale == 0.0 { 1.0 } else { *scale };
                    (x - mean) / scale
                })
                .collect(),
            Self::MinMaxScaler(s) => features
                .iter()
                .zip(s.min.iter().zip(s.scale.iter()))
                .map(|(x, (min, scale))| x * scale + min)
                .collect(),
        };
        Ok(scaled)
    }
}
