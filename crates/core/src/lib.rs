pub mod classifier;
pub mod error;
pub mod features;
pub mod input;
pub mod models;
pub mod policy;

pub use classifier::{Classifier, FeatureScaler, ProbabilityEstimator, RiskClassifier, RiskModel};
pub use error::{ConfigError, ModelError, PredictError, ValidationError};
pub use features::{body_mass_index, round2, FeatureSet};
pub use models::*;
pub use policy::{RiskPolicy, RiskThresholds};
