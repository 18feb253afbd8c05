use thiserror::Error;

/// Bad request input. Always attributable to the caller.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("request body must be a JSON object")]
    NotAnObject,
    #[error("missing required field '{0}'")]
    MissingField(&'static str),
    #[error("field '{field}' {reason}")]
    InvalidField { field: &'static str, reason: String },
    #[error("field '{field}' is out of range: {reason}")]
    OutOfRange { field: &'static str, reason: String },
}

/// Scaler or model invocation failure. Points at a deployment defect, not
/// at the request.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ModelError {
    #[error("{stage} expected {expected} features, got {actual}")]
    DimensionMismatch {
        stage: &'static str,
        expected: usize,
        actual: usize,
    },
    #[error("model produced invalid output: {0}")]
    InvalidOutput(String),
}

/// Inconsistency between the configured feature layout, rules and loaded
/// artifacts. Detected at startup only.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("feature set '{feature_set}' has {layout} columns but the scaler was fitted on {scaler}")]
    ScalerWidth {
        feature_set: &'static str,
        layout: usize,
        scaler: usize,
    },
    #[error("scaler column {index} is '{found}', feature set expects '{expected}'")]
    ColumnName {
        index: usize,
        expected: &'static str,
        found: String,
    },
    #[error("model expects {model} features but the scaler produces {scaler}")]
    ModelWidth { model: usize, scaler: usize },
    #[error("model classes {0:?} do not contain the positive class 1")]
    MissingPositiveClass(Vec<i64>),
    #[error("class-only model has classes {0:?}; predictions must be 0 or 1")]
    NonBinaryClasses(Vec<i64>),
    #[error("invalid risk thresholds: {0}")]
    Thresholds(String),
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum PredictError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Model(#[from] ModelError),
}
