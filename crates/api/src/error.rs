use axum::extract::rejection::BytesRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use cardio_core::{ModelError, PredictError, ValidationError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("request body could not be read: {0}")]
    Body(#[from] BytesRejection),
    #[error("request body is not valid JSON: {0}")]
    MalformedJson(#[from] serde_json::Error),
    #[error(transparent)]
    Validation(ValidationError),
    #[error(transparent)]
    Model(ModelError),
}

impl From<PredictError> for ApiError {
    fn from(err: PredictError) -> Self {
        match err {
            PredictError::Validation(err) => Self::Validation(err),
            PredictError::Model(err) => Self::Model(err),
        }
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Body(rejection) => rejection.status(),
            Self::MalformedJson(_) | Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Model(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match &self {
            Self::Model(err) => {
                tracing::error!(error = %err, "model invocation failed; deployed artifacts disagree with the service");
            }
            other => tracing::warn!(error = %other, "rejected prediction request"),
        }

        (
            self.status(),
            Json(serde_json::json!({ "error": self.to_string() })),
        )
            .into_response()
    }
}
