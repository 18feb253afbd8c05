mod config;
mod error;

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{bail, Result};
use axum::body::Bytes;
use axum::extract::rejection::BytesRejection;
use axum::extract::{DefaultBodyLimit, State};
use axum::http::{header, HeaderValue, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use cardio_core::{FeatureSet, RiskClassifier, RiskPolicy};
use cardio_ml::{ArtifactSummary, CardioMlStack};
use cardio_observability::AppMetrics;
use serde::Serialize;
use serde_json::Value;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;
use tracing::{info, instrument};

pub use config::ServiceConfig;
pub use error::ApiError;

const MAX_BODY_BYTES: usize = 64 * 1024;

#[derive(Clone)]
pub struct ApiState {
    pub classifier: Arc<RiskClassifier>,
    pub metrics: Arc<AppMetrics>,
    pub artifacts: Arc<ArtifactSummary>,
    pub allowed_origins: Arc<Vec<HeaderValue>>,
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    timestamp_utc: String,
    metrics: cardio_observability::MetricsSnapshot,
    model: ModelHealth,
}

#[derive(Debug, Serialize)]
struct ModelHealth {
    #[serde(flatten)]
    artifacts: ArtifactSummary,
    feature_set: FeatureSet,
    policy: RiskPolicy,
}

/// Loads the artifacts named by `config`, checks them against the feature
/// layout and rules, and returns the router. Any failure here must abort the
/// process before it binds.
pub fn build_app(config: &ServiceConfig) -> Result<Router> {
    let stack = CardioMlStack::load(&config.artifacts)?;
    let artifacts = stack.summary();
    let classifier = stack.into_classifier(config.feature_set, config.policy)?;

    if let Some(dir) = config.static_dir.as_deref() {
        if !dir.is_dir() {
            bail!("CARDIO_STATIC_DIR {} is not a directory", dir.display());
        }
    }

    info!(
        model_kind = artifacts.model_kind,
        scaler_kind = artifacts.scaler_kind,
        probabilistic = artifacts.probabilistic,
        feature_set = config.feature_set.as_str(),
        bmi_overrides = config.policy.bmi_overrides,
        "model artifacts loaded"
    );
    if !artifacts.probabilistic {
        tracing::warn!("model has no probability output; risk_score will be the predicted class");
    }

    let state = ApiState {
        classifier: Arc::new(classifier),
        metrics: AppMetrics::shared(),
        artifacts: Arc::new(artifacts),
        allowed_origins: Arc::new(config.allowed_origins.clone()),
    };

    Ok(build_router(state, config.static_dir.as_deref()))
}

pub fn build_router(state: ApiState, static_dir: Option<&Path>) -> Router {
    let router = Router::new()
        .route("/health", get(health))
        .route("/predict", post(predict))
        .route("/api/predict", post(predict));

    // With a bundled frontend, unmatched paths fall through to the SPA.
    let router = match static_dir {
        Some(dir) => router.fallback_service(
            ServeDir::new(dir).fallback(ServeFile::new(dir.join("index.html"))),
        ),
        None => router.route("/", get(root)),
    };

    router
        .layer(build_cors_layer(&state.allowed_origins))
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .with_state(state)
}

async fn root() -> impl IntoResponse {
    Json(serde_json::json!({
        "message": "Cardio Disease Prediction API is running"
    }))
}

async fn health(State(state): State<ApiState>) -> impl IntoResponse {
    let payload = HealthResponse {
        status: "ok",
        timestamp_utc: chrono::Utc::now().to_rfc3339(),
        metrics: state.metrics.snapshot(),
        model: ModelHealth {
            artifacts: state.artifacts.as_ref().clone(),
            feature_set: state.classifier.feature_set(),
            policy: *state.classifier.policy(),
        },
    };
    (StatusCode::OK, Json(payload))
}

/// The body is taken as raw bytes so that oversized bodies and malformed JSON
/// are reported in the same `{"error": ...}` shape as field errors.
#[instrument(skip_all, name = "predict")]
async fn predict(
    State(state): State<ApiState>,
    body: Result<Bytes, BytesRejection>,
) -> Response {
    let started = Instant::now();
    state.metrics.inc_request();

    let outcome = body
        .map_err(ApiError::from)
        .and_then(|body| serde_json::from_slice::<Value>(&body).map_err(ApiError::from))
        .and_then(|payload| {
            state
                .classifier
                .assess_json(&payload)
                .map_err(ApiError::from)
        });
    state.metrics.observe_latency(started.elapsed());

    match outcome {
        Ok(result) => {
            state
                .metrics
                .record_prediction(result.risk.as_str(), result.risk.is_override());
            info!(
                risk = result.risk.as_str(),
                risk_score = result.risk_score,
                bmi = ?result.bmi,
                "prediction served"
            );
            (StatusCode::OK, Json(result)).into_response()
        }
        Err(err) => {
            match &err {
                ApiError::Model(_) => state.metrics.inc_model_error(),
                _ => state.metrics.inc_validation_error(),
            }
            err.into_response()
        }
    }
}

fn build_cors_layer(allowed_origins: &[HeaderValue]) -> CorsLayer {
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed_origins.iter().cloned()))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE])
        .allow_credentials(true)
}
