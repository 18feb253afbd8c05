use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use cardio_api::{build_app, build_router, ApiState};
use cardio_core::{
    Classifier, FeatureSet, ModelError, ProbabilityEstimator, RiskClassifier, RiskModel,
    RiskPolicy,
};
use cardio_ml::{ArtifactSummary, ScalerArtifact, StandardScaler};
use cardio_observability::AppMetrics;
use cardio_tests::{borderline_patient, config, healthy_patient, high_risk_patient};
use serde_json::{json, Value};
use tower::ServiceExt;

fn bmi_app() -> Router {
    build_app(&config("with_bmi", "model.json", &[]).unwrap()).expect("app should build")
}

fn post_json(uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let parsed = serde_json::from_slice(&body).unwrap_or(Value::Null);
    (status, parsed)
}

fn assert_two_decimal_score(body: &Value) {
    let score = body["risk_score"].as_f64().expect("risk_score should be a number");
    assert!((0.0..=1.0).contains(&score));
    assert_eq!((score * 100.0).round() / 100.0, score);
}

#[tokio::test]
async fn root_reports_service_is_running() {
    let request = Request::builder().uri("/").body(Body::empty()).unwrap();
    let (status, body) = send(bmi_app(), request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Cardio Disease Prediction API is running");
}

#[tokio::test]
async fn health_describes_loaded_model() {
    let request = Request::builder().uri("/health").body(Body::empty()).unwrap();
    let (status, body) = send(bmi_app(), request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["model"]["model_kind"], "logistic_regression");
    assert_eq!(body["model"]["feature_set"], "with_bmi");
    assert_eq!(body["model"]["n_features"], 12);
    assert_eq!(body["model"]["policy"]["bmi_overrides"], true);
}

#[tokio::test]
async fn severe_obesity_overrides_model() {
    let (status, body) = send(bmi_app(), post_json("/predict", &high_risk_patient())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["risk"], "HIGH RISK (Severe Obesity)");
    assert_eq!(body["bmi"], 36.0);
    assert_eq!(body["score_kind"], "probability");
    assert_two_decimal_score(&body);
}

#[tokio::test]
async fn healthy_patient_is_low_risk() {
    let (status, body) = send(bmi_app(), post_json("/predict", &healthy_patient())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["risk"], "LOW RISK");
    assert_eq!(body["bmi"], 22.49);
    assert_two_decimal_score(&body);
}

#[tokio::test]
async fn string_encoded_form_values_are_accepted_on_alias_route() {
    let (status, body) = send(bmi_app(), post_json("/api/predict", &borderline_patient())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["risk"], "MODERATE RISK");
    assert_eq!(body["risk_score"], 0.64);
    assert_eq!(body["bmi"], 25.51);
}

#[tokio::test]
async fn missing_age_is_a_client_error() {
    let mut payload = healthy_patient();
    payload.as_object_mut().unwrap().remove("age");
    let (status, body) = send(bmi_app(), post_json("/predict", &payload)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("age"));
}

#[tokio::test]
async fn malformed_json_is_a_client_error() {
    let request = Request::builder()
        .method("POST")
        .uri("/predict")
        .header("content-type", "application/json")
        .body(Body::from("{\"gender\": 1,"))
        .unwrap();
    let (status, body) = send(bmi_app(), request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("JSON"));
}

#[tokio::test]
async fn oversized_body_is_rejected_as_json() {
    let padding = "x".repeat(70 * 1024);
    let mut payload = healthy_patient();
    payload["note"] = json!(padding);
    let (status, body) = send(bmi_app(), post_json("/predict", &payload)).await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert!(body["error"].as_str().unwrap().contains("request body"));
}

#[tokio::test]
async fn degenerate_height_is_a_client_error() {
    let mut payload = healthy_patient();
    payload["height"] = json!(1e-160);
    let (status, body) = send(bmi_app(), post_json("/predict", &payload)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("non-finite BMI"));
}

#[tokio::test]
async fn health_counts_predictions_and_rejections() {
    let app = bmi_app();
    let (status, _) = send(app.clone(), post_json("/predict", &high_risk_patient())).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = send(app.clone(), post_json("/predict", &json!({"gender": 1}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let request = Request::builder().uri("/health").body(Body::empty()).unwrap();
    let (_, body) = send(app, request).await;
    assert_eq!(body["metrics"]["requests_total"], 2);
    assert_eq!(body["metrics"]["predictions_total"], 1);
    assert_eq!(body["metrics"]["override_total"], 1);
    assert_eq!(body["metrics"]["validation_errors_total"], 1);
}

#[tokio::test]
async fn three_tier_revision_uses_probability_only() {
    let config = config(
        "base",
        "model.json",
        &[("CARDIO_FEATURE_SET", "base"), ("CARDIO_BMI_OVERRIDES", "false")],
    )
    .unwrap();
    let app = build_app(&config).expect("base app should build");

    let (status, body) = send(app.clone(), post_json("/predict", &high_risk_patient())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["risk"], "HIGH RISK");
    assert_eq!(body["risk_score"], 0.77);
    assert!(body.get("bmi").is_none());

    let (_, body) = send(app, post_json("/predict", &healthy_patient())).await;
    assert_eq!(body["risk"], "LOW RISK");
}

#[tokio::test]
async fn base_features_can_still_apply_bmi_overrides() {
    let config = config("base", "model.json", &[("CARDIO_FEATURE_SET", "base")]).unwrap();
    let app = build_app(&config).expect("base app should build");
    let (_, body) = send(app, post_json("/predict", &high_risk_patient())).await;
    assert_eq!(body["risk"], "HIGH RISK (Severe Obesity)");
    assert_eq!(body["bmi"], 36.0);
}

#[tokio::test]
async fn class_only_model_reports_predicted_class() {
    let config = config(
        "base",
        "linear_svc.json",
        &[("CARDIO_FEATURE_SET", "base"), ("CARDIO_BMI_OVERRIDES", "0")],
    )
    .unwrap();
    let app = build_app(&config).expect("svc app should build");

    let (_, body) = send(app.clone(), post_json("/predict", &healthy_patient())).await;
    assert_eq!(body["risk"], "LOW RISK");
    assert_eq!(body["risk_score"], 0.0);
    assert_eq!(body["score_kind"], "predicted_class");

    let (_, body) = send(app, post_json("/predict", &high_risk_patient())).await;
    assert_eq!(body["risk"], "HIGH RISK");
    assert_eq!(body["risk_score"], 1.0);
}

#[tokio::test]
async fn bmi_layout_with_base_artifacts_refuses_to_start() {
    let config = config("base", "model.json", &[("CARDIO_FEATURE_SET", "with_bmi")]).unwrap();
    let err = build_app(&config).err().expect("mismatched artifacts must not start");
    assert!(format!("{err:#}").contains("12 columns"));
}

#[tokio::test]
async fn missing_artifacts_refuse_to_start() {
    let mut config = config("with_bmi", "model.json", &[]).unwrap();
    config.artifacts.model = config.artifacts.model.with_file_name("absent.json");
    assert!(build_app(&config).is_err());
}

#[tokio::test]
async fn malformed_allowed_origin_refuses_to_start() {
    let err = config(
        "with_bmi",
        "model.json",
        &[("CARDIO_ALLOWED_ORIGINS", "http://localhost:3000,localhost:5173")],
    )
    .err()
    .expect("origin without scheme must be rejected");
    assert!(err.to_string().contains("localhost:5173"));
}

#[tokio::test]
async fn cors_preflight_allows_frontend_origin() {
    let request = Request::builder()
        .method("OPTIONS")
        .uri("/predict")
        .header("origin", "http://localhost:3000")
        .header("access-control-request-method", "POST")
        .header("access-control-request-headers", "content-type")
        .body(Body::empty())
        .unwrap();
    let response = bmi_app().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response
            .headers()
            .get("access-control-allow-origin")
            .and_then(|value| value.to_str().ok()),
        Some("http://localhost:3000")
    );
}

#[tokio::test]
async fn static_frontend_is_served_with_spa_fallback() {
    let dir = std::env::temp_dir().join(format!("cardio-static-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join("index.html"), "<html>cardio frontend</html>").unwrap();

    let dir_value = dir.display().to_string();
    let config = config("with_bmi", "model.json", &[("CARDIO_STATIC_DIR", dir_value.as_str())]).unwrap();
    let app = build_app(&config).expect("app with static dir should build");

    let request = Request::builder().uri("/predict-page").body(Body::empty()).unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert!(String::from_utf8_lossy(&body).contains("cardio frontend"));

    let (status, body) = send(app, post_json("/predict", &healthy_patient())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["risk"], "LOW RISK");

    std::fs::remove_dir_all(&dir).ok();
}

struct FailingModel;

impl Classifier for FailingModel {
    fn n_features_in(&self) -> usize {
        12
    }

    fn classes(&self) -> &[i64] {
        &[0, 1]
    }

    fn predict(&self, _features: &[f64]) -> Result<i64, ModelError> {
        Err(ModelError::InvalidOutput("no decision".to_string()))
    }
}

impl ProbabilityEstimator for FailingModel {
    fn predict_proba(&self, _features: &[f64]) -> Result<Vec<f64>, ModelError> {
        Err(ModelError::InvalidOutput("NaN probabilities".to_string()))
    }
}

#[tokio::test]
async fn model_failures_are_server_errors() {
    let scaler = ScalerArtifact::StandardScaler(StandardScaler {
        feature_names: None,
        mean: vec![0.0; 12],
        scale: vec![1.0; 12],
    });
    let classifier = RiskClassifier::new(
        Arc::new(scaler),
        RiskModel::Probabilistic(Arc::new(FailingModel)),
        FeatureSet::WithBmi,
        RiskPolicy::default(),
    )
    .unwrap();
    let state = ApiState {
        classifier: Arc::new(classifier),
        metrics: AppMetrics::shared(),
        artifacts: Arc::new(ArtifactSummary {
            scaler_kind: "standard_scaler",
            model_kind: "failing",
            probabilistic: true,
            n_features: 12,
            classes: vec![0, 1],
            feature_names: None,
        }),
        allowed_origins: Arc::new(Vec::new()),
    };
    let app = build_router(state.clone(), None);

    let (status, body) = send(app, post_json("/predict", &healthy_patient())).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["error"].as_str().unwrap().contains("NaN probabilities"));
    assert_eq!(state.metrics.snapshot().model_errors_total, 1);
}
