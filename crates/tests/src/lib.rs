//! Shared fixtures for the end-to-end tests.

use std::collections::HashMap;
use std::path::PathBuf;

use anyhow::Result;
use cardio_api::ServiceConfig;
use serde_json::{json, Value};

pub fn artifacts_root() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../artifacts")
}

/// Service config pointing at the bundled artifacts under `artifacts/<set>/`,
/// with `overrides` applied as if they were environment variables.
pub fn config(set: &str, model_file: &str, overrides: &[(&str, &str)]) -> Result<ServiceConfig> {
    let root = artifacts_root().join(set);
    let mut vars: HashMap<String, String> = HashMap::from([
        (
            "CARDIO_MODEL_PATH".to_string(),
            root.join(model_file).display().to_string(),
        ),
        (
            "CARDIO_SCALER_PATH".to_string(),
            root.join("scaler.json").display().to_string(),
        ),
    ]);
    for (key, value) in overrides {
        vars.insert(key.to_string(), value.to_string());
    }
    ServiceConfig::from_lookup(|key| vars.get(key).cloned())
}

/// Young, normotensive, normal weight.
pub fn healthy_patient() -> Value {
    json!({
        "gender": 1, "height": 170, "weight": 65, "ap_hi": 110, "ap_lo": 70,
        "cholesterol": 1, "gluc": 1, "smoke": 0, "alco": 0, "active": 1, "age": 30
    })
}

/// BMI 36 with stage 2 hypertension and every lifestyle flag set.
pub fn high_risk_patient() -> Value {
    json!({
        "gender": 2, "height": 165, "weight": 98, "ap_hi": 170, "ap_lo": 110,
        "cholesterol": 3, "gluc": 3, "smoke": 1, "alco": 1, "active": 0, "age": 55
    })
}

/// Overweight but below the obesity cut-off, borderline blood pressure.
pub fn borderline_patient() -> Value {
    json!({
        "gender": "2", "height": "168", "weight": "72", "ap_hi": "135", "ap_lo": "85",
        "cholesterol": "2", "gluc": "1", "smoke": "0", "alco": "0", "active": "1", "age": "52"
    })
}
