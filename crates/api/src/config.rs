use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{anyhow, bail, Context, Result};
use axum::http::HeaderValue;
use cardio_core::{FeatureSet, RiskPolicy, RiskThresholds};
use cardio_ml::{ArtifactPaths, DEFAULT_MODEL_PATH, DEFAULT_SCALER_PATH};

const DEFAULT_BIND: &str = "0.0.0.0:5000";
const DEFAULT_ORIGINS: [&str; 2] = ["http://localhost:3000", "http://127.0.0.1:3000"];

/// Process configuration, read once at startup.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub bind: String,
    pub artifacts: ArtifactPaths,
    pub feature_set: FeatureSet,
    pub policy: RiskPolicy,
    pub allowed_origins: Vec<HeaderValue>,
    pub static_dir: Option<PathBuf>,
}

impl ServiceConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from any key lookup. Absent keys fall back to
    /// defaults; present but malformed values are errors.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let value = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let feature_set = match value("CARDIO_FEATURE_SET") {
            Some(raw) => FeatureSet::parse(&raw)
                .ok_or_else(|| anyhow!("CARDIO_FEATURE_SET must be 'base' or 'with_bmi', got '{raw}'"))?,
            None => FeatureSet::WithBmi,
        };

        let defaults = RiskThresholds::default();
        let thresholds = RiskThresholds {
            severe_obesity_bmi: parse_or(
                value("CARDIO_SEVERE_OBESITY_BMI"),
                "CARDIO_SEVERE_OBESITY_BMI",
                defaults.severe_obesity_bmi,
            )?,
            obesity_bmi: parse_or(value("CARDIO_OBESITY_BMI"), "CARDIO_OBESITY_BMI", defaults.obesity_bmi)?,
            high_systolic: parse_or(
                value("CARDIO_HIGH_SYSTOLIC"),
                "CARDIO_HIGH_SYSTOLIC",
                defaults.high_systolic,
            )?,
            high_probability: parse_or(
                value("CARDIO_HIGH_PROBABILITY"),
                "CARDIO_HIGH_PROBABILITY",
                defaults.high_probability,
            )?,
            moderate_probability: parse_or(
                value("CARDIO_MODERATE_PROBABILITY"),
                "CARDIO_MODERATE_PROBABILITY",
                defaults.moderate_probability,
            )?,
        };
        thresholds.validate().context("invalid CARDIO_* threshold settings")?;

        let bmi_overrides = match value("CARDIO_BMI_OVERRIDES") {
            Some(raw) => parse_flag(&raw)
                .ok_or_else(|| anyhow!("CARDIO_BMI_OVERRIDES must be a boolean, got '{raw}'"))?,
            None => true,
        };

        let allowed_origins = match value("CARDIO_ALLOWED_ORIGINS") {
            Some(raw) => parse_origins(&raw)?,
            None => DEFAULT_ORIGINS.into_iter().map(HeaderValue::from_static).collect(),
        };

        Ok(Self {
            bind: value("CARDIO_BIND").unwrap_or_else(|| DEFAULT_BIND.to_string()),
            artifacts: ArtifactPaths::new(
                value("CARDIO_MODEL_PATH").unwrap_or_else(|| DEFAULT_MODEL_PATH.to_string()),
                value("CARDIO_SCALER_PATH").unwrap_or_else(|| DEFAULT_SCALER_PATH.to_string()),
            ),
            feature_set,
            policy: RiskPolicy::new(thresholds, bmi_overrides),
            allowed_origins,
            static_dir: value("CARDIO_STATIC_DIR").map(PathBuf::from),
        })
    }
}

fn parse_or<T>(raw: Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match raw {
        Some(raw) => raw
            .parse::<T>()
            .with_context(|| format!("{key} has invalid value '{raw}'")),
        None => Ok(default),
    }
}

/// Comma-separated `scheme://host[:port]` origins. Every entry must be usable
/// as an `Access-Control-Allow-Origin` value.
fn parse_origins(raw: &str) -> Result<Vec<HeaderValue>> {
    let mut origins = Vec::new();
    for origin in raw.split(',').map(str::trim).filter(|origin| !origin.is_empty()) {
        let origin = origin.trim_end_matches('/');
        let host = origin
            .strip_prefix("https://")
            .or_else(|| origin.strip_prefix("http://"))
            .ok_or_else(|| anyhow!("CARDIO_ALLOWED_ORIGINS entry '{origin}' must start with http:// or https://"))?;
        if host.is_empty() || host.contains(['/', ' ', '\t']) {
            bail!("CARDIO_ALLOWED_ORIGINS entry '{origin}' is not a bare origin");
        }
        let header = HeaderValue::from_str(origin)
            .with_context(|| format!("CARDIO_ALLOWED_ORIGINS entry '{origin}' is not a valid header value"))?;
        origins.push(header);
    }
    if origins.is_empty() {
        bail!("CARDIO_ALLOWED_ORIGINS is set but lists no origins");
    }
    Ok(origins)
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
