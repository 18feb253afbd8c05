use serde::{Deserialize, Serialize};

use crate::models::PredictionRequest;

const BASE_COLUMNS: [&str; 11] = [
    "gender",
    "height",
    "weight",
    "ap_hi",
    "ap_lo",
    "cholesterol",
    "gluc",
    "smoke",
    "alco",
    "active",
    "age_years",
];

const WITH_BMI_COLUMNS: [&str; 12] = [
    "gender",
    "height",
    "weight",
    "ap_hi",
    "ap_lo",
    "cholesterol",
    "gluc",
    "smoke",
    "alco",
    "active",
    "age_years",
    "bmi",
];

/// Column layout the scaler and model were fitted on.
///
/// The order here is the training order. Reordering columns does not fail,
/// it silently corrupts predictions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureSet {
    Base,
    WithBmi,
}

impl FeatureSet {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "base" | "without_bmi" | "no_bmi" => Some(Self::Base),
            "with_bmi" | "bmi" => Some(Self::WithBmi),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Base => "base",
            Self::WithBmi => "with_bmi",
        }
    }

    pub fn columns(self) -> &'static [&'static str] {
        match self {
            Self::Base => &BASE_COLUMNS,
            Self::WithBmi => &WITH_BMI_COLUMNS,
        }
    }

    pub fn width(self) -> usize {
        self.columns().len()
    }

    pub fn includes_bmi(self) -> bool {
        matches!(self, Self::WithBmi)
    }

    /// Builds the ordered model input. `bmi` is required for `WithBmi`;
    /// the caller computes it before assembling.
    pub fn assemble(self, request: &PredictionRequest, bmi: Option<f64>) -> Vec<f64> {
        let mut vector = vec![
            request.gender as f64,
            request.height,
            request.weight,
            request.ap_hi,
            request.ap_lo,
            request.cholesterol as f64,
            request.gluc as f64,
            request.smoke as f64,
            request.alco as f64,
            request.active as f64,
            request.age_years,
        ];
        if self.includes_bmi() {
            vector.push(bmi.unwrap_or_else(|| body_mass_index(request.height, request.weight)));
        }
        vector
    }
}

/// `weight / (height/100)^2`, rounded to 2 decimals.
pub fn body_mass_index(height_cm: f64, weight_kg: f64) -> f64 {
    let height_m = height_cm / 100.0;
    round2(weight_kg / (height_m * height_m))
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
