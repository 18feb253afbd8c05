use serde::{Deserialize, Serialize};

/// Patient measurements accepted by the prediction endpoint.
///
/// Categorical fields keep their integer encoding from the training data
/// (`gender` 1=female/2=male, `cholesterol`/`gluc` 1..=3, the lifestyle
/// flags 0/1).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredictionRequest {
    pub gender: i64,
    pub height: f64,
    pub weight: f64,
    pub ap_hi: f64,
    pub ap_lo: f64,
    pub cholesterol: i64,
    pub gluc: i64,
    pub smoke: i64,
    pub alco: i64,
    pub active: i64,
    #[serde(rename = "age")]
    pub age_years: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RiskLabel {
    #[serde(rename = "HIGH RISK (Severe Obesity)")]
    SevereObesity,
    #[serde(rename = "HIGH RISK (Obesity + High BP)")]
    ObesityHighBp,
    #[serde(rename = "HIGH RISK")]
    High,
    #[serde(rename = "MODERATE RISK")]
    Moderate,
    #[serde(rename = "LOW RISK")]
    Low,
}

impl RiskLabel {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::SevereObesity => "HIGH RISK (Severe Obesity)",
            Self::ObesityHighBp => "HIGH RISK (Obesity + High BP)",
            Self::High => "HIGH RISK",
            Self::Moderate => "MODERATE RISK",
            Self::Low => "LOW RISK",
        }
    }

    /// True for the two labels produced by the BMI override rules.
    pub fn is_override(self) -> bool {
        matches!(self, Self::SevereObesity | Self::ObesityHighBp)
    }
}

impl std::fmt::Display for RiskLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where `risk_score` came from.
///
/// `PredictedClass` means the model cannot estimate probabilities and the
/// score is the predicted class cast to 0.0 or 1.0. It is not a probability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreKind {
    Probability,
    PredictedClass,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    pub risk: RiskLabel,
    pub risk_score: f64,
    pub score_kind: ScoreKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bmi: Option<f64>,
}

/// Every intermediate step of one assessment, for diagnostics.
#[derive(Debug, Clone, Serialize)]
pub struct Evaluation {
    pub features: Vec<f64>,
    pub scaled: Vec<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub class_probabilities: Option<Vec<f64>>,
    pub raw_score: f64,
    pub result: PredictionResult,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_serialize_as_display_strings() {
        for label in [
            RiskLabel::SevereObesity,
            RiskLabel::ObesityHighBp,
            RiskLabel::High,
            RiskLabel::Moderate,
            RiskLabel::Low,
        ] {
            let json = serde_json::to_value(label).unwrap();
            assert_eq!(json, serde_json::Value::String(label.to_string()));
        }
    }

    #[test]
    fn bmi_is_omitted_when_not_computed() {
        let result = PredictionResult {
            risk: RiskLabel::Low,
            risk_score: 0.12,
            score_kind: ScoreKind::Probability,
            bmi: None,
        };
        let json = serde_json::to_value(&result).unwrap();
        assert!(json.get("bmi").is_none());
        assert_eq!(json["score_kind"], "probability");
        assert_eq!(json["risk"], "LOW RISK");
    }
}
