use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::models::RiskLabel;

/// Cut-offs of the risk decision table.
///
/// None of these carry a clinical derivation; they are deployment settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RiskThresholds {
    pub severe_obesity_bmi: f64,
    pub obesity_bmi: f64,
    pub high_systolic: f64,
    pub high_probability: f64,
    pub moderate_probability: f64,
}

impl Default for RiskThresholds {
    fn default() -> Self {
        Self {
            severe_obesity_bmi: 35.0,
            obesity_bmi: 30.0,
            high_systolic: 140.0,
            high_probability: 0.75,
            moderate_probability: 0.45,
        }
    }
}

impl RiskThresholds {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let values = [
            self.severe_obesity_bmi,
            self.obesity_bmi,
            self.high_systolic,
            self.high_probability,
            self.moderate_probability,
        ];
        if values.iter().any(|value| !value.is_finite()) {
            return Err(ConfigError::Thresholds(
                "all thresholds must be finite".to_string(),
            ));
        }
        for probability in [self.high_probability, self.moderate_probability] {
            if !(0.0..=1.0).contains(&probability) {
                return Err(ConfigError::Thresholds(format!(
                    "probability threshold {probability} is outside [0, 1]"
                )));
            }
        }
        if self.moderate_probability > self.high_probability {
            return Err(ConfigError::Thresholds(format!(
                "moderate probability {} exceeds high probability {}",
                self.moderate_probability, self.high_probability
            )));
        }
        if self.obesity_bmi > self.severe_obesity_bmi {
            return Err(ConfigError::Thresholds(format!(
                "obesity bmi {} exceeds severe obesity bmi {}",
                self.obesity_bmi, self.severe_obesity_bmi
            )));
        }
        Ok(())
    }
}

/// The risk decision table. Rules are evaluated top to bottom and the first
/// match wins:
///
/// 1. BMI >= severe obesity cut-off
/// 2. BMI >= obesity cut-off and systolic >= high systolic cut-off
/// 3. probability >= high probability cut-off
/// 4. probability >= moderate probability cut-off
/// 5. otherwise low risk
///
/// Rules 1 and 2 only run when `bmi_overrides` is enabled and a BMI is known.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RiskPolicy {
    pub thresholds: RiskThresholds,
    pub bmi_overrides: bool,
}

impl Default for RiskPolicy {
    fn default() -> Self {
        Self {
            thresholds: RiskThresholds::default(),
            bmi_overrides: true,
        }
    }
}

impl RiskPolicy {
    pub fn new(thresholds: RiskThresholds, bmi_overrides: bool) -> Self {
        Self {
            thresholds,
            bmi_overrides,
        }
    }

    /// Probability-only table.
    pub fn without_overrides(thresholds: RiskThresholds) -> Self {
        Self::new(thresholds, false)
    }

    pub fn decide(&self, probability: f64, bmi: Option<f64>, systolic: f64) -> RiskLabel {
        let limits = &self.thresholds;

        if let Some(bmi) = bmi.filter(|_| self.bmi_overrides) {
            if bmi >= limits.severe_obesity_bmi {
                return RiskLabel::SevereObesity;
            }
            if bmi >= limits.obesity_bmi && systolic >= limits.high_systolic {
                return RiskLabel::ObesityHighBp;
            }
        }

        if probability >= limits.high_probability {
            RiskLabel::High
        } else if probability >= limits.moderate_probability {
            RiskLabel::Moderate
        } else {
            RiskLabel::Low
        }
    }
}
