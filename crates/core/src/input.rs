use serde_json::{Map, Value};

use crate::error::ValidationError;
use crate::models::PredictionRequest;

impl PredictionRequest {
    /// Parses and coerces a JSON payload.
    ///
    /// Numbers and numeric strings are accepted for every field. Integer
    /// fields must be integral; nothing is silently truncated or defaulted.
    pub fn from_json(payload: &Value) -> Result<Self, ValidationError> {
        let object = payload.as_object().ok_or(ValidationError::NotAnObject)?;

        let request = Self {
            gender: int_field(object, "gender")?,
            height: float_field(object, "height")?,
            weight: float_field(object, "weight")?,
            ap_hi: float_field(object, "ap_hi")?,
            ap_lo: float_field(object, "ap_lo")?,
            cholesterol: int_field(object, "cholesterol")?,
            gluc: int_field(object, "gluc")?,
            smoke: int_field(object, "smoke")?,
            alco: int_field(object, "alco")?,
            active: int_field(object, "active")?,
            age_years: age_field(object)?,
        };
        request.check_domains()?;
        Ok(request)
    }

    fn check_domains(&self) -> Result<(), ValidationError> {
        one_of("gender", self.gender, &[1, 2])?;
        one_of("cholesterol", self.cholesterol, &[1, 2, 3])?;
        one_of("gluc", self.gluc, &[1, 2, 3])?;
        one_of("smoke", self.smoke, &[0, 1])?;
        one_of("alco", self.alco, &[0, 1])?;
        one_of("active", self.active, &[0, 1])?;
        positive("height", self.height)?;
        positive("weight", self.weight)?;
        Ok(())
    }
}

fn age_field(object: &Map<String, Value>) -> Result<f64, ValidationError> {
    match object.get("age").or_else(|| object.get("age_years")) {
        Some(value) => coerce_float("age", value),
        None => Err(ValidationError::MissingField("age")),
    }
}

fn float_field(object: &Map<String, Value>, field: &'static str) -> Result<f64, ValidationError> {
    let value = object
        .get(field)
        .ok_or(ValidationError::MissingField(field))?;
    coerce_float(field, value)
}

fn int_field(object: &Map<String, Value>, field: &'static str) -> Result<i64, ValidationError> {
    let value = object
        .get(field)
        .ok_or(ValidationError::MissingField(field))?;
    if let Some(int) = value.as_i64() {
        return Ok(int);
    }

    let number = coerce_float(field, value)?;
    if number.fract() != 0.0 || number.abs() > i64::MAX as f64 {
        return Err(ValidationError::InvalidField {
            field,
            reason: format!("must be an integer, got {number}"),
        });
    }
    Ok(number as i64)
}

fn coerce_float(field: &'static str, value: &Value) -> Result<f64, ValidationError> {
    let number = match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse::<f64>().ok(),
        _ => None,
    };

    match number {
        Some(number) if number.is_finite() => Ok(number),
        Some(_) => Err(ValidationError::InvalidField {
            field,
            reason: "must be a finite number".to_string(),
        }),
        None => Err(ValidationError::InvalidField {
            field,
            reason: format!("is not numeric: {value}"),
        }),
    }
}

fn one_of(field: &'static str, value: i64, allowed: &[i64]) -> Result<(), ValidationError> {
    if allowed.contains(&value) {
        Ok(())
    } else {
        Err(ValidationError::OutOfRange {
            field,
            reason: format!("{value} is not one of {allowed:?}"),
        })
    }
}

fn positive(field: &'static str, value: f64) -> Result<(), ValidationError> {
    if value > 0.0 {
        Ok(())
    } else {
        Err(ValidationError::OutOfRange {
            field,
            reason: format!("{value} must be greater than zero"),
        })
    }
}
