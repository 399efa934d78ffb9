use validator::Validate;

use crate::error::AppError;

/// Runs the derived `validator` rules for a submitted form and converts any
/// failure into an `AppError::Validation`.
pub trait FormValidateExt {
    fn validate_form(&self) -> Result<(), AppError>;
}

impl<T: Validate> FormValidateExt for T {
    fn validate_form(&self) -> Result<(), AppError> {
        self.validate().map_err(AppError::from)
    }
}

/// Parses a submitted score or rating. Range is not enforced.
pub fn parse_score(field: &str, raw: &str) -> Result<f64, AppError> {
    let trimmed = raw.trim();
    match trimmed.parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(value),
        _ => Err(AppError::Validation(format!(
            "{} must be a number, got '{}'",
            field, trimmed
        ))),
    }
}

pub fn parse_optional_number(field: &str, raw: Option<&str>) -> Result<Option<f64>, AppError> {
    match blank_to_none(raw) {
        Some(value) => parse_score(field, value).map(Some),
        None => Ok(None),
    }
}

pub fn blank_to_none(raw: Option<&str>) -> Option<&str> {
    raw.map(str::trim).filter(|value| !value.is_empty())
}
