use thiserror::Error;

/// Raised once at construction when a tunable breaks a precondition.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    #[error("{field} must be greater than zero (got {value:.3})")]
    NonPositive { field: &'static str, value: f32 },

    #[error("{field} must be between {min:.3} and {max:.3} (got {value:.3})")]
    OutOfRange {
        field: &'static str,
        min: f32,
        max: f32,
        value: f32,
    },

    #[error("{field} range is inverted (min {min:.3} > max {max:.3})")]
    InvertedRange {
        field: &'static str,
        min: f32,
        max: f32,
    },

    #[error("{field} must be finite")]
    NotFinite { field: &'static str },
}

/// Fails unless `value > 0`.
pub(crate) fn positive(field: &'static str, value: f32) -> Result<(), ConfigError> {
    finite(field, value)?;
    if value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::NonPositive { field, value })
    }
}

/// Fails unless `min <= value <= max`.
pub(crate) fn within(field: &'static str, value: f32, min: f32, max: f32) -> Result<(), ConfigError> {
    finite(field, value)?;
    if (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange { field, min, max, value })
    }
}

pub(crate) fn non_negative(field: &'static str, value: f32) -> Result<(), ConfigError> {
    within(field, value, 0.0, f32::MAX)
}

pub(crate) fn finite(field: &'static str, value: f32) -> Result<(), ConfigError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(ConfigError::NotFinite { field })
    }
}
