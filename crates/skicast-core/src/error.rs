//! Centralized error types for SkiCast.
//!
//! Each error carries a `user_message()` for display, while `Display` keeps
//! the full context for logs.

use skicast_forecast::{FetchError, ParseSelectorError};
use thiserror::Error;

/// Top-level application error type.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Forecast error: {0}")]
    Forecast(#[from] ForecastError),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl AppError {
    /// Returns a user-friendly message suitable for display.
    pub fn user_message(&self) -> &'static str {
        match self {
            AppError::Config(e) => e.user_message(),
            AppError::Forecast(e) => e.user_message(),
            AppError::Other(e) => match e.downcast_ref::<ConfigError>() {
                Some(config) => config.user_message(),
                None => "An unexpected error occurred. Please try again.",
            },
        }
    }
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Configuration parse error: {0}")]
    ParseError(String),

    #[error("Invalid preference: {0}")]
    Preference(#[from] ParseSelectorError),
}

impl ConfigError {
    pub fn user_message(&self) -> &'static str {
        match self {
            ConfigError::Invalid(_) => "Invalid configuration. Check your settings.",
            ConfigError::ParseError(_) => "Configuration file is malformed. Check your settings.",
            ConfigError::Preference(_) => "A saved preference is invalid. Check your settings.",
        }
    }
}

/// Forecast loading errors that reach the user.
#[derive(Debug, Error)]
pub enum ForecastError {
    /// The first load failed for every selected resort.
    #[error("No forecast data could be loaded for any selected resort")]
    AllDataUnavailable,

    #[error("Forecast source error: {0}")]
    Source(#[from] FetchError),
}

impl ForecastError {
    pub fn user_message(&self) -> &'static str {
        match self {
            ForecastError::AllDataUnavailable => {
                "Failed to load weather data. Please try again later."
            }
            ForecastError::Source(e) => e.user_message(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_error_conversion() {
        let app_err: AppError = ForecastError::AllDataUnavailable.into();
        assert!(matches!(
            app_err,
            AppError::Forecast(ForecastError::AllDataUnavailable)
        ));
    }

    #[test]
    fn test_user_message_propagation() {
        let app_err = AppError::Forecast(ForecastError::AllDataUnavailable);
        assert_eq!(
            app_err.user_message(),
            "Failed to load weather data. Please try again later."
        );

        let app_err = AppError::Forecast(ForecastError::Source(FetchError::UnknownResort(
            "Atlantis".into(),
        )));
        assert_eq!(app_err.user_message(), "That resort has no forecast.");
    }

    #[test]
    fn test_config_error_inside_anyhow() {
        let err: anyhow::Error = ConfigError::Invalid("source.base_url: bad".into()).into();
        let app_err = AppError::from(err);
        assert_eq!(
            app_err.user_message(),
            "Invalid configuration. Check your settings."
        );
    }

    #[test]
    fn test_preference_error_message() {
        let err = ConfigError::from(ParseSelectorError::new("sort criterion", "depth"));
        assert_eq!(err.to_string(), "Invalid preference: Invalid sort criterion: depth");
    }
}
