//! Forecast-specific error types.

use thiserror::Error;

/// A single resort fetch failed.
///
/// These never cross a load batch boundary: the engine logs them, retries
/// foreground loads once, and otherwise leaves the resort out of the cache.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Forecast source returned status {status} for {resort}")]
    Status { resort: String, status: u16 },

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Unknown resort: {0}")]
    UnknownResort(String),

    #[error("Invalid source URL: {0}")]
    InvalidUrl(String),
}

impl FetchError {
    /// User-friendly error message for UI display.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::Network(_) => "Network error. Check your connection.",
            Self::Status { status, .. } if *status >= 500 => {
                "The forecast source is having issues. Please try again later."
            }
            Self::Status { .. } => "The forecast request was rejected.",
            Self::Parse(_) => "Received a forecast we could not read.",
            Self::UnknownResort(_) => "That resort has no forecast.",
            Self::InvalidUrl(_) => "The forecast source address is invalid. Check settings.",
        }
    }

    /// Whether a second attempt has any chance of succeeding.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Network(_) => true,
            Self::Status { status, .. } => *status >= 500 || *status == 429 || *status == 408,
            Self::Parse(_) | Self::UnknownResort(_) | Self::InvalidUrl(_) => false,
        }
    }
}

/// A stored preference value could not be turned into a typed selector.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid {kind}: {value}")]
pub struct ParseSelectorError {
    pub kind: &'static str,
    pub value: String,
}

impl ParseSelectorError {
    pub fn new(kind: &'static str, value: impl Into<String>) -> Self {
        Self {
            kind,
            value: value.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_user_messages() {
        let err = FetchError::Status {
            resort: "Apex".into(),
            status: 503,
        };
        assert!(err.user_message().contains("try again later"));

        let err = FetchError::Status {
            resort: "Apex".into(),
            status: 404,
        };
        assert!(err.user_message().contains("rejected"));
    }

    #[test]
    fn test_is_transient() {
        assert!(FetchError::Status {
            resort: "Apex".into(),
            status: 502
        }
        .is_transient());
        assert!(!FetchError::Parse("bad".into()).is_transient());
        assert!(!FetchError::UnknownResort("Nowhere".into()).is_transient());
    }

    #[test]
    fn test_parse_selector_error_display() {
        let err = ParseSelectorError::new("elevation band", "summit");
        assert_eq!(err.to_string(), "Invalid elevation band: summit");
    }
}
