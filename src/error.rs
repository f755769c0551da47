//! Error types for the risk engine.

use thiserror::Error;

/// Main error type for estimation and backtesting.
#[derive(Error, Debug)]
pub enum RiskError {
    #[error("Invalid weights: {0}")]
    InvalidWeights(String),

    #[error("Insufficient sample: required at least {required} observations, got {actual}")]
    InsufficientSample { required: usize, actual: usize },

    #[error("Degenerate statistic in {test}: {reason}")]
    DegenerateStatistic { test: &'static str, reason: String },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    #[error("Data error: {0}")]
    DataError(String),

    #[error("CSV parsing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Date parsing error: {0}")]
    DateParseError(#[from] chrono::ParseError),

    #[error("JSON serialization error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),
}

impl RiskError {
    /// Shorthand for an [`RiskError::InsufficientSample`].
    pub fn insufficient(required: usize, actual: usize) -> Self {
        RiskError::InsufficientSample { required, actual }
    }

    /// Shorthand for a [`RiskError::DegenerateStatistic`].
    pub fn degenerate(test: &'static str, reason: impl Into<String>) -> Self {
        RiskError::DegenerateStatistic {
            test,
            reason: reason.into(),
        }
    }
}

/// Result type alias for risk operations.
pub type Result<T> = std::result::Result<T, RiskError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = RiskError::insufficient(250, 10);
        assert_eq!(
            err.to_string(),
            "Insufficient sample: required at least 250 observations, got 10"
        );

        let err = RiskError::degenerate("kupiec", "empty violation series");
        assert!(err.to_string().contains("kupiec"));
        assert!(err.to_string().contains("empty violation series"));
    }
}
