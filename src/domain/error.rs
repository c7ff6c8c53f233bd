//! Domain error types.

use chrono::NaiveDate;

/// Top-level error type for riskbal.
#[derive(Debug, thiserror::Error)]
pub enum RiskbalError {
    #[error("portfolio is empty")]
    EmptyPortfolio,

    #[error("duplicate instrument in portfolio: {ticker}")]
    DuplicateInstrument { ticker: String },

    #[error("negative weight {weight} for {ticker}")]
    NegativeWeight { ticker: String, weight: f64 },

    #[error("weights sum to {sum}, expected 1.0 (tolerance {tolerance:e})")]
    WeightSum { sum: f64, tolerance: f64 },

    #[error("end date {end} must be after start date {start}")]
    InvalidDateRange { start: NaiveDate, end: NaiveDate },

    #[error("unparseable date: {value:?}")]
    InvalidDate { value: String },

    #[error("confidence level {value} outside [0, 100]")]
    InvalidConfidence { value: f64 },

    #[error("lookback_days must be positive, got {value}")]
    InvalidLookback { value: usize },

    #[error("adjusted weights sum to {sum}, cannot renormalize")]
    DegenerateWeights { sum: f64 },

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("price source error for {ticker}: {reason}")]
    DataSource { ticker: String, reason: String },

    #[error("no price data for any instrument between {start} and {end}")]
    NoData { start: NaiveDate, end: NaiveDate },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<&RiskbalError> for std::process::ExitCode {
    fn from(err: &RiskbalError) -> Self {
        let code: u8 = match err {
            RiskbalError::Io(_) => 1,
            RiskbalError::ConfigParse { .. }
            | RiskbalError::ConfigMissing { .. }
            | RiskbalError::ConfigInvalid { .. } => 2,
            RiskbalError::EmptyPortfolio
            | RiskbalError::DuplicateInstrument { .. }
            | RiskbalError::NegativeWeight { .. }
            | RiskbalError::WeightSum { .. }
            | RiskbalError::InvalidDateRange { .. }
            | RiskbalError::InvalidDate { .. }
            | RiskbalError::InvalidConfidence { .. }
            | RiskbalError::InvalidLookback { .. }
            | RiskbalError::DegenerateWeights { .. } => 3,
            RiskbalError::DataSource { .. } | RiskbalError::NoData { .. } => 4,
        };
        std::process::ExitCode::from(code)
    }
}
