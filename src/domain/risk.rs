//! Value-at-Risk and Conditional VaR estimators.
//!
//! Both estimators work on the daily portfolio return series, the weighted
//! sum of per-instrument returns. Results are returns, so a loss is negative
//! and CVaR sits at or below VaR.
//!
//! Known boundary behaviour: too few observations, an empty table or a
//! zero-variance portfolio produce NaN or infinite figures. These are not
//! detected here and flow straight into the report.

use statrs::distribution::{Continuous, ContinuousCDF, Normal};
use tracing::warn;

use crate::domain::error::RiskbalError;
use crate::domain::portfolio::Portfolio;
use crate::domain::prices::ReturnTable;
use crate::domain::stats::{covariance_matrix, mean, quadratic_form, quantile};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VarMethod {
    Historical,
    Parametric,
}

impl VarMethod {
    pub fn label(&self) -> &'static str {
        match self {
            VarMethod::Historical => "Historical",
            VarMethod::Parametric => "Parametric",
        }
    }
}

impl std::str::FromStr for VarMethod {
    type Err = RiskbalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "historical" | "hist" => Ok(VarMethod::Historical),
            "parametric" | "normal" => Ok(VarMethod::Parametric),
            other => Err(RiskbalError::ConfigInvalid {
                section: "risk".into(),
                key: "method".into(),
                reason: format!("unknown method {other:?}, expected historical or parametric"),
            }),
        }
    }
}

/// Confidence level in percent, checked to lie in [0, 100].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Confidence(f64);

impl Confidence {
    pub fn new(pct: f64) -> Result<Self, RiskbalError> {
        if !(0.0..=100.0).contains(&pct) {
            return Err(RiskbalError::InvalidConfidence { value: pct });
        }
        Ok(Confidence(pct))
    }

    pub fn pct(&self) -> f64 {
        self.0
    }

    /// Tail probability `1 - p / 100`.
    pub fn tail(&self) -> f64 {
        1.0 - self.0 / 100.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RiskEstimate {
    pub method: VarMethod,
    pub var: f64,
    pub cvar: f64,
}

impl RiskEstimate {
    /// VaR and CVaR as percentage strings with two decimals, e.g. `"-1.87%"`.
    pub fn as_percent_strings(&self) -> [String; 2] {
        [format_pct(self.var), format_pct(self.cvar)]
    }
}

pub fn format_pct(value: f64) -> String {
    format!("{:.2}%", value * 100.0)
}

/// Historical VaR is the empirical tail quantile of the portfolio returns;
/// CVaR is the mean of the observations strictly below it.
pub fn historical_var(
    portfolio: &Portfolio,
    returns: &ReturnTable,
    confidence: Confidence,
) -> RiskEstimate {
    let values = returns.weighted(&portfolio_weights(portfolio, returns));
    let var = quantile(&values, confidence.tail());
    let tail: Vec<f64> = values.iter().copied().filter(|v| *v < var).collect();
    let cvar = mean(&tail);

    RiskEstimate {
        method: VarMethod::Historical,
        var,
        cvar,
    }
}

/// Parametric VaR/CVaR under a normal assumption. The standard deviation
/// comes from the weighted covariance matrix of instrument returns.
pub fn parametric_var(
    portfolio: &Portfolio,
    returns: &ReturnTable,
    confidence: Confidence,
) -> RiskEstimate {
    let weights = portfolio_weights(portfolio, returns);
    let values = returns.weighted(&weights);
    let mu = mean(&values);
    let sigma = quadratic_form(&weights, &covariance_matrix(&returns.returns)).sqrt();

    let alpha = confidence.tail();
    let standard = Normal::standard();
    let z = standard.inverse_cdf(alpha);
    let var = mu + sigma * z;
    let cvar = mu - sigma * standard.pdf(z) / alpha;

    RiskEstimate {
        method: VarMethod::Parametric,
        var,
        cvar,
    }
}

pub fn estimate(
    method: VarMethod,
    portfolio: &Portfolio,
    returns: &ReturnTable,
    confidence: Confidence,
) -> RiskEstimate {
    match method {
        VarMethod::Historical => historical_var(portfolio, returns, confidence),
        VarMethod::Parametric => parametric_var(portfolio, returns, confidence),
    }
}

/// Active weights aligned to the return table. Instruments without data are
/// dropped without renormalizing the rest.
fn portfolio_weights(portfolio: &Portfolio, returns: &ReturnTable) -> Vec<f64> {
    let missing: Vec<&str> = portfolio
        .tickers()
        .filter(|t| !returns.tickers.iter().any(|r| r == t))
        .collect();
    if !missing.is_empty() {
        warn!(?missing, "weights of instruments without data are dropped");
    }
    portfolio.weights_for(&returns.tickers)
}
