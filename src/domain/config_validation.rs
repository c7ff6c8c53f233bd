//! Configuration validation.
//!
//! Validates every config field before any data is fetched.

use crate::domain::dates::parse_date;
use crate::domain::error::RiskbalError;
use crate::domain::portfolio::{Holding, Portfolio};
use crate::domain::risk::VarMethod;
use crate::ports::config_port::ConfigPort;

pub fn validate_portfolio_config(config: &dyn ConfigPort) -> Result<(), RiskbalError> {
    let holdings = required(config, "portfolio", "holdings")?;
    Portfolio::new(parse_holdings(&holdings)?)?;
    validate_dates(config)?;
    Ok(())
}

pub fn validate_data_config(config: &dyn ConfigPort) -> Result<(), RiskbalError> {
    let source = config
        .get_string("data", "source")
        .unwrap_or_else(|| "csv".to_string());
    match source.trim().to_lowercase().as_str() {
        "csv" => {
            required(config, "data", "csv_dir")?;
        }
        "yahoo" => {}
        other => {
            return Err(invalid(
                "data",
                "source",
                format!("unknown source {other:?}, expected csv or yahoo"),
            ));
        }
    }
    if config.get_int("data", "retries")?.is_some_and(|n| n < 0) {
        return Err(invalid("data", "retries", "retries must be non-negative"));
    }
    Ok(())
}

pub fn validate_risk_config(config: &dyn ConfigPort) -> Result<(), RiskbalError> {
    let confidence = config.get_double("risk", "confidence")?.unwrap_or(95.0);
    if !(0.0..=100.0).contains(&confidence) {
        return Err(invalid(
            "risk",
            "confidence",
            "confidence must be between 0 and 100",
        ));
    }
    if let Some(method) = config.get_string("risk", "method") {
        parse_methods(&method)?;
    }
    Ok(())
}

pub fn validate_rebalance_config(config: &dyn ConfigPort) -> Result<(), RiskbalError> {
    if config
        .get_int("rebalance", "lookback_days")?
        .is_some_and(|n| n <= 0)
    {
        return Err(invalid(
            "rebalance",
            "lookback_days",
            "lookback_days must be positive",
        ));
    }
    for key in ["top_k", "bottom_k"] {
        if config.get_int("rebalance", key)?.is_some_and(|n| n < 0) {
            return Err(invalid("rebalance", key, format!("{key} must be non-negative")));
        }
    }
    config.get_double("rebalance", "delta")?;
    Ok(())
}

pub fn validate_backtest_config(config: &dyn ConfigPort) -> Result<(), RiskbalError> {
    if let Some(lookbacks) = config.get_string("backtest", "lookbacks") {
        parse_lookbacks(&lookbacks)?;
    }
    if let Some(deltas) = config.get_string("backtest", "deltas") {
        parse_deltas(&deltas)?;
    }
    Ok(())
}

pub fn validate_all(config: &dyn ConfigPort) -> Result<(), RiskbalError> {
    validate_portfolio_config(config)?;
    validate_data_config(config)?;
    validate_risk_config(config)?;
    validate_rebalance_config(config)?;
    validate_backtest_config(config)?;
    Ok(())
}

/// Parse `AAPL:0.15, IBM:0.2` into holdings. Tickers are upper-cased.
pub fn parse_holdings(input: &str) -> Result<Vec<Holding>, RiskbalError> {
    input
        .split(',')
        .map(|token| {
            let token = token.trim();
            let (ticker, weight) = token.split_once(':').ok_or_else(|| {
                invalid(
                    "portfolio",
                    "holdings",
                    format!("expected TICKER:WEIGHT, got {token:?}"),
                )
            })?;
            let ticker = ticker.trim().to_uppercase();
            if ticker.is_empty() {
                return Err(invalid("portfolio", "holdings", "empty ticker"));
            }
            let weight: f64 = weight.trim().parse().map_err(|_| {
                invalid(
                    "portfolio",
                    "holdings",
                    format!("invalid weight for {ticker}: {:?}", weight.trim()),
                )
            })?;
            Ok(Holding { ticker, weight })
        })
        .collect()
}

pub fn parse_lookbacks(input: &str) -> Result<Vec<usize>, RiskbalError> {
    input
        .split(',')
        .map(|token| match token.trim().parse::<usize>() {
            Ok(n) if n > 0 => Ok(n),
            _ => Err(invalid(
                "backtest",
                "lookbacks",
                format!("lookbacks must be positive integers, got {:?}", token.trim()),
            )),
        })
        .collect()
}

pub fn parse_deltas(input: &str) -> Result<Vec<f64>, RiskbalError> {
    input
        .split(',')
        .map(|token| {
            token.trim().parse::<f64>().map_err(|_| {
                invalid(
                    "backtest",
                    "deltas",
                    format!("invalid delta {:?}", token.trim()),
                )
            })
        })
        .collect()
}

/// `historical`, `parametric` or `both`.
pub fn parse_methods(input: &str) -> Result<Vec<VarMethod>, RiskbalError> {
    if input.trim().eq_ignore_ascii_case("both") {
        return Ok(vec![VarMethod::Historical, VarMethod::Parametric]);
    }
    Ok(vec![input.parse()?])
}

fn validate_dates(config: &dyn ConfigPort) -> Result<(), RiskbalError> {
    let start = parse_config_date(config, "start_date")?;
    let end = parse_config_date(config, "end_date")?;
    if end <= start {
        return Err(RiskbalError::InvalidDateRange { start, end });
    }
    Ok(())
}

fn parse_config_date(
    config: &dyn ConfigPort,
    key: &str,
) -> Result<chrono::NaiveDate, RiskbalError> {
    let value = required(config, "portfolio", key)?;
    parse_date(&value).map_err(|_| {
        invalid(
            "portfolio",
            key,
            format!("unparseable date {:?}", value.trim()),
        )
    })
}

fn required(config: &dyn ConfigPort, section: &str, key: &str) -> Result<String, RiskbalError> {
    match config.get_string(section, key) {
        Some(s) if !s.trim().is_empty() => Ok(s),
        _ => Err(RiskbalError::ConfigMissing {
            section: section.to_string(),
            key: key.to_string(),
        }),
    }
}

fn invalid(section: &str, key: &str, reason: impl Into<String>) -> RiskbalError {
    RiskbalError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason: reason.into(),
    }
}
