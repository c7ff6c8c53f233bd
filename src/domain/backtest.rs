//! Parameter-grid backtest of the momentum rebalancer.
//!
//! Each `(lookback_days, delta)` pair runs the rebalancer once; its monthly
//! weights are held constant between checkpoints and dotted with each day's
//! instrument returns. No transaction costs and no significance testing.
//! A flat strategy has zero standard deviation and reports a non-finite
//! Sharpe ratio; that is left as-is.

use chrono::NaiveDate;
use tracing::info;

use crate::domain::error::RiskbalError;
use crate::domain::prices::{PriceTable, ReturnTable};
use crate::domain::rebalance::{MomentumConfig, RebalanceHistory, run_rebalance};
use crate::domain::stats::{mean, sample_std};

pub const TRADING_DAYS_PER_YEAR: f64 = 260.0;

#[derive(Debug, Clone, PartialEq)]
pub struct ParameterGrid {
    pub lookbacks: Vec<usize>,
    pub deltas: Vec<f64>,
}

impl ParameterGrid {
    /// Every `(lookback, delta)` pair, lookback-major.
    pub fn pairs(&self) -> Vec<(usize, f64)> {
        self.lookbacks
            .iter()
            .flat_map(|&lb| self.deltas.iter().map(move |&d| (lb, d)))
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StrategyRun {
    pub id: String,
    pub lookback_days: usize,
    pub delta: f64,
    pub dates: Vec<NaiveDate>,
    pub returns: Vec<f64>,
    pub sharpe: f64,
}

pub fn strategy_id(lookback_days: usize, delta: f64) -> String {
    format!("lookback={},delta={}", lookback_days, delta)
}

/// Run the rebalancer once per grid pair. `base` supplies `top_k`/`bottom_k`.
pub fn run_grid(
    prices: &PriceTable,
    grid: &ParameterGrid,
    base: &MomentumConfig,
) -> Result<Vec<StrategyRun>, RiskbalError> {
    let returns = prices.returns();
    let mut runs = Vec::new();

    for (lookback_days, delta) in grid.pairs() {
        let config = MomentumConfig {
            lookback_days,
            delta,
            ..base.clone()
        };
        let history = run_rebalance(prices, &config)?;
        let daily = strategy_returns(&history, &returns);
        let sharpe = sharpe_ratio(&daily);
        let id = strategy_id(lookback_days, delta);
        info!(strategy = %id, sharpe, "backtest complete");

        runs.push(StrategyRun {
            id,
            lookback_days,
            delta,
            dates: returns.dates.clone(),
            returns: daily,
            sharpe,
        });
    }

    Ok(runs)
}

/// Forward-fill checkpoint weights onto every return date and take the daily
/// dot product. Dates before the first checkpoint return NaN.
pub fn strategy_returns(history: &RebalanceHistory, returns: &ReturnTable) -> Vec<f64> {
    returns
        .dates
        .iter()
        .enumerate()
        .map(|(row, date)| match history.weights_on(*date) {
            Some(weights) => weights
                .iter()
                .zip(&returns.returns)
                .map(|(w, column)| w * column[row])
                .sum(),
            None => f64::NAN,
        })
        .collect()
}

/// `mean / std * sqrt(260)` with the sample standard deviation.
pub fn sharpe_ratio(returns: &[f64]) -> f64 {
    mean(returns) / sample_std(returns) * TRADING_DAYS_PER_YEAR.sqrt()
}

/// Compounded cumulative return after each day.
pub fn cumulative_returns(returns: &[f64]) -> Vec<f64> {
    let mut growth = 1.0;
    returns
        .iter()
        .map(|r| {
            growth *= 1.0 + r;
            growth - 1.0
        })
        .collect()
}
