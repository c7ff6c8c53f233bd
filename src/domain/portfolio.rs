//! Weighted portfolio with a fixed target baseline and a replaceable active
//! weight vector.

use std::collections::HashSet;

use super::error::RiskbalError;

/// Absolute tolerance for the weights-sum-to-one invariant.
pub const WEIGHT_TOLERANCE: f64 = 1e-9;

#[derive(Debug, Clone, PartialEq)]
pub struct Holding {
    pub ticker: String,
    pub weight: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Portfolio {
    target: Vec<Holding>,
    active: Vec<f64>,
}

impl Portfolio {
    pub fn new(holdings: Vec<Holding>) -> Result<Self, RiskbalError> {
        validate_holdings(&holdings)?;
        let active = holdings.iter().map(|h| h.weight).collect();
        Ok(Portfolio {
            target: holdings,
            active,
        })
    }

    /// Build from `(ticker, weight)` pairs.
    pub fn from_pairs<S: Into<String>>(pairs: Vec<(S, f64)>) -> Result<Self, RiskbalError> {
        Self::new(
            pairs
                .into_iter()
                .map(|(ticker, weight)| Holding {
                    ticker: ticker.into(),
                    weight,
                })
                .collect(),
        )
    }

    pub fn len(&self) -> usize {
        self.target.len()
    }

    pub fn is_empty(&self) -> bool {
        self.target.is_empty()
    }

    pub fn tickers(&self) -> impl Iterator<Item = &str> {
        self.target.iter().map(|h| h.ticker.as_str())
    }

    pub fn target_weights(&self) -> &[Holding] {
        &self.target
    }

    pub fn target_weight(&self, ticker: &str) -> Option<f64> {
        self.target
            .iter()
            .find(|h| h.ticker == ticker)
            .map(|h| h.weight)
    }

    pub fn active_weight(&self, ticker: &str) -> Option<f64> {
        self.target
            .iter()
            .position(|h| h.ticker == ticker)
            .map(|i| self.active[i])
    }

    /// Active weights ordered like `tickers`. Tickers not held get 0.
    pub fn weights_for(&self, tickers: &[String]) -> Vec<f64> {
        tickers
            .iter()
            .map(|t| self.active_weight(t).unwrap_or(0.0))
            .collect()
    }

    /// Replace the active weights. Every held instrument must appear exactly
    /// once and the new vector obeys the same invariants as construction.
    /// The target weights are left untouched.
    pub fn rebalance(&mut self, weights: &[(String, f64)]) -> Result<(), RiskbalError> {
        let holdings: Vec<Holding> = weights
            .iter()
            .map(|(ticker, weight)| Holding {
                ticker: ticker.clone(),
                weight: *weight,
            })
            .collect();
        validate_holdings(&holdings)?;

        let mut next = vec![0.0; self.target.len()];
        for holding in &holdings {
            match self.target.iter().position(|h| h.ticker == holding.ticker) {
                Some(i) => next[i] = holding.weight,
                None => {
                    return Err(RiskbalError::ConfigInvalid {
                        section: "portfolio".into(),
                        key: "holdings".into(),
                        reason: format!("{} is not held by the portfolio", holding.ticker),
                    });
                }
            }
        }
        self.active = next;
        Ok(())
    }

    /// Restore the active weights to the target baseline.
    pub fn reset(&mut self) {
        self.active = self.target.iter().map(|h| h.weight).collect();
    }
}

fn validate_holdings(holdings: &[Holding]) -> Result<(), RiskbalError> {
    if holdings.is_empty() {
        return Err(RiskbalError::EmptyPortfolio);
    }

    let mut seen = HashSet::new();
    for holding in holdings {
        if !seen.insert(holding.ticker.as_str()) {
            return Err(RiskbalError::DuplicateInstrument {
                ticker: holding.ticker.clone(),
            });
        }
        if holding.weight < 0.0 || holding.weight.is_nan() {
            return Err(RiskbalError::NegativeWeight {
                ticker: holding.ticker.clone(),
                weight: holding.weight,
            });
        }
    }

    let sum: f64 = holdings.iter().map(|h| h.weight).sum();
    if (sum - 1.0).abs() > WEIGHT_TOLERANCE || !sum.is_finite() {
        return Err(RiskbalError::WeightSum {
            sum,
            tolerance: WEIGHT_TOLERANCE,
        });
    }
    Ok(())
}
