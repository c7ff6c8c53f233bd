//! Closing-price and return tables aligned on a shared date index.

use chrono::NaiveDate;
use std::collections::{BTreeSet, HashMap};

/// One daily close for one instrument.
#[derive(Debug, Clone, PartialEq)]
pub struct PricePoint {
    pub date: NaiveDate,
    pub close: f64,
}

/// Column-per-instrument closing prices on the union of all instruments'
/// dates. `None` marks a date the instrument has no observation for.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PriceTable {
    pub dates: Vec<NaiveDate>,
    pub tickers: Vec<String>,
    pub closes: Vec<Vec<Option<f64>>>,
}

impl PriceTable {
    /// Align per-instrument series on a unified, strictly increasing date
    /// index. Series order is preserved; duplicate dates keep the last close.
    pub fn from_series(series: Vec<(String, Vec<PricePoint>)>) -> Self {
        let unique_dates: BTreeSet<NaiveDate> = series
            .iter()
            .flat_map(|(_, points)| points.iter().map(|p| p.date))
            .collect();
        let dates: Vec<NaiveDate> = unique_dates.into_iter().collect();
        let index: HashMap<NaiveDate, usize> =
            dates.iter().enumerate().map(|(i, d)| (*d, i)).collect();

        let mut tickers = Vec::with_capacity(series.len());
        let mut closes = Vec::with_capacity(series.len());
        for (ticker, points) in series {
            let mut column = vec![None; dates.len()];
            for point in points {
                column[index[&point.date]] = Some(point.close);
            }
            tickers.push(ticker);
            closes.push(column);
        }

        PriceTable {
            dates,
            tickers,
            closes,
        }
    }

    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    pub fn instrument_count(&self) -> usize {
        self.tickers.len()
    }

    pub fn column(&self, ticker: &str) -> Option<&[Option<f64>]> {
        self.tickers
            .iter()
            .position(|t| t == ticker)
            .map(|i| self.closes[i].as_slice())
    }

    /// Simple returns per instrument: `close[t] / prev - 1`, where `prev` is
    /// the previous available close. The first observation, and any date
    /// without a close, has a return of 0.
    pub fn returns(&self) -> ReturnTable {
        let returns = self
            .closes
            .iter()
            .map(|column| {
                let mut prev: Option<f64> = None;
                column
                    .iter()
                    .map(|close| match (*close, prev) {
                        (Some(curr), Some(p)) => {
                            prev = Some(curr);
                            curr / p - 1.0
                        }
                        (Some(curr), None) => {
                            prev = Some(curr);
                            0.0
                        }
                        (None, _) => 0.0,
                    })
                    .collect()
            })
            .collect();

        ReturnTable {
            dates: self.dates.clone(),
            tickers: self.tickers.clone(),
            returns,
        }
    }
}

/// Column-per-instrument daily simple returns.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReturnTable {
    pub dates: Vec<NaiveDate>,
    pub tickers: Vec<String>,
    pub returns: Vec<Vec<f64>>,
}

impl ReturnTable {
    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    /// Returns of every instrument on row `row`.
    pub fn row(&self, row: usize) -> Vec<f64> {
        self.returns.iter().map(|column| column[row]).collect()
    }

    /// Daily portfolio returns for fixed weights ordered like `tickers`.
    pub fn weighted(&self, weights: &[f64]) -> Vec<f64> {
        (0..self.len())
            .map(|row| {
                self.returns
                    .iter()
                    .zip(weights)
                    .map(|(column, w)| column[row] * w)
                    .sum()
            })
            .collect()
    }
}
