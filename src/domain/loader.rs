//! Price loading for every instrument of a portfolio.
//!
//! Instruments are fetched one at a time in portfolio order. An instrument
//! whose fetch fails or comes back empty is skipped with a warning and is
//! simply absent from the resulting table.

use chrono::NaiveDate;
use tracing::{info, warn};

use crate::domain::error::RiskbalError;
use crate::domain::portfolio::Portfolio;
use crate::domain::prices::PriceTable;
use crate::ports::data_port::DataPort;

#[derive(Debug, Clone)]
pub struct SkippedInstrument {
    pub ticker: String,
    pub reason: SkipReason,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SkipReason {
    NoData,
    FetchFailed { reason: String },
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::NoData => write!(f, "no data found"),
            SkipReason::FetchFailed { reason } => write!(f, "fetch failed: {}", reason),
        }
    }
}

#[derive(Debug, Clone)]
pub struct LoadResult {
    pub prices: PriceTable,
    pub skipped: Vec<SkippedInstrument>,
}

pub fn load_prices(
    data_port: &dyn DataPort,
    portfolio: &Portfolio,
    start_date: NaiveDate,
    end_date: NaiveDate,
) -> Result<LoadResult, RiskbalError> {
    if end_date <= start_date {
        return Err(RiskbalError::InvalidDateRange {
            start: start_date,
            end: end_date,
        });
    }

    let mut series = Vec::with_capacity(portfolio.len());
    let mut skipped = Vec::new();

    for ticker in portfolio.tickers() {
        info!(ticker, %start_date, %end_date, "getting close prices");
        match data_port.fetch_closes(ticker, start_date, end_date) {
            Ok(points) if points.is_empty() => {
                warn!(ticker, "no data found, skipping instrument");
                skipped.push(SkippedInstrument {
                    ticker: ticker.to_string(),
                    reason: SkipReason::NoData,
                });
            }
            Ok(points) => {
                let in_window: Vec<_> = points
                    .into_iter()
                    .filter(|p| p.date >= start_date && p.date <= end_date)
                    .collect();
                if in_window.is_empty() {
                    warn!(ticker, "no data inside the requested window, skipping instrument");
                    skipped.push(SkippedInstrument {
                        ticker: ticker.to_string(),
                        reason: SkipReason::NoData,
                    });
                    continue;
                }
                info!(ticker, observations = in_window.len(), "loaded");
                series.push((ticker.to_string(), in_window));
            }
            Err(e) => {
                warn!(ticker, error = %e, "fetch failed, skipping instrument");
                skipped.push(SkippedInstrument {
                    ticker: ticker.to_string(),
                    reason: SkipReason::FetchFailed {
                        reason: e.to_string(),
                    },
                });
            }
        }
    }

    if series.is_empty() {
        return Err(RiskbalError::NoData {
            start: start_date,
            end: end_date,
        });
    }

    if !skipped.is_empty() {
        warn!(
            loaded = series.len(),
            requested = portfolio.len(),
            "continuing with a reduced instrument set"
        );
    }

    Ok(LoadResult {
        prices: PriceTable::from_series(series),
        skipped,
    })
}
