//! Yahoo! Finance price adapter.
//!
//! The client is async; each fetch blocks on a current-thread runtime owned
//! by the adapter, so callers stay synchronous and fetch one ticker at a time.

use crate::domain::error::RiskbalError;
use crate::domain::prices::PricePoint;
use crate::ports::data_port::DataPort;
use chrono::{DateTime, NaiveDate, NaiveTime};
use time::OffsetDateTime;
use tokio::runtime::Runtime;
use tracing::warn;
use yahoo_finance_api::YahooConnector;

pub struct YahooAdapter {
    runtime: Runtime,
    client: YahooConnector,
    retries: u32,
}

impl YahooAdapter {
    /// `retries` extra attempts are made after a failed request.
    pub fn new(retries: u32) -> Result<Self, RiskbalError> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        Ok(Self {
            runtime,
            client: YahooConnector::new(),
            retries,
        })
    }

    fn fetch_once(
        &self,
        ticker: &str,
        start: OffsetDateTime,
        end: OffsetDateTime,
    ) -> Result<Vec<PricePoint>, String> {
        let response = self
            .runtime
            .block_on(self.client.get_quote_history(ticker, start, end))
            .map_err(|e| e.to_string())?;
        let quotes = response.quotes().map_err(|e| e.to_string())?;

        Ok(quotes
            .iter()
            .filter_map(|q| {
                let date = DateTime::from_timestamp(q.timestamp as i64, 0)?.date_naive();
                Some(PricePoint {
                    date,
                    close: q.close,
                })
            })
            .collect())
    }
}

fn to_offset(ticker: &str, date: NaiveDate) -> Result<OffsetDateTime, RiskbalError> {
    let secs = date.and_time(NaiveTime::MIN).and_utc().timestamp();
    OffsetDateTime::from_unix_timestamp(secs).map_err(|e| RiskbalError::DataSource {
        ticker: ticker.to_string(),
        reason: format!("date {date} out of range: {e}"),
    })
}

impl DataPort for YahooAdapter {
    fn fetch_closes(
        &self,
        ticker: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<PricePoint>, RiskbalError> {
        let start = to_offset(ticker, start_date)?;
        // the upper bound is exclusive on the wire
        let end = to_offset(ticker, end_date.succ_opt().unwrap_or(end_date))?;

        let mut attempt = 0;
        loop {
            match self.fetch_once(ticker, start, end) {
                Ok(mut points) => {
                    points.retain(|p| p.date >= start_date && p.date <= end_date);
                    points.sort_by_key(|p| p.date);
                    points.dedup_by_key(|p| p.date);
                    return Ok(points);
                }
                Err(reason) if attempt < self.retries => {
                    attempt += 1;
                    warn!(ticker, attempt, %reason, "request failed, retrying");
                }
                Err(reason) => {
                    return Err(RiskbalError::DataSource {
                        ticker: ticker.to_string(),
                        reason,
                    });
                }
            }
        }
    }
}
