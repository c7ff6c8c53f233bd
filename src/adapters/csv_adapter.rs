//! CSV file price adapter.
//!
//! Reads `<base>/<TICKER>.csv`. The date and close columns are located by
//! header name, case-insensitively; `close` is preferred over `adj close`.
//! Rows whose close is blank or `null` are skipped.

use crate::domain::dates::parse_date;
use crate::domain::error::RiskbalError;
use crate::domain::prices::PricePoint;
use crate::ports::data_port::DataPort;
use chrono::NaiveDate;
use std::fs;
use std::path::PathBuf;
use tracing::debug;

pub struct CsvAdapter {
    base_path: PathBuf,
}

impl CsvAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn csv_path(&self, ticker: &str) -> PathBuf {
        self.base_path.join(format!("{}.csv", ticker))
    }
}

fn column_index(headers: &csv::StringRecord, names: &[&str]) -> Option<usize> {
    names.iter().find_map(|name| {
        headers
            .iter()
            .position(|h| h.trim().eq_ignore_ascii_case(name))
    })
}

impl DataPort for CsvAdapter {
    fn fetch_closes(
        &self,
        ticker: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<PricePoint>, RiskbalError> {
        let source_err = |reason: String| RiskbalError::DataSource {
            ticker: ticker.to_string(),
            reason,
        };

        let path = self.csv_path(ticker);
        let content = fs::read_to_string(&path)
            .map_err(|e| source_err(format!("failed to read {}: {}", path.display(), e)))?;

        let mut rdr = csv::Reader::from_reader(content.as_bytes());
        let headers = rdr
            .headers()
            .map_err(|e| source_err(format!("CSV header error: {}", e)))?
            .clone();
        let date_col = column_index(&headers, &["date"])
            .ok_or_else(|| source_err("missing date column".into()))?;
        let close_col = column_index(&headers, &["close", "adj close"])
            .ok_or_else(|| source_err("missing close column".into()))?;

        let mut points = Vec::new();
        for result in rdr.records() {
            let record = result.map_err(|e| source_err(format!("CSV parse error: {}", e)))?;

            let date_str = record
                .get(date_col)
                .ok_or_else(|| source_err("short row".into()))?;
            let date = parse_date(date_str)
                .map_err(|_| source_err(format!("invalid date {:?}", date_str.trim())))?;
            if date < start_date || date > end_date {
                continue;
            }

            let close_str = record.get(close_col).unwrap_or("").trim();
            if close_str.is_empty() || close_str.eq_ignore_ascii_case("null") {
                debug!(ticker, %date, "blank close, row skipped");
                continue;
            }
            let close: f64 = close_str
                .parse()
                .map_err(|e| source_err(format!("invalid close value {:?}: {}", close_str, e)))?;

            points.push(PricePoint { date, close });
        }

        points.sort_by_key(|p| p.date);
        points.dedup_by_key(|p| p.date);
        Ok(points)
    }
}
