#![allow(dead_code)]

use chrono::NaiveDate;
use riskbal::domain::error::RiskbalError;
pub use riskbal::domain::prices::PricePoint;
use riskbal::ports::data_port::DataPort;
use std::cell::RefCell;
use std::collections::HashMap;

pub struct MockDataPort {
    pub data: HashMap<String, Vec<PricePoint>>,
    pub errors: HashMap<String, String>,
    pub calls: RefCell<Vec<String>>,
}

impl MockDataPort {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
            errors: HashMap::new(),
            calls: RefCell::new(Vec::new()),
        }
    }

    pub fn with_closes(mut self, ticker: &str, points: Vec<PricePoint>) -> Self {
        self.data.insert(ticker.to_string(), points);
        self
    }

    pub fn with_error(mut self, ticker: &str, reason: &str) -> Self {
        self.errors.insert(ticker.to_string(), reason.to_string());
        self
    }
}

impl DataPort for MockDataPort {
    fn fetch_closes(
        &self,
        ticker: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<PricePoint>, RiskbalError> {
        self.calls.borrow_mut().push(ticker.to_string());
        if let Some(reason) = self.errors.get(ticker) {
            return Err(RiskbalError::DataSource {
                ticker: ticker.to_string(),
                reason: reason.clone(),
            });
        }
        Ok(self
            .data
            .get(ticker)
            .map(|points| {
                points
                    .iter()
                    .filter(|p| p.date >= start_date && p.date <= end_date)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// Consecutive calendar days starting at `start`.
pub fn daily_closes(start: NaiveDate, closes: &[f64]) -> Vec<PricePoint> {
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| PricePoint {
            date: start + chrono::Duration::days(i as i64),
            close,
        })
        .collect()
}

/// Deterministic zig-zag around a drift, enough to give every instrument a
/// distinct non-zero variance.
pub fn trending_closes(start: NaiveDate, days: usize, base: f64, drift: f64) -> Vec<PricePoint> {
    let closes: Vec<f64> = (0..days)
        .map(|i| {
            let wiggle = if i % 2 == 0 { 0.5 } else { -0.5 };
            base + drift * i as f64 + wiggle
        })
        .collect();
    daily_closes(start, &closes)
}

/// Write `<dir>/<ticker>.csv` with `date,close` rows.
pub fn write_csv(dir: &std::path::Path, ticker: &str, points: &[PricePoint]) {
    let mut content = String::from("date,close\n");
    for p in points {
        content.push_str(&format!("{},{}\n", p.date, p.close));
    }
    std::fs::write(dir.join(format!("{ticker}.csv")), content).unwrap();
}
