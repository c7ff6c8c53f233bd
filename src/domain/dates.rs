//! Date parsing and rebalance checkpoint selection.

use chrono::{Datelike, NaiveDate};

use super::error::RiskbalError;

const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%Y%m%d",
    "%d %b %Y",
    "%d %B %Y",
    "%b %d %Y",
    "%b %d, %Y",
    "%B %d %Y",
    "%B %d, %Y",
    "%m/%d/%Y",
];

/// Parse a literal date string in any of the common forms
/// (`2016-01-01`, `2016/01/01`, `20160101`, `01 Jan 2016`, `January 1, 2016`, ...).
pub fn parse_date(value: &str) -> Result<NaiveDate, RiskbalError> {
    let trimmed = value.trim();
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(trimmed, fmt).ok())
        .ok_or_else(|| RiskbalError::InvalidDate {
            value: value.to_string(),
        })
}

/// Indices into `dates` of the rebalance checkpoints: the first date, then
/// the last date of every calendar month. `dates` must be strictly increasing.
pub fn checkpoint_indices(dates: &[NaiveDate]) -> Vec<usize> {
    if dates.is_empty() {
        return Vec::new();
    }

    let mut indices = vec![0];
    for i in 0..dates.len() {
        let month_ends = match dates.get(i + 1) {
            Some(next) => (next.year(), next.month()) != (dates[i].year(), dates[i].month()),
            None => true,
        };
        if month_ends && i != 0 {
            indices.push(i);
        }
    }
    indices
}
