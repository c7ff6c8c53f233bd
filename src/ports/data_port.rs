//! Market-data access port trait.

use crate::domain::error::RiskbalError;
use crate::domain::prices::PricePoint;
use chrono::NaiveDate;

pub trait DataPort {
    /// Daily closes for `ticker` over the inclusive window, in date order.
    /// An empty vector means the source knows nothing for that window.
    fn fetch_closes(
        &self,
        ticker: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<PricePoint>, RiskbalError>;
}
