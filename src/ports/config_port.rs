//! Configuration access port trait.
//!
//! Lookups are by INI section and key. Numeric getters return `Ok(None)`
//! when the key is absent and `ConfigInvalid` when it is present but does
//! not parse.

use crate::domain::error::RiskbalError;

pub trait ConfigPort {
    fn get_string(&self, section: &str, key: &str) -> Option<String>;
    fn get_int(&self, section: &str, key: &str) -> Result<Option<i64>, RiskbalError>;
    fn get_double(&self, section: &str, key: &str) -> Result<Option<f64>, RiskbalError>;
}
