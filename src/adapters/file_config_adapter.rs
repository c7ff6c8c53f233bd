//! INI file configuration adapter.

use crate::domain::error::RiskbalError;
use crate::ports::config_port::ConfigPort;
use configparser::ini::Ini;
use std::path::Path;
use std::str::FromStr;

pub struct FileConfigAdapter {
    config: Ini,
}

impl FileConfigAdapter {
    pub fn from_file<P: AsRef<Path>>(path: P) -> std::io::Result<Self> {
        let mut config = Ini::new();
        config.load(path).map_err(std::io::Error::other)?;
        Ok(Self { config })
    }

    pub fn from_string(content: &str) -> Result<Self, String> {
        let mut config = Ini::new();
        config.read(content.to_string())?;
        Ok(Self { config })
    }
}

impl FileConfigAdapter {
    /// Present values are trimmed and parsed; a value that does not parse is
    /// an error rather than a silent default.
    fn parsed<T: FromStr>(&self, section: &str, key: &str) -> Result<Option<T>, RiskbalError> {
        let Some(raw) = self.config.get(section, key) else {
            return Ok(None);
        };
        let value = raw.trim();
        value
            .parse()
            .map(Some)
            .map_err(|_| RiskbalError::ConfigInvalid {
                section: section.to_string(),
                key: key.to_string(),
                reason: format!("expected a number, got {value:?}"),
            })
    }
}

impl ConfigPort for FileConfigAdapter {
    fn get_string(&self, section: &str, key: &str) -> Option<String> {
        self.config.get(section, key)
    }

    fn get_int(&self, section: &str, key: &str) -> Result<Option<i64>, RiskbalError> {
        self.parsed(section, key)
    }

    fn get_double(&self, section: &str, key: &str) -> Result<Option<f64>, RiskbalError> {
        self.parsed(section, key)
    }
}
