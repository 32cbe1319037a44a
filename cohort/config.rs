//! Persisted dashboard settings: which scoring model is in force, how long the
//! high-risk roster is, and the active population filters.

use crate::cohort::filter::FilterConfig;
use crate::types::ScoringModel;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{BufWriter, Write};
use std::path::Path;
use thiserror::Error;

/// Default number of patients listed in the high-risk roster.
pub const DEFAULT_HIGH_RISK_LISTING: usize = 10;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read or write configuration file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse TOML configuration: {0}")]
    TomlParse(#[from] toml::de::Error),
    #[error("Failed to serialize configuration to TOML format: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DashboardConfig {
    pub scoring_model: ScoringModel,
    pub high_risk_listing: usize,
    pub filters: FilterConfig,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            scoring_model: ScoringModel::default(),
            high_risk_listing: DEFAULT_HIGH_RISK_LISTING,
            filters: FilterConfig::default(),
        }
    }
}

impl DashboardConfig {
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let toml_string = toml::to_string_pretty(self)?;
        let mut file = BufWriter::new(fs::File::create(path)?);
        file.write_all(toml_string.as_bytes())?;
        file.flush()?;
        Ok(())
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let toml_string = fs::read_to_string(path)?;
        let config = toml::from_str(&toml_string)?;
        Ok(config)
    }
}
