//! Application configuration.
//!
//! A single TOML file under the platform config directory. Every field has
//! a default, so a missing file or a partial file always yields a usable
//! configuration. API keys may also arrive through the environment, which
//! takes precedence over the file.

use crate::error::{Result, StrideError};
use crate::pmc::PmcConfig;
use crate::readiness::ReadinessBands;
use crate::services;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use tracing::debug;

const CONFIG_DIR: &str = "stridelog";
const CONFIG_FILE: &str = "config.toml";
const DATABASE_FILE: &str = "stridelog.db";

/// Environment variable holding the coach API key
pub const COACH_API_KEY_VAR: &str = "STRIDELOG_COACH_API_KEY";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Override for the database location; platform data dir when absent
    pub data_dir: Option<PathBuf>,

    pub pmc: PmcConfig,
    pub readiness: ReadinessConfig,
    pub weather: WeatherConfig,
    pub coach: CoachConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReadinessConfig {
    pub bands: ReadinessBands,

    /// Absolute CTL/ATL/TSB delta still counted as on track
    pub adherence_tolerance: Decimal,
}

impl Default for ReadinessConfig {
    fn default() -> Self {
        ReadinessConfig {
            bands: ReadinessBands::default(),
            adherence_tolerance: dec!(5),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WeatherConfig {
    pub endpoint: String,
    pub timeout_seconds: u64,

    /// Home location the forecast is fetched for
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

impl Default for WeatherConfig {
    fn default() -> Self {
        WeatherConfig {
            endpoint: services::weather::DEFAULT_ENDPOINT.to_string(),
            timeout_seconds: services::weather::DEFAULT_TIMEOUT_SECONDS,
            latitude: None,
            longitude: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoachConfig {
    pub endpoint: String,
    pub timeout_seconds: u64,

    /// Overridden by `STRIDELOG_COACH_API_KEY` when set
    pub api_key: Option<String>,
}

impl Default for CoachConfig {
    fn default() -> Self {
        CoachConfig {
            endpoint: services::coach::DEFAULT_ENDPOINT.to_string(),
            timeout_seconds: services::coach::DEFAULT_TIMEOUT_SECONDS,
            api_key: None,
        }
    }
}

impl AppConfig {
    /// Load from the default location, falling back to defaults when the
    /// file does not exist.
    pub fn load() -> Result<Self> {
        match Self::config_path() {
            Some(path) if path.exists() => Self::load_from(&path),
            _ => Ok(Self::default()),
        }
    }

    pub fn load_from(path: &PathBuf) -> Result<Self> {
        debug!(path = %path.display(), "loading configuration");
        let contents = fs::read_to_string(path)?;
        toml::from_str(&contents)
            .map_err(|e| StrideError::Configuration(format!("invalid config file: {e}")))
    }

    pub fn save(&self) -> Result<()> {
        let path = Self::config_path().ok_or_else(|| {
            StrideError::Configuration("no platform config directory available".to_string())
        })?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let contents = toml::to_string_pretty(self)
            .map_err(|e| StrideError::Configuration(e.to_string()))?;
        fs::write(&path, contents)?;
        Ok(())
    }

    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(CONFIG_DIR).join(CONFIG_FILE))
    }

    /// Where the SQLite database lives, creating the directory if needed.
    pub fn database_path(&self) -> Result<PathBuf> {
        let dir = match &self.data_dir {
            Some(dir) => dir.clone(),
            None => dirs::data_dir()
                .map(|dir| dir.join(CONFIG_DIR))
                .ok_or_else(|| {
                    StrideError::Configuration("no platform data directory available".to_string())
                })?,
        };
        fs::create_dir_all(&dir)?;
        Ok(dir.join(DATABASE_FILE))
    }

    /// Coach API key: environment first, then the config file.
    pub fn coach_api_key(&self) -> Option<String> {
        std::env::var(COACH_API_KEY_VAR)
            .ok()
            .filter(|k| !k.is_empty())
            .or_else(|| self.coach.api_key.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_complete() {
        let config = AppConfig::default();
        assert_eq!(config.pmc.ctl_time_constant, 42);
        assert_eq!(config.pmc.atl_time_constant, 7);
        assert_eq!(config.readiness.adherence_tolerance, dec!(5));
        assert!(config.weather.endpoint.contains("open-meteo"));
        assert!(config.coach.api_key.is_none());
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let toml_str = r#"
            [pmc]
            ctl_time_constant = 28

            [weather]
            latitude = 30.27
            longitude = -97.74
        "#;
        let config: AppConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.pmc.ctl_time_constant, 28);
        assert_eq!(config.pmc.atl_time_constant, 7);
        assert_eq!(config.weather.latitude, Some(30.27));
        assert_eq!(
            config.weather.timeout_seconds,
            services::weather::DEFAULT_TIMEOUT_SECONDS
        );
    }

    #[test]
    fn test_round_trip_through_toml() {
        let mut config = AppConfig::default();
        config.coach.api_key = Some("secret".to_string());
        config.readiness.adherence_tolerance = dec!(7.5);

        let serialized = toml::to_string_pretty(&config).unwrap();
        let restored: AppConfig = toml::from_str(&serialized).unwrap();
        assert_eq!(restored, config);
    }

    #[test]
    fn test_load_from_rejects_malformed_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        std::io::Write::write_all(&mut file, b"pmc = \"not a table\"").unwrap();
        let err = AppConfig::load_from(&file.path().to_path_buf()).unwrap_err();
        assert!(matches!(err, StrideError::Configuration(_)));
    }
}
