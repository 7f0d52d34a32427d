//! Serializable engine configuration loaded from TOML.

use std::path::Path;

use chrono_tz::Tz;
use pivotlab_core::classifier::{ClassifierPolicy, NeutralZonePolicy, RescanPolicy};
use pivotlab_core::engine::EngineSettings;
use pivotlab_core::levels::{LevelRounding, DEFAULT_BUFFER_PCT};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Content hash of a configuration (blake3 hex).
pub type ConfigId = String;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Full configuration. Every section and field has a default, so an empty
/// file is a valid config.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PivotConfig {
    pub levels: LevelsConfig,
    pub classifier: ClassifierConfig,
    pub trend: TrendConfig,
    pub report: ReportConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LevelsConfig {
    pub rounding: LevelRounding,
    /// Buffer as a fraction of bc.
    pub buffer_pct: Decimal,
    /// Fixed buffer width; overrides `buffer_pct` when set.
    pub buffer: Option<Decimal>,
}

impl Default for LevelsConfig {
    fn default() -> Self {
        Self {
            rounding: LevelRounding::default(),
            buffer_pct: DEFAULT_BUFFER_PCT,
            buffer: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    pub neutral_zone: NeutralZonePolicy,
    pub rescan: RescanPolicy,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrendConfig {
    pub period: usize,
    pub multiplier: Decimal,
    /// Candle interval; trend points are stamped at candle close.
    pub candle_minutes: i64,
}

impl Default for TrendConfig {
    fn default() -> Self {
        Self {
            period: 14,
            multiplier: Decimal::from(3),
            candle_minutes: 3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    /// IANA timezone name used when rendering timestamps.
    pub timezone: String,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            timezone: "Asia/Kolkata".into(),
        }
    }
}

impl PivotConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml(&text)
    }

    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        let config: PivotConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.levels.buffer_pct <= Decimal::ZERO {
            return Err(ConfigError::Invalid(format!(
                "levels.buffer_pct must be > 0, got {}",
                self.levels.buffer_pct
            )));
        }
        if let Some(buffer) = self.levels.buffer {
            if buffer <= Decimal::ZERO {
                return Err(ConfigError::Invalid(format!(
                    "levels.buffer must be > 0, got {buffer}"
                )));
            }
        }
        if self.trend.period == 0 {
            return Err(ConfigError::Invalid("trend.period must be >= 1".into()));
        }
        if self.trend.multiplier <= Decimal::ZERO {
            return Err(ConfigError::Invalid(format!(
                "trend.multiplier must be > 0, got {}",
                self.trend.multiplier
            )));
        }
        if self.trend.candle_minutes <= 0 {
            return Err(ConfigError::Invalid(
                "trend.candle_minutes must be >= 1".into(),
            ));
        }
        self.report_timezone()?;
        Ok(())
    }

    /// Deterministic content hash of this configuration.
    ///
    /// Two runs with identical configs share the same id.
    pub fn config_id(&self) -> ConfigId {
        // Plain data with string keys; serialization cannot fail.
        let json = serde_json::to_string(self).unwrap_or_default();
        blake3::hash(json.as_bytes()).to_hex().to_string()
    }

    pub fn engine_settings(&self) -> EngineSettings {
        EngineSettings {
            rounding: self.levels.rounding,
            buffer_pct: self.levels.buffer_pct,
            buffer_override: self.levels.buffer,
            classifier: ClassifierPolicy {
                neutral_zone: self.classifier.neutral_zone,
                rescan: self.classifier.rescan,
            },
        }
    }

    pub fn report_timezone(&self) -> Result<Tz, ConfigError> {
        self.report.timezone.parse::<Tz>().map_err(|_| {
            ConfigError::Invalid(format!(
                "report.timezone '{}' is not a known timezone",
                self.report.timezone
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_is_all_defaults() {
        let config = PivotConfig::from_toml("").unwrap();
        assert_eq!(config, PivotConfig::default());
        assert_eq!(config.trend.period, 14);
        assert_eq!(config.levels.buffer_pct, DEFAULT_BUFFER_PCT);
        assert_eq!(config.report_timezone().unwrap(), chrono_tz::Asia::Kolkata);
    }

    #[test]
    fn parses_every_section() {
        let text = r#"
            [levels]
            rounding = "chained"
            buffer_pct = "0.001"
            buffer = "15"

            [classifier]
            neutral_zone = "exit"
            rescan = "fallback_only"

            [trend]
            period = 10
            multiplier = "2.5"
            candle_minutes = 5

            [report]
            timezone = "UTC"
        "#;
        let config = PivotConfig::from_toml(text).unwrap();
        let settings = config.engine_settings();
        assert_eq!(settings.rounding, LevelRounding::Chained);
        assert_eq!(settings.buffer_override, Some(Decimal::from(15)));
        assert_eq!(settings.classifier.neutral_zone, NeutralZonePolicy::Exit);
        assert_eq!(settings.classifier.rescan, RescanPolicy::FallbackOnly);
        assert_eq!(config.trend.multiplier, Decimal::new(25, 1));
        assert_eq!(config.trend.candle_minutes, 5);
    }

    #[test]
    fn rejects_invalid_values() {
        assert!(PivotConfig::from_toml("[trend]\nperiod = 0").is_err());
        assert!(PivotConfig::from_toml("[levels]\nbuffer = \"0\"").is_err());
        assert!(PivotConfig::from_toml("[report]\ntimezone = \"Mars/Base\"").is_err());
        assert!(PivotConfig::from_toml("[levels]\nrounding = \"sideways\"").is_err());
    }

    #[test]
    fn config_id_is_stable_and_sensitive() {
        let a = PivotConfig::default();
        let mut b = PivotConfig::default();
        assert_eq!(a.config_id(), b.config_id());
        assert_eq!(a.config_id().len(), 64);

        b.trend.period = 20;
        assert_ne!(a.config_id(), b.config_id());
    }
}
