//! Configuration management.

use anyhow::{Context, Result};
use envtrig_core::{SensorRange, DEFAULT_SETTINGS_PATH};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Main configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Evaluation tick interval in milliseconds
    #[serde(default = "default_tick")]
    pub tick: u64,

    /// Path to the monitor settings file
    #[serde(default = "default_settings")]
    pub settings: String,

    /// Sensor configuration
    #[serde(default)]
    pub sensor: SensorConfig,

    /// Representable sensor range
    #[serde(default)]
    pub range: SensorRange,
}

/// Where environment samples come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SensorKind {
    /// Linux hwmon directory exposing `temp1_input` and `humidity1_input`
    #[default]
    Hwmon,
    /// Text file holding "<temperature> <humidity>"
    File,
}

/// Sensor configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensorConfig {
    /// Source type
    #[serde(default)]
    pub kind: SensorKind,

    /// hwmon directory or sample file path
    #[serde(default = "default_sensor_path")]
    pub path: String,
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            kind: SensorKind::default(),
            path: default_sensor_path(),
        }
    }
}

// Default value functions
fn default_tick() -> u64 {
    1000
}

fn default_settings() -> String {
    DEFAULT_SETTINGS_PATH.to_string()
}

fn default_sensor_path() -> String {
    "/sys/class/hwmon/hwmon0".to_string()
}

impl Config {
    /// Loads configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content =
            std::fs::read_to_string(path.as_ref()).context("Failed to read configuration file")?;
        let config: Config = toml::from_str(&content).context("Failed to parse configuration")?;
        Ok(config)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            tick: default_tick(),
            settings: default_settings(),
            sensor: SensorConfig::default(),
            range: SensorRange::default(),
        }
    }
}
