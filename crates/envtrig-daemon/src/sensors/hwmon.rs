//! Linux hwmon temperature/humidity sensor.
//!
//! Humidity drivers such as sht3x, sht4x and hdc100x expose `temp1_input` in
//! millidegrees celsius and `humidity1_input` in milli-percent.

use super::EnvironmentSensor;
use anyhow::{Context, Result};
use envtrig_core::Environment;
use std::fs;
use std::path::{Path, PathBuf};

/// hwmon-backed environment sensor.
pub struct HwmonSensor {
    name: String,
    dir: PathBuf,
}

impl HwmonSensor {
    /// Creates a sensor reading from an hwmon directory.
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        let dir = dir.as_ref().to_path_buf();
        let name = fs::read_to_string(dir.join("name"))
            .map(|s| s.trim().to_string())
            .unwrap_or_else(|_| "hwmon".to_string());
        Self { name, dir }
    }

    fn read_milli(&self, file: &str) -> Result<f64> {
        let path = self.dir.join(file);
        let raw = fs::read_to_string(&path).with_context(|| format!("Failed to read {:?}", path))?;
        let milli: i64 = raw
            .trim()
            .parse()
            .with_context(|| format!("Invalid value in {:?}: {:?}", path, raw.trim()))?;
        Ok(milli as f64 / 1000.0)
    }
}

impl EnvironmentSensor for HwmonSensor {
    fn name(&self) -> &str {
        &self.name
    }

    fn read(&mut self) -> Result<Environment> {
        Ok(Environment::new(
            self.read_milli("temp1_input")?,
            self.read_milli("humidity1_input")?,
        ))
    }
}
