//! Plain text file sensor.
//!
//! The file holds two whitespace separated numbers: temperature then humidity.
//! Useful for sensors read by an external helper and for bench testing.

use super::EnvironmentSensor;
use anyhow::{anyhow, Context, Result};
use envtrig_core::Environment;
use std::fs;
use std::path::{Path, PathBuf};

/// File-backed environment sensor.
pub struct FileSensor {
    path: PathBuf,
}

impl FileSensor {
    /// Creates a sensor reading from `path`.
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    fn parse(content: &str) -> Result<Environment> {
        let mut parts = content.split_whitespace().map(str::parse::<f64>);
        match (parts.next(), parts.next()) {
            (Some(Ok(temperature)), Some(Ok(humidity))) => {
                Ok(Environment::new(temperature, humidity))
            }
            _ => Err(anyhow!("Expected \"<temperature> <humidity>\", got {:?}", content.trim())),
        }
    }
}

impl EnvironmentSensor for FileSensor {
    fn name(&self) -> &str {
        "file"
    }

    fn read(&mut self) -> Result<Environment> {
        let content = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read {:?}", self.path))?;
        Self::parse(&content)
    }
}
