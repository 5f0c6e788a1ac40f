//! Persistent settings store.
//!
//! Settings live in a TOML file. Writes are range checked and persisted
//! immediately; a running process picks up edits made by another process
//! through [`SettingsStore::reload_if_changed`].
//!
//! The file is replaced by renaming a fully written sibling, so a reader
//! never observes a partially written file.

use crate::settings::{EnvironmentConfig, SensorRange, Setting, SettingValue};
use crate::Result;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tempfile::NamedTempFile;
use tracing::{debug, info};

/// Settings file used when none is configured.
pub const DEFAULT_SETTINGS_PATH: &str = "/var/lib/envtrig/env_trig.toml";

/// Identifies one version of the settings file on disk.
///
/// Modification times can be coarser than the interval between two edits, so
/// the length is compared as well.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct FileStamp {
    modified: SystemTime,
    len: u64,
}

impl FileStamp {
    fn of(path: &Path) -> Option<Self> {
        let metadata = std::fs::metadata(path).ok()?;
        Some(Self {
            modified: metadata.modified().ok()?,
            len: metadata.len(),
        })
    }
}

/// TOML-backed store for [`EnvironmentConfig`].
#[derive(Debug)]
pub struct SettingsStore {
    path: PathBuf,
    range: SensorRange,
    config: EnvironmentConfig,
    stamp: Option<FileStamp>,
}

impl SettingsStore {
    /// Opens the store, falling back to defaults if the file does not exist.
    ///
    /// A file that exists but cannot be parsed or fails validation is an error.
    pub fn open<P: AsRef<Path>>(path: P, range: SensorRange) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let (config, stamp) = if path.exists() {
            let stamp = FileStamp::of(&path);
            (Self::read(&path, &range)?, stamp)
        } else {
            info!("No settings at {:?}, using defaults", path);
            (EnvironmentConfig::default(), None)
        };

        Ok(Self {
            path,
            range,
            config,
            stamp,
        })
    }

    /// Writes default settings to `path` without reading what is there.
    ///
    /// Recovers from a settings file that [`SettingsStore::open`] rejects.
    pub fn create<P: AsRef<Path>>(path: P, range: SensorRange) -> Result<Self> {
        let mut store = Self {
            path: path.as_ref().to_path_buf(),
            range,
            config: EnvironmentConfig::default(),
            stamp: None,
        };
        store.write(&EnvironmentConfig::default())?;
        info!("Wrote default settings to {:?}", store.path);
        Ok(store)
    }

    fn read(path: &Path, range: &SensorRange) -> Result<EnvironmentConfig> {
        let content = std::fs::read_to_string(path)?;
        let config: EnvironmentConfig = toml::from_str(&content)?;
        config.validate(range)?;
        Ok(config)
    }

    /// Returns the settings file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the sensor range settings are checked against.
    pub fn range(&self) -> &SensorRange {
        &self.range
    }

    /// Returns the current settings.
    pub fn config(&self) -> &EnvironmentConfig {
        &self.config
    }

    /// Reads one setting.
    pub fn get(&self, setting: Setting) -> SettingValue {
        self.config.get(setting)
    }

    /// Writes one setting and persists the store.
    ///
    /// On a rejected value neither memory nor disk is modified.
    pub fn set(&mut self, setting: Setting, raw: &str) -> Result<SettingValue> {
        let mut updated = self.config;
        let value = updated.set(setting, raw, &self.range)?;
        self.write(&updated)?;
        self.config = updated;
        info!("Setting {} = {}", setting, value);
        Ok(value)
    }

    /// Writes the whole configuration after validating it.
    pub fn replace(&mut self, config: EnvironmentConfig) -> Result<()> {
        config.validate(&self.range)?;
        self.write(&config)?;
        self.config = config;
        Ok(())
    }

    fn write(&mut self, config: &EnvironmentConfig) -> Result<()> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(dir)?;

        let content = toml::to_string_pretty(config)?;
        let mut file = NamedTempFile::new_in(dir)?;
        file.write_all(content.as_bytes())?;
        file.as_file().sync_all()?;
        file.persist(&self.path).map_err(|e| e.error)?;

        self.stamp = FileStamp::of(&self.path);
        Ok(())
    }

    /// Re-reads the file if it changed on disk.
    ///
    /// Returns `Ok(true)` if new settings were loaded. A file that fails to
    /// parse or validate leaves the current settings in force and is returned
    /// as an error once per edit.
    pub fn reload_if_changed(&mut self) -> Result<bool> {
        let stamp = FileStamp::of(&self.path);
        if stamp.is_none() || stamp == self.stamp {
            return Ok(false);
        }

        self.stamp = stamp;
        let config = Self::read(&self.path, &self.range)?;
        let changed = config != self.config;
        if changed {
            info!("Reloaded settings from {:?}", self.path);
        } else {
            debug!("Settings file touched, contents unchanged");
        }
        self.config = config;
        Ok(changed)
    }
}
