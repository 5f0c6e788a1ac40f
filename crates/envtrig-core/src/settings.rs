//! Bounded monitor settings.
//!
//! Each monitor has a threshold, an enable flag and a latch flag; the high and
//! low monitors of a signal share one hysteresis value. Settings are addressed
//! by the flat keys registered under [`crate::SETTINGS_NODE`] (`envhigh`,
//! `humlow_latch`, `envhyst`, ...) and every numeric key carries a range
//! derived from the sensor's representable span.

use crate::evaluator::MonitorId;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Default temperature high threshold (degrees celsius).
pub const TEMPERATURE_HIGH_DEFAULT: f64 = 45.0;
/// Default temperature low threshold (degrees celsius).
pub const TEMPERATURE_LOW_DEFAULT: f64 = 25.0;
/// Default temperature hysteresis (degrees celsius).
pub const TEMPERATURE_HYSTERESIS_DEFAULT: f64 = 5.0;
/// Default humidity high threshold (percent).
pub const HUMIDITY_HIGH_DEFAULT: f64 = 95.0;
/// Default humidity low threshold (percent).
pub const HUMIDITY_LOW_DEFAULT: f64 = 25.0;
/// Default humidity hysteresis (percent).
pub const HUMIDITY_HYSTERESIS_DEFAULT: f64 = 5.0;

/// Monitored signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Signal {
    Temperature,
    Humidity,
}

impl Signal {
    /// Both signals in evaluation order.
    pub const ALL: [Signal; 2] = [Signal::Temperature, Signal::Humidity];

    /// Prefix used by this signal's setting keys.
    pub fn key_prefix(&self) -> &'static str {
        match self {
            Signal::Temperature => "env",
            Signal::Humidity => "hum",
        }
    }
}

impl FromStr for Signal {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "temperature" | "temp" => Ok(Signal::Temperature),
            "humidity" | "hum" => Ok(Signal::Humidity),
            _ => Err(Error::InvalidSignal(s.to_string())),
        }
    }
}

impl std::fmt::Display for Signal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Signal::Temperature => write!(f, "temperature"),
            Signal::Humidity => write!(f, "humidity"),
        }
    }
}

/// Representable range of the attached sensor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SensorRange {
    /// Minimum temperature that can be measured
    #[serde(default = "default_min_temperature")]
    pub min_temperature: f64,

    /// Maximum temperature that can be measured
    #[serde(default = "default_max_temperature")]
    pub max_temperature: f64,

    /// Minimum humidity that can be measured
    #[serde(default = "default_min_humidity")]
    pub min_humidity: f64,

    /// Maximum humidity that can be measured
    #[serde(default = "default_max_humidity")]
    pub max_humidity: f64,
}

fn default_min_temperature() -> f64 {
    -40.0
}

fn default_max_temperature() -> f64 {
    150.0
}

fn default_min_humidity() -> f64 {
    0.0
}

fn default_max_humidity() -> f64 {
    100.0
}

impl Default for SensorRange {
    fn default() -> Self {
        Self {
            min_temperature: default_min_temperature(),
            max_temperature: default_max_temperature(),
            min_humidity: default_min_humidity(),
            max_humidity: default_max_humidity(),
        }
    }
}

impl SensorRange {
    /// Returns the (min, max) a signal can take.
    pub fn bounds(&self, signal: Signal) -> (f64, f64) {
        match signal {
            Signal::Temperature => (self.min_temperature, self.max_temperature),
            Signal::Humidity => (self.min_humidity, self.max_humidity),
        }
    }

    /// Returns the width of a signal's range. Upper bound for its hysteresis.
    pub fn span(&self, signal: Signal) -> f64 {
        let (min, max) = self.bounds(signal);
        max - min
    }

    /// Returns true if `value` is a finite reading inside the signal's range.
    pub fn contains(&self, signal: Signal, value: f64) -> bool {
        let (min, max) = self.bounds(signal);
        value.is_finite() && (min..=max).contains(&value)
    }
}

/// Settings for a single threshold monitor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MonitorSettings {
    /// Trigger threshold
    pub threshold: f64,

    /// Monitor is evaluated only while enabled
    pub enable: bool,

    /// Poll exposes the latch instead of the event count delta
    pub latch: bool,
}

fn default_latch() -> bool {
    true
}

impl MonitorSettings {
    /// Creates disabled, latching settings with the given threshold.
    pub fn new(threshold: f64) -> Self {
        Self {
            threshold,
            enable: false,
            latch: default_latch(),
        }
    }
}

/// Settings for the high and low monitors of one signal.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SignalSettings {
    /// Hysteresis shared by both monitors
    pub hysteresis: f64,

    pub high: MonitorSettings,
    pub low: MonitorSettings,
}

fn default_temperature() -> SignalSettings {
    SignalSettings {
        high: MonitorSettings::new(TEMPERATURE_HIGH_DEFAULT),
        low: MonitorSettings::new(TEMPERATURE_LOW_DEFAULT),
        hysteresis: TEMPERATURE_HYSTERESIS_DEFAULT,
    }
}

fn default_humidity() -> SignalSettings {
    SignalSettings {
        high: MonitorSettings::new(HUMIDITY_HIGH_DEFAULT),
        low: MonitorSettings::new(HUMIDITY_LOW_DEFAULT),
        hysteresis: HUMIDITY_HYSTERESIS_DEFAULT,
    }
}

/// All monitor settings.
///
/// Any key missing from a settings file takes its signal's default.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "SettingsFile")]
pub struct EnvironmentConfig {
    /// Temperature monitors
    pub temperature: SignalSettings,

    /// Humidity monitors
    pub humidity: SignalSettings,
}

impl Default for EnvironmentConfig {
    fn default() -> Self {
        Self {
            temperature: default_temperature(),
            humidity: default_humidity(),
        }
    }
}

/// Settings file layout with every key optional.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SettingsFile {
    temperature: SignalSection,
    humidity: SignalSection,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SignalSection {
    hysteresis: Option<f64>,
    high: MonitorSection,
    low: MonitorSection,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct MonitorSection {
    threshold: Option<f64>,
    enable: Option<bool>,
    latch: Option<bool>,
}

impl MonitorSection {
    fn or(self, defaults: MonitorSettings) -> MonitorSettings {
        MonitorSettings {
            threshold: self.threshold.unwrap_or(defaults.threshold),
            enable: self.enable.unwrap_or(defaults.enable),
            latch: self.latch.unwrap_or(defaults.latch),
        }
    }
}

impl SignalSection {
    fn or(self, defaults: SignalSettings) -> SignalSettings {
        SignalSettings {
            hysteresis: self.hysteresis.unwrap_or(defaults.hysteresis),
            high: self.high.or(defaults.high),
            low: self.low.or(defaults.low),
        }
    }
}

impl From<SettingsFile> for EnvironmentConfig {
    fn from(file: SettingsFile) -> Self {
        Self {
            temperature: file.temperature.or(default_temperature()),
            humidity: file.humidity.or(default_humidity()),
        }
    }
}

impl EnvironmentConfig {
    /// Returns the settings block for a signal.
    pub fn signal(&self, signal: Signal) -> &SignalSettings {
        match signal {
            Signal::Temperature => &self.temperature,
            Signal::Humidity => &self.humidity,
        }
    }

    fn signal_mut(&mut self, signal: Signal) -> &mut SignalSettings {
        match signal {
            Signal::Temperature => &mut self.temperature,
            Signal::Humidity => &mut self.humidity,
        }
    }

    /// Returns one monitor's settings.
    pub fn monitor(&self, id: MonitorId) -> &MonitorSettings {
        let signal = self.signal(id.signal());
        if id.is_high() {
            &signal.high
        } else {
            &signal.low
        }
    }

    fn monitor_mut(&mut self, id: MonitorId) -> &mut MonitorSettings {
        let signal = self.signal_mut(id.signal());
        if id.is_high() {
            &mut signal.high
        } else {
            &mut signal.low
        }
    }

    /// Returns the hysteresis shared by a signal's monitors.
    pub fn hysteresis(&self, signal: Signal) -> f64 {
        self.signal(signal).hysteresis
    }

    /// Reads a setting.
    pub fn get(&self, setting: Setting) -> SettingValue {
        match setting {
            Setting::Threshold(id) => SettingValue::Float(self.monitor(id).threshold),
            Setting::Enable(id) => SettingValue::Bool(self.monitor(id).enable),
            Setting::Latch(id) => SettingValue::Bool(self.monitor(id).latch),
            Setting::Hysteresis(signal) => SettingValue::Float(self.hysteresis(signal)),
        }
    }

    /// Parses and writes a setting.
    ///
    /// Nothing is modified if the value is malformed or outside its range.
    pub fn set(
        &mut self,
        setting: Setting,
        raw: &str,
        range: &SensorRange,
    ) -> Result<SettingValue> {
        let value = setting.parse_value(raw, range)?;
        match (setting, value) {
            (Setting::Threshold(id), SettingValue::Float(v)) => self.monitor_mut(id).threshold = v,
            (Setting::Enable(id), SettingValue::Bool(b)) => self.monitor_mut(id).enable = b,
            (Setting::Latch(id), SettingValue::Bool(b)) => self.monitor_mut(id).latch = b,
            (Setting::Hysteresis(signal), SettingValue::Float(v)) => {
                self.signal_mut(signal).hysteresis = v
            }
            _ => {
                return Err(Error::InvalidValue {
                    key: setting.key(),
                    value: raw.to_string(),
                })
            }
        }
        Ok(value)
    }

    /// Checks every numeric setting against its declared range.
    pub fn validate(&self, range: &SensorRange) -> Result<()> {
        for setting in Setting::all() {
            if let SettingValue::Float(value) = self.get(setting) {
                setting.check_range(value, range)?;
            }
        }
        Ok(())
    }
}

/// Value of a named setting.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SettingValue {
    Float(f64),
    Bool(bool),
}

impl std::fmt::Display for SettingValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SettingValue::Float(v) => write!(f, "{}", v),
            SettingValue::Bool(b) => write!(f, "{}", b),
        }
    }
}

/// A named, bounded setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Setting {
    /// `envhigh`, `envlow`, `humhigh`, `humlow`
    Threshold(MonitorId),
    /// `<monitor>_en`
    Enable(MonitorId),
    /// `<monitor>_latch`
    Latch(MonitorId),
    /// `envhyst`, `humhyst`
    Hysteresis(Signal),
}

impl Setting {
    /// Every setting, in registration order.
    pub fn all() -> Vec<Setting> {
        let mut settings = Vec::with_capacity(14);
        for signal in Signal::ALL {
            for id in MonitorId::ALL.into_iter().filter(|id| id.signal() == signal) {
                settings.push(Setting::Threshold(id));
                settings.push(Setting::Enable(id));
                settings.push(Setting::Latch(id));
            }
            settings.push(Setting::Hysteresis(signal));
        }
        settings
    }

    /// Returns the flat key this setting is registered under.
    pub fn key(&self) -> String {
        match self {
            Setting::Threshold(id) => id.key_prefix(),
            Setting::Enable(id) => format!("{}_en", id.key_prefix()),
            Setting::Latch(id) => format!("{}_latch", id.key_prefix()),
            Setting::Hysteresis(signal) => format!("{}hyst", signal.key_prefix()),
        }
    }

    /// Returns the declared (min, max) of a numeric setting, or `None` for flags.
    pub fn range(&self, range: &SensorRange) -> Option<(f64, f64)> {
        match self {
            Setting::Threshold(id) => Some(range.bounds(id.signal())),
            Setting::Hysteresis(signal) => Some((0.0, range.span(*signal))),
            Setting::Enable(_) | Setting::Latch(_) => None,
        }
    }

    /// Returns the signal this setting belongs to.
    pub fn signal(&self) -> Signal {
        match self {
            Setting::Threshold(id) | Setting::Enable(id) | Setting::Latch(id) => id.signal(),
            Setting::Hysteresis(signal) => *signal,
        }
    }

    /// Returns true for boolean settings.
    pub fn is_flag(&self) -> bool {
        matches!(self, Setting::Enable(_) | Setting::Latch(_))
    }

    fn check_range(&self, value: f64, range: &SensorRange) -> Result<()> {
        if let Some((min, max)) = self.range(range) {
            if !(min..=max).contains(&value) {
                return Err(Error::OutOfRange {
                    key: self.key(),
                    value,
                    min,
                    max,
                });
            }
        }
        Ok(())
    }

    /// Parses a raw value for this setting and checks its range.
    pub fn parse_value(&self, raw: &str, range: &SensorRange) -> Result<SettingValue> {
        let invalid = || Error::InvalidValue {
            key: self.key(),
            value: raw.to_string(),
        };
        let raw_trimmed = raw.trim();

        if self.is_flag() {
            return match raw_trimmed.to_lowercase().as_str() {
                "true" | "1" | "on" => Ok(SettingValue::Bool(true)),
                "false" | "0" | "off" => Ok(SettingValue::Bool(false)),
                _ => Err(invalid()),
            };
        }

        let value: f64 = raw_trimmed.parse().map_err(|_| invalid())?;
        if !value.is_finite() {
            return Err(invalid());
        }
        self.check_range(value, range)?;
        Ok(SettingValue::Float(value))
    }
}

impl FromStr for Setting {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let key = s.trim().to_lowercase();
        Setting::all()
            .into_iter()
            .find(|setting| setting.key() == key)
            .ok_or_else(|| Error::UnknownSetting(s.to_string()))
    }
}

impl std::fmt::Display for Setting {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.key())
    }
}
