//! Environment Trigger Core
//!
//! Evaluates periodic temperature and humidity readings against high/low
//! thresholds with hysteresis and accounts for the resulting crossing events.

pub mod counter;
pub mod error;
pub mod evaluator;
pub mod monitor;
pub mod settings;
pub mod store;

pub use counter::{EventCounter, EventCounterHandle};
pub use error::{Error, Result};
pub use evaluator::{Environment, EventReport, Evaluator, MonitorId};
pub use monitor::{Direction, MonitorPoller, MonitorState, ThresholdMonitor};
pub use settings::{
    EnvironmentConfig, MonitorSettings, SensorRange, Setting, SettingValue, Signal,
};
pub use store::{SettingsStore, DEFAULT_SETTINGS_PATH};

/// Name of the settings node all monitor settings are registered under.
pub const SETTINGS_NODE: &str = "env_trig";
