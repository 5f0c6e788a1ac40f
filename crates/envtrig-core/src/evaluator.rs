//! Evaluation of environment samples against all four monitors.

use crate::monitor::{Direction, MonitorPoller, ThresholdMonitor};
use crate::settings::{EnvironmentConfig, Signal};
use serde::{Deserialize, Serialize};

/// One environment sample.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Environment {
    /// Temperature in the sensor's native scale (degrees)
    pub temperature: f64,
    /// Relative humidity in percent
    pub humidity: f64,
}

impl Environment {
    /// Creates a sample.
    pub fn new(temperature: f64, humidity: f64) -> Self {
        Self {
            temperature,
            humidity,
        }
    }

    /// Returns the reading for a signal.
    pub fn value(&self, signal: Signal) -> f64 {
        match signal {
            Signal::Temperature => self.temperature,
            Signal::Humidity => self.humidity,
        }
    }
}

/// Identifies one of the four monitors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MonitorId {
    TemperatureHigh,
    TemperatureLow,
    HumidityHigh,
    HumidityLow,
}

impl MonitorId {
    /// All monitors in polling order.
    pub const ALL: [MonitorId; 4] = [
        MonitorId::TemperatureHigh,
        MonitorId::TemperatureLow,
        MonitorId::HumidityHigh,
        MonitorId::HumidityLow,
    ];

    /// Returns the monitored signal.
    pub fn signal(&self) -> Signal {
        match self {
            MonitorId::TemperatureHigh | MonitorId::TemperatureLow => Signal::Temperature,
            MonitorId::HumidityHigh | MonitorId::HumidityLow => Signal::Humidity,
        }
    }

    /// Returns the monitor direction.
    pub fn direction(&self) -> Direction {
        if self.is_high() {
            Direction::High
        } else {
            Direction::Low
        }
    }

    /// Returns true for high-side monitors.
    pub fn is_high(&self) -> bool {
        matches!(self, MonitorId::TemperatureHigh | MonitorId::HumidityHigh)
    }

    /// Returns the reason tag attached to publishes this monitor triggers.
    pub fn reason(&self) -> &'static str {
        match self {
            MonitorId::TemperatureHigh => "envtemp_h",
            MonitorId::TemperatureLow => "envtemp_l",
            MonitorId::HumidityHigh => "envhum_h",
            MonitorId::HumidityLow => "envhum_l",
        }
    }

    /// Returns the setting key prefix (`envhigh`, `humlow`, ...).
    pub fn key_prefix(&self) -> String {
        format!("{}{}", self.signal().key_prefix(), self.direction())
    }

    fn index(&self) -> usize {
        match self {
            MonitorId::TemperatureHigh => 0,
            MonitorId::TemperatureLow => 1,
            MonitorId::HumidityHigh => 2,
            MonitorId::HumidityLow => 3,
        }
    }
}

impl std::fmt::Display for MonitorId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", self.signal(), self.direction())
    }
}

/// Poll results for all four monitors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct EventReport {
    pub temperature_high: usize,
    pub temperature_low: usize,
    pub humidity_high: usize,
    pub humidity_low: usize,
}

impl EventReport {
    /// Returns the result for one monitor.
    pub fn get(&self, id: MonitorId) -> usize {
        match id {
            MonitorId::TemperatureHigh => self.temperature_high,
            MonitorId::TemperatureLow => self.temperature_low,
            MonitorId::HumidityHigh => self.humidity_high,
            MonitorId::HumidityLow => self.humidity_low,
        }
    }

    /// Returns the monitors that reported a non-zero result.
    pub fn triggers(&self) -> Vec<MonitorId> {
        MonitorId::ALL
            .into_iter()
            .filter(|id| self.get(*id) != 0)
            .collect()
    }

    /// Returns true if no monitor reported anything.
    pub fn is_empty(&self) -> bool {
        self.triggers().is_empty()
    }
}

/// Owns the four monitors and feeds them each sample.
#[derive(Debug)]
pub struct Evaluator {
    monitors: [ThresholdMonitor; 4],
}

impl Default for Evaluator {
    fn default() -> Self {
        Self::new()
    }
}

impl Evaluator {
    /// Creates four monitors in the `Unknown` state.
    pub fn new() -> Self {
        Self {
            monitors: MonitorId::ALL.map(|id| ThresholdMonitor::new(id.direction())),
        }
    }

    /// Feeds one sample to every monitor using the current settings.
    pub fn tick(&mut self, sample: &Environment, config: &EnvironmentConfig) {
        for id in MonitorId::ALL {
            let signal = id.signal();
            self.monitors[id.index()].evaluate(
                sample.value(signal),
                config.monitor(id),
                config.hysteresis(signal),
            );
        }
    }

    /// Returns a monitor for inspection.
    pub fn monitor(&self, id: MonitorId) -> &ThresholdMonitor {
        &self.monitors[id.index()]
    }

    /// Returns a poller for one monitor that can be moved to another thread.
    pub fn poller(&self, id: MonitorId) -> MonitorPoller {
        self.monitors[id.index()].poller()
    }

    /// Polls one monitor, honouring its latch setting.
    pub fn poll(&mut self, id: MonitorId, config: &EnvironmentConfig) -> usize {
        let latch_mode = config.monitor(id).latch;
        self.monitors[id.index()].poll_events(latch_mode)
    }

    pub fn poll_temperature_high(&mut self, config: &EnvironmentConfig) -> usize {
        self.poll(MonitorId::TemperatureHigh, config)
    }

    pub fn poll_temperature_low(&mut self, config: &EnvironmentConfig) -> usize {
        self.poll(MonitorId::TemperatureLow, config)
    }

    pub fn poll_humidity_high(&mut self, config: &EnvironmentConfig) -> usize {
        self.poll(MonitorId::HumidityHigh, config)
    }

    pub fn poll_humidity_low(&mut self, config: &EnvironmentConfig) -> usize {
        self.poll(MonitorId::HumidityLow, config)
    }

    /// Polls all four monitors.
    pub fn poll_all(&mut self, config: &EnvironmentConfig) -> EventReport {
        EventReport {
            temperature_high: self.poll_temperature_high(config),
            temperature_low: self.poll_temperature_low(config),
            humidity_high: self.poll_humidity_high(config),
            humidity_low: self.poll_humidity_low(config),
        }
    }
}
