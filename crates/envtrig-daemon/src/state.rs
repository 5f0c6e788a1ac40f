//! Daemon state: settings, sensor, evaluator and publisher driven once per tick.

use anyhow::{Context, Result};
use envtrig_core::{Environment, Evaluator, EventReport, MonitorId, SettingsStore};
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::publish::{PublishRecord, Publisher};
use crate::sensors::{self, EnvironmentSensor, ValidatedSensor};
use crate::throttle::ErrorThrottle;

/// Application state owned by the tick loop.
pub struct AppState {
    store: SettingsStore,
    sensor: ValidatedSensor,
    evaluator: Evaluator,
    publisher: Publisher,
    sensor_errors: ErrorThrottle,
    settings_errors: ErrorThrottle,
}

impl AppState {
    /// Creates the state from configuration.
    pub fn new(config: &Config) -> Result<Self> {
        let sensor = sensors::create_sensor(&config.sensor);
        Self::with_sensor(config, sensor)
    }

    /// Creates the state around an existing sensor.
    pub fn with_sensor(config: &Config, sensor: Box<dyn EnvironmentSensor>) -> Result<Self> {
        let store = SettingsStore::open(&config.settings, config.range)
            .with_context(|| format!("Failed to load settings from {}", config.settings))?;
        let sensor = ValidatedSensor::new(sensor, config.range);
        info!("Using sensor: {}", sensor.name());

        for id in MonitorId::ALL {
            let settings = store.config().monitor(id);
            info!(
                "Monitor {}: threshold {}, enabled {}, latch {}",
                id, settings.threshold, settings.enable, settings.latch
            );
        }

        Ok(Self {
            store,
            sensor,
            evaluator: Evaluator::new(),
            publisher: Publisher::new(),
            sensor_errors: ErrorThrottle::new("Sensor"),
            settings_errors: ErrorThrottle::new("Settings"),
        })
    }

    /// Runs one evaluation tick and polls for events.
    ///
    /// Returns the publish record emitted this tick, if any.
    pub fn tick(&mut self) -> Option<PublishRecord> {
        match self.store.reload_if_changed() {
            Ok(_) => self.settings_errors.ok(),
            Err(e) => {
                let path = self.store.path().display();
                self.settings_errors.error(&format!("ignoring {}: {}", path, e));
            }
        }

        let sample = self.sample()?;
        let config = *self.store.config();
        self.evaluator.tick(&sample, &config);
        let report = self.evaluator.poll_all(&config);
        self.publish(&report, &sample)
    }

    fn sample(&mut self) -> Option<Environment> {
        match self.sensor.sample() {
            Ok(sample) => {
                self.sensor_errors.ok();
                Some(sample)
            }
            Err((e, fallback)) => {
                self.sensor_errors.error(&e);
                if fallback.is_none() {
                    debug!("No sample available yet, skipping tick");
                }
                fallback
            }
        }
    }

    fn publish(&mut self, report: &EventReport, sample: &Environment) -> Option<PublishRecord> {
        let record = PublishRecord::from_report(report, sample)?;
        if let Err(e) = self.publisher.publish(&record) {
            warn!("Failed to publish {:?}: {}", record.reasons, e);
        }
        debug!("{} publishes since start", self.publisher.published());
        Some(record)
    }

    #[cfg(test)]
    pub fn evaluator(&self) -> &Evaluator {
        &self.evaluator
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use envtrig_core::{MonitorState, Setting};
    use std::sync::{Arc, Mutex};

    /// Sensor fed from a shared slot so tests can change readings between ticks.
    struct SlotSensor(Arc<Mutex<anyhow::Result<Environment>>>);

    impl EnvironmentSensor for SlotSensor {
        fn name(&self) -> &str {
            "slot"
        }

        fn read(&mut self) -> anyhow::Result<Environment> {
            match &*self.0.lock().unwrap() {
                Ok(env) => Ok(*env),
                Err(e) => Err(anyhow::anyhow!("{}", e)),
            }
        }
    }

    type Slot = Arc<Mutex<anyhow::Result<Environment>>>;

    fn setup(dir: &tempfile::TempDir) -> (AppState, Slot, Config) {
        let config = Config {
            settings: dir
                .path()
                .join("env_trig.toml")
                .to_string_lossy()
                .into_owned(),
            ..Config::default()
        };
        let slot: Slot = Arc::new(Mutex::new(Ok(Environment::new(20.0, 50.0))));
        let state = AppState::with_sensor(&config, Box::new(SlotSensor(slot.clone()))).unwrap();
        (state, slot, config)
    }

    fn enable(config: &Config, setting: &str, value: &str) {
        let mut store = SettingsStore::open(&config.settings, config.range).unwrap();
        store.set(setting.parse::<Setting>().unwrap(), value).unwrap();
    }

    #[test]
    fn test_publish_on_threshold_crossing() {
        let dir = tempfile::tempdir().unwrap();
        let (mut state, slot, config) = setup(&dir);
        enable(&config, "envhigh_en", "true");
        enable(&config, "envhigh_latch", "false");

        assert!(state.tick().is_none());
        *slot.lock().unwrap() = Ok(Environment::new(46.0, 50.0));
        let record = state.tick().unwrap();
        assert_eq!(record.reasons, vec!["envtemp_h"]);
        assert_eq!(record.env_t, 46.0);

        // Count mode: the event is reported once.
        assert!(state.tick().is_none());
    }

    #[test]
    fn test_latch_mode_publishes_until_released() {
        let dir = tempfile::tempdir().unwrap();
        let (mut state, slot, config) = setup(&dir);
        enable(&config, "humlow_en", "true");

        *slot.lock().unwrap() = Ok(Environment::new(20.0, 20.0));
        assert!(state.tick().is_some());
        *slot.lock().unwrap() = Ok(Environment::new(20.0, 28.0));
        assert!(state.tick().is_some());
        *slot.lock().unwrap() = Ok(Environment::new(20.0, 31.0));
        assert!(state.tick().is_none());
    }

    #[test]
    fn test_broken_settings_edit_keeps_previous_settings() {
        let dir = tempfile::tempdir().unwrap();
        let (mut state, slot, config) = setup(&dir);
        enable(&config, "envhigh_en", "true");
        assert!(state.tick().is_none());

        std::fs::write(&config.settings, "not = [valid").unwrap();
        *slot.lock().unwrap() = Ok(Environment::new(46.0, 50.0));
        assert!(state.tick().is_some());
        assert!(state.tick().is_some());
        assert!(state.settings_errors.error(&"next"));
    }

    #[test]
    fn test_sensor_failure_uses_last_good_sample() {
        let dir = tempfile::tempdir().unwrap();
        let (mut state, slot, config) = setup(&dir);
        enable(&config, "envhigh_en", "true");

        *slot.lock().unwrap() = Err(anyhow::anyhow!("bus error"));
        assert!(state.tick().is_none());
        assert_eq!(
            state.evaluator().monitor(MonitorId::TemperatureHigh).state(),
            MonitorState::Unknown
        );

        *slot.lock().unwrap() = Ok(Environment::new(50.0, 50.0));
        assert!(state.tick().is_some());
        *slot.lock().unwrap() = Err(anyhow::anyhow!("bus error"));
        // Last good sample keeps the monitor outside; latch still reported.
        assert!(state.tick().is_some());
        assert_eq!(
            state.evaluator().monitor(MonitorId::TemperatureHigh).event_count(),
            1
        );
    }
}
