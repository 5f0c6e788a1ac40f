//! Environment sensor sources.
//!
//! Readings are validated against the sensor range; a failed or implausible
//! read falls back to the last good sample.

mod file;
mod hwmon;

pub use file::FileSensor;
pub use hwmon::HwmonSensor;

use anyhow::{bail, Result};
use envtrig_core::{Environment, SensorRange, Signal};
use tracing::debug;

use crate::config::{SensorConfig, SensorKind};

/// Trait for environment sensors.
pub trait EnvironmentSensor: Send {
    /// Returns the sensor name.
    fn name(&self) -> &str;

    /// Reads the current temperature and humidity.
    fn read(&mut self) -> Result<Environment>;
}

/// Creates the sensor described by the configuration.
pub fn create_sensor(config: &SensorConfig) -> Box<dyn EnvironmentSensor> {
    match config.kind {
        SensorKind::Hwmon => Box::new(HwmonSensor::new(&config.path)),
        SensorKind::File => Box::new(FileSensor::new(&config.path)),
    }
}

/// Range-checking wrapper that remembers the last good sample.
pub struct ValidatedSensor {
    inner: Box<dyn EnvironmentSensor>,
    range: SensorRange,
    last_good: Option<Environment>,
}

impl ValidatedSensor {
    /// Wraps a sensor.
    pub fn new(inner: Box<dyn EnvironmentSensor>, range: SensorRange) -> Self {
        Self {
            inner,
            range,
            last_good: None,
        }
    }

    /// Returns the wrapped sensor's name.
    pub fn name(&self) -> &str {
        self.inner.name()
    }

    /// Reads and validates a sample.
    ///
    /// On success the sample becomes the new last-good value. On failure the
    /// error is returned together with the last good sample, if any.
    pub fn sample(
        &mut self,
    ) -> std::result::Result<Environment, (anyhow::Error, Option<Environment>)> {
        match self.inner.read().and_then(|env| self.check(env)) {
            Ok(env) => {
                debug!(
                    "{}: temperature {:.2}, humidity {:.2}",
                    self.inner.name(),
                    env.temperature,
                    env.humidity
                );
                self.last_good = Some(env);
                Ok(env)
            }
            Err(e) => Err((e, self.last_good)),
        }
    }

    fn check(&self, env: Environment) -> Result<Environment> {
        for signal in Signal::ALL {
            let value = env.value(signal);
            if !self.range.contains(signal, value) {
                let (min, max) = self.range.bounds(signal);
                bail!("{} reading {} outside {} to {}", signal, value, min, max);
            }
        }
        Ok(env)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    struct ScriptedSensor {
        readings: VecDeque<Result<Environment>>,
    }

    impl EnvironmentSensor for ScriptedSensor {
        fn name(&self) -> &str {
            "scripted"
        }

        fn read(&mut self) -> Result<Environment> {
            self.readings
                .pop_front()
                .unwrap_or_else(|| Err(anyhow::anyhow!("exhausted")))
        }
    }

    fn validated(readings: Vec<Result<Environment>>) -> ValidatedSensor {
        ValidatedSensor::new(
            Box::new(ScriptedSensor {
                readings: readings.into(),
            }),
            SensorRange::default(),
        )
    }

    #[test]
    fn test_failure_before_first_good_sample() {
        let mut sensor = validated(vec![Err(anyhow::anyhow!("bus error"))]);
        let (_, fallback) = sensor.sample().unwrap_err();
        assert!(fallback.is_none());
    }

    #[test]
    fn test_failure_falls_back_to_last_good() {
        let good = Environment::new(21.0, 40.0);
        let mut sensor = validated(vec![Ok(good), Err(anyhow::anyhow!("bus error"))]);

        assert_eq!(sensor.sample().unwrap(), good);
        let (_, fallback) = sensor.sample().unwrap_err();
        assert_eq!(fallback, Some(good));
    }

    #[test]
    fn test_out_of_range_reading_is_rejected() {
        let good = Environment::new(21.0, 40.0);
        let mut sensor = validated(vec![
            Ok(good),
            Ok(Environment::new(21.0, 130.0)),
            Ok(Environment::new(f64::NAN, 40.0)),
        ]);

        sensor.sample().unwrap();
        for _ in 0..2 {
            let (err, fallback) = sensor.sample().unwrap_err();
            assert!(err.to_string().contains("outside"));
            assert_eq!(fallback, Some(good));
        }
    }
}
