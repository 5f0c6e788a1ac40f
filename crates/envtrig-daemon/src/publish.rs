//! Publish triggers raised by threshold events.

use envtrig_core::{Environment, EventReport};
use serde::Serialize;
use tracing::info;

/// A publish request with the readings that accompany it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PublishRecord {
    /// Reason tags of the monitors that reported
    pub reasons: Vec<&'static str>,
    /// Temperature at the time of the trigger
    pub env_t: f64,
    /// Humidity at the time of the trigger
    pub env_h: f64,
}

impl PublishRecord {
    /// Builds a record if any monitor reported a non-zero result.
    pub fn from_report(report: &EventReport, sample: &Environment) -> Option<Self> {
        let reasons: Vec<&'static str> = report.triggers().iter().map(|id| id.reason()).collect();
        if reasons.is_empty() {
            return None;
        }
        Some(Self {
            reasons,
            env_t: sample.temperature,
            env_h: sample.humidity,
        })
    }
}

/// Emits publish records.
///
/// Transport is handled elsewhere; records are written to the log as JSON.
#[derive(Debug, Default)]
pub struct Publisher {
    published: u64,
}

impl Publisher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publishes a record.
    pub fn publish(&mut self, record: &PublishRecord) -> serde_json::Result<()> {
        let payload = serde_json::to_string(record)?;
        self.published += 1;
        info!(target: "envtrig::publish", "Publish triggered: {}", payload);
        Ok(())
    }

    /// Returns the number of records published so far.
    pub fn published(&self) -> u64 {
        self.published
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_record_without_events() {
        let report = EventReport::default();
        assert!(PublishRecord::from_report(&report, &Environment::new(20.0, 50.0)).is_none());
    }

    #[test]
    fn test_record_carries_reasons_and_readings() {
        let report = EventReport {
            temperature_high: 1,
            humidity_low: 2,
            ..Default::default()
        };
        let record = PublishRecord::from_report(&report, &Environment::new(47.5, 12.0)).unwrap();
        assert_eq!(record.reasons, vec!["envtemp_h", "envhum_l"]);

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "reasons": ["envtemp_h", "envhum_l"],
                "env_t": 47.5,
                "env_h": 12.0,
            })
        );

        let mut publisher = Publisher::new();
        publisher.publish(&record).unwrap();
        assert_eq!(publisher.published(), 1);
    }
}
