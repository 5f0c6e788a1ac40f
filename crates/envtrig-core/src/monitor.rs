//! Threshold monitor with hysteresis.
//!
//! A high-side monitor fires when the value rises to the threshold `T` and
//! re-arms only after the value has fallen to `T - H`. A low-side monitor is
//! the mirror image: it fires at or below `T` and re-arms at `T + H`.
//!
//! The intermediate `InsideLimit` state keeps a value hovering around `T`
//! from being counted more than once per excursion.

use crate::counter::{EventCounter, EventCounterHandle};
use crate::settings::MonitorSettings;
use crate::{Error, Result};
use std::str::FromStr;
use tracing::debug;

/// Which side of the threshold counts as outside.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Outside when the value is at or above the threshold.
    High,
    /// Outside when the value is at or below the threshold.
    Low,
}

impl Direction {
    /// Returns true if `value` is at or past the threshold.
    fn outside(&self, value: f64, threshold: f64) -> bool {
        match self {
            Direction::High => value >= threshold,
            Direction::Low => value <= threshold,
        }
    }

    /// Returns true if `value` has retreated through the hysteresis band.
    fn released(&self, value: f64, threshold: f64, hysteresis: f64) -> bool {
        match self {
            Direction::High => value <= threshold - hysteresis,
            Direction::Low => value >= threshold + hysteresis,
        }
    }
}

impl FromStr for Direction {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "high" => Ok(Direction::High),
            "low" => Ok(Direction::Low),
            _ => Err(Error::InvalidDirection(s.to_string())),
        }
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Direction::High => write!(f, "high"),
            Direction::Low => write!(f, "low"),
        }
    }
}

/// Monitor state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MonitorState {
    /// Not yet evaluated. Behaves as `Normal`.
    #[default]
    Unknown,
    /// Armed: not outside and not waiting on the hysteresis band.
    Normal,
    /// Value is past the threshold.
    OutsideLimit,
    /// Value is back inside the threshold but has not cleared the band.
    InsideLimit,
}

impl std::fmt::Display for MonitorState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MonitorState::Unknown => write!(f, "unknown"),
            MonitorState::Normal => write!(f, "normal"),
            MonitorState::OutsideLimit => write!(f, "outside"),
            MonitorState::InsideLimit => write!(f, "inside"),
        }
    }
}

/// One (signal, direction) threshold monitor.
#[derive(Debug)]
pub struct ThresholdMonitor {
    direction: Direction,
    state: MonitorState,
    counter: EventCounter,
    last_reported: usize,
}

impl ThresholdMonitor {
    /// Creates a monitor in the `Unknown` state with no events.
    pub fn new(direction: Direction) -> Self {
        Self {
            direction,
            state: MonitorState::Unknown,
            counter: EventCounter::new(),
            last_reported: 0,
        }
    }

    /// Returns the monitor direction.
    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Returns the current state.
    pub fn state(&self) -> MonitorState {
        self.state
    }

    /// Returns the total number of events since creation.
    pub fn event_count(&self) -> usize {
        self.counter.events()
    }

    /// Returns the latch.
    pub fn latch(&self) -> bool {
        self.counter.latch()
    }

    /// Returns a poller with its own reporting snapshot, usable from another thread.
    pub fn poller(&self) -> MonitorPoller {
        MonitorPoller::new(self.counter.handle())
    }

    /// Evaluates one sample.
    ///
    /// Does nothing while the monitor is disabled.
    pub fn evaluate(&mut self, value: f64, settings: &MonitorSettings, hysteresis: f64) {
        if !settings.enable {
            return;
        }

        let threshold = settings.threshold;
        let current = match self.state {
            MonitorState::Unknown => MonitorState::Normal,
            state => state,
        };

        let next = match current {
            MonitorState::Normal if self.direction.outside(value, threshold) => {
                self.counter.record();
                MonitorState::OutsideLimit
            }
            MonitorState::OutsideLimit if !self.direction.outside(value, threshold) => {
                MonitorState::InsideLimit
            }
            MonitorState::InsideLimit if self.direction.released(value, threshold, hysteresis) => {
                self.counter.clear_latch();
                MonitorState::Normal
            }
            MonitorState::InsideLimit if self.direction.outside(value, threshold) => {
                MonitorState::OutsideLimit
            }
            state => state,
        };

        if next != current {
            debug!(
                "{} monitor {} -> {} (value {}, threshold {}, hysteresis {})",
                self.direction, current, next, value, threshold, hysteresis
            );
        }
        self.state = next;
    }

    /// Polls for events.
    ///
    /// In latch mode returns the latch as 0 or 1 and has no side effect.
    /// Otherwise returns the events recorded since the previous count-mode
    /// poll and advances the snapshot.
    pub fn poll_events(&mut self, latch_mode: bool) -> usize {
        poll(&self.counter.handle(), &mut self.last_reported, latch_mode)
    }
}

/// Poll-side view of a monitor that keeps its own reporting snapshot.
#[derive(Debug, Clone)]
pub struct MonitorPoller {
    counter: EventCounterHandle,
    last_reported: usize,
}

impl MonitorPoller {
    fn new(counter: EventCounterHandle) -> Self {
        // Events recorded before the poller existed are reported on first poll.
        Self {
            counter,
            last_reported: 0,
        }
    }

    /// Same contract as [`ThresholdMonitor::poll_events`].
    pub fn poll_events(&mut self, latch_mode: bool) -> usize {
        poll(&self.counter, &mut self.last_reported, latch_mode)
    }
}

fn poll(counter: &EventCounterHandle, last_reported: &mut usize, latch_mode: bool) -> usize {
    if latch_mode {
        return usize::from(counter.latch());
    }
    let captured = counter.events();
    let delta = captured.wrapping_sub(*last_reported);
    *last_reported = captured;
    delta
}

#[cfg(test)]
mod tests {
    use super::*;

    fn enabled(threshold: f64, latch: bool) -> MonitorSettings {
        MonitorSettings {
            threshold,
            enable: true,
            latch,
        }
    }

    fn feed(monitor: &mut ThresholdMonitor, settings: &MonitorSettings, h: f64, values: &[f64]) {
        for &v in values {
            monitor.evaluate(v, settings, h);
        }
    }

    #[test]
    fn test_unknown_normalizes_on_first_evaluation() {
        let mut monitor = ThresholdMonitor::new(Direction::High);
        assert_eq!(monitor.state(), MonitorState::Unknown);
        monitor.evaluate(10.0, &enabled(45.0, false), 5.0);
        assert_eq!(monitor.state(), MonitorState::Normal);
    }

    #[test]
    fn test_unknown_can_fire_on_first_evaluation() {
        let mut monitor = ThresholdMonitor::new(Direction::High);
        monitor.evaluate(50.0, &enabled(45.0, false), 5.0);
        assert_eq!(monitor.state(), MonitorState::OutsideLimit);
        assert_eq!(monitor.event_count(), 1);
        assert!(monitor.latch());
    }

    #[test]
    fn test_high_sweep_counts_once() {
        let settings = enabled(45.0, false);
        let mut monitor = ThresholdMonitor::new(Direction::High);

        monitor.evaluate(40.0, &settings, 5.0);
        assert_eq!(monitor.event_count(), 0);
        monitor.evaluate(46.0, &settings, 5.0);
        assert_eq!(monitor.event_count(), 1);
        assert_eq!(monitor.state(), MonitorState::OutsideLimit);
        monitor.evaluate(44.0, &settings, 5.0);
        assert_eq!(monitor.state(), MonitorState::InsideLimit);
        monitor.evaluate(41.0, &settings, 5.0);
        assert_eq!(monitor.state(), MonitorState::InsideLimit);
        assert!(monitor.latch());
        monitor.evaluate(39.0, &settings, 5.0);
        assert_eq!(monitor.state(), MonitorState::Normal);
        assert!(!monitor.latch());

        assert_eq!(monitor.event_count(), 1);
        assert_eq!(monitor.poll_events(false), 1);
        assert_eq!(monitor.poll_events(false), 0);
    }

    #[test]
    fn test_release_boundary_is_inclusive() {
        let settings = enabled(45.0, false);
        let mut monitor = ThresholdMonitor::new(Direction::High);
        feed(&mut monitor, &settings, 5.0, &[46.0, 44.0, 40.0]);
        assert_eq!(monitor.state(), MonitorState::Normal);
    }

    #[test]
    fn test_hovering_inside_band_does_not_recount() {
        let settings = enabled(45.0, false);
        let mut monitor = ThresholdMonitor::new(Direction::High);

        feed(
            &mut monitor,
            &settings,
            5.0,
            &[40.0, 46.0, 44.9, 45.0, 42.0, 47.0, 43.0, 45.0],
        );
        assert_eq!(monitor.event_count(), 1);
        assert_eq!(monitor.state(), MonitorState::OutsideLimit);
        assert!(monitor.latch());
    }

    #[test]
    fn test_rearm_after_release() {
        let settings = enabled(45.0, false);
        let mut monitor = ThresholdMonitor::new(Direction::High);

        feed(
            &mut monitor,
            &settings,
            5.0,
            &[46.0, 39.0, 39.0, 46.0, 30.0, 30.0, 45.0],
        );
        assert_eq!(monitor.event_count(), 3);
        assert_eq!(monitor.poll_events(false), 3);
    }

    #[test]
    fn test_zero_hysteresis() {
        let settings = enabled(45.0, false);
        let mut monitor = ThresholdMonitor::new(Direction::High);

        feed(&mut monitor, &settings, 0.0, &[45.0, 44.0, 44.0]);
        assert_eq!(monitor.state(), MonitorState::Normal);
        monitor.evaluate(45.0, &settings, 0.0);
        assert_eq!(monitor.event_count(), 2);
    }

    #[test]
    fn test_low_side_mirror() {
        let settings = enabled(25.0, true);
        let mut monitor = ThresholdMonitor::new(Direction::Low);

        monitor.evaluate(30.0, &settings, 5.0);
        assert_eq!(monitor.state(), MonitorState::Normal);
        monitor.evaluate(20.0, &settings, 5.0);
        assert_eq!(monitor.state(), MonitorState::OutsideLimit);
        assert!(monitor.latch());
        monitor.evaluate(28.0, &settings, 5.0);
        assert_eq!(monitor.state(), MonitorState::InsideLimit);
        assert_eq!(monitor.poll_events(true), 1);
        monitor.evaluate(25.0, &settings, 5.0);
        assert_eq!(monitor.state(), MonitorState::OutsideLimit);
        monitor.evaluate(29.9, &settings, 5.0);
        assert_eq!(monitor.state(), MonitorState::InsideLimit);
        monitor.evaluate(31.0, &settings, 5.0);
        assert_eq!(monitor.state(), MonitorState::Normal);
        assert!(!monitor.latch());
        assert_eq!(monitor.poll_events(true), 0);
        assert_eq!(monitor.event_count(), 1);
    }

    #[test]
    fn test_disabled_is_inert() {
        let mut settings = enabled(45.0, false);
        let mut monitor = ThresholdMonitor::new(Direction::High);

        settings.enable = false;
        feed(&mut monitor, &settings, 5.0, &[50.0, 10.0, 60.0]);
        assert_eq!(monitor.state(), MonitorState::Unknown);
        assert_eq!(monitor.event_count(), 0);
        assert!(!monitor.latch());

        settings.enable = true;
        monitor.evaluate(50.0, &settings, 5.0);
        assert_eq!(monitor.state(), MonitorState::OutsideLimit);

        // Disabling freezes the state without clearing counters or latch.
        settings.enable = false;
        feed(&mut monitor, &settings, 5.0, &[0.0, 0.0]);
        assert_eq!(monitor.state(), MonitorState::OutsideLimit);
        assert_eq!(monitor.event_count(), 1);
        assert!(monitor.latch());
    }

    #[test]
    fn test_latch_poll_is_idempotent() {
        let settings = enabled(45.0, true);
        let mut monitor = ThresholdMonitor::new(Direction::High);
        monitor.evaluate(50.0, &settings, 5.0);

        assert_eq!(monitor.poll_events(true), 1);
        assert_eq!(monitor.poll_events(true), 1);
        assert_eq!(monitor.poll_events(true), 1);
    }

    #[test]
    fn test_latch_poll_does_not_advance_count_snapshot() {
        let settings = enabled(45.0, true);
        let mut monitor = ThresholdMonitor::new(Direction::High);
        monitor.evaluate(50.0, &settings, 5.0);

        assert_eq!(monitor.poll_events(true), 1);
        assert_eq!(monitor.poll_events(false), 1);
        assert_eq!(monitor.poll_events(false), 0);
    }

    #[test]
    fn test_event_count_never_decreases() {
        let settings = enabled(45.0, false);
        let mut monitor = ThresholdMonitor::new(Direction::High);
        let values = [10.0, 50.0, 44.0, 46.0, 0.0, 45.0, 45.0, 39.0, 100.0, -5.0];

        let mut previous = 0;
        for v in values {
            monitor.evaluate(v, &settings, 5.0);
            assert!(monitor.event_count() >= previous);
            previous = monitor.event_count();
            monitor.poll_events(false);
        }
    }

    #[test]
    fn test_poller_keeps_its_own_snapshot() {
        let settings = enabled(45.0, false);
        let mut monitor = ThresholdMonitor::new(Direction::High);
        let mut poller = monitor.poller();

        // The second 30 releases the monitor so the next crossing counts.
        feed(&mut monitor, &settings, 5.0, &[46.0, 30.0, 30.0, 46.0]);
        assert_eq!(monitor.event_count(), 2);
        assert_eq!(monitor.poll_events(false), 2);
        assert_eq!(poller.poll_events(false), 2);
        assert_eq!(poller.poll_events(false), 0);
    }

    #[test]
    fn test_poller_across_threads() {
        let settings = enabled(45.0, false);
        let mut monitor = ThresholdMonitor::new(Direction::High);
        let mut poller = monitor.poller();

        feed(&mut monitor, &settings, 5.0, &[46.0, 30.0]);
        let first = std::thread::spawn(move || {
            let n = poller.poll_events(false);
            (n, poller)
        });
        let (n, mut poller) = first.join().unwrap();
        assert_eq!(n, 1);
        assert_eq!(poller.poll_events(false), 0);
    }

    #[test]
    fn test_direction_from_str() {
        assert_eq!("high".parse::<Direction>().unwrap(), Direction::High);
        assert_eq!("LOW".parse::<Direction>().unwrap(), Direction::Low);
        assert!("middle".parse::<Direction>().is_err());
    }
}
