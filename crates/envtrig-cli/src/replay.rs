//! Offline replay of recorded samples.

use anyhow::{Context, Result};
use envtrig_core::{
    Environment, EnvironmentConfig, Evaluator, EventReport, MonitorId, MonitorState,
};
use serde::Serialize;
use std::io::{Read, Write};
use std::path::Path;
use tracing::debug;

#[derive(Serialize)]
struct ReplayRow<'a> {
    row: usize,
    sample: &'a Environment,
    report: &'a EventReport,
    reasons: Vec<&'static str>,
}

/// Per-monitor outcome of a replay.
#[derive(Debug, Clone, PartialEq)]
pub struct MonitorSummary {
    pub id: MonitorId,
    pub events: usize,
    pub state: MonitorState,
    pub latch: bool,
}

/// Outcome of a replay.
#[derive(Debug, Clone, PartialEq)]
pub struct Summary {
    pub rows: usize,
    pub reporting_rows: usize,
    pub monitors: Vec<MonitorSummary>,
}

impl Summary {
    /// Writes a human-readable summary.
    pub fn print<W: Write>(&self, out: &mut W) -> Result<()> {
        writeln!(out, "{} samples, {} with events", self.rows, self.reporting_rows)?;
        for m in &self.monitors {
            writeln!(
                out,
                "  {:<16} events {:<4} state {:<8} latch {}",
                m.id.to_string(),
                m.events,
                m.state.to_string(),
                m.latch
            )?;
        }
        Ok(())
    }
}

/// Replays a CSV file.
pub fn run<W: Write>(
    path: &Path,
    config: &EnvironmentConfig,
    json: bool,
    out: &mut W,
) -> Result<Summary> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("Failed to open {}", path.display()))?;
    replay(file, config, json, out)
        .with_context(|| format!("Failed to replay {}", path.display()))
}

fn replay<R: Read, W: Write>(
    input: R,
    config: &EnvironmentConfig,
    json: bool,
    out: &mut W,
) -> Result<Summary> {
    let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(input);
    let mut evaluator = Evaluator::new();
    let mut rows = 0;
    let mut reporting_rows = 0;

    for (index, record) in reader.deserialize::<Environment>().enumerate() {
        // Row numbers count the header as line 1.
        let row = index + 2;
        let sample = record.with_context(|| format!("Invalid sample on line {}", row))?;
        rows += 1;

        evaluator.tick(&sample, config);
        let report = evaluator.poll_all(config);
        if report.is_empty() {
            continue;
        }
        reporting_rows += 1;

        let reasons: Vec<&'static str> = report.triggers().iter().map(|id| id.reason()).collect();
        debug!("line {}: {:?}", row, reasons);
        if json {
            let line = ReplayRow {
                row,
                sample: &sample,
                report: &report,
                reasons,
            };
            writeln!(out, "{}", serde_json::to_string(&line)?)?;
        } else {
            let detail: Vec<String> = report
                .triggers()
                .into_iter()
                .map(|id| format!("{}={}", id.reason(), report.get(id)))
                .collect();
            writeln!(
                out,
                "line {}: temperature {} humidity {} -> {}",
                row,
                sample.temperature,
                sample.humidity,
                detail.join(" ")
            )?;
        }
    }

    let monitors = MonitorId::ALL
        .into_iter()
        .map(|id| {
            let monitor = evaluator.monitor(id);
            MonitorSummary {
                id,
                events: monitor.event_count(),
                state: monitor.state(),
                latch: monitor.latch(),
            }
        })
        .collect();

    Ok(Summary {
        rows,
        reporting_rows,
        monitors,
    })
}
