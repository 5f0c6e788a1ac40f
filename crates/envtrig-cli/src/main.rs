//! Environment Trigger Control Tool
//!
//! CLI for reading and writing monitor settings and for replaying recorded
//! samples through the threshold monitors.

mod replay;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use envtrig_core::{
    SensorRange, Setting, SettingsStore, Signal, DEFAULT_SETTINGS_PATH, SETTINGS_NODE,
};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "envtrigctl")]
#[command(about = "Control tool for environment threshold triggers")]
#[command(version)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Daemon configuration file (supplies the settings path and sensor range)
    #[arg(long, default_value = "config/default.toml")]
    config: PathBuf,

    /// Settings file, overriding the one named in the daemon configuration
    #[arg(long)]
    settings: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List every setting with its type and range
    Keys {
        /// Only list settings of one signal (temperature or humidity)
        #[arg(long)]
        signal: Option<Signal>,
    },
    /// Show all current settings
    Show {
        /// Print as JSON
        #[arg(long)]
        json: bool,
        /// Only show settings of one signal (temperature or humidity)
        #[arg(long)]
        signal: Option<Signal>,
    },
    /// Read one setting
    Get {
        /// Setting key (e.g., envhigh, humlow_latch, envhyst)
        key: String,
    },
    /// Write one setting
    Set {
        /// Setting key (e.g., envhigh, humlow_latch, envhyst)
        key: String,
        /// New value (number, or true/false for flags)
        value: String,
    },
    /// Restore all settings to their defaults, replacing an unreadable file
    Reset,
    /// Replay a CSV of samples through the monitors
    Replay {
        /// CSV file with a `temperature,humidity` header
        file: PathBuf,
        /// Print one JSON object per reporting row
        #[arg(long)]
        json: bool,
    },
}

fn default_settings() -> PathBuf {
    PathBuf::from(DEFAULT_SETTINGS_PATH)
}

/// The parts of the daemon configuration the CLI needs.
#[derive(Debug, Deserialize)]
struct DaemonConfig {
    #[serde(default = "default_settings")]
    settings: PathBuf,
    #[serde(default)]
    range: SensorRange,
}

impl DaemonConfig {
    fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!("No daemon configuration at {:?}, using defaults", path);
            return Ok(Self {
                settings: default_settings(),
                range: SensorRange::default(),
            });
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        toml::from_str(&content).with_context(|| format!("Failed to parse {}", path.display()))
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env().add_directive("warn".parse()?)
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    run(cli)
}

fn run(cli: Cli) -> Result<()> {
    let daemon = DaemonConfig::load(&cli.config)?;
    let settings_path = cli.settings.unwrap_or(daemon.settings);
    let open = || {
        SettingsStore::open(&settings_path, daemon.range)
            .with_context(|| format!("Failed to open settings {}", settings_path.display()))
    };

    match cli.command {
        Commands::Keys { signal } => handle_keys(&daemon.range, signal),
        Commands::Show { json, signal } => handle_show(&open()?, json, signal),
        Commands::Get { key } => {
            let setting: Setting = key.parse()?;
            println!("{}", open()?.get(setting));
            Ok(())
        }
        Commands::Set { key, value } => {
            let setting: Setting = key.parse()?;
            let value = open()?.set(setting, &value)?;
            println!("{} set to: {}", setting, value);
            Ok(())
        }
        Commands::Reset => {
            SettingsStore::create(&settings_path, daemon.range).with_context(|| {
                format!("Failed to write settings {}", settings_path.display())
            })?;
            println!("Settings reset to defaults");
            Ok(())
        }
        Commands::Replay { file, json } => {
            let store = open()?;
            let summary = replay::run(&file, store.config(), json, &mut std::io::stdout())?;
            if !json {
                summary.print(&mut std::io::stdout())?;
            }
            Ok(())
        }
    }
}

/// Settings to list, optionally restricted to one signal.
fn selected(signal: Option<Signal>) -> Vec<Setting> {
    Setting::all()
        .into_iter()
        .filter(|s| signal.map_or(true, |signal| s.signal() == signal))
        .collect()
}

fn handle_keys(range: &SensorRange, signal: Option<Signal>) -> Result<()> {
    println!("{} settings:", SETTINGS_NODE);
    for setting in selected(signal) {
        match setting.range(range) {
            Some((min, max)) => println!("  {:<14} float  {} to {}", setting.key(), min, max),
            None => println!("  {:<14} bool", setting.key()),
        }
    }
    Ok(())
}

fn handle_show(store: &SettingsStore, json: bool, signal: Option<Signal>) -> Result<()> {
    if json {
        let map: serde_json::Map<String, serde_json::Value> = selected(signal)
            .into_iter()
            .map(|s| serde_json::to_value(store.get(s)).map(|v| (s.key(), v)))
            .collect::<serde_json::Result<_>>()?;
        println!("{}", serde_json::to_string_pretty(&map)?);
        return Ok(());
    }

    println!("Settings ({}):", store.path().display());
    for setting in selected(signal) {
        println!("  {:<14} {}", setting.key(), store.get(setting));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use envtrig_core::{EnvironmentConfig, MonitorId};

    fn cli(settings: &Path, args: &[&str]) -> Cli {
        let mut argv = vec![
            "envtrigctl".to_string(),
            "--config".to_string(),
            "/nonexistent/envtrig.toml".to_string(),
            "--settings".to_string(),
            settings.to_string_lossy().into_owned(),
        ];
        argv.extend(args.iter().map(|a| a.to_string()));
        Cli::parse_from(argv)
    }

    #[test]
    fn test_set_then_get() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("env_trig.toml");

        run(cli(&path, &["set", "humlow_en", "on"])).unwrap();
        let store = SettingsStore::open(&path, SensorRange::default()).unwrap();
        assert!(store.config().monitor(MonitorId::HumidityLow).enable);
        assert!(run(cli(&path, &["set", "humlow", "150"])).is_err());
        assert!(run(cli(&path, &["get", "humlow"])).is_ok());
    }

    #[test]
    fn test_reset_recovers_broken_settings() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("env_trig.toml");
        std::fs::write(&path, "not = [valid").unwrap();

        assert!(run(cli(&path, &["show"])).is_err());
        run(cli(&path, &["keys"])).unwrap();
        run(cli(&path, &["reset"])).unwrap();

        let store = SettingsStore::open(&path, SensorRange::default()).unwrap();
        assert_eq!(*store.config(), EnvironmentConfig::default());
        run(cli(&path, &["show", "--json"])).unwrap();
    }

    #[test]
    fn test_signal_filter() {
        let keys: Vec<String> = selected(Some(Signal::Humidity))
            .iter()
            .map(Setting::key)
            .collect();
        assert_eq!(keys.len(), 7);
        assert!(keys.iter().all(|k| k.starts_with("hum")));
        assert_eq!(selected(None).len(), 14);

        let dir = tempfile::tempdir().unwrap();
        let parsed = cli(&dir.path().join("s.toml"), &["show", "--signal", "temp"]);
        assert!(matches!(
            parsed.command,
            Commands::Show {
                signal: Some(Signal::Temperature),
                ..
            }
        ));
    }
}
