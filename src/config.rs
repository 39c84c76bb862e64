// src/config.rs - Run configuration loaded from JSON
use crate::device::DurationParams;
use crate::pose::ReplayConfig;
use crate::transport::LinkParams;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

pub const DEFAULT_TICK_HZ: f64 = 60.0;
/// Shortest loop period; faster rates are capped here.
pub const MIN_TICK_PERIOD: Duration = Duration::from_millis(1);
const CONFIG_FILE_NAME: &str = "config.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub link: LinkParams,
    /// Open the link before the first tick.
    pub auto_connect: bool,
    /// Use an in-memory link instead of the port; nothing leaves the process.
    pub dry_run: bool,
    pub tick_hz: f64,
    pub replay: ReplayConfig,
    /// Initial light-phase durations; clamped into range on use.
    pub durations: DurationParams,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            link: LinkParams::default(),
            auto_connect: true,
            dry_run: false,
            tick_hz: DEFAULT_TICK_HZ,
            replay: ReplayConfig::default(),
            durations: DurationParams::default(),
        }
    }
}

impl AppConfig {
    /// Load from `explicit` if given, else from the per-user config file if it
    /// exists, else fall back to defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::from_file(path);
        }

        match default_config_path() {
            Some(path) if path.exists() => Self::from_file(&path),
            _ => {
                info!("No config file found, using defaults");
                Ok(Self::default())
            }
        }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let config = Self::from_json(&text)
            .with_context(|| format!("Invalid config {}", path.display()))?;
        info!("Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Tick rate, falling back to the default for non-positive or NaN values.
    pub fn tick_hz(&self) -> f64 {
        if self.tick_hz.is_finite() && self.tick_hz > 0.0 {
            self.tick_hz
        } else {
            DEFAULT_TICK_HZ
        }
    }

    /// Time between loop iterations, never shorter than [`MIN_TICK_PERIOD`].
    pub fn tick_period(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.tick_hz()).max(MIN_TICK_PERIOD)
    }

    pub fn initial_durations(&self) -> DurationParams {
        DurationParams::clamped(self.durations.red, self.durations.yellow, self.durations.green)
    }
}

pub fn default_config_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "gesture-light")
        .map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
}
