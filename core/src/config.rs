//! Engine configuration (TOML)
//!
//! Every field has a default so a partial or empty document loads; a
//! document that parses but fails validation is rejected up front
//! rather than discovered mid-simulation.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::clock::{LegacyMode, SimulationMode};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeConfig {
    /// Fixed simulation rate in ticks per second.
    #[serde(default = "default_tick_rate")]
    pub tick_rate: u32,
    /// Mode the engine boots into. Accepts canonical names ("record",
    /// "playback", "catch_up") and the legacy control-surface names
    /// ("play", "paused", "rewind").
    #[serde(default = "default_start_mode")]
    pub start_mode: String,
    /// Ticks the catch-up target advances per real tick.
    #[serde(default = "default_catch_up_step")]
    pub catch_up_step: u64,
    #[serde(default)]
    pub history: HistoryConfig,
    #[serde(default)]
    pub checkpoint: CheckpointConfig,
    #[serde(default)]
    pub timescale: TimescaleConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryConfig {
    /// Per-adapter record cap.
    #[serde(default = "default_history_records")]
    pub max_records: usize,
    /// Per-adapter byte budget.
    #[serde(default = "default_history_bytes")]
    pub max_bytes: usize,
    /// Drop records older than this many ticks; absent means unbounded.
    #[serde(default)]
    pub horizon_ticks: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckpointConfig {
    /// Capture a world checkpoint every this many ticks.
    #[serde(default = "default_checkpoint_interval")]
    pub interval: u64,
    #[serde(default = "default_checkpoint_count")]
    pub max_count: usize,
    #[serde(default = "default_checkpoint_bytes")]
    pub max_bytes: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimescaleConfig {
    #[serde(default = "default_min_scale")]
    pub min_scale: f32,
    #[serde(default = "default_max_scale")]
    pub max_scale: f32,
}

fn default_tick_rate() -> u32 {
    60
}
fn default_start_mode() -> String {
    "record".to_string()
}
fn default_catch_up_step() -> u64 {
    4
}
fn default_history_records() -> usize {
    512
}
fn default_history_bytes() -> usize {
    4 * 1024 * 1024
}
fn default_checkpoint_interval() -> u64 {
    300
}
fn default_checkpoint_count() -> usize {
    16
}
fn default_checkpoint_bytes() -> usize {
    64 * 1024 * 1024
}
fn default_min_scale() -> f32 {
    0.1
}
fn default_max_scale() -> f32 {
    8.0
}

impl Default for TimeConfig {
    fn default() -> Self {
        Self {
            tick_rate: default_tick_rate(),
            start_mode: default_start_mode(),
            catch_up_step: default_catch_up_step(),
            history: HistoryConfig::default(),
            checkpoint: CheckpointConfig::default(),
            timescale: TimescaleConfig::default(),
        }
    }
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            max_records: default_history_records(),
            max_bytes: default_history_bytes(),
            horizon_ticks: None,
        }
    }
}

impl Default for CheckpointConfig {
    fn default() -> Self {
        Self {
            interval: default_checkpoint_interval(),
            max_count: default_checkpoint_count(),
            max_bytes: default_checkpoint_bytes(),
        }
    }
}

impl Default for TimescaleConfig {
    fn default() -> Self {
        Self {
            min_scale: default_min_scale(),
            max_scale: default_max_scale(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("tick_rate must be positive")]
    InvalidTickRate,

    #[error("timescale clamp is invalid: must satisfy 0 < min ({min}) <= 1 <= max ({max})")]
    InvalidScaleClamp { min: f32, max: f32 },

    #[error("unknown start_mode '{0}'")]
    InvalidMode(String),

    #[error("checkpoint interval must be positive")]
    InvalidCheckpointInterval,

    #[error("catch_up_step must be positive")]
    InvalidCatchUpStep,

    #[error("failed to parse config: {0}")]
    Toml(#[from] toml::de::Error),
}

impl TimeConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations the engine cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tick_rate == 0 {
            return Err(ConfigError::InvalidTickRate);
        }
        // The clamp must bracket 1.0 so normal speed is always legal.
        if self.timescale.min_scale <= 0.0
            || self.timescale.min_scale > 1.0
            || self.timescale.max_scale < 1.0
        {
            return Err(ConfigError::InvalidScaleClamp {
                min: self.timescale.min_scale,
                max: self.timescale.max_scale,
            });
        }
        if self.checkpoint.interval == 0 {
            return Err(ConfigError::InvalidCheckpointInterval);
        }
        if self.catch_up_step == 0 {
            return Err(ConfigError::InvalidCatchUpStep);
        }
        self.parse_start_mode()?;
        Ok(())
    }

    /// Wall-clock length of one tick at scale 1.0.
    pub fn tick_duration(&self) -> Duration {
        Duration::from_secs_f64(1.0 / f64::from(self.tick_rate))
    }

    /// Boot mode, with legacy control-surface names translated at this
    /// boundary. Legacy "paused" and "step" are Record plus a paused
    /// clock, which the engine applies separately.
    pub fn parse_start_mode(&self) -> Result<SimulationMode, ConfigError> {
        let mode = match self.start_mode.as_str() {
            "record" => SimulationMode::Record,
            "playback" => SimulationMode::Playback,
            "catch_up" => SimulationMode::CatchUp,
            "play" => SimulationMode::from_legacy(LegacyMode::Play),
            "paused" => SimulationMode::from_legacy(LegacyMode::Paused),
            "step" => SimulationMode::from_legacy(LegacyMode::Step),
            "rewind" => SimulationMode::from_legacy(LegacyMode::Rewind),
            other => return Err(ConfigError::InvalidMode(other.to_string())),
        };
        Ok(mode)
    }

    /// Whether the boot mode also starts with the clock held.
    pub fn starts_paused(&self) -> bool {
        matches!(self.start_mode.as_str(), "paused" | "step")
    }
}
